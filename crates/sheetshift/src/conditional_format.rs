//! Conditional formatting
//!
//! A [`ConditionalFormat`] is one block of rules sharing a [`RangeSet`] scope, like a
//! CONDFMT record with its CF records. Rule criteria are formula tokens and follow
//! structural edits.
//!
//! ## Example
//!
//! ```rust
//! use sheetshift::{CfRule, ConditionalFormat, Formula, Range, Token};
//!
//! let mut cf = ConditionalFormat::new().with_range(Range::parse("A1:A10").unwrap());
//! cf.add_rule(CfRule::cell_is_greater_than(Formula::new(vec![Token::Number(100.0)])).with_style(3));
//!
//! assert!(cf.applies_to(9, 0));
//! ```

use sheetshift_core::{BandShift, DeletionTracker, Formula, Range, RangeSet, Result};

use crate::structure::{move_delta, ArrangeInsertRange, ArrangeMoveRange, EditContext, UpdateDeletedRanges};

/// A block of conditional formatting rules applied to the same cells
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalFormat {
    /// Cells this block applies to
    pub ranges: RangeSet,
    /// Rules in evaluation order
    pub rules: Vec<CfRule>,
}

impl Default for ConditionalFormat {
    fn default() -> Self {
        Self {
            ranges: RangeSet::conditional_format(),
            rules: Vec::new(),
        }
    }
}

impl ConditionalFormat {
    /// Create an empty block
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell range
    pub fn with_range(mut self, range: Range) -> Self {
        // Conditional format scopes have no range ceiling
        let _ = self.ranges.add_unmerged(range);
        self
    }

    /// Add a rule
    pub fn with_rule(mut self, rule: CfRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a rule
    pub fn add_rule(&mut self, rule: CfRule) {
        self.rules.push(rule);
    }

    /// Check if this block applies to a specific cell
    pub fn applies_to(&self, row: u32, col: u32) -> bool {
        self.ranges.find_cell(row, col).is_some()
    }

    /// Every formula of every rule, mutably
    pub fn formulas_mut(&mut self) -> impl Iterator<Item = &mut Formula> {
        self.rules
            .iter_mut()
            .flat_map(|r| r.formula1.iter_mut().chain(r.formula2.iter_mut()))
    }

    /// Every formula of every rule
    pub fn formulas(&self) -> impl Iterator<Item = &Formula> {
        self.rules
            .iter()
            .flat_map(|r| r.formula1.iter().chain(r.formula2.iter()))
    }

    /// This block restricted to `area`, or `None` if it does not reach into it
    pub fn clip(&self, area: &Range) -> Option<ConditionalFormat> {
        let pieces = self.ranges.clip(area);
        if pieces.is_empty() {
            return None;
        }
        let mut clipped = ConditionalFormat {
            ranges: RangeSet::conditional_format(),
            rules: self.rules.clone(),
        };
        for piece in pieces {
            clipped = clipped.with_range(piece);
        }
        Some(clipped)
    }
}

impl ArrangeInsertRange for ConditionalFormat {
    fn arrange_insert_range(&mut self, shift: &BandShift, _ctx: &EditContext<'_>) -> Result<()> {
        self.ranges.arrange_shift(shift)
    }
}

impl ArrangeMoveRange for ConditionalFormat {
    fn arrange_move_range(&mut self, source: &Range, new_row: u32, new_col: u32, _ctx: &EditContext<'_>) -> Result<()> {
        let (d_row, d_col) = move_delta(source, new_row, new_col);
        self.ranges.arrange_move(source, d_row, d_col)
    }
}

impl UpdateDeletedRanges for ConditionalFormat {
    fn update_deleted_ranges(&mut self, tracker: &DeletionTracker) -> Result<()> {
        for formula in self.formulas_mut() {
            tracker.remap_in_place(formula)?;
        }
        Ok(())
    }
}

/// One conditional formatting rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CfRule {
    /// Type of rule
    pub rule_type: CfRuleType,
    /// Operator for cell value rules
    pub operator: Option<CfOperator>,
    /// First formula (comparison value or expression)
    pub formula1: Option<Formula>,
    /// Second formula for between/not between
    pub formula2: Option<Formula>,
    /// Priority (lower = higher priority)
    pub priority: u32,
    /// Stop evaluating lower-priority rules if this one matches
    pub stop_if_true: bool,
    /// Differential style applied when the rule matches
    pub style_index: Option<u32>,
}

impl CfRule {
    /// Create a new rule of the given type
    pub fn new(rule_type: CfRuleType) -> Self {
        Self {
            rule_type,
            priority: 1,
            ..Self::default()
        }
    }

    fn cell_is(operator: CfOperator, f1: Formula, f2: Option<Formula>) -> Self {
        Self {
            operator: Some(operator),
            formula1: Some(f1),
            formula2: f2,
            ..Self::new(CfRuleType::CellIs)
        }
    }

    /// Cell value greater than a value
    pub fn cell_is_greater_than(value: impl Into<Formula>) -> Self {
        Self::cell_is(CfOperator::GreaterThan, value.into(), None)
    }

    /// Cell value less than a value
    pub fn cell_is_less_than(value: impl Into<Formula>) -> Self {
        Self::cell_is(CfOperator::LessThan, value.into(), None)
    }

    /// Cell value equal to a value
    pub fn cell_is_equal_to(value: impl Into<Formula>) -> Self {
        Self::cell_is(CfOperator::Equal, value.into(), None)
    }

    /// Cell value between two values
    pub fn cell_is_between(low: impl Into<Formula>, high: impl Into<Formula>) -> Self {
        Self::cell_is(CfOperator::Between, low.into(), Some(high.into()))
    }

    /// Formula-based rule; formats the cell when the formula is TRUE
    pub fn expression(formula: impl Into<Formula>) -> Self {
        Self {
            formula1: Some(formula.into()),
            ..Self::new(CfRuleType::Expression)
        }
    }

    /// Set the differential style
    pub fn with_style(mut self, style_index: u32) -> Self {
        self.style_index = Some(style_index);
        self
    }

    /// Set priority
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set stop if true
    pub fn with_stop_if_true(mut self, stop: bool) -> Self {
        self.stop_if_true = stop;
        self
    }
}

/// Types of conditional formatting rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CfRuleType {
    /// Compare cell value with `formula1`/`formula2`
    #[default]
    CellIs,
    /// Custom formula
    Expression,
    /// Duplicate values
    DuplicateValues,
    /// Unique values
    UniqueValues,
    /// Contains blanks
    ContainsBlanks,
    /// Contains errors
    ContainsErrors,
}

/// Comparison operators for cell value rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfOperator {
    Between,
    NotBetween,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::WorkbookGlobals;
    use pretty_assertions::assert_eq;
    use sheetshift_core::{Axis, Token};

    fn number(n: f64) -> Formula {
        Formula::new(vec![Token::Number(n)])
    }

    #[test]
    fn test_rules() {
        let rule = CfRule::cell_is_between(number(1.0), number(5.0))
            .with_priority(2)
            .with_stop_if_true(true);
        assert_eq!(rule.operator, Some(CfOperator::Between));
        assert_eq!(rule.priority, 2);

        let cf = ConditionalFormat::new()
            .with_range(Range::parse("A1:B2").unwrap())
            .with_rule(rule)
            .with_rule(CfRule::expression(number(1.0)));
        assert_eq!(cf.formulas().count(), 3);
    }

    #[test]
    fn test_delete_splits_scope() {
        let globals = WorkbookGlobals::default();
        let ctx = EditContext::local(0, &globals);
        let mut cf = ConditionalFormat::new().with_range(Range::parse("A1:D10").unwrap());

        // Delete rows 3..4 in columns A:B only: the scope is split
        cf.arrange_insert_range(&BandShift::delete(Axis::Rows, 2, 2, (0, 1), 65_535), &ctx)
            .unwrap();
        let mut ranges = cf.ranges.ranges().to_vec();
        ranges.sort();
        assert_eq!(
            ranges,
            vec![Range::parse("A1:B8").unwrap(), Range::parse("C1:D10").unwrap()]
        );
        assert!(cf.applies_to(9, 3));
        assert!(!cf.applies_to(9, 0));
    }

    #[test]
    fn test_clip_keeps_rules() {
        let cf = ConditionalFormat::new()
            .with_range(Range::parse("B2:C3").unwrap())
            .with_rule(CfRule::cell_is_equal_to(number(0.0)).with_style(4));
        let piece = cf.clip(&Range::parse("C1:C9").unwrap()).unwrap();
        assert_eq!(piece.ranges.ranges(), &[Range::parse("C2:C3").unwrap()]);
        assert_eq!(piece.rules[0].style_index, Some(4));
    }
}
