//! Data validation
//!
//! A data-validation rule restricts what may be entered in the cells of its
//! [`RangeSet`]. Its criteria are stored as formula tokens, so they follow
//! structural edits like any other formula.
//!
//! ## Example
//!
//! ```rust
//! use sheetshift::{DataValidation, Formula, Range, Token, ValidationOperator};
//!
//! let rule = DataValidation::whole_number(ValidationOperator::GreaterThan, Formula::new(vec![Token::Number(0.0)]))
//!     .with_range(Range::parse("A1:A10").unwrap())
//!     .unwrap()
//!     .with_error_message("Invalid value", "Enter a positive number");
//!
//! assert!(rule.applies_to(4, 0));
//! ```

use sheetshift_core::{BandShift, DeletionTracker, Formula, GridLimits, Range, RangeSet, Result};

use crate::structure::{move_delta, ArrangeInsertRange, ArrangeMoveRange, EditContext, UpdateDeletedRanges};

/// Data validation rule for cells
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidation {
    /// Type of validation
    pub validation_type: ValidationType,
    /// Comparison applied to `formula1`/`formula2`
    pub operator: ValidationOperator,
    /// First criterion (list source, bound or custom formula)
    pub formula1: Option<Formula>,
    /// Second bound for between/not between
    pub formula2: Option<Formula>,
    /// Cells this validation applies to
    pub ranges: RangeSet,
    /// Allow blank/empty cells
    pub allow_blank: bool,
    /// Show dropdown for list validation
    pub show_dropdown: bool,

    // Input message (shown when cell is selected)
    pub show_input_message: bool,
    pub input_title: Option<String>,
    pub input_message: Option<String>,

    // Error alert (shown when invalid data entered)
    pub show_error_alert: bool,
    pub error_style: ValidationErrorStyle,
    pub error_title: Option<String>,
    pub error_message: Option<String>,
}

impl Default for DataValidation {
    fn default() -> Self {
        Self {
            validation_type: ValidationType::Any,
            operator: ValidationOperator::Between,
            formula1: None,
            formula2: None,
            ranges: RangeSet::validation(GridLimits::biff8().max_validation_ranges),
            allow_blank: true,
            show_dropdown: true,
            show_input_message: false,
            input_title: None,
            input_message: None,
            show_error_alert: true,
            error_style: ValidationErrorStyle::Stop,
            error_title: None,
            error_message: None,
        }
    }
}

impl DataValidation {
    /// Create a new data validation with no restrictions
    pub fn new() -> Self {
        Self::default()
    }

    fn with_criteria(validation_type: ValidationType, operator: ValidationOperator, f1: Formula, f2: Option<Formula>) -> Self {
        Self {
            validation_type,
            operator,
            formula1: Some(f1),
            formula2: f2,
            ..Self::default()
        }
    }

    /// Create a list validation (dropdown) whose entries come from `source`
    pub fn list(source: impl Into<Formula>) -> Self {
        Self::with_criteria(ValidationType::List, ValidationOperator::Between, source.into(), None)
    }

    /// Create a whole number validation
    pub fn whole_number(operator: ValidationOperator, value: impl Into<Formula>) -> Self {
        Self::with_criteria(ValidationType::Whole, operator, value.into(), None)
    }

    /// Create a whole number validation with between/not between operator
    pub fn whole_number_between(operator: ValidationOperator, low: impl Into<Formula>, high: impl Into<Formula>) -> Self {
        Self::with_criteria(ValidationType::Whole, operator, low.into(), Some(high.into()))
    }

    /// Create a decimal number validation
    pub fn decimal(operator: ValidationOperator, value: impl Into<Formula>) -> Self {
        Self::with_criteria(ValidationType::Decimal, operator, value.into(), None)
    }

    /// Create a text length validation
    pub fn text_length(operator: ValidationOperator, value: impl Into<Formula>) -> Self {
        Self::with_criteria(ValidationType::TextLength, operator, value.into(), None)
    }

    /// Create a custom formula validation; the formula returns TRUE for valid values
    pub fn custom(formula: impl Into<Formula>) -> Self {
        Self::with_criteria(ValidationType::Custom, ValidationOperator::Between, formula.into(), None)
    }

    /// Cap the number of ranges this rule may cover
    pub fn with_max_ranges(mut self, max_ranges: usize) -> Self {
        self.ranges = self.ranges.with_max_ranges(max_ranges);
        self
    }

    /// Add a cell range to this validation
    pub fn with_range(mut self, range: Range) -> Result<Self> {
        self.ranges.add(range)?;
        Ok(self)
    }

    /// Set whether blank cells are allowed
    pub fn with_allow_blank(mut self, allow: bool) -> Self {
        self.allow_blank = allow;
        self
    }

    /// Set an input message (shown when cell is selected)
    pub fn with_input_message(mut self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.show_input_message = true;
        self.input_title = Some(title.into());
        self.input_message = Some(message.into());
        self
    }

    /// Set an error message (shown when invalid data entered)
    pub fn with_error_message(mut self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.show_error_alert = true;
        self.error_title = Some(title.into());
        self.error_message = Some(message.into());
        self
    }

    /// Set the error style
    pub fn with_error_style(mut self, style: ValidationErrorStyle) -> Self {
        self.error_style = style;
        self
    }

    /// Check if this validation applies to a specific cell
    pub fn applies_to(&self, row: u32, col: u32) -> bool {
        self.ranges.find_cell(row, col).is_some()
    }

    /// The criteria formulas that are set
    pub fn formulas(&self) -> impl Iterator<Item = &Formula> {
        self.formula1.iter().chain(self.formula2.iter())
    }

    /// The criteria formulas that are set, mutably
    pub fn formulas_mut(&mut self) -> impl Iterator<Item = &mut Formula> {
        self.formula1.iter_mut().chain(self.formula2.iter_mut())
    }

    /// This rule restricted to `area`, or `None` if it does not reach into it
    pub fn clip(&self, area: &Range) -> Option<DataValidation> {
        let pieces = self.ranges.clip(area);
        if pieces.is_empty() {
            return None;
        }
        let mut ranges = RangeSet::new(false, sheetshift_core::SingleCells::Keep, "data validation ranges");
        for piece in pieces {
            ranges.add_unmerged(piece).ok()?;
        }
        Some(DataValidation {
            ranges,
            ..self.clone()
        })
    }
}

impl ArrangeInsertRange for DataValidation {
    fn arrange_insert_range(&mut self, shift: &BandShift, _ctx: &EditContext<'_>) -> Result<()> {
        self.ranges.arrange_shift(shift)
    }
}

impl ArrangeMoveRange for DataValidation {
    fn arrange_move_range(&mut self, source: &Range, new_row: u32, new_col: u32, _ctx: &EditContext<'_>) -> Result<()> {
        let (d_row, d_col) = move_delta(source, new_row, new_col);
        self.ranges.arrange_move(source, d_row, d_col)
    }
}

impl UpdateDeletedRanges for DataValidation {
    fn update_deleted_ranges(&mut self, tracker: &DeletionTracker) -> Result<()> {
        for formula in self.formulas_mut() {
            tracker.remap_in_place(formula)?;
        }
        Ok(())
    }
}

/// Types of data validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationType {
    /// No validation (any value allowed)
    #[default]
    Any,
    /// Must be a whole number
    Whole,
    /// Must be a decimal number
    Decimal,
    /// Must be from a list
    List,
    /// Must be a date
    Date,
    /// Must be a time
    Time,
    /// Text length constraint
    TextLength,
    /// Custom formula validation
    Custom,
}

/// Comparison operators for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationOperator {
    /// Value must be between value1 and value2
    #[default]
    Between,
    /// Value must NOT be between value1 and value2
    NotBetween,
    /// Value must equal value1
    Equal,
    /// Value must NOT equal value1
    NotEqual,
    /// Value must be greater than value1
    GreaterThan,
    /// Value must be less than value1
    LessThan,
    /// Value must be greater than or equal to value1
    GreaterThanOrEqual,
    /// Value must be less than or equal to value1
    LessThanOrEqual,
}

impl ValidationOperator {
    /// Check if this operator requires two values
    pub fn requires_two_values(&self) -> bool {
        matches!(self, ValidationOperator::Between | ValidationOperator::NotBetween)
    }
}

/// Error alert styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationErrorStyle {
    /// Reject invalid data (default)
    #[default]
    Stop,
    /// Warn but allow
    Warning,
    /// Just inform
    Information,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::WorkbookGlobals;
    use pretty_assertions::assert_eq;
    use sheetshift_core::{Axis, CellRef, Error, Token};

    fn number(n: f64) -> Formula {
        Formula::new(vec![Token::Number(n)])
    }

    #[test]
    fn test_between_validation() {
        let v = DataValidation::whole_number_between(ValidationOperator::Between, number(1.0), number(100.0));
        assert_eq!(v.validation_type, ValidationType::Whole);
        assert!(v.operator.requires_two_values());
        assert_eq!(v.formulas().count(), 2);
    }

    #[test]
    fn test_applies_to() {
        let v = DataValidation::list(number(1.0))
            .with_range(Range::parse("A1:C10").unwrap())
            .unwrap();
        assert!(v.applies_to(0, 0));
        assert!(v.applies_to(5, 2));
        assert!(!v.applies_to(10, 0));
        assert!(!v.applies_to(0, 3));
    }

    #[test]
    fn test_range_limit() {
        let v = DataValidation::new()
            .with_max_ranges(1)
            .with_range(Range::cell(0, 0))
            .unwrap();
        let err = v.with_range(Range::cell(5, 5)).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { limit: 1, .. }));
    }

    #[test]
    fn test_follows_edits() {
        let globals = WorkbookGlobals::default();
        let ctx = EditContext::local(0, &globals);
        let mut v = DataValidation::custom(Formula::new(vec![Token::Ref(CellRef::new(0, 0)), Token::Name(3)]))
            .with_range(Range::parse("B2:B5").unwrap())
            .unwrap();

        v.arrange_insert_range(&BandShift::insert(Axis::Rows, 2, 2, (0, 255), 65_535), &ctx)
            .unwrap();
        assert_eq!(v.ranges.ranges(), &[Range::parse("B2:B7").unwrap()]);

        v.arrange_move_range(&Range::parse("A1:C10").unwrap(), 20, 0, &ctx).unwrap();
        assert_eq!(v.ranges.ranges(), &[Range::parse("B22:B27").unwrap()]);

        let mut names = sheetshift_core::NameRegistry::default();
        for name in ["N_a", "N_b", "N_c", "N_d"] {
            names.define(sheetshift_core::NamedRange::workbook_scope(name, number(0.0))).unwrap();
        }
        let tracker = names.delete(1).unwrap();
        v.update_deleted_ranges(&tracker).unwrap();
        assert_eq!(v.formula1.as_ref().map(|f| f.tokens[1].clone()), Some(Token::Name(2)));
    }

    #[test]
    fn test_clip() {
        let v = DataValidation::list(number(1.0))
            .with_range(Range::parse("A1:A10").unwrap())
            .unwrap();
        let piece = v.clip(&Range::parse("A5:B20").unwrap()).unwrap();
        assert_eq!(piece.ranges.ranges(), &[Range::parse("A5:A10").unwrap()]);
        assert!(v.clip(&Range::parse("C1:C2").unwrap()).is_none());
    }
}
