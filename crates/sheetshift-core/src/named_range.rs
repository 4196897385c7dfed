//! Defined names and their bookkeeping under structural edits
//!
//! Formulas refer to defined names by position in the registry (`Token::Name(i)`), so
//! removing a name shifts every later position. Removal therefore always goes through
//! a [`DeletionTracker`]: it is built once per edit by scanning every formula-bearing
//! structure, decides which names may be dropped, and then remaps each formula's name
//! positions in one pass.
//!
//! # Example
//!
//! ```
//! use sheetshift_core::formula::{CellRef, Formula, Token};
//! use sheetshift_core::named_range::{NameRegistry, NameScope, NamedRange};
//!
//! let mut names = NameRegistry::default();
//! let rate = Formula::new(vec![Token::Ref3d { sheet: 0, cell: CellRef::absolute(0, 1) }]);
//! names.define(NamedRange::new("TaxRate", rate, NameScope::Workbook)).unwrap();
//!
//! assert_eq!(names.resolve("taxrate", Some(2)), Some(0));
//! ```

use ahash::{AHashMap, AHashSet};
use log::{trace, warn};

use crate::error::{Error, Result};
use crate::formula::{Formula, Token};
use crate::range::letters_to_column;

/// Maximum length of a defined name
pub const MAX_NAME_LEN: usize = 255;

/// Scope of a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameScope {
    /// Available throughout the workbook (global)
    Workbook,
    /// Scoped to a specific sheet (local)
    Sheet(usize),
}

/// Flags carried by a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameFlags {
    /// Hidden from the UI
    pub hidden: bool,
    /// Built-in name such as a print area or filter database
    pub builtin: bool,
    /// Refers to a macro
    pub macro_name: bool,
    /// Refers to an add-in function
    pub addin: bool,
}

/// A defined name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRange {
    /// The name (e.g., "SalesData"); case-insensitive
    pub name: String,
    /// Scope of this name (workbook-wide or sheet-specific)
    pub scope: NameScope,
    /// What the name refers to, as formula tokens
    pub formula: Formula,
    pub flags: NameFlags,
    /// Optional comment/description for documentation
    pub comment: Option<String>,
}

impl NamedRange {
    /// Create a new defined name
    pub fn new(name: impl Into<String>, formula: impl Into<Formula>, scope: NameScope) -> Self {
        Self {
            name: name.into(),
            scope,
            formula: formula.into(),
            flags: NameFlags::default(),
            comment: None,
        }
    }

    /// Create a workbook-scoped name
    pub fn workbook_scope(name: impl Into<String>, formula: impl Into<Formula>) -> Self {
        Self::new(name, formula, NameScope::Workbook)
    }

    /// Create a sheet-scoped name
    pub fn sheet_scope(name: impl Into<String>, formula: impl Into<Formula>, sheet_index: usize) -> Self {
        Self::new(name, formula, NameScope::Sheet(sheet_index))
    }

    /// Set a comment for this name
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Replace the flags
    pub fn with_flags(mut self, flags: NameFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Mark this name as hidden
    pub fn hidden(mut self) -> Self {
        self.flags.hidden = true;
        self
    }

    /// Names that are never garbage-collected when their sheet goes away
    pub fn is_protected(&self) -> bool {
        self.flags.builtin || self.flags.macro_name
    }

    fn key(&self) -> (NameScope, String) {
        (self.scope, self.name.to_lowercase())
    }
}

/// Check that `name` is usable as a defined name
///
/// A name starts with a letter, underscore or backslash, continues with letters,
/// digits, `_`, `.`, `\` or `?`, is at most 255 characters long and must not read as a
/// cell reference in either A1 or R1C1 notation.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |why: &str| -> Result<()> { Err(Error::InvalidName(format!("'{}' {}", name, why))) };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::InvalidName("empty name".into()));
    };
    if name.chars().count() > MAX_NAME_LEN {
        return invalid("is longer than 255 characters");
    }
    if !(first.is_alphabetic() || first == '_' || first == '\\') {
        return invalid("must start with a letter, underscore or backslash");
    }
    if let Some(c) = chars.find(|&c| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '\\' | '?'))) {
        return invalid(&format!("contains '{}'", c));
    }
    if looks_like_a1(name) || looks_like_r1c1(name) {
        return invalid("looks like a cell reference");
    }
    Ok(())
}

/// `base_<suffix>`, with `base` cut short so the result stays within [`MAX_NAME_LEN`]
fn with_suffix(base: &str, suffix: usize) -> String {
    let tail = format!("_{}", suffix);
    let keep = MAX_NAME_LEN.saturating_sub(tail.chars().count());
    let mut name: String = base.chars().take(keep).collect();
    name.push_str(&tail);
    name
}

fn looks_like_a1(name: &str) -> bool {
    let split = name.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(name.len());
    let (letters, digits) = name.split_at(split);
    !letters.is_empty()
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && letters_to_column(letters).is_ok()
}

fn looks_like_r1c1(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let mut rest = upper.as_str();
    let mut matched = false;
    for marker in ['R', 'C'] {
        if let Some(after) = rest.strip_prefix(marker) {
            rest = after.trim_start_matches(|c: char| c.is_ascii_digit());
            matched = true;
        }
    }
    matched && rest.is_empty()
}

/// Per-edit liveness and position bookkeeping for defined names
///
/// Built fresh for every edit and dropped when it completes.
#[derive(Debug, Clone)]
pub struct DeletionTracker {
    referenced: Vec<bool>,
    deleted: Vec<bool>,
    preceding_deleted: Vec<usize>,
}

impl DeletionTracker {
    /// Tracker for a registry holding `count` names
    pub fn new(count: usize) -> Self {
        Self {
            referenced: vec![false; count],
            deleted: vec![false; count],
            preceding_deleted: vec![0; count],
        }
    }

    /// Number of names tracked
    pub fn len(&self) -> usize {
        self.referenced.len()
    }

    /// Check if no names are tracked
    pub fn is_empty(&self) -> bool {
        self.referenced.is_empty()
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(Error::internal(format!(
                "name index {} referenced but only {} names exist",
                index,
                self.len()
            )))
        }
    }

    /// Record a reference to name `index`
    pub fn mark_referenced(&mut self, index: usize) -> Result<bool> {
        self.check(index)?;
        let newly = !self.referenced[index];
        self.referenced[index] = true;
        Ok(newly)
    }

    /// Record every name reference in `formula`
    pub fn mark_formula(&mut self, formula: &Formula) -> Result<bool> {
        let mut newly = false;
        for index in formula.name_refs() {
            newly |= self.mark_referenced(index)?;
        }
        Ok(newly)
    }

    /// Whether a surviving formula refers to name `index`
    pub fn is_referenced(&self, index: usize) -> bool {
        self.referenced.get(index).copied().unwrap_or(false)
    }

    /// Whether name `index` is being removed
    pub fn is_deleted(&self, index: usize) -> bool {
        self.deleted.get(index).copied().unwrap_or(false)
    }

    /// Whether any name is being removed
    pub fn has_deletions(&self) -> bool {
        self.deleted.iter().any(|&d| d)
    }

    fn mark_deleted(&mut self, index: usize) -> Result<()> {
        self.check(index)?;
        self.deleted[index] = true;
        Ok(())
    }

    /// Recompute the per-name count of deleted names before it
    fn settle(&mut self) {
        let mut seen = 0;
        for (preceding, &deleted) in self.preceding_deleted.iter_mut().zip(&self.deleted) {
            *preceding = seen;
            if deleted {
                seen += 1;
            }
        }
    }

    /// The position name `index` will have once deletions are applied
    pub fn new_index(&self, index: usize) -> Result<Option<usize>> {
        self.check(index)?;
        if self.deleted[index] {
            Ok(None)
        } else {
            Ok(Some(index - self.preceding_deleted[index]))
        }
    }

    /// Rewrite the name positions in `formula`
    ///
    /// References to deleted names become `#NAME?`. Returns `Ok(None)` when nothing
    /// changed.
    pub fn remap(&self, formula: &Formula) -> Result<Option<Formula>> {
        let mut out: Option<Vec<Token>> = None;
        for (i, token) in formula.tokens.iter().enumerate() {
            let replacement = match token {
                Token::Name(index) => match self.new_index(*index)? {
                    None => Some(Token::NameError),
                    Some(moved) if moved != *index => Some(Token::Name(moved)),
                    Some(_) => None,
                },
                _ => None,
            };
            match replacement {
                Some(t) => out.get_or_insert_with(|| formula.tokens[..i].to_vec()).push(t),
                None => {
                    if let Some(tokens) = out.as_mut() {
                        tokens.push(token.clone());
                    }
                }
            }
        }
        Ok(out.map(Formula::new))
    }

    /// Rewrite the name positions in `formula` in place, returning whether it changed
    pub fn remap_in_place(&self, formula: &mut Formula) -> Result<bool> {
        match self.remap(formula)? {
            Some(rewritten) => {
                *formula = rewritten;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// The defined names of one workbook, in position order
#[derive(Debug, Clone)]
pub struct NameRegistry {
    names: Vec<NamedRange>,
    lookup: AHashMap<(NameScope, String), usize>,
    max_names: usize,
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new(65_535)
    }
}

impl NameRegistry {
    /// Create an empty registry holding at most `max_names` names
    pub fn new(max_names: usize) -> Self {
        Self {
            names: Vec::new(),
            lookup: AHashMap::new(),
            max_names,
        }
    }

    /// Get the number of names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Maximum number of names
    pub fn max_names(&self) -> usize {
        self.max_names
    }

    /// Get the name at `index`
    pub fn get(&self, index: usize) -> Result<&NamedRange> {
        Error::check_index(index, self.names.len())?;
        Ok(&self.names[index])
    }

    /// The definition of the name at `index`, for rewriting
    pub fn formula_mut(&mut self, index: usize) -> Result<&mut Formula> {
        Error::check_index(index, self.names.len())?;
        Ok(&mut self.names[index].formula)
    }

    /// Iterate over all names in position order
    pub fn iter(&self) -> std::slice::Iter<'_, NamedRange> {
        self.names.iter()
    }

    /// Iterate over every definition mutably along with its scope
    pub fn formulas_mut(&mut self) -> impl Iterator<Item = (NameScope, &mut Formula)> {
        self.names.iter_mut().map(|n| (n.scope, &mut n.formula))
    }

    /// Define a new name, returning its position
    pub fn define(&mut self, name: NamedRange) -> Result<usize> {
        validate_name(&name.name)?;
        let key = name.key();
        if self.lookup.contains_key(&key) {
            return Err(Error::DuplicateName(name.name));
        }
        if self.names.len() >= self.max_names {
            return Err(Error::LimitExceeded {
                what: "defined names",
                limit: self.max_names,
                requested: self.names.len() + 1,
            });
        }
        let index = self.names.len();
        self.lookup.insert(key, index);
        self.names.push(name);
        Ok(index)
    }

    /// Position of the name with this exact scope
    pub fn find(&self, name: &str, scope: NameScope) -> Option<usize> {
        self.lookup.get(&(scope, name.to_lowercase())).copied()
    }

    /// Resolve a name as seen from `sheet`: sheet scope first, then global
    pub fn resolve(&self, name: &str, sheet: Option<usize>) -> Option<usize> {
        let lower = name.to_lowercase();
        sheet
            .and_then(|s| self.lookup.get(&(NameScope::Sheet(s), lower.clone())))
            .or_else(|| self.lookup.get(&(NameScope::Workbook, lower)))
            .copied()
    }

    /// Rename the name at `index`
    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<()> {
        Error::check_index(index, self.names.len())?;
        validate_name(new_name)?;
        let scope = self.names[index].scope;
        let new_key = (scope, new_name.to_lowercase());
        if self.lookup.get(&new_key).is_some_and(|&other| other != index) {
            return Err(Error::DuplicateName(new_name.to_string()));
        }
        self.lookup.remove(&self.names[index].key());
        self.names[index].name = new_name.to_string();
        self.lookup.insert(new_key, index);
        Ok(())
    }

    /// Tracker sized for this registry
    pub fn tracker(&self) -> DeletionTracker {
        DeletionTracker::new(self.names.len())
    }

    /// Remove the name at `index`
    ///
    /// The returned tracker must be applied to every formula outside the registry; the
    /// registry's own definitions are already remapped.
    pub fn delete(&mut self, index: usize) -> Result<DeletionTracker> {
        Error::check_index(index, self.names.len())?;
        let mut tracker = self.tracker();
        tracker.mark_deleted(index)?;
        self.apply(&mut tracker)?;
        Ok(tracker)
    }

    /// Mark the references held by name definitions that outlive this edit
    ///
    /// Names scoped to `first..first + count` only count if they will survive, which
    /// depends on the marks themselves, so this iterates to a fixed point.
    pub fn mark_references(&self, tracker: &mut DeletionTracker, first: usize, count: usize) -> Result<()> {
        self.check_tracker(tracker)?;
        let dying = |n: &NamedRange| matches!(n.scope, NameScope::Sheet(s) if s >= first && s - first < count);
        for name in self.names.iter().filter(|n| !dying(n)) {
            tracker.mark_formula(&name.formula)?;
        }
        loop {
            let mut grew = false;
            for (i, name) in self.names.iter().enumerate() {
                if dying(name) && (tracker.is_referenced(i) || name.is_protected()) {
                    grew |= tracker.mark_formula(&name.formula)?;
                }
            }
            if !grew {
                return Ok(());
            }
        }
    }

    /// Dispose of the names owned by sheets `first..first + count`
    ///
    /// `tracker` must already hold every reference from surviving formulas. Unreferenced
    /// names are removed; referenced or protected names are widened to workbook scope
    /// and renamed with a numeric suffix if their name is already taken there. Names on
    /// later sheets have their sheet index lowered by `count`.
    pub fn delete_sheets(&mut self, first: usize, count: usize, tracker: &mut DeletionTracker) -> Result<()> {
        self.check_tracker(tracker)?;
        if count == 0 {
            return Ok(());
        }
        let end = first + count;

        let mut orphans = Vec::new();
        for (i, name) in self.names.iter_mut().enumerate() {
            match name.scope {
                NameScope::Sheet(s) if s >= first && s < end => {
                    if tracker.is_referenced(i) || name.is_protected() {
                        orphans.push(i);
                    } else {
                        trace!("name '{}' of deleted sheet {} is unreferenced, removing", name.name, s);
                        tracker.mark_deleted(i)?;
                    }
                }
                NameScope::Sheet(s) if s >= end => name.scope = NameScope::Sheet(s - count),
                _ => {}
            }
        }

        let mut taken: AHashSet<String> = self
            .names
            .iter()
            .filter(|n| n.scope == NameScope::Workbook)
            .map(|n| n.name.to_lowercase())
            .collect();
        for i in orphans {
            let name = &mut self.names[i];
            let base = name.name.clone();
            let mut candidate = base.clone();
            let mut suffix = 1;
            while taken.contains(&candidate.to_lowercase()) {
                candidate = with_suffix(&base, suffix);
                suffix += 1;
            }
            if candidate != base {
                validate_name(&candidate)?;
                warn!("orphaned name '{}' collides with a global name, renamed to '{}'", base, candidate);
            }
            trace!("name '{}' is still referenced, widening to workbook scope", candidate);
            taken.insert(candidate.to_lowercase());
            name.name = candidate;
            name.scope = NameScope::Workbook;
        }

        self.apply(tracker)
    }

    /// Shift sheet scopes for `count` sheets inserted before `at`
    pub fn insert_sheets(&mut self, at: usize, count: usize) {
        if count == 0 {
            return;
        }
        for name in &mut self.names {
            if let NameScope::Sheet(s) = name.scope {
                if s >= at {
                    name.scope = NameScope::Sheet(s + count);
                }
            }
        }
        self.rebuild_lookup();
    }

    fn check_tracker(&self, tracker: &DeletionTracker) -> Result<()> {
        if tracker.len() != self.names.len() {
            return Err(Error::internal(format!(
                "deletion tracker sized for {} names, registry holds {}",
                tracker.len(),
                self.names.len()
            )));
        }
        Ok(())
    }

    /// Physically remove the deleted names and remap the survivors' definitions
    fn apply(&mut self, tracker: &mut DeletionTracker) -> Result<()> {
        tracker.settle();
        if tracker.has_deletions() {
            let mut position = 0;
            self.names.retain(|_| {
                let keep = !tracker.is_deleted(position);
                position += 1;
                keep
            });
        }
        for name in &mut self.names {
            tracker.remap_in_place(&mut name.formula)?;
        }
        self.rebuild_lookup();
        Ok(())
    }

    fn rebuild_lookup(&mut self) {
        self.lookup = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.key(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::CellRef;
    use pretty_assertions::assert_eq;

    fn cell(sheet: usize, row: u32, col: u32) -> Formula {
        Formula::new(vec![Token::Ref3d {
            sheet,
            cell: CellRef::absolute(row, col),
        }])
    }

    #[test]
    fn test_name_syntax() {
        assert!(validate_name("TaxRate").is_ok());
        assert!(validate_name("_x.y?").is_ok());
        assert!(validate_name("\\path").is_ok());
        assert!(validate_name("ABCD1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("1abc").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("A1").is_err());
        assert!(validate_name("xfd100").is_err());
        assert!(validate_name("R1C1").is_err());
        assert!(validate_name("r").is_err());
        assert!(validate_name("RC").is_err());
        assert!(validate_name(&"n".repeat(256)).is_err());
    }

    #[test]
    fn test_scope_lookup() {
        let mut names = NameRegistry::default();
        names.define(NamedRange::workbook_scope("Rate", cell(0, 0, 0))).unwrap();
        names.define(NamedRange::sheet_scope("Rate", cell(0, 0, 1), 0)).unwrap();

        assert_eq!(names.resolve("RATE", Some(0)), Some(1));
        assert_eq!(names.resolve("rate", Some(1)), Some(0));
        assert_eq!(names.resolve("rate", None), Some(0));
        assert_eq!(names.find("Rate", NameScope::Sheet(0)), Some(1));

        let err = names.define(NamedRange::workbook_scope("RATE", cell(0, 0, 2))).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(_)));
    }

    #[test]
    fn test_max_names() {
        let mut names = NameRegistry::new(1);
        names.define(NamedRange::workbook_scope("One", cell(0, 0, 0))).unwrap();
        let err = names.define(NamedRange::workbook_scope("Two", cell(0, 0, 0))).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { limit: 1, requested: 2, .. }));
    }

    #[test]
    fn test_rename() {
        let mut names = NameRegistry::default();
        names.define(NamedRange::workbook_scope("Old", cell(0, 0, 0))).unwrap();
        names.define(NamedRange::workbook_scope("Other", cell(0, 0, 0))).unwrap();
        names.rename(0, "New").unwrap();
        assert_eq!(names.find("new", NameScope::Workbook), Some(0));
        assert_eq!(names.find("old", NameScope::Workbook), None);
        assert!(names.rename(0, "other").is_err());
        // Case-only rename of itself is fine
        names.rename(0, "NEW").unwrap();
    }

    #[test]
    fn test_delete_remaps_positions() {
        let mut names = NameRegistry::default();
        names.define(NamedRange::workbook_scope("A_", cell(0, 0, 0))).unwrap();
        names.define(NamedRange::workbook_scope("B_", cell(0, 0, 0))).unwrap();
        names
            .define(NamedRange::workbook_scope("C_", Formula::new(vec![Token::Name(0), Token::Name(1)])))
            .unwrap();

        let tracker = names.delete(0).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names.get(1).unwrap().formula.tokens, vec![Token::NameError, Token::Name(0)]);
        assert_eq!(names.find("c_", NameScope::Workbook), Some(1));

        let outside = Formula::new(vec![Token::Name(2), Token::Name(0)]);
        let remapped = tracker.remap(&outside).unwrap().unwrap();
        assert_eq!(remapped.tokens, vec![Token::Name(1), Token::NameError]);
        assert!(tracker.remap(&Formula::new(vec![Token::Name(7)])).is_err());
    }

    #[test]
    fn test_delete_sheets_widens_referenced_names() {
        let mut names = NameRegistry::default();
        names.define(NamedRange::workbook_scope("X", cell(0, 0, 0))).unwrap();
        names.define(NamedRange::sheet_scope("X", cell(0, 5, 5), 1)).unwrap();
        names.define(NamedRange::sheet_scope("Gone", cell(1, 0, 0), 1)).unwrap();
        names.define(NamedRange::sheet_scope("Later", cell(2, 0, 0), 2)).unwrap();

        // A formula on sheet 0 refers to the sheet-1 "X"
        let mut tracker = names.tracker();
        let on_sheet0 = Formula::new(vec![Token::Name(1)]);
        tracker.mark_formula(&on_sheet0).unwrap();
        names.mark_references(&mut tracker, 1, 1).unwrap();
        names.delete_sheets(1, 1, &mut tracker).unwrap();

        let listed: Vec<(String, NameScope)> = names.iter().map(|n| (n.name.clone(), n.scope)).collect();
        assert_eq!(
            listed,
            vec![
                ("X".to_string(), NameScope::Workbook),
                ("X_1".to_string(), NameScope::Workbook),
                ("Later".to_string(), NameScope::Sheet(1)),
            ]
        );
        assert_eq!(tracker.remap(&on_sheet0).unwrap(), None);
        assert_eq!(names.get(1).unwrap().formula, cell(0, 5, 5));
    }

    #[test]
    fn test_renamed_orphan_stays_within_name_length() {
        let long = "é".repeat(MAX_NAME_LEN);
        let mut names = NameRegistry::default();
        names.define(NamedRange::workbook_scope(long.clone(), cell(0, 0, 0))).unwrap();
        names.define(NamedRange::sheet_scope(long.clone(), cell(1, 0, 0), 1)).unwrap();

        let mut tracker = names.tracker();
        tracker.mark_referenced(1).unwrap();
        names.mark_references(&mut tracker, 1, 1).unwrap();
        names.delete_sheets(1, 1, &mut tracker).unwrap();

        let renamed = names.get(1).unwrap();
        assert_eq!(renamed.scope, NameScope::Workbook);
        assert_eq!(renamed.name.chars().count(), MAX_NAME_LEN);
        assert!(renamed.name.ends_with("é_1"));
        assert!(validate_name(&renamed.name).is_ok());
        assert_eq!(names.find(&renamed.name, NameScope::Workbook), Some(1));
    }

    #[test]
    fn test_orphan_keeps_its_dependencies() {
        let mut names = NameRegistry::default();
        names.define(NamedRange::sheet_scope("Base", cell(0, 0, 0), 1)).unwrap();
        names
            .define(NamedRange::sheet_scope("Derived", Formula::new(vec![Token::Name(0)]), 1))
            .unwrap();
        names.define(NamedRange::sheet_scope("Unused", cell(0, 0, 0), 1)).unwrap();

        let mut tracker = names.tracker();
        tracker.mark_referenced(1).unwrap();
        names.mark_references(&mut tracker, 1, 1).unwrap();
        assert!(tracker.is_referenced(0));
        names.delete_sheets(1, 1, &mut tracker).unwrap();

        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.scope == NameScope::Workbook));
        assert_eq!(tracker.new_index(2).unwrap(), None);
    }

    #[test]
    fn test_protected_names_survive() {
        let mut names = NameRegistry::default();
        let flags = NameFlags {
            builtin: true,
            ..NameFlags::default()
        };
        names
            .define(NamedRange::sheet_scope("Print_Area", cell(1, 0, 0), 1).with_flags(flags))
            .unwrap();
        let mut tracker = names.tracker();
        names.mark_references(&mut tracker, 1, 1).unwrap();
        names.delete_sheets(1, 1, &mut tracker).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names.get(0).unwrap().scope, NameScope::Workbook);
    }

    #[test]
    fn test_insert_sheets_shifts_scopes() {
        let mut names = NameRegistry::default();
        names.define(NamedRange::sheet_scope("A_", cell(0, 0, 0), 0)).unwrap();
        names.define(NamedRange::sheet_scope("B_", cell(0, 0, 0), 2)).unwrap();
        names.insert_sheets(1, 2);
        assert_eq!(names.find("a_", NameScope::Sheet(0)), Some(0));
        assert_eq!(names.find("b_", NameScope::Sheet(4)), Some(1));
    }

    #[test]
    fn test_tracker_size_mismatch_is_internal() {
        let mut names = NameRegistry::default();
        names.define(NamedRange::workbook_scope("A_", cell(0, 0, 0))).unwrap();
        let mut tracker = DeletionTracker::new(3);
        let err = names.delete_sheets(0, 1, &mut tracker).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InternalConsistency);
    }
}
