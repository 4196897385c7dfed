//! Workbook type - the sheets plus the globals every edit consults

use log::warn;

use sheetshift_core::{EditOptions, Error, GridLimits, NameRegistry, NameScope, NamedRange, Result};

use crate::edit::StructuralEditCoordinator;
use crate::worksheet::Worksheet;

/// Maximum sheet name length
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Workbook-level settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkbookSettings {
    /// Grid ceilings
    pub limits: GridLimits,
    /// Structural edit options
    pub edit: EditOptions,
}

/// State shared by every sheet of a workbook
#[derive(Debug, Clone)]
pub struct WorkbookGlobals {
    /// Defined names
    pub names: NameRegistry,
    /// Settings
    pub settings: WorkbookSettings,
}

impl WorkbookGlobals {
    /// Globals with an empty name registry sized for `settings`
    pub fn new(settings: WorkbookSettings) -> Self {
        Self {
            names: NameRegistry::new(settings.limits.max_names),
            settings,
        }
    }
}

impl Default for WorkbookGlobals {
    fn default() -> Self {
        Self::new(WorkbookSettings::default())
    }
}

/// A workbook (spreadsheet document)
///
/// A workbook contains worksheets and the globals they share. Structural edits go
/// through [`edit`](Self::edit).
#[derive(Debug, Clone)]
pub struct Workbook {
    pub(crate) sheets: Vec<Worksheet>,
    pub(crate) globals: WorkbookGlobals,
}

impl Workbook {
    /// Create a new workbook with one worksheet
    pub fn new() -> Self {
        let mut wb = Self::empty();
        let sheet = Worksheet::with_limits("Sheet1", wb.globals.settings.limits);
        wb.sheets.push(sheet);
        wb
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self::with_settings(WorkbookSettings::default())
    }

    /// Create an empty workbook with specific settings
    pub fn with_settings(settings: WorkbookSettings) -> Self {
        Self {
            sheets: Vec::new(),
            globals: WorkbookGlobals::new(settings),
        }
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    /// Get a worksheet by name
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|ws| ws.name() == name)
    }

    /// Get the index of a worksheet by name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|ws| ws.name() == name)
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.sheets.iter()
    }

    /// A worksheet to read from and a different one to write to
    ///
    /// Fails with [`Error::AliasedStorage`] when both indices are the same.
    pub fn sheets_pair_mut(&mut self, src: usize, dst: usize) -> Result<(&Worksheet, &mut Worksheet)> {
        self.check_sheet(src)?;
        self.check_sheet(dst)?;
        if src == dst {
            return Err(Error::AliasedStorage("worksheet"));
        }
        if src < dst {
            let (head, tail) = self.sheets.split_at_mut(dst);
            Ok((&head[src], &mut tail[0]))
        } else {
            let (head, tail) = self.sheets.split_at_mut(src);
            Ok((&tail[0], &mut head[dst]))
        }
    }

    pub(crate) fn check_sheet(&self, index: usize) -> Result<()> {
        if index >= self.sheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.sheets.len()));
        }
        Ok(())
    }

    /// Add a new worksheet with default name
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_worksheet_with_name(&name)
    }

    /// Add a new worksheet with specified name
    ///
    /// Appending never moves an existing sheet, so no formula needs rewriting.
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;
        let index = self.sheets.len();
        self.sheets.push(Worksheet::with_limits(name, self.globals.settings.limits));
        Ok(index)
    }

    /// Insert a worksheet at a specific index
    ///
    /// Sheet references and sheet-scoped names at or after `index` move along.
    pub fn insert_worksheet(&mut self, index: usize, name: &str) -> Result<()> {
        let sheet = Worksheet::with_limits(name, self.globals.settings.limits);
        self.edit().insert_sheets(index, vec![sheet]).map(|_| ())
    }

    /// Remove a worksheet by index
    pub fn remove_worksheet(&mut self, index: usize) -> Result<()> {
        self.edit().delete_sheets(index, 1).map(|_| ())
    }

    /// Rename a worksheet
    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        self.check_sheet(index)?;
        self.validate_sheet_name_excluding(new_name, Some(index))?;
        self.sheets[index].set_name(new_name);
        Ok(())
    }

    /// Get workbook settings
    pub fn settings(&self) -> &WorkbookSettings {
        &self.globals.settings
    }

    /// Replace the edit options
    ///
    /// Grid limits are fixed when the workbook is created.
    pub fn set_edit_options(&mut self, options: EditOptions) {
        self.globals.settings.edit = options;
    }

    /// Globals shared by all sheets
    pub fn globals(&self) -> &WorkbookGlobals {
        &self.globals
    }

    /// Coordinator for structural edits on this workbook
    pub fn edit(&mut self) -> StructuralEditCoordinator<'_> {
        StructuralEditCoordinator::new(self)
    }

    /// Run `op`, restoring the workbook if it fails and edits are transactional
    pub(crate) fn transact<T>(&mut self, what: &str, op: impl FnOnce(&mut Workbook) -> Result<T>) -> Result<T> {
        let snapshot = self.globals.settings.edit.transactional.then(|| self.clone());
        let result = op(self);
        if let (Err(e), Some(snapshot)) = (&result, snapshot) {
            warn!("{} failed, workbook restored: {}", what, e);
            *self = snapshot;
        }
        result
    }

    // ==================== Named Ranges ====================

    /// Define a name
    ///
    /// # Example
    /// ```
    /// use sheetshift::Workbook;
    /// use sheetshift::{AreaRef, NamedRange, Range, Token};
    ///
    /// let mut wb = Workbook::new();
    /// let area = AreaRef::absolute(Range::parse("B1:B4").unwrap());
    /// wb.define_name(NamedRange::workbook_scope("Rates", vec![Token::Area3d { sheet: 0, area }])).unwrap();
    /// assert!(wb.resolve_name("rates", Some(0)).is_some());
    /// ```
    pub fn define_name(&mut self, name: NamedRange) -> Result<usize> {
        if let NameScope::Sheet(sheet) = name.scope {
            self.check_sheet(sheet)?;
        }
        self.globals.names.define(name)
    }

    /// Look a name up the way a formula on `sheet` would see it
    pub fn resolve_name(&self, name: &str, sheet: Option<usize>) -> Option<&NamedRange> {
        let index = self.globals.names.resolve(name, sheet)?;
        self.globals.names.get(index).ok()
    }

    /// Delete the name at `index`; formulas referring to it get `#NAME?`
    pub fn delete_name(&mut self, index: usize) -> Result<()> {
        self.edit().delete_name(index).map(|_| ())
    }

    /// Get the name registry
    pub fn names(&self) -> &NameRegistry {
        &self.globals.names
    }

    pub(crate) fn validate_sheet_name(&self, name: &str) -> Result<()> {
        self.validate_sheet_name_excluding(name, None)
    }

    /// Validate a sheet name, optionally excluding a sheet from duplicate check
    fn validate_sheet_name_excluding(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = INVALID_CHARS.iter().find(|c| name.contains(**c)) {
            return Err(Error::InvalidSheetName(format!("Sheet name cannot contain '{}'", c)));
        }

        // Case-insensitive
        let name_lower = name.to_lowercase();
        for (i, ws) in self.sheets.iter().enumerate() {
            if Some(i) != exclude_index && ws.name().to_lowercase() == name_lower {
                return Err(Error::DuplicateSheetName(name.into()));
            }
        }
        Ok(())
    }

    /// Generate a unique sheet name
    fn generate_sheet_name(&self) -> String {
        let mut n = self.sheets.len() + 1;
        loop {
            let name = format!("Sheet{}", n);
            if self.validate_sheet_name(&name).is_ok() {
                return name;
            }
            n += 1;
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
