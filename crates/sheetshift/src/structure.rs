//! The contract every range-anchored sheet structure implements
//!
//! A structural edit is broadcast to each structure of the edited sheet through
//! [`ArrangeInsertRange`] (band inserts and deletes) and [`ArrangeMoveRange`]
//! (rectangle moves). Structures that hold formulas also implement
//! [`UpdateDeletedRanges`] so that defined-name positions follow name removals.

use sheetshift_core::{BandShift, DeletionTracker, EditOptions, GridLimits, Range, RangeSet, Result};

use crate::workbook::WorkbookGlobals;

/// Where an edit reads from and writes to
///
/// One coordinator serves both in-place edits and copies between documents: for an
/// in-place edit both globals are the same workbook's.
#[derive(Debug, Clone, Copy)]
pub struct EditContext<'a> {
    /// Sheet the copied content comes from
    pub source_sheet: usize,
    /// Sheet being edited, which also receives inserted bands
    pub dest_sheet: usize,
    /// Globals of the document the content comes from
    pub source_globals: &'a WorkbookGlobals,
    /// Globals of the document being edited
    pub dest_globals: &'a WorkbookGlobals,
}

impl<'a> EditContext<'a> {
    /// Context for an edit inside one sheet
    pub fn local(sheet: usize, globals: &'a WorkbookGlobals) -> Self {
        Self {
            source_sheet: sheet,
            dest_sheet: sheet,
            source_globals: globals,
            dest_globals: globals,
        }
    }

    /// Context for content copied from `source_sheet` of another document
    pub fn cross(
        source_sheet: usize,
        source_globals: &'a WorkbookGlobals,
        dest_sheet: usize,
        dest_globals: &'a WorkbookGlobals,
    ) -> Self {
        Self {
            source_sheet,
            dest_sheet,
            source_globals,
            dest_globals,
        }
    }

    /// Grid ceilings of the edited document
    pub fn limits(&self) -> &GridLimits {
        &self.dest_globals.settings.limits
    }

    /// Edit options of the edited document
    pub fn options(&self) -> &EditOptions {
        &self.dest_globals.settings.edit
    }

    /// Whether source and destination are different documents
    pub fn is_cross_document(&self) -> bool {
        !std::ptr::eq(self.source_globals, self.dest_globals)
    }
}

/// Follow a band insert or delete (a delete is a negative count)
pub trait ArrangeInsertRange {
    fn arrange_insert_range(&mut self, shift: &BandShift, ctx: &EditContext<'_>) -> Result<()>;
}

/// Follow the move of `source` to the origin `(new_row, new_col)`
pub trait ArrangeMoveRange {
    fn arrange_move_range(&mut self, source: &Range, new_row: u32, new_col: u32, ctx: &EditContext<'_>) -> Result<()>;
}

/// Remap defined-name positions after names were removed
pub trait UpdateDeletedRanges {
    fn update_deleted_ranges(&mut self, tracker: &DeletionTracker) -> Result<()>;
}

/// Signed offset taking `source` to the origin `(new_row, new_col)`
pub fn move_delta(source: &Range, new_row: u32, new_col: u32) -> (i64, i64) {
    (
        new_row as i64 - source.first_row as i64,
        new_col as i64 - source.first_col as i64,
    )
}

impl ArrangeInsertRange for RangeSet {
    fn arrange_insert_range(&mut self, shift: &BandShift, _ctx: &EditContext<'_>) -> Result<()> {
        self.arrange_shift(shift)
    }
}

impl ArrangeMoveRange for RangeSet {
    fn arrange_move_range(&mut self, source: &Range, new_row: u32, new_col: u32, _ctx: &EditContext<'_>) -> Result<()> {
        let (d_row, d_col) = move_delta(source, new_row, new_col);
        self.arrange_move(source, d_row, d_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_context_kinds() {
        let a = WorkbookGlobals::default();
        let b = WorkbookGlobals::default();
        assert!(!EditContext::local(0, &a).is_cross_document());
        let ctx = EditContext::cross(2, &a, 0, &b);
        assert!(ctx.is_cross_document());
        assert_eq!((ctx.source_sheet, ctx.dest_sheet), (2, 0));
        assert_eq!(ctx.limits().max_rows, 65_536);
    }

    #[test]
    fn test_range_set_contract() {
        let globals = WorkbookGlobals::default();
        let ctx = EditContext::local(0, &globals);
        let mut merged = RangeSet::merged_cells();
        merged.add(Range::new(1, 1, 2, 2)).unwrap();
        merged.arrange_move_range(&Range::new(0, 0, 3, 3), 10, 0, &ctx).unwrap();
        assert_eq!(merged.ranges(), &[Range::new(11, 1, 12, 2)]);
        assert_eq!(move_delta(&Range::new(5, 5, 6, 6), 2, 9), (-3, 4));
    }
}
