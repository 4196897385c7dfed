//! Structural edits
//!
//! The [`StructuralEditCoordinator`] runs one insert, delete or move as a fixed
//! sequence: validate, shift the cells and every range-anchored structure of the
//! edited sheet, rewrite formula references workbook-wide, then rebuild what is
//! derived. Each entry point is one transaction when
//! [`EditOptions::transactional`](sheetshift_core::EditOptions) is set.
//!
//! ## Example
//!
//! ```rust
//! use sheetshift::Workbook;
//! use sheetshift::{CellRef, Token};
//!
//! let mut wb = Workbook::new();
//! let sheet = wb.worksheet_mut(0).unwrap();
//! sheet.set_cell_value_at(4, 0, 10.0).unwrap();
//! sheet.set_cell_formula_at(0, 0, vec![Token::Ref(CellRef::new(4, 0))]).unwrap();
//!
//! wb.edit().insert_rows(0, 2, 3).unwrap();
//!
//! let sheet = wb.worksheet(0).unwrap();
//! assert_eq!(sheet.value_at(7, 0).as_number(), Some(10.0));
//! assert_eq!(sheet.formula_at(0, 0).unwrap().tokens, vec![Token::Ref(CellRef::new(7, 0))]);
//! ```

use log::debug;

use sheetshift_core::{
    Axis, BandShift, Error, FormulaEdit, FormulaRewriter, GridLimits, MoveOverlap, Range, ReferenceRewriter,
    Result,
};

use crate::clip::Clip;
use crate::structure::{move_delta, ArrangeInsertRange, ArrangeMoveRange, EditContext, UpdateDeletedRanges};
use crate::workbook::{Workbook, WorkbookGlobals};
use crate::worksheet::Worksheet;

/// How an inserted or deleted block makes room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Cells below move down on insert and up on delete
    #[default]
    ShiftDown,
    /// Cells to the right move right on insert and left on delete
    ShiftRight,
    /// Nothing moves; the block's content is cleared or overwritten
    NoShift,
}

/// Whether an insert copies the source content into the new block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// Insert empty cells
    #[default]
    Empty,
    /// Copy cells, merges, validations, conditional formats and formatting
    All,
}

/// What an edit did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditSummary {
    /// Rectangle inserted, deleted, cleared or moved into; `None` for a no-op
    pub affected: Option<Range>,
    /// Number of formulas whose references changed
    pub formulas_rewritten: usize,
    /// Number of cells written by a paste
    pub cells_pasted: usize,
}

/// Runs structural edits on one workbook
///
/// Obtained from [`Workbook::edit`]. The formula collaborator defaults to
/// [`ReferenceRewriter`]; hosts with their own token model supply another one
/// through [`with_rewriter`](Self::with_rewriter).
pub struct StructuralEditCoordinator<'a, R: FormulaRewriter = ReferenceRewriter> {
    book: &'a mut Workbook,
    rewriter: R,
}

impl<'a> StructuralEditCoordinator<'a> {
    /// Coordinator using the built-in reference rewriter
    pub fn new(book: &'a mut Workbook) -> Self {
        let rewriter = ReferenceRewriter::new(book.globals.settings.limits);
        Self { book, rewriter }
    }
}

impl<'a, R: FormulaRewriter> StructuralEditCoordinator<'a, R> {
    /// Coordinator using a custom formula rewriter
    pub fn with_rewriter(book: &'a mut Workbook, rewriter: R) -> Self {
        Self { book, rewriter }
    }

    // ==================== Range edits ====================

    /// Insert a block at `(dest_row, dest_col)` on `sheet`
    ///
    /// The block is `row_count` by `col_count` copies of `source`. With
    /// [`CopyMode::All`] the content of `source`, captured before anything moves, is
    /// tiled over it. With [`InsertMode::NoShift`] nothing moves and the block is
    /// cleared or overwritten.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_range(
        &mut self,
        sheet: usize,
        source: Range,
        dest_row: u32,
        dest_col: u32,
        row_count: u32,
        col_count: u32,
        copy: CopyMode,
        mode: InsertMode,
    ) -> Result<EditSummary> {
        let rewriter = &self.rewriter;
        self.book.transact("insert range", |book| {
            book.check_sheet(sheet)?;
            let block = Block {
                sheet,
                source,
                dest_row,
                dest_col,
                row_count,
                col_count,
            };
            let limits = book.globals.settings.limits;
            block.check_origin(&limits, &limits)?;
            let clip = match copy {
                CopyMode::All => Some(Clip::capture(&book.sheets[sheet], &source)),
                CopyMode::Empty => None,
            };
            insert_block(book, rewriter, &block, clip, None, mode)
        })
    }

    /// Copy `source` of `src_sheet` to `(dest_row, dest_col)` of `dst_sheet`
    ///
    /// Overwrites the destination; nothing moves.
    pub fn copy_range(
        &mut self,
        src_sheet: usize,
        source: Range,
        dst_sheet: usize,
        dest_row: u32,
        dest_col: u32,
    ) -> Result<EditSummary> {
        let rewriter = &self.rewriter;
        self.book.transact("copy range", |book| {
            book.check_sheet(src_sheet)?;
            book.check_sheet(dst_sheet)?;
            let block = Block {
                sheet: dst_sheet,
                source,
                dest_row,
                dest_col,
                row_count: 1,
                col_count: 1,
            };
            let limits = book.globals.settings.limits;
            block.check_origin(&limits, &limits)?;
            let clip = Clip::capture(&book.sheets[src_sheet], &source);
            insert_block(book, rewriter, &block, Some(clip), None, InsertMode::NoShift)
        })
    }

    /// Insert content copied from another document
    ///
    /// References to `src_sheet` land on `dest_sheet`; references to other sheets of
    /// `source_book` become `#REF!`. Names are matched by text and copied over when
    /// missing.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_range_from(
        &mut self,
        source_book: &Workbook,
        src_sheet: usize,
        source: Range,
        dest_sheet: usize,
        dest_row: u32,
        dest_col: u32,
        row_count: u32,
        col_count: u32,
        mode: InsertMode,
    ) -> Result<EditSummary> {
        source_book.check_sheet(src_sheet)?;
        let rewriter = &self.rewriter;
        self.book.transact("insert range from another document", |book| {
            book.check_sheet(dest_sheet)?;
            let block = Block {
                sheet: dest_sheet,
                source,
                dest_row,
                dest_col,
                row_count,
                col_count,
            };
            block.check_origin(&book.globals.settings.limits, &source_book.globals.settings.limits)?;
            if row_count == 0 || col_count == 0 {
                return Ok(EditSummary::default());
            }
            let mut clip = Clip::capture(&source_book.sheets[src_sheet], &source);
            let imported = {
                let ctx = EditContext::cross(src_sheet, &source_book.globals, dest_sheet, &book.globals);
                clip.import(&ctx)?
            };
            for name in imported {
                book.globals.names.define(name)?;
            }
            let from = (src_sheet, &source_book.globals);
            insert_block(book, rewriter, &block, Some(clip), Some(from), mode)
        })
    }

    /// Delete `range` from `sheet`
    ///
    /// [`InsertMode::ShiftDown`] pulls the cells below up, [`InsertMode::ShiftRight`]
    /// pulls the cells to the right left, and [`InsertMode::NoShift`] only clears
    /// the cells.
    pub fn delete_range(&mut self, sheet: usize, range: Range, mode: InsertMode) -> Result<EditSummary> {
        let rewriter = &self.rewriter;
        self.book.transact("delete range", |book| {
            book.check_sheet(sheet)?;
            let limits = book.globals.settings.limits;
            limits.check_row(range.last_row)?;
            limits.check_col(range.last_col)?;
            debug!("delete {} on sheet {} ({:?})", range, sheet, mode);

            let shift = match mode {
                InsertMode::ShiftDown => BandShift::delete(
                    Axis::Rows,
                    range.first_row,
                    range.row_count(),
                    (range.first_col, range.last_col),
                    limits.last_row(),
                ),
                InsertMode::ShiftRight => BandShift::delete(
                    Axis::Columns,
                    range.first_col,
                    range.col_count(),
                    (range.first_row, range.last_row),
                    limits.last_col(),
                ),
                InsertMode::NoShift => {
                    book.sheets[sheet].clear_area(&range)?;
                    debug!("cleared {} on sheet {}", range, sheet);
                    return Ok(EditSummary {
                        affected: Some(range),
                        ..EditSummary::default()
                    });
                }
            };
            let formulas_rewritten = apply_shift(book, rewriter, sheet, &shift)?;
            debug!("deleted {}, {} formula(s) rewritten", range, formulas_rewritten);
            Ok(EditSummary {
                affected: Some(range),
                formulas_rewritten,
                cells_pasted: 0,
            })
        })
    }

    /// Move `range` so its top-left cell lands on `(new_row, new_col)`
    ///
    /// Whatever the moved cells land on is overwritten; references into the
    /// overwritten area become `#REF!`.
    pub fn move_range(&mut self, sheet: usize, range: Range, new_row: u32, new_col: u32) -> Result<EditSummary> {
        let rewriter = &self.rewriter;
        self.book.transact("move range", |book| {
            book.check_sheet(sheet)?;
            let limits = book.globals.settings.limits;
            limits.check_row(range.last_row)?;
            limits.check_col(range.last_col)?;
            let (d_row, d_col) = move_delta(&range, new_row, new_col);
            let dest = range
                .offset(d_row, d_col)
                .ok_or_else(|| Error::InvalidRange(format!("{} cannot move to row {}", range, new_row)))?;
            limits.check_row(dest.last_row)?;
            limits.check_col(dest.last_col)?;
            if d_row == 0 && d_col == 0 {
                return Ok(EditSummary::default());
            }
            if book.globals.settings.edit.move_overlap == MoveOverlap::Reject && dest.intersects(&range) {
                return Err(Error::InvalidRange(format!("{} overlaps its destination {}", range, dest)));
            }
            debug!("move {} on sheet {} to {}", range, sheet, dest);

            {
                let Workbook { sheets, globals } = &mut *book;
                let ctx = EditContext::local(sheet, globals);
                sheets[sheet].arrange_move_range(&range, new_row, new_col, &ctx)?;
            }
            let edit = FormulaEdit::Move {
                sheet,
                source: range,
                d_row,
                d_col,
            };
            let formulas_rewritten = rewrite_formulas(book, rewriter, &edit)?;
            debug!("moved {} to {}, {} formula(s) rewritten", range, dest, formulas_rewritten);
            Ok(EditSummary {
                affected: Some(dest),
                formulas_rewritten,
                cells_pasted: 0,
            })
        })
    }

    // ==================== Whole rows and columns ====================

    /// Insert `count` empty rows before `row`
    pub fn insert_rows(&mut self, sheet: usize, row: u32, count: u32) -> Result<EditSummary> {
        let last_col = self.book.globals.settings.limits.last_col();
        let band = Range::new(row, 0, row.saturating_add(count.max(1) - 1), last_col);
        self.insert_range(sheet, band, row, 0, count.min(1), 1, CopyMode::Empty, InsertMode::ShiftDown)
    }

    /// Delete `count` rows starting at `row`
    pub fn delete_rows(&mut self, sheet: usize, row: u32, count: u32) -> Result<EditSummary> {
        if count == 0 {
            return Ok(EditSummary::default());
        }
        let last_col = self.book.globals.settings.limits.last_col();
        let band = Range::new(row, 0, row.saturating_add(count - 1), last_col);
        self.delete_range(sheet, band, InsertMode::ShiftDown)
    }

    /// Insert `count` empty columns before `col`
    pub fn insert_cols(&mut self, sheet: usize, col: u32, count: u32) -> Result<EditSummary> {
        let last_row = self.book.globals.settings.limits.last_row();
        let band = Range::new(0, col, last_row, col.saturating_add(count.max(1) - 1));
        self.insert_range(sheet, band, 0, col, 1, count.min(1), CopyMode::Empty, InsertMode::ShiftRight)
    }

    /// Delete `count` columns starting at `col`
    pub fn delete_cols(&mut self, sheet: usize, col: u32, count: u32) -> Result<EditSummary> {
        if count == 0 {
            return Ok(EditSummary::default());
        }
        let last_row = self.book.globals.settings.limits.last_row();
        let band = Range::new(0, col, last_row, col.saturating_add(count - 1));
        self.delete_range(sheet, band, InsertMode::ShiftRight)
    }

    // ==================== Sheets and names ====================

    /// Insert `sheets` before position `at`
    ///
    /// Sheet references and sheet-scoped names at or after `at` move along.
    pub fn insert_sheets(&mut self, at: usize, sheets: Vec<Worksheet>) -> Result<EditSummary> {
        let rewriter = &self.rewriter;
        self.book.transact("insert sheets", |book| {
            if at > book.sheets.len() {
                return Err(Error::SheetOutOfBounds(at, book.sheets.len()));
            }
            for (i, sheet) in sheets.iter().enumerate() {
                book.validate_sheet_name(sheet.name())?;
                let lower = sheet.name().to_lowercase();
                if sheets[..i].iter().any(|s| s.name().to_lowercase() == lower) {
                    return Err(Error::DuplicateSheetName(sheet.name().to_string()));
                }
            }
            let count = sheets.len();
            if count == 0 {
                return Ok(EditSummary::default());
            }
            debug!("insert {} sheet(s) at {}", count, at);

            let formulas_rewritten = rewrite_formulas(book, rewriter, &FormulaEdit::InsertSheets { at, count })?;
            book.globals.names.insert_sheets(at, count);
            let tail = book.sheets.split_off(at);
            book.sheets.extend(sheets);
            book.sheets.extend(tail);
            Ok(EditSummary {
                formulas_rewritten,
                ..EditSummary::default()
            })
        })
    }

    /// Delete sheets `first..first + count`
    ///
    /// Names owned by the deleted sheets are removed when nothing else refers to
    /// them and otherwise widened to workbook scope. References to the deleted
    /// sheets become `#REF!`.
    pub fn delete_sheets(&mut self, first: usize, count: usize) -> Result<EditSummary> {
        let rewriter = &self.rewriter;
        self.book.transact("delete sheets", |book| {
            if count == 0 {
                return Ok(EditSummary::default());
            }
            let end = first
                .checked_add(count)
                .filter(|&end| end <= book.sheets.len())
                .ok_or(Error::SheetOutOfBounds(first.saturating_add(count - 1), book.sheets.len()))?;
            debug!("delete sheets {}..{}", first, end);

            // Mark before anything is removed
            let mut tracker = book.globals.names.tracker();
            for (i, sheet) in book.sheets.iter().enumerate() {
                if (first..end).contains(&i) {
                    continue;
                }
                sheet.for_each_formula(|_, formula| tracker.mark_formula(formula).map(|_| ()))?;
            }
            book.globals.names.mark_references(&mut tracker, first, count)?;
            book.globals.names.delete_sheets(first, count, &mut tracker)?;
            book.sheets.drain(first..end);

            if tracker.has_deletions() {
                for sheet in &mut book.sheets {
                    sheet.update_deleted_ranges(&tracker)?;
                }
            }
            let formulas_rewritten = rewrite_formulas(book, rewriter, &FormulaEdit::DeleteSheets { first, count })?;
            debug!("deleted {} sheet(s), {} formula(s) rewritten", count, formulas_rewritten);
            Ok(EditSummary {
                formulas_rewritten,
                ..EditSummary::default()
            })
        })
    }

    /// Delete the name at `index`
    ///
    /// Formulas referring to it get `#NAME?`; references to later names are
    /// renumbered.
    pub fn delete_name(&mut self, index: usize) -> Result<EditSummary> {
        self.book.transact("delete name", |book| {
            let tracker = book.globals.names.delete(index)?;
            let mut formulas_rewritten = 0;
            for sheet in &mut book.sheets {
                sheet.for_each_formula_mut(|_, formula| {
                    if tracker.remap_in_place(formula)? {
                        formulas_rewritten += 1;
                    }
                    Ok(())
                })?;
            }
            debug!("deleted name {}, {} formula(s) rewritten", index, formulas_rewritten);
            Ok(EditSummary {
                formulas_rewritten,
                ..EditSummary::default()
            })
        })
    }
}

/// Where an insert lands
struct Block {
    sheet: usize,
    source: Range,
    dest_row: u32,
    dest_col: u32,
    row_count: u32,
    col_count: u32,
}

impl Block {
    /// Reject a block whose destination or source corner is off the grid
    ///
    /// A block that starts on the grid and runs past it is caught by
    /// [`target`](Self::target) as a limit instead.
    fn check_origin(&self, limits: &GridLimits, source_limits: &GridLimits) -> Result<()> {
        source_limits.check_row(self.source.first_row)?;
        source_limits.check_col(self.source.first_col)?;
        limits.check_row(self.dest_row)?;
        limits.check_col(self.dest_col)
    }

    /// The destination rectangle, checked against the grid
    fn target(&self, globals: &WorkbookGlobals) -> Result<Range> {
        let limits = &globals.settings.limits;
        let rows = self.source.row_count() as u64 * self.row_count as u64;
        let cols = self.source.col_count() as u64 * self.col_count as u64;
        let last_row = self.dest_row as u64 + rows - 1;
        let last_col = self.dest_col as u64 + cols - 1;
        if last_row > limits.last_row() as u64 {
            return Err(Error::LimitExceeded {
                what: "rows",
                limit: limits.max_rows as usize,
                requested: last_row as usize + 1,
            });
        }
        if last_col > limits.last_col() as u64 {
            return Err(Error::LimitExceeded {
                what: "columns",
                limit: limits.max_cols as usize,
                requested: last_col as usize + 1,
            });
        }
        Ok(Range::new(self.dest_row, self.dest_col, last_row as u32, last_col as u32))
    }
}

/// Make room for `block` and paste `clip` into it
fn insert_block<R: FormulaRewriter + ?Sized>(
    book: &mut Workbook,
    rewriter: &R,
    block: &Block,
    clip: Option<Clip>,
    from: Option<(usize, &WorkbookGlobals)>,
    mode: InsertMode,
) -> Result<EditSummary> {
    if block.row_count == 0 || block.col_count == 0 {
        return Ok(EditSummary::default());
    }
    let sheet = block.sheet;
    let target = block.target(&book.globals)?;
    let limits = book.globals.settings.limits;
    debug!("insert {} on sheet {} ({:?})", target, sheet, mode);

    let shift = match mode {
        InsertMode::ShiftDown => Some(BandShift::insert(
            Axis::Rows,
            target.first_row,
            target.row_count(),
            (target.first_col, target.last_col),
            limits.last_row(),
        )),
        InsertMode::ShiftRight => Some(BandShift::insert(
            Axis::Columns,
            target.first_col,
            target.col_count(),
            (target.first_row, target.last_row),
            limits.last_col(),
        )),
        InsertMode::NoShift => None,
    };

    let mut formulas_rewritten = 0;
    match shift {
        Some(shift) => formulas_rewritten = apply_shift(book, rewriter, sheet, &shift)?,
        None => {
            let dest = &mut book.sheets[sheet];
            dest.clear_area(&target)?;
            if clip.is_some() {
                dest.merged_cells_mut().remove_intersecting(&target);
            }
        }
    }

    let mut cells_pasted = 0;
    if let Some(clip) = clip {
        let Workbook { sheets, globals } = &mut *book;
        let ctx = match from {
            Some((src_sheet, source_globals)) => EditContext::cross(src_sheet, source_globals, sheet, globals),
            None => EditContext::local(sheet, globals),
        };
        cells_pasted = clip.paste(&mut sheets[sheet], &target, rewriter, &ctx)?;
    }
    debug!(
        "inserted {}, {} formula(s) rewritten, {} cell(s) pasted",
        target, formulas_rewritten, cells_pasted
    );
    Ok(EditSummary {
        affected: Some(target),
        formulas_rewritten,
        cells_pasted,
    })
}

/// Shift the structures of `sheet`, then every formula that can see it
fn apply_shift<R: FormulaRewriter + ?Sized>(
    book: &mut Workbook,
    rewriter: &R,
    sheet: usize,
    shift: &BandShift,
) -> Result<usize> {
    {
        let Workbook { sheets, globals } = &mut *book;
        let ctx = EditContext::local(sheet, globals);
        sheets[sheet].arrange_insert_range(shift, &ctx)?;
    }
    rewrite_formulas(book, rewriter, &FormulaEdit::Shift { sheet, shift: *shift })
}

/// Rewrite every formula of the workbook for `edit`, returning how many changed
fn rewrite_formulas<R: FormulaRewriter + ?Sized>(book: &mut Workbook, rewriter: &R, edit: &FormulaEdit) -> Result<usize> {
    let mut rewritten = 0;
    for (index, sheet) in book.sheets.iter_mut().enumerate() {
        sheet.for_each_formula_mut(|site, formula| {
            let host = site.is_hosted().then_some(index);
            if let Some(new) = rewriter.rewrite(formula, host, edit)? {
                *formula = new;
                rewritten += 1;
            }
            Ok(())
        })?;
    }
    for (_, formula) in book.globals.names.formulas_mut() {
        if let Some(new) = rewriter.rewrite(formula, None, edit)? {
            *formula = new;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetshift_core::{CellRef, CellValue, EditOptions, ErrorKind, Formula, NameScope, NamedRange, Token};

    use crate::validation::DataValidation;

    fn book_with_column(values: &[f64]) -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        for (i, v) in values.iter().enumerate() {
            sheet.set_cell_value_at(i as u32, 0, *v).unwrap();
        }
        wb
    }

    fn column(wb: &Workbook, rows: u32) -> Vec<Option<f64>> {
        let sheet = wb.worksheet(0).unwrap();
        (0..rows).map(|r| sheet.value_at(r, 0).as_number()).collect()
    }

    #[test]
    fn test_insert_rows_shifts_cells_and_formulas() {
        let mut wb = book_with_column(&[1.0, 2.0, 3.0]);
        wb.worksheet_mut(0)
            .unwrap()
            .set_cell_formula_at(0, 1, vec![Token::Ref(CellRef::new(2, 0))])
            .unwrap();

        let summary = wb.edit().insert_rows(0, 1, 2).unwrap();
        assert_eq!(summary.affected, Some(Range::new(1, 0, 2, 255)));
        assert_eq!(summary.formulas_rewritten, 1);
        assert_eq!(column(&wb, 5), vec![Some(1.0), None, None, Some(2.0), Some(3.0)]);
        assert_eq!(
            wb.worksheet(0).unwrap().formula_at(0, 1).unwrap().tokens,
            vec![Token::Ref(CellRef::new(4, 0))]
        );
    }

    #[test]
    fn test_zero_count_is_noop() {
        let mut wb = book_with_column(&[1.0, 2.0]);
        let summary = wb.edit().insert_rows(0, 0, 0).unwrap();
        assert_eq!(summary, EditSummary::default());
        assert_eq!(column(&wb, 2), vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_delete_rows_invalidates_references() {
        let mut wb = book_with_column(&[1.0, 2.0, 3.0]);
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_formula_at(0, 1, vec![Token::Ref(CellRef::new(1, 0))]).unwrap();
        sheet.set_cell_formula_at(0, 2, vec![Token::Ref(CellRef::new(2, 0))]).unwrap();

        wb.edit().delete_rows(0, 1, 1).unwrap();
        let sheet = wb.worksheet(0).unwrap();
        assert_eq!(column(&wb, 3), vec![Some(1.0), Some(3.0), None]);
        assert_eq!(sheet.formula_at(0, 1).unwrap().tokens, vec![Token::RefError]);
        assert_eq!(sheet.formula_at(0, 2).unwrap().tokens, vec![Token::Ref(CellRef::new(1, 0))]);
    }

    #[test]
    fn test_insert_shift_right_partial() {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value("B1", 1.0).unwrap();
        sheet.set_cell_value("B3", 3.0).unwrap();

        // Insert one cell at B1 shifting right; row 3 is outside the block
        wb.edit()
            .insert_range(0, Range::cell(0, 1), 0, 1, 1, 1, CopyMode::Empty, InsertMode::ShiftRight)
            .unwrap();
        let sheet = wb.worksheet(0).unwrap();
        assert_eq!(sheet.value_at(0, 2), CellValue::Number(1.0));
        assert_eq!(sheet.value_at(2, 1), CellValue::Number(3.0));
    }

    #[test]
    fn test_insert_with_copy_tiles_source() {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value_at(0, 0, 1.0).unwrap();
        sheet.set_cell_formula_at(0, 1, vec![Token::Ref(CellRef::new(0, 0))]).unwrap();

        let summary = wb
            .edit()
            .insert_range(0, Range::new(0, 0, 0, 1), 1, 0, 2, 1, CopyMode::All, InsertMode::ShiftDown)
            .unwrap();
        assert_eq!(summary.cells_pasted, 4);
        let sheet = wb.worksheet(0).unwrap();
        assert_eq!(sheet.value_at(2, 0), CellValue::Number(1.0));
        assert_eq!(sheet.formula_at(2, 1).unwrap().tokens, vec![Token::Ref(CellRef::new(2, 0))]);
        // The original is untouched
        assert_eq!(sheet.formula_at(0, 1).unwrap().tokens, vec![Token::Ref(CellRef::new(0, 0))]);
    }

    #[test]
    fn test_insert_past_grid_is_rejected() {
        let mut wb = Workbook::new();
        let err = wb.edit().insert_rows(0, 65_535, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);

        wb.worksheet_mut(0).unwrap().set_cell_value_at(65_535, 0, 1.0).unwrap();
        let err = wb.edit().insert_rows(0, 0, 1).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { what: "rows", .. }));
        assert_eq!(wb.worksheet(0).unwrap().value_at(65_535, 0), CellValue::Number(1.0));
    }

    #[test]
    fn test_insert_off_grid_is_an_invalid_argument() {
        let mut wb = Workbook::new();
        let err = wb.edit().insert_rows(0, 70_000, 1).unwrap_err();
        assert!(matches!(err, Error::RowOutOfBounds(70_000, 65_535)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = wb.edit().insert_cols(0, 300, 1).unwrap_err();
        assert!(matches!(err, Error::ColumnOutOfBounds(300, 255)));

        let err = wb.edit().copy_range(0, Range::cell(0, 0), 0, 0, 256).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = wb
            .edit()
            .insert_range(0, Range::cell(70_000, 0), 0, 0, 1, 1, CopyMode::All, InsertMode::ShiftDown)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        // Same answer as the matching delete
        let err = wb.edit().delete_rows(0, 70_000, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_no_shift_clears_without_moving() {
        let mut wb = book_with_column(&[1.0, 2.0, 3.0]);
        wb.worksheet_mut(0)
            .unwrap()
            .set_cell_formula_at(0, 1, vec![Token::Ref(CellRef::new(2, 0))])
            .unwrap();
        wb.edit().delete_range(0, Range::cell(1, 0), InsertMode::NoShift).unwrap();
        assert_eq!(column(&wb, 3), vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(
            wb.worksheet(0).unwrap().formula_at(0, 1).unwrap().tokens,
            vec![Token::Ref(CellRef::new(2, 0))]
        );
    }

    #[test]
    fn test_move_range() {
        let mut wb = book_with_column(&[1.0, 2.0]);
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value_at(5, 3, 9.0).unwrap();
        sheet.set_cell_formula_at(0, 1, vec![Token::Ref(CellRef::new(1, 0))]).unwrap();
        sheet.set_cell_formula_at(1, 1, vec![Token::Ref(CellRef::new(5, 3))]).unwrap();

        let summary = wb.edit().move_range(0, Range::new(0, 0, 1, 0), 4, 3).unwrap();
        assert_eq!(summary.affected, Some(Range::new(4, 3, 5, 3)));
        let sheet = wb.worksheet(0).unwrap();
        assert_eq!(sheet.value_at(5, 3), CellValue::Number(2.0));
        assert_eq!(sheet.value_at(0, 0), CellValue::Empty);
        assert_eq!(sheet.formula_at(0, 1).unwrap().tokens, vec![Token::Ref(CellRef::new(5, 3))]);
        // D6 was overwritten by the move
        assert_eq!(sheet.formula_at(1, 1).unwrap().tokens, vec![Token::RefError]);
    }

    #[test]
    fn test_move_overlap_policy() {
        let mut wb = book_with_column(&[1.0, 2.0, 3.0]);
        wb.set_edit_options(EditOptions {
            move_overlap: MoveOverlap::Reject,
            ..EditOptions::default()
        });
        let err = wb.edit().move_range(0, Range::new(0, 0, 2, 0), 1, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(column(&wb, 3), vec![Some(1.0), Some(2.0), Some(3.0)]);

        wb.set_edit_options(EditOptions::default());
        wb.edit().move_range(0, Range::new(0, 0, 2, 0), 1, 0).unwrap();
        assert_eq!(column(&wb, 4), vec![None, Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_move_off_grid_fails() {
        let mut wb = book_with_column(&[1.0]);
        assert!(wb.edit().move_range(0, Range::new(0, 0, 1, 0), 65_535, 0).is_err());
        assert_eq!(column(&wb, 1), vec![Some(1.0)]);
    }

    #[test]
    fn test_copy_range_between_sheets() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value_at(0, 0, 4.0).unwrap();
        sheet
            .add_data_validation(DataValidation::list(vec![Token::Str("a,b".into())]).with_range(Range::cell(0, 0)).unwrap());

        wb.edit().copy_range(0, Range::cell(0, 0), 1, 3, 3).unwrap();
        let data = wb.worksheet(1).unwrap();
        assert_eq!(data.value_at(3, 3), CellValue::Number(4.0));
        assert!(data.data_validation_at(3, 3).is_some());
    }

    #[test]
    fn test_delete_sheets_widens_referenced_names() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Gone").unwrap();
        let target = Formula::new(vec![Token::Ref3d {
            sheet: 0,
            cell: CellRef::absolute(0, 0),
        }]);
        wb.define_name(NamedRange::sheet_scope("Kept", target.clone(), 1)).unwrap();
        wb.define_name(NamedRange::sheet_scope("Dropped", target, 1)).unwrap();
        wb.worksheet_mut(0)
            .unwrap()
            .set_cell_formula_at(0, 1, vec![Token::Name(0)])
            .unwrap();

        wb.edit().delete_sheets(1, 1).unwrap();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.names().len(), 1);
        let kept = wb.resolve_name("Kept", Some(0)).unwrap();
        assert_eq!(kept.scope, NameScope::Workbook);
        assert_eq!(
            wb.worksheet(0).unwrap().formula_at(0, 1).unwrap().tokens,
            vec![Token::Name(0)]
        );
    }

    #[test]
    fn test_delete_sheets_invalidates_3d_references() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Middle").unwrap();
        wb.add_worksheet_with_name("Last").unwrap();
        wb.worksheet_mut(0)
            .unwrap()
            .set_cell_formula_at(
                0,
                0,
                vec![
                    Token::Ref3d {
                        sheet: 1,
                        cell: CellRef::new(0, 0),
                    },
                    Token::Ref3d {
                        sheet: 2,
                        cell: CellRef::new(0, 0),
                    },
                ],
            )
            .unwrap();

        wb.remove_worksheet(1).unwrap();
        assert_eq!(
            wb.worksheet(0).unwrap().formula_at(0, 0).unwrap().tokens,
            vec![
                Token::RefError,
                Token::Ref3d {
                    sheet: 1,
                    cell: CellRef::new(0, 0)
                },
            ]
        );
        assert!(matches!(wb.edit().delete_sheets(1, 5), Err(Error::SheetOutOfBounds(5, 2))));
    }

    #[test]
    fn test_insert_sheets_moves_references() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        wb.define_name(NamedRange::sheet_scope("Local", vec![Token::Number(1.0)], 1))
            .unwrap();
        wb.worksheet_mut(0)
            .unwrap()
            .set_cell_formula_at(
                0,
                0,
                vec![Token::Ref3d {
                    sheet: 1,
                    cell: CellRef::new(0, 0),
                }],
            )
            .unwrap();

        wb.insert_worksheet(1, "Inserted").unwrap();
        assert_eq!(wb.sheet_index("Data"), Some(2));
        assert_eq!(wb.names().get(0).unwrap().scope, NameScope::Sheet(2));
        assert_eq!(
            wb.worksheet(0).unwrap().formula_at(0, 0).unwrap().tokens,
            vec![Token::Ref3d {
                sheet: 2,
                cell: CellRef::new(0, 0)
            }]
        );

        let sheets = vec![Worksheet::new("Twin"), Worksheet::new("TWIN")];
        assert!(matches!(wb.edit().insert_sheets(0, sheets), Err(Error::DuplicateSheetName(_))));
        assert_eq!(wb.sheet_count(), 3);
    }

    #[test]
    fn test_insert_range_from_other_document() {
        let mut source = Workbook::new();
        source.add_worksheet_with_name("Other").unwrap();
        source
            .define_name(NamedRange::workbook_scope("Rate", vec![Token::Number(0.2)]))
            .unwrap();
        source
            .worksheet_mut(0)
            .unwrap()
            .set_cell_formula_at(
                0,
                0,
                vec![
                    Token::Name(0),
                    Token::Ref3d {
                        sheet: 0,
                        cell: CellRef::new(1, 0),
                    },
                    Token::Ref3d {
                        sheet: 1,
                        cell: CellRef::new(1, 0),
                    },
                ],
            )
            .unwrap();

        let mut dest = book_with_column(&[7.0]);
        let summary = dest
            .edit()
            .insert_range_from(&source, 0, Range::cell(0, 0), 0, 0, 0, 1, 1, InsertMode::ShiftDown)
            .unwrap();
        assert_eq!(summary.cells_pasted, 1);
        assert_eq!(column(&dest, 2), vec![None, Some(7.0)]);
        assert_eq!(dest.names().get(0).unwrap().name, "Rate");
        assert_eq!(
            dest.worksheet(0).unwrap().formula_at(0, 0).unwrap().tokens,
            vec![
                Token::Name(0),
                Token::Ref3d {
                    sheet: 0,
                    cell: CellRef::new(1, 0)
                },
                Token::RefError,
            ]
        );
    }

    #[test]
    fn test_failed_edit_is_rolled_back() {
        let mut wb = book_with_column(&[1.0, 2.0]);
        // An absolute reference to the last row cannot be pushed off the grid
        wb.worksheet_mut(0)
            .unwrap()
            .set_cell_formula_at(0, 1, vec![Token::Ref(CellRef::absolute(65_535, 0))])
            .unwrap();
        let err = wb.edit().insert_rows(0, 0, 1).unwrap_err();
        assert!(matches!(err, Error::FormulaBounds(_)));
        assert_eq!(column(&wb, 2), vec![Some(1.0), Some(2.0)]);
    }
}
