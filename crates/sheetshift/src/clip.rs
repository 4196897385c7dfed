//! Copied sheet content, captured before an edit and pasted after it
//!
//! A [`Clip`] is an owned snapshot of one rectangle: the cells, the merged regions
//! inside it, the pieces of validations and conditional formats reaching into it and,
//! for whole rows or columns, page breaks and column formatting. Holding a snapshot
//! means a sheet never copies from itself while it is being written.

use ahash::AHashMap;
use log::trace;

use sheetshift_core::{
    Axis, CellRecord, Formula, FormulaEdit, FormulaRewriter, NamedRange, Range, RangeSet, Result, Token,
};

use crate::column::ColumnInfo;
use crate::conditional_format::ConditionalFormat;
use crate::page_break::PageBreak;
use crate::structure::EditContext;
use crate::validation::DataValidation;
use crate::worksheet::Worksheet;

/// An owned copy of a rectangle of one sheet
#[derive(Debug, Clone)]
pub struct Clip {
    area: Range,
    /// Cells as `(row offset, col offset, cell)` from the area's origin
    cells: Vec<(u32, u32, CellRecord)>,
    merged: Vec<Range>,
    validations: Vec<DataValidation>,
    conditional_formats: Vec<ConditionalFormat>,
    row_breaks: Vec<PageBreak>,
    col_breaks: Vec<PageBreak>,
    columns: Vec<ColumnInfo>,
}

impl Clip {
    /// Capture `area` of `sheet`
    pub fn capture(sheet: &Worksheet, area: &Range) -> Self {
        let limits = sheet.limits();
        let full_rows = area.first_col == 0 && area.last_col >= limits.last_col();
        let full_cols = area.first_row == 0 && area.last_row >= limits.last_row();

        let cells = sheet
            .copy_cells(area)
            .into_iter()
            .map(|(row, cell)| (row - area.first_row, cell.col - area.first_col, cell))
            .collect();

        Self {
            area: *area,
            cells,
            merged: sheet.merged_cells().clip(area),
            validations: sheet.data_validations().iter().filter_map(|v| v.clip(area)).collect(),
            conditional_formats: sheet
                .conditional_formats()
                .iter()
                .filter_map(|cf| cf.clip(area))
                .collect(),
            row_breaks: if full_rows {
                sheet.page_breaks().clip(Axis::Rows, area.first_row, area.last_row)
            } else {
                Vec::new()
            },
            col_breaks: if full_cols {
                sheet.page_breaks().clip(Axis::Columns, area.first_col, area.last_col)
            } else {
                Vec::new()
            },
            columns: if full_cols {
                sheet.columns().clip(area.first_col, area.last_col)
            } else {
                Vec::new()
            },
        }
    }

    /// The captured rectangle
    pub fn area(&self) -> &Range {
        &self.area
    }

    /// Number of captured cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn formulas_mut(&mut self) -> impl Iterator<Item = &mut Formula> {
        let cells = self.cells.iter_mut().filter_map(|(_, _, c)| c.value.as_formula_mut());
        let validations = self.validations.iter_mut().flat_map(|v| v.formulas_mut());
        let formats = self.conditional_formats.iter_mut().flat_map(|cf| cf.formulas_mut());
        cells.chain(validations).chain(formats)
    }

    /// Re-home the clip's formulas from the source document of `ctx`
    ///
    /// References to the source sheet point at the destination sheet; references to
    /// other sheets of the source document become `#REF!`. Names are matched by text
    /// as seen from the destination sheet. Names the destination lacks are returned,
    /// in the order they must be appended to its registry, as workbook-scoped copies
    /// with their own references invalidated. An in-place context changes nothing.
    pub fn import(&mut self, ctx: &EditContext<'_>) -> Result<Vec<NamedRange>> {
        if !ctx.is_cross_document() {
            return Ok(Vec::new());
        }
        let mut names = NameImport::new(ctx);
        let (source_sheet, dest_sheet) = (ctx.source_sheet, ctx.dest_sheet);
        for formula in self.formulas_mut() {
            for token in formula.tokens.iter_mut() {
                let replacement = match token {
                    Token::Ref3d { sheet, cell } if *sheet == source_sheet => Some(Token::Ref3d {
                        sheet: dest_sheet,
                        cell: *cell,
                    }),
                    Token::Area3d { sheet, area } if *sheet == source_sheet => Some(Token::Area3d {
                        sheet: dest_sheet,
                        area: *area,
                    }),
                    Token::Ref3d { .. } | Token::Area3d { .. } => Some(Token::RefError),
                    Token::Name(index) => Some(Token::Name(names.position(*index)?)),
                    _ => None,
                };
                if let Some(replacement) = replacement {
                    *token = replacement;
                }
            }
        }
        Ok(names.pending)
    }

    /// Paste the clip tiled over `block` of `sheet`
    ///
    /// Formulas are adjusted by the offset of each tile; merged regions that would
    /// overlap surviving merges are skipped. Returns the number of cells written.
    pub fn paste<R: FormulaRewriter + ?Sized>(
        &self,
        sheet: &mut Worksheet,
        block: &Range,
        rewriter: &R,
        ctx: &EditContext<'_>,
    ) -> Result<usize> {
        let height = self.area.row_count();
        let width = self.area.col_count();
        let limits = *ctx.limits();
        let mut written = 0;

        let mut tile_row = block.first_row;
        while tile_row <= block.last_row {
            let mut tile_col = block.first_col;
            while tile_col <= block.last_col {
                let d_row = tile_row as i64 - self.area.first_row as i64;
                let d_col = tile_col as i64 - self.area.first_col as i64;
                let copy = FormulaEdit::CopyDelta { d_row, d_col };
                let host = Some(ctx.dest_sheet);

                for (row_off, col_off, cell) in &self.cells {
                    let (row, col) = (tile_row + row_off, tile_col + col_off);
                    if row > block.last_row || col > block.last_col {
                        continue;
                    }
                    let mut cell = cell.clone();
                    cell.col = col;
                    if let Some(formula) = cell.value.as_formula_mut() {
                        if let Some(rewritten) = rewriter.rewrite(formula, host, &copy)? {
                            *formula = rewritten;
                        }
                    }
                    sheet.put_cell(row, cell)?;
                    written += 1;
                }

                for r in &self.merged {
                    let Some(moved) = r.offset(d_row, d_col).filter(|m| block.contains(m)) else {
                        continue;
                    };
                    if let Some(existing) = sheet.merged_cells().check_overlap(&moved) {
                        trace!("pasted merge {} skipped, overlaps {}", moved, existing);
                        continue;
                    }
                    sheet.merged_cells_mut().add(moved)?;
                }

                for dv in &self.validations {
                    let mut ranges = RangeSet::validation(limits.max_validation_ranges);
                    ranges.paste(dv.ranges.ranges(), d_row, d_col, block.last_row, block.last_col)?;
                    if ranges.is_empty() {
                        continue;
                    }
                    let mut pasted = DataValidation { ranges, ..dv.clone() };
                    for formula in pasted.formulas_mut() {
                        if let Some(rewritten) = rewriter.rewrite(formula, host, &copy)? {
                            *formula = rewritten;
                        }
                    }
                    sheet.add_data_validation(pasted);
                }

                for cf in &self.conditional_formats {
                    let mut ranges = RangeSet::conditional_format();
                    ranges.paste(cf.ranges.ranges(), d_row, d_col, block.last_row, block.last_col)?;
                    if ranges.is_empty() {
                        continue;
                    }
                    let mut pasted = ConditionalFormat {
                        ranges,
                        rules: cf.rules.clone(),
                    };
                    for formula in pasted.formulas_mut() {
                        if let Some(rewritten) = rewriter.rewrite(formula, host, &copy)? {
                            *formula = rewritten;
                        }
                    }
                    sheet.add_conditional_format(pasted);
                }

                if !self.row_breaks.is_empty() && d_col == 0 {
                    sheet.page_breaks_mut().paste(Axis::Rows, &self.row_breaks, d_row, ctx)?;
                }
                if !self.col_breaks.is_empty() && d_row == 0 {
                    sheet.page_breaks_mut().paste(Axis::Columns, &self.col_breaks, d_col, ctx)?;
                }
                if d_row == 0 {
                    for info in &self.columns {
                        let (first, last) = (info.first as i64 + d_col, info.last as i64 + d_col);
                        if first < 0 || last > limits.last_col() as i64 {
                            continue;
                        }
                        sheet.columns_mut().set(ColumnInfo {
                            first: first as u32,
                            last: last as u32,
                            ..info.clone()
                        });
                    }
                }

                tile_col = match tile_col.checked_add(width) {
                    Some(next) => next,
                    None => break,
                };
            }
            tile_row = match tile_row.checked_add(height) {
                Some(next) => next,
                None => break,
            };
        }
        sheet.rebuild_dimension();
        Ok(written)
    }
}

/// Maps source name positions to destination positions, queuing missing names
struct NameImport<'c> {
    ctx: &'c EditContext<'c>,
    pending: Vec<NamedRange>,
    /// Lowercased text of each pending name, to its destination position
    queued: AHashMap<String, usize>,
}

impl<'c> NameImport<'c> {
    fn new(ctx: &'c EditContext<'c>) -> Self {
        Self {
            ctx,
            pending: Vec::new(),
            queued: AHashMap::new(),
        }
    }

    /// Destination position for name `index` of the source document
    fn position(&mut self, index: usize) -> Result<usize> {
        let ctx = self.ctx;
        let source = ctx.source_globals.names.get(index)?;
        let dest_names = &ctx.dest_globals.names;
        if let Some(found) = dest_names.resolve(&source.name, Some(ctx.dest_sheet)) {
            return Ok(found);
        }
        let key = source.name.to_lowercase();
        if let Some(&at) = self.queued.get(&key) {
            return Ok(at);
        }
        let tokens = source
            .formula
            .tokens
            .iter()
            .map(|t| match t {
                Token::Name(_) => Token::NameError,
                Token::Ref3d { .. } | Token::Area3d { .. } => Token::RefError,
                other => other.clone(),
            })
            .collect::<Vec<_>>();
        let at = dest_names.len() + self.pending.len();
        trace!("name '{}' copied into the destination document at {}", source.name, at);
        self.pending
            .push(NamedRange::workbook_scope(source.name.clone(), tokens).with_flags(source.flags));
        self.queued.insert(key, at);
        Ok(at)
    }
}
