//! Worksheet type

use log::trace;

use sheetshift_core::{
    Ascending, Axis, BandShift, CellRecord, CellValue, ColumnIndexedRow, DeletionTracker, Error, Formula,
    GridLimits, Keyed, OrderedIndex, Range, RangeSet, Result,
};

use crate::column::{ColumnInfo, ColumnInfoList};
use crate::conditional_format::ConditionalFormat;
use crate::page_break::{PageBreak, PageBreaks};
use crate::structure::{move_delta, ArrangeInsertRange, ArrangeMoveRange, EditContext, UpdateDeletedRanges};
use crate::validation::DataValidation;

/// One row: its cells plus row-level formatting
#[derive(Debug, Clone, Default)]
pub struct RowRecord {
    /// Row index (0-based)
    pub row: u32,
    /// Cells of the row
    pub cells: ColumnIndexedRow,
    /// Custom height in points (None = default)
    pub height: Option<f64>,
    /// Row is hidden
    pub hidden: bool,
}

impl RowRecord {
    /// Create an empty row record
    pub fn new(row: u32) -> Self {
        Self {
            row,
            ..Self::default()
        }
    }

    /// Whether the row carries formatting of its own
    pub fn has_format(&self) -> bool {
        self.height.is_some() || self.hidden
    }
}

impl Keyed for RowRecord {
    fn key(&self) -> u32 {
        self.row
    }
}

/// A chart series or title formula
///
/// Chart formulas are not hosted by a cell; their references always name a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLink {
    pub formula: Formula,
}

/// Where a formula of a worksheet lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaSite {
    /// A formula cell
    Cell { row: u32, col: u32 },
    /// A criterion of the data validation at this position
    Validation(usize),
    /// A rule formula of the conditional format at this position
    ConditionalFormat(usize),
    /// A chart link formula
    ChartLink(usize),
}

impl FormulaSite {
    /// Whether relative (2D) references of the formula resolve against the sheet
    pub fn is_hosted(&self) -> bool {
        !matches!(self, FormulaSite::ChartLink(_))
    }
}

/// Cells lifted out of a sheet, grouped by row
pub(crate) type TakenCells = Vec<(u32, Vec<CellRecord>)>;

/// A worksheet (single sheet in a workbook)
#[derive(Debug, Clone)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Sheet is visible
    visible: bool,
    /// Grid this sheet lives on
    limits: GridLimits,
    /// Row records keyed by row
    rows: OrderedIndex<RowRecord, Ascending>,
    /// Merged regions
    merged: RangeSet,
    /// Data validations
    data_validations: Vec<DataValidation>,
    /// Conditional formats
    conditional_formats: Vec<ConditionalFormat>,
    /// Column formatting
    columns: ColumnInfoList,
    /// Manual page breaks
    page_breaks: PageBreaks,
    /// Chart formulas
    chart_links: Vec<ChartLink>,
    /// Bounds of the used cells
    dimension: Option<Range>,
}

impl Worksheet {
    /// Create a new worksheet with the given name on the default grid
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_limits(name, GridLimits::default())
    }

    /// Create a new worksheet on a specific grid
    pub fn with_limits<S: Into<String>>(name: S, limits: GridLimits) -> Self {
        Self {
            name: name.into(),
            visible: true,
            limits,
            rows: OrderedIndex::default(),
            merged: RangeSet::merged_cells(),
            data_validations: Vec::new(),
            conditional_formats: Vec::new(),
            columns: ColumnInfoList::new(),
            page_breaks: PageBreaks::new(),
            chart_links: Vec::new(),
            dimension: None,
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Check if the sheet is visible
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Set sheet visibility
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// The grid this sheet lives on
    pub fn limits(&self) -> &GridLimits {
        &self.limits
    }

    // === Cell Access ===

    fn row_position(&self, row: u32) -> Option<usize> {
        let rows = self.rows.as_slice();
        if self.rows.is_sorted() {
            rows.binary_search_by(|r| r.row.cmp(&row)).ok()
        } else {
            rows.iter().position(|r| r.row == row)
        }
    }

    /// Get a row record
    pub fn row(&self, row: u32) -> Option<&RowRecord> {
        self.row_position(row).map(|at| &self.rows.as_slice()[at])
    }

    /// The record for `row`, created if missing
    fn row_entry(&mut self, row: u32) -> Result<&mut RowRecord> {
        self.limits.check_row(row)?;
        let (found, at) = self.rows.find_by(|r| r.row.cmp(&row));
        if !found {
            self.rows.insert(at, RowRecord::new(row))?;
        }
        self.rows.get_mut(at)
    }

    fn row_mut(&mut self, row: u32) -> Option<&mut RowRecord> {
        match self.rows.find_by(|r| r.row.cmp(&row)) {
            (true, at) => self.rows.get_mut(at).ok(),
            (false, _) => None,
        }
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u32) -> Option<&CellRecord> {
        self.row(row)?.cells.peek(col)
    }

    /// Get cell value (convenience method)
    pub fn value_at(&self, row: u32, col: u32) -> CellValue {
        self.cell_at(row, col).map(|c| c.value.clone()).unwrap_or_default()
    }

    /// Get the formula at a cell position (if it's a formula)
    pub fn formula_at(&self, row: u32, col: u32) -> Option<&Formula> {
        self.cell_at(row, col).and_then(|c| c.value.as_formula())
    }

    /// Set a cell value by address string (e.g. "B3")
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let range = Range::parse(address)?;
        if !range.is_single_cell() {
            return Err(Error::InvalidRange(format!("'{}' is not a single cell", address)));
        }
        self.set_cell_value_at(range.first_row, range.first_col, value)
    }

    /// Set a cell value by row and column indices, keeping its style
    pub fn set_cell_value_at<V: Into<CellValue>>(&mut self, row: u32, col: u32, value: V) -> Result<()> {
        self.limits.check_col(col)?;
        let value = value.into();
        let record = self.row_entry(row)?;
        match record.cells.get_mut(col) {
            Some(cell) => cell.value = value,
            None => {
                record.cells.set(CellRecord::new(col, value))?;
            }
        }
        self.extend_dimension(row, col);
        Ok(())
    }

    /// Set a cell formula by row and column indices
    pub fn set_cell_formula_at(&mut self, row: u32, col: u32, formula: impl Into<Formula>) -> Result<()> {
        self.set_cell_value_at(row, col, CellValue::formula(formula))
    }

    /// Set a cell's style index
    pub fn set_cell_style_at(&mut self, row: u32, col: u32, style_index: u32) -> Result<()> {
        self.limits.check_col(col)?;
        let record = self.row_entry(row)?;
        match record.cells.get_mut(col) {
            Some(cell) => cell.style_index = style_index,
            None => {
                record.cells.set(CellRecord::with_style(col, CellValue::Empty, style_index))?;
            }
        }
        self.extend_dimension(row, col);
        Ok(())
    }

    /// Store a whole cell record
    pub(crate) fn put_cell(&mut self, row: u32, cell: CellRecord) -> Result<()> {
        self.limits.check_col(cell.col)?;
        let col = cell.col;
        self.row_entry(row)?.cells.set(cell)?;
        self.extend_dimension(row, col);
        Ok(())
    }

    /// Clear a cell by indices, returning what it held
    pub fn clear_cell_at(&mut self, row: u32, col: u32) -> Result<Option<CellRecord>> {
        let Some(record) = self.row_mut(row) else {
            return Ok(None);
        };
        let removed = record.cells.remove(col)?;
        if removed.is_some() {
            self.drop_empty_rows();
            self.rebuild_dimension();
        }
        Ok(removed)
    }

    /// Get the number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).sum()
    }

    /// Check if the worksheet has no cells
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.cells.is_empty())
    }

    /// Iterate over all cells as `(row, cell)`, in storage order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, &CellRecord)> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.as_slice().iter().map(move |c| (r.row, c)))
    }

    /// Bounds of the used cells
    pub fn dimension(&self) -> Option<Range> {
        self.dimension
    }

    fn extend_dimension(&mut self, row: u32, col: u32) {
        let cell = Range::cell(row, col);
        self.dimension = Some(match self.dimension {
            Some(d) => d.union_bounds(&cell),
            None => cell,
        });
    }

    /// Recompute the used-cell bounds from the cells
    pub fn rebuild_dimension(&mut self) {
        let mut bounds: Option<Range> = None;
        for record in self.rows.iter() {
            let (Some(first), Some(last)) = (record.cells.first_col(), record.cells.last_col()) else {
                continue;
            };
            let span = Range::new(record.row, first, record.row, last);
            bounds = Some(match bounds {
                Some(b) => b.union_bounds(&span),
                None => span,
            });
        }
        self.dimension = bounds;
    }

    fn drop_empty_rows(&mut self) {
        self.rows.retain(|r| !r.cells.is_empty() || r.has_format());
    }

    // === Row and Column Formatting ===

    /// Get row height (None = default)
    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row(row).and_then(|r| r.height)
    }

    /// Set row height
    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<()> {
        self.row_entry(row)?.height = Some(height);
        Ok(())
    }

    /// Check if a row is hidden
    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.row(row).is_some_and(|r| r.hidden)
    }

    /// Set row hidden
    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) -> Result<()> {
        self.row_entry(row)?.hidden = hidden;
        self.drop_empty_rows();
        Ok(())
    }

    /// Get column width (None = default)
    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.columns.peek(col).and_then(|c| c.width)
    }

    /// Set column width
    pub fn set_column_width(&mut self, col: u32, width: f64) -> Result<()> {
        self.limits.check_col(col)?;
        let mut info = self.columns.get(col).cloned().unwrap_or_else(|| ColumnInfo::single(col));
        info.first = col;
        info.last = col;
        self.columns.set(info.with_width(width));
        Ok(())
    }

    /// Column formatting spans
    pub fn columns(&self) -> &ColumnInfoList {
        &self.columns
    }

    /// Column formatting spans, mutably
    pub fn columns_mut(&mut self) -> &mut ColumnInfoList {
        &mut self.columns
    }

    // === Merged Cells ===

    /// Get merged regions
    pub fn merged_regions(&self) -> &[Range] {
        self.merged.ranges()
    }

    /// The merged-cell set
    pub fn merged_cells(&self) -> &RangeSet {
        &self.merged
    }

    pub(crate) fn merged_cells_mut(&mut self) -> &mut RangeSet {
        &mut self.merged
    }

    /// Merged regions grouped the way MERGECELLS records hold them
    pub fn merged_records(&self) -> std::slice::Chunks<'_, Range> {
        self.merged.records(self.limits.max_merged_ranges_per_record)
    }

    /// Merge cells
    pub fn merge_cells(&mut self, range: &Range) -> Result<()> {
        if range.is_single_cell() {
            return Err(Error::InvalidRange(format!("cannot merge the single cell {}", range)));
        }
        if range.last_row > self.limits.last_row() || range.last_col > self.limits.last_col() {
            return Err(Error::InvalidRange(format!("{} is outside the grid", range)));
        }
        if let Some(enclosing) = self.merged.check_overlap(range) {
            return Err(Error::MergedCellConflict {
                range: *range,
                enclosing,
            });
        }
        self.merged.add(*range)
    }

    /// Unmerge cells
    pub fn unmerge_cells(&mut self, range: &Range) -> bool {
        self.merged.remove(range)
    }

    // === Data Validation ===

    /// Add a data validation rule
    pub fn add_data_validation(&mut self, validation: DataValidation) {
        self.data_validations.push(validation);
    }

    /// Get all data validations
    pub fn data_validations(&self) -> &[DataValidation] {
        &self.data_validations
    }

    /// Get data validations mutably
    pub fn data_validations_mut(&mut self) -> &mut Vec<DataValidation> {
        &mut self.data_validations
    }

    /// Get the data validation that applies to a cell
    pub fn data_validation_at(&self, row: u32, col: u32) -> Option<&DataValidation> {
        self.data_validations.iter().find(|v| v.applies_to(row, col))
    }

    // === Conditional Formatting ===

    /// Add a conditional format
    pub fn add_conditional_format(&mut self, format: ConditionalFormat) {
        self.conditional_formats.push(format);
    }

    /// Get all conditional formats
    pub fn conditional_formats(&self) -> &[ConditionalFormat] {
        &self.conditional_formats
    }

    /// Get conditional formats mutably
    pub fn conditional_formats_mut(&mut self) -> &mut Vec<ConditionalFormat> {
        &mut self.conditional_formats
    }

    /// Get all conditional formats that apply to a cell
    pub fn conditional_formats_at(&self, row: u32, col: u32) -> Vec<&ConditionalFormat> {
        self.conditional_formats
            .iter()
            .filter(|cf| cf.applies_to(row, col))
            .collect()
    }

    // === Page Breaks ===

    /// Add a manual break above `row`
    pub fn add_row_break(&mut self, row: u32) -> Result<()> {
        self.limits.check_row(row)?;
        let brk = PageBreak::new(row, self.limits.last_col());
        self.page_breaks.add(Axis::Rows, brk, self.limits.max_page_breaks)
    }

    /// Add a manual break left of `col`
    pub fn add_col_break(&mut self, col: u32) -> Result<()> {
        self.limits.check_col(col)?;
        let brk = PageBreak::new(col, self.limits.last_row());
        self.page_breaks.add(Axis::Columns, brk, self.limits.max_page_breaks)
    }

    /// Manual page breaks
    pub fn page_breaks(&self) -> &PageBreaks {
        &self.page_breaks
    }

    /// Manual page breaks, mutably
    pub fn page_breaks_mut(&mut self) -> &mut PageBreaks {
        &mut self.page_breaks
    }

    // === Charts ===

    /// Attach a chart formula to this sheet
    pub fn add_chart_link(&mut self, formula: impl Into<Formula>) {
        self.chart_links.push(ChartLink {
            formula: formula.into(),
        });
    }

    /// Chart formulas
    pub fn chart_links(&self) -> &[ChartLink] {
        &self.chart_links
    }

    // === Formulas ===

    /// Visit every formula of the sheet
    pub fn for_each_formula<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(FormulaSite, &Formula) -> Result<()>,
    {
        for (row, cell) in self.iter_cells() {
            if let Some(formula) = cell.value.as_formula() {
                f(FormulaSite::Cell { row, col: cell.col }, formula)?;
            }
        }
        for (i, dv) in self.data_validations.iter().enumerate() {
            for formula in dv.formulas() {
                f(FormulaSite::Validation(i), formula)?;
            }
        }
        for (i, cf) in self.conditional_formats.iter().enumerate() {
            for formula in cf.formulas() {
                f(FormulaSite::ConditionalFormat(i), formula)?;
            }
        }
        for (i, link) in self.chart_links.iter().enumerate() {
            f(FormulaSite::ChartLink(i), &link.formula)?;
        }
        Ok(())
    }

    /// Visit every formula of the sheet mutably
    pub fn for_each_formula_mut<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(FormulaSite, &mut Formula) -> Result<()>,
    {
        for record in self.rows.iter_mut() {
            let row = record.row;
            for cell in record.cells.iter_mut() {
                let col = cell.col;
                if let Some(formula) = cell.value.as_formula_mut() {
                    f(FormulaSite::Cell { row, col }, formula)?;
                }
            }
        }
        for (i, dv) in self.data_validations.iter_mut().enumerate() {
            for formula in dv.formulas_mut() {
                f(FormulaSite::Validation(i), formula)?;
            }
        }
        for (i, cf) in self.conditional_formats.iter_mut().enumerate() {
            for formula in cf.formulas_mut() {
                f(FormulaSite::ConditionalFormat(i), formula)?;
            }
        }
        for (i, link) in self.chart_links.iter_mut().enumerate() {
            f(FormulaSite::ChartLink(i), &mut link.formula)?;
        }
        Ok(())
    }

    // === Structural Editing ===

    /// Reject an insert that would push a cell off the grid
    fn check_cells_stay_on_grid(&self, shift: &BandShift) -> Result<()> {
        if shift.is_delete() {
            return Ok(());
        }
        let max = shift.max as i64;
        for (row, cell) in self.iter_cells() {
            let (along, across) = match shift.axis {
                Axis::Rows => (row, cell.col),
                Axis::Columns => (cell.col, row),
            };
            let target = along as i64 + shift.delta;
            if along >= shift.at && shift.covers_across(across, across) && target > max {
                return Err(Error::LimitExceeded {
                    what: match shift.axis {
                        Axis::Rows => "rows",
                        Axis::Columns => "columns",
                    },
                    limit: max as usize + 1,
                    requested: target as usize + 1,
                });
            }
        }
        Ok(())
    }

    /// Apply a band insert or delete to the cells
    fn shift_cells(&mut self, shift: &BandShift) -> Result<()> {
        if shift.is_noop() {
            return Ok(());
        }
        self.check_cells_stay_on_grid(shift)?;
        match shift.axis {
            Axis::Rows if shift.covers_across(0, self.limits.last_col()) => self.shift_row_records(shift),
            Axis::Rows => self.shift_row_fragments(shift)?,
            Axis::Columns => self.shift_column_cells(shift)?,
        }
        self.drop_empty_rows();
        Ok(())
    }

    /// Whole rows move with their formatting
    fn shift_row_records(&mut self, shift: &BandShift) {
        let deleted = shift.deleted_band();
        let max = shift.max as i64;
        self.rows.sort();
        self.rows.retain(|r| {
            let gone = deleted.is_some_and(|(f, l)| r.row >= f && r.row <= l) || shift.shift_first(r.row) > max;
            if gone {
                trace!("row {} removed by the edit", r.row);
            }
            !gone
        });
        // Survivors keep their relative order
        for record in self.rows.iter_mut() {
            record.row = shift.shift_first(record.row) as u32;
        }
    }

    /// Partial-width edits move cell fragments; row formatting stays put
    fn shift_row_fragments(&mut self, shift: &BandShift) -> Result<()> {
        let (lo, hi) = shift.across;
        let mut moved: TakenCells = Vec::new();
        for record in self.rows.iter_mut() {
            if record.row < shift.at {
                continue;
            }
            let cells = record.cells.take_range(lo, hi)?;
            if !cells.is_empty() {
                moved.push((record.row, cells));
            }
        }

        let deleted = shift.deleted_band();
        for (row, cells) in moved {
            if deleted.is_some_and(|(f, l)| row >= f && row <= l) {
                trace!("{} cell(s) of row {} deleted", cells.len(), row);
                continue;
            }
            let target = shift.shift_first(row);
            if target > shift.max as i64 {
                continue;
            }
            let record = self.row_entry(target as u32)?;
            for cell in cells {
                record.cells.set(cell)?;
            }
        }
        Ok(())
    }

    fn shift_column_cells(&mut self, shift: &BandShift) -> Result<()> {
        for record in self.rows.iter_mut() {
            if !shift.covers_across(record.row, record.row) {
                continue;
            }
            let dropped = record.cells.shift_columns(shift)?;
            if !dropped.is_empty() {
                trace!("{} cell(s) of row {} removed by the edit", dropped.len(), record.row);
            }
        }
        Ok(())
    }

    /// Remove and return the cells inside `area`
    pub(crate) fn take_cells(&mut self, area: &Range) -> Result<TakenCells> {
        let mut taken = Vec::new();
        for record in self.rows.iter_mut() {
            if record.row < area.first_row || record.row > area.last_row {
                continue;
            }
            let cells = record.cells.take_range(area.first_col, area.last_col)?;
            if !cells.is_empty() {
                taken.push((record.row, cells));
            }
        }
        Ok(taken)
    }

    /// Copies of the cells inside `area`
    pub(crate) fn copy_cells(&self, area: &Range) -> Vec<(u32, CellRecord)> {
        self.iter_cells()
            .filter(|(row, cell)| area.contains_cell(*row, cell.col))
            .map(|(row, cell)| (row, cell.clone()))
            .collect()
    }

    /// Delete the cells inside `area`
    pub fn clear_area(&mut self, area: &Range) -> Result<()> {
        self.take_cells(area)?;
        self.drop_empty_rows();
        self.rebuild_dimension();
        Ok(())
    }

    /// Move the cells of `source` by `(d_row, d_col)`, overwriting the destination
    fn move_cells(&mut self, source: &Range, d_row: i64, d_col: i64) -> Result<()> {
        let dest = source
            .offset(d_row, d_col)
            .filter(|d| d.last_row <= self.limits.last_row() && d.last_col <= self.limits.last_col())
            .ok_or_else(|| Error::InvalidRange(format!("{} moved off the grid", source)))?;
        let taken = self.take_cells(source)?;
        let overwritten = self.take_cells(&dest)?;
        if !overwritten.is_empty() {
            trace!("move into {} overwrote {} row(s) of cells", dest, overwritten.len());
        }
        for (row, cells) in taken {
            let record = self.row_entry((row as i64 + d_row) as u32)?;
            for mut cell in cells {
                cell.col = (cell.col as i64 + d_col) as u32;
                record.cells.set(cell)?;
            }
        }
        self.drop_empty_rows();
        Ok(())
    }

    fn drop_empty_rules(&mut self) {
        self.data_validations.retain(|v| !v.ranges.is_empty());
        self.conditional_formats.retain(|cf| !cf.ranges.is_empty());
    }
}

impl ArrangeInsertRange for Worksheet {
    fn arrange_insert_range(&mut self, shift: &BandShift, ctx: &EditContext<'_>) -> Result<()> {
        self.shift_cells(shift)?;
        self.merged.arrange_insert_range(shift, ctx)?;
        for dv in &mut self.data_validations {
            dv.arrange_insert_range(shift, ctx)?;
        }
        for cf in &mut self.conditional_formats {
            cf.arrange_insert_range(shift, ctx)?;
        }
        self.drop_empty_rules();
        self.columns.arrange_insert_range(shift, ctx)?;
        self.page_breaks.arrange_insert_range(shift, ctx)?;
        self.rebuild_dimension();
        Ok(())
    }
}

impl ArrangeMoveRange for Worksheet {
    fn arrange_move_range(&mut self, source: &Range, new_row: u32, new_col: u32, ctx: &EditContext<'_>) -> Result<()> {
        let (d_row, d_col) = move_delta(source, new_row, new_col);
        self.move_cells(source, d_row, d_col)?;
        self.merged.arrange_move_range(source, new_row, new_col, ctx)?;
        for dv in &mut self.data_validations {
            dv.arrange_move_range(source, new_row, new_col, ctx)?;
        }
        for cf in &mut self.conditional_formats {
            cf.arrange_move_range(source, new_row, new_col, ctx)?;
        }
        self.drop_empty_rules();
        self.rebuild_dimension();
        Ok(())
    }
}

impl UpdateDeletedRanges for Worksheet {
    fn update_deleted_ranges(&mut self, tracker: &DeletionTracker) -> Result<()> {
        self.for_each_formula_mut(|_, formula| tracker.remap_in_place(formula).map(|_| ()))
    }
}
