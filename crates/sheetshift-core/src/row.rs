//! Cell records of one row, keyed by column

use crate::cell::CellRecord;
use crate::error::Result;
use crate::ordered::{Ascending, OrderedIndex};
use crate::range::BandShift;

/// The cells of a single row, ordered by unique column
///
/// Columns are unique integers and usually dense, so a cell's position is almost
/// always close to its column number. [`find`](Self::find) starts there instead of in
/// the middle, which makes local edits O(1) on average.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndexedRow {
    cells: OrderedIndex<CellRecord, Ascending>,
}

impl ColumnIndexedRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the row has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Append a cell in file order
    ///
    /// Only compares against the previous last cell, so loading a row that is
    /// already in column order never forces a sort.
    pub fn add(&mut self, cell: CellRecord) {
        self.cells.add(cell);
    }

    /// Locate `col`, returning `(found, index)`
    ///
    /// When not found, `index` is where a cell for `col` must be inserted.
    pub fn find(&mut self, col: u32) -> (bool, usize) {
        self.cells.sort();
        let items = self.cells.as_slice();
        if items.is_empty() {
            return (false, 0);
        }

        let target = col as i64;
        let mut lo: i64 = 0;
        let mut hi: i64 = items.len() as i64 - 1;
        let mut guess = target.clamp(lo, hi);

        while lo <= hi {
            let found = items[guess as usize].col as i64;
            if found == target {
                return (true, guess as usize);
            }
            // Unique increasing columns: the target is at most |target - found|
            // positions away from the probe.
            if found < target {
                lo = guess + 1;
                guess += target - found;
            } else {
                hi = guess - 1;
                guess -= found - target;
            }
            if lo > hi {
                break;
            }
            guess = guess.clamp(lo, hi);
        }
        (false, lo as usize)
    }

    /// Look up `col` without sorting
    ///
    /// Binary search when the row is known to be sorted, a linear scan otherwise.
    pub fn peek(&self, col: u32) -> Option<&CellRecord> {
        let items = self.cells.as_slice();
        if self.cells.is_sorted() {
            items.binary_search_by(|c| c.col.cmp(&col)).ok().map(|i| &items[i])
        } else {
            items.iter().find(|c| c.col == col)
        }
    }

    /// Get the cell at `col`
    pub fn get(&mut self, col: u32) -> Option<&CellRecord> {
        match self.find(col) {
            (true, at) => self.cells.get(at).ok(),
            (false, _) => None,
        }
    }

    /// Get the cell at `col` mutably
    pub fn get_mut(&mut self, col: u32) -> Option<&mut CellRecord> {
        match self.find(col) {
            (true, at) => self.cells.get_mut(at).ok(),
            (false, _) => None,
        }
    }

    /// Store a cell, returning the one it replaced
    pub fn set(&mut self, cell: CellRecord) -> Result<Option<CellRecord>> {
        match self.find(cell.col) {
            (true, at) => {
                let slot = self.cells.get_mut(at)?;
                Ok(Some(std::mem::replace(slot, cell)))
            }
            (false, at) => {
                self.cells.insert(at, cell)?;
                Ok(None)
            }
        }
    }

    /// Remove the cell at `col`
    pub fn remove(&mut self, col: u32) -> Result<Option<CellRecord>> {
        match self.find(col) {
            (true, at) => Ok(Some(self.cells.delete(at)?)),
            (false, _) => Ok(None),
        }
    }

    /// Remove and return every cell with a column in `[first, last]`
    pub fn take_range(&mut self, first: u32, last: u32) -> Result<Vec<CellRecord>> {
        let (_, start) = self.find(first);
        let end = match last.checked_add(1) {
            Some(next) => self.find(next).1,
            None => self.cells.len(),
        };
        let mut taken = Vec::with_capacity(end.saturating_sub(start));
        if end > start {
            self.cells.delete_range(start, end - start, |c| taken.push(c))?;
        }
        Ok(taken)
    }

    /// Apply a column insert/delete to this row's cells
    ///
    /// Returns the cells that left the row: those inside a deleted band and those
    /// pushed past the last column.
    pub fn shift_columns(&mut self, shift: &BandShift) -> Result<Vec<CellRecord>> {
        if shift.is_noop() {
            return Ok(Vec::new());
        }
        let mut moved = self.take_range(shift.at, u32::MAX)?;
        let mut dropped = Vec::new();
        let max = shift.max as i64;

        for mut cell in moved.drain(..) {
            let col = cell.col;
            let new_col = shift.shift_first(col);
            let in_deleted_band = shift.deleted_band().is_some_and(|(f, l)| col >= f && col <= l);
            if in_deleted_band || new_col > max {
                dropped.push(cell);
            } else {
                cell.col = new_col as u32;
                // Relative order is preserved, so appending keeps the row sorted
                self.cells.add(cell);
            }
        }
        Ok(dropped)
    }

    /// Iterate over cells in column order
    pub fn iter(&mut self) -> std::slice::Iter<'_, CellRecord> {
        self.cells.sort();
        self.cells.iter()
    }

    /// Iterate mutably over cells. Columns must not be changed.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CellRecord> {
        self.cells.sort();
        self.cells.iter_mut()
    }

    /// Cells in their current (possibly unsorted) order, without sorting
    pub fn as_slice(&self) -> &[CellRecord] {
        self.cells.as_slice()
    }

    /// Highest column with a cell
    pub fn last_col(&self) -> Option<u32> {
        self.cells.iter().map(|c| c.col).max()
    }

    /// Lowest column with a cell
    pub fn first_col(&self) -> Option<u32> {
        self.cells.iter().map(|c| c.col).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use crate::range::Axis;
    use pretty_assertions::assert_eq;

    fn row_with(cols: &[u32]) -> ColumnIndexedRow {
        let mut row = ColumnIndexedRow::new();
        for &c in cols {
            row.add(CellRecord::new(c, c as f64));
        }
        row
    }

    fn cols(row: &mut ColumnIndexedRow) -> Vec<u32> {
        row.iter().map(|c| c.col).collect()
    }

    #[test]
    fn test_find_dense_and_sparse() {
        let mut dense = row_with(&[0, 1, 2, 3, 4, 5]);
        assert_eq!(dense.find(3), (true, 3));
        assert_eq!(dense.find(9), (false, 6));

        let mut sparse = row_with(&[2, 7, 8, 40, 41, 100]);
        assert_eq!(sparse.find(2), (true, 0));
        assert_eq!(sparse.find(41), (true, 4));
        assert_eq!(sparse.find(100), (true, 5));
        assert_eq!(sparse.find(0), (false, 0));
        assert_eq!(sparse.find(9), (false, 3));
        assert_eq!(sparse.find(50), (false, 5));
        assert_eq!(sparse.find(200), (false, 6));
    }

    #[test]
    fn test_find_agrees_with_binary_search() {
        let layout: Vec<u32> = (0..60).filter(|c| c % 3 != 1 && c % 7 != 0).collect();
        let mut row = row_with(&layout);
        for target in 0..70 {
            let expected = match layout.binary_search(&target) {
                Ok(i) => (true, i),
                Err(i) => (false, i),
            };
            assert_eq!(row.find(target), expected, "column {}", target);
        }
    }

    #[test]
    fn test_file_order_add_never_sorts() {
        let mut row = row_with(&[0, 3, 5]);
        assert!(row.cells.is_sorted());
        row.add(CellRecord::new(1, 1.0));
        assert!(!row.cells.is_sorted());
        assert_eq!(cols(&mut row), vec![0, 1, 3, 5]);
    }

    #[test]
    fn test_set_replace_remove() {
        let mut row = row_with(&[1, 4]);
        assert!(row.set(CellRecord::new(2, "x")).unwrap().is_none());
        let old = row.set(CellRecord::new(4, "y")).unwrap().unwrap();
        assert_eq!(old.value, CellValue::Number(4.0));
        assert_eq!(cols(&mut row), vec![1, 2, 4]);
        assert_eq!(row.get(4).map(|c| c.value.clone()), Some(CellValue::from("y")));

        row.add(CellRecord::new(0, 0.0));
        assert_eq!(row.peek(0).map(|c| c.col), Some(0));
        assert!(row.peek(3).is_none());

        assert!(row.remove(2).unwrap().is_some());
        assert!(row.remove(2).unwrap().is_none());
        assert_eq!(cols(&mut row), vec![0, 1, 4]);
    }

    #[test]
    fn test_take_range() {
        let mut row = row_with(&[0, 2, 4, 6, 8]);
        let taken = row.take_range(2, 6).unwrap();
        assert_eq!(taken.iter().map(|c| c.col).collect::<Vec<_>>(), vec![2, 4, 6]);
        assert_eq!(cols(&mut row), vec![0, 8]);
    }

    #[test]
    fn test_shift_columns() {
        let mut row = row_with(&[0, 2, 4, 254]);
        let insert = BandShift::insert(Axis::Columns, 2, 1, (0, 65_535), 255);
        let dropped = row.shift_columns(&insert).unwrap();
        assert_eq!(cols(&mut row), vec![0, 3, 5, 255]);
        assert!(dropped.is_empty());

        let delete = BandShift::delete(Axis::Columns, 3, 2, (0, 65_535), 255);
        let dropped = row.shift_columns(&delete).unwrap();
        assert_eq!(dropped.iter().map(|c| c.col).collect::<Vec<_>>(), vec![3]);
        assert_eq!(cols(&mut row), vec![0, 3, 253]);
    }
}
