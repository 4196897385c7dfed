//! Rectangular cell ranges and the axis helpers used by structural edits

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::limits::{XLSX_MAX_COLS, XLSX_MAX_ROWS};

/// The axis a structural edit runs along
///
/// `Rows` means whole bands of rows are inserted or removed (cells shift down/up);
/// `Columns` means bands of columns (cells shift right/left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    Rows,
    Columns,
}

impl Axis {
    /// The orthogonal axis
    pub fn other(self) -> Axis {
        match self {
            Axis::Rows => Axis::Columns,
            Axis::Columns => Axis::Rows,
        }
    }
}

/// A rectangular block of cells, inclusive on both ends
///
/// Always normalized: `first_row <= last_row` and `first_col <= last_col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Range {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl Range {
    /// Create a new range, swapping bounds as needed so it is normalized
    pub fn new(first_row: u32, first_col: u32, last_row: u32, last_col: u32) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    /// A one-cell range
    pub fn cell(row: u32, col: u32) -> Self {
        Self::new(row, col, row, col)
    }

    /// Build a range from its extents along `axis` and the orthogonal axis
    pub fn from_spans(axis: Axis, along: (u32, u32), across: (u32, u32)) -> Self {
        match axis {
            Axis::Rows => Self::new(along.0, across.0, along.1, across.1),
            Axis::Columns => Self::new(across.0, along.0, across.1, along.1),
        }
    }

    /// First index along `axis`
    pub fn first(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Rows => self.first_row,
            Axis::Columns => self.first_col,
        }
    }

    /// Last index along `axis`
    pub fn last(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Rows => self.last_row,
            Axis::Columns => self.last_col,
        }
    }

    /// `(first, last)` along `axis`
    pub fn span(&self, axis: Axis) -> (u32, u32) {
        (self.first(axis), self.last(axis))
    }

    /// Replace the extent along `axis`
    pub fn with_span(&self, axis: Axis, first: u32, last: u32) -> Self {
        match axis {
            Axis::Rows => Self::new(first, self.first_col, last, self.last_col),
            Axis::Columns => Self::new(self.first_row, first, self.last_row, last),
        }
    }

    /// Number of bands along `axis`
    pub fn extent(&self, axis: Axis) -> u32 {
        self.last(axis) - self.first(axis) + 1
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.extent(Axis::Rows)
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u32 {
        self.extent(Axis::Columns)
    }

    /// Get the total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Check if this range covers exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }

    /// Check if a cell is within this range
    pub fn contains_cell(&self, row: u32, col: u32) -> bool {
        row >= self.first_row && row <= self.last_row && col >= self.first_col && col <= self.last_col
    }

    /// Check if `other` lies entirely inside this range
    pub fn contains(&self, other: &Range) -> bool {
        other.first_row >= self.first_row
            && other.last_row <= self.last_row
            && other.first_col >= self.first_col
            && other.last_col <= self.last_col
    }

    /// Check if this range overlaps with another
    pub fn intersects(&self, other: &Range) -> bool {
        self.first_row <= other.last_row
            && self.last_row >= other.first_row
            && self.first_col <= other.last_col
            && self.last_col >= other.first_col
    }

    /// Get the intersection of two ranges, if any
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if !self.intersects(other) {
            return None;
        }
        Some(Range::new(
            self.first_row.max(other.first_row),
            self.first_col.max(other.first_col),
            self.last_row.min(other.last_row),
            self.last_col.min(other.last_col),
        ))
    }

    /// Smallest range enclosing both
    pub fn union_bounds(&self, other: &Range) -> Range {
        Range::new(
            self.first_row.min(other.first_row),
            self.first_col.min(other.first_col),
            self.last_row.max(other.last_row),
            self.last_col.max(other.last_col),
        )
    }

    /// Translate by a signed offset, or `None` if a bound would go negative or overflow
    pub fn offset(&self, d_row: i64, d_col: i64) -> Option<Range> {
        let shift = |v: u32, d: i64| u32::try_from(v as i64 + d).ok();
        Some(Range {
            first_row: shift(self.first_row, d_row)?,
            first_col: shift(self.first_col, d_col)?,
            last_row: shift(self.last_row, d_row)?,
            last_col: shift(self.last_col, d_col)?,
        })
    }

    /// Split along the axis orthogonal to `axis` at `[lo, hi]`
    ///
    /// Returns the fragments outside `[lo, hi]` (zero, one or two of them) and the
    /// fragment inside, if any. Together they cover this range exactly once.
    pub fn split_across(&self, axis: Axis, lo: u32, hi: u32) -> (Vec<Range>, Option<Range>) {
        let across = axis.other();
        let (first, last) = self.span(across);
        let mut outside = Vec::new();

        if last < lo || first > hi {
            outside.push(*self);
            return (outside, None);
        }
        if first < lo {
            outside.push(self.with_span(across, first, lo - 1));
        }
        if last > hi {
            outside.push(self.with_span(across, hi + 1, last));
        }
        let inside = self.with_span(across, first.max(lo), last.min(hi));
        (outside, Some(inside))
    }

    /// Cut `hole` out of this range
    ///
    /// Produces at most four fragments: full-width bands above and below the hole and
    /// the pieces left and right of it.
    pub fn subtract(&self, hole: &Range) -> Vec<Range> {
        let Some(hole) = self.intersection(hole) else {
            return vec![*self];
        };
        let mut parts = Vec::with_capacity(4);
        if hole.first_row > self.first_row {
            parts.push(Range::new(self.first_row, self.first_col, hole.first_row - 1, self.last_col));
        }
        if hole.last_row < self.last_row {
            parts.push(Range::new(hole.last_row + 1, self.first_col, self.last_row, self.last_col));
        }
        if hole.first_col > self.first_col {
            parts.push(Range::new(hole.first_row, self.first_col, hole.last_row, hole.first_col - 1));
        }
        if hole.last_col < self.last_col {
            parts.push(Range::new(hole.first_row, hole.last_col + 1, hole.last_row, self.last_col));
        }
        parts
    }

    /// Parse a range from A1:B10 notation (`$` markers are accepted and ignored)
    ///
    /// # Examples
    /// ```
    /// use sheetshift_core::Range;
    ///
    /// let range = Range::parse("B2:$D$4").unwrap();
    /// assert_eq!(range, Range::new(1, 1, 3, 3));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((start, end)) => {
                let (r1, c1) = parse_cell(start)?;
                let (r2, c2) = parse_cell(end)?;
                Ok(Self::new(r1, c1, r2, c2))
            }
            None => {
                let (row, col) = parse_cell(s)?;
                Ok(Self::cell(row, col))
            }
        }
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        let start = cell_to_a1(self.first_row, self.first_col);
        if self.is_single_cell() {
            start
        } else {
            format!("{}:{}", start, cell_to_a1(self.last_row, self.last_col))
        }
    }
}

/// One band insert or delete along an axis, restricted to a span of the other axis
///
/// Inserting `n` bands at `at` is `delta = n`; deleting bands `at..at+n` is
/// `delta = -n`. Bounds before `at` never move. On delete, a bound inside the removed
/// band is pulled to the band's edge, so a span wholly inside it collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandShift {
    /// Axis the bands run along
    pub axis: Axis,
    /// First band touched by the edit
    pub at: u32,
    /// Signed band count
    pub delta: i64,
    /// Inclusive span of the orthogonal axis the edit applies to
    pub across: (u32, u32),
    /// Last valid index along `axis`
    pub max: u32,
}

impl BandShift {
    /// Insert `count` bands at `at`
    pub fn insert(axis: Axis, at: u32, count: u32, across: (u32, u32), max: u32) -> Self {
        Self {
            axis,
            at,
            delta: count as i64,
            across,
            max,
        }
    }

    /// Delete `count` bands starting at `at`
    pub fn delete(axis: Axis, at: u32, count: u32, across: (u32, u32), max: u32) -> Self {
        Self {
            axis,
            at,
            delta: -(count as i64),
            across,
            max,
        }
    }

    /// Whether the edit changes nothing
    pub fn is_noop(&self) -> bool {
        self.delta == 0
    }

    /// Whether this edit removes bands
    pub fn is_delete(&self) -> bool {
        self.delta < 0
    }

    /// The removed band as `(first, last)`, for deletes
    pub fn deleted_band(&self) -> Option<(u32, u32)> {
        if self.delta >= 0 {
            return None;
        }
        let last = (self.at as i64 - self.delta - 1).min(self.max as i64);
        Some((self.at, last as u32))
    }

    /// The rectangle the edit inserts or removes
    pub fn band_range(&self) -> Range {
        let last = (self.at as i64 + self.delta.abs() - 1).min(self.max as i64) as u32;
        Range::from_spans(self.axis, (self.at, last), self.across)
    }

    /// Whether `[lo, hi]` on the orthogonal axis lies inside the edit's span
    pub fn covers_across(&self, lo: u32, hi: u32) -> bool {
        lo >= self.across.0 && hi <= self.across.1
    }

    /// Whether `[lo, hi]` on the orthogonal axis touches the edit's span at all
    pub fn touches_across(&self, lo: u32, hi: u32) -> bool {
        lo <= self.across.1 && hi >= self.across.0
    }

    /// New position of a lower bound. May exceed `max`.
    pub fn shift_first(&self, bound: u32) -> i64 {
        let (b, at) = (bound as i64, self.at as i64);
        if b < at {
            b
        } else if self.delta >= 0 || b >= at - self.delta {
            b + self.delta
        } else {
            at
        }
    }

    /// New position of an upper bound. May exceed `max` or fall below `at`.
    pub fn shift_last(&self, bound: u32) -> i64 {
        let (b, at) = (bound as i64, self.at as i64);
        if b < at {
            b
        } else if self.delta >= 0 || b >= at - self.delta {
            b + self.delta
        } else {
            at - 1
        }
    }

    /// Shift a `[first, last]` span, clipping to `max`
    ///
    /// Returns `None` when the span collapses or is pushed entirely off the grid.
    pub fn apply_span(&self, first: u32, last: u32) -> Option<(u32, u32)> {
        let f = self.shift_first(first);
        let l = self.shift_last(last).min(self.max as i64);
        if f > l {
            return None;
        }
        Some((f as u32, l as u32))
    }

    /// Shift a range that lies inside the edit's orthogonal span
    pub fn apply(&self, range: &Range) -> Option<Range> {
        let (first, last) = range.span(self.axis);
        let (f, l) = self.apply_span(first, last)?;
        Some(range.with_span(self.axis, f, l))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for Range {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
pub fn column_to_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col + 1;

    while n > 0 {
        n -= 1;
        let c = ((n % 26) as u8 + b'A') as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
pub fn letters_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::InvalidRange("empty column letters".into()));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidRange(format!("invalid column letter '{}'", c)));
        }
        col = col
            .saturating_mul(26)
            .saturating_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }

    let col = col - 1;
    if col >= XLSX_MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col, XLSX_MAX_COLS - 1));
    }
    Ok(col)
}

fn cell_to_a1(row: u32, col: u32) -> String {
    format!("{}{}", column_to_letters(col), row as u64 + 1)
}

fn parse_cell(s: &str) -> Result<(u32, u32)> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidRange("empty address".into()));
    }
    let bytes = s.as_bytes();
    let mut pos = 0;

    if bytes.get(pos) == Some(&b'$') {
        pos += 1;
    }
    let col_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
        pos += 1;
    }
    if pos == col_start {
        return Err(Error::InvalidRange(format!("no column letters in '{}'", s)));
    }
    let col = letters_to_column(&s[col_start..pos])?;

    if bytes.get(pos) == Some(&b'$') {
        pos += 1;
    }
    let row: u32 = s[pos..]
        .parse()
        .map_err(|_| Error::InvalidRange(format!("invalid row number in '{}'", s)))?;
    if row == 0 {
        return Err(Error::InvalidRange(format!("row number must be >= 1 in '{}'", s)));
    }
    let row = row - 1;
    if row >= XLSX_MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, XLSX_MAX_ROWS - 1));
    }
    Ok((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(25), "Z");
        assert_eq!(column_to_letters(26), "AA");
        assert_eq!(column_to_letters(701), "ZZ");
        assert_eq!(column_to_letters(16383), "XFD");

        assert_eq!(letters_to_column("A").unwrap(), 0);
        assert_eq!(letters_to_column("aa").unwrap(), 26);
        assert_eq!(letters_to_column("XFD").unwrap(), 16383);
        assert!(letters_to_column("XFE").is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let range = Range::parse("A1:F6").unwrap();
        assert_eq!(range, Range::new(0, 0, 5, 5));
        assert_eq!(range.to_string(), "A1:F6");

        // Normalized regardless of corner order
        assert_eq!(Range::parse("C3:A1").unwrap(), Range::new(0, 0, 2, 2));
        assert_eq!(Range::parse("$B$2").unwrap(), Range::cell(1, 1));
        assert_eq!(Range::cell(1, 1).to_string(), "B2");

        assert!(Range::parse("").is_err());
        assert!(Range::parse("A0").is_err());
        assert!(Range::parse("1:2").is_err());
    }

    #[test]
    fn test_intersection_and_union() {
        let a = Range::new(0, 0, 5, 5);
        let b = Range::new(3, 3, 8, 8);
        assert_eq!(a.intersection(&b), Some(Range::new(3, 3, 5, 5)));
        assert_eq!(a.union_bounds(&b), Range::new(0, 0, 8, 8));
        assert!(a.intersection(&Range::new(6, 0, 7, 0)).is_none());
        assert!(a.contains(&Range::new(1, 1, 2, 2)));
        assert!(!a.contains(&b));
    }

    #[test]
    fn test_split_across() {
        // Rows edit over columns [2, 3]: the range straddles both sides
        let r = Range::new(0, 0, 4, 5);
        let (outside, inside) = r.split_across(Axis::Rows, 2, 3);
        assert_eq!(outside, vec![Range::new(0, 0, 4, 1), Range::new(0, 4, 4, 5)]);
        assert_eq!(inside, Some(Range::new(0, 2, 4, 3)));

        let (outside, inside) = r.split_across(Axis::Rows, 10, 12);
        assert_eq!(outside, vec![r]);
        assert!(inside.is_none());
    }

    #[test]
    fn test_subtract() {
        let r = Range::new(0, 0, 4, 4);
        let parts = r.subtract(&Range::new(1, 1, 2, 2));
        assert_eq!(parts.len(), 4);
        let cells: u64 = parts.iter().map(|p| p.cell_count()).sum();
        assert_eq!(cells, 25 - 4);
        assert!(parts.iter().all(|p| !p.intersects(&Range::new(1, 1, 2, 2))));

        assert_eq!(r.subtract(&Range::new(0, 0, 9, 9)), Vec::<Range>::new());
    }

    #[test]
    fn test_band_shift_insert() {
        let shift = BandShift::insert(Axis::Rows, 2, 2, (0, 255), 65_535);
        assert_eq!(shift.apply(&Range::new(0, 0, 5, 5)), Some(Range::new(0, 0, 7, 5)));
        assert_eq!(shift.apply(&Range::new(2, 0, 2, 0)), Some(Range::new(4, 0, 4, 0)));
        assert_eq!(shift.apply(&Range::new(0, 0, 1, 0)), Some(Range::new(0, 0, 1, 0)));

        // Clipped at the grid edge, dropped once pushed past it
        let edge = BandShift::insert(Axis::Rows, 10, 5, (0, 255), 20);
        assert_eq!(edge.apply(&Range::new(12, 0, 19, 0)), Some(Range::new(17, 0, 20, 0)));
        assert_eq!(edge.apply(&Range::new(18, 0, 19, 0)), None);
    }

    #[test]
    fn test_band_shift_delete() {
        let shift = BandShift::delete(Axis::Rows, 2, 2, (0, 255), 65_535);
        assert_eq!(shift.deleted_band(), Some((2, 3)));
        assert_eq!(shift.apply(&Range::new(0, 0, 5, 5)), Some(Range::new(0, 0, 3, 5)));
        assert_eq!(shift.apply(&Range::new(2, 0, 3, 5)), None);
        assert_eq!(shift.apply(&Range::new(3, 0, 6, 0)), Some(Range::new(2, 0, 4, 0)));
        assert_eq!(shift.apply(&Range::new(0, 0, 2, 0)), Some(Range::new(0, 0, 1, 0)));

        // Deleting at row 0 must not underflow
        let top = BandShift::delete(Axis::Rows, 0, 1, (0, 255), 65_535);
        assert_eq!(top.apply(&Range::new(0, 0, 0, 3)), None);
    }

    #[test]
    fn test_offset() {
        let r = Range::new(2, 2, 3, 3);
        assert_eq!(r.offset(-2, 1), Some(Range::new(0, 3, 1, 4)));
        assert_eq!(r.offset(-3, 0), None);
    }
}
