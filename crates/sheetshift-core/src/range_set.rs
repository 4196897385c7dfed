//! Range algebra for range-anchored sheet structures
//!
//! A [`RangeSet`] is the list of rectangles owned by one structure: the merged cells
//! of a sheet, the scope of one data-validation rule, or the scope of one conditional
//! format. Structural edits shift, split, clip and drop its ranges.

use ahash::AHashSet;
use log::trace;

use crate::error::{Error, Result};
use crate::range::{BandShift, Range};

/// What a set does with one-cell ranges produced by a split or shrink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleCells {
    /// One-cell fragments are meaningless (merged cells) and are dropped
    Drop,
    /// One-cell fragments are kept
    Keep,
}

/// An unordered collection of ranges with one owner
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSet {
    ranges: Vec<Range>,
    /// Coalesce adjacent ranges on add and forbid overlaps (merged cells)
    merging: bool,
    single_cells: SingleCells,
    max_ranges: Option<usize>,
    what: &'static str,
}

impl RangeSet {
    /// A set with the given policies
    pub fn new(merging: bool, single_cells: SingleCells, what: &'static str) -> Self {
        Self {
            ranges: Vec::new(),
            merging,
            single_cells,
            max_ranges: None,
            what,
        }
    }

    /// The merged-cell regions of a sheet
    pub fn merged_cells() -> Self {
        Self::new(true, SingleCells::Drop, "merged ranges")
    }

    /// The scope of a data-validation rule, capped at `max_ranges`
    pub fn validation(max_ranges: usize) -> Self {
        Self::new(false, SingleCells::Keep, "data validation ranges").with_max_ranges(max_ranges)
    }

    /// The scope of a conditional format
    pub fn conditional_format() -> Self {
        Self::new(false, SingleCells::Keep, "conditional format ranges")
    }

    /// Cap the number of ranges
    pub fn with_max_ranges(mut self, max_ranges: usize) -> Self {
        self.max_ranges = Some(max_ranges);
        self
    }

    /// Number of ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The ranges in storage order
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Iterate over the ranges
    pub fn iter(&self) -> std::slice::Iter<'_, Range> {
        self.ranges.iter()
    }

    /// The range covering a cell, if any
    pub fn find_cell(&self, row: u32, col: u32) -> Option<&Range> {
        self.ranges.iter().find(|r| r.contains_cell(row, col))
    }

    /// Group the ranges for writers whose records hold at most `max_per_record`
    pub fn records(&self, max_per_record: usize) -> std::slice::Chunks<'_, Range> {
        self.ranges.chunks(max_per_record.max(1))
    }

    fn check_limit(&self, len: usize) -> Result<()> {
        match self.max_ranges {
            Some(limit) if len > limit => Err(Error::LimitExceeded {
                what: self.what,
                limit,
                requested: len,
            }),
            _ => Ok(()),
        }
    }

    /// Push `range` unless it is a reshaped one-cell range this set does not allow
    fn keep(&self, out: &mut Vec<Range>, range: Range, reshaped: bool) {
        if reshaped && range.is_single_cell() && self.single_cells == SingleCells::Drop {
            trace!("dropping one-cell fragment {}", range);
            return;
        }
        out.push(range);
    }

    /// Add a range, coalescing it with neighbours if this is a merging set
    pub fn add(&mut self, range: Range) -> Result<()> {
        if self.merging {
            self.add_and_merge(range).map(|_| ())
        } else {
            self.add_unmerged(range)
        }
    }

    /// Add a range as-is, for raw deserialization
    pub fn add_unmerged(&mut self, range: Range) -> Result<()> {
        self.check_limit(self.ranges.len() + 1)?;
        self.ranges.push(range);
        Ok(())
    }

    /// Minimal range enclosing `range` and everything that overlaps it, transitively
    ///
    /// Returns `None` when nothing overlaps, so the caller can add `range` directly.
    pub fn check_overlap(&self, range: &Range) -> Option<Range> {
        let (enclosing, absorbed) = self.absorb(*range, false);
        if absorbed.iter().any(|&a| a) {
            Some(enclosing)
        } else {
            None
        }
    }

    /// Add `range`, absorbing every range that overlaps it or continues it
    ///
    /// A range continues another when it has identical row bounds and adjacent or
    /// overlapping column bounds, or the other way round. Absorption is repeated
    /// until nothing else touches the result, so the set never ends up with two
    /// overlapping ranges. Returns the range actually stored.
    pub fn add_and_merge(&mut self, range: Range) -> Result<Range> {
        let (merged, absorbed) = self.absorb(range, true);
        let removed = absorbed.iter().filter(|&&a| a).count();
        self.check_limit(self.ranges.len() - removed + 1)?;

        if removed > 0 {
            trace!("{} absorbed {} range(s) into {}", range, removed, merged);
            let mut flags = absorbed.into_iter();
            self.ranges.retain(|_| !flags.next().unwrap_or(false));
        }
        self.ranges.push(merged);
        Ok(merged)
    }

    fn absorb(&self, range: Range, coalesce: bool) -> (Range, Vec<bool>) {
        let mut absorbed = vec![false; self.ranges.len()];
        let mut merged = range;
        loop {
            let mut grew = false;
            for (i, existing) in self.ranges.iter().enumerate() {
                if absorbed[i] {
                    continue;
                }
                if existing.intersects(&merged) || (coalesce && continues(existing, &merged)) {
                    absorbed[i] = true;
                    merged = merged.union_bounds(existing);
                    grew = true;
                }
            }
            if !grew {
                return (merged, absorbed);
            }
        }
    }

    /// Remove a range by exact match
    pub fn remove(&mut self, range: &Range) -> bool {
        match self.ranges.iter().position(|r| r == range) {
            Some(i) => {
                self.ranges.remove(i);
                true
            }
            None => false,
        }
    }

    /// Remove every range that intersects `area`, returning how many went
    pub fn remove_intersecting(&mut self, area: &Range) -> usize {
        let before = self.ranges.len();
        self.ranges.retain(|r| !r.intersects(area));
        before - self.ranges.len()
    }

    /// Cut `area` out of every range, keeping the remainders
    pub fn clear_area(&mut self, area: &Range) -> Result<()> {
        let mut out = Vec::with_capacity(self.ranges.len());
        for r in &self.ranges {
            if r.intersects(area) {
                for rest in r.subtract(area) {
                    self.keep(&mut out, rest, true);
                }
            } else {
                out.push(*r);
            }
        }
        self.check_limit(out.len())?;
        self.ranges = out;
        Ok(())
    }

    /// Apply a row/column insert or delete
    ///
    /// Ranges whose orthogonal bounds lie inside the edit's span have every bound at
    /// or past the edit point shifted; ranges that straddle the span are split and
    /// only the inside fragment moves. Collapsed ranges are dropped.
    pub fn arrange_shift(&mut self, shift: &BandShift) -> Result<()> {
        if shift.is_noop() {
            return Ok(());
        }
        let across = shift.axis.other();
        let mut out = Vec::with_capacity(self.ranges.len());

        for r in &self.ranges {
            let (_, last) = r.span(shift.axis);
            let (lo, hi) = r.span(across);
            if last < shift.at || !shift.touches_across(lo, hi) {
                out.push(*r);
                continue;
            }

            if shift.covers_across(lo, hi) {
                match shift.apply(r) {
                    Some(moved) => {
                        let reshaped = moved.extent(shift.axis) != r.extent(shift.axis);
                        self.keep(&mut out, moved, reshaped);
                    }
                    None => trace!("{} collapsed", r),
                }
                continue;
            }

            let (outside, inside) = r.split_across(shift.axis, shift.across.0, shift.across.1);
            trace!("{} straddles the edit, split into {} piece(s)", r, outside.len() + 1);
            for part in outside {
                self.keep(&mut out, part, true);
            }
            if let Some(moved) = inside.and_then(|part| shift.apply(&part)) {
                self.keep(&mut out, moved, true);
            }
        }

        self.check_limit(out.len())?;
        self.ranges = out;
        Ok(())
    }

    /// Move the contents of `source` by `(d_row, d_col)`
    ///
    /// Pass 1 isolates the part of every range inside `source`, moves it and records
    /// it as reusable. Pass 2 cuts the destination out of every range that is not
    /// reusable: that is pre-existing data the move overwrote. The reusable set lives
    /// only for the duration of this call.
    pub fn arrange_move(&mut self, source: &Range, d_row: i64, d_col: i64) -> Result<()> {
        if d_row == 0 && d_col == 0 {
            return Ok(());
        }
        let dest = source
            .offset(d_row, d_col)
            .ok_or_else(|| Error::InvalidRange(format!("{} moved off the grid", source)))?;

        let mut staged = Vec::with_capacity(self.ranges.len());
        let mut reusable: AHashSet<usize> = AHashSet::new();
        for r in &self.ranges {
            let Some(part) = r.intersection(source) else {
                staged.push(*r);
                continue;
            };
            let split = part != *r;
            if split {
                for rest in r.subtract(source) {
                    self.keep(&mut staged, rest, true);
                }
            }
            let moved = part
                .offset(d_row, d_col)
                .ok_or_else(|| Error::InvalidRange(format!("{} moved off the grid", part)))?;
            if split && moved.is_single_cell() && self.single_cells == SingleCells::Drop {
                continue;
            }
            reusable.insert(staged.len());
            staged.push(moved);
        }

        let mut out = Vec::with_capacity(staged.len());
        for (i, r) in staged.into_iter().enumerate() {
            if reusable.contains(&i) || !r.intersects(&dest) {
                out.push(r);
                continue;
            }
            trace!("{} overwritten by move into {}", r, dest);
            for rest in r.subtract(&dest) {
                self.keep(&mut out, rest, true);
            }
        }

        self.check_limit(out.len())?;
        self.ranges = out;
        Ok(())
    }

    /// The ranges to copy when `area` is copied
    ///
    /// Merging sets only copy ranges wholly inside `area`; other sets copy the
    /// intersection of each range with `area`.
    pub fn clip(&self, area: &Range) -> Vec<Range> {
        if self.merging {
            self.ranges.iter().filter(|r| area.contains(r)).copied().collect()
        } else {
            self.ranges.iter().filter_map(|r| r.intersection(area)).collect()
        }
    }

    /// Add copies of `clipped` translated by `(d_row, d_col)`
    ///
    /// `clipped` comes from [`clip`](Self::clip), usually on another set; a set
    /// cannot borrow itself as the source. Copies that leave the grid are skipped.
    pub fn paste(&mut self, clipped: &[Range], d_row: i64, d_col: i64, last_row: u32, last_col: u32) -> Result<()> {
        for r in clipped {
            match r.offset(d_row, d_col) {
                Some(copy) if copy.last_row <= last_row && copy.last_col <= last_col => self.add(copy)?,
                _ => trace!("copy of {} falls off the grid", r),
            }
        }
        Ok(())
    }

    /// Copy the ranges of `area` into `target`, translated by `(d_row, d_col)`
    ///
    /// `target` is a distinct set by construction. Copying a set onto itself goes
    /// through [`clip`](Self::clip) and [`paste`](Self::paste).
    pub fn copy_into(
        &self,
        target: &mut RangeSet,
        area: &Range,
        d_row: i64,
        d_col: i64,
        last_row: u32,
        last_col: u32,
    ) -> Result<()> {
        let clipped = self.clip(area);
        target.paste(&clipped, d_row, d_col, last_row, last_col)
    }
}

/// Whether `a` and `b` share one axis exactly and touch or overlap on the other
fn continues(a: &Range, b: &Range) -> bool {
    let same_rows = a.first_row == b.first_row && a.last_row == b.last_row;
    let same_cols = a.first_col == b.first_col && a.last_col == b.last_col;
    let cols_touch = a.first_col as u64 <= b.last_col as u64 + 1 && b.first_col as u64 <= a.last_col as u64 + 1;
    let rows_touch = a.first_row as u64 <= b.last_row as u64 + 1 && b.first_row as u64 <= a.last_row as u64 + 1;
    (same_rows && cols_touch) || (same_cols && rows_touch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Axis;
    use pretty_assertions::assert_eq;

    const MAX_ROW: u32 = 65_535;
    const MAX_COL: u32 = 255;

    fn set_of(ranges: &[Range]) -> RangeSet {
        let mut set = RangeSet::conditional_format();
        for r in ranges {
            set.add_unmerged(*r).unwrap();
        }
        set
    }

    fn sorted(set: &RangeSet) -> Vec<Range> {
        let mut v = set.ranges().to_vec();
        v.sort();
        v
    }

    fn insert_rows(at: u32, count: u32) -> BandShift {
        BandShift::insert(Axis::Rows, at, count, (0, MAX_COL), MAX_ROW)
    }

    #[test]
    fn test_insert_rows_expands_range() {
        let mut set = set_of(&[Range::new(0, 0, 5, 5)]);
        set.arrange_shift(&insert_rows(2, 2)).unwrap();
        assert_eq!(set.ranges(), &[Range::new(0, 0, 7, 5)]);
    }

    #[test]
    fn test_delete_rows_shrinks_range() {
        let mut set = set_of(&[Range::new(0, 0, 5, 5)]);
        set.arrange_shift(&BandShift::delete(Axis::Rows, 2, 2, (0, MAX_COL), MAX_ROW))
            .unwrap();
        assert_eq!(set.ranges(), &[Range::new(0, 0, 3, 5)]);
    }

    #[test]
    fn test_insert_cols_inside_range() {
        let mut set = set_of(&[Range::new(2, 0, 2, 10)]);
        set.arrange_shift(&BandShift::insert(Axis::Columns, 5, 1, (0, MAX_ROW), MAX_COL))
            .unwrap();
        assert_eq!(set.ranges(), &[Range::new(2, 0, 2, 11)]);
    }

    #[test]
    fn test_delete_drops_range_inside_band() {
        let mut set = set_of(&[Range::new(3, 0, 4, 2), Range::new(10, 0, 12, 0)]);
        set.arrange_shift(&BandShift::delete(Axis::Rows, 2, 4, (0, MAX_COL), MAX_ROW))
            .unwrap();
        assert_eq!(set.ranges(), &[Range::new(6, 0, 8, 0)]);
    }

    #[test]
    fn test_straddling_range_is_split() {
        // Shift cells C..D down by 2 starting at row 1
        let mut set = set_of(&[Range::new(0, 0, 3, 5)]);
        set.arrange_shift(&BandShift::insert(Axis::Rows, 1, 2, (2, 3), MAX_ROW))
            .unwrap();
        assert_eq!(
            sorted(&set),
            vec![
                Range::new(0, 0, 3, 1),
                Range::new(0, 2, 5, 3),
                Range::new(0, 4, 3, 5),
            ]
        );
    }

    #[test]
    fn test_merged_split_drops_single_cells() {
        let mut set = RangeSet::merged_cells();
        set.add(Range::new(0, 0, 0, 2)).unwrap();
        set.arrange_shift(&BandShift::insert(Axis::Rows, 0, 1, (1, 1), MAX_ROW))
            .unwrap();
        // A1, B2 and C1 would all be one-cell merges
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_clips_at_grid_edge() {
        let mut set = set_of(&[Range::new(65_530, 0, 65_535, 0), Range::new(65_535, 1, 65_535, 1)]);
        set.arrange_shift(&insert_rows(65_533, 3)).unwrap();
        assert_eq!(set.ranges(), &[Range::new(65_530, 0, 65_535, 0)]);
    }

    #[test]
    fn test_zero_insert_is_identity() {
        let before = set_of(&[Range::new(1, 1, 4, 4), Range::new(9, 0, 9, 9)]);
        let mut after = before.clone();
        after.arrange_shift(&insert_rows(2, 0)).unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn test_add_and_merge_adjacent_rows() {
        let mut set = RangeSet::merged_cells();
        set.add_and_merge(Range::new(0, 0, 0, 4)).unwrap();
        let merged = set.add_and_merge(Range::new(1, 0, 1, 4)).unwrap();
        assert_eq!(merged, Range::new(0, 0, 1, 4));
        assert_eq!(set.ranges(), &[Range::new(0, 0, 1, 4)]);
    }

    #[test]
    fn test_add_and_merge_absorbs_overlaps_transitively() {
        let mut set = RangeSet::merged_cells();
        set.add_unmerged(Range::new(0, 0, 1, 1)).unwrap();
        set.add_unmerged(Range::new(3, 3, 4, 4)).unwrap();
        set.add_unmerged(Range::new(8, 8, 9, 9)).unwrap();
        let merged = set.add_and_merge(Range::new(1, 1, 3, 3)).unwrap();
        assert_eq!(merged, Range::new(0, 0, 4, 4));
        assert_eq!(sorted(&set), vec![Range::new(0, 0, 4, 4), Range::new(8, 8, 9, 9)]);
    }

    #[test]
    fn test_check_overlap_reports_enclosing() {
        let mut set = RangeSet::merged_cells();
        set.add(Range::new(0, 0, 2, 2)).unwrap();
        assert_eq!(set.check_overlap(&Range::new(2, 2, 5, 5)), Some(Range::new(0, 0, 5, 5)));
        assert_eq!(set.check_overlap(&Range::new(3, 0, 3, 2)), None);
    }

    #[test]
    fn test_move_and_back() {
        let original = set_of(&[Range::new(0, 0, 1, 1), Range::new(2, 2, 2, 4)]);
        let source = Range::new(0, 0, 2, 4);
        let mut set = original.clone();
        set.arrange_move(&source, 20, 3).unwrap();
        assert_eq!(sorted(&set), vec![Range::new(20, 3, 21, 4), Range::new(22, 5, 22, 7)]);
        set.arrange_move(&Range::new(20, 3, 22, 7), -20, -3).unwrap();
        assert_eq!(sorted(&set), sorted(&original));
    }

    #[test]
    fn test_move_overwrites_stale_destination() {
        let mut set = set_of(&[Range::new(0, 0, 0, 1), Range::new(5, 0, 6, 3)]);
        // Move A1:B1 onto A6:B6
        set.arrange_move(&Range::new(0, 0, 0, 1), 5, 0).unwrap();
        assert_eq!(
            sorted(&set),
            vec![
                Range::new(5, 0, 5, 1),
                Range::new(5, 2, 5, 3),
                Range::new(6, 0, 6, 3),
            ]
        );
    }

    #[test]
    fn test_overlapping_move() {
        let mut set = set_of(&[Range::new(0, 0, 3, 0)]);
        set.arrange_move(&Range::new(0, 0, 3, 0), 2, 0).unwrap();
        assert_eq!(set.ranges(), &[Range::new(2, 0, 5, 0)]);
    }

    #[test]
    fn test_validation_limit_is_checked_before_commit() {
        let mut set = RangeSet::validation(2);
        set.add(Range::new(0, 0, 3, 5)).unwrap();
        set.add(Range::new(10, 0, 10, 0)).unwrap();
        let before = set.clone();
        let err = set
            .arrange_shift(&BandShift::insert(Axis::Rows, 1, 1, (2, 3), MAX_ROW))
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { limit: 2, requested: 4, .. }));
        assert_eq!(set, before);
        assert!(set.add(Range::new(20, 0, 20, 0)).is_err());
    }

    #[test]
    fn test_clip_and_paste() {
        let mut merged = RangeSet::merged_cells();
        merged.add(Range::new(0, 0, 1, 1)).unwrap();
        merged.add(Range::new(1, 3, 4, 3)).unwrap();
        let clipped = merged.clip(&Range::new(0, 0, 2, 3));
        assert_eq!(clipped, vec![Range::new(0, 0, 1, 1)]);

        let mut target = RangeSet::merged_cells();
        target.paste(&clipped, 10, 0, MAX_ROW, MAX_COL).unwrap();
        target.paste(&clipped, 65_535, 0, MAX_ROW, MAX_COL).unwrap();
        assert_eq!(target.ranges(), &[Range::new(10, 0, 11, 1)]);

        let cf = set_of(&[Range::new(0, 0, 9, 0)]);
        assert_eq!(cf.clip(&Range::new(5, 0, 20, 5)), vec![Range::new(5, 0, 9, 0)]);
    }

    #[test]
    fn test_copy_into_another_set() {
        let source = set_of(&[Range::new(0, 0, 9, 0), Range::new(5, 2, 6, 3), Range::new(20, 0, 20, 0)]);
        let area = Range::new(0, 0, 9, 3);

        let mut target = RangeSet::conditional_format();
        source.copy_into(&mut target, &area, 100, 1, MAX_ROW, MAX_COL).unwrap();
        assert_eq!(sorted(&target), vec![Range::new(100, 1, 109, 1), Range::new(105, 3, 106, 4)]);

        // Copies running off the bottom edge are skipped
        let mut edge = RangeSet::conditional_format();
        source.copy_into(&mut edge, &area, 65_529, 0, MAX_ROW, MAX_COL).unwrap();
        assert_eq!(edge.ranges(), &[Range::new(65_534, 2, 65_535, 3)]);

        // The source is untouched
        assert_eq!(source.len(), 3);
    }

        #[test]
    fn test_clear_area_and_records() {
        let mut set = set_of(&[Range::new(0, 0, 4, 0), Range::new(0, 2, 0, 2)]);
        set.clear_area(&Range::new(2, 0, 2, 5)).unwrap();
        assert_eq!(sorted(&set), vec![Range::new(0, 0, 1, 0), Range::new(0, 2, 0, 2), Range::new(3, 0, 4, 0)]);
        assert_eq!(set.records(2).count(), 2);
        assert_eq!(set.remove_intersecting(&Range::new(0, 0, 0, 9)), 2);
        assert!(set.remove(&Range::new(3, 0, 4, 0)));
        assert!(set.is_empty());
    }
}
