// Property-based tests for RangeSet under structural edits.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use sheetshift_core::{Axis, BandShift, Range, RangeSet};

const MAX_ROW: u32 = 65_535;
const MAX_COL: u32 = 255;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// A range inside `rows` x `cols`
fn arb_range_in(rows: std::ops::Range<u32>, cols: std::ops::Range<u32>) -> impl Strategy<Value = Range> {
    (rows.clone(), rows, cols.clone(), cols).prop_map(|(r1, r2, c1, c2)| Range::new(r1, c1, r2, c2))
}

fn arb_range() -> impl Strategy<Value = Range> {
    arb_range_in(0..30, 0..30)
}

/// A range of at least two cells, as merged regions are
fn arb_merge() -> impl Strategy<Value = Range> {
    arb_range().prop_filter("merged regions span two cells", |r| !r.is_single_cell())
}

fn conditional_format_of(ranges: &[Range]) -> RangeSet {
    let mut set = RangeSet::conditional_format();
    for r in ranges {
        set.add(*r).unwrap();
    }
    set
}

fn sorted(set: &RangeSet) -> Vec<Range> {
    let mut ranges = set.ranges().to_vec();
    ranges.sort();
    ranges
}

fn covered(set: &RangeSet, row: u32, col: u32) -> bool {
    set.find_cell(row, col).is_some()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    /// Inserting zero bands changes nothing
    #[test]
    fn zero_insert_is_identity(
        ranges in prop::collection::vec(arb_range(), 0..8),
        at in 0u32..40,
        lo in 0u32..30,
        len in 0u32..30,
        columns in any::<bool>(),
    ) {
        let set = conditional_format_of(&ranges);
        let mut shifted = set.clone();
        let shift = if columns {
            BandShift::insert(Axis::Columns, at, 0, (lo, lo + len), MAX_COL)
        } else {
            BandShift::insert(Axis::Rows, at, 0, (lo, lo + len), MAX_ROW)
        };
        shifted.arrange_shift(&shift).unwrap();
        prop_assert_eq!(shifted.ranges(), set.ranges());
    }

    /// Full-width row inserts move every range at or below the edit by the count
    #[test]
    fn insert_shifts_ranges_below(
        ranges in prop::collection::vec(arb_range(), 1..8),
        at in 0u32..30,
        count in 1u32..10,
    ) {
        let mut set = conditional_format_of(&ranges);
        set.arrange_shift(&BandShift::insert(Axis::Rows, at, count, (0, MAX_COL), MAX_ROW)).unwrap();
        prop_assert_eq!(set.len(), ranges.len());
        for r in &ranges {
            let expected = if r.first_row >= at {
                Range::new(r.first_row + count, r.first_col, r.last_row + count, r.last_col)
            } else if r.last_row >= at {
                Range::new(r.first_row, r.first_col, r.last_row + count, r.last_col)
            } else {
                *r
            };
            prop_assert!(set.ranges().contains(&expected), "{} should become {}", r, expected);
        }
    }

    /// A range cut by a partial-width insert keeps every cell, moved or not
    #[test]
    fn straddling_insert_keeps_footprint(
        range in arb_range(),
        at in 0u32..30,
        count in 1u32..5,
        lo in 0u32..30,
        len in 0u32..10,
    ) {
        let hi = lo + len;
        let mut set = conditional_format_of(&[range]);
        set.arrange_shift(&BandShift::insert(Axis::Rows, at, count, (lo, hi), MAX_ROW)).unwrap();

        let inside = |col: u32| col >= lo && col <= hi;
        let mut images = 0u64;
        for row in range.first_row..=range.last_row {
            for col in range.first_col..=range.last_col {
                let target = if inside(col) && row >= at { row + count } else { row };
                prop_assert!(covered(&set, target, col), "cell ({}, {}) lost", row, col);
                images += 1;
            }
        }

        // Anything else covered is part of the inserted band
        let footprint: u64 = set.iter().map(|r| r.cell_count()).sum();
        let band = Range::new(at, lo, at + count - 1, hi);
        let mut inserted = 0u64;
        for row in band.first_row..=band.last_row {
            for col in band.first_col..=band.last_col {
                if covered(&set, row, col) {
                    inserted += 1;
                }
            }
        }
        prop_assert_eq!(footprint, images + inserted);
    }

    /// Moving into empty territory and back restores the set
    #[test]
    fn move_round_trip(
        inside in prop::collection::vec(arb_range_in(0..20, 0..20), 0..6),
        outside in prop::collection::vec(arb_range_in(30..50, 0..20), 0..4),
        d_row in 60i64..200,
        d_col in 25i64..200,
    ) {
        let mut ranges = inside.clone();
        ranges.extend(outside.iter().copied());
        let mut set = RangeSet::validation(64);
        for r in &ranges {
            set.add(*r).unwrap();
        }
        let original = sorted(&set);

        let source = Range::new(0, 0, 19, 19);
        set.arrange_move(&source, d_row, d_col).unwrap();
        let dest = source.offset(d_row, d_col).unwrap();
        set.arrange_move(&dest, -d_row, -d_col).unwrap();
        prop_assert_eq!(sorted(&set), original);
    }

    /// Merged regions never overlap, however they are added
    #[test]
    fn merged_cells_never_overlap(ranges in prop::collection::vec(arb_merge(), 1..12)) {
        let mut set = RangeSet::merged_cells();
        for r in &ranges {
            set.add(*r).unwrap();
        }
        let stored = set.ranges();
        for (i, a) in stored.iter().enumerate() {
            for b in &stored[i + 1..] {
                prop_assert!(!a.intersects(b), "{} overlaps {}", a, b);
            }
        }
        // Every added cell is still merged
        for r in &ranges {
            prop_assert!(stored.iter().any(|m| m.contains(r)), "{} is not covered", r);
        }
    }

    /// Merged regions stay disjoint through a straddling delete
    #[test]
    fn merged_cells_stay_disjoint_after_delete(
        ranges in prop::collection::vec(arb_merge(), 1..8),
        at in 0u32..30,
        count in 1u32..5,
        lo in 0u32..30,
        len in 0u32..10,
    ) {
        let mut set = RangeSet::merged_cells();
        for r in &ranges {
            set.add(*r).unwrap();
        }
        set.arrange_shift(&BandShift::delete(Axis::Rows, at, count, (lo, lo + len), MAX_ROW)).unwrap();
        let stored = set.ranges();
        for (i, a) in stored.iter().enumerate() {
            prop_assert!(!a.is_single_cell());
            for b in &stored[i + 1..] {
                prop_assert!(!a.intersects(b), "{} overlaps {}", a, b);
            }
        }
    }
}
