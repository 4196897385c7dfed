//! # sheetshift-core
//!
//! Structural-edit algorithms for spreadsheet grids.
//!
//! This crate provides the building blocks the `sheetshift` workbook model is made of:
//! - [`Range`] and [`BandShift`] - Rectangles and the arithmetic of inserting or deleting bands
//! - [`OrderedIndex`] - A lazily-sorted sequence for records loaded in file order
//! - [`ColumnIndexedRow`] - The cells of one row with a locality-exploiting search
//! - [`RangeSet`] - Range algebra for merged cells, validations and conditional formats
//! - [`NameRegistry`] and [`DeletionTracker`] - Defined names and their garbage collection
//! - [`ReferenceRewriter`] - Keeps formula references in step with structural edits
//!
//! ## Example
//!
//! ```rust
//! use sheetshift_core::{Axis, BandShift, Range, RangeSet};
//!
//! let mut merged = RangeSet::merged_cells();
//! merged.add(Range::parse("A1:F6").unwrap()).unwrap();
//!
//! // Insert two rows at row 3 across the whole sheet
//! merged.arrange_shift(&BandShift::insert(Axis::Rows, 2, 2, (0, 255), 65_535)).unwrap();
//! assert_eq!(merged.ranges(), &[Range::parse("A1:F8").unwrap()]);
//! ```

pub mod cell;
pub mod error;
pub mod formula;
pub mod limits;
pub mod named_range;
pub mod ordered;
pub mod range;
pub mod range_set;
pub mod row;

// Re-exports for convenience
pub use cell::{CellError, CellRecord, CellValue};
pub use error::{Error, ErrorKind, Result};
pub use formula::{AreaRef, CellRef, Formula, FormulaEdit, FormulaRewriter, Operator, ReferenceRewriter, Token};
pub use limits::{EditOptions, GridLimits, MoveOverlap, PageBreakPolicy};
pub use named_range::{validate_name, DeletionTracker, NameFlags, NameRegistry, NameScope, NamedRange};
pub use ordered::{Ascending, IndexOrder, Keyed, OrderBy, OrderedIndex};
pub use range::{column_to_letters, letters_to_column, Axis, BandShift, Range};
pub use range_set::{RangeSet, SingleCells};
pub use row::ColumnIndexedRow;
