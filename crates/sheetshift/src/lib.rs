//! # sheetshift
//!
//! The structural-editing core of a spreadsheet engine.
//!
//! Sheetshift keeps everything that is anchored to a position in step when rows or
//! columns are inserted, deleted or moved: cells, merged regions, data validations,
//! conditional formats, column formatting, page breaks, defined names and the
//! references inside every formula of the workbook.
//!
//! ## Features
//!
//! - Insert, delete and move blocks of cells with shift-down, shift-right or in-place modes
//! - Copy ranges between sheets and between documents, names included
//! - Delete and insert sheets with name garbage collection
//! - Grid ceilings of the legacy binary format or of XLSX
//! - Transactional edits: a failed edit leaves the workbook as it was
//!
//! ## Example
//!
//! ```rust
//! use sheetshift::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 1.0).unwrap();
//! sheet.set_cell_value("A2", 2.0).unwrap();
//! sheet.merge_cells(&Range::parse("B1:C2").unwrap()).unwrap();
//!
//! // Delete row 1; everything below moves up
//! workbook.edit().delete_rows(0, 0, 1).unwrap();
//!
//! let sheet = workbook.worksheet(0).unwrap();
//! assert_eq!(sheet.value_at(0, 0).as_number(), Some(2.0));
//! assert_eq!(sheet.merged_regions(), &[Range::parse("B1:C1").unwrap()]);
//! ```

pub mod clip;
pub mod column;
pub mod conditional_format;
pub mod edit;
pub mod page_break;
pub mod prelude;
pub mod structure;
pub mod validation;
pub mod workbook;
pub mod worksheet;

pub use clip::Clip;
pub use column::{ColumnInfo, ColumnInfoList};
pub use conditional_format::{CfOperator, CfRule, CfRuleType, ConditionalFormat};
pub use edit::{CopyMode, EditSummary, InsertMode, StructuralEditCoordinator};
pub use page_break::{PageBreak, PageBreaks};
pub use structure::{ArrangeInsertRange, ArrangeMoveRange, EditContext, UpdateDeletedRanges};
pub use validation::{DataValidation, ValidationErrorStyle, ValidationOperator, ValidationType};
pub use workbook::{Workbook, WorkbookGlobals, WorkbookSettings, MAX_SHEET_NAME_LEN};
pub use worksheet::{ChartLink, FormulaSite, RowRecord, Worksheet};

// Re-export core types
pub use sheetshift_core::{
    AreaRef, Axis, BandShift, CellError, CellRecord, CellRef, CellValue, EditOptions, Error, ErrorKind, Formula,
    FormulaEdit, FormulaRewriter, GridLimits, MoveOverlap, NameFlags, NameRegistry, NameScope, NamedRange,
    PageBreakPolicy, Range, RangeSet, ReferenceRewriter, Result, Token,
};
