//! Grid ceilings and structural-edit options
//!
//! The legacy binary format has fixed numeric ceilings that every edit must respect
//! for the saved file to stay readable. They are collected here so that a caller can
//! switch the whole engine to the larger Office Open XML grid in one place.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of rows in a BIFF8 worksheet
pub const BIFF8_MAX_ROWS: u32 = 65_536;

/// Maximum number of columns in a BIFF8 worksheet
pub const BIFF8_MAX_COLS: u32 = 256;

/// Maximum number of rows in an Office Open XML worksheet
pub const XLSX_MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in an Office Open XML worksheet
pub const XLSX_MAX_COLS: u32 = 16_384;

/// Hard ceilings applied before any structural edit commits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridLimits {
    /// Number of rows in the grid
    pub max_rows: u32,
    /// Number of columns in the grid
    pub max_cols: u32,
    /// Number of defined names in a workbook
    pub max_names: usize,
    /// Number of manual page breaks per direction on one sheet
    pub max_page_breaks: usize,
    /// Number of ranges a single MERGECELLS record can carry
    pub max_merged_ranges_per_record: usize,
    /// Number of ranges a single data validation rule can carry
    pub max_validation_ranges: usize,
}

impl GridLimits {
    /// Ceilings of the legacy binary format
    pub fn biff8() -> Self {
        Self {
            max_rows: BIFF8_MAX_ROWS,
            max_cols: BIFF8_MAX_COLS,
            max_names: 65_535,
            max_page_breaks: 1_026,
            max_merged_ranges_per_record: 1_026,
            max_validation_ranges: 432,
        }
    }

    /// Ceilings of the Office Open XML grid
    pub fn xlsx() -> Self {
        Self {
            max_rows: XLSX_MAX_ROWS,
            max_cols: XLSX_MAX_COLS,
            ..Self::biff8()
        }
    }

    /// Last valid row index
    pub fn last_row(&self) -> u32 {
        self.max_rows - 1
    }

    /// Last valid column index
    pub fn last_col(&self) -> u32 {
        self.max_cols - 1
    }

    /// Reject a row index outside the grid
    pub fn check_row(&self, row: u32) -> Result<()> {
        if row >= self.max_rows {
            return Err(Error::RowOutOfBounds(row, self.last_row()));
        }
        Ok(())
    }

    /// Reject a column index outside the grid
    pub fn check_col(&self, col: u32) -> Result<()> {
        if col >= self.max_cols {
            return Err(Error::ColumnOutOfBounds(col, self.last_col()));
        }
        Ok(())
    }
}

impl Default for GridLimits {
    fn default() -> Self {
        Self::biff8()
    }
}

/// What to do when an edit would push the page-break count over its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PageBreakPolicy {
    /// Reject the edit before anything changes
    #[default]
    Error,
    /// Keep the first `max_page_breaks` breaks and log a warning
    Truncate,
}

/// Whether a move may land on top of its own source rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MoveOverlap {
    /// Source and destination may overlap
    #[default]
    Allow,
    /// Overlapping moves are rejected as invalid ranges
    Reject,
}

/// Options shared by every structural edit on a workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EditOptions {
    /// Page-break ceiling handling
    pub page_break_policy: PageBreakPolicy,
    /// Move overlap handling
    pub move_overlap: MoveOverlap,
    /// Snapshot the workbook before an edit and restore it if the edit fails
    pub transactional: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            page_break_policy: PageBreakPolicy::Error,
            move_overlap: MoveOverlap::Allow,
            transactional: true,
        }
    }
}
