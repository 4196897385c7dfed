//! Error types for sheetshift-core

use thiserror::Error;

use crate::range::Range;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An index or coordinate outside the current bounds. Nothing was mutated.
    InvalidArgument,
    /// A row, column, name or per-record count would exceed a hard ceiling.
    LimitExceeded,
    /// The caller broke a structural precondition (aliased storage, corrupt index).
    InternalConsistency,
    /// Bad name syntax, duplicate name, formula bounds and similar domain checks.
    Validation,
}

/// Errors that can occur in sheetshift-core
#[derive(Debug, Error)]
pub enum Error {
    /// Positional index outside `[0, len)`
    #[error("Index {index} out of bounds (len: {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u32),

    /// Sheet index out of bounds
    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    /// A count would exceed a configured ceiling
    #[error("Too many {what}: {requested} exceeds the limit of {limit}")]
    LimitExceeded {
        what: &'static str,
        limit: usize,
        requested: usize,
    },

    /// Source and destination of a copy are the same storage
    #[error("Cannot copy {0} into itself")]
    AliasedStorage(&'static str),

    /// Any other broken invariant
    #[error("Internal consistency violation: {0}")]
    Internal(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Invalid defined name
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Name already defined in the same scope
    #[error("Name '{0}' already exists in this scope")]
    DuplicateName(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Sheet name already exists
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// A reference in a formula would leave the grid
    #[error("Formula reference out of bounds: {0}")]
    FormulaBounds(String),

    /// Merge request overlaps an existing merged region
    #[error("Range {range} overlaps merged cells (enclosing range: {enclosing})")]
    MergedCellConflict { range: Range, enclosing: Range },
}

impl Error {
    /// Create a new internal consistency error with a message
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IndexOutOfBounds { .. }
            | Error::RowOutOfBounds(..)
            | Error::ColumnOutOfBounds(..)
            | Error::SheetOutOfBounds(..) => ErrorKind::InvalidArgument,
            Error::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Error::AliasedStorage(_) | Error::Internal(_) => ErrorKind::InternalConsistency,
            Error::InvalidRange(_)
            | Error::InvalidName(_)
            | Error::DuplicateName(_)
            | Error::InvalidSheetName(_)
            | Error::DuplicateSheetName(_)
            | Error::FormulaBounds(_)
            | Error::MergedCellConflict { .. } => ErrorKind::Validation,
        }
    }

    /// Check `index` against `[0, len)`
    pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(Error::IndexOutOfBounds { index, len })
        }
    }
}
