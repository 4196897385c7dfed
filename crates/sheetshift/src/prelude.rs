//! Prelude module - common imports for sheetshift users
//!
//! ```rust
//! use sheetshift::prelude::*;
//! ```

pub use crate::{
    // Cell and formula types
    CellRef,
    CellValue,
    // Conditional formatting types
    CfOperator,
    CfRule,
    CfRuleType,
    ConditionalFormat,
    // Edits
    CopyMode,
    // Data validation types
    DataValidation,
    EditOptions,
    EditSummary,
    // Error types
    Error,
    Formula,
    GridLimits,
    InsertMode,
    NameScope,
    NamedRange,
    Range,
    Result,
    Token,
    ValidationErrorStyle,
    ValidationOperator,
    ValidationType,
    // Main types
    Workbook,
    WorkbookSettings,
    Worksheet,
};
