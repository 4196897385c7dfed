//! Cell value types

use std::fmt;

use crate::formula::Formula;
use crate::ordered::Keyed;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell (no value); kept only when the cell carries a style
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value (all numbers stored as f64, including dates)
    Number(f64),

    /// String value
    String(String),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),

    /// Formula with cached result
    Formula {
        formula: Formula,
        cached_value: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a new formula value with no cached result
    pub fn formula(formula: impl Into<Formula>) -> Self {
        CellValue::Formula {
            formula: formula.into(),
            cached_value: None,
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Get the formula tokens if this is a formula cell
    pub fn as_formula(&self) -> Option<&Formula> {
        match self {
            CellValue::Formula { formula, .. } => Some(formula),
            _ => None,
        }
    }

    /// Get the formula tokens mutably if this is a formula cell
    pub fn as_formula_mut(&mut self) -> Option<&mut Formula> {
        match self {
            CellValue::Formula { formula, .. } => Some(formula),
            _ => None,
        }
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => v.as_number(),
            _ => None,
        }
    }

    /// Try to get the value as a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => v.as_string(),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => write!(f, "{}", v),
            CellValue::Formula { .. } => write!(f, "<formula>"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Excel error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
}

impl CellError {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
        }
    }

    /// Get the numeric error code (for BIFF format)
    pub fn code(&self) -> u8 {
        match self {
            CellError::Null => 0x00,
            CellError::Div0 => 0x07,
            CellError::Value => 0x0F,
            CellError::Ref => 0x17,
            CellError::Name => 0x1D,
            CellError::Num => 0x24,
            CellError::Na => 0x2A,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One cell record inside a row, keyed by its column
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    /// Column index (0-based)
    pub col: u32,
    /// The cell's value
    pub value: CellValue,
    /// Index into the format table (0 = default format)
    pub style_index: u32,
}

impl CellRecord {
    /// Create a new cell with a value and default style
    pub fn new(col: u32, value: impl Into<CellValue>) -> Self {
        Self {
            col,
            value: value.into(),
            style_index: 0,
        }
    }

    /// Create a new cell with a value and style
    pub fn with_style(col: u32, value: impl Into<CellValue>, style_index: u32) -> Self {
        Self {
            col,
            value: value.into(),
            style_index,
        }
    }

    /// Check if this cell is effectively empty (no value and default style)
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style_index == 0
    }
}

impl Keyed for CellRecord {
    fn key(&self) -> u32 {
        self.col
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{CellRef, Token};

    #[test]
    fn test_formula_accessors() {
        let mut value = CellValue::formula(vec![Token::Ref(CellRef::new(0, 0))]);
        assert!(value.is_formula());
        assert_eq!(value.as_formula().map(|f| f.tokens.len()), Some(1));
        if let Some(f) = value.as_formula_mut() {
            f.tokens.clear();
        }
        assert_eq!(value.as_formula(), Some(&Formula::default()));
        assert_eq!(CellValue::from(2.5).as_formula(), None);
    }

    #[test]
    fn test_display_and_codes() {
        assert_eq!(CellValue::from(true).to_string(), "TRUE");
        assert_eq!(CellValue::from("x").as_string(), Some("x"));
        assert_eq!(CellError::Ref.to_string(), "#REF!");
        assert_eq!(CellError::Name.code(), 0x1D);
    }

    #[test]
    fn test_record_emptiness() {
        assert!(CellRecord::new(3, CellValue::Empty).is_empty());
        assert!(!CellRecord::with_style(3, CellValue::Empty, 2).is_empty());
    }
}
