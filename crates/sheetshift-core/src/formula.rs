//! Formula token sequences and reference rewriting
//!
//! Formulas are kept as already-parsed token sequences, the way the binary format
//! stores them. Structural edits only touch the reference tokens: cell and area
//! references, their 3D forms carrying a sheet index, and position-encoded name
//! references. Nothing here parses formula text.

use crate::error::{Error, Result};
use crate::limits::GridLimits;
use crate::range::{Axis, BandShift, Range};

/// Operators between operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Concat,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Range,
    Union,
    Intersect,
    Negate,
    Percent,
}

/// A single cell reference with its relative/absolute flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
    pub row_relative: bool,
    pub col_relative: bool,
}

impl CellRef {
    /// A relative reference (`A1` style)
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            row_relative: true,
            col_relative: true,
        }
    }

    /// An absolute reference (`$A$1` style)
    pub fn absolute(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            row_relative: false,
            col_relative: false,
        }
    }

    fn as_range(&self) -> Range {
        Range::cell(self.row, self.col)
    }
}

/// An area reference with its relative/absolute flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaRef {
    pub range: Range,
    pub row_relative: bool,
    pub col_relative: bool,
}

impl AreaRef {
    /// A relative area (`A1:B2` style)
    pub fn new(range: Range) -> Self {
        Self {
            range,
            row_relative: true,
            col_relative: true,
        }
    }

    /// An absolute area (`$A$1:$B$2` style)
    pub fn absolute(range: Range) -> Self {
        Self {
            range,
            row_relative: false,
            col_relative: false,
        }
    }
}

/// One token of a parsed formula
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Bool(bool),
    Operator(Operator),
    Function { name: String, argc: u8 },
    /// Reference on the sheet hosting the formula
    Ref(CellRef),
    /// Area on the sheet hosting the formula
    Area(AreaRef),
    /// Reference on another sheet, by sheet index
    Ref3d { sheet: usize, cell: CellRef },
    /// Area on another sheet, by sheet index
    Area3d { sheet: usize, area: AreaRef },
    /// Defined name, by its position in the name registry
    Name(usize),
    /// A reference invalidated by an edit (`#REF!`)
    RefError,
    /// A name reference whose name was deleted (`#NAME?`)
    NameError,
}

/// A formula as a token sequence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Formula {
    pub tokens: Vec<Token>,
}

impl Formula {
    /// Create a formula from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Positions of every defined name the formula references
    pub fn name_refs(&self) -> impl Iterator<Item = usize> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            Token::Name(i) => Some(*i),
            _ => None,
        })
    }

    /// Whether any reference in the formula was invalidated
    pub fn has_ref_error(&self) -> bool {
        self.tokens.iter().any(|t| matches!(t, Token::RefError))
    }
}

impl From<Vec<Token>> for Formula {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

/// An edit that reference tokens have to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaEdit {
    /// Rows or columns inserted into or deleted from `sheet`
    Shift { sheet: usize, shift: BandShift },
    /// Cells of `source` on `sheet` moved by `(d_row, d_col)`
    Move {
        sheet: usize,
        source: Range,
        d_row: i64,
        d_col: i64,
    },
    /// A formula copied by `(d_row, d_col)`; only relative parts follow
    CopyDelta { d_row: i64, d_col: i64 },
    /// Sheets `first..first + count` removed
    DeleteSheets { first: usize, count: usize },
    /// `count` sheets inserted before `at`
    InsertSheets { at: usize, count: usize },
}

/// Rewrites reference tokens for an edit
///
/// `host` is the sheet holding the formula, or `None` for formulas that have no host
/// sheet (defined names, chart links). Returns `Ok(None)` when nothing changed.
pub trait FormulaRewriter {
    fn rewrite(
        &self,
        formula: &Formula,
        host: Option<usize>,
        edit: &FormulaEdit,
    ) -> Result<Option<Formula>>;
}

/// The built-in [`FormulaRewriter`] for cell, area and 3D references
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceRewriter {
    pub limits: GridLimits,
}

/// Outcome of rewriting one reference
enum Rewritten<T> {
    Same,
    Changed(T),
    Invalid,
}

impl ReferenceRewriter {
    /// Create a rewriter for the given grid
    pub fn new(limits: GridLimits) -> Self {
        Self { limits }
    }

    fn max_along(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Rows => self.limits.last_row(),
            Axis::Columns => self.limits.last_col(),
        }
    }

    fn rewrite_range(&self, range: &Range, on_sheet: bool, edit: &FormulaEdit) -> Result<Rewritten<Range>> {
        match *edit {
            FormulaEdit::Shift { shift, .. } if on_sheet => self.shift_range(range, &shift),
            FormulaEdit::Move {
                source,
                d_row,
                d_col,
                ..
            } if on_sheet => {
                if source.contains(range) {
                    let moved = range
                        .offset(d_row, d_col)
                        .filter(|r| r.last_row <= self.limits.last_row() && r.last_col <= self.limits.last_col())
                        .ok_or_else(|| Error::FormulaBounds(format!("{} moved off the grid", range)))?;
                    return Ok(Rewritten::Changed(moved));
                }
                let dest = source.offset(d_row, d_col);
                if dest.is_some_and(|d| d.contains(range)) {
                    // Overwritten by the move
                    return Ok(Rewritten::Invalid);
                }
                Ok(Rewritten::Same)
            }
            _ => Ok(Rewritten::Same),
        }
    }

    fn shift_range(&self, range: &Range, shift: &BandShift) -> Result<Rewritten<Range>> {
        let (lo, hi) = range.span(shift.axis.other());
        if shift.is_noop() || !shift.covers_across(lo, hi) {
            return Ok(Rewritten::Same);
        }
        let (first, last) = range.span(shift.axis);
        if last < shift.at {
            return Ok(Rewritten::Same);
        }
        let f = shift.shift_first(first);
        let l = shift.shift_last(last);
        if f > l {
            return Ok(Rewritten::Invalid);
        }
        let max = self.max_along(shift.axis) as i64;
        if f > max || (range.is_single_cell() && l > max) {
            return Err(Error::FormulaBounds(format!(
                "{} would be pushed past the last {}",
                range,
                if shift.axis == Axis::Rows { "row" } else { "column" }
            )));
        }
        let shifted = range.with_span(shift.axis, f as u32, l.min(max) as u32);
        if shifted == *range {
            Ok(Rewritten::Same)
        } else {
            Ok(Rewritten::Changed(shifted))
        }
    }

    fn copy_cell(&self, cell: &CellRef, d_row: i64, d_col: i64) -> Rewritten<CellRef> {
        let mut out = *cell;
        if cell.row_relative {
            match self.offset_index(cell.row, d_row, self.limits.last_row()) {
                Some(r) => out.row = r,
                None => return Rewritten::Invalid,
            }
        }
        if cell.col_relative {
            match self.offset_index(cell.col, d_col, self.limits.last_col()) {
                Some(c) => out.col = c,
                None => return Rewritten::Invalid,
            }
        }
        if out == *cell {
            Rewritten::Same
        } else {
            Rewritten::Changed(out)
        }
    }

    fn copy_area(&self, area: &AreaRef, d_row: i64, d_col: i64) -> Rewritten<AreaRef> {
        let d_row = if area.row_relative { d_row } else { 0 };
        let d_col = if area.col_relative { d_col } else { 0 };
        if d_row == 0 && d_col == 0 {
            return Rewritten::Same;
        }
        match area.range.offset(d_row, d_col) {
            Some(r) if r.last_row <= self.limits.last_row() && r.last_col <= self.limits.last_col() => {
                Rewritten::Changed(AreaRef { range: r, ..*area })
            }
            _ => Rewritten::Invalid,
        }
    }

    fn offset_index(&self, value: u32, delta: i64, max: u32) -> Option<u32> {
        let v = value as i64 + delta;
        if v < 0 || v > max as i64 {
            None
        } else {
            Some(v as u32)
        }
    }

    fn rewrite_sheet_index(&self, sheet: usize, edit: &FormulaEdit) -> Rewritten<usize> {
        match *edit {
            FormulaEdit::DeleteSheets { first, count } => {
                if sheet >= first && sheet < first + count {
                    Rewritten::Invalid
                } else if sheet >= first + count {
                    Rewritten::Changed(sheet - count)
                } else {
                    Rewritten::Same
                }
            }
            FormulaEdit::InsertSheets { at, count } if sheet >= at && count > 0 => {
                Rewritten::Changed(sheet + count)
            }
            _ => Rewritten::Same,
        }
    }

    fn rewrite_token(&self, token: &Token, host: Option<usize>, edit: &FormulaEdit) -> Result<Option<Token>> {
        let edit_sheet = match *edit {
            FormulaEdit::Shift { sheet, .. } | FormulaEdit::Move { sheet, .. } => Some(sheet),
            _ => None,
        };
        let token = match token {
            Token::Ref(cell) => match *edit {
                FormulaEdit::CopyDelta { d_row, d_col } => match self.copy_cell(cell, d_row, d_col) {
                    Rewritten::Same => None,
                    Rewritten::Changed(c) => Some(Token::Ref(c)),
                    Rewritten::Invalid => Some(Token::RefError),
                },
                _ => {
                    let on_sheet = host.is_some() && host == edit_sheet;
                    match self.rewrite_range(&cell.as_range(), on_sheet, edit)? {
                        Rewritten::Same => None,
                        Rewritten::Changed(r) => Some(Token::Ref(CellRef {
                            row: r.first_row,
                            col: r.first_col,
                            ..*cell
                        })),
                        Rewritten::Invalid => Some(Token::RefError),
                    }
                }
            },
            Token::Area(area) => match *edit {
                FormulaEdit::CopyDelta { d_row, d_col } => match self.copy_area(area, d_row, d_col) {
                    Rewritten::Same => None,
                    Rewritten::Changed(a) => Some(Token::Area(a)),
                    Rewritten::Invalid => Some(Token::RefError),
                },
                _ => {
                    let on_sheet = host.is_some() && host == edit_sheet;
                    match self.rewrite_range(&area.range, on_sheet, edit)? {
                        Rewritten::Same => None,
                        Rewritten::Changed(r) => Some(Token::Area(AreaRef { range: r, ..*area })),
                        Rewritten::Invalid => Some(Token::RefError),
                    }
                }
            },
            Token::Ref3d { sheet, cell } => match *edit {
                FormulaEdit::CopyDelta { d_row, d_col } => match self.copy_cell(cell, d_row, d_col) {
                    Rewritten::Same => None,
                    Rewritten::Changed(c) => Some(Token::Ref3d { sheet: *sheet, cell: c }),
                    Rewritten::Invalid => Some(Token::RefError),
                },
                FormulaEdit::DeleteSheets { .. } | FormulaEdit::InsertSheets { .. } => {
                    match self.rewrite_sheet_index(*sheet, edit) {
                        Rewritten::Same => None,
                        Rewritten::Changed(s) => Some(Token::Ref3d { sheet: s, cell: *cell }),
                        Rewritten::Invalid => Some(Token::RefError),
                    }
                }
                _ => match self.rewrite_range(&cell.as_range(), Some(*sheet) == edit_sheet, edit)? {
                    Rewritten::Same => None,
                    Rewritten::Changed(r) => Some(Token::Ref3d {
                        sheet: *sheet,
                        cell: CellRef {
                            row: r.first_row,
                            col: r.first_col,
                            ..*cell
                        },
                    }),
                    Rewritten::Invalid => Some(Token::RefError),
                },
            },
            Token::Area3d { sheet, area } => match *edit {
                FormulaEdit::CopyDelta { d_row, d_col } => match self.copy_area(area, d_row, d_col) {
                    Rewritten::Same => None,
                    Rewritten::Changed(a) => Some(Token::Area3d { sheet: *sheet, area: a }),
                    Rewritten::Invalid => Some(Token::RefError),
                },
                FormulaEdit::DeleteSheets { .. } | FormulaEdit::InsertSheets { .. } => {
                    match self.rewrite_sheet_index(*sheet, edit) {
                        Rewritten::Same => None,
                        Rewritten::Changed(s) => Some(Token::Area3d { sheet: s, area: *area }),
                        Rewritten::Invalid => Some(Token::RefError),
                    }
                }
                _ => match self.rewrite_range(&area.range, Some(*sheet) == edit_sheet, edit)? {
                    Rewritten::Same => None,
                    Rewritten::Changed(r) => Some(Token::Area3d {
                        sheet: *sheet,
                        area: AreaRef { range: r, ..*area },
                    }),
                    Rewritten::Invalid => Some(Token::RefError),
                },
            },
            _ => None,
        };
        Ok(token)
    }
}

impl FormulaRewriter for ReferenceRewriter {
    fn rewrite(
        &self,
        formula: &Formula,
        host: Option<usize>,
        edit: &FormulaEdit,
    ) -> Result<Option<Formula>> {
        let mut out: Option<Vec<Token>> = None;
        for (i, token) in formula.tokens.iter().enumerate() {
            if let Some(new_token) = self.rewrite_token(token, host, edit)? {
                out.get_or_insert_with(|| formula.tokens[..i].to_vec())
                    .push(new_token);
            } else if let Some(tokens) = out.as_mut() {
                tokens.push(token.clone());
            }
        }
        Ok(out.map(Formula::new))
    }
}
