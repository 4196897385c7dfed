//! Column metadata

use log::trace;

use sheetshift_core::{Ascending, Axis, BandShift, Keyed, OrderedIndex, Result};

use crate::structure::{ArrangeInsertRange, EditContext};

/// Formatting shared by a span of columns, like a COLINFO record
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Start column index
    pub first: u32,
    /// End column index (inclusive)
    pub last: u32,
    /// Custom width (None = default)
    pub width: Option<f64>,
    /// Columns are hidden
    pub hidden: bool,
    /// Outline/grouping level (0-7)
    pub outline_level: u8,
    /// Column-level style index (None = no column style)
    pub style_index: Option<u32>,
    /// Collapsed (in outline)
    pub collapsed: bool,
}

impl ColumnInfo {
    /// Column info for a single column
    pub fn single(index: u32) -> Self {
        Self::span(index, index)
    }

    /// Column info for a span of columns
    pub fn span(first: u32, last: u32) -> Self {
        Self {
            first: first.min(last),
            last: first.max(last),
            width: None,
            hidden: false,
            outline_level: 0,
            style_index: None,
            collapsed: false,
        }
    }

    /// Set width
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Set hidden
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Check if `col` is inside the span
    pub fn contains(&self, col: u32) -> bool {
        col >= self.first && col <= self.last
    }

    fn same_format(&self, other: &ColumnInfo) -> bool {
        self.width == other.width
            && self.hidden == other.hidden
            && self.outline_level == other.outline_level
            && self.style_index == other.style_index
            && self.collapsed == other.collapsed
    }
}

impl Keyed for ColumnInfo {
    fn key(&self) -> u32 {
        self.first
    }
}

/// The non-overlapping column spans of one sheet
#[derive(Debug, Clone, Default)]
pub struct ColumnInfoList {
    spans: OrderedIndex<ColumnInfo, Ascending>,
}

impl ColumnInfoList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spans
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if no column carries custom formatting
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Append a span read from a file, trusting file order
    pub fn add(&mut self, info: ColumnInfo) {
        self.spans.add(info);
    }

    /// The span covering `col`
    pub fn get(&mut self, col: u32) -> Option<&ColumnInfo> {
        let (found, at) = self.spans.find_by(|s| s.first.cmp(&col));
        let at = if found { at } else { at.checked_sub(1)? };
        self.spans.get(at).ok().filter(|s| s.contains(col))
    }

    /// The span covering `col`, without sorting
    pub fn peek(&self, col: u32) -> Option<&ColumnInfo> {
        let spans = self.spans.as_slice();
        if self.spans.is_sorted() {
            let at = spans.partition_point(|s| s.first <= col).checked_sub(1)?;
            spans.get(at).filter(|s| s.contains(col))
        } else {
            spans.iter().find(|s| s.contains(col))
        }
    }

    /// Spans in column order
    pub fn iter(&mut self) -> std::slice::Iter<'_, ColumnInfo> {
        self.spans.sort();
        self.spans.iter()
    }

    /// Replace the formatting of `info.first..=info.last`
    ///
    /// Existing spans are cut around it; neighbours with identical formatting are
    /// joined.
    pub fn set(&mut self, info: ColumnInfo) {
        self.spans.sort();
        let mut out: Vec<ColumnInfo> = Vec::with_capacity(self.spans.len() + 2);
        for span in self.spans.iter() {
            if span.last < info.first || span.first > info.last {
                out.push(span.clone());
                continue;
            }
            if span.first < info.first {
                out.push(ColumnInfo {
                    last: info.first - 1,
                    ..span.clone()
                });
            }
            if span.last > info.last {
                out.push(ColumnInfo {
                    first: info.last + 1,
                    ..span.clone()
                });
            }
        }
        out.push(info);
        out.sort_by_key(|s| s.first);
        self.replace(out);
    }

    fn replace(&mut self, spans: Vec<ColumnInfo>) {
        self.spans.clear();
        for span in spans {
            let joins = self
                .spans
                .as_slice()
                .last()
                .is_some_and(|prev| prev.last as u64 + 1 == span.first as u64 && prev.same_format(&span));
            if joins {
                let at = self.spans.len() - 1;
                if let Ok(prev) = self.spans.get_mut(at) {
                    prev.last = span.last;
                }
            } else {
                self.spans.add(span);
            }
        }
    }

    /// Spans intersecting `first..=last`, clipped to it
    pub fn clip(&self, first: u32, last: u32) -> Vec<ColumnInfo> {
        let mut clipped: Vec<ColumnInfo> = self
            .spans
            .iter()
            .filter(|s| s.last >= first && s.first <= last)
            .map(|s| ColumnInfo {
                first: s.first.max(first),
                last: s.last.min(last),
                ..s.clone()
            })
            .collect();
        clipped.sort_by_key(|s| s.first);
        clipped
    }
}

impl ArrangeInsertRange for ColumnInfoList {
    /// Only whole-column edits move column formatting
    fn arrange_insert_range(&mut self, shift: &BandShift, ctx: &EditContext<'_>) -> Result<()> {
        if shift.is_noop() || shift.axis != Axis::Columns || !shift.covers_across(0, ctx.limits().last_row()) {
            return Ok(());
        }
        self.spans.sort();
        let mut out = Vec::with_capacity(self.spans.len());
        for span in self.spans.iter() {
            match shift.apply_span(span.first, span.last) {
                Some((first, last)) => out.push(ColumnInfo {
                    first,
                    last,
                    ..span.clone()
                }),
                None => trace!("column span {}..={} removed", span.first, span.last),
            }
        }
        self.replace(out);
        Ok(())
    }
}
