//! Manual page breaks

use log::{trace, warn};

use sheetshift_core::{Axis, BandShift, Error, PageBreakPolicy, Result};

use crate::structure::{ArrangeInsertRange, EditContext};

/// A manual break before band `index`, spanning `first..=last` of the other axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageBreak {
    pub index: u32,
    pub first: u32,
    pub last: u32,
}

impl PageBreak {
    /// A break spanning the whole other axis
    pub fn new(index: u32, last: u32) -> Self {
        Self { index, first: 0, last }
    }
}

/// Horizontal (row) and vertical (column) page breaks of one sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBreaks {
    rows: Vec<PageBreak>,
    cols: Vec<PageBreak>,
}

impl PageBreaks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Breaks between rows, in row order
    pub fn row_breaks(&self) -> &[PageBreak] {
        &self.rows
    }

    /// Breaks between columns, in column order
    pub fn col_breaks(&self) -> &[PageBreak] {
        &self.cols
    }

    fn list_mut(&mut self, axis: Axis) -> &mut Vec<PageBreak> {
        match axis {
            Axis::Rows => &mut self.rows,
            Axis::Columns => &mut self.cols,
        }
    }

    /// Add a break before band `brk.index` along `axis`
    pub fn add(&mut self, axis: Axis, brk: PageBreak, max_breaks: usize) -> Result<()> {
        let list = self.list_mut(axis);
        if list.iter().any(|b| b.index == brk.index) {
            return Ok(());
        }
        if list.len() >= max_breaks {
            return Err(Error::LimitExceeded {
                what: "page breaks",
                limit: max_breaks,
                requested: list.len() + 1,
            });
        }
        list.push(brk);
        list.sort();
        Ok(())
    }

    /// Remove the break before band `index` along `axis`
    pub fn remove(&mut self, axis: Axis, index: u32) -> bool {
        let list = self.list_mut(axis);
        let before = list.len();
        list.retain(|b| b.index != index);
        list.len() != before
    }

    /// Breaks along `axis` with an index in `first..=last`
    pub fn clip(&self, axis: Axis, first: u32, last: u32) -> Vec<PageBreak> {
        let list = match axis {
            Axis::Rows => &self.rows,
            Axis::Columns => &self.cols,
        };
        list.iter().filter(|b| b.index >= first && b.index <= last).copied().collect()
    }

    /// Add copies of `breaks` moved by `delta`, applying the page-break policy
    pub fn paste(&mut self, axis: Axis, breaks: &[PageBreak], delta: i64, ctx: &EditContext<'_>) -> Result<()> {
        let max_index = match axis {
            Axis::Rows => ctx.limits().last_row(),
            Axis::Columns => ctx.limits().last_col(),
        } as i64;
        let mut merged = match axis {
            Axis::Rows => self.rows.clone(),
            Axis::Columns => self.cols.clone(),
        };
        for brk in breaks {
            let index = brk.index as i64 + delta;
            if index <= 0 || index > max_index {
                continue;
            }
            if !merged.iter().any(|b| b.index as i64 == index) {
                merged.push(PageBreak {
                    index: index as u32,
                    ..*brk
                });
            }
        }
        merged.sort();
        let merged = enforce_limit(merged, ctx)?;
        *self.list_mut(axis) = merged;
        Ok(())
    }
}

fn enforce_limit(mut breaks: Vec<PageBreak>, ctx: &EditContext<'_>) -> Result<Vec<PageBreak>> {
    let limit = ctx.limits().max_page_breaks;
    if breaks.len() <= limit {
        return Ok(breaks);
    }
    match ctx.options().page_break_policy {
        PageBreakPolicy::Error => Err(Error::LimitExceeded {
            what: "page breaks",
            limit,
            requested: breaks.len(),
        }),
        PageBreakPolicy::Truncate => {
            warn!("{} page breaks exceed the limit of {}, dropping the rest", breaks.len(), limit);
            breaks.truncate(limit);
            Ok(breaks)
        }
    }
}

impl ArrangeInsertRange for PageBreaks {
    /// Breaks follow whole-row and whole-column edits only
    fn arrange_insert_range(&mut self, shift: &BandShift, ctx: &EditContext<'_>) -> Result<()> {
        let full_span = match shift.axis {
            Axis::Rows => ctx.limits().last_col(),
            Axis::Columns => ctx.limits().last_row(),
        };
        if shift.is_noop() || !shift.covers_across(0, full_span) {
            return Ok(());
        }
        let deleted = shift.deleted_band();
        let list = self.list_mut(shift.axis);
        let mut out = Vec::with_capacity(list.len());
        for brk in list.iter() {
            if deleted.is_some_and(|(f, l)| brk.index >= f && brk.index <= l) {
                trace!("page break before {} deleted", brk.index);
                continue;
            }
            let index = shift.shift_first(brk.index);
            if index > shift.max as i64 {
                continue;
            }
            out.push(PageBreak {
                index: index as u32,
                ..*brk
            });
        }
        out.dedup_by_key(|b| b.index);
        *list = out;
        Ok(())
    }
}
