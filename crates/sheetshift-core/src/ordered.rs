//! Lazily-sorted ordered sequences
//!
//! Records in a binary workbook arrive in file order, which is almost always already
//! sorted. [`OrderedIndex`] keeps a `sorted` flag instead of sorting on every mutation:
//! appends that provably keep the order leave the flag set, and the next lookup sorts
//! at most once.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// A total order over `T`, plus a hint for cheap appends
pub trait IndexOrder<T> {
    /// Compare two items
    fn compare(&self, a: &T, b: &T) -> Ordering;

    /// Whether appending `item` after `items` may break the order
    ///
    /// The default is pessimistic. Orders that can answer in O(1) (for instance by
    /// looking at the last element) should override it so that bulk loads in file
    /// order never trigger a sort.
    fn add_unsorts(&self, items: &[T], item: &T) -> bool {
        let _ = (items, item);
        true
    }
}

/// Records that carry a single integer sort key
pub trait Keyed {
    fn key(&self) -> u32;
}

impl Keyed for u32 {
    fn key(&self) -> u32 {
        *self
    }
}

/// Ascending order on [`Keyed::key`], with an O(1) append check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ascending;

impl<T: Keyed> IndexOrder<T> for Ascending {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.key().cmp(&b.key())
    }

    fn add_unsorts(&self, items: &[T], item: &T) -> bool {
        items.last().is_some_and(|last| last.key() >= item.key())
    }
}

/// Order given by a comparison closure; every append unsorts
#[derive(Clone, Copy)]
pub struct OrderBy<F>(pub F);

impl<T, F> IndexOrder<T> for OrderBy<F>
where
    F: Fn(&T, &T) -> Ordering,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> fmt::Debug for OrderBy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OrderBy(..)")
    }
}

/// Ordered sequence of `T` that sorts lazily
#[derive(Debug, Clone)]
pub struct OrderedIndex<T, O> {
    items: Vec<T>,
    sorted: bool,
    order: O,
}

impl<T, O: Default> Default for OrderedIndex<T, O> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            sorted: true,
            order: O::default(),
        }
    }
}

impl<T, O: IndexOrder<T>> OrderedIndex<T, O> {
    /// Create an empty index with the given order
    pub fn new(order: O) -> Self {
        Self {
            items: Vec::new(),
            sorted: true,
            order,
        }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the items are known to be in order
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Append an item. Amortized O(1).
    pub fn add(&mut self, item: T) {
        if self.sorted && self.order.add_unsorts(&self.items, &item) {
            self.sorted = false;
        }
        self.items.push(item);
    }

    /// Insert at a position the caller has already verified with [`find`](Self::find)
    ///
    /// Never touches the sorted flag.
    pub fn insert(&mut self, at: usize, item: T) -> Result<()> {
        if at > self.items.len() {
            return Err(Error::IndexOutOfBounds {
                index: at,
                len: self.items.len(),
            });
        }
        self.items.insert(at, item);
        Ok(())
    }

    /// Sort now if needed. Stable, so equal keys keep their insertion order.
    pub fn sort(&mut self) {
        if !self.sorted {
            let order = &self.order;
            self.items.sort_by(|a, b| order.compare(a, b));
            self.sorted = true;
        }
    }

    /// Binary search for `target`, sorting first if needed
    ///
    /// Returns `(found, index)`; when not found, `index` is where `target` would be
    /// inserted to keep the order.
    pub fn find(&mut self, target: &T) -> (bool, usize) {
        self.sort();
        let order = &self.order;
        match self.items.binary_search_by(|probe| order.compare(probe, target)) {
            Ok(i) => (true, i),
            Err(i) => (false, i),
        }
    }

    /// Binary search with a caller-supplied probe, sorting first if needed
    ///
    /// `probe` must return how an item compares to the sought key.
    pub fn find_by<F>(&mut self, probe: F) -> (bool, usize)
    where
        F: FnMut(&T) -> Ordering,
    {
        self.sort();
        match self.items.binary_search_by(probe) {
            Ok(i) => (true, i),
            Err(i) => (false, i),
        }
    }

    /// Get the item at `at`
    pub fn get(&self, at: usize) -> Result<&T> {
        Error::check_index(at, self.items.len())?;
        Ok(&self.items[at])
    }

    /// Get the item at `at` mutably. The caller must not change its sort key.
    pub fn get_mut(&mut self, at: usize) -> Result<&mut T> {
        Error::check_index(at, self.items.len())?;
        Ok(&mut self.items[at])
    }

    /// Remove and return the item at `at`
    pub fn delete(&mut self, at: usize) -> Result<T> {
        Error::check_index(at, self.items.len())?;
        Ok(self.items.remove(at))
    }

    /// Remove `count` items starting at `at`, handing each one to `teardown`
    pub fn delete_range<F>(&mut self, at: usize, count: usize, teardown: F) -> Result<()>
    where
        F: FnMut(T),
    {
        let end = at.checked_add(count).unwrap_or(usize::MAX);
        if end > self.items.len() {
            return Err(Error::IndexOutOfBounds {
                index: end.saturating_sub(1),
                len: self.items.len(),
            });
        }
        self.items.drain(at..end).for_each(teardown);
        Ok(())
    }

    /// Keep only the items for which `keep` returns true. Preserves order.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.items.retain(keep);
    }

    /// Flag the items as possibly out of order after keys were changed in place
    pub fn mark_unsorted(&mut self) {
        self.sorted = false;
    }

    /// Remove every item
    pub fn clear(&mut self) {
        self.items.clear();
        self.sorted = true;
    }

    /// The items in their current order
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate over the items in their current order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate mutably. The caller must not change sort keys, or must call
    /// [`mark_unsorted`](Self::mark_unsorted) afterwards.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// The order in use
    pub fn order(&self) -> &O {
        &self.order
    }
}

impl<'a, T, O: IndexOrder<T>> IntoIterator for &'a OrderedIndex<T, O> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
