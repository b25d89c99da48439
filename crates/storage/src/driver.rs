//! Storage driver contract.

use crate::memory::MemoryDriver;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use tabula_core::{Error, Result, Row, RowKey, Value};

/// Restartable scan position over a driver's native order.
///
/// The cursor remembers the last key it yielded together with its ordinal, so a
/// driver can resume after that key even if it was removed in the meantime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanCursor {
    last: Option<(usize, RowKey)>,
    done: bool,
}

impl ScanCursor {
    /// Creates a cursor positioned before the first row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the cursor back before the first row.
    pub fn reset(&mut self) {
        self.last = None;
        self.done = false;
    }

    /// Key of the row the cursor is on, if any.
    #[inline]
    pub fn key(&self) -> Option<RowKey> {
        if self.done {
            None
        } else {
            self.last.map(|(_, k)| k)
        }
    }

    /// Ordinal of the row the cursor is on in driver order.
    #[inline]
    pub fn ordinal(&self) -> Option<usize> {
        if self.done {
            None
        } else {
            self.last.map(|(o, _)| o)
        }
    }

    /// Returns true once the scan has run past the last row.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Position the next row should be looked for at. Drivers call this from
    /// `advance`; `None` means the cursor is exhausted.
    pub fn last_position(&self) -> Option<Option<(usize, RowKey)>> {
        if self.done {
            None
        } else {
            Some(self.last)
        }
    }

    /// Records that the cursor now sits on `key` at `ordinal`.
    pub fn place(&mut self, ordinal: usize, key: RowKey) {
        self.last = Some((ordinal, key));
        self.done = false;
    }

    /// Marks the cursor exhausted.
    pub fn finish(&mut self) {
        self.last = None;
        self.done = true;
    }
}

/// Read tier every driver implements.
pub trait StorageDriver {
    /// Driver name used in diagnostics.
    fn name(&self) -> &str;

    /// Number of stored rows.
    fn count(&self) -> Result<usize>;

    /// Fetches the row stored under `key`, failing with `NotFound`.
    fn get(&self, key: RowKey) -> Result<Row>;

    /// Returns true if `key` is stored.
    fn contains(&self, key: RowKey) -> Result<bool>;

    /// Moves `cursor` to the next row in driver order and returns its key, or
    /// `None` once every row has been visited.
    fn advance(&self, cursor: &mut ScanCursor) -> Result<Option<RowKey>>;

    /// Deep copy of the stored rows, keys and key counter.
    fn snapshot(&self) -> Result<MemoryDriver>;

    /// Write tier, if implemented.
    fn as_writable(&mut self) -> Option<&mut dyn WritableDriver> {
        None
    }

    /// Sort tier, if implemented.
    fn as_sortable(&mut self) -> Option<&mut dyn SortableDriver> {
        None
    }

    /// Iterates `(key, row)` in driver order.
    fn iter(&self) -> Box<dyn Iterator<Item = Result<(RowKey, Row)>> + '_> {
        let mut cursor = ScanCursor::new();
        Box::new(core::iter::from_fn(move || match self.advance(&mut cursor) {
            Ok(Some(key)) => Some(self.get(key).map(|row| (key, row))),
            Ok(None) => None,
            Err(e) => {
                cursor.finish();
                Some(Err(e))
            }
        }))
    }
}

/// Write tier.
pub trait WritableDriver: StorageDriver {
    /// Stores `row` under a fresh key and returns the key.
    fn add(&mut self, row: Row) -> Result<RowKey>;

    /// Replaces the row stored under `key`.
    fn set(&mut self, key: RowKey, row: Row) -> Result<()>;

    /// Writes a single cell of the row stored under `key`.
    fn set_cell(&mut self, key: RowKey, position: usize, value: Value) -> Result<()>;

    /// Removes the row stored under `key`, failing with `NotFound`.
    fn remove(&mut self, key: RowKey) -> Result<()>;

    /// Clears `position` from every stored row.
    fn strip_position(&mut self, position: usize) -> Result<()> {
        let mut keys = Vec::new();
        let mut cursor = ScanCursor::new();
        while let Some(key) = self.advance(&mut cursor)? {
            keys.push(key);
        }
        for key in keys {
            let mut row = self.get(key)?;
            if row.clear(position).is_some() {
                self.set(key, row)?;
            }
        }
        Ok(())
    }
}

/// Sort tier.
pub trait SortableDriver: StorageDriver {
    /// Reorders rows physically. The sort is stable; keys are unchanged.
    fn sort_by(&mut self, compare: &mut dyn FnMut(&Row, &Row) -> Ordering) -> Result<()>;
}

/// Returns the write tier of `driver` or `UnsupportedCapability`.
pub fn writable(driver: &mut dyn StorageDriver) -> Result<&mut dyn WritableDriver> {
    let name = String::from(driver.name());
    driver
        .as_writable()
        .ok_or_else(|| Error::unsupported(name, "write"))
}

/// Returns the sort tier of `driver` or `UnsupportedCapability`.
pub fn sortable(driver: &mut dyn StorageDriver) -> Result<&mut dyn SortableDriver> {
    let name = String::from(driver.name());
    driver
        .as_sortable()
        .ok_or_else(|| Error::unsupported(name, "sort"))
}
