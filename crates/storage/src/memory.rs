//! In-memory ordered map driver.

use crate::driver::{ScanCursor, SortableDriver, StorageDriver, WritableDriver};
use alloc::vec::Vec;
use core::cmp::Ordering;
use hashbrown::hash_map::DefaultHashBuilder;
use indexmap::IndexMap;
use tabula_core::{Error, Result, Row, RowKey, Value};

type RowMap = IndexMap<RowKey, Row, DefaultHashBuilder>;

/// Stores rows in insertion order (or the order of the last `sort_by`).
///
/// Keys come from a monotonically increasing counter and are never handed out
/// twice, even after the row that held them is removed.
#[derive(Clone, Debug, Default)]
pub struct MemoryDriver {
    rows: RowMap,
    next_key: RowKey,
}

impl MemoryDriver {
    /// Creates an empty driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a driver from existing `(key, row)` pairs. `next_key` is raised past
    /// every given key so keys stay unique.
    pub fn from_rows(rows: impl IntoIterator<Item = (RowKey, Row)>, next_key: RowKey) -> Self {
        let rows: RowMap = rows.into_iter().collect();
        let floor = rows.keys().max().map(|k| k + 1).unwrap_or(0);
        Self {
            rows,
            next_key: next_key.max(floor),
        }
    }

    /// Key the next `add` will assign.
    #[inline]
    pub fn next_key(&self) -> RowKey {
        self.next_key
    }

    /// Number of stored rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the driver holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keys in driver order.
    pub fn keys(&self) -> Vec<RowKey> {
        self.rows.keys().copied().collect()
    }
}

impl StorageDriver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    fn count(&self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn get(&self, key: RowKey) -> Result<Row> {
        self.rows.get(&key).cloned().ok_or_else(|| Error::not_found(key))
    }

    fn contains(&self, key: RowKey) -> Result<bool> {
        Ok(self.rows.contains_key(&key))
    }

    fn advance(&self, cursor: &mut ScanCursor) -> Result<Option<RowKey>> {
        let next = match cursor.last_position() {
            None => return Ok(None),
            Some(None) => 0,
            Some(Some((ordinal, key))) => match self.rows.get_index_of(&key) {
                Some(index) => index + 1,
                // The last row was removed; its successor slid into its slot.
                None => ordinal,
            },
        };
        match self.rows.get_index(next) {
            Some((key, _)) => {
                cursor.place(next, *key);
                Ok(Some(*key))
            }
            None => {
                cursor.finish();
                Ok(None)
            }
        }
    }

    fn snapshot(&self) -> Result<MemoryDriver> {
        Ok(self.clone())
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableDriver> {
        Some(self)
    }

    fn as_sortable(&mut self) -> Option<&mut dyn SortableDriver> {
        Some(self)
    }
}

impl WritableDriver for MemoryDriver {
    fn add(&mut self, row: Row) -> Result<RowKey> {
        let key = self.next_key;
        self.next_key += 1;
        self.rows.insert(key, row);
        Ok(key)
    }

    fn set(&mut self, key: RowKey, row: Row) -> Result<()> {
        match self.rows.get_mut(&key) {
            Some(slot) => {
                *slot = row;
                Ok(())
            }
            None => Err(Error::not_found(key)),
        }
    }

    fn set_cell(&mut self, key: RowKey, position: usize, value: Value) -> Result<()> {
        let row = self.rows.get_mut(&key).ok_or_else(|| Error::not_found(key))?;
        row.set(position, value);
        Ok(())
    }

    fn remove(&mut self, key: RowKey) -> Result<()> {
        self.rows
            .shift_remove(&key)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(key))
    }

    fn strip_position(&mut self, position: usize) -> Result<()> {
        for row in self.rows.values_mut() {
            row.clear(position);
        }
        Ok(())
    }
}

impl SortableDriver for MemoryDriver {
    fn sort_by(&mut self, compare: &mut dyn FnMut(&Row, &Row) -> Ordering) -> Result<()> {
        self.rows.sort_by(|_, a, _, b| compare(a, b));
        tracing::debug!(rows = self.rows.len(), "memory driver sorted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn int_row(v: i64) -> Row {
        Row::from_values(vec![Value::Int64(v)])
    }

    fn scan(driver: &MemoryDriver) -> Vec<RowKey> {
        driver.iter().map(|r| r.unwrap().0).collect()
    }

    #[test]
    fn test_add_get_remove() {
        let mut driver = MemoryDriver::new();
        let a = driver.add(int_row(1)).unwrap();
        let b = driver.add(int_row(2)).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(driver.get(b).unwrap(), int_row(2));

        driver.remove(a).unwrap();
        assert!(driver.remove(a).unwrap_err().is_not_found());
        assert!(driver.get(a).unwrap_err().is_not_found());
        assert_eq!(driver.count().unwrap(), 1);
    }

    #[test]
    fn test_keys_never_reused() {
        let mut driver = MemoryDriver::new();
        let a = driver.add(int_row(1)).unwrap();
        driver.remove(a).unwrap();
        let b = driver.add(int_row(2)).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, 1);
    }

    #[test]
    fn test_set_cell_and_set() {
        let mut driver = MemoryDriver::new();
        let key = driver.add(int_row(1)).unwrap();
        driver.set_cell(key, 2, Value::from("x")).unwrap();
        let row = driver.get(key).unwrap();
        assert_eq!(row.get(2), Some(&Value::from("x")));

        driver.set(key, int_row(9)).unwrap();
        assert_eq!(driver.get(key).unwrap(), int_row(9));
        assert!(driver.set(77, int_row(0)).unwrap_err().is_not_found());
        assert!(driver.set_cell(77, 0, Value::Null).unwrap_err().is_not_found());
    }

    #[test]
    fn test_sort_is_physical_and_stable() {
        let mut driver = MemoryDriver::new();
        for v in [3, 1, 2, 1] {
            driver.add(int_row(v)).unwrap();
        }
        driver
            .sort_by(&mut |a, b| a.get(0).cmp(&b.get(0)))
            .unwrap();
        assert_eq!(scan(&driver), vec![1, 3, 2, 0]);
        // Keys survive the reorder.
        assert_eq!(driver.get(0).unwrap(), int_row(3));
    }

    #[test]
    fn test_cursor_survives_removal_of_current_row() {
        let mut driver = MemoryDriver::new();
        for v in 0..4 {
            driver.add(int_row(v)).unwrap();
        }
        let mut cursor = ScanCursor::new();
        assert_eq!(driver.advance(&mut cursor).unwrap(), Some(0));
        assert_eq!(driver.advance(&mut cursor).unwrap(), Some(1));
        driver.remove(1).unwrap();
        assert_eq!(driver.advance(&mut cursor).unwrap(), Some(2));
        assert_eq!(driver.advance(&mut cursor).unwrap(), Some(3));
        assert_eq!(driver.advance(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_strip_position() {
        let mut driver = MemoryDriver::new();
        let key = driver
            .add(Row::from_values(vec![Value::Int64(1), Value::Int64(2)]))
            .unwrap();
        driver.strip_position(0).unwrap();
        let row = driver.get(key).unwrap();
        assert_eq!(row.get(0), None);
        assert_eq!(row.get(1), Some(&Value::Int64(2)));
    }

    #[test]
    fn test_from_rows_raises_counter() {
        let mut driver = MemoryDriver::from_rows(vec![(5, int_row(1))], 0);
        assert_eq!(driver.add(int_row(2)).unwrap(), 6);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut driver = MemoryDriver::new();
        let key = driver.add(int_row(1)).unwrap();
        let copy = driver.snapshot().unwrap();
        driver.set(key, int_row(2)).unwrap();
        assert_eq!(copy.get(key).unwrap(), int_row(1));
        assert_eq!(copy.next_key(), driver.next_key());
    }
}
