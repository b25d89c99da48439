//! Positional row structure.
//!
//! A storage driver never sees column names. It stores `Row`s whose cells are
//! addressed by the column's stable position; the table translates between names
//! and positions.

use crate::value::Value;
use alloc::vec::Vec;

/// Opaque row key assigned by a storage driver. Keys are never reused.
pub type RowKey = u64;

/// A positional record.
///
/// Cells are sparse: `None` means the position was never written (or was stripped
/// when its column was removed), `Some(Value::Null)` is an explicit null.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: Vec<Option<Value>>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Creates a dense row from values at positions `0..values.len()`.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            cells: values.into_iter().map(Some).collect(),
        }
    }

    /// Creates a row from raw cells.
    pub fn from_cells(cells: Vec<Option<Value>>) -> Self {
        let mut row = Self { cells };
        row.trim();
        row
    }

    /// Gets the value written at `position`.
    #[inline]
    pub fn get(&self, position: usize) -> Option<&Value> {
        self.cells.get(position).and_then(|c| c.as_ref())
    }

    /// Writes `value` at `position`, growing the row as needed.
    pub fn set(&mut self, position: usize, value: Value) {
        if position >= self.cells.len() {
            self.cells.resize(position + 1, None);
        }
        self.cells[position] = Some(value);
    }

    /// Removes the value at `position`, returning it.
    pub fn clear(&mut self, position: usize) -> Option<Value> {
        let old = self.cells.get_mut(position).and_then(|c| c.take());
        self.trim();
        old
    }

    /// Returns true if a value was written at `position`.
    #[inline]
    pub fn contains(&self, position: usize) -> bool {
        self.get(position).is_some()
    }

    /// Raw cells, indexed by position.
    #[inline]
    pub fn cells(&self) -> &[Option<Value>] {
        &self.cells
    }

    /// Iterates `(position, value)` over written cells.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|v| (i, v)))
    }

    /// Number of written cells.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Returns true if no cell is written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn trim(&mut self) {
        while matches!(self.cells.last(), Some(None)) {
            self.cells.pop();
        }
    }
}
