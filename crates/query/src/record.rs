//! Per-row named views bound weakly to their table.

use crate::table::{upgrade, TableRef};
use std::fmt;
use tabula_core::{NamedRow, Result, RowKey, Value};

/// One row of a table, materialized as a named snapshot.
///
/// The snapshot stays readable after the table is dropped; anything that
/// needs the table (filling, writing, refreshing) fails with `DeadReference`.
#[derive(Clone)]
pub struct Record {
    table: TableRef,
    key: RowKey,
    snapshot: NamedRow,
}

impl Record {
    pub(crate) fn new(table: TableRef, key: RowKey, snapshot: NamedRow) -> Self {
        Self {
            table,
            key,
            snapshot,
        }
    }

    #[inline]
    pub fn key(&self) -> RowKey {
        self.key
    }

    /// Cached value of `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.snapshot.get(column)
    }

    /// The cached snapshot.
    pub fn values(&self) -> &NamedRow {
        &self.snapshot
    }

    pub fn into_values(self) -> NamedRow {
        self.snapshot
    }

    pub fn is_alive(&self) -> bool {
        self.table.strong_count() > 0
    }

    /// The row with every current column present, unwritten ones as `Null`.
    pub fn filled(&self) -> Result<NamedRow> {
        upgrade(&self.table)?.get_row(self.key, true)
    }

    /// Re-reads the row from the table.
    pub fn refresh(&mut self) -> Result<()> {
        self.snapshot = upgrade(&self.table)?.get_row(self.key, false)?;
        Ok(())
    }

    /// Writes one cell through the table and refreshes the snapshot.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<()> {
        upgrade(&self.table)?.update_cell(self.key, column, value)?;
        self.refresh()
    }

    /// Replaces the whole row and refreshes the snapshot.
    pub fn replace(&mut self, row: NamedRow) -> Result<()> {
        upgrade(&self.table)?.update_record(self.key, row)?;
        self.refresh()
    }

    /// Removes the row from the table. Removing an already absent row is a no-op.
    pub fn delete(&self) -> Result<()> {
        upgrade(&self.table)?.remove_record(self.key)
    }

    /// Whether the row is still stored.
    pub fn exists(&self) -> Result<bool> {
        upgrade(&self.table)?.record_exists(self.key)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("key", &self.key)
            .field("values", &self.snapshot)
            .finish()
    }
}
