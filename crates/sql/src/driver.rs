//! Storage driver backed by a SQLite table.

use crate::codec::{decode_row, encode_row};
use crate::error::{Result, SqlError};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use std::rc::Rc;
use tabula_core::{Error, Row, RowKey};
use tabula_storage::{MemoryDriver, ScanCursor, StorageDriver, WritableDriver};

/// Accepts plain SQL identifiers only; they are still quoted when used.
pub(crate) fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SqlError::InvalidIdentifier(name.to_string()))
    }
}

fn to_key(key: i64) -> Result<RowKey> {
    RowKey::try_from(key).map_err(|_| SqlError::MalformedRow(format!("negative key {}", key)))
}

fn to_sql_key(key: RowKey) -> tabula_core::Result<i64> {
    i64::try_from(key).map_err(|_| Error::not_found(key))
}

/// Pass-through driver over one SQLite table.
///
/// Every call issues SQL against the connection; nothing is cached. Rows live
/// in `(key INTEGER PRIMARY KEY AUTOINCREMENT, cells TEXT)`, so keys are never
/// reused after a delete. Scan order is key order. The driver is writable but
/// never sortable.
pub struct SqliteDriver {
    conn: Rc<Connection>,
    table: String,
}

impl SqliteDriver {
    /// Opens (creating if needed) the backing table `table` on `conn`.
    pub fn open(conn: Rc<Connection>, table: &str) -> Result<Self> {
        check_identifier(table)?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (key INTEGER PRIMARY KEY AUTOINCREMENT, cells TEXT NOT NULL)",
                table
            ),
            [],
        )?;
        tracing::debug!(table, "sqlite driver opened");
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn sql(&self, template: &str) -> String {
        template.replace("{t}", &format!("\"{}\"", self.table))
    }

    fn try_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&self.sql("SELECT COUNT(*) FROM {t}"), [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn try_get(&self, key: RowKey) -> Result<Row> {
        let cells: Option<String> = self
            .conn
            .query_row(
                &self.sql("SELECT cells FROM {t} WHERE key = ?1"),
                params![to_sql_key(key)?],
                |r| r.get(0),
            )
            .optional()?;
        match cells {
            Some(cells) => decode_row(&cells),
            None => Err(Error::not_found(key).into()),
        }
    }

    fn try_contains(&self, key: RowKey) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                &self.sql("SELECT 1 FROM {t} WHERE key = ?1"),
                params![to_sql_key(key)?],
                |r| r.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn try_advance(&self, cursor: &mut ScanCursor) -> Result<Option<RowKey>> {
        let (ordinal, next) = match cursor.last_position() {
            None => return Ok(None),
            Some(None) => (
                0,
                self.conn
                    .query_row(&self.sql("SELECT key FROM {t} ORDER BY key LIMIT 1"), [], |r| {
                        r.get::<_, i64>(0)
                    })
                    .optional()?,
            ),
            Some(Some((ordinal, last))) => (
                ordinal + 1,
                self.conn
                    .query_row(
                        &self.sql("SELECT key FROM {t} WHERE key > ?1 ORDER BY key LIMIT 1"),
                        params![to_sql_key(last)?],
                        |r| r.get::<_, i64>(0),
                    )
                    .optional()?,
            ),
        };
        match next {
            Some(key) => {
                let key = to_key(key)?;
                cursor.place(ordinal, key);
                Ok(Some(key))
            }
            None => {
                cursor.finish();
                Ok(None)
            }
        }
    }

    /// Key the next insert will receive.
    fn try_next_key(&self) -> Result<RowKey> {
        let seq: Option<i64> = self
            .conn
            .query_row(
                "SELECT seq FROM sqlite_sequence WHERE name = ?1",
                params![self.table],
                |r| r.get(0),
            )
            .optional()?;
        to_key(seq.unwrap_or(0) + 1)
    }

    fn try_snapshot(&self) -> Result<MemoryDriver> {
        let mut stmt = self
            .conn
            .prepare(&self.sql("SELECT key, cells FROM {t} ORDER BY key"))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let key: i64 = row.get(0)?;
            let cells: String = row.get(1)?;
            out.push((to_key(key)?, decode_row(&cells)?));
        }
        Ok(MemoryDriver::from_rows(out, self.try_next_key()?))
    }

    fn try_add(&mut self, row: &Row) -> Result<RowKey> {
        self.conn.execute(
            &self.sql("INSERT INTO {t} (cells) VALUES (?1)"),
            params![encode_row(row)?],
        )?;
        to_key(self.conn.last_insert_rowid())
    }

    fn try_set(&mut self, key: RowKey, row: &Row) -> Result<()> {
        let changed = self.conn.execute(
            &self.sql("UPDATE {t} SET cells = ?1 WHERE key = ?2"),
            params![encode_row(row)?, to_sql_key(key)?],
        )?;
        if changed == 0 {
            return Err(Error::not_found(key).into());
        }
        Ok(())
    }

    fn try_remove(&mut self, key: RowKey) -> Result<()> {
        let changed = self.conn.execute(
            &self.sql("DELETE FROM {t} WHERE key = ?1"),
            params![to_sql_key(key)?],
        )?;
        if changed == 0 {
            return Err(Error::not_found(key).into());
        }
        Ok(())
    }
}

impl fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqliteDriver({})", self.table)
    }
}

impl StorageDriver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn count(&self) -> tabula_core::Result<usize> {
        Ok(self.try_count()?)
    }

    fn get(&self, key: RowKey) -> tabula_core::Result<Row> {
        Ok(self.try_get(key)?)
    }

    fn contains(&self, key: RowKey) -> tabula_core::Result<bool> {
        Ok(self.try_contains(key)?)
    }

    fn advance(&self, cursor: &mut ScanCursor) -> tabula_core::Result<Option<RowKey>> {
        Ok(self.try_advance(cursor)?)
    }

    fn snapshot(&self) -> tabula_core::Result<MemoryDriver> {
        Ok(self.try_snapshot()?)
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableDriver> {
        Some(self)
    }
}

impl WritableDriver for SqliteDriver {
    fn add(&mut self, row: Row) -> tabula_core::Result<RowKey> {
        Ok(self.try_add(&row)?)
    }

    fn set(&mut self, key: RowKey, row: Row) -> tabula_core::Result<()> {
        Ok(self.try_set(key, &row)?)
    }

    fn set_cell(&mut self, key: RowKey, position: usize, value: tabula_core::Value) -> tabula_core::Result<()> {
        let mut row = self.try_get(key)?;
        row.set(position, value);
        Ok(self.try_set(key, &row)?)
    }

    fn remove(&mut self, key: RowKey) -> tabula_core::Result<()> {
        Ok(self.try_remove(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::Value;
    use tabula_storage::sortable;

    fn driver() -> SqliteDriver {
        let conn = Rc::new(Connection::open_in_memory().unwrap());
        SqliteDriver::open(conn, "rows").unwrap()
    }

    fn int_row(v: i64) -> Row {
        Row::from_values(vec![Value::Int64(v)])
    }

    #[test]
    fn test_crud() {
        let mut driver = driver();
        let a = driver.add(int_row(1)).unwrap();
        let b = driver.add(int_row(2)).unwrap();
        assert_eq!(driver.count().unwrap(), 2);
        assert_eq!(driver.get(b).unwrap(), int_row(2));

        driver.set_cell(a, 2, Value::from("x")).unwrap();
        assert_eq!(driver.get(a).unwrap().get(2), Some(&Value::from("x")));

        driver.remove(a).unwrap();
        assert!(driver.remove(a).unwrap_err().is_not_found());
        assert!(driver.get(a).unwrap_err().is_not_found());
        assert!(driver.set(a, int_row(0)).unwrap_err().is_not_found());
        assert!(!driver.contains(a).unwrap());
    }

    #[test]
    fn test_keys_never_reused() {
        let mut driver = driver();
        let a = driver.add(int_row(1)).unwrap();
        driver.remove(a).unwrap();
        let b = driver.add(int_row(2)).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_scan_in_key_order_survives_removal() {
        let mut driver = driver();
        let keys: Vec<RowKey> = (0..4).map(|v| driver.add(int_row(v)).unwrap()).collect();
        let mut cursor = ScanCursor::new();
        assert_eq!(driver.advance(&mut cursor).unwrap(), Some(keys[0]));
        driver.remove(keys[1]).unwrap();
        assert_eq!(driver.advance(&mut cursor).unwrap(), Some(keys[2]));
        assert_eq!(driver.advance(&mut cursor).unwrap(), Some(keys[3]));
        assert_eq!(driver.advance(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_never_sortable() {
        let mut driver = driver();
        assert!(matches!(
            sortable(&mut driver),
            Err(Error::UnsupportedCapability { .. })
        ));
    }

    #[test]
    fn test_snapshot_copies_rows_and_counter() {
        let mut driver = driver();
        let a = driver.add(int_row(1)).unwrap();
        let b = driver.add(int_row(2)).unwrap();
        driver.remove(b).unwrap();
        let mut snapshot = driver.snapshot().unwrap();
        assert_eq!(snapshot.keys(), vec![a]);
        assert!(snapshot.add(int_row(3)).unwrap() > b);
    }

    #[test]
    fn test_rejects_bad_identifier() {
        let conn = Rc::new(Connection::open_in_memory().unwrap());
        assert!(matches!(
            SqliteDriver::open(conn, "rows; DROP TABLE x"),
            Err(SqlError::InvalidIdentifier(_))
        ));
    }
}
