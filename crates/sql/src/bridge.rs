//! Verbatim SQL over a table's rows.

use crate::codec::{from_sql, to_sql};
use crate::driver::check_identifier;
use crate::error::{Result, SqlError};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use tabula_core::{NamedRow, Value};
use tabula_query::Table;

/// SQLite's default bound-parameter ceiling.
const MAX_PARAMS: usize = 999;

/// Staging options for `SqlBridge::query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Name of the temporary table the rows are staged into. This is the
    /// name the SQL text refers to.
    pub staging_table: String,
    /// Rows per `INSERT`; clamped so one statement stays under the
    /// parameter limit.
    pub batch_size: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            staging_table: "staging".to_string(),
            batch_size: 500,
        }
    }
}

impl BridgeOptions {
    pub fn staging_table(mut self, name: impl Into<String>) -> Self {
        self.staging_table = name.into();
        self
    }

    pub fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = rows;
        self
    }

    fn rows_per_insert(&self, columns: usize) -> usize {
        self.batch_size.min(MAX_PARAMS / columns.max(1)).max(1)
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Runs caller-supplied SQL against a staged copy of a table.
pub struct SqlBridge;

impl SqlBridge {
    /// Stages every row of `table` into a temporary table, runs `sql`
    /// verbatim and rehydrates the result set into a new table that shares
    /// `table`'s stat registry.
    ///
    /// Staging and the query run in one transaction. Any failure rolls the
    /// transaction back, so no staged rows survive, and is returned.
    pub fn query(conn: &Connection, table: &Table, sql: &str, options: &BridgeOptions) -> Result<Table> {
        check_identifier(&options.staging_table)?;
        let columns = table.column_names();
        if columns.is_empty() {
            return Err(SqlError::NoColumns);
        }

        let tx = conn.unchecked_transaction()?;
        let outcome = stage(&tx, table, &columns, options).and_then(|()| {
            let result = fetch(&tx, sql)?;
            tx.execute(&format!("DROP TABLE temp.{}", quote(&options.staging_table)), [])?;
            Ok(result)
        });

        let (names, rows) = match outcome {
            Ok(result) => {
                tx.commit()?;
                result
            }
            Err(e) => {
                tracing::warn!(
                    staging = %options.staging_table,
                    error = %e,
                    "sql bridge rolled back"
                );
                tx.rollback()?;
                return Err(e);
            }
        };

        let mut builder = Table::builder().registry(table.registry());
        for name in &names {
            builder = builder.column(name.as_str());
        }
        Ok(builder.rows(rows).build()?)
    }
}

fn stage(conn: &Connection, table: &Table, columns: &[String], options: &BridgeOptions) -> Result<()> {
    let staging = quote(&options.staging_table);
    let column_list = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
    conn.execute(&format!("DROP TABLE IF EXISTS temp.{}", staging), [])?;
    conn.execute(&format!("CREATE TEMP TABLE {} ({})", staging, column_list), [])?;

    let per_insert = options.rows_per_insert(columns.len());
    let placeholder = format!("({})", vec!["?"; columns.len()].join(", "));
    let mut batch: Vec<SqlValue> = Vec::with_capacity(per_insert * columns.len());
    let mut staged = 0usize;

    let mut flush = |batch: &mut Vec<SqlValue>| -> Result<()> {
        let rows = batch.len() / columns.len();
        if rows == 0 {
            return Ok(());
        }
        let values = vec![placeholder.as_str(); rows].join(", ");
        conn.execute(
            &format!("INSERT INTO temp.{} ({}) VALUES {}", staging, column_list, values),
            params_from_iter(batch.iter()),
        )?;
        staged += rows;
        batch.clear();
        Ok(())
    };

    for row in table.to_rows()? {
        for name in columns {
            batch.push(to_sql(row.get(name.as_str()).unwrap_or(&Value::Null))?);
        }
        if batch.len() >= per_insert * columns.len() {
            flush(&mut batch)?;
        }
    }
    flush(&mut batch)?;
    tracing::trace!(rows = staged, "rows staged");
    Ok(())
}

fn fetch(conn: &Connection, sql: &str) -> Result<(Vec<String>, Vec<NamedRow>)> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query([])?
        .mapped(|r| {
            names
                .iter()
                .enumerate()
                .map(|(idx, name)| Ok((name.clone(), from_sql(r.get_ref(idx)?))))
                .collect::<Result<NamedRow, rusqlite::Error>>()
        })
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
    Ok((names, rows))
}
