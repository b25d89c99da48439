//! Tabula SQL - SQLite integration for the tabula table engine.
//!
//! - `SqliteDriver`: a writable storage driver that keeps every row in one
//!   SQLite table and issues SQL on every call
//! - `SqlBridge`: stages a table's rows into SQLite, runs SQL text verbatim and
//!   turns the result set back into a `Table`
//!
//! # Example
//!
//! ```rust
//! use rusqlite::Connection;
//! use tabula_core::{named_row, Value};
//! use tabula_query::Table;
//! use tabula_sql::{BridgeOptions, SqlBridge};
//!
//! let table = Table::from_rows(vec![
//!     named_row([("a", 1i64)]),
//!     named_row([("a", 2i64)]),
//! ])
//! .unwrap();
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let total = SqlBridge::query(
//!     &conn,
//!     &table,
//!     "SELECT SUM(a) AS total FROM staging",
//!     &BridgeOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(total.to_rows().unwrap()[0]["total"], Value::Int64(3));
//! ```

pub mod bridge;
mod codec;
pub mod driver;
pub mod error;

pub use bridge::{BridgeOptions, SqlBridge};
pub use driver::SqliteDriver;
pub use error::{Result, SqlError};
