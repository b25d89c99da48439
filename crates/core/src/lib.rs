//! Tabula Core - Value model and shared types for the tabula table engine.
//!
//! This crate provides the foundational types every other layer builds on:
//!
//! - `Value`: a single cell value (null, bool, int, float, string, bytes, opaque object)
//! - `DataType` / `ForcedType`: per-column write conversions
//! - `Row`: the positional record a storage driver stores
//! - `NamedRow`: the `column name -> value` record callers work with
//! - `Error`: the error taxonomy shared by every crate in the workspace
//!
//! # Example
//!
//! ```rust
//! use tabula_core::{named_row, DataType, Row, Value};
//!
//! let mut row = Row::new();
//! row.set(2, Value::from("x"));
//! assert_eq!(row.get(2), Some(&Value::String("x".into())));
//! assert_eq!(row.get(0), None);
//!
//! let named = named_row([("a", 1i64), ("b", 2i64)]);
//! assert_eq!(named.get("b"), Some(&Value::Int64(2)));
//!
//! assert_eq!(DataType::Int64.coerce(Value::from("42")), Value::Int64(42));
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod error;
mod named;
mod row;
mod types;
mod value;

pub use error::{Error, Result};
pub use named::{named_row, NamedRow};
pub use row::{Row, RowKey};
pub use types::{DataType, ForcedType};
pub use value::{ObjectRef, Value};
