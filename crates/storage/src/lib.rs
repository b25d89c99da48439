//! Tabula Storage - Storage drivers for the tabula table engine.
//!
//! A driver owns `{ key -> positional row }` in its own iteration order. Drivers
//! come in conformance tiers:
//!
//! - `StorageDriver`: read access and cursor iteration (every driver)
//! - `WritableDriver`: add / set / remove
//! - `SortableDriver`: physical reordering by comparator
//!
//! A missing tier is discovered through `as_writable` / `as_sortable` and reported
//! as `Error::UnsupportedCapability` by the helpers `writable` / `sortable`.
//!
//! # Example
//!
//! ```rust
//! use tabula_core::{Row, Value};
//! use tabula_storage::{MemoryDriver, StorageDriver, WritableDriver};
//!
//! let mut driver = MemoryDriver::new();
//! let key = driver.add(Row::from_values(vec![Value::Int64(1)])).unwrap();
//! assert_eq!(driver.count().unwrap(), 1);
//! assert_eq!(driver.get(key).unwrap().get(0), Some(&Value::Int64(1)));
//! ```

#![no_std]

extern crate alloc;

pub mod driver;
pub mod memory;

pub use driver::{sortable, writable, ScanCursor, SortableDriver, StorageDriver, WritableDriver};
pub use memory::MemoryDriver;
