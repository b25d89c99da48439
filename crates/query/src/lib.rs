//! Tabula Query - Tables, lazy statements and aggregation for the tabula table engine.
//!
//! This crate provides:
//!
//! - `Table`: named records over a storage driver, with a schema discovered from writes
//! - `ColumnView` / `Record`: weakly-bound column and row handles
//! - `statement`: lazy `Select`, and `Update` / `Delete` / `Insert` over the same plan
//! - `group_by`: hashed streaming group-by into a new table
//! - `aggregate`: per-group accumulators (`Sum`, `Mean`, `Min`, `Max`, ...)
//! - `registry`: name-keyed stat modules, extensible at runtime
//!
//! # Example
//!
//! ```rust
//! use tabula_core::{named_row, Value};
//! use tabula_query::prelude::*;
//!
//! let table = Table::from_rows(vec![
//!     named_row([("a", 1i64), ("b", 2)]),
//!     named_row([("a", 1i64), ("b", 3)]),
//!     named_row([("a", 2i64), ("b", 4)]),
//! ])
//! .unwrap();
//!
//! let big = table
//!     .select(&["b"])
//!     .unwrap()
//!     .where_(|row| row["b"] > Value::Int64(2))
//!     .collect_rows()
//!     .unwrap();
//! assert_eq!(big.len(), 2);
//!
//! let registry = table.registry();
//! let totals = table
//!     .select_all()
//!     .group_by(&["a"], &[AggregateExpr::parse("sum(b) as total", &registry).unwrap()])
//!     .unwrap();
//! assert_eq!(totals.to_rows().unwrap()[0]["total"], Value::Int64(5));
//! ```

pub mod aggregate;
pub mod fingerprint;
pub mod group_by;
pub mod predicate;
mod record;
pub mod registry;
mod schema;
pub mod statement;
mod table;
mod view;

pub use aggregate::Aggregator;
pub use group_by::{AggregateExpr, AggregatorFactory};
pub use predicate::{ColumnMatch, Predicate};
pub use record::Record;
pub use registry::{Capabilities, StatModule, StatRegistry};
pub use statement::{Delete, Filtered, Insert, Select, SelectIter, Update};
pub use table::{Rows, SchemaHook, Table, TableBuilder};
pub use view::ColumnView;

/// Everything needed to build and run statements.
pub mod prelude {
    pub use crate::{
        AggregateExpr, ColumnMatch, ColumnView, Filtered, Record, Select, StatRegistry, Table,
    };
}
