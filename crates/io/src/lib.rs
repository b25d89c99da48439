//! Tabula IO - Format adapters for the tabula table engine.
//!
//! - `json`: a table as a JSON array of records
//! - `csv`: delimited text with optional header and type inference
//!
//! # Example
//!
//! ```rust
//! use tabula_io::{read_csv, to_json, CsvOptions};
//!
//! let table = read_csv("a,b\n1,x\n2,\n".as_bytes(), &CsvOptions::default()).unwrap();
//! assert_eq!(to_json(&table).unwrap(), r#"[{"a":1,"b":"x"},{"a":2,"b":null}]"#);
//! ```

pub mod csv;
pub mod error;
pub mod json;

pub use crate::csv::{read_csv, write_csv, CsvOptions};
pub use error::{IoError, Result};
pub use json::{from_json, to_json};
