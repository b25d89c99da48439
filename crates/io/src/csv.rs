//! Delimited text import and export.

use crate::error::{IoError, Result};
use ::csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{Read, Write};
use tabula_core::{NamedRow, Value};
use tabula_query::Table;

/// Dialect and decoding options for CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// First record holds column names. Without a header, columns are named
    /// `column_0`, `column_1`, ...
    pub header: bool,
    /// Decode empty cells as null and `true`/`false`, integers and floats as
    /// typed values. Otherwise every cell is read as a string.
    pub infer_types: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            header: true,
            infer_types: true,
        }
    }
}

impl CsvOptions {
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn infer_types(mut self, infer: bool) -> Self {
        self.infer_types = infer;
        self
    }
}

fn infer(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match field {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    if let Ok(i) = field.parse::<i64>() {
        return Value::Int64(i);
    }
    match field.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float64(f),
        _ => Value::String(field.to_string()),
    }
}

fn column_name(index: usize) -> String {
    format!("column_{}", index)
}

/// Reads CSV from `reader` into an in-memory table. Declared columns come
/// from the header, so a header-only input yields an empty table that still
/// has its columns. Short records leave trailing cells unwritten.
pub fn read_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.header)
        .flexible(true)
        .from_reader(reader);

    let mut columns: Vec<String> = if options.header {
        reader.headers()?.iter().map(String::from).collect()
    } else {
        Vec::new()
    };

    let mut rows: Vec<NamedRow> = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        if record.len() > columns.len() {
            if options.header {
                return Err(IoError::InvalidRecord(format!(
                    "line {}: {} fields for {} columns",
                    record.position().map(|p| p.line()).unwrap_or(0),
                    record.len(),
                    columns.len()
                )));
            }
            columns.extend((columns.len()..record.len()).map(column_name));
        }
        let row = columns
            .iter()
            .zip(record.iter())
            .map(|(name, field)| {
                let value = if options.infer_types {
                    infer(field)
                } else {
                    Value::String(field.to_string())
                };
                (name.clone(), value)
            })
            .collect();
        rows.push(row);
    }
    tracing::debug!(rows = rows.len(), columns = columns.len(), "csv read");

    let mut builder = Table::builder();
    for name in columns {
        builder = builder.column(name);
    }
    Ok(builder.rows(rows).build()?)
}

fn field(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Object(_) => Err(IoError::UnsupportedValue("object")),
        other => Ok(other.to_string()),
    }
}

/// Writes every record of `table` as CSV, filled, in column order. Nulls are
/// empty fields and byte strings are hex.
pub fn write_csv<W: Write>(writer: W, table: &Table, options: &CsvOptions) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_writer(writer);

    let columns = table.column_names();
    if options.header && !columns.is_empty() {
        writer.write_record(&columns)?;
    }
    for row in table.to_rows()? {
        let record = columns
            .iter()
            .map(|name| field(row.get(name.as_str()).unwrap_or(&Value::Null)))
            .collect::<Result<Vec<_>>>()?;
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
