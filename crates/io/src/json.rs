//! Tables as JSON arrays of records.
//!
//! ```text
//! [{"name": "ann", "age": 31}, {"name": "bob", "age": null}]
//! ```
//!
//! Export writes every record filled, keys in column order. Import takes the
//! column order from first appearance across records; a record that omits a
//! key leaves that cell unwritten.

use crate::error::{IoError, Result};
use serde_json::{Map, Number, Value as Json};
use tabula_core::{NamedRow, Value};
use tabula_query::Table;

fn to_json_value(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int64(i) => Json::Number((*i).into()),
        Value::Float64(f) => Json::Number(
            Number::from_f64(*f).ok_or(IoError::UnsupportedValue("non-finite float"))?,
        ),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(_) => return Err(IoError::UnsupportedValue("bytes")),
        Value::Object(_) => return Err(IoError::UnsupportedValue("object")),
    })
}

fn from_json_value(column: &str, json: Json) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => Value::Float64(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::String(s),
        Json::Array(_) | Json::Object(_) => {
            return Err(IoError::InvalidRecord(format!(
                "nested value in column {:?}",
                column
            )))
        }
    })
}

/// Serializes every record of `table` as a JSON array of objects.
pub fn to_json(table: &Table) -> Result<String> {
    let records = table
        .to_rows()?
        .into_iter()
        .map(|row| {
            row.iter()
                .map(|(name, value)| Ok((name.clone(), to_json_value(value)?)))
                .collect::<Result<Map<String, Json>>>()
                .map(Json::Object)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string(&Json::Array(records))?)
}

/// Builds an in-memory table from a JSON array of objects.
pub fn from_json(text: &str) -> Result<Table> {
    let records = match serde_json::from_str::<Json>(text)? {
        Json::Array(records) => records,
        _ => return Err(IoError::InvalidRecord("expected an array of records".into())),
    };
    let rows = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| match record {
            Json::Object(fields) => fields
                .into_iter()
                .map(|(name, json)| {
                    let value = from_json_value(&name, json)?;
                    Ok((name, value))
                })
                .collect::<Result<NamedRow>>(),
            _ => Err(IoError::InvalidRecord(format!("record {} is not an object", index))),
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(rows = rows.len(), "json records read");
    Ok(Table::from_rows(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{named_row, ObjectRef};

    #[test]
    fn test_export_is_filled_and_ordered() {
        let table = Table::from_rows(vec![
            named_row([("b", Value::Int64(1)), ("a", Value::Float64(0.5))]),
            named_row([("a", Value::from("x"))]),
        ])
        .unwrap();
        assert_eq!(
            to_json(&table).unwrap(),
            r#"[{"b":1,"a":0.5},{"b":null,"a":"x"}]"#
        );
    }

    #[test]
    fn test_export_rejects_bytes_and_objects() {
        let bytes = Table::from_rows(vec![named_row([("a", Value::Bytes(vec![1]))])]).unwrap();
        assert!(matches!(to_json(&bytes), Err(IoError::UnsupportedValue("bytes"))));

        let object = Table::from_rows(vec![named_row([("a", Value::Object(ObjectRef::new(1u8)))])]).unwrap();
        assert!(matches!(to_json(&object), Err(IoError::UnsupportedValue("object"))));
    }

    #[test]
    fn test_import_keeps_sparse_cells() {
        let table = from_json(r#"[{"a": 1, "b": true}, {"c": 2.5}, {}]"#).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(table.count_rows().unwrap(), 3);
        let rows: Vec<NamedRow> = table.iter().map(|r| r.unwrap().1).collect();
        assert_eq!(rows[1], named_row([("c", 2.5)]));
        assert!(rows[2].is_empty());
    }

    #[test]
    fn test_import_errors() {
        assert!(matches!(from_json("{}"), Err(IoError::InvalidRecord(_))));
        assert!(matches!(from_json("[1]"), Err(IoError::InvalidRecord(_))));
        assert!(matches!(from_json(r#"[{"a": [1]}]"#), Err(IoError::InvalidRecord(_))));
        assert!(matches!(from_json("[{"), Err(IoError::Json(_))));
    }
}
