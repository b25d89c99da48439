//! Conversions between tabula values and what SQLite stores.
//!
//! The pass-through driver keeps each positional row in one `TEXT` cell as a
//! JSON object keyed by position, so a sparse row round-trips exactly:
//!
//! ```text
//! {"0": 1, "2": "x", "3": null, "5": {"f": "NaN"}, "6": {"b": "00ff"}}
//! ```
//!
//! Integers and floats keep their kind through serde_json (`1` vs `1.0`).
//! Non-finite floats and byte strings are tagged objects.

use crate::error::{Result, SqlError};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Number, Value as Json};
use tabula_core::{Row, Value};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn unhex(text: &str) -> Result<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(SqlError::MalformedRow(format!("odd hex length: {}", text)));
    }
    let nibble = |b: u8| char::from(b).to_digit(16);
    text.as_bytes()
        .chunks_exact(2)
        .map(|pair| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4 | lo) as u8),
            _ => Err(SqlError::MalformedRow(format!("bad hex: {}", text))),
        })
        .collect()
}

fn tagged(tag: &str, payload: String) -> Json {
    let mut map = Map::new();
    map.insert(tag.to_string(), Json::String(payload));
    Json::Object(map)
}

fn value_to_json(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int64(i) => Json::Number((*i).into()),
        Value::Float64(f) => match Number::from_f64(*f) {
            Some(n) => Json::Number(n),
            None => tagged("f", f.to_string()),
        },
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(b) => tagged("b", hex(b)),
        Value::Object(_) => return Err(SqlError::UnsupportedValue("object")),
    })
}

fn json_to_value(json: Json) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) if !n.is_f64() => Value::Int64(i),
            _ => Value::Float64(
                n.as_f64()
                    .ok_or_else(|| SqlError::MalformedRow(format!("number out of range: {}", n)))?,
            ),
        },
        Json::String(s) => Value::String(s),
        Json::Object(map) => match (map.get("f"), map.get("b")) {
            (Some(Json::String(f)), None) => Value::Float64(
                f.parse()
                    .map_err(|_| SqlError::MalformedRow(format!("bad float: {}", f)))?,
            ),
            (None, Some(Json::String(b))) => Value::Bytes(unhex(b)?),
            _ => return Err(SqlError::MalformedRow(Json::Object(map).to_string())),
        },
        Json::Array(_) => return Err(SqlError::MalformedRow("unexpected array".into())),
    })
}

/// Encodes a positional row as JSON text.
pub(crate) fn encode_row(row: &Row) -> Result<String> {
    let mut map = Map::new();
    for (position, value) in row.iter() {
        map.insert(position.to_string(), value_to_json(value)?);
    }
    Ok(serde_json::to_string(&Json::Object(map))?)
}

/// Decodes JSON text written by `encode_row`.
pub(crate) fn decode_row(text: &str) -> Result<Row> {
    let map = match serde_json::from_str::<Json>(text)? {
        Json::Object(map) => map,
        other => return Err(SqlError::MalformedRow(other.to_string())),
    };
    let mut row = Row::new();
    for (position, json) in map {
        let position: usize = position
            .parse()
            .map_err(|_| SqlError::MalformedRow(format!("bad position: {}", position)))?;
        row.set(position, json_to_value(json)?);
    }
    Ok(row)
}

/// Value bound as a statement parameter.
pub(crate) fn to_sql(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(*b as i64),
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Object(_) => return Err(SqlError::UnsupportedValue("object")),
    })
}

/// Value read from a result column.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}
