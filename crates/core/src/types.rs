//! Data types and per-column write conversions.

use crate::value::Value;
use alloc::rc::Rc;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;

/// Scalar data types a column can be forced to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Binary data
    Bytes,
}

impl DataType {
    /// Converts `value` to this type. Conversion is lossy and never fails: a value
    /// that has no sensible representation becomes `Null`. `Null` always stays `Null`.
    pub fn coerce(&self, value: Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self {
            DataType::Boolean => match value {
                Value::Boolean(_) => value,
                Value::String(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Value::Boolean(true),
                    "false" | "0" | "no" | "" => Value::Boolean(false),
                    _ => Value::Boolean(true),
                },
                other => Value::Boolean(other.is_truthy()),
            },
            DataType::Int64 => match value {
                Value::Int64(_) => value,
                Value::Boolean(b) => Value::Int64(b as i64),
                Value::Float64(f) if f.is_finite() => Value::Int64(f as i64),
                Value::String(ref s) => {
                    let s = s.trim();
                    if let Ok(i) = s.parse::<i64>() {
                        Value::Int64(i)
                    } else {
                        match s.parse::<f64>() {
                            Ok(f) if f.is_finite() => Value::Int64(f as i64),
                            _ => Value::Null,
                        }
                    }
                }
                _ => Value::Null,
            },
            DataType::Float64 => match value {
                Value::Float64(_) => value,
                Value::Int64(i) => Value::Float64(i as f64),
                Value::Boolean(b) => Value::Float64(if b { 1.0 } else { 0.0 }),
                Value::String(ref s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float64)
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            },
            DataType::String => match value {
                Value::String(_) => value,
                other => Value::String(other.to_string()),
            },
            DataType::Bytes => match value {
                Value::Bytes(_) => value,
                Value::String(s) => Value::Bytes(s.into_bytes()),
                other => Value::Bytes(Vec::from(other.to_string().as_bytes())),
            },
        }
    }
}

/// A conversion applied to every value written through a column.
#[derive(Clone)]
pub enum ForcedType {
    /// Coerce to a built-in data type.
    Cast(DataType),
    /// Caller-supplied converter.
    Custom(Rc<dyn Fn(Value) -> Value>),
}

impl ForcedType {
    /// Wraps a converter closure.
    pub fn custom(f: impl Fn(Value) -> Value + 'static) -> Self {
        ForcedType::Custom(Rc::new(f))
    }

    /// Applies the conversion.
    pub fn apply(&self, value: Value) -> Value {
        match self {
            ForcedType::Cast(dt) => dt.coerce(value),
            ForcedType::Custom(f) => f(value),
        }
    }
}

impl From<DataType> for ForcedType {
    fn from(dt: DataType) -> Self {
        ForcedType::Cast(dt)
    }
}

impl fmt::Debug for ForcedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForcedType::Cast(dt) => write!(f, "Cast({:?})", dt),
            ForcedType::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
