//! Named records: the `column name -> value` representation callers use.

use crate::value::Value;
use alloc::string::String;
use hashbrown::hash_map::DefaultHashBuilder;
use indexmap::IndexMap;

/// An insertion-ordered `column name -> value` map.
pub type NamedRow = IndexMap<String, Value, DefaultHashBuilder>;

/// Builds a `NamedRow` from `(name, value)` pairs, keeping their order.
pub fn named_row<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> NamedRow
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
