//! Row predicates and the conjunctive-normal-form filter built from them.

use crate::schema::Column;
use regex::Regex;
use std::rc::{Rc, Weak};
use tabula_core::{Error, NamedRow, Result, RowKey, Value};

/// A test over a full (filled) named row.
pub trait Predicate {
    fn eval(&self, row: &NamedRow) -> Result<bool>;
}

impl<F> Predicate for F
where
    F: Fn(&NamedRow) -> bool,
{
    fn eval(&self, row: &NamedRow) -> Result<bool> {
        Ok(self(row))
    }
}

/// Looks up the current value of `column` in `row`.
fn cell<'a>(column: &Weak<Column>, row: &'a NamedRow) -> Result<&'a Value> {
    let column = column
        .upgrade()
        .ok_or_else(|| Error::dead_reference("column"))?;
    Ok(row.get(column.name().as_str()).unwrap_or(&Value::Null))
}

/// `column == value`.
pub(crate) struct ColumnEquals {
    pub column: Weak<Column>,
    pub value: Value,
}

impl Predicate for ColumnEquals {
    fn eval(&self, row: &NamedRow) -> Result<bool> {
        Ok(*cell(&self.column, row)? == self.value)
    }
}

/// `low <= column <= high` under the natural value order.
pub(crate) struct ColumnBetween {
    pub column: Weak<Column>,
    pub low: Value,
    pub high: Value,
}

impl Predicate for ColumnBetween {
    fn eval(&self, row: &NamedRow) -> Result<bool> {
        let value = cell(&self.column, row)?;
        Ok(!value.is_null() && *value >= self.low && *value <= self.high)
    }
}

/// Text matching options for `where_column`.
///
/// Both tests apply to the value's display text; a row matches when every
/// given test passes. Null cells never match.
#[derive(Clone, Debug, Default)]
pub struct ColumnMatch {
    /// Substring the value must contain.
    pub contains: Option<String>,
    /// Regular expression the value must match.
    pub matches: Option<String>,
}

impl ColumnMatch {
    pub fn contains(needle: impl Into<String>) -> Self {
        Self {
            contains: Some(needle.into()),
            matches: None,
        }
    }

    pub fn matches(pattern: impl Into<String>) -> Self {
        Self {
            contains: None,
            matches: Some(pattern.into()),
        }
    }

    pub(crate) fn compile(self, column: Weak<Column>) -> Result<ColumnText> {
        let pattern = match self.matches {
            Some(p) => Some(Regex::new(&p).map_err(|e| {
                Error::invalid_argument(format!("invalid pattern {}: {}", p, e))
            })?),
            None => None,
        };
        Ok(ColumnText {
            column,
            contains: self.contains,
            pattern,
        })
    }
}

pub(crate) struct ColumnText {
    column: Weak<Column>,
    contains: Option<String>,
    pattern: Option<Regex>,
}

impl Predicate for ColumnText {
    fn eval(&self, row: &NamedRow) -> Result<bool> {
        let value = cell(&self.column, row)?;
        if value.is_null() {
            return Ok(false);
        }
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if let Some(needle) = &self.contains {
            if !text.contains(needle.as_str()) {
                return Ok(false);
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&text) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Inclusive row key range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct KeyRange {
    pub start: RowKey,
    pub end: RowKey,
}

impl KeyRange {
    #[inline]
    pub fn contains(&self, key: RowKey) -> bool {
        self.start <= key && key <= self.end
    }
}

/// AND of OR-groups.
#[derive(Clone, Default)]
pub(crate) struct Cnf {
    groups: Vec<Vec<Rc<dyn Predicate>>>,
}

impl Cnf {
    /// Starts a new OR-group holding `predicate`.
    pub fn and(&mut self, predicate: Rc<dyn Predicate>) {
        self.groups.push(vec![predicate]);
    }

    /// Adds `predicate` to the last OR-group, or starts one.
    pub fn or(&mut self, predicate: Rc<dyn Predicate>) {
        match self.groups.last_mut() {
            Some(group) => group.push(predicate),
            None => self.groups.push(vec![predicate]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// True iff every group has a predicate that holds.
    pub fn matches(&self, row: &NamedRow) -> Result<bool> {
        for group in &self.groups {
            let mut any = false;
            for predicate in group {
                if predicate.eval(row)? {
                    any = true;
                    break;
                }
            }
            if !any {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
