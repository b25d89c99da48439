//! Column identities and the ordered schema that maps names to positions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tabula_core::{Error, ForcedType, NamedRow, Result, Row, Value};

/// Identity of one logical column.
///
/// The name lives behind a `RefCell` so a rename mutates it in place: views and
/// statements holding a `Weak<Column>` follow the rename without being rebuilt.
/// The position is fixed for the identity's lifetime.
pub struct Column {
    name: RefCell<String>,
    forced_type: RefCell<Option<ForcedType>>,
    position: usize,
}

impl Column {
    pub(crate) fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: RefCell::new(name.into()),
            forced_type: RefCell::new(None),
            position,
        }
    }

    /// Current name.
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Position the column's cells are stored at.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Write conversion, if set.
    pub fn forced_type(&self) -> Option<ForcedType> {
        self.forced_type.borrow().clone()
    }

    pub(crate) fn is_named(&self, name: &str) -> bool {
        *self.name.borrow() == name
    }

    pub(crate) fn rename(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    pub(crate) fn set_forced_type(&self, forced: Option<ForcedType>) {
        *self.forced_type.borrow_mut() = forced;
    }

    /// Runs `value` through the forced type, if any.
    pub(crate) fn convert(&self, value: Value) -> Value {
        match &*self.forced_type.borrow() {
            Some(forced) => forced.apply(value),
            None => value,
        }
    }

    fn detached_copy(&self) -> Column {
        Column {
            name: RefCell::new(self.name()),
            forced_type: RefCell::new(self.forced_type()),
            position: self.position,
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &*self.name.borrow())
            .field("position", &self.position)
            .field("forced_type", &*self.forced_type.borrow())
            .finish()
    }
}

/// Ordered list of column identities.
///
/// Positions are handed out in first-seen order and never reused, so a
/// column that is removed and added again lands at a fresh position after
/// every existing one.
#[derive(Debug, Default)]
pub(crate) struct Schema {
    columns: Vec<Rc<Column>>,
    next_position: usize,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Rc<Column>] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Rc<Column>> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    pub fn require(&self, name: &str) -> Result<&Rc<Column>> {
        self.find(name).ok_or_else(|| Error::unknown_column(name))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Adds a column, returning the existing identity if the name is taken.
    pub fn add(&mut self, name: &str) -> Rc<Column> {
        if let Some(existing) = self.find(name) {
            return existing.clone();
        }
        let column = Rc::new(Column::new(name, self.next_position));
        self.next_position += 1;
        self.columns.push(column.clone());
        column
    }

    /// Deletes the identity. The caller strips the position from stored rows.
    pub fn remove(&mut self, name: &str) -> Result<Rc<Column>> {
        let index = self
            .columns
            .iter()
            .position(|c| c.is_named(name))
            .ok_or_else(|| Error::unknown_column(name))?;
        Ok(self.columns.remove(index))
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if old == new {
            self.require(old)?;
            return Ok(());
        }
        if self.contains(new) {
            return Err(Error::invalid_argument(format!(
                "cannot rename {} to {}: column already exists",
                old, new
            )));
        }
        self.require(old)?.rename(new);
        Ok(())
    }

    /// Names in `row` that are not yet columns, in the row's order.
    pub fn pending(&self, row: &NamedRow) -> Vec<String> {
        row.keys()
            .filter(|name| !self.contains(name))
            .cloned()
            .collect()
    }

    /// Translates a named record to positions, applying forced types.
    /// Every name must already be a column.
    pub fn to_positional(&self, named: &NamedRow) -> Result<Row> {
        let mut row = Row::new();
        for (name, value) in named {
            let column = self.require(name)?;
            row.set(column.position(), column.convert(value.clone()));
        }
        Ok(row)
    }

    /// Builds a named record by walking the current schema. With `fill`, columns
    /// the row never wrote appear as `Null`; otherwise they are absent.
    pub fn to_named(&self, row: &Row, fill: bool) -> NamedRow {
        let mut named = NamedRow::default();
        for column in &self.columns {
            match row.get(column.position()) {
                Some(value) => {
                    named.insert(column.name(), value.clone());
                }
                None if fill => {
                    named.insert(column.name(), Value::Null);
                }
                None => {}
            }
        }
        named
    }

    /// Copy with fresh identities at the same positions.
    pub fn detached_copy(&self) -> Schema {
        Schema {
            columns: self
                .columns
                .iter()
                .map(|c| Rc::new(c.detached_copy()))
                .collect(),
            next_position: self.next_position,
        }
    }
}
