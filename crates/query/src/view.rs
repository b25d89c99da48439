//! Weakly-bound single-column views.

use crate::aggregate::{Aggregator, Count, CountDistinctValues, First, Max, Mean, Min, Sum};
use crate::schema::Column;
use crate::statement::Select;
use crate::table::{upgrade, Table, TableRef};
use std::fmt;
use std::rc::{Rc, Weak};
use tabula_core::{Error, ForcedType, Result, Value};

/// Handle on one column of one table.
///
/// A view is alive while both the table and the column identity exist. It
/// follows renames, and every operation on a dead view fails with
/// `DeadReference`.
#[derive(Clone)]
pub struct ColumnView {
    table: TableRef,
    column: Weak<Column>,
}

impl ColumnView {
    pub(crate) fn new(table: TableRef, column: Weak<Column>) -> Self {
        Self { table, column }
    }

    fn bind(&self) -> Result<(Table, Rc<Column>)> {
        let table = upgrade(&self.table)?;
        let column = self
            .column
            .upgrade()
            .ok_or_else(|| Error::dead_reference("column"))?;
        Ok((table, column))
    }

    pub fn is_alive(&self) -> bool {
        self.table.strong_count() > 0 && self.column.strong_count() > 0
    }

    pub fn name(&self) -> Result<String> {
        Ok(self.bind()?.1.name())
    }

    pub fn position(&self) -> Result<usize> {
        Ok(self.bind()?.1.position())
    }

    pub fn forced_type(&self) -> Result<Option<ForcedType>> {
        Ok(self.bind()?.1.forced_type())
    }

    pub fn rename(&self, name: &str) -> Result<()> {
        let (table, column) = self.bind()?;
        table.rename_column(&column.name(), name)
    }

    pub fn set_forced_type(&self, forced: Option<ForcedType>) -> Result<()> {
        let (_, column) = self.bind()?;
        column.set_forced_type(forced);
        Ok(())
    }

    /// Deletes the column from its table. The view is dead afterwards.
    pub fn remove(&self) -> Result<()> {
        let (table, column) = self.bind()?;
        let name = column.name();
        drop(column);
        table.remove_column(&name)
    }

    /// Every cell of the column in driver order; unwritten cells are `Null`.
    pub fn values(&self) -> Result<Vec<Value>> {
        let (table, column) = self.bind()?;
        let name = column.name();
        table
            .iter()
            .map(|r| r.map(|(_, mut row)| row.swap_remove(name.as_str()).unwrap_or(Value::Null)))
            .collect()
    }

    /// Rewrites every cell with `f(current)`. Returns the number of cells
    /// whose value changed.
    pub fn map<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(Value) -> Value,
    {
        let (table, column) = self.bind()?;
        let name = column.name();
        let cells: Vec<_> = table
            .iter()
            .map(|r| r.map(|(key, mut row)| (key, row.swap_remove(name.as_str()).unwrap_or(Value::Null))))
            .collect::<Result<_>>()?;
        let mut changed = 0;
        for (key, old) in cells {
            let new = f(old.clone());
            if new != old {
                table.update_cell(key, &name, new)?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Writes `value` into every row.
    pub fn fill(&self, value: impl Into<Value>) -> Result<usize> {
        let value = value.into();
        let (table, column) = self.bind()?;
        let name = column.name();
        let keys: Vec<_> = table.iter().map(|r| r.map(|(k, _)| k)).collect::<Result<_>>()?;
        for key in &keys {
            table.update_cell(*key, &name, value.clone())?;
        }
        Ok(keys.len())
    }

    /// Query over this column alone.
    pub fn select(&self) -> Result<Select> {
        self.bind()?;
        Ok(Select::new(self.table.clone(), Some(vec![self.column.clone()])))
    }

    fn fold(&self, mut aggregator: Box<dyn Aggregator>) -> Result<Value> {
        let (table, column) = self.bind()?;
        table.select_all().fold_column(&column.name(), aggregator.as_mut())?;
        aggregator.result()
    }

    pub fn sum(&self) -> Result<Value> {
        self.fold(Box::new(Sum::new()))
    }

    pub fn mean(&self) -> Result<Value> {
        self.fold(Box::new(Mean::new()))
    }

    pub fn min(&self) -> Result<Value> {
        self.fold(Box::new(Min::new()))
    }

    pub fn max(&self) -> Result<Value> {
        self.fold(Box::new(Max::new()))
    }

    pub fn first(&self) -> Result<Value> {
        self.fold(Box::new(First::new()))
    }

    /// Number of non-null cells.
    pub fn count(&self) -> Result<Value> {
        self.fold(Box::new(Count::new()))
    }

    pub fn count_distinct_values(&self) -> Result<Value> {
        self.fold(Box::new(CountDistinctValues::new()))
    }

    /// Registry stat used as a property.
    pub fn stat(&self, name: &str) -> Result<Value> {
        self.call_module(name, &[])
    }

    /// Registry stat called with arguments.
    pub fn call_module(&self, name: &str, args: &[Value]) -> Result<Value> {
        let (table, column) = self.bind()?;
        table.select_all().call_module(name, &column.name(), args)
    }
}

impl PartialEq for ColumnView {
    fn eq(&self, other: &Self) -> bool {
        self.table.ptr_eq(&other.table) && self.column.ptr_eq(&other.column)
    }
}

impl fmt::Debug for ColumnView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column.upgrade() {
            Some(column) if self.table.strong_count() > 0 => f
                .debug_struct("ColumnView")
                .field("name", &column.name())
                .field("position", &column.position())
                .finish(),
            _ => f.write_str("ColumnView(dead)"),
        }
    }
}
