//! Table: a storage driver plus the schema that names its positions.

use crate::record::Record;
use crate::registry::{StatModule, StatRegistry};
use crate::schema::{Column, Schema};
use crate::statement::{Delete, Insert, Select, Update};
use crate::view::ColumnView;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};
use tabula_core::{Error, ForcedType, NamedRow, Result, Row, RowKey, Value};
use tabula_storage::{sortable, writable, MemoryDriver, ScanCursor, StorageDriver};

/// Callback shown the column names a write is about to create. Returning an
/// error vetoes the write before any column or row is created.
pub type SchemaHook = Rc<dyn Fn(&[String]) -> Result<()>>;

pub(crate) struct TableInner {
    pub driver: Box<dyn StorageDriver>,
    pub schema: Schema,
    pub registry: StatRegistry,
    pub hook: Option<SchemaHook>,
}

impl TableInner {
    pub fn fetch(&self, key: RowKey, fill: bool) -> Result<NamedRow> {
        let row = self.driver.get(key)?;
        Ok(self.schema.to_named(&row, fill))
    }
}

/// Non-owning handle held by views, statements and records.
pub(crate) type TableRef = Weak<RefCell<TableInner>>;

/// Upgrades a handle, failing with `DeadReference` once the table is gone.
pub(crate) fn upgrade(table: &TableRef) -> Result<Table> {
    table
        .upgrade()
        .map(|inner| Table { inner })
        .ok_or_else(|| Error::dead_reference("table"))
}

/// A mutable collection of records with a schema discovered from the records
/// written to it.
///
/// Callers work with named records; the driver stores positional rows. Every
/// view, statement and record derived from a table holds it weakly and fails
/// with `DeadReference` once the table is dropped.
///
/// Forced-type converters run while the table is borrowed and must not call
/// back into the same table.
pub struct Table {
    inner: Rc<RefCell<TableInner>>,
}

/// Builder for tables that need a custom driver, registry or schema hook.
pub struct TableBuilder {
    rows: Vec<NamedRow>,
    driver: Option<Box<dyn StorageDriver>>,
    registry: Option<StatRegistry>,
    hook: Option<SchemaHook>,
    columns: Vec<String>,
    forced: Vec<(String, ForcedType)>,
}

impl TableBuilder {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            driver: None,
            registry: None,
            hook: None,
            columns: Vec::new(),
            forced: Vec::new(),
        }
    }

    /// Initial records, written in order.
    pub fn rows(mut self, rows: impl IntoIterator<Item = NamedRow>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Storage driver. Defaults to an empty `MemoryDriver`.
    pub fn driver(mut self, driver: Box<dyn StorageDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Stat registry. Defaults to `StatRegistry::with_builtins()`.
    pub fn registry(mut self, registry: StatRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Installs a pre-commit hook for schema growth.
    pub fn schema_hook(mut self, hook: impl Fn(&[String]) -> Result<()> + 'static) -> Self {
        self.hook = Some(Rc::new(hook));
        self
    }

    /// Declares a column up front. Declared columns take positions in
    /// declaration order, which lets a table adopt a non-empty driver.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Declares a column with a write conversion.
    pub fn forced_type(mut self, name: impl Into<String>, forced: impl Into<ForcedType>) -> Self {
        let name = name.into();
        self.columns.push(name.clone());
        self.forced.push((name, forced.into()));
        self
    }

    pub fn build(self) -> Result<Table> {
        let mut schema = Schema::new();
        for name in &self.columns {
            schema.add(name);
        }
        for (name, forced) in self.forced {
            schema.require(&name)?.set_forced_type(Some(forced));
        }
        let table = Table {
            inner: Rc::new(RefCell::new(TableInner {
                driver: self
                    .driver
                    .unwrap_or_else(|| Box::new(MemoryDriver::new())),
                schema,
                registry: self.registry.unwrap_or_else(StatRegistry::with_builtins),
                hook: self.hook,
            })),
        };
        for row in self.rows {
            table.add_record(row)?;
        }
        Ok(table)
    }
}

impl Table {
    /// Creates a table holding `rows`, stored in `driver` (or in memory).
    pub fn new(
        rows: impl IntoIterator<Item = NamedRow>,
        driver: Option<Box<dyn StorageDriver>>,
    ) -> Result<Table> {
        let mut builder = TableBuilder::new().rows(rows);
        if let Some(driver) = driver {
            builder = builder.driver(driver);
        }
        builder.build()
    }

    /// Creates an empty in-memory table.
    pub fn empty() -> Table {
        Table {
            inner: Rc::new(RefCell::new(TableInner {
                driver: Box::new(MemoryDriver::new()),
                schema: Schema::new(),
                registry: StatRegistry::with_builtins(),
                hook: None,
            })),
        }
    }

    pub fn builder() -> TableBuilder {
        TableBuilder::new()
    }

    /// Builds an in-memory table from named records.
    pub fn from_rows(rows: impl IntoIterator<Item = NamedRow>) -> Result<Table> {
        Table::new(rows, None)
    }

    pub(crate) fn downgrade(&self) -> TableRef {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &RefCell<TableInner> {
        &self.inner
    }

    // ---- schema ----

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.inner.borrow().schema.names()
    }

    /// True when both tables declare the same columns in the same order.
    pub fn same_schema(&self, other: &Table) -> bool {
        self.column_names() == other.column_names()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.inner.borrow().schema.contains(name)
    }

    pub fn count_columns(&self) -> usize {
        self.inner.borrow().schema.len()
    }

    pub fn count_rows(&self) -> Result<usize> {
        self.inner.borrow().driver.count()
    }

    /// Name of the storage driver.
    pub fn driver_name(&self) -> String {
        self.inner.borrow().driver.name().to_string()
    }

    /// Names `row` would add to the schema if written now.
    pub fn pending_columns(&self, row: &NamedRow) -> Vec<String> {
        self.inner.borrow().schema.pending(row)
    }

    /// Adds a column. A no-op if the name already exists.
    pub fn add_column(&self, name: &str) -> Result<ColumnView> {
        let pending = vec![name.to_string()];
        if !self.has_column(name) {
            self.run_hook(&pending)?;
        }
        let column = self.commit_columns(&pending).pop();
        match column {
            Some(column) => Ok(ColumnView::new(self.downgrade(), Rc::downgrade(&column))),
            None => self.column(name),
        }
    }

    /// Deletes a column and strips its cells from every stored row.
    pub fn remove_column(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let position = inner.schema.require(name)?.position();
        writable(inner.driver.as_mut())?.strip_position(position)?;
        inner.schema.remove(name)?;
        tracing::debug!(column = name, position, "column removed");
        Ok(())
    }

    /// Renames a column in place; views and statements keep working.
    pub fn rename_column(&self, old: &str, new: &str) -> Result<()> {
        self.inner.borrow_mut().schema.rename(old, new)?;
        tracing::debug!(from = old, to = new, "column renamed");
        Ok(())
    }

    /// Sets (or clears) the conversion applied to values written to `name`.
    pub fn set_forced_type(&self, name: &str, forced: Option<ForcedType>) -> Result<()> {
        self.inner
            .borrow()
            .schema
            .require(name)?
            .set_forced_type(forced);
        Ok(())
    }

    /// View of one column.
    pub fn column(&self, name: &str) -> Result<ColumnView> {
        let inner = self.inner.borrow();
        let column = inner.schema.require(name)?;
        Ok(ColumnView::new(self.downgrade(), Rc::downgrade(column)))
    }

    /// Views of every column, in schema order.
    pub fn columns(&self) -> Vec<ColumnView> {
        self.inner
            .borrow()
            .schema
            .columns()
            .iter()
            .map(|c| ColumnView::new(self.downgrade(), Rc::downgrade(c)))
            .collect()
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<Weak<Column>> {
        Ok(Rc::downgrade(self.inner.borrow().schema.require(name)?))
    }

    fn run_hook(&self, pending: &[String]) -> Result<()> {
        let hook = self.inner.borrow().hook.clone();
        match hook {
            Some(hook) => hook(pending),
            None => Ok(()),
        }
    }

    fn commit_columns(&self, names: &[String]) -> Vec<Rc<Column>> {
        let mut inner = self.inner.borrow_mut();
        let mut added = Vec::new();
        for name in names {
            if inner.schema.contains(name) {
                continue;
            }
            let column = inner.schema.add(name);
            tracing::debug!(column = %name, position = column.position(), "column added");
            added.push(column);
        }
        added
    }

    /// Grows the schema for `row`, consulting the hook first.
    fn admit(&self, row: &NamedRow) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            writable(inner.driver.as_mut())?;
        }
        let pending = self.pending_columns(row);
        if pending.is_empty() {
            return Ok(());
        }
        self.run_hook(&pending)?;
        self.commit_columns(&pending);
        Ok(())
    }

    // ---- records ----

    /// Writes a new record and returns its key.
    pub fn add_record(&self, row: NamedRow) -> Result<RowKey> {
        self.admit(&row)?;
        let mut inner = self.inner.borrow_mut();
        let positional = inner.schema.to_positional(&row)?;
        writable(inner.driver.as_mut())?.add(positional)
    }

    /// Replaces the record stored under `key`.
    pub fn update_record(&self, key: RowKey, row: NamedRow) -> Result<()> {
        if !self.record_exists(key)? {
            return Err(Error::not_found(key));
        }
        self.admit(&row)?;
        let mut inner = self.inner.borrow_mut();
        let positional = inner.schema.to_positional(&row)?;
        writable(inner.driver.as_mut())?.set(key, positional)
    }

    /// Writes one cell, creating the column if needed.
    pub fn update_cell(&self, key: RowKey, name: &str, value: impl Into<Value>) -> Result<()> {
        if !self.record_exists(key)? {
            return Err(Error::not_found(key));
        }
        let mut row = NamedRow::default();
        row.insert(name.to_string(), value.into());
        self.admit(&row)?;
        let mut inner = self.inner.borrow_mut();
        let (position, value) = {
            let column = inner.schema.require(name)?;
            let value = row.swap_remove(name).unwrap_or(Value::Null);
            (column.position(), column.convert(value))
        };
        writable(inner.driver.as_mut())?.set_cell(key, position, value)
    }

    /// Removes a record. Removing an absent key is a no-op; use
    /// `record_exists` first to tell the two apart.
    pub fn delete_record(&self, key: RowKey) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        match writable(inner.driver.as_mut())?.remove(key) {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// Same as `delete_record`.
    pub fn remove_record(&self, key: RowKey) -> Result<()> {
        self.delete_record(key)
    }

    pub fn get_record(&self, key: RowKey) -> Result<Record> {
        let row = self.get_row(key, false)?;
        Ok(Record::new(self.downgrade(), key, row))
    }

    /// The named record stored under `key`; `fill` adds unwritten columns as null.
    pub fn get_row(&self, key: RowKey, fill: bool) -> Result<NamedRow> {
        self.inner.borrow().fetch(key, fill)
    }

    pub fn record_exists(&self, key: RowKey) -> Result<bool> {
        self.inner.borrow().driver.contains(key)
    }

    /// Lazily yields `(key, record)` in driver order. Columns a row never
    /// wrote are absent.
    pub fn iter(&self) -> Rows<'_> {
        Rows {
            table: self,
            cursor: ScanCursor::new(),
            fill: false,
        }
    }

    /// Every record, filled, in driver order.
    pub fn to_rows(&self) -> Result<Vec<NamedRow>> {
        Rows {
            table: self,
            cursor: ScanCursor::new(),
            fill: true,
        }
        .map(|r| r.map(|(_, row)| row))
        .collect()
    }

    /// Deep copy: fresh storage, fresh column identities at the same positions.
    pub fn try_clone(&self) -> Result<Table> {
        let inner = self.inner.borrow();
        let driver = inner.driver.snapshot()?;
        tracing::debug!(rows = driver.len(), columns = inner.schema.len(), "table cloned");
        Ok(Table {
            inner: Rc::new(RefCell::new(TableInner {
                driver: Box::new(driver),
                schema: inner.schema.detached_copy(),
                registry: inner.registry.clone(),
                hook: inner.hook.clone(),
            })),
        })
    }

    /// Reorders rows physically using `compare` on filled records. Needs a
    /// sortable driver.
    pub fn sort_by<F>(&self, mut compare: F) -> Result<()>
    where
        F: FnMut(&NamedRow, &NamedRow) -> Ordering,
    {
        let mut inner = self.inner.borrow_mut();
        let TableInner { driver, schema, .. } = &mut *inner;
        sortable(driver.as_mut())?.sort_by(&mut |a: &Row, b: &Row| {
            compare(&schema.to_named(a, true), &schema.to_named(b, true))
        })
    }

    /// Sorts rows by one column's natural order. Unwritten cells sort first.
    pub fn sort_by_column(&self, name: &str, descending: bool) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let position = inner.schema.require(name)?.position();
        sortable(inner.driver.as_mut())?.sort_by(&mut |a: &Row, b: &Row| {
            let ord = a.get(position).cmp(&b.get(position));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        })
    }

    // ---- statements ----

    /// Query over `columns`, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<Select> {
        let mut resolved = Vec::with_capacity(columns.len());
        let mut seen = Vec::new();
        for name in columns {
            if seen.contains(name) {
                continue;
            }
            seen.push(*name);
            resolved.push(self.resolve(name)?);
        }
        Ok(Select::new(self.downgrade(), Some(resolved)))
    }

    /// Query over every column, projected by the schema current at read time.
    pub fn select_all(&self) -> Select {
        Select::new(self.downgrade(), None)
    }

    pub fn update(&self) -> Update {
        Update::new(self.downgrade())
    }

    pub fn delete(&self) -> Delete {
        Delete::new(self.downgrade())
    }

    pub fn insert(&self) -> Insert {
        Insert::new(self.downgrade())
    }

    // ---- stats ----

    /// Registers a stat module on this table.
    pub fn register_stat(&self, module: Rc<dyn StatModule>) -> Result<()> {
        self.inner.borrow_mut().registry.register(module)
    }

    /// Copy of the table's stat registry.
    pub fn registry(&self) -> StatRegistry {
        self.inner.borrow().registry.clone()
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::empty()
    }
}

/// Row-order-preserving equality of filled records. Column order is not
/// compared; see [`Table::same_schema`].
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_rows(), other.to_rows()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Table")
            .field("driver", &inner.driver.name())
            .field("columns", &inner.schema.names())
            .field("rows", &inner.driver.count().ok())
            .finish()
    }
}

/// Lazy `(key, record)` iterator over a table.
pub struct Rows<'a> {
    table: &'a Table,
    cursor: ScanCursor,
    fill: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<(RowKey, NamedRow)>;

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.table.inner.borrow();
        match inner.driver.advance(&mut self.cursor) {
            Ok(Some(key)) => Some(inner.fetch(key, self.fill).map(|row| (key, row))),
            Ok(None) => None,
            Err(e) => {
                self.cursor.finish();
                Some(Err(e))
            }
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = Result<(RowKey, NamedRow)>;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{named_row, DataType};

    fn sample() -> Table {
        Table::new(
            vec![
                named_row([("a", 1i64), ("b", 2)]),
                named_row([("a", 4i64)]),
                named_row([("c", "x")]),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_schema_grows_in_first_seen_order() {
        let table = sample();
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(table.count_columns(), 3);
        assert_eq!(table.count_rows().unwrap(), 3);
    }

    #[test]
    fn test_iter_is_sparse_and_to_rows_is_filled() {
        let table = sample();
        let (_, first) = table.iter().nth(1).unwrap().unwrap();
        assert_eq!(first.len(), 1);
        let rows = table.to_rows().unwrap();
        assert_eq!(rows[1].get("b"), Some(&Value::Null));
        assert_eq!(rows[2].keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_column_is_idempotent() {
        let table = sample();
        let first = table.add_column("d").unwrap();
        let second = table.add_column("d").unwrap();
        assert_eq!(first, second);
        assert_eq!(table.count_columns(), 4);
    }

    #[test]
    fn test_remove_column_strips_cells() {
        let table = sample();
        table.remove_column("a").unwrap();
        assert!(!table.has_column("a"));
        assert!(matches!(
            table.remove_column("a"),
            Err(Error::UnknownColumn { .. })
        ));
        table.add_column("a").unwrap();
        assert_eq!(table.column_names(), vec!["b", "c", "a"]);
        // The old cells do not resurface under the new identity.
        let rows = table.to_rows().unwrap();
        assert!(rows.iter().all(|r| r.get("a") == Some(&Value::Null)));
    }

    #[test]
    fn test_update_record_and_cell() {
        let table = sample();
        table.update_record(0, named_row([("b", 9i64)])).unwrap();
        assert_eq!(table.get_row(0, false).unwrap(), named_row([("b", 9i64)]));

        table.update_cell(1, "d", "new").unwrap();
        assert!(table.has_column("d"));
        assert_eq!(table.get_row(1, false).unwrap().get("d"), Some(&Value::from("new")));

        assert!(table.update_cell(99, "a", 1i64).unwrap_err().is_not_found());
        assert!(table.update_record(99, NamedRow::default()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_forced_type_applies_on_write() {
        let table = Table::builder()
            .forced_type("n", DataType::Int64)
            .build()
            .unwrap();
        let key = table.add_record(named_row([("n", "12")])).unwrap();
        assert_eq!(table.get_row(key, false).unwrap().get("n"), Some(&Value::Int64(12)));

        table.set_forced_type("n", Some(ForcedType::custom(|_| Value::Int64(0)))).unwrap();
        table.update_cell(key, "n", 5i64).unwrap();
        assert_eq!(table.get_row(key, false).unwrap().get("n"), Some(&Value::Int64(0)));
    }

    #[test]
    fn test_delete_and_remove_record() {
        let table = sample();
        table.delete_record(0).unwrap();
        table.delete_record(0).unwrap();
        assert!(!table.record_exists(0).unwrap());
        table.remove_record(0).unwrap();
        assert_eq!(table.count_rows().unwrap(), 2);
        assert!(!table.record_exists(0).unwrap());
    }

    #[test]
    fn test_schema_hook_vetoes_before_any_change() {
        let table = Table::builder()
            .schema_hook(|names| {
                if names.iter().any(|n| n == "secret") {
                    Err(Error::invalid_argument("secret columns are not allowed"))
                } else {
                    Ok(())
                }
            })
            .build()
            .unwrap();
        table.add_record(named_row([("a", 1i64)])).unwrap();
        let err = table
            .add_record(named_row([("b", 1i64), ("secret", 2)]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(table.column_names(), vec!["a"]);
        assert_eq!(table.count_rows().unwrap(), 1);
    }

    #[test]
    fn test_clone_is_independent() {
        let table = sample();
        let copy = table.try_clone().unwrap();
        assert_eq!(table, copy);
        copy.update_cell(0, "a", 100i64).unwrap();
        assert_ne!(table, copy);
        assert_eq!(table.get_row(0, false).unwrap().get("a"), Some(&Value::Int64(1)));
        assert_ne!(table.column("a").unwrap(), copy.column("a").unwrap());
    }

    #[test]
    fn test_sort_by_column() {
        let table = Table::from_rows(vec![
            named_row([("n", 3i64)]),
            named_row([("n", 1i64)]),
            named_row([("n", 2i64)]),
        ])
        .unwrap();
        table.sort_by_column("n", false).unwrap();
        let keys: Vec<RowKey> = table.iter().map(|r| r.unwrap().0).collect();
        assert_eq!(keys, vec![1, 2, 0]);

        table
            .sort_by(|a, b| b.get("n").cmp(&a.get("n")))
            .unwrap();
        let values: Vec<Value> = table
            .to_rows()
            .unwrap()
            .into_iter()
            .map(|r| r["n"].clone())
            .collect();
        assert_eq!(values, vec![Value::Int64(3), Value::Int64(2), Value::Int64(1)]);
    }

    #[test]
    fn test_round_trip() {
        let table = sample();
        let rebuilt = Table::from_rows(table.to_rows().unwrap()).unwrap();
        assert_eq!(table, rebuilt);
        assert!(table.same_schema(&rebuilt));
    }

    #[test]
    fn test_round_trip_after_deleting_every_row() {
        let table = sample();
        for key in 0..3 {
            table.delete_record(key).unwrap();
        }
        let rebuilt = Table::from_rows(table.to_rows().unwrap()).unwrap();
        assert_eq!(rebuilt.count_columns(), 0);
        assert_eq!(table, rebuilt);
        assert!(!table.same_schema(&rebuilt));
    }
}
