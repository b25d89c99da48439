//! Lazy query and mutation statements.
//!
//! A statement is a plan (projection, CNF predicate, key range, limit and
//! offset) over a weakly-held table. `Select` walks the table through a
//! restartable cursor:
//!
//! ```text
//! rewind()  -> positioned on the first qualifying row, or exhausted
//! advance() -> positioned on the next qualifying row, or exhausted
//! valid()   -> positioned and the limit not yet reached
//! ```
//!
//! Limit and offset count matching rows, not raw positions.

use crate::aggregate::{Aggregator, Count, CountDistinctValues, First, Max, Mean, Min, Sum};
use crate::group_by::{AggregateExpr, Grouper};
use crate::predicate::{ColumnBetween, ColumnEquals, ColumnMatch, Cnf, KeyRange, Predicate};
use crate::record::Record;
use crate::registry::instantiate;
use crate::schema::Column;
use crate::table::{upgrade, Table, TableRef};
use std::rc::{Rc, Weak};
use tabula_core::{Error, NamedRow, Result, RowKey, Value};
use tabula_storage::ScanCursor;

/// Filter, projection and window shared by every statement kind.
#[derive(Clone)]
pub struct Plan {
    table: TableRef,
    columns: Option<Vec<Weak<Column>>>,
    cnf: Cnf,
    key_range: Option<KeyRange>,
    limit: Option<usize>,
    offset: usize,
}

impl Plan {
    fn new(table: TableRef, columns: Option<Vec<Weak<Column>>>) -> Self {
        Self {
            table,
            columns,
            cnf: Cnf::default(),
            key_range: None,
            limit: None,
            offset: 0,
        }
    }

    fn table(&self) -> Result<Table> {
        upgrade(&self.table)
    }

    fn column(&self, name: &str) -> Result<Weak<Column>> {
        self.table()?.resolve(name)
    }

    /// Projects a full row onto the selected columns.
    fn project(&self, row: &NamedRow) -> Result<NamedRow> {
        let columns = match &self.columns {
            None => return Ok(row.clone()),
            Some(columns) => columns,
        };
        let mut projected = NamedRow::default();
        for column in columns {
            let column = column
                .upgrade()
                .ok_or_else(|| Error::dead_reference("column"))?;
            let name = column.name();
            let value = row.get(name.as_str()).cloned().unwrap_or(Value::Null);
            projected.insert(name, value);
        }
        Ok(projected)
    }

    /// Names of the projected columns, in output order.
    fn column_names(&self, table: &Table) -> Result<Vec<String>> {
        match &self.columns {
            None => Ok(table.column_names()),
            Some(columns) => columns
                .iter()
                .map(|c| {
                    c.upgrade()
                        .map(|c| c.name())
                        .ok_or_else(|| Error::dead_reference("column"))
                })
                .collect(),
        }
    }
}

fn non_negative(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::invalid_argument(format!("{} must not be negative, got {}", what, value)))
}

/// Predicate and window builders shared by `Select`, `Update` and `Delete`.
///
/// `where_` and `and` each start a new OR-group; `or` joins the last one, so
/// `where_(p1).or(p2).and(p3)` means `(p1 OR p2) AND p3`.
pub trait Filtered: Sized {
    #[doc(hidden)]
    fn plan_mut(&mut self) -> &mut Plan;

    fn where_<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&NamedRow) -> bool + 'static,
    {
        self.plan_mut().cnf.and(Rc::new(predicate));
        self
    }

    fn and<P>(self, predicate: P) -> Self
    where
        P: Fn(&NamedRow) -> bool + 'static,
    {
        self.where_(predicate)
    }

    fn or<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&NamedRow) -> bool + 'static,
    {
        self.plan_mut().cnf.or(Rc::new(predicate));
        self
    }

    /// Starts a new OR-group with a custom predicate.
    fn where_predicate(mut self, predicate: Rc<dyn Predicate>) -> Self {
        self.plan_mut().cnf.and(predicate);
        self
    }

    /// Joins the last OR-group with a custom predicate.
    fn or_predicate(mut self, predicate: Rc<dyn Predicate>) -> Self {
        self.plan_mut().cnf.or(predicate);
        self
    }

    fn where_column_equal(mut self, column: &str, value: impl Into<Value>) -> Result<Self> {
        let column = self.plan_mut().column(column)?;
        Ok(self.where_predicate(Rc::new(ColumnEquals {
            column,
            value: value.into(),
        })))
    }

    fn where_column(mut self, column: &str, matcher: ColumnMatch) -> Result<Self> {
        let column = self.plan_mut().column(column)?;
        let predicate = matcher.compile(column)?;
        Ok(self.where_predicate(Rc::new(predicate)))
    }

    /// `low <= column <= high`.
    fn where_column_between(
        mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self> {
        let column = self.plan_mut().column(column)?;
        Ok(self.where_predicate(Rc::new(ColumnBetween {
            column,
            low: low.into(),
            high: high.into(),
        })))
    }

    /// Restricts to keys in `start..=end`. A second call replaces the first
    /// range rather than narrowing it.
    fn where_key_between(mut self, start: RowKey, end: RowKey) -> Self {
        self.plan_mut().key_range = Some(KeyRange { start, end });
        self
    }

    /// At most `limit` matching rows, after skipping `offset` matching rows.
    fn limit(mut self, limit: i64, offset: i64) -> Result<Self> {
        let limit = non_negative(limit, "limit")?;
        let offset = non_negative(offset, "offset")?;
        let plan = self.plan_mut();
        plan.limit = Some(limit);
        plan.offset = offset;
        Ok(self)
    }

    fn offset(mut self, offset: i64) -> Result<Self> {
        self.plan_mut().offset = non_negative(offset, "offset")?;
        Ok(self)
    }
}

/// Restartable cursor over a plan.
struct Cursor {
    plan: Plan,
    scan: ScanCursor,
    skipped: usize,
    yielded: usize,
    current: Option<(RowKey, NamedRow)>,
    started: bool,
}

impl Cursor {
    fn new(plan: Plan) -> Self {
        Self {
            plan,
            scan: ScanCursor::new(),
            skipped: 0,
            yielded: 0,
            current: None,
            started: false,
        }
    }

    fn limit_reached(&self) -> bool {
        self.plan.limit.map_or(false, |limit| self.yielded >= limit)
    }

    fn rewind(&mut self) -> Result<()> {
        self.started = true;
        self.scan.reset();
        self.skipped = 0;
        self.yielded = 0;
        self.current = None;
        self.seek()
    }

    fn advance(&mut self) -> Result<()> {
        if !self.started {
            return self.rewind();
        }
        if self.current.take().is_some() {
            self.yielded += 1;
        }
        self.seek()
    }

    /// Moves to the next row that passes the key range, predicate and offset.
    fn seek(&mut self) -> Result<()> {
        let table = self.plan.table()?;
        if self.limit_reached() {
            return Ok(());
        }
        loop {
            let key = table.inner().borrow().driver.advance(&mut self.scan)?;
            let key = match key {
                Some(key) => key,
                None => return Ok(()),
            };
            if let Some(range) = &self.plan.key_range {
                if !range.contains(key) {
                    tracing::trace!(key, "row outside key range");
                    continue;
                }
            }
            let row = table.get_row(key, true)?;
            if !self.plan.cnf.matches(&row)? {
                tracing::trace!(key, "row filtered out");
                continue;
            }
            if self.skipped < self.plan.offset {
                self.skipped += 1;
                tracing::trace!(key, "row skipped by offset");
                continue;
            }
            self.current = Some((key, row));
            return Ok(());
        }
    }

    fn valid(&self) -> bool {
        self.current.is_some() && !self.limit_reached()
    }

    fn current_full(&self) -> Option<&(RowKey, NamedRow)> {
        if self.valid() {
            self.current.as_ref()
        } else {
            None
        }
    }

    /// Every remaining `(key, full row)`, from the start.
    fn collect_full(&mut self) -> Result<Vec<(RowKey, NamedRow)>> {
        let mut rows = Vec::new();
        self.rewind()?;
        while let Some(entry) = self.current_full() {
            rows.push(entry.clone());
            self.advance()?;
        }
        Ok(rows)
    }
}

/// Lazy, restartable query.
pub struct Select {
    cursor: Cursor,
}

impl std::fmt::Debug for Select {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Select").finish_non_exhaustive()
    }
}

impl Filtered for Select {
    fn plan_mut(&mut self) -> &mut Plan {
        &mut self.cursor.plan
    }
}

impl Select {
    pub(crate) fn new(table: TableRef, columns: Option<Vec<Weak<Column>>>) -> Self {
        Self {
            cursor: Cursor::new(Plan::new(table, columns)),
        }
    }

    // ---- cursor protocol ----

    /// Restarts the scan and moves to the first qualifying row.
    pub fn rewind(&mut self) -> Result<()> {
        self.cursor.rewind()
    }

    /// Moves to the next qualifying row. Rewinds first if never started.
    pub fn advance(&mut self) -> Result<()> {
        self.cursor.advance()
    }

    /// True while positioned on a row within the limit.
    pub fn valid(&self) -> bool {
        self.cursor.valid()
    }

    /// The current row, projected.
    pub fn current(&self) -> Result<Option<NamedRow>> {
        match self.cursor.current_full() {
            Some((_, row)) => self.cursor.plan.project(row).map(Some),
            None => Ok(None),
        }
    }

    pub fn current_key(&self) -> Option<RowKey> {
        self.cursor.current_full().map(|(key, _)| *key)
    }

    /// Projected rows, restarting from the first.
    pub fn iter(&mut self) -> SelectIter<'_> {
        SelectIter {
            select: self,
            started: false,
            failed: false,
        }
    }

    /// Matching rows as records bound to the table.
    pub fn records(&mut self) -> Result<Vec<Record>> {
        let table = self.cursor.plan.table.clone();
        let rows = self.cursor.collect_full()?;
        rows.into_iter()
            .map(|(key, row)| {
                let projected = self.cursor.plan.project(&row)?;
                Ok(Record::new(table.clone(), key, projected))
            })
            .collect()
    }

    pub fn collect_rows(&mut self) -> Result<Vec<NamedRow>> {
        self.iter().collect()
    }

    /// Number of matching rows within the window.
    pub fn count(&mut self) -> Result<usize> {
        let mut n = 0;
        self.cursor.rewind()?;
        while self.cursor.valid() {
            n += 1;
            self.cursor.advance()?;
        }
        Ok(n)
    }

    pub fn first(&mut self) -> Result<Option<NamedRow>> {
        self.rewind()?;
        self.current()
    }

    /// Materializes the result into a new in-memory table that shares this
    /// table's stat registry.
    pub fn to_table(&mut self) -> Result<Table> {
        let source = self.cursor.plan.table()?;
        let names = self.cursor.plan.column_names(&source)?;
        let rows = self.collect_rows()?;
        let mut builder = Table::builder().registry(source.registry());
        for name in names {
            builder = builder.column(name);
        }
        builder.rows(rows).build()
    }

    // ---- stats ----

    /// Feeds `column` of every matching row (full, unprojected) into `aggregator`.
    pub fn fold_column(&mut self, column: &str, aggregator: &mut dyn Aggregator) -> Result<()> {
        let table = self.cursor.plan.table()?;
        if !table.has_column(column) {
            return Err(Error::unknown_column(column));
        }
        self.cursor.rewind()?;
        while let Some((_, row)) = self.cursor.current_full() {
            aggregator.add_value(row.get(column).unwrap_or(&Value::Null));
            self.cursor.advance()?;
        }
        Ok(())
    }

    fn fold(&mut self, column: &str, mut aggregator: impl Aggregator) -> Result<Value> {
        self.fold_column(column, &mut aggregator)?;
        aggregator.result()
    }

    pub fn sum(&mut self, column: &str) -> Result<Value> {
        self.fold(column, Sum::new())
    }

    pub fn mean(&mut self, column: &str) -> Result<Value> {
        self.fold(column, Mean::new())
    }

    pub fn min(&mut self, column: &str) -> Result<Value> {
        self.fold(column, Min::new())
    }

    pub fn max(&mut self, column: &str) -> Result<Value> {
        self.fold(column, Max::new())
    }

    pub fn first_value(&mut self, column: &str) -> Result<Value> {
        self.fold(column, First::new())
    }

    /// Non-null values of `column` among matching rows.
    pub fn count_values(&mut self, column: &str) -> Result<Value> {
        self.fold(column, Count::new())
    }

    pub fn count_distinct_values(&mut self, column: &str) -> Result<Value> {
        self.fold(column, CountDistinctValues::new())
    }

    /// Registry stat used as a property.
    pub fn stat(&mut self, name: &str, column: &str) -> Result<Value> {
        self.call_module(name, column, &[])
    }

    /// Registry stat called with arguments.
    pub fn call_module(&mut self, name: &str, column: &str, args: &[Value]) -> Result<Value> {
        let module = self.cursor.plan.table()?.inner().borrow().registry.get(name)?;
        let mut aggregator = instantiate(module.as_ref(), args)?;
        self.fold_column(column, aggregator.as_mut())?;
        aggregator.result()
    }

    // ---- group-by ----

    /// Groups matching rows by `keys` and folds each aggregate per group into
    /// a new table. Rows are folded as the cursor advances. Groups appear in
    /// first-seen order; an empty key list yields a single row. Output names
    /// must be distinct from the keys and from each other.
    pub fn group_by(&mut self, keys: &[&str], aggregates: &[AggregateExpr]) -> Result<Table> {
        let table = self.cursor.plan.table()?;
        for name in keys
            .iter()
            .copied()
            .chain(aggregates.iter().map(|a| a.source()))
        {
            if !table.has_column(name) {
                return Err(Error::unknown_column(name));
            }
        }
        let mut grouper = Grouper::new(keys, aggregates)?;
        self.cursor.rewind()?;
        while let Some((_, row)) = self.cursor.current_full() {
            grouper.feed(row)?;
            self.cursor.advance()?;
        }
        grouper.finish(&table)
    }
}

/// Iterator over a `Select`'s projected rows. Stops after the first error.
pub struct SelectIter<'a> {
    select: &'a mut Select,
    started: bool,
    failed: bool,
}

impl Iterator for SelectIter<'_> {
    type Item = Result<NamedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let step = if self.started {
            self.select.advance()
        } else {
            self.started = true;
            self.select.rewind()
        };
        match step.and_then(|_| self.select.current()) {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a> IntoIterator for &'a mut Select {
    type Item = Result<NamedRow>;
    type IntoIter = SelectIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Rewrites matching rows.
pub struct Update {
    plan: Plan,
}

impl Filtered for Update {
    fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }
}

impl Update {
    pub(crate) fn new(table: TableRef) -> Self {
        Self {
            plan: Plan::new(table, None),
        }
    }

    /// Calls `f` once per matching row. Returning `None`, or the row
    /// unchanged, skips the write. Only cells that differ are written, so
    /// returning a row with fewer columns never clears anything. Returns the
    /// number of rows written.
    pub fn apply<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(NamedRow) -> Option<NamedRow>,
    {
        let table = self.plan.table()?;
        let rows = Cursor::new(self.plan.clone()).collect_full()?;
        let mut written = 0;
        for (key, old) in rows {
            let new = match f(old.clone()) {
                Some(new) => new,
                None => continue,
            };
            let mut changed = false;
            for (name, value) in new {
                if old.get(name.as_str()) != Some(&value) {
                    table.update_cell(key, &name, value)?;
                    changed = true;
                }
            }
            if changed {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Sets `column` to `value` in every matching row.
    pub fn set(&self, column: &str, value: impl Into<Value>) -> Result<usize> {
        let value = value.into();
        self.apply(|mut row| {
            row.insert(column.to_string(), value.clone());
            Some(row)
        })
    }
}

/// Removes rows.
pub struct Delete {
    plan: Plan,
}

impl Filtered for Delete {
    fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }
}

impl Delete {
    pub(crate) fn new(table: TableRef) -> Self {
        Self {
            plan: Plan::new(table, None),
        }
    }

    fn remove(&self, keys: Vec<RowKey>) -> Result<usize> {
        let table = self.plan.table()?;
        for key in &keys {
            table.remove_record(*key)?;
        }
        Ok(keys.len())
    }

    /// Keeps matching rows for which `keep` holds and removes the rest.
    pub fn filter<F>(&self, keep: F) -> Result<usize>
    where
        F: Fn(&NamedRow) -> bool,
    {
        let doomed = Cursor::new(self.plan.clone())
            .collect_full()?
            .into_iter()
            .filter(|(_, row)| !keep(row))
            .map(|(key, _)| key)
            .collect();
        self.remove(doomed)
    }

    /// Removes every matching row.
    pub fn execute(&self) -> Result<usize> {
        let doomed = Cursor::new(self.plan.clone())
            .collect_full()?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        self.remove(doomed)
    }
}

/// Adds rows.
pub struct Insert {
    table: TableRef,
}

impl Insert {
    pub(crate) fn new(table: TableRef) -> Self {
        Self { table }
    }

    pub fn record(&self, row: NamedRow) -> Result<RowKey> {
        upgrade(&self.table)?.add_record(row)
    }

    /// Adds each row in order, growing the schema as needed.
    pub fn append(&self, rows: impl IntoIterator<Item = NamedRow>) -> Result<Vec<RowKey>> {
        let table = upgrade(&self.table)?;
        rows.into_iter().map(|row| table.add_record(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::named_row;

    fn a_rows(values: &[i64]) -> Table {
        Table::from_rows(values.iter().map(|v| named_row([("a", *v)]))).unwrap()
    }

    fn a_of(row: &NamedRow) -> i64 {
        row.get("a").and_then(Value::as_i64).unwrap_or_default()
    }

    #[test]
    fn test_where_or_filters_lazily() {
        let table = a_rows(&[1, 4, 7]);
        let rows = table
            .select(&["a"])
            .unwrap()
            .where_(|r| a_of(r) > 4)
            .or(|r| a_of(r) < 4)
            .collect_rows()
            .unwrap();
        assert_eq!(rows, vec![named_row([("a", 1i64)]), named_row([("a", 7i64)])]);
    }

    #[test]
    fn test_and_intersects() {
        let table = a_rows(&[1, 4, 7]);
        let n = table
            .select_all()
            .where_(|r| a_of(r) > 1)
            .and(|r| a_of(r) < 7)
            .count()
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_limit_offset_count_matches() {
        let table = a_rows(&[0, 1, 2, 3, 4]);
        let mut select = table
            .select_all()
            .where_(|r| a_of(r) != 1)
            .limit(2, 1)
            .unwrap();
        let rows = select.collect_rows().unwrap();
        assert_eq!(rows, vec![named_row([("a", 2i64)]), named_row([("a", 3i64)])]);
    }

    #[test]
    fn test_negative_window_is_rejected() {
        let table = a_rows(&[1]);
        assert!(matches!(
            table.select_all().limit(-1, 0),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            table.select_all().offset(-3),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_cursor_protocol() {
        let table = a_rows(&[5, 6]);
        let mut select = table.select_all();
        assert!(!select.valid());
        select.rewind().unwrap();
        assert!(select.valid());
        assert_eq!(select.current_key(), Some(0));
        select.advance().unwrap();
        assert_eq!(select.current().unwrap(), Some(named_row([("a", 6i64)])));
        select.advance().unwrap();
        assert!(!select.valid());
        assert_eq!(select.current().unwrap(), None);

        // Restartable.
        select.rewind().unwrap();
        assert_eq!(select.current_key(), Some(0));
    }

    #[test]
    fn test_limit_zero() {
        let table = a_rows(&[1, 2]);
        assert_eq!(table.select_all().limit(0, 0).unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_key_between_replaces() {
        let table = a_rows(&[10, 11, 12, 13]);
        let rows = table
            .select_all()
            .where_key_between(0, 1)
            .where_key_between(2, 3)
            .collect_rows()
            .unwrap();
        assert_eq!(rows, vec![named_row([("a", 12i64)]), named_row([("a", 13i64)])]);
    }

    #[test]
    fn test_column_builders() {
        let table = Table::from_rows(vec![
            named_row([("name", Value::from("alpha")), ("n", Value::Int64(1))]),
            named_row([("name", Value::from("beta")), ("n", Value::Int64(2))]),
            named_row([("name", Value::from("gamma")), ("n", Value::Int64(3))]),
        ])
        .unwrap();
        let n = table
            .select_all()
            .where_column_equal("n", 2i64)
            .unwrap()
            .count()
            .unwrap();
        assert_eq!(n, 1);

        let rows = table
            .select(&["name"])
            .unwrap()
            .where_column("name", ColumnMatch::matches("^[ab]"))
            .unwrap()
            .collect_rows()
            .unwrap();
        assert_eq!(rows.len(), 2);

        let n = table
            .select_all()
            .where_column_between("n", 2i64, 3i64)
            .unwrap()
            .count()
            .unwrap();
        assert_eq!(n, 2);

        assert!(matches!(
            table.select_all().where_column_equal("missing", 1i64),
            Err(Error::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_projection_follows_schema() {
        let table = Table::from_rows(vec![named_row([("a", 1i64), ("b", 2)])]).unwrap();
        let mut select = table.select(&["b", "a", "b"]).unwrap();
        let row = select.first().unwrap().unwrap();
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["b", "a"]);

        table.rename_column("b", "bee").unwrap();
        let row = select.first().unwrap().unwrap();
        assert_eq!(row.get("bee"), Some(&Value::Int64(2)));

        table.remove_column("a").unwrap();
        assert!(select.first().unwrap_err().is_dead_reference());
    }

    #[test]
    fn test_statement_detects_dropped_table() {
        let table = a_rows(&[1]);
        let mut select = table.select_all();
        let update = table.update();
        drop(table);
        assert!(select.count().unwrap_err().is_dead_reference());
        assert!(update.set("a", 1i64).unwrap_err().is_dead_reference());
    }

    #[test]
    fn test_stats_respect_filter() {
        let table = a_rows(&[1, 2, 3, 4]);
        let mut select = table.select_all().where_(|r| a_of(r) % 2 == 0);
        assert_eq!(select.sum("a").unwrap(), Value::Int64(6));
        assert_eq!(select.min("a").unwrap(), Value::Int64(2));
        assert_eq!(select.max("a").unwrap(), Value::Int64(4));
        assert_eq!(select.count_values("a").unwrap(), Value::Int64(2));
        assert_eq!(select.stat("mean", "a").unwrap(), Value::Float64(3.0));
        assert_eq!(
            select.call_module("percentile", "a", &[Value::Int64(100)]).unwrap(),
            Value::Int64(4)
        );
        assert!(matches!(select.sum("zzz"), Err(Error::UnknownColumn { .. })));
    }

    #[test]
    fn test_update_skips_unchanged() {
        let table = a_rows(&[1, 2, 3]);
        let written = table
            .update()
            .where_(|r| a_of(r) >= 2)
            .apply(|mut row| {
                if a_of(&row) == 3 {
                    return None;
                }
                row.insert("a".into(), Value::Int64(20));
                Some(row)
            })
            .unwrap();
        assert_eq!(written, 1);

        let same = table.update().apply(Some).unwrap();
        assert_eq!(same, 0);

        assert_eq!(table.update().set("a", 20i64).unwrap(), 2);
        assert_eq!(table.select_all().sum("a").unwrap(), Value::Int64(60));
    }

    #[test]
    fn test_delete_filter_and_execute() {
        let table = a_rows(&[1, 2, 3, 4, 5]);
        let removed = table.delete().filter(|r| a_of(r) % 2 == 1).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(table.count_rows().unwrap(), 3);

        let removed = table.delete().where_(|r| a_of(r) > 3).execute().unwrap();
        assert_eq!(removed, 1);
        assert_eq!(table.select_all().sum("a").unwrap(), Value::Int64(4));
    }

    #[test]
    fn test_insert() {
        let table = a_rows(&[1]);
        let insert = table.insert();
        let key = insert.record(named_row([("b", 2i64)])).unwrap();
        assert_eq!(key, 1);
        let keys = insert
            .append(vec![named_row([("c", 3i64)]), named_row([("a", 4i64)])])
            .unwrap();
        assert_eq!(keys, vec![2, 3]);
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_records_and_to_table() {
        let table = a_rows(&[1, 2, 3]);
        let records = table
            .select_all()
            .where_(|r| a_of(r) > 1)
            .records()
            .unwrap();
        assert_eq!(records.iter().map(|r| r.key()).collect::<Vec<_>>(), vec![1, 2]);

        let copy = table.select(&["a"]).unwrap().limit(1, 2).unwrap().to_table().unwrap();
        assert_eq!(copy.to_rows().unwrap(), vec![named_row([("a", 3i64)])]);
    }

    #[test]
    fn test_iterating_twice_restarts() {
        let table = a_rows(&[1, 2]);
        let mut select = table.select_all();
        let first: Vec<_> = select.iter().collect::<Result<_>>().unwrap();
        let mut second = Vec::new();
        for row in &mut select {
            second.push(row.unwrap());
        }
        assert_eq!(first, second);
    }
}
