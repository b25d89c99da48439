//! Tables stored in SQLite and SQL run over tables.

use rusqlite::Connection;
use std::rc::Rc;
use tabula_core::{named_row, Error, NamedRow, ObjectRef, Value};
use tabula_query::prelude::*;
use tabula_sql::{BridgeOptions, SqlBridge, SqlError, SqliteDriver};

fn sqlite_table(conn: &Rc<Connection>, name: &str, rows: Vec<NamedRow>) -> Table {
    let driver = SqliteDriver::open(conn.clone(), name).unwrap();
    Table::new(rows, Some(Box::new(driver))).unwrap()
}

fn staged_tables(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_temp_master WHERE type = 'table'",
        [],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn test_table_over_sqlite_driver() {
    let conn = Rc::new(Connection::open_in_memory().unwrap());
    let table = sqlite_table(
        &conn,
        "people",
        vec![
            named_row([("name", Value::from("ann")), ("age", Value::Int64(31))]),
            named_row([("name", Value::from("bob"))]),
        ],
    );
    assert_eq!(table.driver_name(), "sqlite");
    assert_eq!(table.count_rows().unwrap(), 2);

    let ages = table.column("age").unwrap();
    assert_eq!(ages.values().unwrap(), vec![Value::Int64(31), Value::Null]);

    let key = table.add_record(named_row([("name", "cy"), ("age", "40")])).unwrap();
    table.update_cell(key, "age", 41i64).unwrap();
    assert_eq!(table.get_row(key, true).unwrap()["age"], Value::Int64(41));

    let old = table
        .select(&["name"])
        .unwrap()
        .where_(|r| r["age"] > Value::Int64(35))
        .collect_rows()
        .unwrap();
    assert_eq!(old, vec![named_row([("name", "cy")])]);

    let stored: i64 = conn
        .query_row("SELECT COUNT(*) FROM \"people\"", [], |r| r.get(0))
        .unwrap();
    assert_eq!(stored, 3);
}

#[test]
fn test_deleted_keys_are_not_reused() {
    let conn = Rc::new(Connection::open_in_memory().unwrap());
    let table = sqlite_table(&conn, "t", vec![named_row([("a", 1i64)])]);
    let first = table.insert().record(named_row([("a", 2i64)])).unwrap();
    table.delete_record(first).unwrap();
    table.delete_record(first).unwrap();
    let second = table.insert().record(named_row([("a", 3i64)])).unwrap();
    assert!(second > first);
    assert!(!table.record_exists(first).unwrap());
}

#[test]
fn test_sort_is_unsupported() {
    let conn = Rc::new(Connection::open_in_memory().unwrap());
    let table = sqlite_table(&conn, "t", vec![named_row([("a", 2i64)]), named_row([("a", 1i64)])]);
    assert!(matches!(
        table.sort_by_column("a", false),
        Err(Error::UnsupportedCapability { .. })
    ));
}

#[test]
fn test_clone_moves_into_memory() {
    let conn = Rc::new(Connection::open_in_memory().unwrap());
    let table = sqlite_table(&conn, "t", vec![named_row([("a", 2i64)]), named_row([("a", 1i64)])]);
    let copy = table.try_clone().unwrap();
    assert_eq!(copy.driver_name(), "memory");
    assert!(copy == table);

    copy.sort_by_column("a", false).unwrap();
    assert_eq!(copy.column("a").unwrap().values().unwrap(), vec![Value::Int64(1), Value::Int64(2)]);
    assert_eq!(table.column("a").unwrap().values().unwrap(), vec![Value::Int64(2), Value::Int64(1)]);
}

#[test]
fn test_reopen_adopts_existing_rows() {
    let conn = Rc::new(Connection::open_in_memory().unwrap());
    sqlite_table(&conn, "t", vec![named_row([("a", 1i64), ("b", 2i64)])]);

    let driver = SqliteDriver::open(conn.clone(), "t").unwrap();
    let reopened = Table::builder()
        .driver(Box::new(driver))
        .column("a")
        .column("b")
        .build()
        .unwrap();
    assert_eq!(reopened.to_rows().unwrap(), vec![named_row([("a", 1i64), ("b", 2i64)])]);
}

#[test]
fn test_bridge_group_query() {
    let table = Table::from_rows(vec![
        named_row([("g", Value::from("x")), ("v", Value::Int64(1))]),
        named_row([("g", Value::from("y")), ("v", Value::Int64(2))]),
        named_row([("g", Value::from("x")), ("v", Value::Int64(3))]),
        named_row([("g", Value::from("z"))]),
    ])
    .unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let result = SqlBridge::query(
        &conn,
        &table,
        "SELECT g, SUM(v) AS total FROM staging GROUP BY g ORDER BY g",
        &BridgeOptions::default().batch_size(2),
    )
    .unwrap();

    assert_eq!(result.column_names(), vec!["g", "total"]);
    assert_eq!(
        result.to_rows().unwrap(),
        vec![
            named_row([("g", Value::from("x")), ("total", Value::Int64(4))]),
            named_row([("g", Value::from("y")), ("total", Value::Int64(2))]),
            named_row([("g", Value::from("z")), ("total", Value::Null)]),
        ]
    );
    assert_eq!(result.registry().names(), table.registry().names());
    assert_eq!(staged_tables(&conn), 0);
}

#[test]
fn test_bridge_empty_result_keeps_columns() {
    let table = Table::from_rows(vec![named_row([("a", 1i64)])]).unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let options = BridgeOptions::default().staging_table("input");
    let result = SqlBridge::query(&conn, &table, "SELECT a FROM input WHERE a > 5", &options).unwrap();
    assert_eq!(result.column_names(), vec!["a"]);
    assert_eq!(result.count_rows().unwrap(), 0);
}

#[test]
fn test_bridge_rolls_back_on_bad_sql() {
    let table = Table::from_rows((0..10i64).map(|v| named_row([("a", v)]))).unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let err = SqlBridge::query(&conn, &table, "SELECT nope FROM staging", &BridgeOptions::default());
    assert!(matches!(err, Err(SqlError::Sqlite(_))));
    assert_eq!(staged_tables(&conn), 0);
    assert!(conn.is_autocommit());
}

#[test]
fn test_bridge_rolls_back_on_unsupported_value() {
    let table = Table::from_rows(vec![
        named_row([("a", Value::Int64(1))]),
        named_row([("a", Value::Object(ObjectRef::new(7u8)))]),
    ])
    .unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let err = SqlBridge::query(
        &conn,
        &table,
        "SELECT * FROM staging",
        &BridgeOptions::default().batch_size(1),
    );
    assert!(matches!(err, Err(SqlError::UnsupportedValue(_))));
    assert_eq!(staged_tables(&conn), 0);
}

#[test]
fn test_bridge_rejects_tables_without_columns() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqlBridge::query(&conn, &Table::empty(), "SELECT 1", &BridgeOptions::default());
    assert!(matches!(err, Err(SqlError::NoColumns)));
}

#[test]
fn test_bridge_rejects_bad_staging_name() {
    let table = Table::from_rows(vec![named_row([("a", 1i64)])]).unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let options = BridgeOptions::default().staging_table("x y");
    assert!(matches!(
        SqlBridge::query(&conn, &table, "SELECT 1", &options),
        Err(SqlError::InvalidIdentifier(_))
    ));
}
