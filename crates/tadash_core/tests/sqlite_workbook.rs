use rusqlite::Connection;
use std::sync::Arc;
use tadash_core::model::catalog::calendar_schema;
use tadash_core::storage::sqlite::migrations::latest_version;
use tadash_core::storage::sqlite::{open_workbook_db, open_workbook_db_in_memory, DbError};
use tadash_core::{fields, RecordStore, SqliteWorkbook, StorageBackend};

fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

#[test]
fn in_memory_workbook_applies_all_migrations() {
    let conn = open_workbook_db_in_memory().unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "sheets");
    assert_table_exists(&conn, "sheet_cells");
}

#[test]
fn opening_same_workbook_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tadash.db");

    let first = open_workbook_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_workbook_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
}

#[test]
fn opening_workbook_with_newer_layout_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_workbook_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn sheets_round_trip_with_blank_cells_and_rows() {
    let workbook = SqliteWorkbook::open_in_memory().unwrap();
    let written = rows(&[
        &["id", "advisor", "remarks"],
        &["1", "JD", ""],
        &["", "", ""],
        &["2", "", "x"],
    ]);
    workbook.write_table("calendar", &written).unwrap();

    let read = workbook.read_table("calendar").unwrap();
    assert_eq!(read.len(), 4);
    assert_eq!(read[0], written[0]);
    assert_eq!(read[1], vec!["1".to_string(), "JD".to_string()]);
    assert!(read[2].is_empty());
    assert_eq!(read[3], written[3]);
}

#[test]
fn write_replaces_previous_content() {
    let workbook = SqliteWorkbook::open_in_memory().unwrap();
    workbook
        .write_table("types", &rows(&[&["type"], &["Leave"], &["Mission"]]))
        .unwrap();
    workbook
        .write_table("types", &rows(&[&["type"], &["Training"]]))
        .unwrap();
    assert_eq!(
        workbook.read_table("types").unwrap(),
        rows(&[&["type"], &["Training"]])
    );
}

#[test]
fn clear_keeps_the_sheet_listed() {
    let workbook = SqliteWorkbook::open_in_memory().unwrap();
    workbook.write_table("b", &rows(&[&["x"]])).unwrap();
    workbook.write_table("a", &rows(&[&["y"]])).unwrap();
    workbook.clear_table("b").unwrap();

    assert_eq!(
        workbook.table_names().unwrap(),
        vec!["b".to_string(), "a".to_string()]
    );
    assert!(workbook.read_table("b").unwrap().is_empty());
    assert!(workbook.read_table("missing").unwrap().is_empty());
}

#[test]
fn store_changes_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dash.db");
    let schema = calendar_schema(vec!["JD".to_string()], vec!["Leave".to_string()]);

    {
        let backend = Arc::new(SqliteWorkbook::open(&path).unwrap());
        let mut store = RecordStore::open(backend, schema.clone()).unwrap();
        let (next, _) = tadash_core::add_record(
            store.get(),
            &fields([
                ("advisor", "JD"),
                ("type", "Leave"),
                ("start_date", "29-02-2024"),
                ("end_date", "01-03-2024"),
            ]),
        )
        .unwrap();
        store.commit(next).unwrap();
    }

    let backend = Arc::new(SqliteWorkbook::open(&path).unwrap());
    let store = RecordStore::open(backend, schema).unwrap();
    assert_eq!(store.get().len(), 1);
    assert_eq!(store.backend_id(), "sqlite");
    assert_eq!(
        store.get().records()[0].get("start_date").to_string(),
        "29-02-2024"
    );
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table_name}` to exist");
}
