//! Local workbook backend on SQLite.
//!
//! # Responsibility
//! - Store sheets as sparse cell grids in one SQLite file.
//! - Apply workbook layout migrations before any sheet access.
//!
//! # Invariants
//! - Layout version is tracked via `PRAGMA user_version`.
//! - A sheet write replaces all cells of that sheet in one transaction.
//! - `sheets.row_count` preserves trailing rows whose cells are all blank.

use super::{SheetRows, StorageBackend, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub mod migrations;
mod open;

pub use open::{open_workbook_db, open_workbook_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "workbook layout version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Sheet store persisted in a local SQLite file.
pub struct SqliteWorkbook {
    conn: Connection,
}

impl SqliteWorkbook {
    /// Opens or creates the workbook file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: open_workbook_db(path)?,
        })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: open_workbook_db_in_memory()?,
        })
    }

    /// Underlying connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl StorageBackend for SqliteWorkbook {
    fn backend_id(&self) -> &'static str {
        "sqlite"
    }

    fn read_table(&self, name: &str) -> StorageResult<SheetRows> {
        let row_count: Option<i64> = self
            .conn
            .query_row(
                "SELECT row_count FROM sheets WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        let Some(row_count) = row_count else {
            return Ok(Vec::new());
        };

        let mut rows: SheetRows = vec![Vec::new(); usize::try_from(row_count).unwrap_or(0)];
        let mut stmt = self.conn.prepare(
            "SELECT row_idx, col_idx, value
             FROM sheet_cells
             WHERE sheet = ?1
             ORDER BY row_idx ASC, col_idx ASC;",
        )?;
        let mut cells = stmt.query([name])?;
        while let Some(cell) = cells.next()? {
            let row_idx: i64 = cell.get("row_idx")?;
            let col_idx: i64 = cell.get("col_idx")?;
            let (Ok(row_idx), Ok(col_idx)) = (usize::try_from(row_idx), usize::try_from(col_idx))
            else {
                continue;
            };
            let Some(row) = rows.get_mut(row_idx) else {
                continue;
            };
            if row.len() <= col_idx {
                row.resize(col_idx + 1, String::new());
            }
            row[col_idx] = cell.get("value")?;
        }

        Ok(rows)
    }

    fn write_table(&self, name: &str, rows: &SheetRows) -> StorageResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_sheet(&tx, name, rows.len())?;
        tx.execute("DELETE FROM sheet_cells WHERE sheet = ?1;", [name])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO sheet_cells (sheet, row_idx, col_idx, value)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for (row_idx, row) in rows.iter().enumerate() {
                for (col_idx, value) in row.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    insert.execute(params![name, row_idx as i64, col_idx as i64, value])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn clear_table(&self, name: &str) -> StorageResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_sheet(&tx, name, 0)?;
        tx.execute("DELETE FROM sheet_cells WHERE sheet = ?1;", [name])?;
        tx.commit()?;
        Ok(())
    }

    fn table_names(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sheets ORDER BY rowid ASC;")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

fn upsert_sheet(conn: &Connection, name: &str, row_count: usize) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO sheets (name, row_count) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET
            row_count = excluded.row_count,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![name, row_count as i64],
    )?;
    Ok(())
}
