//! Backing storage for tables.
//!
//! # Responsibility
//! - Define the narrow sheet contract the record store depends on.
//! - Provide local (SQLite workbook), remote (spreadsheet service) and
//!   in-memory implementations.
//!
//! # Invariants
//! - Cells cross this boundary as display text; typing happens in `model`.
//! - `write_table` replaces the whole sheet content atomically where the
//!   backend allows it.
//! - Reading a sheet that does not exist yields no rows, not an error.

use crate::storage::sqlite::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sheets;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sheets::{SheetsBackend, SheetsSettings};
pub use sqlite::SqliteWorkbook;

/// Raw sheet content: first row is the header.
pub type SheetRows = Vec<Vec<String>>;

pub type StorageResult<T> = Result<T, StorageError>;

/// Transport/backend failures.
#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    Http(reqwest::Error),
    /// Remote service answered with a non-success status.
    Remote { status: u16, message: String },
    /// Credentials are not configured for a remote backend.
    MissingCredentials(String),
    /// Backend is offline or refused the operation.
    Unavailable(String),
    /// Backend returned data this crate cannot interpret.
    InvalidPayload(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Http(err) => write!(f, "spreadsheet request failed: {err}"),
            Self::Remote { status, message } => {
                write!(f, "spreadsheet service returned {status}: {message}")
            }
            Self::MissingCredentials(message) => write!(f, "missing credentials: {message}"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
            Self::InvalidPayload(message) => write!(f, "invalid storage payload: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Http(err) => Some(err),
            Self::Remote { .. }
            | Self::MissingCredentials(_)
            | Self::Unavailable(_)
            | Self::InvalidPayload(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Sheet-level storage contract.
pub trait StorageBackend {
    /// Short backend name for log events (`sqlite|sheets|memory`).
    fn backend_id(&self) -> &'static str;
    /// Reads every row of one sheet, header first.
    fn read_table(&self, name: &str) -> StorageResult<SheetRows>;
    /// Replaces the content of one sheet, creating it when absent.
    fn write_table(&self, name: &str, rows: &SheetRows) -> StorageResult<()>;
    /// Removes every row of one sheet but keeps the sheet.
    fn clear_table(&self, name: &str) -> StorageResult<()>;
    /// Lists sheet names in workbook order.
    fn table_names(&self) -> StorageResult<Vec<String>>;
}
