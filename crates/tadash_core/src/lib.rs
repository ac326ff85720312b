//! Core of the TA dashboard: typed tables over spreadsheet-like storage.
//! This crate is the single source of truth for record identity, schema
//! validation and write-back.

pub mod config;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod stats;
pub mod storage;
pub mod store;
pub mod view;
pub mod xlsx;

pub use config::{BackendConfig, ConfigError, DashboardConfig, LoggingConfig, SheetNames};
pub use dashboard::{Dashboard, EditableTable, ReferenceTables};
pub use editor::{add_record, delete_records, fields, update_record, FieldValues};
pub use error::{DashError, DashResult, LoadError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::schema::{ColumnDef, ColumnKind, TableSchema};
pub use model::table::{LoadReport, Record, RecordId, Table};
pub use model::value::CellValue;
pub use service::notice::{Notice, NoticeLevel};
pub use service::table_service::{Intent, Outcome, TableService};
pub use storage::{
    MemoryBackend, SheetRows, SheetsBackend, SheetsSettings, SqliteWorkbook, StorageBackend,
    StorageError, StorageResult,
};
pub use store::RecordStore;
pub use view::{FilterSpec, FilteredView, Selection, SortSpec, View};
pub use xlsx::{export_table, export_workbook, import_workbook, WorkbookError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
