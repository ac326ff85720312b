//! Authoritative table holder with write-back persistence.
//!
//! # Responsibility
//! - Load one table from its backing store and keep the current snapshot.
//! - Persist mutated snapshots and notify subscribers on change.
//!
//! # Invariants
//! - The snapshot is only replaced by a table with the store's schema.
//! - `commit` persists before it swaps the snapshot; a failed persist leaves
//!   the previous snapshot in place. There is no automatic retry.
//! - The stored schema version (sheet `_schema`) is never newer than the
//!   store's schema version after a successful load.

use crate::error::{DashError, DashResult, LoadError};
use crate::model::schema::TableSchema;
use crate::model::table::{LoadReport, Table};
use crate::storage::{SheetRows, StorageBackend};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Sheet holding `(table, version)` pairs for every persisted table.
pub const SCHEMA_SHEET: &str = "_schema";

type Listener = Box<dyn Fn(&Table)>;

/// Owner of one table and its write-back path.
pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    schema: TableSchema,
    table: Table,
    stored_version: Option<u32>,
    listeners: Vec<Listener>,
}

impl RecordStore {
    /// Creates a store by loading `schema.name` from `backend`.
    pub fn open(backend: Arc<dyn StorageBackend>, schema: TableSchema) -> DashResult<Self> {
        let mut store = Self {
            backend,
            table: Table::new(schema.clone()),
            schema,
            stored_version: None,
            listeners: Vec::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Reads and converts the table from storage without touching the
    /// snapshot.
    ///
    /// # Errors
    /// - `DashError::Load` when storage is unreachable, the header does not
    ///   match the schema, a cell fails coercion, or the stored schema
    ///   version is newer than supported.
    pub fn load(&self) -> DashResult<Table> {
        self.load_with_version().map(|(table, _)| table)
    }

    /// Reloads from storage and replaces the snapshot.
    pub fn reload(&mut self) -> DashResult<()> {
        let (table, stored_version) = self.load_with_version()?;
        self.stored_version = stored_version;
        self.replace(table);
        Ok(())
    }

    /// Current in-memory snapshot.
    pub fn get(&self) -> &Table {
        &self.table
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn backend_id(&self) -> &'static str {
        self.backend.backend_id()
    }

    /// Replaces the snapshot without persisting and notifies subscribers.
    ///
    /// # Errors
    /// - `DashError::Validation` when `table` belongs to another schema.
    pub fn set(&mut self, table: Table) -> DashResult<()> {
        self.ensure_schema(&table)?;
        self.replace(table);
        Ok(())
    }

    /// Writes `table` to storage.
    ///
    /// # Errors
    /// - `DashError::Persist` when the backend rejects the write.
    pub fn persist(&mut self, table: &Table) -> DashResult<()> {
        self.ensure_schema(table)?;
        let started_at = Instant::now();
        let name = self.schema.name.clone();

        // Version first: a failed data write then leaves the stored rows as
        // they were.
        let result = self
            .write_schema_version()
            .and_then(|()| self.backend.write_table(&name, &table.to_rows()));

        match result {
            Ok(()) => {
                info!(
                    "event=table_persist module=store status=ok backend={} table={} rows={} revision={} duration_ms={}",
                    self.backend.backend_id(),
                    name,
                    table.len(),
                    table.revision(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    "event=table_persist module=store status=error backend={} table={} duration_ms={} error={}",
                    self.backend.backend_id(),
                    name,
                    started_at.elapsed().as_millis(),
                    source
                );
                Err(DashError::Persist {
                    table: name,
                    source,
                })
            }
        }
    }

    /// Persists `table`, then makes it the snapshot.
    ///
    /// On failure the snapshot keeps its previous value.
    pub fn commit(&mut self, table: Table) -> DashResult<()> {
        self.persist(&table)?;
        self.replace(table);
        Ok(())
    }

    /// Registers a callback run after every snapshot change.
    pub fn subscribe(&mut self, listener: impl Fn(&Table) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn replace(&mut self, table: Table) {
        self.table = table;
        for listener in &self.listeners {
            listener(&self.table);
        }
    }

    fn ensure_schema(&self, table: &Table) -> DashResult<()> {
        if table.schema() != &self.schema {
            return Err(DashError::validation(
                "schema",
                format!(
                    "table `{}` does not match store `{}`",
                    table.schema().name,
                    self.schema.name
                ),
            ));
        }
        Ok(())
    }

    fn load_with_version(&self) -> DashResult<(Table, Option<u32>)> {
        let started_at = Instant::now();
        let name = self.schema.name.as_str();
        let backend_id = self.backend.backend_id();
        info!("event=table_load module=store status=start backend={backend_id} table={name}");

        let result = self.read_and_convert();
        match &result {
            Ok((table, _, report)) => {
                info!(
                    "event=table_load module=store status=ok backend={backend_id} table={name} rows={} duration_ms={}",
                    table.len(),
                    started_at.elapsed().as_millis()
                );
                log_normalization(name, report);
            }
            Err(err) => error!(
                "event=table_load module=store status=error backend={backend_id} table={name} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }

        result
            .map(|(table, version, _)| (table, version))
            .map_err(DashError::from)
    }

    fn read_and_convert(&self) -> Result<(Table, Option<u32>, LoadReport), LoadError> {
        let stored_version = self.read_schema_version()?;
        if let Some(stored) = stored_version {
            if stored > self.schema.version {
                return Err(LoadError::UnsupportedSchemaVersion {
                    table: self.schema.name.clone(),
                    stored,
                    supported: self.schema.version,
                });
            }
        }

        let rows = self.backend.read_table(&self.schema.name)?;
        let (table, report) = Table::from_rows(self.schema.clone(), &rows)?;
        Ok((table, stored_version, report))
    }

    fn read_schema_version(&self) -> Result<Option<u32>, LoadError> {
        if !self
            .backend
            .table_names()?
            .iter()
            .any(|name| name == SCHEMA_SHEET)
        {
            return Ok(None);
        }
        let rows = self.backend.read_table(SCHEMA_SHEET)?;
        Ok(schema_version_of(&rows, &self.schema.name))
    }

    fn write_schema_version(&mut self) -> crate::storage::StorageResult<()> {
        if self.stored_version == Some(self.schema.version) {
            return Ok(());
        }

        let mut rows = if self
            .backend
            .table_names()?
            .iter()
            .any(|name| name == SCHEMA_SHEET)
        {
            self.backend.read_table(SCHEMA_SHEET)?
        } else {
            Vec::new()
        };
        if rows.is_empty() {
            rows.push(vec!["table".to_string(), "version".to_string()]);
        }
        let version = self.schema.version.to_string();
        match rows
            .iter_mut()
            .skip(1)
            .find(|row| row.first().map(String::as_str) == Some(self.schema.name.as_str()))
        {
            Some(row) => {
                row.resize(2, String::new());
                row[1] = version;
            }
            None => rows.push(vec![self.schema.name.clone(), version]),
        }

        self.backend.write_table(SCHEMA_SHEET, &rows)?;
        info!(
            "event=schema_version_write module=store status=ok table={} previous={:?} version={}",
            self.schema.name, self.stored_version, self.schema.version
        );
        self.stored_version = Some(self.schema.version);
        Ok(())
    }
}

fn schema_version_of(rows: &SheetRows, table: &str) -> Option<u32> {
    rows.iter()
        .skip(1)
        .find(|row| row.first().map(|cell| cell.trim()) == Some(table))
        .and_then(|row| row.get(1))
        .and_then(|cell| cell.trim().parse::<u32>().ok())
}

fn log_normalization(table: &str, report: &LoadReport) {
    if report.is_clean() {
        return;
    }
    warn!(
        "event=table_normalize module=store status=ok table={table} assigned_ids={} missing_optional={:?} dropped={:?} skipped_blank_rows={}",
        report.assigned_ids, report.missing_optional, report.dropped, report.skipped_blank_rows
    );
}

#[cfg(test)]
mod tests {
    use super::schema_version_of;

    #[test]
    fn schema_version_of_finds_table_row() {
        let rows = vec![
            vec!["table".to_string(), "version".to_string()],
            vec!["calendar".to_string(), "2".to_string()],
        ];
        assert_eq!(schema_version_of(&rows, "calendar"), Some(2));
        assert_eq!(schema_version_of(&rows, "country_calls"), None);
    }
}
