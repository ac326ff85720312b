//! Wiring of every dashboard table over one backend.
//!
//! # Responsibility
//! - Load the reference tables, then open the editable tables with choice
//!   lists taken from them.
//! - Hand out one `TableService` per editable table.
//!
//! # Invariants
//! - Each table has exactly one store, owned here; nothing is global.
//! - Reference tables are read-only for the dashboard's lifetime.

use crate::config::SheetNames;
use crate::error::DashResult;
use crate::model::catalog;
use crate::model::schema::TableSchema;
use crate::model::table::Table;
use crate::service::table_service::TableService;
use crate::stats::distinct_values;
use crate::storage::StorageBackend;
use crate::store::RecordStore;
use crate::xlsx::{export_workbook, XlsxResult};
use log::info;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Tables that accept add/edit/delete intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableTable {
    Calendar,
    CountryCalls,
}

impl EditableTable {
    /// Catalog name, independent of the configured sheet name.
    pub fn key(self) -> &'static str {
        match self {
            Self::Calendar => catalog::CALENDAR,
            Self::CountryCalls => catalog::COUNTRY_CALLS,
        }
    }

    /// Field naming an entry in notices.
    pub fn subject_field(self) -> &'static str {
        match self {
            Self::Calendar => "advisor",
            Self::CountryCalls => "country",
        }
    }
}

impl FromStr for EditableTable {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "calendar" => Ok(Self::Calendar),
            "country_calls" | "calls" => Ok(Self::CountryCalls),
            other => Err(format!(
                "unknown table `{other}`; expected calendar|country_calls"
            )),
        }
    }
}

impl Display for EditableTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Read-only lookup tables.
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    pub advisors: Table,
    pub countries: Table,
    pub types: Table,
    pub risk_matrix: Table,
    pub programmes: Table,
}

pub struct Dashboard {
    backend: Arc<dyn StorageBackend>,
    reference: ReferenceTables,
    calendar: TableService,
    country_calls: TableService,
}

impl Dashboard {
    /// Loads every table from `backend`.
    ///
    /// # Errors
    /// - `DashError::Load` when any table fails to load.
    pub fn open(backend: Arc<dyn StorageBackend>, sheets: &SheetNames) -> DashResult<Self> {
        let load = |schema: TableSchema, name: &str| -> DashResult<Table> {
            let store = RecordStore::open(Arc::clone(&backend), named(schema, name))?;
            Ok(store.get().clone())
        };
        let reference = ReferenceTables {
            advisors: load(catalog::advisors_schema(), &sheets.advisors)?,
            countries: load(catalog::countries_schema(), &sheets.countries)?,
            types: load(catalog::types_schema(), &sheets.types)?,
            risk_matrix: load(catalog::risk_matrix_schema(), &sheets.risk_matrix)?,
            programmes: load(catalog::programmes_schema(), &sheets.programmes)?,
        };

        let calendar_schema = catalog::calendar_schema(
            distinct_values(&reference.advisors, "short_name"),
            distinct_values(&reference.types, "type"),
        );
        let calls_schema =
            catalog::country_calls_schema(distinct_values(&reference.countries, "CIA Name"));
        let calendar = TableService::new(RecordStore::open(
            Arc::clone(&backend),
            named(calendar_schema, &sheets.calendar),
        )?);
        let country_calls = TableService::new(RecordStore::open(
            Arc::clone(&backend),
            named(calls_schema, &sheets.country_calls),
        )?);

        info!(
            "event=dashboard_open module=dashboard status=ok backend={} calendar_rows={} call_rows={}",
            backend.backend_id(),
            calendar.table().len(),
            country_calls.table().len()
        );
        Ok(Self {
            backend,
            reference,
            calendar,
            country_calls,
        })
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    pub fn reference(&self) -> &ReferenceTables {
        &self.reference
    }

    pub fn service(&self, table: EditableTable) -> &TableService {
        match table {
            EditableTable::Calendar => &self.calendar,
            EditableTable::CountryCalls => &self.country_calls,
        }
    }

    pub fn service_mut(&mut self, table: EditableTable) -> &mut TableService {
        match table {
            EditableTable::Calendar => &mut self.calendar,
            EditableTable::CountryCalls => &mut self.country_calls,
        }
    }

    /// Every sheet of the backend as `.xlsx` bytes.
    pub fn export(&self) -> XlsxResult<Vec<u8>> {
        export_workbook(self.backend())
    }
}

fn named(mut schema: TableSchema, sheet: &str) -> TableSchema {
    schema.name = sheet.to_string();
    schema
}
