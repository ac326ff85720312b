//! Error taxonomy for table operations.
//!
//! # Responsibility
//! - Give every failure of load/edit/persist a typed variant.
//! - Keep user-facing wording out of this module; see `service::notice`.
//!
//! # Invariants
//! - `Validation`, `NotFound` and `NoSelection` are raised before any state
//!   is mutated.
//! - `Load` never accompanies a partially converted table.

use crate::model::schema::HeaderError;
use crate::model::table::RecordId;
use crate::storage::StorageError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DashResult<T> = Result<T, DashError>;

/// Reasons a table could not be loaded from its backing store.
#[derive(Debug)]
pub enum LoadError {
    /// Backing store unreachable or returned an unusable payload.
    Storage(StorageError),
    /// Stored header does not match the schema.
    Header { table: String, error: HeaderError },
    /// A cell failed type coercion. `row` is the 1-based sheet row.
    InvalidValue {
        table: String,
        row: usize,
        column: String,
        reason: String,
    },
    /// An `id` cell is not a positive integer.
    InvalidId {
        table: String,
        row: usize,
        value: String,
    },
    DuplicateId { table: String, id: RecordId },
    /// Stored schema version is newer than this binary understands.
    UnsupportedSchemaVersion {
        table: String,
        stored: u32,
        supported: u32,
    },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Header { table, error } => write!(f, "table `{table}`: {error}"),
            Self::InvalidValue {
                table,
                row,
                column,
                reason,
            } => write!(f, "table `{table}` row {row} column `{column}`: {reason}"),
            Self::InvalidId { table, row, value } => {
                write!(f, "table `{table}` row {row}: invalid id `{value}`")
            }
            Self::DuplicateId { table, id } => write!(f, "table `{table}`: duplicate id {id}"),
            Self::UnsupportedSchemaVersion {
                table,
                stored,
                supported,
            } => write!(
                f,
                "table `{table}` schema version {stored} is newer than supported {supported}"
            ),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for LoadError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Error for every record-store, view and editor operation.
#[derive(Debug)]
pub enum DashError {
    Load(LoadError),
    /// A field failed schema validation or coercion.
    Validation { field: String, reason: String },
    /// The id no longer exists in the table.
    NotFound(RecordId),
    /// A mutating operation was invoked without any selected record.
    NoSelection,
    /// The backing writer rejected the payload.
    Persist { table: String, source: StorageError },
}

impl DashError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Load(_) => "load_failed",
            Self::Validation { .. } => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::NoSelection => "no_selection",
            Self::Persist { .. } => "persist_failed",
        }
    }
}

impl Display for DashError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "load failed: {err}"),
            Self::Validation { field, reason } => write!(f, "invalid `{field}`: {reason}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::NoSelection => write!(f, "no record selected"),
            Self::Persist { table, source } => {
                write!(f, "failed to save table `{table}`: {source}")
            }
        }
    }
}

impl Error for DashError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::Persist { source, .. } => Some(source),
            Self::Validation { .. } | Self::NotFound(_) | Self::NoSelection => None,
        }
    }
}

impl From<LoadError> for DashError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}
