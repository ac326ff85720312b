//! Records, stable ids and the in-memory table.
//!
//! # Responsibility
//! - Hold one logical dataset as an ordered list of fixed-schema records.
//! - Convert between typed tables and raw sheet rows.
//!
//! # Invariants
//! - Every record carries every schema column, blank or not.
//! - `RecordId`s are unique within a table and never reused: `next_id` only
//!   grows, even after deletes.
//! - `revision` increments on every mutation of the record list.
//! - Loading never yields a partially converted table.

use crate::error::LoadError;
use crate::model::schema::{HeaderError, TableSchema};
use crate::model::value::CellValue;
use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static EMPTY: CellValue = CellValue::Empty;

/// Stable record identifier assigned at creation.
///
/// There is deliberately no conversion from a view position or `usize`;
/// positions must be resolved through a `View`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

/// Largest id a spreadsheet number cell holds exactly (2^53).
pub const MAX_RECORD_ID: u64 = 1 << 53;

impl RecordId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = String;

    /// Parses a stored id cell. Spreadsheets may render integers as `3.0`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let parsed = trimmed.parse::<u64>().ok().or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|number| {
                    number.fract() == 0.0
                        && *number >= 1.0
                        && *number <= MAX_RECORD_ID as f64
                })
                .map(|number| number as u64)
        });
        match parsed {
            Some(id) if (1..=MAX_RECORD_ID).contains(&id) => Ok(Self(id)),
            _ => Err(format!(
                "`{trimmed}` is not an integer id between 1 and {MAX_RECORD_ID}"
            )),
        }
    }
}

/// One row of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    pub(crate) values: BTreeMap<String, CellValue>,
}

impl Record {
    pub(crate) fn new(id: RecordId, values: BTreeMap<String, CellValue>) -> Self {
        Self { id, values }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the field value, or `Empty` for unknown fields.
    pub fn get(&self, field: &str) -> &CellValue {
        self.values.get(field).unwrap_or(&EMPTY)
    }

    pub fn values(&self) -> &BTreeMap<String, CellValue> {
        &self.values
    }
}

/// Normalization steps applied while loading a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows that had no stored id and received a fresh one.
    pub assigned_ids: usize,
    /// Optional schema columns absent from storage.
    pub missing_optional: Vec<String>,
    /// Unknown stored columns dropped by a lenient schema.
    pub dropped: Vec<String>,
    /// Fully blank rows skipped.
    pub skipped_blank_rows: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.assigned_ids == 0
            && self.missing_optional.is_empty()
            && self.dropped.is_empty()
            && self.skipped_blank_rows == 0
    }
}

/// Authoritative in-memory record set for one logical dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: TableSchema,
    pub(crate) records: Vec<Record>,
    pub(crate) next_id: u64,
    pub(crate) revision: u64,
}

impl Table {
    /// Creates an empty table.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            records: Vec::new(),
            next_id: 1,
            revision: 0,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(Record::id).collect()
    }

    /// Takes the next unused id; `None` once the id space is exhausted.
    pub(crate) fn allocate_id(&mut self) -> Option<RecordId> {
        if self.next_id > MAX_RECORD_ID {
            return None;
        }
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        Some(id)
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    /// Builds a table from raw sheet rows (header first).
    ///
    /// An empty sheet yields an empty table. Rows without a stored id get
    /// fresh ids after the largest stored id, in sheet order.
    pub fn from_rows(
        schema: TableSchema,
        rows: &[Vec<String>],
    ) -> Result<(Self, LoadReport), LoadError> {
        let mut report = LoadReport::default();
        let Some((header, body)) = rows.split_first() else {
            return Ok((Self::new(schema), report));
        };

        let layout = schema
            .match_header(header)
            .map_err(|error| header_error(&schema, error))?;
        report.missing_optional = layout.missing_optional.clone();
        report.dropped = layout.dropped.clone();

        let mut parsed: Vec<(usize, Option<RecordId>, BTreeMap<String, CellValue>)> = Vec::new();
        let mut seen_ids = HashSet::new();
        for (offset, row) in body.iter().enumerate() {
            // Header is sheet row 1.
            let sheet_row = offset + 2;
            if row.iter().all(|cell| cell.trim().is_empty()) {
                report.skipped_blank_rows += 1;
                continue;
            }

            let id = match layout.id_position.map(|position| cell_at(row, position)) {
                Some(cell) if !cell.trim().is_empty() => {
                    let id = cell.parse::<RecordId>().map_err(|_| LoadError::InvalidId {
                        table: schema.name.clone(),
                        row: sheet_row,
                        value: cell.trim().to_string(),
                    })?;
                    if !seen_ids.insert(id) {
                        return Err(LoadError::DuplicateId {
                            table: schema.name.clone(),
                            id,
                        });
                    }
                    Some(id)
                }
                _ => None,
            };

            let mut values: BTreeMap<String, CellValue> = schema
                .column_names()
                .map(|name| (name.to_string(), CellValue::Empty))
                .collect();
            for &(position, index) in &layout.positions {
                let column = &schema.columns[index];
                let value = column
                    .kind
                    .coerce_stored(cell_at(row, position))
                    .map_err(|reason| LoadError::InvalidValue {
                        table: schema.name.clone(),
                        row: sheet_row,
                        column: column.name.clone(),
                        reason,
                    })?;
                values.insert(column.name.clone(), value);
            }
            parsed.push((sheet_row, id, values));
        }

        // Stored ids are capped at MAX_RECORD_ID, so this cannot overflow.
        let next_id = seen_ids.iter().map(|id| id.get()).max().unwrap_or(0) + 1;
        let mut table = Self {
            schema,
            records: Vec::with_capacity(parsed.len()),
            next_id,
            revision: 0,
        };
        for (sheet_row, id, values) in parsed {
            let id = match id {
                Some(id) => id,
                None => {
                    report.assigned_ids += 1;
                    table.allocate_id().ok_or_else(|| LoadError::InvalidId {
                        table: table.schema.name.clone(),
                        row: sheet_row,
                        value: String::new(),
                    })?
                }
            };
            table.records.push(Record::new(id, values));
        }

        Ok((
            table,
            report,
        ))
    }

    /// Serializes the table to sheet rows: header then one row per record.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(self.records.len() + 1);
        rows.push(self.schema.header_row());
        for record in &self.records {
            let mut row = Vec::with_capacity(self.schema.columns.len() + 1);
            row.push(record.id.to_string());
            row.extend(
                self.schema
                    .column_names()
                    .map(|name| record.get(name).to_string()),
            );
            rows.push(row);
        }
        rows
    }
}

fn cell_at(row: &[String], position: usize) -> &str {
    row.get(position).map_or("", String::as_str)
}

fn header_error(schema: &TableSchema, error: HeaderError) -> LoadError {
    LoadError::Header {
        table: schema.name.clone(),
        error,
    }
}
