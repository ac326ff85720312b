//! Record add/update/delete against a table snapshot.
//!
//! # Responsibility
//! - Validate and coerce raw field input against the table schema.
//! - Produce the next table snapshot; persistence is the caller's concern.
//!
//! # Invariants
//! - Identity is always a `RecordId`; there is no positional entry point.
//! - Failed operations return an error and leave the input table untouched.
//! - Existing records keep their ids and relative order.

use crate::error::{DashError, DashResult};
use crate::model::schema::{TableSchema, ID_COLUMN};
use crate::model::table::{Record, RecordId, Table};
use crate::model::value::CellValue;
use log::debug;
use std::collections::BTreeMap;

/// Raw field input keyed by column name, as emitted by a form.
pub type FieldValues = BTreeMap<String, String>;

/// Builds `FieldValues` from `(field, value)` pairs.
pub fn fields<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> FieldValues
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Appends a new record and returns the next table with its id.
///
/// Columns absent from `fields` are filled with blanks.
///
/// # Errors
/// - `DashError::Validation` naming the offending field when a field is
///   unknown, fails coercion, a required column is blank, or the declared
///   date order is violated.
pub fn add_record(table: &Table, fields: &FieldValues) -> DashResult<(Table, RecordId)> {
    let schema = table.schema();
    let coerced = coerce_fields(schema, fields)?;

    let mut values = BTreeMap::new();
    let mut filled = Vec::new();
    for column in &schema.columns {
        match coerced.get(&column.name) {
            Some(value) => {
                values.insert(column.name.clone(), value.clone());
            }
            None => {
                filled.push(column.name.as_str());
                values.insert(column.name.clone(), CellValue::Empty);
            }
        }
    }
    if !filled.is_empty() {
        debug!(
            "event=record_reindex module=editor table={} filled={:?}",
            schema.name, filled
        );
    }
    check_record(schema, &values)?;

    let mut next = table.clone();
    let id = next
        .allocate_id()
        .ok_or_else(|| DashError::validation("id", "no record ids left in this table"))?;
    next.records.push(Record::new(id, values));
    next.touch();
    Ok((next, id))
}

/// Overwrites the provided fields of record `id`.
///
/// # Errors
/// - `DashError::NotFound` when `id` is not in the table.
/// - `DashError::Validation` as for `add_record`, checked on the merged
///   record.
pub fn update_record(table: &Table, id: RecordId, fields: &FieldValues) -> DashResult<Table> {
    let schema = table.schema();
    let coerced = coerce_fields(schema, fields)?;
    let position = table
        .records()
        .iter()
        .position(|record| record.id() == id)
        .ok_or(DashError::NotFound(id))?;

    let mut values = table.records()[position].values().clone();
    values.extend(coerced);
    check_record(schema, &values)?;

    let mut next = table.clone();
    next.records[position].values = values;
    next.touch();
    Ok(next)
}

/// Removes every record whose id is in `ids`; unknown ids are ignored.
///
/// # Errors
/// - `DashError::NoSelection` when `ids` is empty.
pub fn delete_records(table: &Table, ids: &[RecordId]) -> DashResult<Table> {
    if ids.is_empty() {
        return Err(DashError::NoSelection);
    }

    let mut next = table.clone();
    let before = next.records.len();
    next.records.retain(|record| !ids.contains(&record.id()));
    if next.records.len() != before {
        next.touch();
    }
    Ok(next)
}

fn coerce_fields(schema: &TableSchema, fields: &FieldValues) -> DashResult<BTreeMap<String, CellValue>> {
    let mut coerced = BTreeMap::new();
    for (name, raw) in fields {
        if name == ID_COLUMN {
            return Err(DashError::validation(name, "ids are assigned by the store"));
        }
        let column = schema
            .column_def(name)
            .ok_or_else(|| DashError::validation(name, "unknown field"))?;
        let value = column
            .kind
            .coerce(raw)
            .map_err(|reason| DashError::validation(name, reason))?;
        coerced.insert(name.clone(), value);
    }
    Ok(coerced)
}

fn check_record(schema: &TableSchema, values: &BTreeMap<String, CellValue>) -> DashResult<()> {
    for column in schema.columns.iter().filter(|column| column.required) {
        if values.get(&column.name).map_or(true, CellValue::is_empty) {
            return Err(DashError::validation(&column.name, "is required"));
        }
    }

    if let Some((start, end)) = &schema.date_order {
        let start_date = values.get(start).and_then(CellValue::as_date);
        let end_date = values.get(end).and_then(CellValue::as_date);
        if let (Some(start_date), Some(end_date)) = (start_date, end_date) {
            if end_date < start_date {
                return Err(DashError::validation(
                    end,
                    format!("must not be earlier than `{start}`"),
                ));
            }
        }
    }

    Ok(())
}
