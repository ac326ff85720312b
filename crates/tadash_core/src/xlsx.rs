//! Workbook export and import.
//!
//! # Responsibility
//! - Render every backend sheet, or one typed table, as `.xlsx` bytes.
//! - Copy every sheet of an `.xlsx` workbook into a backend.
//!
//! # Invariants
//! - Export only reads from the backend.
//! - Imported cells are stored as display text; dates are written as
//!   `dd-mm-yyyy` so the day-first loader reads them back unchanged.

use crate::model::table::Table;
use crate::model::value::{date_from_serial, CellValue, DATE_FORMAT};
use crate::storage::{SheetRows, StorageBackend, StorageError};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use log::{error, info};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::time::Instant;

pub type XlsxResult<T> = Result<T, WorkbookError>;

#[derive(Debug)]
pub enum WorkbookError {
    Storage(StorageError),
    /// Writing the workbook failed.
    Write(XlsxError),
    /// Reading the workbook failed.
    Read(calamine::Error),
    /// A sheet or cell cannot be represented in a workbook.
    Layout(String),
}

impl Display for WorkbookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Write(err) => write!(f, "failed to write workbook: {err}"),
            Self::Read(err) => write!(f, "failed to read workbook: {err}"),
            Self::Layout(message) => write!(f, "{message}"),
        }
    }
}

impl Error for WorkbookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Write(err) => Some(err),
            Self::Read(err) => Some(err),
            Self::Layout(_) => None,
        }
    }
}

impl From<StorageError> for WorkbookError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<XlsxError> for WorkbookError {
    fn from(value: XlsxError) -> Self {
        Self::Write(value)
    }
}

impl From<calamine::Error> for WorkbookError {
    fn from(value: calamine::Error) -> Self {
        Self::Read(value)
    }
}

/// Sheet copied by an import, with its row count including the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSheet {
    pub name: String,
    pub rows: usize,
}

/// Renders every sheet of `backend` into one workbook.
pub fn export_workbook(backend: &dyn StorageBackend) -> XlsxResult<Vec<u8>> {
    let started_at = Instant::now();
    let result = (|| -> XlsxResult<(Vec<u8>, usize)> {
        let mut workbook = Workbook::new();
        let header = header_format();
        let names = backend.table_names()?;
        for name in &names {
            let rows = backend.read_table(name)?;
            let sheet = named_sheet(&mut workbook, name)?;
            write_text_rows(sheet, &rows, &header)?;
        }
        Ok((workbook.save_to_buffer()?, names.len()))
    })();

    match result {
        Ok((bytes, sheets)) => {
            info!(
                "event=workbook_export module=xlsx status=ok backend={} sheets={} bytes={} duration_ms={}",
                backend.backend_id(),
                sheets,
                bytes.len(),
                started_at.elapsed().as_millis()
            );
            Ok(bytes)
        }
        Err(err) => {
            error!(
                "event=workbook_export module=xlsx status=error backend={} duration_ms={} error={}",
                backend.backend_id(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Renders one table with typed cells: numbers stay numeric, dates use
/// `dd-mm-yyyy`.
pub fn export_table(table: &Table) -> XlsxResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = header_format();
    let sheet = named_sheet(&mut workbook, &table.schema().name)?;

    let columns = table.schema().header_row();
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, column_index(col)?, name, &header)?;
    }
    for (index, record) in table.records().iter().enumerate() {
        let row = row_index(index + 1)?;
        sheet.write_number(row, 0, record.id().get() as f64)?;
        for (col, name) in columns.iter().enumerate().skip(1) {
            let col = column_index(col)?;
            match record.get(name) {
                CellValue::Empty => {}
                CellValue::Number(number) => {
                    sheet.write_number(row, col, *number)?;
                }
                CellValue::Date(date) => {
                    sheet.write_string(row, col, date.format(DATE_FORMAT).to_string())?;
                }
                CellValue::Text(text) => {
                    sheet.write_string(row, col, text)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Copies every sheet of the workbook at `path` into `backend`.
pub fn import_workbook(
    path: impl AsRef<Path>,
    backend: &dyn StorageBackend,
) -> XlsxResult<Vec<ImportedSheet>> {
    let mut workbook = open_workbook_auto(path.as_ref())?;
    copy_sheets(&mut workbook, backend)
}

/// Like `import_workbook`, reading the workbook from memory.
pub fn import_workbook_bytes(
    bytes: Vec<u8>,
    backend: &dyn StorageBackend,
) -> XlsxResult<Vec<ImportedSheet>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    copy_sheets(&mut workbook, backend)
}

fn copy_sheets<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    backend: &dyn StorageBackend,
) -> XlsxResult<Vec<ImportedSheet>> {
    let started_at = Instant::now();
    let mut imported = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = workbook.worksheet_range(&name)?;
        let rows: SheetRows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        backend.write_table(&name, &rows)?;
        imported.push(ImportedSheet {
            name,
            rows: rows.len(),
        });
    }
    info!(
        "event=workbook_import module=xlsx status=ok backend={} sheets={} duration_ms={}",
        backend.backend_id(),
        imported.len(),
        started_at.elapsed().as_millis()
    );
    Ok(imported)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
        Data::Int(number) => number.to_string(),
        Data::Float(number) => CellValue::Number(*number).to_string(),
        Data::Bool(flag) => flag.to_string(),
        Data::DateTime(value) => date_from_serial(value.as_f64())
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
        Data::Error(_) => String::new(),
    }
}

fn header_format() -> Format {
    Format::new().set_bold()
}

fn named_sheet<'a>(workbook: &'a mut Workbook, name: &str) -> XlsxResult<&'a mut Worksheet> {
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(name)
        .map_err(|err| WorkbookError::Layout(format!("invalid sheet name `{name}`: {err}")))?;
    Ok(sheet)
}

fn write_text_rows(sheet: &mut Worksheet, rows: &SheetRows, header: &Format) -> XlsxResult<()> {
    for (index, row) in rows.iter().enumerate() {
        let row_number = row_index(index)?;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let col = column_index(col)?;
            if index == 0 {
                sheet.write_string_with_format(row_number, col, value, header)?;
            } else {
                sheet.write_string(row_number, col, value)?;
            }
        }
    }
    Ok(())
}

fn row_index(index: usize) -> XlsxResult<u32> {
    u32::try_from(index).map_err(|_| WorkbookError::Layout(format!("row {index} out of range")))
}

fn column_index(index: usize) -> XlsxResult<u16> {
    u16::try_from(index)
        .map_err(|_| WorkbookError::Layout(format!("column {index} out of range")))
}

#[cfg(test)]
mod tests {
    use super::cell_text;
    use calamine::Data;

    #[test]
    fn whole_floats_render_without_fraction() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
