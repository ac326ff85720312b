//! Scalar cell values and day-first date parsing.
//!
//! # Responsibility
//! - Define the value shape stored in every record field.
//! - Convert between spreadsheet cell text and typed values.
//!
//! # Invariants
//! - Dates are rendered as `dd-mm-yyyy` when written back to storage.
//! - Ambiguous numeric dates are read day-first (`02-01-2024` is 2 January).

use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Storage format for date cells.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

const DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%d-%b-%Y", "%d %b %Y", "%d %B %Y", "%Y-%m-%d",
    "%Y/%m/%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// One field value in a record.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Blank cell.
    Empty,
    /// Free text or category label.
    Text(String),
    /// Numeric cell (scores, counts).
    Number(f64),
    /// Calendar date without time component.
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Total order used by view sorting.
    ///
    /// Blank cells sort first, then numbers, dates and text.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Number(_) => 1,
            Self::Date(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(value) => write!(f, "{value}"),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Self::Number(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Parses a date cell, accepting mixed formats and reading day-first.
///
/// Datetime inputs are truncated to their date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }

    None
}

/// Converts a spreadsheet serial day number (1900 date system) into a date.
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(chrono::Duration::try_days(serial.trunc() as i64)?)
}
