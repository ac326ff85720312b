//! Explicit, versioned table schemas.
//!
//! # Responsibility
//! - Declare the column set and column kinds of each logical table.
//! - Coerce raw cell text into typed `CellValue`s.
//! - Match a stored header row against the declared columns.
//!
//! # Invariants
//! - Column names are unique and never equal to `ID_COLUMN`.
//! - A strict schema rejects unknown stored columns; a lenient schema drops
//!   them (reference tables only).

use crate::model::value::{parse_date, CellValue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reserved header cell holding the stable record id.
pub const ID_COLUMN: &str = "id";

static NAME_LIST_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[()']").expect("valid name list regex"));

/// Value kind accepted by one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    /// Day-first date, mixed input formats.
    Date,
    /// Closed set of labels. An empty set accepts any label.
    Category(Vec<String>),
    /// Comma separated person names, normalized to `a, b, c`.
    NameList,
}

impl ColumnKind {
    /// Coerces raw cell text. Blank input always yields `CellValue::Empty`.
    ///
    /// Returns a short reason on failure; callers attach the column name.
    pub fn coerce(&self, raw: &str) -> Result<CellValue, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(CellValue::Empty);
        }

        match self {
            Self::Text => Ok(CellValue::Text(trimmed.to_string())),
            Self::Number => trimmed
                .parse::<f64>()
                .map(CellValue::Number)
                .map_err(|_| format!("`{trimmed}` is not a number")),
            Self::Date => parse_date(trimmed)
                .map(CellValue::Date)
                .ok_or_else(|| format!("`{trimmed}` is not a valid date")),
            Self::Category(allowed) => {
                if allowed.is_empty() || allowed.iter().any(|label| label == trimmed) {
                    Ok(CellValue::Text(trimmed.to_string()))
                } else {
                    Err(format!("`{trimmed}` is not one of the allowed values"))
                }
            }
            Self::NameList => {
                let names = split_name_list(trimmed);
                if names.is_empty() {
                    Ok(CellValue::Empty)
                } else {
                    Ok(CellValue::Text(names.join(", ")))
                }
            }
        }
    }

    /// Coerces a stored cell. Category labels are not checked against the
    /// current choice list, which may have changed since the cell was written.
    pub fn coerce_stored(&self, raw: &str) -> Result<CellValue, String> {
        match self {
            Self::Category(_) => Self::Text.coerce(raw),
            other => other.coerce(raw),
        }
    }
}

/// Splits a comma separated name list, dropping quoting noise and blanks.
pub fn split_name_list(raw: &str) -> Vec<String> {
    NAME_LIST_NOISE
        .replace_all(raw, "")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Declaration of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    /// Required columns must be present in storage and non-blank on write.
    pub required: bool,
}

/// Explicit schema of one logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Sheet/table name in the backing store.
    pub name: String,
    /// Bumped whenever the column set or a column kind changes.
    pub version: u32,
    pub columns: Vec<ColumnDef>,
    /// `(start, end)` date columns where `end >= start` must hold.
    pub date_order: Option<(String, String)>,
    /// When false, unknown stored columns are dropped instead of rejected.
    pub strict: bool,
}

/// Result of matching a stored header row against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Position of the `id` cell, when present.
    pub id_position: Option<usize>,
    /// `(stored position, schema column index)` pairs.
    pub positions: Vec<(usize, usize)>,
    /// Optional columns absent from storage, filled with blanks.
    pub missing_optional: Vec<String>,
    /// Unknown stored columns dropped by a lenient schema.
    pub dropped: Vec<String>,
}

/// Header mismatch reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    MissingColumn(String),
    UnknownColumn(String),
    DuplicateColumn(String),
}

impl Display for HeaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn(name) => write!(f, "required column `{name}` is missing"),
            Self::UnknownColumn(name) => write!(f, "unknown column `{name}`"),
            Self::DuplicateColumn(name) => write!(f, "column `{name}` appears twice"),
        }
    }
}

impl Error for HeaderError {}

impl TableSchema {
    /// Starts a strict schema with no columns.
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            columns: Vec::new(),
            date_order: None,
            strict: true,
        }
    }

    /// Adds an optional column.
    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Adds a required column.
    pub fn required(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Declares an ordered pair of date columns.
    pub fn date_order(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.date_order = Some((start.into(), end.into()));
        self
    }

    /// Marks the schema lenient about unknown stored columns.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    /// Header row written to storage: `id` followed by schema columns.
    pub fn header_row(&self) -> Vec<String> {
        std::iter::once(ID_COLUMN.to_string())
            .chain(self.columns.iter().map(|column| column.name.clone()))
            .collect()
    }

    /// Matches a stored header against this schema.
    ///
    /// Blank header cells are ignored.
    pub fn match_header(&self, header: &[String]) -> Result<HeaderLayout, HeaderError> {
        let mut layout = HeaderLayout {
            id_position: None,
            positions: Vec::new(),
            missing_optional: Vec::new(),
            dropped: Vec::new(),
        };
        let mut seen = vec![false; self.columns.len()];

        for (position, cell) in header.iter().enumerate() {
            let name = cell.trim();
            if name.is_empty() {
                continue;
            }
            if name == ID_COLUMN {
                if layout.id_position.is_some() {
                    return Err(HeaderError::DuplicateColumn(name.to_string()));
                }
                layout.id_position = Some(position);
                continue;
            }
            match self.columns.iter().position(|column| column.name == name) {
                Some(index) if seen[index] => {
                    return Err(HeaderError::DuplicateColumn(name.to_string()));
                }
                Some(index) => {
                    seen[index] = true;
                    layout.positions.push((position, index));
                }
                None if self.strict => return Err(HeaderError::UnknownColumn(name.to_string())),
                None => layout.dropped.push(name.to_string()),
            }
        }

        for (index, column) in self.columns.iter().enumerate() {
            if seen[index] {
                continue;
            }
            if column.required {
                return Err(HeaderError::MissingColumn(column.name.clone()));
            }
            layout.missing_optional.push(column.name.clone());
        }

        Ok(layout)
    }
}
