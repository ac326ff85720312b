//! Filtered, sorted read-only projections of a table.
//!
//! # Responsibility
//! - Derive display views from a table snapshot.
//! - Translate display selections back to stable record ids.
//!
//! # Invariants
//! - `apply` keeps exactly the records satisfying every constraint, in table
//!   order; sorting is stable and opt-in.
//! - Every view row carries its `RecordId`, so a selection resolves to the
//!   same record however the view was filtered or ordered.

use crate::error::{DashError, DashResult};
use crate::model::table::{Record, RecordId, Table};
use crate::model::value::CellValue;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;

/// One conjunctive filter constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Field value must be one of `values`. An empty list matches nothing.
    OneOf { field: String, values: Vec<CellValue> },
    /// Date field must fall in one of `years`.
    InYears { field: String, years: BTreeSet<i32> },
    /// `[start_field, end_field]` must overlap `[from, to]`.
    Overlaps {
        start_field: String,
        end_field: String,
        from: NaiveDate,
        to: NaiveDate,
    },
}

impl Constraint {
    fn fields(&self) -> Vec<&str> {
        match self {
            Self::OneOf { field, .. } | Self::InYears { field, .. } => vec![field.as_str()],
            Self::Overlaps {
                start_field,
                end_field,
                ..
            } => vec![start_field.as_str(), end_field.as_str()],
        }
    }

    fn matches(&self, record: &Record) -> bool {
        match self {
            Self::OneOf { field, values } => {
                let value = record.get(field);
                values.iter().any(|allowed| allowed == value)
            }
            Self::InYears { field, years } => record
                .get(field)
                .as_date()
                .is_some_and(|date| years.contains(&date.year())),
            Self::Overlaps {
                start_field,
                end_field,
                from,
                to,
            } => match (
                record.get(start_field).as_date(),
                record.get(end_field).as_date(),
            ) {
                (Some(start), Some(end)) => start <= *to && end >= *from,
                _ => false,
            },
        }
    }
}

/// Set of constraints; a record passes when it satisfies all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    constraints: Vec<Constraint>,
}

impl FilterSpec {
    /// Filter that keeps every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `field` to the given values.
    pub fn allow<F, I, V>(mut self, field: F, values: I) -> Self
    where
        F: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.constraints.push(Constraint::OneOf {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Restricts a date `field` to one calendar year.
    pub fn year(mut self, field: impl Into<String>, year: i32) -> Self {
        self.constraints.push(Constraint::InYears {
            field: field.into(),
            years: BTreeSet::from([year]),
        });
        self
    }

    /// Keeps records whose date span overlaps `[from, to]`.
    pub fn window(
        mut self,
        start_field: impl Into<String>,
        end_field: impl Into<String>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Self {
        self.constraints.push(Constraint::Overlaps {
            start_field: start_field.into(),
            end_field: end_field.into(),
            from,
            to,
        });
        self
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.constraints
            .iter()
            .all(|constraint| constraint.matches(record))
    }

    /// Checks that every constrained field exists in the table schema.
    pub fn validate(&self, table: &Table) -> DashResult<()> {
        for constraint in &self.constraints {
            for field in constraint.fields() {
                if table.schema().column_def(field).is_none() {
                    return Err(DashError::validation(field, "unknown filter field"));
                }
            }
        }
        Ok(())
    }
}

/// Stable ordering request for a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Positions selected in a view, 0-based in view order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    positions: Vec<usize>,
}

impl Selection {
    pub fn rows(positions: impl IntoIterator<Item = usize>) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Read-only projection of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    columns: Vec<String>,
    rows: Vec<Record>,
    source_revision: u64,
}

impl View {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Revision of the table this view was derived from.
    pub fn source_revision(&self) -> u64 {
        self.source_revision
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.rows.iter().map(Record::id).collect()
    }

    pub fn id_at(&self, position: usize) -> Option<RecordId> {
        self.rows.get(position).map(Record::id)
    }

    /// Translates selected view positions into stable ids.
    ///
    /// Duplicate positions resolve once; output follows selection order.
    ///
    /// # Errors
    /// - `DashError::NoSelection` when the selection is empty.
    /// - `DashError::Validation` when a position is outside the view.
    pub fn resolve(&self, selection: &Selection) -> DashResult<Vec<RecordId>> {
        if selection.is_empty() {
            return Err(DashError::NoSelection);
        }
        let mut ids = Vec::with_capacity(selection.positions().len());
        for &position in selection.positions() {
            let id = self.id_at(position).ok_or_else(|| {
                DashError::validation(
                    "selection",
                    format!("row {position} is outside a view of {} rows", self.len()),
                )
            })?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Resolves a selection that must contain exactly one row.
    ///
    /// # Errors
    /// - `DashError::Validation` on `selection` when zero or several rows
    ///   are selected, or a position is outside the view.
    pub fn resolve_single(&self, selection: &Selection) -> DashResult<RecordId> {
        let ids = match self.resolve(selection) {
            Err(DashError::NoSelection) => Vec::new(),
            other => other?,
        };
        match ids.as_slice() {
            [id] => Ok(*id),
            _ => Err(DashError::validation(
                "selection",
                "select exactly one row for editing",
            )),
        }
    }
}

/// Derives filtered views from tables.
pub struct FilteredView;

impl FilteredView {
    /// Records of `table` satisfying `filter`, in table order.
    pub fn apply(table: &Table, filter: &FilterSpec) -> View {
        View {
            columns: table.schema().column_names().map(str::to_string).collect(),
            rows: table
                .records()
                .iter()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect(),
            source_revision: table.revision(),
        }
    }

    /// Like `apply`, then stably sorted by `sort`.
    pub fn apply_sorted(table: &Table, filter: &FilterSpec, sort: &SortSpec) -> View {
        let mut view = Self::apply(table, filter);
        view.rows.sort_by(|left, right| {
            let ordering = left.get(&sort.field).sort_cmp(right.get(&sort.field));
            if sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        view
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterSpec, Selection};
    use crate::error::DashError;
    use crate::model::schema::{ColumnKind, TableSchema};
    use crate::model::table::Table;
    use crate::view::FilteredView;
    use chrono::NaiveDate;

    fn table() -> Table {
        let schema = TableSchema::new("calendar", 1)
            .required("advisor", ColumnKind::Text)
            .required("start_date", ColumnKind::Date)
            .required("end_date", ColumnKind::Date);
        let rows: Vec<Vec<String>> = [
            ["advisor", "start_date", "end_date"],
            ["A", "30-12-2023", "02-01-2024"],
            ["B", "10-01-2024", "12-01-2024"],
            ["A", "01-03-2025", "01-03-2025"],
        ]
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
        Table::from_rows(schema, &rows).unwrap().0
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn year_constraint_uses_the_given_date_field() {
        let table = table();
        let by_end = FilteredView::apply(&table, &FilterSpec::new().year("end_date", 2024));
        assert_eq!(by_end.len(), 2);
        let by_start = FilteredView::apply(&table, &FilterSpec::new().year("start_date", 2024));
        assert_eq!(by_start.len(), 1);
    }

    #[test]
    fn window_keeps_overlapping_spans() {
        let table = table();
        let view = FilteredView::apply(
            &table,
            &FilterSpec::new().window("start_date", "end_date", ymd(2024, 1, 1), ymd(2024, 1, 10)),
        );
        let advisors: Vec<String> = view
            .rows()
            .iter()
            .map(|row| row.get("advisor").to_string())
            .collect();
        assert_eq!(advisors, vec!["A", "B"]);
    }

    #[test]
    fn empty_allowed_list_matches_nothing() {
        let table = table();
        let view = FilteredView::apply(&table, &FilterSpec::new().allow("advisor", Vec::<&str>::new()));
        assert!(view.is_empty());
    }

    #[test]
    fn resolve_rejects_out_of_range_positions() {
        let view = FilteredView::apply(&table(), &FilterSpec::new());
        let err = view.resolve(&Selection::rows([5])).unwrap_err();
        assert!(matches!(err, DashError::Validation { ref field, .. } if field == "selection"));
        assert!(matches!(
            view.resolve(&Selection::default()),
            Err(DashError::NoSelection)
        ));
    }

    #[test]
    fn validate_rejects_unknown_fields() {
        let err = FilterSpec::new()
            .allow("colour", ["red"])
            .validate(&table())
            .unwrap_err();
        assert!(matches!(err, DashError::Validation { ref field, .. } if field == "colour"));
    }
}
