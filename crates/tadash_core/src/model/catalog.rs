//! Schemas of the dashboard's sheets.
//!
//! Editable tables (`calendar`, `country_calls`) take their category
//! choices from the reference tables, so they are built after those load.

use crate::model::schema::{ColumnKind, TableSchema};

pub const CALENDAR: &str = "calendar";
pub const COUNTRY_CALLS: &str = "country_calls";
pub const ADVISORS: &str = "advisors";
pub const COUNTRIES: &str = "countries";
pub const TYPES: &str = "types";
pub const RISK_MATRIX: &str = "risk_matrix";
pub const PROGRAMMES: &str = "programmes";

/// Call categories offered by the call log form.
pub const CALL_CATEGORIES: &[&str] = &["scheduled", "special support", "training", "other"];

/// Country label used for calls that are not tied to one country.
pub const REGIONAL_COUNTRY: &str = "Hanaano";

/// Advisor calendar: leave, missions, trainings.
pub fn calendar_schema(advisors: Vec<String>, types: Vec<String>) -> TableSchema {
    TableSchema::new(CALENDAR, 1)
        .required("advisor", ColumnKind::Category(advisors))
        .required("type", ColumnKind::Category(types))
        .required("start_date", ColumnKind::Date)
        .required("end_date", ColumnKind::Date)
        .column("remarks", ColumnKind::Text)
        .date_order("start_date", "end_date")
}

/// Country call log.
pub fn country_calls_schema(countries: Vec<String>) -> TableSchema {
    let mut countries = countries;
    if !countries.is_empty() && !countries.iter().any(|name| name == REGIONAL_COUNTRY) {
        countries.push(REGIONAL_COUNTRY.to_string());
    }
    TableSchema::new(COUNTRY_CALLS, 1)
        .required("date", ColumnKind::Date)
        .required("country", ColumnKind::Category(countries))
        .column("sal_attendees", ColumnKind::NameList)
        .column("country_attendees", ColumnKind::NameList)
        .column(
            "category",
            ColumnKind::Category(CALL_CATEGORIES.iter().map(|c| c.to_string()).collect()),
        )
        .column("description", ColumnKind::Text)
}

pub fn advisors_schema() -> TableSchema {
    TableSchema::new(ADVISORS, 1)
        .required("short_name", ColumnKind::Text)
        .column("name", ColumnKind::Text)
        .column("email", ColumnKind::Text)
        .lenient()
}

pub fn countries_schema() -> TableSchema {
    TableSchema::new(COUNTRIES, 1)
        .required("CIA Name", ColumnKind::Text)
        .column("ISO 3166 alpha3", ColumnKind::Text)
        .column("Continent", ColumnKind::Text)
        .column("ta_focal", ColumnKind::Text)
        .column("ta_support", ColumnKind::NameList)
        .lenient()
}

pub fn types_schema() -> TableSchema {
    TableSchema::new(TYPES, 1)
        .required("type", ColumnKind::Text)
        .lenient()
}

/// Country capacity/risk classification.
pub fn risk_matrix_schema() -> TableSchema {
    TableSchema::new(RISK_MATRIX, 1)
        .required("country", ColumnKind::Text)
        .required("score", ColumnKind::Number)
        .column("description", ColumnKind::Text)
        .column("remarks", ColumnKind::Text)
        .lenient()
}

pub fn programmes_schema() -> TableSchema {
    TableSchema::new(PROGRAMMES, 1)
        .required("code", ColumnKind::Text)
        .required("country", ColumnKind::Text)
        .column("sub_sector", ColumnKind::Text)
        .column("donor", ColumnKind::Text)
        .required("start_year", ColumnKind::Date)
        .required("end_year", ColumnKind::Date)
        .date_order("start_year", "end_year")
        .lenient()
}
