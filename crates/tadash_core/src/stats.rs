//! Aggregations behind the dashboard panels.
//!
//! # Responsibility
//! - Derive read-only summaries from table snapshots: advisor occupancy,
//!   call counts, focal-point allocation, risk ordering and programme
//!   counts.
//! - Provide the choice lists used by filter inputs.
//!
//! # Invariants
//! - Functions never mutate their input tables.
//! - Records with blank or non-date values in a date field are skipped, not
//!   counted as errors.
//! - Output order is deterministic for equal inputs.

use crate::model::schema::split_name_list;
use crate::model::table::{Record, Table};
use crate::model::value::CellValue;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Year restriction offered by the stats panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    All,
    Year(i32),
}

impl YearFilter {
    fn admits(self, date: NaiveDate) -> bool {
        match self {
            Self::All => true,
            Self::Year(year) => date.year() == year,
        }
    }
}

impl FromStr for YearFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed
            .parse::<i32>()
            .map(Self::Year)
            .map_err(|_| format!("`{trimmed}` is neither a year nor `All`"))
    }
}

impl Display for YearFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Year(year) => write!(f, "{year}"),
        }
    }
}

/// Labelled count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Count {
    pub label: String,
    pub count: usize,
}

/// Business days one advisor spent on one entry type.
#[derive(Debug, Clone, PartialEq)]
pub struct Occupancy {
    pub advisor: String,
    pub entry_type: String,
    pub days: u32,
    /// Share of the period's business days, in percent.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskEntry {
    pub country: String,
    pub score: Option<f64>,
    pub description: String,
    pub remarks: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgrammeGrouping {
    Sector,
    Donor,
}

impl ProgrammeGrouping {
    fn field(self) -> &'static str {
        match self {
            Self::Sector => "sub_sector",
            Self::Donor => "donor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammeCount {
    pub country: String,
    pub group: String,
    pub count: usize,
}

/// Weekdays in `[start, end]`, both ends included.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    let count = start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Weekdays in calendar year `year`.
pub fn busdays_in_year(year: i32) -> u32 {
    busdays_in_years(year, year)
}

fn busdays_in_years(first: i32, last: i32) -> u32 {
    match (
        NaiveDate::from_ymd_opt(first, 1, 1),
        NaiveDate::from_ymd_opt(last, 12, 31),
    ) {
        (Some(start), Some(end)) => business_days(start, end),
        _ => 0,
    }
}

/// Business days per `(advisor, type)` over calendar entries.
///
/// With a year, entries are selected by the year of `end_date` and the
/// percentage is relative to that year. With `All`, the reference period runs
/// from Jan 1 of the earliest start year to Dec 31 of the latest end year.
pub fn occupancy_by_type(calendar: &Table, year: YearFilter) -> Vec<Occupancy> {
    let spans: Vec<(&Record, NaiveDate, NaiveDate)> = calendar
        .records()
        .iter()
        .filter_map(|record| {
            let start = record.get("start_date").as_date()?;
            let end = record.get("end_date").as_date()?;
            Some((record, start, end))
        })
        .collect();

    let period_days = match year {
        YearFilter::Year(year) => busdays_in_year(year),
        YearFilter::All => {
            let first = spans.iter().map(|(_, start, _)| start.year()).min();
            let last = spans.iter().map(|(_, _, end)| end.year()).max();
            match (first, last) {
                (Some(first), Some(last)) => busdays_in_years(first, last),
                _ => 0,
            }
        }
    };

    let mut totals: BTreeMap<(String, String), u32> = BTreeMap::new();
    for (record, start, end) in spans {
        if !year.admits(end) {
            continue;
        }
        let key = (
            record.get("advisor").to_string(),
            record.get("type").to_string(),
        );
        *totals.entry(key).or_default() += business_days(start, end);
    }

    totals
        .into_iter()
        .map(|((advisor, entry_type), days)| Occupancy {
            advisor,
            entry_type,
            days,
            percent: if period_days == 0 {
                0.0
            } else {
                f64::from(days) / f64::from(period_days) * 100.0
            },
        })
        .collect()
}

/// Calls per country, most frequent first.
pub fn calls_by_country(calls: &Table, year: YearFilter) -> Vec<Count> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in calls_in(calls, year) {
        let country = record.get("country");
        if !country.is_empty() {
            *counts.entry(country.to_string()).or_default() += 1;
        }
    }
    ranked(counts)
}

/// Calls per staff attendee, most frequent first.
///
/// A call with several attendees counts once for each of them.
pub fn calls_by_attendee(calls: &Table, year: YearFilter) -> Vec<Count> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in calls_in(calls, year) {
        let attendees = split_name_list(&record.get("sal_attendees").to_string());
        for attendee in attendees {
            *counts.entry(attendee).or_default() += 1;
        }
    }
    ranked(counts)
}

/// Countries per focal advisor, most countries first.
///
/// `continents` restricts the countries considered; `None` keeps all.
pub fn countries_by_focal(countries: &Table, continents: Option<&[String]>) -> Vec<Count> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in countries.records() {
        if let Some(allowed) = continents {
            let continent = record.get("Continent").to_string();
            if !allowed.iter().any(|name| *name == continent) {
                continue;
            }
        }
        let focal = record.get("ta_focal");
        if !focal.is_empty() {
            *counts.entry(focal.to_string()).or_default() += 1;
        }
    }
    ranked(counts)
}

/// Risk matrix ordered by score, then country. Blank remarks read `-`.
pub fn risk_ordering(risk_matrix: &Table) -> Vec<RiskEntry> {
    let mut entries: Vec<RiskEntry> = risk_matrix
        .records()
        .iter()
        .map(|record| {
            let remarks = record.get("remarks");
            RiskEntry {
                country: record.get("country").to_string(),
                score: record.get("score").as_number(),
                description: record.get("description").to_string(),
                remarks: if remarks.is_empty() {
                    "-".to_string()
                } else {
                    remarks.to_string()
                },
            }
        })
        .collect();
    entries.sort_by(|left, right| {
        let left_score = left.score.map_or(CellValue::Empty, CellValue::Number);
        let right_score = right.score.map_or(CellValue::Empty, CellValue::Number);
        left_score
            .sort_cmp(&right_score)
            .then_with(|| left.country.cmp(&right.country))
    });
    entries
}

/// Programmes per country and sector (or donor) that start no earlier than
/// `from_year` and end no later than `to_year`.
pub fn programmes_by(
    programmes: &Table,
    grouping: ProgrammeGrouping,
    from_year: i32,
    to_year: i32,
) -> Vec<ProgrammeCount> {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for record in programmes.records() {
        let (Some(start), Some(end)) = (
            record.get("start_year").as_date(),
            record.get("end_year").as_date(),
        ) else {
            continue;
        };
        if start.year() < from_year || end.year() > to_year {
            continue;
        }
        let key = (
            record.get("country").to_string(),
            record.get(grouping.field()).to_string(),
        );
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((country, group), count)| ProgrammeCount {
            country,
            group,
            count,
        })
        .collect()
}

/// Sorted distinct non-blank display values of `field`.
pub fn distinct_values(table: &Table, field: &str) -> Vec<String> {
    table
        .records()
        .iter()
        .map(|record| record.get(field))
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct years found in date `field`.
pub fn years(table: &Table, field: &str) -> Vec<i32> {
    table
        .records()
        .iter()
        .filter_map(|record| record.get(field).as_date())
        .map(|date| date.year())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn calls_in(calls: &Table, year: YearFilter) -> impl Iterator<Item = &Record> {
    calls.records().iter().filter(move |record| {
        record
            .get("date")
            .as_date()
            .is_some_and(|date| year.admits(date))
    })
}

fn ranked(counts: BTreeMap<String, usize>) -> Vec<Count> {
    let mut ranked: Vec<Count> = counts
        .into_iter()
        .map(|(label, count)| Count { label, count })
        .collect();
    // Stable: ties keep label order from the map.
    ranked.sort_by(|left, right| right.count.cmp(&left.count));
    ranked
}

#[cfg(test)]
mod tests {
    use super::{business_days, busdays_in_year, YearFilter};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn business_days_count_weekdays_inclusively() {
        assert_eq!(business_days(ymd(2024, 1, 1), ymd(2024, 1, 7)), 5);
        assert_eq!(business_days(ymd(2024, 1, 6), ymd(2024, 1, 7)), 0);
        assert_eq!(business_days(ymd(2024, 1, 3), ymd(2024, 1, 3)), 1);
        assert_eq!(business_days(ymd(2024, 1, 3), ymd(2024, 1, 2)), 0);
    }

    #[test]
    fn busdays_in_year_matches_known_years() {
        assert_eq!(busdays_in_year(2024), 262);
        assert_eq!(busdays_in_year(2023), 260);
    }

    #[test]
    fn year_filter_parses_all_and_numbers() {
        assert_eq!("All".parse::<YearFilter>().unwrap(), YearFilter::All);
        assert_eq!(" 2024 ".parse::<YearFilter>().unwrap(), YearFilter::Year(2024));
        assert!("next".parse::<YearFilter>().is_err());
    }
}
