use tadash_core::model::catalog::{
    calendar_schema, countries_schema, country_calls_schema, programmes_schema,
    risk_matrix_schema,
};
use tadash_core::stats::{
    busdays_in_year, calls_by_attendee, calls_by_country, countries_by_focal, distinct_values,
    occupancy_by_type, programmes_by, risk_ordering, years, Count, ProgrammeCount,
    ProgrammeGrouping, YearFilter,
};
use tadash_core::{Table, TableSchema};

fn table(schema: TableSchema, cells: &[&[&str]]) -> Table {
    let rows: Vec<Vec<String>> = cells
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    Table::from_rows(schema, &rows).unwrap().0
}

fn count(label: &str, count: usize) -> Count {
    Count {
        label: label.to_string(),
        count,
    }
}

fn calendar() -> Table {
    table(
        calendar_schema(Vec::new(), Vec::new()),
        &[
            &["id", "advisor", "type", "start_date", "end_date", "remarks"],
            &["1", "A", "Leave", "01-01-2024", "05-01-2024", ""],
            &["2", "A", "Leave", "08-01-2024", "09-01-2024", ""],
            &["3", "B", "Mission", "29-12-2023", "02-01-2024", ""],
            &["4", "B", "Training", "04-12-2023", "05-12-2023", ""],
        ],
    )
}

fn calls() -> Table {
    table(
        country_calls_schema(Vec::new()),
        &[
            &[
                "id",
                "date",
                "country",
                "sal_attendees",
                "country_attendees",
                "category",
                "description",
            ],
            &["1", "03-01-2024", "Chad", "JD, MK", "", "scheduled", ""],
            &["2", "10-01-2024", "Peru", "JD", "", "training", ""],
            &["3", "15-02-2024", "Chad", "MK", "", "other", ""],
            &["4", "20-06-2023", "Peru", "JD", "", "", ""],
        ],
    )
}

#[test]
fn occupancy_for_one_year_uses_end_date_year() {
    let rows = occupancy_by_type(&calendar(), YearFilter::Year(2024));
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].advisor, "A");
    assert_eq!(rows[0].entry_type, "Leave");
    assert_eq!(rows[0].days, 7);
    let expected = 7.0 / f64::from(busdays_in_year(2024)) * 100.0;
    assert!((rows[0].percent - expected).abs() < 1e-9);

    // Dec 29 to Jan 2 spans a weekend.
    assert_eq!(rows[1].advisor, "B");
    assert_eq!(rows[1].entry_type, "Mission");
    assert_eq!(rows[1].days, 3);
}

#[test]
fn occupancy_over_all_years_spans_the_whole_calendar() {
    let rows = occupancy_by_type(&calendar(), YearFilter::All);
    let keys: Vec<(&str, &str, u32)> = rows
        .iter()
        .map(|row| (row.advisor.as_str(), row.entry_type.as_str(), row.days))
        .collect();
    assert_eq!(
        keys,
        vec![("A", "Leave", 7), ("B", "Mission", 3), ("B", "Training", 2)]
    );

    let period = f64::from(busdays_in_year(2023) + busdays_in_year(2024));
    assert!((rows[2].percent - 2.0 / period * 100.0).abs() < 1e-9);
}

#[test]
fn occupancy_of_an_empty_calendar_is_empty() {
    let empty = Table::new(calendar_schema(Vec::new(), Vec::new()));
    assert!(occupancy_by_type(&empty, YearFilter::All).is_empty());
}

#[test]
fn calls_are_counted_per_country_and_ranked() {
    let calls = calls();
    assert_eq!(
        calls_by_country(&calls, YearFilter::Year(2024)),
        vec![count("Chad", 2), count("Peru", 1)]
    );
    assert_eq!(
        calls_by_country(&calls, YearFilter::All),
        vec![count("Chad", 2), count("Peru", 2)]
    );
    assert!(calls_by_country(&calls, YearFilter::Year(2020)).is_empty());
}

#[test]
fn calls_count_once_per_attendee() {
    let calls = calls();
    assert_eq!(
        calls_by_attendee(&calls, YearFilter::All),
        vec![count("JD", 3), count("MK", 2)]
    );
    assert_eq!(
        calls_by_attendee(&calls, YearFilter::Year(2024)),
        vec![count("JD", 2), count("MK", 2)]
    );
}

#[test]
fn focal_allocation_respects_continent_filter() {
    let countries = table(
        countries_schema(),
        &[
            &["CIA Name", "ISO 3166 alpha3", "Continent", "ta_focal", "ta_support"],
            &["Chad", "TCD", "Africa", "JD", ""],
            &["Mali", "MLI", "Africa", "JD", "MK"],
            &["Peru", "PER", "South America", "MK", ""],
            &["Nepal", "NPL", "Asia", "", ""],
        ],
    );

    assert_eq!(
        countries_by_focal(&countries, None),
        vec![count("JD", 2), count("MK", 1)]
    );
    let africa = vec!["Africa".to_string()];
    assert_eq!(
        countries_by_focal(&countries, Some(africa.as_slice())),
        vec![count("JD", 2)]
    );
    let none: Vec<String> = Vec::new();
    assert!(countries_by_focal(&countries, Some(none.as_slice())).is_empty());
}

#[test]
fn risk_matrix_is_ordered_by_score_then_country() {
    let risk = table(
        risk_matrix_schema(),
        &[
            &["country", "score", "description", "remarks"],
            &["Peru", "2", "medium", ""],
            &["Chad", "1", "high", "review in Q3"],
            &["Mali", "2", "medium", "x"],
        ],
    );

    let ordered = risk_ordering(&risk);
    let countries: Vec<&str> = ordered.iter().map(|entry| entry.country.as_str()).collect();
    assert_eq!(countries, vec!["Chad", "Mali", "Peru"]);
    assert_eq!(ordered[0].score, Some(1.0));
    assert_eq!(ordered[0].remarks, "review in Q3");
    assert_eq!(ordered[2].remarks, "-");
}

#[test]
fn programmes_are_counted_within_the_year_range() {
    let programmes = table(
        programmes_schema(),
        &[
            &["code", "country", "sub_sector", "donor", "start_year", "end_year"],
            &["P1", "Chad", "Health", "EU", "01-01-2019", "31-12-2021"],
            &["P2", "Chad", "Health", "UN", "01-01-2020", "31-12-2022"],
            &["P3", "Chad", "Water", "EU", "01-01-2015", "31-12-2018"],
            &["P4", "Peru", "Water", "EU", "01-01-2021", "31-12-2026"],
        ],
    );

    assert_eq!(
        programmes_by(&programmes, ProgrammeGrouping::Sector, 2019, 2022),
        vec![ProgrammeCount {
            country: "Chad".to_string(),
            group: "Health".to_string(),
            count: 2,
        }]
    );

    let by_donor = programmes_by(&programmes, ProgrammeGrouping::Donor, 2000, 2100);
    let groups: Vec<(&str, &str, usize)> = by_donor
        .iter()
        .map(|row| (row.country.as_str(), row.group.as_str(), row.count))
        .collect();
    assert_eq!(
        groups,
        vec![("Chad", "EU", 2), ("Chad", "UN", 1), ("Peru", "EU", 1)]
    );
}

#[test]
fn choice_lists_are_sorted_and_distinct() {
    let calendar = calendar();
    assert_eq!(
        distinct_values(&calendar, "type"),
        vec!["Leave", "Mission", "Training"]
    );
    assert!(distinct_values(&calendar, "remarks").is_empty());
    assert_eq!(years(&calendar, "start_date"), vec![2023, 2024]);
    assert_eq!(years(&calls(), "date"), vec![2023, 2024]);
}
