use std::sync::Arc;
use tadash_core::model::catalog::REGIONAL_COUNTRY;
use tadash_core::{
    fields, CellValue, ColumnKind, DashError, Dashboard, EditableTable, FilterSpec, Intent,
    MemoryBackend, Notice, NoticeLevel, Outcome, Selection, SheetNames, SortSpec,
};

fn backend() -> Arc<MemoryBackend> {
    Arc::new(
        MemoryBackend::new()
            .with_sheet(
                "advisors",
                &[
                    &["short_name", "name", "email"],
                    &["JD", "Jane Doe", "jd@example.org"],
                    &["MK", "Mo Kim", "mk@example.org"],
                ],
            )
            .with_sheet("types", &[&["type"], &["Leave"], &["Mission"]])
            .with_sheet(
                "countries",
                &[
                    &["CIA Name", "ISO 3166 alpha3", "Continent", "ta_focal", "ta_support"],
                    &["Chad", "TCD", "Africa", "JD", "MK"],
                    &["Peru", "PER", "South America", "MK", ""],
                ],
            )
            .with_sheet(
                "calendar",
                &[
                    &["id", "advisor", "type", "start_date", "end_date", "remarks"],
                    &["1", "JD", "Leave", "01-01-2024", "05-01-2024", ""],
                    &["2", "MK", "Mission", "08-01-2024", "12-01-2024", "Chad"],
                    &["3", "JD", "Mission", "15-01-2024", "16-01-2024", ""],
                ],
            ),
    )
}

fn open(backend: &Arc<MemoryBackend>) -> Dashboard {
    Dashboard::open(backend.clone(), &SheetNames::default()).unwrap()
}

#[test]
fn open_builds_choice_lists_from_reference_tables() {
    let dashboard = open(&backend());
    let calendar = dashboard.service(EditableTable::Calendar).table();
    assert_eq!(calendar.len(), 3);

    let advisor = calendar.schema().column_def("advisor").unwrap();
    assert_eq!(
        advisor.kind,
        ColumnKind::Category(vec!["JD".to_string(), "MK".to_string()])
    );

    let calls = dashboard.service(EditableTable::CountryCalls).table();
    assert!(calls.is_empty());
    match &calls.schema().column_def("country").unwrap().kind {
        ColumnKind::Category(countries) => {
            assert!(countries.iter().any(|name| name == "Chad"));
            assert!(countries.iter().any(|name| name == REGIONAL_COUNTRY));
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn add_intent_commits_and_reports_a_message() {
    let backend = backend();
    let mut dashboard = open(&backend);
    let service = dashboard.service_mut(EditableTable::Calendar);
    let result = service.execute(Intent::Add(fields([
        ("advisor", "MK"),
        ("type", "Leave"),
        ("start_date", "22-01-2024"),
        ("end_date", "23-01-2024"),
    ])));
    let Ok(Outcome::Added(id)) = result else {
        panic!("unexpected result {result:?}");
    };
    assert_eq!(id.get(), 4);
    assert_eq!(backend.sheet("calendar").unwrap().len(), 5);

    let notice = Notice::from_result(EditableTable::Calendar.key(), "MK", &result);
    assert_eq!(notice.level, NoticeLevel::Message);
    assert_eq!(notice.text, "New entry for MK added to the calendar, thank you!");
}

#[test]
fn delete_of_sorted_selection_removes_the_chosen_records() {
    let backend = backend();
    let mut dashboard = open(&backend);
    let service = dashboard.service_mut(EditableTable::Calendar);
    let view = service
        .view(
            &FilterSpec::new().allow("advisor", ["JD"]),
            Some(&SortSpec::descending("start_date")),
        )
        .unwrap();
    let removed = service
        .delete_selected(&view, &Selection::rows([0]))
        .unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].get(), 3);
    assert_eq!(service.table().ids().len(), 2);
    let stored = backend.sheet("calendar").unwrap();
    assert!(stored.iter().skip(1).all(|row| row[0] != "3"));
}

#[test]
fn empty_delete_selection_reports_the_dedicated_notice() {
    let backend = backend();
    let mut dashboard = open(&backend);
    let writes_before = backend.write_count();
    let service = dashboard.service_mut(EditableTable::Calendar);
    let result = service.execute(Intent::Delete(Vec::new()));
    assert!(matches!(result, Err(DashError::NoSelection)));
    assert_eq!(backend.write_count(), writes_before);

    let notice = Notice::from_result("calendar", "", &result);
    assert_eq!(notice.text, "Please select one or more rows to be deleted");
}

#[test]
fn edit_selected_updates_only_that_record() {
    let backend = backend();
    let mut dashboard = open(&backend);
    let service = dashboard.service_mut(EditableTable::Calendar);
    let view = service
        .view(&FilterSpec::new().allow("type", ["Mission"]), None)
        .unwrap();
    let id = service
        .edit_selected(&view, &Selection::rows([1]), fields([("remarks", "rescheduled")]))
        .unwrap();

    assert_eq!(id.get(), 3);
    let table = service.table();
    assert_eq!(
        table.get(id).unwrap().get("remarks"),
        &CellValue::from("rescheduled")
    );
    let other = table
        .records()
        .iter()
        .find(|record| record.id() != id && record.get("type") == &CellValue::from("Mission"))
        .unwrap();
    assert_eq!(other.get("remarks"), &CellValue::from("Chad"));
}

#[test]
fn persist_failure_keeps_the_previous_snapshot() {
    let backend = backend();
    let mut dashboard = open(&backend);
    let service = dashboard.service_mut(EditableTable::Calendar);
    let before = service.table().clone();

    backend.set_fail_writes(true);
    let result = service.execute(Intent::Edit {
        id: before.records()[0].id(),
        fields: fields([("remarks", "lost")]),
    });

    assert!(matches!(result, Err(DashError::Persist { .. })));
    assert_eq!(service.table(), &before);
    let notice = Notice::from_result("calendar", "JD", &result);
    assert!(notice.is_error());
    assert!(notice.text.starts_with("Oops, something went wrong: "));
}

#[test]
fn view_rejects_unknown_sort_fields() {
    let dashboard = open(&backend());
    let err = dashboard
        .service(EditableTable::Calendar)
        .view(&FilterSpec::new(), Some(&SortSpec::ascending("colour")))
        .unwrap_err();
    assert!(matches!(err, DashError::Validation { ref field, .. } if field == "colour"));
}

#[test]
fn configured_sheet_names_are_used() {
    let backend = backend();
    let sheets = SheetNames {
        country_calls: "calls_2024".to_string(),
        ..SheetNames::default()
    };
    let mut dashboard = Dashboard::open(backend.clone(), &sheets).unwrap();
    dashboard
        .service_mut(EditableTable::CountryCalls)
        .add(fields([
            ("date", "03-02-2024"),
            ("country", "Chad"),
            ("sal_attendees", "JD, MK"),
        ]))
        .unwrap();
    assert_eq!(backend.sheet("calls_2024").unwrap().len(), 2);
    assert!(backend.sheet("country_calls").is_none());
}
