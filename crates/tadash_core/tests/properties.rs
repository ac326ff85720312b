//! Property tests for view selection and record edits.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use tadash_core::model::catalog::calendar_schema;
use tadash_core::model::value::DATE_FORMAT;
use tadash_core::{
    add_record, delete_records, fields, update_record, CellValue, FilterSpec, FilteredView,
    Selection, SortSpec, Table,
};

const ADVISORS: &[&str] = &["A", "B", "C"];
const TYPES: &[&str] = &["Leave", "Mission"];

#[derive(Debug, Clone)]
struct Entry {
    advisor: usize,
    entry_type: usize,
    start_offset: i64,
    length: i64,
}

fn arb_entry() -> impl Strategy<Value = Entry> {
    (0..ADVISORS.len(), 0..TYPES.len(), 0i64..400, 0i64..15).prop_map(
        |(advisor, entry_type, start_offset, length)| Entry {
            advisor,
            entry_type,
            start_offset,
            length,
        },
    )
}

fn day(offset: i64) -> String {
    let base = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    (base + Duration::days(offset)).format(DATE_FORMAT).to_string()
}

fn build(entries: &[Entry]) -> Table {
    let schema = calendar_schema(
        ADVISORS.iter().map(|name| name.to_string()).collect(),
        TYPES.iter().map(|name| name.to_string()).collect(),
    );
    let mut rows = vec![schema.header_row()];
    for (index, entry) in entries.iter().enumerate() {
        rows.push(vec![
            (index + 1).to_string(),
            ADVISORS[entry.advisor].to_string(),
            TYPES[entry.entry_type].to_string(),
            day(entry.start_offset),
            day(entry.start_offset + entry.length),
            String::new(),
        ]);
    }
    Table::from_rows(schema, &rows).unwrap().0
}

proptest! {
    #[test]
    fn apply_keeps_exactly_the_matching_records(
        entries in prop::collection::vec(arb_entry(), 0..30),
        allowed in prop::sample::subsequence(ADVISORS.to_vec(), 0..=ADVISORS.len()),
    ) {
        let table = build(&entries);
        let view = FilteredView::apply(&table, &FilterSpec::new().allow("advisor", allowed.clone()));

        let expected: Vec<_> = table
            .records()
            .iter()
            .filter(|record| allowed.iter().any(|name| record.get("advisor") == &CellValue::from(*name)))
            .map(|record| record.id())
            .collect();
        prop_assert_eq!(view.ids(), expected);
    }

    #[test]
    fn deleting_a_sorted_selection_removes_only_that_record(
        entries in prop::collection::vec(arb_entry(), 1..30),
        pick in any::<prop::sample::Index>(),
    ) {
        let table = build(&entries);
        let view = FilteredView::apply_sorted(
            &table,
            &FilterSpec::new(),
            &SortSpec::descending("start_date"),
        );
        let position = pick.index(view.len());
        let target = view.rows()[position].id();

        let selected = view.resolve(&Selection::rows([position])).unwrap();
        prop_assert_eq!(&selected, &vec![target]);

        let next = delete_records(&table, &selected).unwrap();
        prop_assert_eq!(next.len(), table.len() - 1);
        prop_assert!(!next.contains(target));
        for record in next.records() {
            prop_assert_eq!(Some(record), table.get(record.id()));
        }
    }

    #[test]
    fn add_then_delete_restores_the_records(
        entries in prop::collection::vec(arb_entry(), 0..20),
        added in arb_entry(),
    ) {
        let table = build(&entries);
        let (with_added, id) = add_record(
            &table,
            &fields([
                ("advisor", ADVISORS[added.advisor].to_string()),
                ("type", TYPES[added.entry_type].to_string()),
                ("start_date", day(added.start_offset)),
                ("end_date", day(added.start_offset + added.length)),
            ]),
        )
        .unwrap();
        prop_assert!(!table.contains(id));

        let restored = delete_records(&with_added, &[id]).unwrap();
        prop_assert_eq!(restored.records(), table.records());
    }

    #[test]
    fn update_touches_only_the_target_record(
        entries in prop::collection::vec(arb_entry(), 1..20),
        pick in any::<prop::sample::Index>(),
        remarks in "[a-z]{1,12}",
    ) {
        let table = build(&entries);
        let target = table.records()[pick.index(table.len())].id();
        let next = update_record(&table, target, &fields([("remarks", remarks.as_str())])).unwrap();

        prop_assert_eq!(next.len(), table.len());
        for (before, after) in table.records().iter().zip(next.records()) {
            prop_assert_eq!(before.id(), after.id());
            if after.id() == target {
                prop_assert_eq!(after.get("remarks"), &CellValue::from(remarks.as_str()));
                prop_assert_eq!(after.get("start_date"), before.get("start_date"));
            } else {
                prop_assert_eq!(before, after);
            }
        }
    }
}
