use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use visitboard_lib::access::{allowed_partitions, PartitionChoice};
use visitboard_lib::auth::{Grant, Identity};
use visitboard_lib::dates::{format_canonical, normalize};
use visitboard_lib::pipeline::{filter, DateRange};
use visitboard_lib::types::{Dataset, DatedRecord, Record, Schema};
use visitboard_lib::views::{missing_field_counts, MANAGEMENT_VIEW};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn day(offset: u64) -> NaiveDate {
    base().checked_add_days(Days::new(offset)).unwrap()
}

fn identity(grant: Grant) -> Identity {
    Identity {
        name: "user".to_string(),
        grant,
    }
}

proptest! {
    #[test]
    fn prop_full_date_ignores_reference_year(offset in 0u64..40_000, year in 1900i32..2200) {
        let date = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap() + Days::new(offset);
        let raw = date.format("%Y-%m-%d").to_string();
        prop_assert_eq!(normalize(Some(&raw), year), Some(date));
        prop_assert_eq!(normalize(Some(&raw), year), normalize(Some(&raw), 2025));
    }

    #[test]
    fn prop_month_day_uses_reference_year(month in 1u32..=12, dom in 1u32..=31, year in 1901i32..2199) {
        let raw = format!("{}/{}", month, dom);
        prop_assert_eq!(normalize(Some(&raw), year), NaiveDate::from_ymd_opt(year, month, dom));
    }

    #[test]
    fn prop_canonical_form_is_fixed_point(offset in 0u64..40_000, year in 1900i32..2200) {
        let date = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap() + Days::new(offset);
        let once = format_canonical(date);
        let again = normalize(Some(&once), year).map(format_canonical);
        prop_assert_eq!(again, Some(once));
    }

    #[test]
    fn prop_wildcard_sees_all_plus_every_partition(parts in prop::collection::btree_set("[a-z]{1,4}", 0..8)) {
        let parts: Vec<String> = parts.into_iter().collect();
        let offered = allowed_partitions(&identity(Grant::All), &parts);
        prop_assert_eq!(offered.len(), parts.len() + 1);
        prop_assert_eq!(&offered[0], &PartitionChoice::All);
    }

    #[test]
    fn prop_restricted_sees_only_granted(
        parts in prop::collection::btree_set("[a-e]", 0..5),
        granted in prop::collection::vec("[a-e]", 0..4),
    ) {
        let parts: Vec<String> = parts.into_iter().collect();
        let offered = allowed_partitions(&identity(Grant::Stores(granted.clone())), &parts);
        prop_assert!(!offered.is_empty());
        if offered == vec![PartitionChoice::NoAccess] {
            prop_assert!(!parts.iter().any(|p| granted.contains(p)));
        } else {
            for choice in &offered {
                match choice {
                    PartitionChoice::Store(s) => {
                        prop_assert!(granted.contains(s));
                        prop_assert!(parts.contains(s));
                    }
                    other => prop_assert!(false, "unexpected option {:?}", other),
                }
            }
        }
    }

    #[test]
    fn prop_filter_sorted_and_in_range(
        rows in prop::collection::vec((prop::bool::ANY, prop::option::of(0u64..60)), 0..40),
        a in 0u64..60,
        b in 0u64..60,
    ) {
        let records: Vec<Record> = rows
            .iter()
            .map(|(in_a, _)| Record::from_cells(["x", if *in_a { "A" } else { "B" }]))
            .collect();
        let dated: Vec<DatedRecord<'_>> = records
            .iter()
            .zip(&rows)
            .map(|(record, (_, offset))| DatedRecord { record, date: offset.map(day) })
            .collect();
        let range = DateRange::new(day(a), day(b));

        let out = filter(&dated, 1, &PartitionChoice::Store("A".into()), Some(range), true);

        for pair in out.windows(2) {
            prop_assert!(pair[0].date >= pair[1].date);
        }
        for (i, row) in out.iter().enumerate() {
            prop_assert_eq!(row.ordinal, i + 1);
            prop_assert_eq!(row.record.cell(1), Some("A"));
            prop_assert!(row.date.is_some_and(|d| range.contains(d)));
        }
        let expected = rows
            .iter()
            .filter(|(in_a, offset)| *in_a && offset.is_some_and(|o| range.contains(day(o))))
            .count();
        prop_assert_eq!(out.len(), expected);
    }

    #[test]
    fn prop_missing_counts_match_absent_cells(
        filled in prop::collection::vec(prop::collection::vec(prop::bool::ANY, 18), 0..20),
    ) {
        let records: Vec<Record> = filled
            .iter()
            .map(|row| Record::from_cells(row.iter().map(|f| if *f { "v" } else { " " })))
            .collect();
        let dataset = Dataset {
            headers: (0..18).map(|i| format!("h{}", i)).collect(),
            schema: Schema::default(),
            records,
            dropped_rows: 0,
        };
        let dated: Vec<DatedRecord<'_>> = dataset
            .records
            .iter()
            .map(|record| DatedRecord { record, date: None })
            .collect();
        let rows = filter(&dated, 3, &PartitionChoice::All, None, false);

        for count in missing_field_counts(&rows, &MANAGEMENT_VIEW, &dataset) {
            let absent = filled.iter().filter(|row| !row[count.position]).count();
            prop_assert_eq!(count.count, absent);
        }
    }
}
