//! End-to-end checks of load → filter → aggregate.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rossmann_sales::synth::{self, SynthOptions};
use rossmann_sales::{
    aggregate, build_views, export_dashboard, load_dataset, load_from_readers, summarize,
    AggregateQuery, CategoryColumn, Dataset, DateRange, Dimension, FilterSet, GroupBy, KeyValue,
    MembershipColumn, Reduction, ViewOutcome,
};
use rstest::*;
use tempfile::TempDir;

fn load(train: &str, stores: &str) -> Dataset {
    load_from_readers(
        train.as_bytes(),
        Path::new("train.csv"),
        stores.as_bytes(),
        Path::new("store.csv"),
    )
    .expect("in-memory load")
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Synthetic dataset on disk, shared by the tests below
#[fixture]
fn synthetic() -> (Dataset, TempDir) {
    let dir = TempDir::new().unwrap();
    let opts = SynthOptions {
        stores: 12,
        days: 60,
        ..SynthOptions::default()
    };
    let paths = synth::generate(dir.path(), &opts).unwrap();
    (load_dataset(&paths).unwrap(), dir)
}

#[test]
fn two_row_example_sums_to_300() {
    let ds = load(
        "Store,Date,Sales\n1,2015-01-01,100\n1,2015-01-02,200\n",
        "Store,StoreType\n1,a\n",
    );
    let table = aggregate(
        &ds.view(),
        &AggregateQuery::new(GroupBy::One(Dimension::Date), Reduction::Sum),
    )
    .unwrap();

    let rows: Vec<_> = table.rows.iter().map(|r| (r.key[0].clone(), r.value)).collect();
    assert_eq!(
        rows,
        vec![
            (KeyValue::Date(date("2015-01-01")), 100.0),
            (KeyValue::Date(date("2015-01-02")), 200.0),
        ]
    );
    assert_eq!(table.total(), 300.0);
    assert_eq!(summarize(&ds.view()).total_sales, 300.0);
}

#[test]
fn left_join_keeps_unmatched_store_rows() {
    let ds = load(
        "Store,Date,Sales,Open\n1,2015-01-01,100,1\n99,2015-01-01,50,1\n",
        "Store,StoreType,Assortment,CompetitionDistance\n1,a,c,500\n",
    );
    assert_eq!(ds.len(), 2);
    let orphan = ds.records().iter().find(|r| r.store == 99).unwrap();
    assert_eq!(orphan.attributes.store_type, None);
    assert_eq!(orphan.attributes.assortment, None);
    assert_eq!(orphan.attributes.competition_distance, None);
}

#[rstest]
fn day_of_week_partition_preserves_total(synthetic: (Dataset, TempDir)) {
    let (ds, _dir) = synthetic;
    let view = ds.view();
    let table = aggregate(
        &view,
        &AggregateQuery::new(GroupBy::One(Dimension::DayOfWeek), Reduction::Sum),
    )
    .unwrap();

    let total = summarize(&view).total_sales;
    assert!((table.total() - total).abs() < 1e-6);
    assert!(table.len() <= 7);
}

#[rstest]
fn top_n_is_bounded_sorted_and_unique(synthetic: (Dataset, TempDir)) {
    let (ds, _dir) = synthetic;
    let table = aggregate(
        &ds.view(),
        &AggregateQuery::new(GroupBy::One(Dimension::Store), Reduction::Sum).top(5),
    )
    .unwrap();

    assert_eq!(table.len(), 5);
    assert!(table.rows.windows(2).all(|w| w[0].value >= w[1].value));
    let mut keys: Vec<_> = table.rows.iter().map(|r| r.key.clone()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 5);
}

#[rstest]
fn empty_category_selection_changes_nothing(synthetic: (Dataset, TempDir)) {
    let (ds, _dir) = synthetic;
    let baseline = FilterSet::new()
        .membership(MembershipColumn::Promo, [1])
        .apply(&ds);
    let with_empty = FilterSet::new()
        .membership(MembershipColumn::Promo, [1])
        .category(CategoryColumn::StoreType, Vec::<String>::new())
        .category(CategoryColumn::Assortment, Vec::<String>::new())
        .apply(&ds);

    let a: Vec<_> = baseline.iter().collect();
    let b: Vec<_> = with_empty.iter().collect();
    assert_eq!(a, b);
}

#[rstest]
fn filters_that_exclude_everything_give_empty_views(synthetic: (Dataset, TempDir)) {
    let (ds, _dir) = synthetic;
    let view = FilterSet::new()
        .category(CategoryColumn::StoreType, ["no-such-type"])
        .apply(&ds);
    assert!(view.is_empty());

    let dashboard = build_views(&view, 10).unwrap();
    assert_eq!(dashboard.summary.total_sales, 0.0);
    for v in &dashboard.views {
        match &v.outcome {
            ViewOutcome::Table(t) => assert!(t.is_empty()),
            ViewOutcome::Distribution { groups } => assert!(groups.is_empty()),
            ViewOutcome::Skipped { notice } => panic!("unexpected skip: {notice}"),
        }
    }
}

#[rstest]
fn dashboard_exports_one_file_per_view(synthetic: (Dataset, TempDir)) {
    let (ds, dir) = synthetic;
    let dashboard = build_views(&ds.view(), 10).unwrap();
    let written = export_dashboard(&dashboard, &dir.path().join("export")).unwrap();
    assert_eq!(written.len(), 5);
    assert!(written.iter().all(|p| p.is_file()));
}

fn proptest_dataset() -> Dataset {
    let start = date("2015-01-01");
    let mut train = String::from("Store,DayOfWeek,Date,Sales,Open\n");
    for offset in 0..40i64 {
        let d = start + Duration::days(offset);
        for store in 1..=3 {
            train.push_str(&format!(
                "{store},{},{},{},1\n",
                offset % 7 + 1,
                d.format("%Y-%m-%d"),
                100 * store + offset
            ));
        }
    }
    load(&train, "Store\n1\n2\n3\n")
}

proptest! {
    #[test]
    fn date_filter_stays_inside_interval(a in 0i64..40, len in 0i64..40) {
        let ds = proptest_dataset();
        let start = date("2015-01-01") + Duration::days(a);
        let end = start + Duration::days(len);
        let range = DateRange::new(start, end).unwrap();

        let view = FilterSet::new().date_range(range).apply(&ds);
        prop_assert!(view.iter().all(|r| start <= r.date && r.date <= end));

        let expected = ds.records().iter().filter(|r| range.contains(r.date)).count();
        prop_assert_eq!(view.len(), expected);
    }

    #[test]
    fn top_n_never_exceeds_n(n in 0usize..6) {
        let ds = proptest_dataset();
        let table = aggregate(
            &ds.view(),
            &AggregateQuery::new(GroupBy::One(Dimension::Store), Reduction::Sum).top(n),
        )
        .unwrap();
        prop_assert!(table.len() <= n);
        prop_assert!(table.rows.windows(2).all(|w| w[0].value >= w[1].value));
    }
}
