//! The loaded dataset and borrowed views over it.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::SalesRecord;
use crate::schema::Schema;

/// Row accounting from a load, logged once and kept for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub unreadable_rows: usize,
    pub bad_store_id: usize,
    pub bad_date: usize,
    pub closed: usize,
    /// Kept rows whose store id has no entry in the store table
    pub unmatched_store: usize,
    pub duplicate_store_rows: usize,
    /// Kept rows carrying a negative Sales value
    pub negative_sales: usize,
}

/// The joined, open-only record set.
///
/// Built once by [`crate::load_dataset`] and handed by reference to every
/// filter and aggregate call. Nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<SalesRecord>,
    schema: Schema,
    report: LoadReport,
}

impl Dataset {
    pub fn new(records: Vec<SalesRecord>, schema: Schema) -> Self {
        let report = LoadReport {
            rows_read: records.len(),
            ..LoadReport::default()
        };
        Self::with_report(records, schema, report)
    }

    pub fn with_report(records: Vec<SalesRecord>, schema: Schema, report: LoadReport) -> Self {
        Self {
            records,
            schema,
            report,
        }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest date, `None` for an empty dataset.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.view().date_bounds()
    }

    /// A view over every row.
    pub fn view(&self) -> FilteredView<'_> {
        FilteredView {
            dataset: self,
            rows: (0..self.records.len()).collect(),
        }
    }
}

/// A subset of a [`Dataset`]'s rows, in original row order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn schema(&self) -> &'a Schema {
        &self.dataset.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a SalesRecord> + '_ {
        let records: &'a [SalesRecord] = &self.dataset.records;
        self.rows.iter().map(move |&i| &records[i])
    }

    /// Keep only the rows matching `keep`. Row order is preserved.
    pub fn retain<F>(&self, mut keep: F) -> FilteredView<'a>
    where
        F: FnMut(&SalesRecord) -> bool,
    {
        let records: &'a [SalesRecord] = &self.dataset.records;
        FilteredView {
            dataset: self.dataset,
            rows: self
                .rows
                .iter()
                .copied()
                .filter(|&i| keep(&records[i]))
                .collect(),
        }
    }

    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.iter().map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Distinct store ids, ascending.
    pub fn distinct_stores(&self) -> Vec<i64> {
        self.iter()
            .map(|r| r.store)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn distinct_days(&self) -> usize {
        self.iter().map(|r| r.date).collect::<BTreeSet<_>>().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, d).unwrap()
    }

    fn sample() -> Dataset {
        Dataset::new(
            vec![
                SalesRecord::new(2, day(3), 10.0),
                SalesRecord::new(1, day(1), 20.0),
                SalesRecord::new(2, day(2), 30.0),
            ],
            Schema::default(),
        )
    }

    #[test]
    fn view_starts_with_every_row() {
        let ds = sample();
        let view = ds.view();
        assert_eq!(view.len(), 3);
        assert_eq!(ds.date_bounds(), Some((day(1), day(3))));
        assert_eq!(view.distinct_stores(), vec![1, 2]);
        assert_eq!(view.distinct_days(), 3);
    }

    #[test]
    fn retain_keeps_row_order_and_leaves_dataset_alone() {
        let ds = sample();
        let narrowed = ds.view().retain(|r| r.store == 2);
        let dates: Vec<_> = narrowed.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(3), day(2)]);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn empty_view_has_no_bounds() {
        let ds = sample();
        let none = ds.view().retain(|_| false);
        assert!(none.is_empty());
        assert_eq!(none.date_bounds(), None);
    }
}
