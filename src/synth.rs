//! Synthetic `train.csv` / `store.csv` generator for demos and tests.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use crate::error::PipelineResult;
use crate::loader::SourcePaths;

const STORE_TYPES: [&str; 4] = ["a", "b", "c", "d"];
const ASSORTMENTS: [&str; 3] = ["a", "b", "c"];
const STATE_HOLIDAYS: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthOptions {
    pub stores: u32,
    pub days: u32,
    pub start: NaiveDate,
    pub seed: u64,
    /// Highest-numbered stores left out of store.csv
    pub orphan_stores: u32,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            stores: 50,
            days: 90,
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            seed: 42,
            orphan_stores: 2,
        }
    }
}

#[derive(Serialize)]
struct TrainRow {
    #[serde(rename = "Store")]
    store: u32,
    #[serde(rename = "DayOfWeek")]
    day_of_week: u32,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Sales")]
    sales: u64,
    #[serde(rename = "Customers")]
    customers: u64,
    #[serde(rename = "Open")]
    open: u8,
    #[serde(rename = "Promo")]
    promo: u8,
    #[serde(rename = "StateHoliday")]
    state_holiday: &'static str,
    #[serde(rename = "SchoolHoliday")]
    school_holiday: u8,
}

#[derive(Serialize)]
struct StoreRow {
    #[serde(rename = "Store")]
    store: u32,
    #[serde(rename = "StoreType")]
    store_type: &'static str,
    #[serde(rename = "Assortment")]
    assortment: &'static str,
    #[serde(rename = "CompetitionDistance")]
    competition_distance: Option<u32>,
    #[serde(rename = "Promo2")]
    promo2: u8,
}

/// Write the store table. Stores above `stores - orphan_stores` are omitted.
pub fn write_stores<W: Write>(out: W, opts: &SynthOptions, rng: &mut StdRng) -> PipelineResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    let listed = opts.stores.saturating_sub(opts.orphan_stores);

    for store in 1..=listed {
        writer.serialize(StoreRow {
            store,
            store_type: STORE_TYPES.choose(rng).copied().unwrap_or("a"),
            assortment: ASSORTMENTS.choose(rng).copied().unwrap_or("a"),
            competition_distance: rng
                .random_bool(0.95)
                .then(|| rng.random_range(20..25_000)),
            promo2: u8::from(rng.random_bool(0.5)),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the daily sales table, one row per store per day.
pub fn write_train<W: Write>(out: W, opts: &SynthOptions, rng: &mut StdRng) -> PipelineResult<()> {
    let mut writer = csv::Writer::from_writer(out);

    // Per-store baseline so stores rank consistently.
    let baselines: Vec<f64> = (0..opts.stores)
        .map(|_| rng.random_range(3_000.0..9_000.0))
        .collect();

    for offset in 0..opts.days {
        let date = opts.start + Duration::days(i64::from(offset));
        let day_of_week = date.weekday().number_from_monday();
        let promo = day_of_week <= 5 && rng.random_bool(0.4);
        let holiday = rng
            .random_bool(0.03)
            .then(|| STATE_HOLIDAYS.choose(rng).copied().unwrap_or("a"));
        let school_holiday = u8::from(rng.random_bool(0.2));

        for store in 1..=opts.stores {
            let open = day_of_week != 7 && holiday.is_none() && !rng.random_bool(0.02);
            let (sales, customers) = if open {
                let weekday_factor = if day_of_week == 1 { 1.25 } else { 1.0 };
                let promo_factor = if promo { 1.3 } else { 1.0 };
                let noise = rng.random_range(0.8..1.2);
                let sales = baselines[(store - 1) as usize] * weekday_factor * promo_factor * noise;
                (sales.round() as u64, (sales / rng.random_range(8.0..11.0)).round() as u64)
            } else {
                (0, 0)
            };

            // ─────────────────────────────────────────────
            // A sprinkle of unparseable dates exercises the loader's coercion.
            // ─────────────────────────────────────────────
            let date = if rng.random_bool(0.001) {
                "n/a".to_string()
            } else {
                date.format("%Y-%m-%d").to_string()
            };

            writer.serialize(TrainRow {
                store,
                day_of_week,
                date,
                sales,
                customers,
                open: u8::from(open),
                promo: u8::from(promo),
                state_holiday: holiday.unwrap_or("0"),
                school_holiday,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Generate both files into `dir` and return their paths.
pub fn generate(dir: &Path, opts: &SynthOptions) -> PipelineResult<SourcePaths> {
    fs::create_dir_all(dir)?;
    let mut rng = StdRng::seed_from_u64(opts.seed);

    let paths = SourcePaths {
        sales: dir.join("train.csv"),
        stores: dir.join("store.csv"),
    };
    write_stores(fs::File::create(&paths.stores)?, opts, &mut rng)?;
    write_train(fs::File::create(&paths.sales)?, opts, &mut rng)?;

    info!(
        stores = opts.stores,
        days = opts.days,
        dir = %dir.display(),
        "generated synthetic dataset"
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_dataset;

    #[test]
    fn generated_data_loads_and_keeps_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let opts = SynthOptions {
            stores: 6,
            days: 14,
            ..SynthOptions::default()
        };
        let paths = generate(dir.path(), &opts).unwrap();
        let ds = load_dataset(&paths).unwrap();

        assert!(!ds.is_empty());
        assert_eq!(ds.report().rows_read, 6 * 14);
        assert!(ds.records().iter().all(|r| r.open));
        assert!(ds.records().iter().all(|r| r.day_of_week != Some(7)));

        let orphan = ds.records().iter().find(|r| r.store == 6).unwrap();
        assert_eq!(orphan.attributes.store_type, None);
        assert!(ds.schema().store_type && ds.schema().promo && ds.schema().day_of_week);
    }

    #[test]
    fn same_seed_same_output() {
        let opts = SynthOptions {
            stores: 3,
            days: 5,
            ..SynthOptions::default()
        };
        let render = || {
            let mut rng = StdRng::seed_from_u64(opts.seed);
            let mut buf = Vec::new();
            write_train(&mut buf, &opts, &mut rng).unwrap();
            buf
        };
        assert_eq!(render(), render());
    }
}
