//! Locate, read and join the two source files.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tracing::{debug, info, warn};

use crate::dataset::{Dataset, LoadReport};
use crate::error::{PipelineError, PipelineResult};
use crate::record::{
    flag, non_empty, parse_date, parse_store_id, RawSalesRow, RawStoreRow, SalesRecord,
    StoreAttributes,
};
use crate::schema::Schema;

/// Individually logged bad rows before switching to a running count.
const MAX_LOGGED_ERRORS: usize = 10;

/// Resolved locations of the sales and store files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub sales: PathBuf,
    pub stores: PathBuf,
}

/// Return the first candidate directory holding both files.
pub fn locate_sources(
    candidates: &[PathBuf],
    sales_file: &str,
    store_file: &str,
) -> PipelineResult<SourcePaths> {
    for dir in candidates {
        let sales = dir.join(sales_file);
        let stores = dir.join(store_file);
        debug!(dir = %dir.display(), "probing data directory");
        if sales.is_file() && stores.is_file() {
            info!(dir = %dir.display(), "using data directory");
            return Ok(SourcePaths { sales, stores });
        }
    }
    Err(PipelineError::DataUnavailable {
        attempted: candidates.to_vec(),
    })
}

/// Read both files from disk and build the joined dataset.
pub fn load_dataset(paths: &SourcePaths) -> PipelineResult<Dataset> {
    let sales = File::open(&paths.sales)?;
    let stores = File::open(&paths.stores)?;
    load_from_readers(sales, &paths.sales, stores, &paths.stores)
}

/// Build the dataset from any pair of readers.
///
/// `sales_path` and `stores_path` only label diagnostics.
pub fn load_from_readers<S: Read, T: Read>(
    sales: S,
    sales_path: &Path,
    stores: T,
    stores_path: &Path,
) -> PipelineResult<Dataset> {
    let mut sales_reader = csv_reader(sales);
    let mut store_reader = csv_reader(stores);

    let schema = Schema::from_headers(
        &sales_reader.headers()?.clone(),
        sales_path,
        &store_reader.headers()?.clone(),
        stores_path,
    )?;

    let mut report = LoadReport::default();
    let stores = read_store_table(&mut store_reader, &mut report)?;

    let mut records = Vec::new();
    for result in sales_reader.deserialize::<RawSalesRow>() {
        report.rows_read += 1;
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                report.unreadable_rows += 1;
                if report.unreadable_rows <= MAX_LOGGED_ERRORS {
                    warn!(error = %e, "skipping unreadable sales row");
                }
                continue;
            }
        };

        let Some(store) = raw.store.as_deref().and_then(parse_store_id) else {
            report.bad_store_id += 1;
            continue;
        };
        let Some(date) = raw.date.as_deref().and_then(parse_date) else {
            report.bad_date += 1;
            continue;
        };
        // Without an Open column every row counts as trading.
        let open = !schema.open || raw.open == Some(1.0);
        if !open {
            report.closed += 1;
            continue;
        }

        let attributes = match stores.get(&store) {
            Some(attrs) => attrs.clone(),
            None => {
                report.unmatched_store += 1;
                StoreAttributes::default()
            }
        };

        let sales = raw.sales.filter(|s| s.is_finite());
        if sales.is_some_and(|s| s < 0.0) {
            report.negative_sales += 1;
        }

        records.push(SalesRecord {
            store,
            date,
            sales,
            customers: raw
                .customers
                .filter(|c| c.is_finite() && *c >= 0.0)
                .map(|c| c as u64),
            open,
            promo: raw.promo.and_then(flag),
            day_of_week: raw
                .day_of_week
                .filter(|d| (1.0..=7.0).contains(d) && d.fract() == 0.0)
                .map(|d| d as u8),
            state_holiday: non_empty(raw.state_holiday),
            school_holiday: raw.school_holiday.and_then(flag),
            attributes,
        });
    }

    log_report(&report, records.len());
    Ok(Dataset::with_report(records, schema, report))
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

fn read_store_table<R: Read>(
    reader: &mut csv::Reader<R>,
    report: &mut LoadReport,
) -> PipelineResult<AHashMap<i64, StoreAttributes>> {
    let mut stores = AHashMap::new();
    let mut unreadable = 0usize;

    for result in reader.deserialize::<RawStoreRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                unreadable += 1;
                if unreadable <= MAX_LOGGED_ERRORS {
                    warn!(error = %e, "skipping unreadable store row");
                }
                continue;
            }
        };
        let Some(id) = raw.store.as_deref().and_then(parse_store_id) else {
            unreadable += 1;
            continue;
        };
        if stores.contains_key(&id) {
            // First entry wins so the join stays many-to-one.
            report.duplicate_store_rows += 1;
            continue;
        }
        stores.insert(id, StoreAttributes::from_raw(raw));
    }

    if unreadable > 0 {
        warn!("{} store rows could not be read", unreadable);
    }
    debug!(stores = stores.len(), "store table loaded");
    Ok(stores)
}

fn log_report(report: &LoadReport, kept: usize) {
    if report.unreadable_rows > MAX_LOGGED_ERRORS {
        warn!("Total unreadable sales rows: {}", report.unreadable_rows);
    }
    if report.bad_store_id > 0 {
        warn!("Dropped {} rows with an invalid store id", report.bad_store_id);
    }
    if report.bad_date > 0 {
        warn!("Dropped {} rows with an unparseable date", report.bad_date);
    }
    if report.duplicate_store_rows > 0 {
        warn!(
            "Ignored {} duplicate store-table rows",
            report.duplicate_store_rows
        );
    }
    if report.negative_sales > 0 {
        warn!("{} rows carry negative sales; kept as-is", report.negative_sales);
    }
    if report.unmatched_store > 0 {
        info!(
            "{} rows have no store-table entry; attributes left empty",
            report.unmatched_store
        );
    }
    info!(
        read = report.rows_read,
        closed = report.closed,
        kept,
        "sales table loaded"
    );
}
