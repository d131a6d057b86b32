//! Arrow conversion and Parquet output for computed views.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow2::array::{Array, BooleanArray, Float64Array, PrimitiveArray, UInt64Array, Utf8Array};
use arrow2::chunk::Chunk;
use arrow2::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow2::io::parquet::write::{
    transverse, CompressionOptions, Encoding, FileWriter, RowGroupIterator, Version, WriteOptions,
};
use chrono::NaiveDate;
use tracing::info;

use crate::aggregate::{AggregateTable, Dimension, KeyValue, Reduction};
use crate::error::PipelineResult;
use crate::summary::BoxStats;
use crate::views::{Dashboard, ViewOutcome};

static WRITE_OPTIONS: WriteOptions = WriteOptions {
    write_statistics: true,
    compression: CompressionOptions::Uncompressed,
    version: Version::V2,
    data_pagesize_limit: None,
};

/// An Arrow schema plus the single chunk holding the data.
pub type ArrowTable = (ArrowSchema, Chunk<Box<dyn Array>>);

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    date.signed_duration_since(epoch).num_days() as i32
}

fn key_column(dimension: Dimension, keys: &[&KeyValue]) -> (DataType, Box<dyn Array>) {
    match dimension {
        Dimension::Date => {
            let values: Vec<Option<i32>> = keys
                .iter()
                .map(|k| match k {
                    KeyValue::Date(d) => Some(days_since_epoch(*d)),
                    _ => None,
                })
                .collect();
            let array = PrimitiveArray::<i32>::from(values).to(DataType::Date32);
            (DataType::Date32, array.boxed())
        }
        Dimension::DayOfWeek | Dimension::Store => {
            let values: Vec<Option<i64>> = keys
                .iter()
                .map(|k| match k {
                    KeyValue::Int(v) => Some(*v),
                    _ => None,
                })
                .collect();
            (DataType::Int64, PrimitiveArray::<i64>::from(values).boxed())
        }
        Dimension::StoreType | Dimension::Assortment => {
            let values: Vec<Option<&str>> = keys
                .iter()
                .map(|k| match k {
                    KeyValue::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            (DataType::Utf8, Utf8Array::<i32>::from(values).boxed())
        }
        Dimension::Promo => {
            let values: Vec<Option<bool>> = keys
                .iter()
                .map(|k| match k {
                    KeyValue::Flag(b) => Some(*b),
                    _ => None,
                })
                .collect();
            (DataType::Boolean, BooleanArray::from(values).boxed())
        }
    }
}

fn value_column_name(table: &AggregateTable) -> String {
    let reduction = match table.reduction {
        Reduction::Sum => "sum",
        Reduction::Mean => "mean",
        Reduction::Count => "count",
    };
    format!("{}_{}", table.measure.column_name(), reduction)
}

/// One column per grouping dimension followed by the reduced value.
pub fn table_to_arrow(table: &AggregateTable) -> PipelineResult<ArrowTable> {
    let mut fields = Vec::with_capacity(table.dimensions.len() + 1);
    let mut arrays = Vec::with_capacity(table.dimensions.len() + 1);

    for (i, dimension) in table.dimensions.iter().enumerate() {
        let keys: Vec<&KeyValue> = table.rows.iter().filter_map(|r| r.key.get(i)).collect();
        let (data_type, array) = key_column(*dimension, &keys);
        fields.push(Field::new(dimension.column_name(), data_type, true));
        arrays.push(array);
    }

    let values: Vec<f64> = table.rows.iter().map(|r| r.value).collect();
    fields.push(Field::new(value_column_name(table), DataType::Float64, false));
    arrays.push(Float64Array::from_vec(values).boxed());

    Ok((ArrowSchema::from(fields), Chunk::try_new(arrays)?))
}

/// Box statistics as a flat table keyed by the group label.
pub fn distribution_to_arrow(groups: &[BoxStats]) -> PipelineResult<ArrowTable> {
    let labels: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
    let floats = |f: fn(&BoxStats) -> f64| -> Box<dyn Array> {
        Float64Array::from_vec(groups.iter().map(f).collect()).boxed()
    };

    let schema = ArrowSchema::from(vec![
        Field::new("group", DataType::Utf8, false),
        Field::new("count", DataType::UInt64, false),
        Field::new("min", DataType::Float64, false),
        Field::new("q1", DataType::Float64, false),
        Field::new("median", DataType::Float64, false),
        Field::new("q3", DataType::Float64, false),
        Field::new("max", DataType::Float64, false),
    ]);
    let arrays: Vec<Box<dyn Array>> = vec![
        Utf8Array::<i32>::from_slice(&labels).boxed(),
        UInt64Array::from_vec(groups.iter().map(|g| g.count as u64).collect()).boxed(),
        floats(|g| g.min),
        floats(|g| g.q1),
        floats(|g| g.median),
        floats(|g| g.q3),
        floats(|g| g.max),
    ];
    Ok((schema, Chunk::try_new(arrays)?))
}

/// Write one chunk as a single-row-group Parquet file.
pub fn write_parquet(path: &Path, table: ArrowTable) -> PipelineResult<()> {
    let (schema, chunk) = table;

    // ─────────────────────────────────────────────
    // Arrow chunk → Parquet row group (plain encoding per leaf column)
    // ─────────────────────────────────────────────
    let encodings = schema
        .fields
        .iter()
        .map(|f| transverse(&f.data_type, |_| Encoding::Plain))
        .collect();
    let row_groups =
        RowGroupIterator::try_new(vec![Ok(chunk)].into_iter(), &schema, WRITE_OPTIONS, encodings)?;

    // ─────────────────────────────────────────────
    // Initialize Parquet writer and write
    // ─────────────────────────────────────────────
    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(file, schema, WRITE_OPTIONS)?;
    for group in row_groups {
        writer.write(group?)?;
    }
    writer.end(None)?;
    Ok(())
}

/// Write every rendered view of `dashboard` under `dir`, one file per view.
///
/// Skipped views produce no file. Returns the written paths.
pub fn export_dashboard(dashboard: &Dashboard, dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for view in &dashboard.views {
        let table = match &view.outcome {
            ViewOutcome::Table(table) => table_to_arrow(table)?,
            ViewOutcome::Distribution { groups } => distribution_to_arrow(groups)?,
            ViewOutcome::Skipped { .. } => continue,
        };
        let path = dir.join(format!("{}.parquet", view.kind.slug()));
        write_parquet(&path, table)?;
        info!("Wrote Parquet file to {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregateRow, Measure};
    use arrow2::io::parquet::read::{infer_schema, read_metadata};

    fn daily() -> AggregateTable {
        let day = |d| NaiveDate::from_ymd_opt(2015, 1, d).unwrap();
        AggregateTable {
            dimensions: vec![Dimension::Date],
            measure: Measure::Sales,
            reduction: Reduction::Sum,
            rows: vec![
                AggregateRow {
                    key: vec![KeyValue::Date(day(1))],
                    value: 100.0,
                },
                AggregateRow {
                    key: vec![KeyValue::Date(day(2))],
                    value: 200.0,
                },
            ],
        }
    }

    #[test]
    fn aggregate_table_maps_to_typed_columns() {
        let (schema, chunk) = table_to_arrow(&daily()).unwrap();
        assert_eq!(schema.fields[0].name, "Date");
        assert_eq!(schema.fields[0].data_type, DataType::Date32);
        assert_eq!(schema.fields[1].name, "Sales_sum");
        assert_eq!(chunk.len(), 2);
    }

    #[test]
    fn parquet_round_trips_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.parquet");
        write_parquet(&path, table_to_arrow(&daily()).unwrap()).unwrap();

        let mut file = File::open(&path).unwrap();
        let metadata = read_metadata(&mut file).unwrap();
        assert_eq!(metadata.num_rows, 2);
        let schema = infer_schema(&metadata).unwrap();
        assert_eq!(schema.fields.len(), 2);
    }

    #[test]
    fn days_are_counted_from_unix_epoch() {
        assert_eq!(days_since_epoch(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
    }
}
