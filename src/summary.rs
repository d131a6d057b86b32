//! KPI totals and per-group distributions.

use ahash::AHashMap;
use serde::Serialize;

use crate::aggregate::{Dimension, KeyValue, Measure};
use crate::dataset::FilteredView;
use crate::error::PipelineResult;

/// Headline numbers for the current view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub total_sales: f64,
    /// Mean over rows with a sales value; 0 for an empty view
    pub mean_sales: f64,
    pub stores: usize,
    pub days: usize,
    pub rows: usize,
}

pub fn summarize(view: &FilteredView<'_>) -> Summary {
    let (total, count) = view
        .iter()
        .filter_map(|r| r.sales)
        .fold((0.0, 0u64), |(sum, n), s| (sum + s, n + 1));

    Summary {
        total_sales: total,
        mean_sales: if count == 0 { 0.0 } else { total / count as f64 },
        stores: view.distinct_stores().len(),
        days: view.distinct_days(),
        rows: view.len(),
    }
}

/// Five-number summary of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub key: KeyValue,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxStats {
    /// `None` for an empty sample. Sorts `values` in place.
    fn from_values(key: KeyValue, values: &mut [f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        Some(Self {
            key,
            count: values.len(),
            min: values[0],
            q1: quantile(values, 0.25),
            median: quantile(values, 0.5),
            q3: quantile(values, 0.75),
            max: values[values.len() - 1],
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty `values`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}

/// Distribution of `measure` within each value of `dimension`, key ascending.
pub fn distribution(
    view: &FilteredView<'_>,
    dimension: Dimension,
    measure: Measure,
) -> PipelineResult<Vec<BoxStats>> {
    let schema = view.schema();
    schema.ensure(dimension.column_name())?;
    schema.ensure(measure.column_name())?;

    let mut samples: AHashMap<KeyValue, Vec<f64>> = AHashMap::new();
    for record in view.iter() {
        if let (Some(key), Some(value)) = (dimension.key(record), measure.value(record)) {
            samples.entry(key).or_default().push(value);
        }
    }

    let mut stats: Vec<BoxStats> = samples
        .into_iter()
        .filter_map(|(key, mut values)| BoxStats::from_values(key, &mut values))
        .collect();
    stats.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(stats)
}
