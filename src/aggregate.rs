//! Group-and-reduce over a filtered view.
//!
//! Rows are bucketed by one or two dimensions and a single measure is reduced
//! per bucket. Rows whose key or measure is null sit out; a bucket exists only
//! when at least one of its rows carries a value.

use std::fmt;

use ahash::AHashMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::FilteredView;
use crate::error::PipelineResult;
use crate::record::SalesRecord;
use crate::schema::{self, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Date,
    DayOfWeek,
    StoreType,
    Assortment,
    Promo,
    Store,
}

impl Dimension {
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::Date => schema::DATE,
            Dimension::DayOfWeek => schema::DAY_OF_WEEK,
            Dimension::StoreType => schema::STORE_TYPE,
            Dimension::Assortment => schema::ASSORTMENT,
            Dimension::Promo => schema::PROMO,
            Dimension::Store => schema::STORE,
        }
    }

    pub fn key(self, record: &SalesRecord) -> Option<KeyValue> {
        match self {
            Dimension::Date => Some(KeyValue::Date(record.date)),
            Dimension::DayOfWeek => record.day_of_week.map(|d| KeyValue::Int(i64::from(d))),
            Dimension::StoreType => record.attributes.store_type.clone().map(KeyValue::Text),
            Dimension::Assortment => record.attributes.assortment.clone().map(KeyValue::Text),
            Dimension::Promo => record.promo.map(KeyValue::Flag),
            Dimension::Store => Some(KeyValue::Int(record.store)),
        }
    }
}

/// One grouping-key component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Date(NaiveDate),
    Text(String),
    Flag(bool),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Date(d) => write!(f, "{d}"),
            KeyValue::Text(s) => f.write_str(s),
            KeyValue::Flag(true) => f.write_str("Promo"),
            KeyValue::Flag(false) => f.write_str("No Promo"),
        }
    }
}

/// Grouping key of one or two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    One(Dimension),
    Two(Dimension, Dimension),
}

impl GroupBy {
    pub fn dimensions(self) -> Vec<Dimension> {
        match self {
            GroupBy::One(d) => vec![d],
            GroupBy::Two(a, b) => vec![a, b],
        }
    }

    fn key(self, record: &SalesRecord) -> Option<Vec<KeyValue>> {
        match self {
            GroupBy::One(d) => Some(vec![d.key(record)?]),
            GroupBy::Two(a, b) => Some(vec![a.key(record)?, b.key(record)?]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measure {
    Sales,
    Customers,
}

impl Measure {
    pub fn column_name(self) -> &'static str {
        match self {
            Measure::Sales => schema::SALES,
            Measure::Customers => schema::CUSTOMERS,
        }
    }

    pub fn value(self, record: &SalesRecord) -> Option<f64> {
        match self {
            Measure::Sales => record.sales,
            Measure::Customers => record.customers.map(|c| c as f64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reduction {
    Sum,
    Mean,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Ascending by grouping key.
    KeyAscending,
    /// Descending by reduced value, optionally truncated to the first `limit`.
    ValueDescending { limit: Option<usize> },
}

/// What to compute for one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub group_by: GroupBy,
    pub measure: Measure,
    pub reduction: Reduction,
    pub order: Order,
}

impl AggregateQuery {
    /// Reduce sales over `group_by`, ordered by key.
    pub fn new(group_by: GroupBy, reduction: Reduction) -> Self {
        Self {
            group_by,
            measure: Measure::Sales,
            reduction,
            order: Order::KeyAscending,
        }
    }

    pub fn measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    pub fn descending(mut self) -> Self {
        self.order = Order::ValueDescending { limit: None };
        self
    }

    /// Largest `n` groups by value.
    pub fn top(mut self, n: usize) -> Self {
        self.order = Order::ValueDescending { limit: Some(n) };
        self
    }

    /// `ColumnMissing` for the first referenced column absent from `schema`.
    pub fn check(&self, schema: &Schema) -> PipelineResult<()> {
        for d in self.group_by.dimensions() {
            schema.ensure(d.column_name())?;
        }
        schema.ensure(self.measure.column_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: Vec<KeyValue>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub dimensions: Vec<Dimension>,
    pub measure: Measure,
    pub reduction: Reduction,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the reduced column.
    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.value).sum()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
}

impl Accumulator {
    fn finish(self, reduction: Reduction) -> f64 {
        match reduction {
            Reduction::Sum => self.sum,
            Reduction::Mean => self.sum / self.count as f64,
            Reduction::Count => self.count as f64,
        }
    }
}

/// Group `view` and reduce per `query`.
///
/// Fails only with `ColumnMissing`; an empty view yields an empty table.
pub fn aggregate(view: &FilteredView<'_>, query: &AggregateQuery) -> PipelineResult<AggregateTable> {
    query.check(view.schema())?;

    // First-appearance order is kept so the later stable sort breaks ties by it.
    let mut index: AHashMap<Vec<KeyValue>, usize> = AHashMap::new();
    let mut groups: Vec<(Vec<KeyValue>, Accumulator)> = Vec::new();

    for record in view.iter() {
        let Some(key) = query.group_by.key(record) else {
            continue;
        };
        // Null measures still open a sum/count group at 0; a mean needs a value.
        let value = query.measure.value(record);
        if value.is_none() && query.reduction == Reduction::Mean {
            continue;
        }
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, Accumulator::default()));
                groups.len() - 1
            }
        };
        if let Some(value) = value {
            let acc = &mut groups[slot].1;
            acc.sum += value;
            acc.count += 1;
        }
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(key, acc)| AggregateRow {
            key,
            value: acc.finish(query.reduction),
        })
        .collect();

    match query.order {
        Order::KeyAscending => rows.sort_by(|a, b| a.key.cmp(&b.key)),
        Order::ValueDescending { limit } => {
            rows.sort_by(|a, b| b.value.total_cmp(&a.value));
            if let Some(n) = limit {
                rows.truncate(n);
            }
        }
    }

    debug!(
        input = view.len(),
        groups = rows.len(),
        "aggregated {:?} of {:?}",
        query.reduction,
        query.measure
    );

    Ok(AggregateTable {
        dimensions: query.group_by.dimensions(),
        measure: query.measure,
        reduction: query.reduction,
        rows,
    })
}
