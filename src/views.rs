//! The dashboard's canonical views.

use serde::Serialize;
use tracing::info;

use crate::aggregate::{
    aggregate, AggregateQuery, AggregateTable, Dimension, GroupBy, Measure, Reduction,
};
use crate::dataset::FilteredView;
use crate::error::{PipelineError, PipelineResult};
use crate::summary::{distribution, summarize, BoxStats, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViewKind {
    DailySales,
    DayOfWeek,
    PromoDistribution,
    StoreTypePerformance,
    TopStores,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::DailySales,
        ViewKind::DayOfWeek,
        ViewKind::PromoDistribution,
        ViewKind::StoreTypePerformance,
        ViewKind::TopStores,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::DailySales => "Total Sales Over Time",
            ViewKind::DayOfWeek => "Sales by Day of Week",
            ViewKind::PromoDistribution => "Promo vs No Promo (Sales Distribution)",
            ViewKind::StoreTypePerformance => "StoreType Performance (Avg Sales)",
            ViewKind::TopStores => "Top Stores (by Total Sales)",
        }
    }

    /// File stem used when the view is exported.
    pub fn slug(self) -> &'static str {
        match self {
            ViewKind::DailySales => "daily_sales",
            ViewKind::DayOfWeek => "day_of_week",
            ViewKind::PromoDistribution => "promo_distribution",
            ViewKind::StoreTypePerformance => "store_type_performance",
            ViewKind::TopStores => "top_stores",
        }
    }

    /// Query behind a tabular view; `None` for the distribution view.
    pub fn query(self, top_n: usize) -> Option<AggregateQuery> {
        let query = match self {
            ViewKind::DailySales => {
                AggregateQuery::new(GroupBy::One(Dimension::Date), Reduction::Sum)
            }
            ViewKind::DayOfWeek => {
                AggregateQuery::new(GroupBy::One(Dimension::DayOfWeek), Reduction::Sum)
            }
            ViewKind::PromoDistribution => return None,
            ViewKind::StoreTypePerformance => {
                AggregateQuery::new(GroupBy::One(Dimension::StoreType), Reduction::Mean)
                    .descending()
            }
            ViewKind::TopStores => {
                AggregateQuery::new(GroupBy::One(Dimension::Store), Reduction::Sum).top(top_n)
            }
        };
        Some(query)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewOutcome {
    Table(AggregateTable),
    Distribution { groups: Vec<BoxStats> },
    /// An optional column the view needs is absent.
    Skipped { notice: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView {
    pub kind: ViewKind,
    pub title: &'static str,
    pub outcome: ViewOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub summary: Summary,
    pub views: Vec<RenderedView>,
}

/// Compute a single view. Missing columns become a `Skipped` outcome.
pub fn build_view(
    view: &FilteredView<'_>,
    kind: ViewKind,
    top_n: usize,
) -> PipelineResult<ViewOutcome> {
    let result = match kind.query(top_n) {
        Some(query) => aggregate(view, &query).map(ViewOutcome::Table),
        None => distribution(view, Dimension::Promo, Measure::Sales)
            .map(|groups| ViewOutcome::Distribution { groups }),
    };

    match result {
        Ok(outcome) => Ok(outcome),
        Err(PipelineError::ColumnMissing { column }) => {
            info!(view = kind.slug(), column, "skipping view");
            Ok(ViewOutcome::Skipped {
                notice: format!("No {column} column in the data."),
            })
        }
        Err(e) => Err(e),
    }
}

/// KPIs plus every canonical view, in dashboard order.
pub fn build_views(view: &FilteredView<'_>, top_n: usize) -> PipelineResult<Dashboard> {
    let views = ViewKind::ALL
        .into_iter()
        .map(|kind| {
            Ok(RenderedView {
                kind,
                title: kind.title(),
                outcome: build_view(view, kind, top_n)?,
            })
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    Ok(Dashboard {
        summary: summarize(view),
        views,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::record::SalesRecord;
    use crate::schema::Schema;
    use chrono::NaiveDate;

    fn dataset(schema: Schema) -> Dataset {
        let day = |d| NaiveDate::from_ymd_opt(2015, 1, d).unwrap();
        let records = (1..=12u32)
            .map(|i| {
                let mut r = SalesRecord::new(i64::from(i), day(i % 5 + 1), f64::from(i) * 10.0);
                r.promo = Some(i % 2 == 0);
                r.day_of_week = Some((i % 7 + 1) as u8);
                r.attributes.store_type = Some(if i < 6 { "a" } else { "b" }.to_owned());
                r
            })
            .collect();
        Dataset::new(records, schema)
    }

    #[test]
    fn all_views_render_with_full_schema() {
        let ds = dataset(Schema {
            promo: true,
            day_of_week: true,
            store_type: true,
            ..Schema::default()
        });
        let dash = build_views(&ds.view(), 10).unwrap();
        assert_eq!(dash.views.len(), 5);
        assert!(dash
            .views
            .iter()
            .all(|v| !matches!(v.outcome, ViewOutcome::Skipped { .. })));

        match &dash.views[4].outcome {
            ViewOutcome::Table(t) => {
                assert_eq!(t.len(), 10);
                assert_eq!(t.rows[0].key, vec![crate::aggregate::KeyValue::Int(12)]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(dash.summary.total_sales, 780.0);
    }

    #[test]
    fn missing_optional_columns_skip_their_views() {
        let ds = dataset(Schema::default());
        let dash = build_views(&ds.view(), 10).unwrap();
        let skipped: Vec<_> = dash
            .views
            .iter()
            .filter(|v| matches!(v.outcome, ViewOutcome::Skipped { .. }))
            .map(|v| v.kind)
            .collect();
        assert_eq!(
            skipped,
            vec![
                ViewKind::DayOfWeek,
                ViewKind::PromoDistribution,
                ViewKind::StoreTypePerformance
            ]
        );
    }
}
