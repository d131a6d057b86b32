//! Sales aggregation pipeline for the Rossmann store dataset.
//!
//! `train.csv` (daily sales) is left-joined with `store.csv` (store
//! attributes), narrowed by composable filters and reduced into the small
//! tables and KPI totals a dashboard draws from.
//!
//! ```rust,ignore
//! let paths = locate_sources(&cfg.data_dirs, &cfg.sales_file, &cfg.store_file)?;
//! let dataset = load_dataset(&paths)?;
//!
//! let view = FilterSet::new()
//!     .category(CategoryColumn::StoreType, ["a", "c"])
//!     .membership(MembershipColumn::Promo, [1])
//!     .apply(&dataset);
//!
//! let top = aggregate(&view, &AggregateQuery::new(GroupBy::One(Dimension::Store), Reduction::Sum).top(10))?;
//! ```

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod log;
pub mod record;
pub mod schema;
pub mod summary;
pub mod synth;
pub mod views;

pub use crate::aggregate::{
    aggregate, AggregateQuery, AggregateRow, AggregateTable, Dimension, GroupBy, KeyValue,
    Measure, Order, Reduction,
};
pub use crate::config::PipelineConfig;
pub use crate::dataset::{Dataset, FilteredView, LoadReport};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::export::{export_dashboard, table_to_arrow, write_parquet};
pub use crate::filter::{
    distinct_categories, store_picker_options, CategoryColumn, DateRange, FilterSet,
    MembershipColumn, Predicate,
};
pub use crate::loader::{load_dataset, load_from_readers, locate_sources, SourcePaths};
pub use crate::record::{SalesRecord, StoreAttributes};
pub use crate::schema::Schema;
pub use crate::summary::{distribution, summarize, BoxStats, Summary};
pub use crate::views::{build_view, build_views, Dashboard, RenderedView, ViewKind, ViewOutcome};
