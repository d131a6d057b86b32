//! Error types for the sales pipeline

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Everything the loader, filter stage and exporter can fail with.
///
/// An empty aggregate is not represented here: filters that exclude every
/// row produce an empty [`crate::AggregateTable`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Neither candidate directory holds both source files
    #[error("train.csv / store.csv not found; tried:\n{}", list_paths(.attempted))]
    DataUnavailable {
        /// Every directory that was searched, in search order
        attempted: Vec<PathBuf>,
    },

    /// An optional column the requested view depends on is absent
    #[error("column `{column}` is not present in the data")]
    ColumnMissing {
        /// Source column name
        column: &'static str,
    },

    /// A required column is absent or the header is unreadable
    #[error("malformed source {}: {reason}", .path.display())]
    MalformedSource {
        /// File that failed validation
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Date range whose start lies after its end
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Requested first day
        start: NaiveDate,
        /// Requested last day
        end: NaiveDate,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Arrow / Parquet conversion or write failure
    #[error("export error: {0}")]
    Export(#[from] arrow2::error::Error),
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result alias used across the crate
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_unavailable_lists_every_location() {
        let err = PipelineError::DataUnavailable {
            attempted: vec![PathBuf::from("/a/data"), PathBuf::from("/b/data")],
        };
        let msg = err.to_string();
        assert!(msg.contains("/a/data"));
        assert!(msg.contains("/b/data"));
    }
}
