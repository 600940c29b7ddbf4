//! Error types for metric configuration.

use standings_data::DataError;
use thiserror::Error;

/// Errors raised while building or validating the metric registry.
///
/// Every variant is a configuration error: the run must not start.
#[derive(Debug, Error)]
pub enum MetricError {
    /// Registry has no metrics
    #[error("Metric registry is empty")]
    EmptyRegistry,

    /// Metric name is empty or contains characters other than `[a-z0-9_]`
    #[error("Invalid metric name: {0:?}")]
    InvalidName(String),

    /// Same metric name registered twice
    #[error("Duplicate metric: {0}")]
    DuplicateMetric(String),

    /// Source table or column is not part of the raw fact schema
    #[error("Invalid source for metric {metric}: {source}")]
    InvalidSource {
        /// Metric being registered
        metric: String,
        /// Schema error
        #[source]
        source: DataError,
    },
}
