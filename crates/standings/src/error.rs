//! Engine error types.

use standings_data::{DataError, ReportPeriod};
use standings_metrics::MetricError;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the ranking engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required raw field is absent; the company is skipped for the period.
    #[error("Missing {field} for {company} in {period}")]
    MissingInputData {
        /// Company being processed
        company: String,
        /// Period being processed
        period: ReportPeriod,
        /// Absent field
        field: &'static str,
    },

    /// Store read or write failed; the current phase is rolled back.
    #[error("Store error: {0}")]
    Store(#[source] DataError),

    /// Invalid registry entry, period or source expression.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Whether the run can continue past this error.
    pub const fn is_skippable(&self) -> bool {
        matches!(self, Self::MissingInputData { .. })
    }
}

impl From<DataError> for EngineError {
    fn from(err: DataError) -> Self {
        if err.is_configuration() {
            Self::Configuration(err.to_string())
        } else {
            Self::Store(err)
        }
    }
}

impl From<MetricError> for EngineError {
    fn from(err: MetricError) -> Self {
        Self::Configuration(err.to_string())
    }
}
