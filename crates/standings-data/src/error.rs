//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value could not be decoded
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Quarter number outside 1..=4
    #[error("Invalid quarter {0}: expected 1-4")]
    InvalidQuarter(u32),

    /// Report period could not be parsed or resolved
    #[error("Invalid report period: {0}")]
    InvalidPeriod(String),

    /// Table is not part of the raw fact schema
    #[error("Unknown source table: {0}")]
    UnknownTable(String),

    /// Column is not part of the table's schema
    #[error("Unknown column {column} in table {table}")]
    UnknownColumn {
        /// Table that was queried
        table: String,
        /// Column that was requested
        column: String,
    },
}

impl DataError {
    /// Whether this error stems from invalid configuration rather than the store.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuarter(_)
                | Self::InvalidPeriod(_)
                | Self::UnknownTable(_)
                | Self::UnknownColumn { .. }
        )
    }
}
