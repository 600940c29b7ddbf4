//! Export of ranking reports.
//!
//! Reports can be written as CSV (one line per company and metric), compact
//! or pretty JSON, or a plain text table.

use crate::report::RankingReport;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized output was not UTF-8.
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,

    /// Plain text table.
    Text,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
            Self::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty" => Ok(Self::PrettyJson),
            "text" | "txt" | "table" => Ok(Self::Text),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Flattened report line for CSV export.
#[derive(Debug, Serialize)]
struct ReportRecord<'a> {
    report_period: String,
    financial_name: &'a str,
    ranking: Option<u32>,
    company_name: &'a str,
    value: f64,
    display_value: f64,
    rank_delta: Option<i64>,
    change: &'a str,
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for RankingReport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let period = self.report_period.to_string();
                let mut wtr = csv::Writer::from_writer(vec![]);
                for section in &self.sections {
                    for row in &section.rows {
                        wtr.serialize(ReportRecord {
                            report_period: period.clone(),
                            financial_name: &section.financial_name,
                            ranking: row.ranking,
                            company_name: &row.company_name,
                            value: row.value,
                            display_value: row.display_value,
                            rank_delta: row.rank_delta,
                            change: &row.change,
                        })?;
                    }
                }
                let data = String::from_utf8(wtr.into_inner().map_err(|e| e.into_error())?)?;
                Ok(data)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Text => Ok(self.to_ascii_table()),
        }
    }
}
