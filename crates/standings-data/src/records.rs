//! Records read and written by the store.

use crate::error::{DataError, Result};
use crate::period::ReportPeriod;
use crate::schema::SourceTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a raw fact table, as delivered by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFact {
    /// Table the fact belongs to
    pub table: SourceTable,
    /// Company name
    pub company_name: String,
    /// Report period
    pub report_period: ReportPeriod,
    /// Numeric fields by column name
    pub values: BTreeMap<String, f64>,
    /// Text fields by column name
    pub labels: BTreeMap<String, String>,
}

impl RawFact {
    /// Create an empty fact for a company and period.
    pub fn new(
        table: SourceTable,
        company_name: impl Into<String>,
        report_period: ReportPeriod,
    ) -> Self {
        Self {
            table,
            company_name: company_name.into(),
            report_period,
            values: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Set a numeric field.
    pub fn value(mut self, column: impl Into<String>, value: f64) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    /// Set a text field.
    pub fn label(mut self, column: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(column.into(), label.into());
        self
    }
}

/// Balance-sheet and income inputs of one company for one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetFact {
    /// Company name
    pub company_name: String,
    /// Fiscal-year-end month label as disclosed
    pub fiscal_month: Option<String>,
    /// Total assets
    pub total_assets: Option<f64>,
    /// Total equity
    pub total_equity: Option<f64>,
    /// Net income, possibly cumulative
    pub net_income: Option<f64>,
}

/// How the stored net income relates to the disclosed figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStatus {
    /// Fiscal year is calendar-aligned; disclosed figure used as-is.
    NotRequired,
    /// Cumulative baseline subtracted.
    Adjusted,
    /// Cumulative figure kept because a baseline was missing.
    Unnormalized,
}

impl NormalizationStatus {
    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::NotRequired => "not_required",
            Self::Adjusted => "adjusted",
            Self::Unnormalized => "unnormalized",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "not_required" => Ok(Self::NotRequired),
            "adjusted" => Ok(Self::Adjusted),
            "unnormalized" => Ok(Self::Unnormalized),
            _ => Err(DataError::Parse(format!("Invalid normalization status: {}", s))),
        }
    }
}

/// Normalized income and return ratios of one company for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedMetric {
    /// Report period
    pub report_period: ReportPeriod,
    /// Company name
    pub company_name: String,
    /// Quarter number of the period
    pub quarter_num: u8,
    /// Fiscal-year-end month label
    pub fiscal_month: Option<String>,
    /// Total equity at period end
    pub total_equity: f64,
    /// Total assets at period end
    pub total_assets: f64,
    /// Total equity at the prior fiscal year end
    pub prev_total_equity: Option<f64>,
    /// Total assets at the prior fiscal year end
    pub prev_total_assets: Option<f64>,
    /// Quarter-comparable net income
    pub net_income: f64,
    /// Net income as disclosed
    pub current_net_income: f64,
    /// Net income disclosed at the prior fiscal year end
    pub prev_net_income: Option<f64>,
    /// Net income disclosed for Q1 of the same year
    pub current_q1_net_income: Option<f64>,
    /// Whether and how net income was normalized
    pub normalization: NormalizationStatus,
    /// Average of current and prior total assets
    pub avg_total_assets: Option<f64>,
    /// Average of current and prior total equity
    pub avg_total_equity: Option<f64>,
    /// Annualized return on assets, percent
    pub roa: f64,
    /// Annualized return on equity, percent
    pub roe: f64,
}

/// Direction of a rank change against the same quarter a year earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Moved toward rank 1.
    Up,
    /// Moved away from rank 1.
    Down,
    /// Same rank.
    Flat,
    /// No prior-year rank.
    Unknown,
}

impl Direction {
    /// Derive the direction from a stored rank delta.
    pub const fn from_delta(delta: Option<i64>) -> Self {
        match delta {
            Some(d) if d > 0 => Self::Up,
            Some(d) if d < 0 => Self::Down,
            Some(_) => Self::Flat,
            None => Self::Unknown,
        }
    }

    /// Report symbol.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Flat => "-",
            Self::Unknown => "X",
        }
    }

    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "flat" => Ok(Self::Flat),
            "unknown" => Ok(Self::Unknown),
            _ => Err(DataError::Parse(format!("Invalid direction: {}", s))),
        }
    }
}

/// One company's value and rank on one metric in one period.
///
/// `direction` and `rank_delta` are stored in the `differ_sign` and
/// `difer_data` columns, the names report consumers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFact {
    /// Report period
    pub report_period: ReportPeriod,
    /// Metric name
    pub financial_name: String,
    /// Company name
    pub company_name: String,
    /// Value being ranked
    pub data: f64,
    /// Rank, 1 = highest value
    pub ranking: Option<u32>,
    /// Direction of the rank change
    pub direction: Option<Direction>,
    /// Previous-year rank minus current rank
    pub rank_delta: Option<i64>,
}
