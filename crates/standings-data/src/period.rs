//! Report periods.
//!
//! A report period is one calendar quarter, identified as `"YYYY-Qn"`. Every
//! raw fact, calculated metric and ranked fact is keyed by one.

use crate::error::{DataError, Result};
use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A quarter number, always within 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("Q{_0}")]
pub struct Quarter(u8);

impl Quarter {
    /// First quarter.
    pub const Q1: Self = Self(1);
    /// Fourth quarter.
    pub const Q4: Self = Self(4);

    /// Create a quarter, rejecting numbers outside 1..=4.
    pub fn new(quarter: u32) -> Result<Self> {
        match quarter {
            1..=4 => Ok(Self(quarter as u8)),
            other => Err(DataError::InvalidQuarter(other)),
        }
    }

    /// The quarter number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Factor that scales a year-to-date figure to a full year, `4 / quarter`.
    pub fn annualization_factor(self) -> f64 {
        4.0 / f64::from(self.0)
    }

    /// The quarter containing the given calendar month (1-12).
    const fn containing_month(month: u32) -> Self {
        Self(((month - 1) / 3 + 1) as u8)
    }
}

/// Calendar bounds of a quarter, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterBounds {
    /// First day of the quarter.
    pub start: NaiveDate,
    /// Last day of the quarter.
    pub end: NaiveDate,
}

impl QuarterBounds {
    /// Bounds formatted as `YYYYMMDD`, the form disclosure queries expect.
    pub fn compact(&self) -> (String, String) {
        (
            self.start.format("%Y%m%d").to_string(),
            self.end.format("%Y%m%d").to_string(),
        )
    }
}

/// A fiscal quarter identified as `"YYYY-Qn"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("{year}-{quarter}")]
#[serde(try_from = "String", into = "String")]
pub struct ReportPeriod {
    year: i32,
    quarter: Quarter,
}

impl ReportPeriod {
    /// Create a period from a year and a validated quarter.
    pub const fn new(year: i32, quarter: Quarter) -> Self {
        Self { year, quarter }
    }

    /// Create a period from a year and a raw quarter number.
    pub fn from_parts(year: i32, quarter: u32) -> Result<Self> {
        Ok(Self::new(year, Quarter::new(quarter)?))
    }

    /// The most recently completed quarter as of `today`.
    ///
    /// Invoked in calendar Q2 this is Q1 of the same year; invoked in Q1 it is
    /// Q4 of the previous year.
    pub fn latest_completed(today: NaiveDate) -> Self {
        let current = Quarter::containing_month(today.month());
        if current.0 == 1 {
            Self::new(today.year() - 1, Quarter::Q4)
        } else {
            Self::new(today.year(), Quarter(current.0 - 1))
        }
    }

    /// Resolve the target period of a run.
    ///
    /// An explicit year and quarter win; with neither, the most recently
    /// completed quarter as of `today` is used. Supplying only one of the two
    /// is rejected.
    pub fn resolve(year: Option<i32>, quarter: Option<u32>, today: NaiveDate) -> Result<Self> {
        match (year, quarter) {
            (Some(year), Some(quarter)) => Self::from_parts(year, quarter),
            (None, None) => Ok(Self::latest_completed(today)),
            (Some(year), None) => Err(DataError::InvalidPeriod(format!(
                "year {year} given without a quarter"
            ))),
            (None, Some(quarter)) => Err(DataError::InvalidPeriod(format!(
                "quarter {quarter} given without a year"
            ))),
        }
    }

    /// Calendar year.
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Quarter within the year.
    pub const fn quarter(&self) -> Quarter {
        self.quarter
    }

    /// The same quarter one year earlier; the baseline for rank deltas.
    pub const fn same_quarter_prior_year(&self) -> Self {
        Self::new(self.year - 1, self.quarter)
    }

    /// Q4 of the previous year; the baseline for balances and cumulative income.
    pub const fn prior_fiscal_year_end(&self) -> Self {
        Self::new(self.year - 1, Quarter::Q4)
    }

    /// Q1 of the same year.
    pub const fn first_quarter(&self) -> Self {
        Self::new(self.year, Quarter::Q1)
    }

    /// Calendar start and end dates of the quarter.
    pub fn bounds(&self) -> Result<QuarterBounds> {
        let first_month = u32::from(self.quarter.0 - 1) * 3 + 1;
        let start = NaiveDate::from_ymd_opt(self.year, first_month, 1);
        let next_start = if self.quarter.0 == 4 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, first_month + 3, 1)
        };

        match (start, next_start.and_then(|d| d.pred_opt())) {
            (Some(start), Some(end)) => Ok(QuarterBounds { start, end }),
            _ => Err(DataError::InvalidPeriod(format!(
                "{self} is outside the supported calendar range"
            ))),
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DataError::InvalidPeriod(format!("expected YYYY-Qn, got {s:?}"));
        let (year, quarter) = s.trim().split_once("-Q").ok_or_else(invalid)?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(year) || quarter.len() != 1 || !digits(quarter) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let quarter = quarter.parse::<u32>().map_err(|_| invalid())?;
        Self::from_parts(year, quarter)
    }
}

impl TryFrom<String> for ReportPeriod {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ReportPeriod> for String {
    fn from(period: ReportPeriod) -> Self {
        period.to_string()
    }
}
