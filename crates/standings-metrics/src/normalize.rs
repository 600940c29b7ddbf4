//! Net income normalization.
//!
//! Companies whose fiscal year ends in March disclose net income cumulatively
//! from the prior fiscal year's Q4 close. To compare them with calendar-year
//! companies the cumulative baseline has to be taken out.

use standings_data::{NormalizationStatus, Quarter};

/// Fiscal-year-end month of a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiscalMonth {
    /// Fiscal year ends in March.
    March,
    /// Any other fiscal year end, including an undisclosed one.
    Other,
}

impl FiscalMonth {
    /// Interpret a disclosed fiscal-month label.
    ///
    /// `3월`, `March`, `Mar`, `3` and `03` mean March.
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::Other;
        };
        let label = label.trim().to_ascii_lowercase();
        match label.as_str() {
            "3월" | "march" | "mar" | "3" | "03" => Self::March,
            _ => Self::Other,
        }
    }
}

/// Net income figures needed to isolate one quarter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetIncomeInputs {
    /// Fiscal-year-end month
    pub fiscal_month: FiscalMonth,
    /// Quarter being computed
    pub quarter: Quarter,
    /// Net income as disclosed for the quarter
    pub current: f64,
    /// Net income disclosed for Q1 of the same year
    pub current_q1: Option<f64>,
    /// Net income disclosed at the prior fiscal year end
    pub prior_q4: Option<f64>,
}

/// Normalized net income together with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedNetIncome {
    /// Quarter-comparable net income
    pub value: f64,
    /// How `value` relates to the disclosed figure
    pub status: NormalizationStatus,
}

/// Normalize a disclosed net income figure.
///
/// | fiscal month | quarter | result |
/// |---|---|---|
/// | other | any | `current` |
/// | March | 1 | `current - prior_q4` |
/// | March | 2-4 | `current + current_q1 - prior_q4` |
///
/// When a March company lacks a baseline the disclosed figure is kept and
/// flagged [`NormalizationStatus::Unnormalized`].
pub fn normalize_net_income(inputs: &NetIncomeInputs) -> NormalizedNetIncome {
    let unchanged = |status| NormalizedNetIncome {
        value: inputs.current,
        status,
    };

    if inputs.fiscal_month == FiscalMonth::Other {
        return unchanged(NormalizationStatus::NotRequired);
    }

    let adjusted = if inputs.quarter == Quarter::Q1 {
        inputs.prior_q4.map(|prior_q4| inputs.current - prior_q4)
    } else {
        match (inputs.current_q1, inputs.prior_q4) {
            (Some(q1), Some(prior_q4)) => Some(inputs.current + q1 - prior_q4),
            _ => None,
        }
    };

    adjusted.map_or_else(
        || unchanged(NormalizationStatus::Unnormalized),
        |value| NormalizedNetIncome {
            value,
            status: NormalizationStatus::Adjusted,
        },
    )
}
