//! Return ratios.
//!
//! ROA and ROE are computed against the average of the period-end and prior
//! fiscal-year-end balances, then annualized under a linear run-rate.

use serde::{Deserialize, Serialize};
use standings_data::Quarter;

/// A ratio that may not be computable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Ratio {
    /// Denominator defined and non-zero.
    Computed(f64),
    /// Denominator undefined or zero.
    NotComputable,
}

impl Ratio {
    /// Value written to the store; not computable is stored as zero so that
    /// ranking never meets a missing value.
    pub const fn stored_value(self) -> f64 {
        match self {
            Self::Computed(value) => value,
            Self::NotComputable => 0.0,
        }
    }

    /// The computed value, if any.
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Computed(value) => Some(value),
            Self::NotComputable => None,
        }
    }
}

/// Average of two balances, undefined unless both are present.
pub fn average_balance(current: Option<f64>, prior: Option<f64>) -> Option<f64> {
    Some((current? + prior?) / 2.0)
}

/// Annualized return in percent: `net_income / base * 100 * (4 / quarter)`.
pub fn annualized_return(net_income: f64, base: Option<f64>, quarter: Quarter) -> Ratio {
    match base {
        Some(base) if base != 0.0 => {
            Ratio::Computed(net_income / base * 100.0 * quarter.annualization_factor())
        }
        _ => Ratio::NotComputable,
    }
}

/// Balances needed for one company's return ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceInputs {
    /// Total assets at period end
    pub total_assets: f64,
    /// Total equity at period end
    pub total_equity: f64,
    /// Total assets at the prior fiscal year end
    pub prev_total_assets: Option<f64>,
    /// Total equity at the prior fiscal year end
    pub prev_total_equity: Option<f64>,
}

/// Average balances and annualized returns of one company.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnRatios {
    /// Average total assets
    pub avg_total_assets: Option<f64>,
    /// Average total equity
    pub avg_total_equity: Option<f64>,
    /// Return on assets
    pub roa: Ratio,
    /// Return on equity
    pub roe: Ratio,
}

/// Compute average balances, ROA and ROE from normalized net income.
pub fn return_ratios(net_income: f64, balances: &BalanceInputs, quarter: Quarter) -> ReturnRatios {
    let avg_total_assets = average_balance(Some(balances.total_assets), balances.prev_total_assets);
    let avg_total_equity = average_balance(Some(balances.total_equity), balances.prev_total_equity);

    ReturnRatios {
        avg_total_assets,
        avg_total_equity,
        roa: annualized_return(net_income, avg_total_assets, quarter),
        roe: annualized_return(net_income, avg_total_equity, quarter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn q(n: u32) -> Quarter {
        Quarter::new(n).unwrap()
    }

    #[test]
    fn average_requires_both_balances() {
        assert_eq!(average_balance(Some(1000.0), Some(800.0)), Some(900.0));
        assert_eq!(average_balance(Some(1000.0), None), None);
        assert_eq!(average_balance(None, Some(800.0)), None);
    }

    #[test]
    fn annualized_roa_second_quarter() {
        let roa = annualized_return(-30.0, Some(900.0), q(2));
        assert_relative_eq!(roa.value().unwrap(), -6.6667, epsilon = 1e-3);
    }

    #[test]
    fn zero_or_missing_base_is_not_computable() {
        assert_eq!(annualized_return(10.0, Some(0.0), q(1)), Ratio::NotComputable);
        assert_eq!(annualized_return(10.0, None, q(1)), Ratio::NotComputable);
        assert_eq!(Ratio::NotComputable.stored_value(), 0.0);
    }

    #[test]
    fn full_year_not_scaled() {
        let roe = annualized_return(50.0, Some(500.0), q(4));
        assert_relative_eq!(roe.stored_value(), 10.0);
    }

    #[test]
    fn return_ratios_from_balances() {
        let balances = BalanceInputs {
            total_assets: 1000.0,
            total_equity: 300.0,
            prev_total_assets: Some(800.0),
            prev_total_equity: None,
        };
        let ratios = return_ratios(-30.0, &balances, q(2));

        assert_eq!(ratios.avg_total_assets, Some(900.0));
        assert_eq!(ratios.avg_total_equity, None);
        assert_relative_eq!(ratios.roa.stored_value(), -6.6667, epsilon = 1e-3);
        assert_eq!(ratios.roe, Ratio::NotComputable);
        assert_eq!(ratios.roe.stored_value(), 0.0);
    }
}
