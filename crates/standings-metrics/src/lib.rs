#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/standings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod normalize;
pub mod rank;
pub mod ratio;
pub mod registry;

pub use error::MetricError;
pub use normalize::{FiscalMonth, NetIncomeInputs, NormalizedNetIncome, normalize_net_income};
pub use rank::{
    RankAssignment, RankChange, rank_changes, rank_delta, rank_descending, rank_partitions,
};
pub use ratio::{
    BalanceInputs, Ratio, ReturnRatios, annualized_return, average_balance, return_ratios,
};
pub use registry::{MetricDefinition, MetricRegistry, MetricRegistryBuilder, MetricSpec};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
