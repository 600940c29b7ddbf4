#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/standings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod period;
pub mod records;
pub mod schema;
pub mod store;

pub use error::{DataError, Result};
pub use period::{Quarter, QuarterBounds, ReportPeriod};
pub use records::{
    BalanceSheetFact, CalculatedMetric, Direction, NormalizationStatus, RankedFact, RawFact,
};
pub use schema::{SourceExpr, SourceTable};
pub use store::{MergeCounts, SqliteStore, StoreStats};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
