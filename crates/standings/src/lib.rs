#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/standings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod directory;
pub mod error;
pub mod pipeline;

// Re-export main types from sub-crates
pub use standings_data as data;
pub use standings_metrics as metrics;
pub use standings_output as output;

pub use directory::CompanyDirectory;
pub use error::{EngineError, Result};
pub use pipeline::{
    CollectSummary, ComputeSummary, DiffSummary, RankSummary, RankingEngine, RunSummary,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
