#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/standings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;

pub use export::{ExportError, ExportFormat, Exporter};
pub use report::{MetricSection, RankingReport, ReportRow, change_marker, display_value};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
