//! Output module for harvest reports
//!
//! This module handles:
//! - Aggregating per-task outcomes into a harvest report
//! - Displaying report statistics

mod report;
pub mod stats;

pub use report::{FailureLog, FailureStage, HarvestFailure, HarvestReport, DEFAULT_FAILURE_LIMIT};
pub use stats::print_report;
