//! Output module for run reports and archive statistics
//!
//! This module handles:
//! - Formatting the report of a finished crawl run
//! - Loading and printing statistics from the article database

mod report;
pub mod stats;

pub use report::format_crawl_report;
pub use stats::{load_statistics, print_statistics, topic_breakdown, ArchiveStatistics};
