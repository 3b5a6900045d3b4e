//! ISNA archiver: a date-bounded news archive crawler
//!
//! This crate walks a news agency's archive one calendar day at a time,
//! newest day first, paging through each day's listing, extracting and
//! classifying the articles it finds and storing every article exactly once
//! per (source, article id).

pub mod calendar;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod taxonomy;

use calendar::JalaliDate;
use thiserror::Error;

/// Main error type for archiver operations
#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid date range: {0}")]
    InvalidRange(#[from] InvalidRange),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Rejected date bounds
///
/// Every variant is fatal and is reported before the first request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRange {
    #[error("malformed date '{0}', expected YYYYMMDD")]
    Malformed(String),

    #[error("date_from {from} is after date_to {to}")]
    Reversed { from: JalaliDate, to: JalaliDate },

    #[error("date_from and date_to must be given together")]
    PartialBounds,

    #[error("range spans {days} days, more than the allowed {max}")]
    TooLong { days: usize, max: u32 },
}

/// Result type alias for archiver operations
pub type Result<T> = std::result::Result<T, ArchiverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use calendar::{resolve_target_dates, TargetDateSet};
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use state::{CrawlCursor, CrawlPhase};
pub use storage::{ArticleRecord, ArticleStore, SqliteStorage, StoreOutcome};
pub use taxonomy::{Topic, TopicClassifier};
