//! Storage module for persisting crawl results
//!
//! This module handles all persistence for the archiver, including:
//! - SQLite database initialization and schema management
//! - Deduplicated article ingestion keyed by (source, article id)
//! - Run tracking with per-run counters
//! - Raw article pages written to a flat directory

mod raw;
mod schema;
mod sqlite;
mod traits;

pub use raw::RawArchive;
pub use sqlite::SqliteStorage;
pub use traits::{ArticleStore, StorageError, StorageResult};

use crate::taxonomy::Topic;
use crate::ArchiverError;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

/// Opens (or creates) the article database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ArchiverError> {
    SqliteStorage::new(path)
}

/// Maximum stored title length, in characters
pub const TITLE_MAX_CHARS: usize = 256;

/// Maximum stored sub-topic length, in characters
pub const SUB_TOPIC_MAX_CHARS: usize = 32;

/// One extracted, classified article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub source_name: String,
    pub article_id: String,
    pub title: String,
    pub body_text: String,
    /// Empty when the page has no summary
    pub summary: String,
    pub published_at: DateTime<FixedOffset>,
    pub topic: Topic,
    pub sub_topic: String,
    pub author_code: String,
    pub canonical_url: String,
}

/// Result of handing an article to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The article was new and has been written
    Inserted,
    /// An article with the same key was already stored; nothing changed
    Conflict,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub date_from: String,
    pub date_to: String,
    pub done_reason: Option<String>,
    pub counters: RunCounters,
}

/// Progress counters accumulated during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Listing pages requested
    pub listing_pages: u64,
    /// Listing pages that yielded no references
    pub empty_pages: u64,
    /// Listing pages whose fetch still failed after retries
    pub listing_failures: u64,
    /// Times the cursor moved to the previous day
    pub days_rolled_back: u64,
    pub articles_dispatched: u64,
    pub articles_inserted: u64,
    pub articles_conflicted: u64,
    pub articles_skipped: u64,
    pub articles_failed: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
