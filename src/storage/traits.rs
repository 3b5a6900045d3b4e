//! Storage traits and error types
//!
//! This module defines the ingestion sink interface and its error types.

use crate::storage::{ArticleRecord, RunCounters, RunRecord, RunStatus, StoreOutcome};
use crate::taxonomy::Topic;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent store for extracted articles and run bookkeeping
///
/// `store` must insert-or-detect-conflict atomically: concurrent or repeated
/// stores of the same (source_name, article_id) leave exactly one row, the
/// first one written.
pub trait ArticleStore {
    // ===== Run Management =====

    /// Creates a new crawl run covering the given native-calendar window
    fn create_run(&mut self, config_hash: &str, date_from: &str, date_to: &str)
        -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Closes a run with its final status and counters
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        done_reason: Option<&str>,
        counters: &RunCounters,
    ) -> StorageResult<()>;

    /// Saves a running run's counters and refreshes its progress time
    fn record_progress(&mut self, run_id: i64, counters: &RunCounters) -> StorageResult<()>;

    /// Marks `running` runs with no progress for `idle` as `failed`
    ///
    /// Returns how many runs were closed. A run that stops recording
    /// progress belongs to a process that died mid-crawl.
    fn fail_stale_runs(&mut self, idle: chrono::Duration) -> StorageResult<usize>;

    // ===== Articles =====

    /// Stores an article unless one with the same key already exists
    fn store(&mut self, record: &ArticleRecord) -> StorageResult<StoreOutcome>;

    /// Looks an article up by its key
    fn get_article(&self, source_name: &str, article_id: &str)
        -> StorageResult<Option<ArticleRecord>>;

    /// Counts stored articles
    fn count_articles(&self) -> StorageResult<u64>;

    /// Counts stored articles per topic
    fn count_articles_by_topic(&self) -> StorageResult<HashMap<Topic, u64>>;
}
