//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ArticleStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, StorageError, StorageResult};
use crate::storage::{ArticleRecord, RunCounters, RunRecord, RunStatus, StoreOutcome};
use crate::taxonomy::Topic;
use crate::ArchiverError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, date_from, date_to,
     done_reason, listing_pages, empty_pages, listing_failures, days_rolled_back,
     articles_dispatched, articles_inserted, articles_conflicted, articles_skipped,
     articles_failed";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, ArchiverError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, ArchiverError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        date_from: row.get(5)?,
        date_to: row.get(6)?,
        done_reason: row.get(7)?,
        counters: RunCounters {
            listing_pages: row.get::<_, i64>(8)? as u64,
            empty_pages: row.get::<_, i64>(9)? as u64,
            listing_failures: row.get::<_, i64>(10)? as u64,
            days_rolled_back: row.get::<_, i64>(11)? as u64,
            articles_dispatched: row.get::<_, i64>(12)? as u64,
            articles_inserted: row.get::<_, i64>(13)? as u64,
            articles_conflicted: row.get::<_, i64>(14)? as u64,
            articles_skipped: row.get::<_, i64>(15)? as u64,
            articles_failed: row.get::<_, i64>(16)? as u64,
        },
    })
}

impl ArticleStore for SqliteStorage {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        config_hash: &str,
        date_from: &str,
        date_to: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, updated_at, config_hash, status, date_from, date_to)
             VALUES (?1, ?1, ?2, ?3, ?4, ?5)",
            params![
                now,
                config_hash,
                RunStatus::Running.to_db_string(),
                date_from,
                date_to
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        done_reason: Option<&str>,
        counters: &RunCounters,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, updated_at = ?2, done_reason = ?3,
             listing_pages = ?4, empty_pages = ?5, listing_failures = ?6,
             days_rolled_back = ?7, articles_dispatched = ?8, articles_inserted = ?9,
             articles_conflicted = ?10, articles_skipped = ?11, articles_failed = ?12
             WHERE id = ?13",
            params![
                status.to_db_string(),
                now,
                done_reason,
                counters.listing_pages as i64,
                counters.empty_pages as i64,
                counters.listing_failures as i64,
                counters.days_rolled_back as i64,
                counters.articles_dispatched as i64,
                counters.articles_inserted as i64,
                counters.articles_conflicted as i64,
                counters.articles_skipped as i64,
                counters.articles_failed as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn record_progress(&mut self, run_id: i64, counters: &RunCounters) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET updated_at = ?1,
             listing_pages = ?2, empty_pages = ?3, listing_failures = ?4,
             days_rolled_back = ?5, articles_dispatched = ?6, articles_inserted = ?7,
             articles_conflicted = ?8, articles_skipped = ?9, articles_failed = ?10
             WHERE id = ?11 AND status = ?12",
            params![
                now,
                counters.listing_pages as i64,
                counters.empty_pages as i64,
                counters.listing_failures as i64,
                counters.days_rolled_back as i64,
                counters.articles_dispatched as i64,
                counters.articles_inserted as i64,
                counters.articles_conflicted as i64,
                counters.articles_skipped as i64,
                counters.articles_failed as i64,
                run_id,
                RunStatus::Running.to_db_string()
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_stale_runs(&mut self, idle: chrono::Duration) -> StorageResult<usize> {
        let now = Utc::now();
        let cutoff = now - idle;

        let running: Vec<(i64, String)> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id, updated_at FROM runs WHERE status = ?1")?;
            let rows = stmt.query_map(params![RunStatus::Running.to_db_string()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            let collected: Vec<(i64, String)> = rows.collect::<Result<_, _>>()?;
            collected
        };

        let mut closed = 0;
        for (run_id, updated_at) in running {
            // An unreadable timestamp cannot prove the run is alive
            let alive = DateTime::parse_from_rfc3339(&updated_at)
                .map_or(false, |at| at.with_timezone(&Utc) > cutoff);
            if alive {
                continue;
            }
            closed += self.conn.execute(
                "UPDATE runs SET status = ?1, finished_at = ?2, done_reason = 'abandoned'
                 WHERE id = ?3 AND status = ?4",
                params![
                    RunStatus::Failed.to_db_string(),
                    now.to_rfc3339(),
                    run_id,
                    RunStatus::Running.to_db_string()
                ],
            )?;
        }
        Ok(closed)
    }

    // ===== Articles =====

    fn store(&mut self, record: &ArticleRecord) -> StorageResult<StoreOutcome> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO articles (source_name, article_id, title, body_text, summary,
             published_at, topic, sub_topic, author_code, canonical_url, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(source_name, article_id) DO NOTHING",
            params![
                record.source_name,
                record.article_id,
                record.title,
                record.body_text,
                record.summary,
                record.published_at.to_rfc3339(),
                record.topic.to_db_string(),
                record.sub_topic,
                record.author_code,
                record.canonical_url,
                now
            ],
        )?;

        Ok(if inserted == 0 {
            StoreOutcome::Conflict
        } else {
            StoreOutcome::Inserted
        })
    }

    fn get_article(
        &self,
        source_name: &str,
        article_id: &str,
    ) -> StorageResult<Option<ArticleRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT title, body_text, summary, published_at, topic, sub_topic,
                 author_code, canonical_url
                 FROM articles WHERE source_name = ?1 AND article_id = ?2",
                params![source_name, article_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((title, body_text, summary, published, topic, sub_topic, author_code, url)) =
            row
        else {
            return Ok(None);
        };

        let published_at = DateTime::parse_from_rfc3339(&published).map_err(|e| {
            StorageError::CorruptRow(format!("published_at '{}': {}", published, e))
        })?;
        let topic = Topic::from_db_string(&topic)
            .ok_or_else(|| StorageError::CorruptRow(format!("unknown topic '{}'", topic)))?;

        Ok(Some(ArticleRecord {
            source_name: source_name.to_string(),
            article_id: article_id.to_string(),
            title,
            body_text,
            summary,
            published_at,
            topic,
            sub_topic,
            author_code,
            canonical_url: url,
        }))
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_articles_by_topic(&self) -> StorageResult<HashMap<Topic, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT topic, COUNT(*) FROM articles GROUP BY topic")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (topic, count) = row?;
            if let Some(topic) = Topic::from_db_string(&topic) {
                counts.insert(topic, count as u64);
            }
        }

        Ok(counts)
    }
}
