//! Archive traversal coordinator
//!
//! Walks the archive one listing page at a time, starting at page 1 of the
//! most recent target day. A page with references is dispatched in full
//! before the next decision is made:
//! - an empty page moves the cursor to page 1 of the previous day
//! - a page holding an article outside the target dates ends the run
//! - otherwise the next page of the same day is requested
//!
//! Articles from one page are fetched concurrently; listing pages never are.

use crate::calendar::{JalaliDate, TargetDateSet};
use crate::config::{parse_utc_offset, Config};
use crate::crawler::article::{extract_article, ExtractionContext, SkipReason};
use crate::crawler::fetcher::{fetch_with_retry, FetchError, PageFetcher, RetryPolicy};
use crate::crawler::listing::{extract_references, ArticleReference};
use crate::crawler::PageSelectors;
use crate::state::{CrawlCursor, CrawlPhase, DoneReason};
use crate::storage::{ArticleStore, RawArchive, RunCounters, RunStatus, StoreOutcome};
use crate::taxonomy::TopicClassifier;
use crate::ArchiverError;
use chrono::FixedOffset;
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Fills a listing URL template for one day and page
///
/// Month and day are not zero-padded.
pub fn listing_url(template: &str, date: JalaliDate, page: u32) -> String {
    template
        .replace("{page}", &page.to_string())
        .replace("{year}", &date.year().to_string())
        .replace("{month}", &date.month().to_string())
        .replace("{day}", &date.day().to_string())
}

/// Summary of a finished traversal
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub run_id: i64,
    pub counters: RunCounters,
    pub done: DoneReason,
    pub elapsed: Duration,
}

/// What happened to one dispatched reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArticleOutcome {
    Inserted,
    Conflict,
    /// Malformed page or topic outside the taxonomy
    Skipped,
    /// Extracted, but published on a day outside the target dates
    OutOfRange,
    /// Fetch failed after retries, or the store rejected the record
    Failed,
    /// Not started because the run was cancelled
    Abandoned,
}

/// Drives one crawl run over a target date set
pub struct Coordinator<F, S> {
    fetcher: F,
    store: Arc<Mutex<S>>,
    archive: RawArchive,
    selectors: PageSelectors,
    classifier: TopicClassifier,
    targets: TargetDateSet,
    cursor: CrawlCursor,
    source_name: String,
    base_url: Url,
    listing_template: String,
    timezone: FixedOffset,
    retry: RetryPolicy,
    concurrency: usize,
    config_hash: String,
    stale_after: chrono::Duration,
    cancel: CancellationToken,
    counters: RunCounters,
}

impl<F, S> Coordinator<F, S>
where
    F: PageFetcher,
    S: ArticleStore + Send,
{
    /// Creates a coordinator positioned at page 1 of the last target date
    ///
    /// Rolling back never goes past `crawler.earliest-date`, or the first
    /// target date when that is earlier.
    pub fn new(
        config: &Config,
        config_hash: impl Into<String>,
        targets: TargetDateSet,
        fetcher: F,
        store: Arc<Mutex<S>>,
    ) -> Result<Self, ArchiverError> {
        let selectors = PageSelectors::compile(&config.selectors)?;
        let timezone = parse_utc_offset(&config.crawler.timezone)?;
        let base_url = Url::parse(&config.source.base_url)?;
        let floor =
            JalaliDate::from_yyyymmdd(config.crawler.earliest_date)?.min(targets.first());
        let cursor = CrawlCursor::new(&targets, floor);

        Ok(Self {
            fetcher,
            store,
            archive: RawArchive::new(&config.output.raw_archive_dir),
            selectors,
            classifier: TopicClassifier::with_extra_overrides(&config.topic_overrides),
            targets,
            cursor,
            source_name: config.source.name.clone(),
            base_url,
            listing_template: config.source.listing_url.clone(),
            timezone,
            retry: RetryPolicy::from_config(&config.crawler),
            concurrency: config.crawler.max_concurrent_articles.max(1) as usize,
            config_hash: config_hash.into(),
            stale_after: chrono::Duration::minutes(i64::from(config.crawler.stale_run_minutes)),
            cancel: CancellationToken::new(),
            counters: RunCounters::default(),
        })
    }

    /// Replaces the token that cancels this run
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels the run at the next page boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cursor(&self) -> &CrawlCursor {
        &self.cursor
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Runs the traversal to completion or cancellation
    ///
    /// Per-page and per-article failures are counted and logged; only store
    /// failures while opening or closing the run record are returned.
    pub async fn run(&mut self) -> Result<CrawlReport, ArchiverError> {
        let started = Instant::now();
        let date_from = self.targets.first().to_string();
        let date_to = self.targets.last().to_string();

        let run_id = {
            let mut store = self.lock_store();
            let stale = store.fail_stale_runs(self.stale_after)?;
            if stale > 0 {
                tracing::warn!("Marked {} unfinished earlier run(s) as failed", stale);
            }
            store.create_run(&self.config_hash, &date_from, &date_to)?
        };
        tracing::info!(
            "Starting crawl run {} over {} day(s), {} to {}",
            run_id,
            self.targets.len(),
            date_from,
            date_to
        );

        let mut phase = self.cursor.listing();
        let mut pending: Vec<ArticleReference> = Vec::new();

        let done = loop {
            phase = match phase {
                CrawlPhase::Done(reason) => break reason,
                _ if self.cancel.is_cancelled() => {
                    tracing::warn!("Crawl run {} cancelled", run_id);
                    CrawlPhase::Done(DoneReason::Cancelled)
                }
                CrawlPhase::Listing { date, page } => {
                    pending = self.fetch_listing(date, page).await;
                    self.record_progress(run_id);
                    if pending.is_empty() {
                        self.roll_back(date, page)
                    } else {
                        CrawlPhase::Dispatching {
                            date,
                            page,
                            references: pending.len(),
                        }
                    }
                }
                CrawlPhase::Dispatching {
                    date,
                    page,
                    references,
                } => {
                    tracing::info!(
                        "Dispatching {} article(s) from {} page {}",
                        references,
                        date,
                        page
                    );
                    let batch = std::mem::take(&mut pending);
                    self.dispatch(batch).await;
                    self.record_progress(run_id);
                    self.cursor.finish_page()
                }
            };
        };

        let status = match done {
            DoneReason::Cancelled => RunStatus::Interrupted,
            DoneReason::TargetExhausted | DoneReason::ReachedFloor => RunStatus::Completed,
        };
        self.lock_store().finish_run(
            run_id,
            status,
            Some(done.to_db_string()),
            &self.counters,
        )?;

        let elapsed = started.elapsed();
        tracing::info!(
            "Crawl run {} finished ({}) in {:.1}s: {} inserted, {} already stored, {} skipped, {} failed",
            run_id,
            done,
            elapsed.as_secs_f64(),
            self.counters.articles_inserted,
            self.counters.articles_conflicted,
            self.counters.articles_skipped,
            self.counters.articles_failed
        );

        Ok(CrawlReport {
            run_id,
            counters: self.counters,
            done,
            elapsed,
        })
    }

    /// Fetches one listing page; a failed fetch yields no references
    async fn fetch_listing(&mut self, date: JalaliDate, page: u32) -> Vec<ArticleReference> {
        let url = listing_url(&self.listing_template, date, page);
        self.counters.listing_pages += 1;
        tracing::debug!("Fetching listing {} page {}: {}", date, page, url);

        match fetch_with_retry(&self.fetcher, &url, &self.retry).await {
            Ok(html) => {
                let references = extract_references(&html, &self.selectors, &self.base_url);
                if references.is_empty() {
                    self.counters.empty_pages += 1;
                }
                references
            }
            Err(FetchError::NotFound) => {
                self.counters.empty_pages += 1;
                tracing::debug!("Listing {} not found, treating as empty", url);
                Vec::new()
            }
            Err(e) => {
                // Under-crawl risk: the day may have had more pages
                self.counters.listing_failures += 1;
                tracing::warn!(
                    "Listing {} failed after retries ({}), treating it as empty",
                    url,
                    e
                );
                Vec::new()
            }
        }
    }

    fn roll_back(&mut self, date: JalaliDate, page: u32) -> CrawlPhase {
        let next = self.cursor.roll_back_day();
        match next {
            CrawlPhase::Listing { date: previous, .. } => {
                self.counters.days_rolled_back += 1;
                tracing::info!(
                    "No references on {} page {}, moving to {}",
                    date,
                    page,
                    previous
                );
            }
            CrawlPhase::Done(_) => {
                tracing::info!("No references on {} page {} and no earlier day allowed", date, page);
            }
            CrawlPhase::Dispatching { .. } => {}
        }
        next
    }

    /// Processes every reference of a page and folds the outcomes into the run
    async fn dispatch(&mut self, references: Vec<ArticleReference>) {
        let outcomes: Vec<ArticleOutcome> = {
            let this = &*self;
            stream::iter(references)
                .map(|reference| this.process_article(reference))
                .buffer_unordered(this.concurrency)
                .collect()
                .await
        };

        for outcome in outcomes {
            if outcome != ArticleOutcome::Abandoned {
                self.counters.articles_dispatched += 1;
            }

            match outcome {
                ArticleOutcome::Inserted => self.counters.articles_inserted += 1,
                ArticleOutcome::Conflict => self.counters.articles_conflicted += 1,
                ArticleOutcome::Skipped => self.counters.articles_skipped += 1,
                ArticleOutcome::Failed => self.counters.articles_failed += 1,
                ArticleOutcome::OutOfRange => {
                    self.counters.articles_skipped += 1;
                    if !self.cursor.target_exhausted() {
                        tracing::info!(
                            "Reached articles older than {}, finishing after this page",
                            self.targets.first()
                        );
                    }
                    self.cursor.mark_target_exhausted();
                }
                ArticleOutcome::Abandoned => {}
            }
        }
    }

    async fn process_article(&self, reference: ArticleReference) -> ArticleOutcome {
        if self.cancel.is_cancelled() {
            return ArticleOutcome::Abandoned;
        }

        let html = match fetch_with_retry(&self.fetcher, &reference.url, &self.retry).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Skipping article {}: fetch failed ({})", reference.article_id, e);
                return ArticleOutcome::Failed;
            }
        };

        if let Err(e) = self.archive.save(&reference.article_id, &html).await {
            tracing::warn!(
                "Could not archive raw page of article {}: {}",
                reference.article_id,
                e
            );
        }

        let record = match extract_article(&html, &reference, &self.extraction_context()) {
            Ok(record) => record,
            Err(SkipReason::OutsideTargetDates(published_at)) => {
                tracing::debug!(
                    "Article {} published {} is outside the target dates",
                    reference.article_id,
                    published_at
                );
                return ArticleOutcome::OutOfRange;
            }
            Err(reason) => {
                tracing::info!("Skipping article {}: {}", reference.article_id, reason);
                return ArticleOutcome::Skipped;
            }
        };

        let stored = self.lock_store().store(&record);
        match stored {
            Ok(StoreOutcome::Inserted) => {
                tracing::debug!("Stored article {}", record.article_id);
                ArticleOutcome::Inserted
            }
            Ok(StoreOutcome::Conflict) => {
                tracing::debug!("Article {} already stored", record.article_id);
                ArticleOutcome::Conflict
            }
            Err(e) => {
                tracing::error!("Failed to store article {}: {}", record.article_id, e);
                ArticleOutcome::Failed
            }
        }
    }

    /// Keeps the run record current; a failure here only costs visibility
    fn record_progress(&self, run_id: i64) {
        if let Err(e) = self.lock_store().record_progress(run_id, &self.counters) {
            tracing::warn!("Could not record progress of run {}: {}", run_id, e);
        }
    }

    fn extraction_context(&self) -> ExtractionContext<'_> {
        ExtractionContext {
            selectors: &self.selectors,
            classifier: &self.classifier,
            source_name: &self.source_name,
            timezone: self.timezone,
            targets: &self.targets,
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, S> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
