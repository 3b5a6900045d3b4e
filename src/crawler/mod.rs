//! Crawler module for archive traversal and article ingestion
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Listing and article page extraction
//! - The date-bounded traversal coordinator

mod article;
mod controller;
mod fetcher;
mod listing;
mod selectors;

pub use article::{
    extract_article, parse_published, published_native_date, truncate_chars,
    ExtractionContext, SkipReason,
};
pub use controller::{listing_url, Coordinator, CrawlReport};
pub use fetcher::{
    build_http_client, fetch_with_retry, FetchError, HttpFetcher, PageFetcher, RetryPolicy,
};
pub use listing::{extract_references, ArticleReference};
pub use selectors::{PageSelectors, NEWS_PATH_PATTERN};

use crate::calendar::TargetDateSet;
use crate::config::Config;
use crate::storage::open_storage;
use crate::ArchiverError;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl over `targets` against the live archive
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the article database
/// 2. Build the HTTP client
/// 3. Traverse the archive until the targets are exhausted, the earliest
///    allowed day is passed, or `cancel` fires
pub async fn crawl(
    config: &Config,
    config_hash: &str,
    targets: TargetDateSet,
    cancel: CancellationToken,
) -> Result<CrawlReport, ArchiverError> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let fetcher = HttpFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    )?;

    let mut coordinator = Coordinator::new(
        config,
        config_hash,
        targets,
        fetcher,
        Arc::new(Mutex::new(storage)),
    )?
    .with_cancellation(cancel);

    coordinator.run().await
}

/// Turns interrupt signals into run cancellation
///
/// The first signal cancels `cancel`, letting the run stop at the next page
/// boundary. Returns `true` when a second signal arrives, meaning the caller
/// should quit without waiting. Returns `false` if the signal source fails.
pub async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        tracing::warn!("Cannot listen for interrupts: {}", e);
        return false;
    }
    tracing::warn!("Interrupt received, stopping after the current page (interrupt again to quit)");
    cancel.cancel();

    next_interrupt().await.is_ok()
}
