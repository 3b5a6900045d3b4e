//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small archive and run the full
//! traversal end-to-end: listing pages, article pages, the SQLite store and
//! the raw page directory.

use isna_archiver::calendar::{JalaliDate, TargetDateSet};
use isna_archiver::config::{parse_config, Config};
use isna_archiver::crawler::{crawl, Coordinator, HttpFetcher};
use isna_archiver::state::DoneReason;
use isna_archiver::storage::{ArticleStore, RunStatus, SqliteStorage};
use isna_archiver::taxonomy::Topic;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 1399-01-02 is 2020-03-21
const IN_WINDOW: &str = "2020-03-21T09:30:00+03:30";
const BEFORE_WINDOW: &str = "2020-03-20T23:10:00+03:30";

/// Creates a test configuration pointing at the mock archive
fn create_test_config(server_uri: &str, dir: &TempDir, earliest: u32) -> Config {
    let toml = format!(
        r#"
[source]
name = "ISNA"
base-url = "{uri}/"
listing-url = "{uri}/archive?pi={{page}}&ms=0&dy={{day}}&mn={{month}}&yr={{year}}"

[crawler]
max-concurrent-articles = 2
retry-attempts = 2
retry-base-delay-ms = 10
request-timeout-secs = 5
earliest-date = {earliest}

[user-agent]
crawler-name = "TestArchiver"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
database-path = "{db}"
raw-archive-dir = "{raw}"
"#,
        uri = server_uri,
        earliest = earliest,
        db = dir.path().join("archive.db").display(),
        raw = dir.path().join("raw").display(),
    );
    parse_config(&toml).expect("Failed to parse test config")
}

fn listing_page(ids: &[&str]) -> String {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<li><div class="desc"><h3><a href="/news/{}/headline">h</a></h3></div></li>"#,
                id
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="page itemlist"><div class="items"><ul>{}</ul></div></div></body></html>"#,
        items
    )
}

fn article_page(title: &str, published: &str, section: &str) -> String {
    format!(
        r#"<html><body>
        <div class="service-title"><a href="/service/{section}">section</a></div>
        <div class="news-info"><div class="meta-news">
          <meta itemprop="datePublished" content="{published}">
          <ul>
            <li><span class="text-meta">date</span></li>
            <li><span class="text-meta">گروه</span></li>
            <li><span class="text-meta">code</span></li>
            <li><span class="text-meta">61044</span></li>
          </ul>
        </div></div>
        <div class="full-news-text">
          <h1 class="first-title">{title}</h1>
          <p class="summary">summary of {title}</p>
          <div class="item-text"><p>{title} body</p></div>
        </div>
        </body></html>"#,
    )
}

async fn mount_listing(server: &MockServer, day: &str, page: &str, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/archive"))
        .and(query_param("pi", page))
        .and(query_param("dy", day))
        .and(query_param("mn", "1"))
        .and(query_param("yr", "1399"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(ids)))
        .mount(server)
        .await;
}

async fn mount_article(server: &MockServer, id: &str, title: &str, published: &str, section: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/news/{}/headline", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(article_page(title, published, section))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn single_day(date: u32) -> TargetDateSet {
    TargetDateSet::single(JalaliDate::from_yyyymmdd(date).expect("valid date"))
}

fn open_db(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("archive.db")).expect("Failed to open DB")
}

#[tokio::test]
async fn test_full_crawl_single_day() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    mount_listing(&mock_server, "2", "1", &["101", "102"]).await;
    mount_listing(&mock_server, "2", "2", &["103"]).await;
    mount_listing(&mock_server, "2", "3", &[]).await;
    mount_article(&mock_server, "101", "first", IN_WINDOW, "Politics").await;
    mount_article(&mock_server, "102", "second", IN_WINDOW, "Economy").await;
    mount_article(&mock_server, "103", "third", IN_WINDOW, "Sports").await;

    let config = create_test_config(&mock_server.uri(), &dir, 13990102);
    let report = crawl(&config, "hash", single_day(13990102), CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.done, DoneReason::ReachedFloor);
    assert_eq!(report.counters.listing_pages, 3);
    assert_eq!(report.counters.articles_inserted, 3);

    let storage = open_db(&dir);
    assert_eq!(storage.count_articles().expect("Failed to count"), 3);

    let first = storage
        .get_article("ISNA", "101")
        .expect("Query failed")
        .expect("Article 101 missing");
    assert_eq!(first.title, "first");
    assert_eq!(first.summary, "summary of first");
    assert_eq!(first.body_text, "first body");
    assert_eq!(first.author_code, "61044");
    assert_eq!(first.topic, Topic::Politics);
    assert_eq!(first.canonical_url, format!("{}/news/101/headline", mock_server.uri()));

    // Raw pages are kept by article id
    for id in ["101", "102", "103"] {
        assert!(dir.path().join("raw").join(format!("{}.html", id)).exists());
    }

    let run = storage.get_run(report.run_id).expect("Run missing");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.counters, report.counters);
}

#[tokio::test]
async fn test_crawl_stops_after_page_with_older_article() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    mount_listing(&mock_server, "2", "1", &["201", "202"]).await;
    mount_article(&mock_server, "201", "new", IN_WINDOW, "Culture").await;
    mount_article(&mock_server, "202", "old", BEFORE_WINDOW, "Culture").await;

    // Page 2 must never be requested
    Mock::given(method("GET"))
        .and(path("/archive"))
        .and(query_param("pi", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["299"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, 13900101);
    let report = crawl(&config, "hash", single_day(13990102), CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.done, DoneReason::TargetExhausted);
    assert_eq!(report.counters.articles_dispatched, 2);
    assert_eq!(report.counters.articles_inserted, 1);

    let storage = open_db(&dir);
    assert!(storage.get_article("ISNA", "202").expect("Query failed").is_none());
}

#[tokio::test]
async fn test_rerun_over_same_window_is_idempotent() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    mount_listing(&mock_server, "2", "1", &["301", "302"]).await;
    mount_article(&mock_server, "301", "a", IN_WINDOW, "Science").await;
    mount_article(&mock_server, "302", "b", IN_WINDOW, "World").await;

    let config = create_test_config(&mock_server.uri(), &dir, 13990102);

    let first = crawl(&config, "hash", single_day(13990102), CancellationToken::new())
        .await
        .expect("First crawl failed");
    let second = crawl(&config, "hash", single_day(13990102), CancellationToken::new())
        .await
        .expect("Second crawl failed");

    assert_eq!(first.counters.articles_inserted, 2);
    assert_eq!(second.counters.articles_inserted, 0);
    assert_eq!(second.counters.articles_conflicted, 2);

    let storage = open_db(&dir);
    assert_eq!(storage.count_articles().expect("Failed to count"), 2);

    let world = storage
        .get_article("ISNA", "302")
        .expect("Query failed")
        .expect("Article 302 missing");
    assert_eq!(world.topic, Topic::Politics);
    assert_eq!(world.sub_topic, "بین‌الملل: گروه");
}

#[tokio::test]
async fn test_failing_article_is_retried_then_skipped() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    mount_listing(&mock_server, "2", "1", &["401", "402"]).await;
    mount_article(&mock_server, "401", "fine", IN_WINDOW, "Social").await;

    // First attempt plus two retries
    Mock::given(method("GET"))
        .and(path("/news/402/headline"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, 13990102);
    let report = crawl(&config, "hash", single_day(13990102), CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.counters.articles_inserted, 1);
    assert_eq!(report.counters.articles_failed, 1);
    assert_eq!(report.done, DoneReason::ReachedFloor);
}

#[tokio::test]
async fn test_failing_listing_is_counted() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/archive"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, 13990102);
    let report = crawl(&config, "hash", single_day(13990102), CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.counters.listing_failures, 1);
    assert_eq!(report.counters.empty_pages, 0);
    assert_eq!(report.done, DoneReason::ReachedFloor);
}

#[tokio::test]
async fn test_cancellation_stops_at_page_boundary() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    mount_listing(&mock_server, "2", "1", &["501"]).await;
    mount_article(&mock_server, "501", "only", IN_WINDOW, "Politics").await;

    let config = create_test_config(&mock_server.uri(), &dir, 13990102);
    let store = Arc::new(Mutex::new(open_db(&dir)));
    let fetcher = HttpFetcher::new(&config.user_agent, Duration::from_secs(5))
        .expect("Failed to build fetcher");

    let token = CancellationToken::new();
    token.cancel();
    let mut coordinator =
        Coordinator::new(&config, "hash", single_day(13990102), fetcher, Arc::clone(&store))
            .expect("Failed to create coordinator")
            .with_cancellation(token);

    let report = coordinator.run().await.expect("Run failed");

    assert_eq!(report.done, DoneReason::Cancelled);
    assert_eq!(report.counters.listing_pages, 0);

    let storage = store.lock().expect("Store lock poisoned");
    let run = storage.get_run(report.run_id).expect("Run missing");
    assert_eq!(run.status, RunStatus::Interrupted);
    assert_eq!(storage.count_articles().expect("Failed to count"), 0);
    assert!(!Path::new(&config.output.raw_archive_dir).join("501.html").exists());
}
