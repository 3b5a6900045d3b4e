use crate::taxonomy::TopicOverride;
use serde::Deserialize;

/// Main configuration structure for the archiver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    /// Extra topic override rows, checked after the built-in ones
    #[serde(rename = "topic-override", default)]
    pub topic_overrides: Vec<TopicOverride>,
}

/// The archive being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source name stored with every article (e.g., "ISNA")
    pub name: String,

    /// Site root that article links are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing page template with `{page}`, `{year}`, `{month}` and `{day}`
    #[serde(rename = "listing-url")]
    pub listing_url: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of articles fetched concurrently from one listing page
    #[serde(rename = "max-concurrent-articles")]
    pub max_concurrent_articles: u32,

    /// Retries for a transient fetch failure
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    /// Base delay for exponential backoff between retries (milliseconds)
    #[serde(rename = "retry-base-delay-ms")]
    pub retry_base_delay_ms: u64,

    /// Hard timeout for a single fetch attempt (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// UTC offset of the archive's calendar days, e.g. "+03:30"
    pub timezone: String,

    /// Oldest day the crawler will roll back to (YYYYMMDD)
    #[serde(rename = "earliest-date")]
    pub earliest_date: u32,

    /// Longest accepted date window in days
    #[serde(rename = "max-range-days")]
    pub max_range_days: u32,

    /// Minutes without progress after which a `running` run counts as dead
    #[serde(rename = "stale-run-minutes")]
    pub stale_run_minutes: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_articles: 4,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            request_timeout_secs: 30,
            timezone: "+03:30".to_string(),
            earliest_date: 13780101,
            max_range_days: 366,
            stale_run_minutes: 60,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory receiving the raw article pages
    #[serde(rename = "raw-archive-dir")]
    pub raw_archive_dir: String,
}

/// CSS selectors for listing and article pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    pub listing_link: String,
    pub title: String,
    pub body: String,
    pub summary: String,
    pub author: String,
    /// Zero-based index of the author code among `author` matches
    pub author_position: usize,
    pub sub_topic: String,
    pub topic_link: String,
    pub published: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_link: "div.items ul li div.desc h3 a[href]".to_string(),
            title: "div.full-news-text h1.first-title".to_string(),
            body: "div.full-news-text div.item-text".to_string(),
            summary: "div.full-news-text p.summary".to_string(),
            author: "div.meta-news span.text-meta".to_string(),
            author_position: 3,
            sub_topic: "div.news-info div.meta-news ul li:nth-child(2) span.text-meta"
                .to_string(),
            topic_link: "div.service-title a[href]".to_string(),
            published: "div.meta-news meta[itemprop='datePublished'][content]".to_string(),
        }
    }
}
