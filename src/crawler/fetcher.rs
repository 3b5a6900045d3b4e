//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Classifying failures into transient and permanent errors
//! - Bounded retries with jittered exponential backoff
//! - A hard timeout on every attempt

use crate::config::{CrawlerConfig, UserAgentConfig};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a page could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("page not found")]
    NotFound,

    #[error("server error (HTTP {0})")]
    ServerError(u16),

    #[error("client error (HTTP {0})")]
    ClientError(u16),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Returns true if retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ServerError(_) | Self::Network(_) => true,
            Self::ClientError(status) => *status == StatusCode::TOO_MANY_REQUESTS.as_u16(),
            Self::NotFound => false,
        }
    }

    /// Maps a non-success HTTP status to an error
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            Self::NotFound
        } else if status.is_server_error() {
            Self::ServerError(status.as_u16())
        } else {
            Self::ClientError(status.as_u16())
        }
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::from_status(status)
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Source of raw page content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `CrawlerName/Version (+ContactURL; ContactEmail)`.
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        response.text().await.map_err(FetchError::from_reqwest_error)
    }
}

/// Retry behavior for transient fetch failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Backoff base; attempt `n` waits about `base * 2^n`
    pub base_delay: Duration,
    /// Hard limit on a single attempt
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            retries: config.retry_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Delay before retry number `attempt` (0-based), with +/-30% jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // Cap the exponent to keep the delay bounded
        let factor = 2_u32.saturating_pow(attempt.min(6));
        let base = self.base_delay.saturating_mul(factor);

        let jitter = rand::thread_rng().gen_range(0.7..1.3);
        base.mul_f64(jitter)
    }
}

/// Fetches `url`, retrying transient failures according to `policy`
///
/// Each attempt is cut off after `policy.timeout` and counts as a timeout.
/// Permanent failures (e.g. not found) are returned without retrying.
pub async fn fetch_with_retry<F>(
    fetcher: &F,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, FetchError>
where
    F: PageFetcher + ?Sized,
{
    let mut attempt = 0;

    loop {
        let result = match tokio::time::timeout(policy.timeout, fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        match result {
            Ok(body) => return Ok(body),
            Err(e) if e.is_transient() && attempt < policy.retries => {
                let delay = policy.backoff_delay(attempt);
                tracing::debug!(
                    "Fetch of {} failed ({}), retry {}/{} in {:?}",
                    url,
                    e,
                    attempt + 1,
                    policy.retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
