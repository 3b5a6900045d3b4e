//! Integration tests for the HTTP fetcher
//!
//! These tests use wiremock to check status classification, timeouts,
//! retries and the user agent sent with every request.

use isna_archiver::config::UserAgentConfig;
use isna_archiver::crawler::{
    fetch_with_retry, FetchError, HttpFetcher, PageFetcher, RetryPolicy,
};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestArchiver".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: "https://example.com/about".to_string(),
        contact_email: "admin@example.com".to_string(),
    }
}

fn fetcher(timeout: Duration) -> HttpFetcher {
    HttpFetcher::new(&user_agent(), timeout).expect("Failed to build fetcher")
}

#[tokio::test]
async fn test_fetch_returns_body_and_sends_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header(
            "user-agent",
            "TestArchiver/1.0 (+https://example.com/about; admin@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = fetcher(Duration::from_secs(5))
        .fetch(&format!("{}/page", mock_server.uri()))
        .await
        .expect("Fetch failed");

    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn test_status_classification() {
    let mock_server = MockServer::start().await;

    let routes: [(&str, u16); 4] = [
        ("/missing", 404),
        ("/broken", 500),
        ("/busy", 429),
        ("/denied", 403),
    ];
    for (route, status) in routes {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&mock_server)
            .await;
    }

    let fetcher = fetcher(Duration::from_secs(5));
    let uri = mock_server.uri();

    assert_eq!(
        fetcher.fetch(&format!("{}/missing", uri)).await,
        Err(FetchError::NotFound)
    );
    assert_eq!(
        fetcher.fetch(&format!("{}/broken", uri)).await,
        Err(FetchError::ServerError(500))
    );
    assert_eq!(
        fetcher.fetch(&format!("{}/busy", uri)).await,
        Err(FetchError::ClientError(429))
    );
    assert_eq!(
        fetcher.fetch(&format!("{}/denied", uri)).await,
        Err(FetchError::ClientError(403))
    );
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let result = fetcher(Duration::from_millis(500))
        .fetch(&format!("{}/slow", mock_server.uri()))
        .await;

    assert_eq!(result, Err(FetchError::Timeout));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Nothing listens on port 1
    let result = fetcher(Duration::from_secs(2))
        .fetch("http://127.0.0.1:1/gone")
        .await;

    assert!(matches!(result, Err(FetchError::Network(_)) | Err(FetchError::Timeout)));
}

#[tokio::test]
async fn test_retry_recovers_after_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let policy = RetryPolicy {
        retries: 3,
        base_delay: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    };
    let body = fetch_with_retry(
        &fetcher(Duration::from_secs(5)),
        &format!("{}/flaky", mock_server.uri()),
        &policy,
    )
    .await
    .expect("Fetch should recover");

    assert_eq!(body, "recovered");
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let policy = RetryPolicy {
        retries: 5,
        base_delay: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    };
    let result = fetch_with_retry(
        &fetcher(Duration::from_secs(5)),
        &format!("{}/missing", mock_server.uri()),
        &policy,
    )
    .await;

    assert_eq!(result, Err(FetchError::NotFound));
}
