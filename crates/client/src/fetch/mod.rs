//! Conditional HTTP fetch of feed sources.
//!
//! ### Freshness protocol
//! - When a modification time is already known for a source it is sent as
//!   `If-Modified-Since` (IMF-fixdate, GMT).
//! - `200 OK` carries new content; `304 Not Modified` means the cached copy
//!   is still current. Any other status is an error.
//!
//! ### Safety gates
//! - http/https only, fragments dropped
//! - Max redirects: 5
//! - Max body bytes: configurable (default 10MB)

pub mod http_date;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use http_date::{format_http_date, parse_http_date};
pub use url::{UrlError, canonicalize};

use feedtr_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let app = AppConfig::default();
        Self { user_agent: app.user_agent.clone(), max_bytes: app.max_bytes, timeout: app.timeout(), max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// A `200 OK` response to a source request.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
}

/// Result of a conditional request.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The source has changed (or nothing was cached yet).
    Modified(FetchResponse),
    /// The source has not changed since the supplied time.
    NotModified,
}

/// Something that can retrieve a source conditionally.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Retrieve `source`, asking the remote to answer "not modified" if it
    /// has not changed since `if_modified_since`.
    async fn fetch(&self, source: &str, if_modified_since: Option<DateTime<Utc>>) -> Result<FetchOutcome, Error>;
}

/// HTTP fetch client for feed sources.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn too_large(&self, len: u64) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait]
impl SourceFetcher for FetchClient {
    async fn fetch(&self, source: &str, if_modified_since: Option<DateTime<Utc>>) -> Result<FetchOutcome, Error> {
        let start = Instant::now();
        let url = canonicalize(source).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        tracing::info!("Fetching {}", source);

        let mut request = self.http.get(url.as_str());
        if let Some(since) = if_modified_since {
            request = request.header(header::IF_MODIFIED_SINCE, format_http_date(since));
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| Error::HttpError(format!("network error: {}", e)))?;

        let status = response.status();
        tracing::info!("Fetched {}, got status {}", source, status);

        match status {
            StatusCode::OK => {}
            StatusCode::NOT_MODIFIED => return Ok(FetchOutcome::NotModified),
            _ => return Err(Error::UnexpectedStatus(format!("status {}", status))),
        }

        let limit = self.config.max_bytes as u64;
        if let Some(len) = response.content_length()
            && len > limit
        {
            return Err(self.too_large(len));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        // Read incrementally so a body without Content-Length is still capped.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?
        {
            let received = (body.len() + chunk.len()) as u64;
            if received > limit {
                return Err(self.too_large(received));
            }
            body.extend_from_slice(&chunk);
        }
        let bytes = Bytes::from(body);

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(FetchOutcome::Modified(FetchResponse { bytes, headers }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use httpmock::prelude::*;

    const LAST_MODIFIED: &str = "Sun, 06 Nov 1994 08:49:37 GMT";

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig::default()).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert!(config.user_agent.starts_with("FeedTransformer/1"));
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test-agent".into(), max_bytes: 42, timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.max_bytes, 42);
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let config = FetchConfig::default();
        let client = FetchClient::new(config);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_modified() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/feed.xml");
                then.status(200).header("Last-Modified", LAST_MODIFIED).body("<rss/>");
            })
            .await;

        let outcome = client().fetch(&server.url("/feed.xml"), None).await.unwrap();

        mock.assert_async().await;
        match outcome {
            FetchOutcome::Modified(response) => {
                assert_eq!(response.bytes.as_ref(), b"<rss/>");
                assert_eq!(response.headers.get(header::LAST_MODIFIED).unwrap(), LAST_MODIFIED);
            }
            FetchOutcome::NotModified => panic!("expected new content"),
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_if_modified_since() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/feed.xml")
                    .header("If-Modified-Since", LAST_MODIFIED);
                then.status(304);
            })
            .await;

        let since = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        let outcome = client().fetch(&server.url("/feed.xml"), Some(since)).await.unwrap();

        mock.assert_async().await;
        assert!(matches!(outcome, FetchOutcome::NotModified));
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/feed.xml").header("User-Agent", "feedtr-test/1");
                then.status(200).header("Last-Modified", LAST_MODIFIED).body("ok");
            })
            .await;

        let config = FetchConfig { user_agent: "feedtr-test/1".into(), ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        client.fetch(&server.url("/feed.xml"), None).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_unexpected_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone.xml");
                then.status(404);
            })
            .await;

        let result = client().fetch(&server.url("/gone.xml"), None).await;

        assert!(matches!(result, Err(Error::UnexpectedStatus(msg)) if msg.contains("404")));
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/big.xml");
                then.status(200).header("Last-Modified", LAST_MODIFIED).body("0123456789");
            })
            .await;

        let config = FetchConfig { max_bytes: 4, ..Default::default() };
        let result = FetchClient::new(config).unwrap().fetch(&server.url("/big.xml"), None).await;

        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_too_large_without_content_length() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nLast-Modified: {LAST_MODIFIED}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            for _ in 0..3 {
                let _ = socket.write_all(b"5\r\n01234\r\n").await;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        let config = FetchConfig { max_bytes: 8, ..Default::default() };
        let result = FetchClient::new(config)
            .unwrap()
            .fetch(&format!("http://{addr}/feed.xml"), None)
            .await;

        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let result = client().fetch("ftp://example.com/feed.xml", None).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_network_error() {
        // Port 9 (discard) on localhost is not expected to accept connections.
        let result = client().fetch("http://127.0.0.1:9/feed.xml", None).await;
        assert!(matches!(result, Err(Error::HttpError(_))));
    }
}
