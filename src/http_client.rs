//! HTTP fetch layer
//!
//! Features:
//! - One blocking-style GET per call returning the body as text
//! - Fresh browser identity per request (see [`crate::fingerprint`])
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - Per-host spacing to stay under anti-automation thresholds
//! - Non-2xx responses surface as [`FetchError::Status`]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::fingerprint::random_profile;
use crate::throttle::HostThrottle;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of raw page markup.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return the body.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch_text(url).await
    }
}

/// HTTP client used for all retailer and metadata traffic
pub struct AcceleratedClient {
    client: Client,
    throttle: HostThrottle,
}

impl AcceleratedClient {
    /// Create a client with the default timeout and no request spacing
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(DEFAULT_TIMEOUT, HostThrottle::disabled())
    }

    /// Create a client with an explicit timeout and throttle
    pub fn with_options(timeout: Duration, throttle: HostThrottle) -> Result<Self, FetchError> {
        let client = Client::builder()
            // Let the server negotiate HTTP/2
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            // Retailers hand out session cookies on the first hit
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, throttle })
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for AcceleratedClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        self.throttle.wait(&host).await;

        let profile = random_profile();
        debug!(user_agent = %profile.user_agent, "Fetching");

        let response = self
            .client
            .get(url)
            .headers(profile.to_headers())
            .header("Referer", "https://www.google.com/")
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, version = ?response.version(), "Response received");
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Serves canned bodies keyed by URL.
///
/// Unknown URLs answer 404. Used by tests and for replaying saved pages.
#[derive(Debug, Default, Clone)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` for `url`.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_serves_registered_pages() {
        let fetcher = FixtureFetcher::new().with_page("https://a.test/x", "<html>ok</html>");
        assert_eq!(fetcher.fetch_text("https://a.test/x").await.unwrap(), "<html>ok</html>");
    }

    #[tokio::test]
    async fn fixture_unknown_url_is_404() {
        let fetcher = FixtureFetcher::new();
        match fetcher.fetch_text("https://a.test/missing").await {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected 404, got {other:?}"),
        }
    }

    #[test]
    fn client_builds() {
        assert!(AcceleratedClient::new().is_ok());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_example() {
        let client = AcceleratedClient::new().unwrap();
        let body = client.fetch_text("https://example.com").await.unwrap();
        assert!(body.contains("Example Domain"));
    }
}
