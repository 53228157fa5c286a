//! HTTP-based page fetcher using reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::fetcher::PageFetcher;
use crate::proxy::ProxyManager;
use crate::Result;

/// Desktop Chrome user agent shared by the HTTP and browser fetchers.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// A page fetcher that uses plain HTTP requests.
///
/// Each fetch builds a client through the proxy pool when one is
/// configured, so consecutive requests rotate exit addresses. Without a
/// pool (or with an empty one) requests go out directly. Used as the
/// browser backend's fetcher when the `headless` feature is off.
pub struct HttpFetcher {
    proxies: Option<Arc<ProxyManager>>,
    user_agent: String,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a new `HttpFetcher` with default settings.
    pub fn new() -> Self {
        Self {
            proxies: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Routes requests through the given proxy pool.
    pub fn with_proxies(mut self, proxies: Arc<ProxyManager>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Sets a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let client = match self.proxies {
            Some(ref proxies) => proxies.create_client(&self.user_agent, self.timeout).await?,
            None => reqwest::Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()?,
        };

        let response = client
            .get(url)
            .headers(Self::default_headers())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
