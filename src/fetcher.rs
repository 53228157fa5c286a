//! Page fetcher abstraction for retrieving rendered HTML.

use async_trait::async_trait;

use crate::Result;

/// Readiness check run after navigation.
///
/// Waits until `css` matches. If it never does within `timeout_ms`, waits
/// `grace_ms` more and continues with whatever rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStrategy {
    /// CSS selector to wait for.
    pub css: String,
    /// Maximum time to wait for the selector in milliseconds.
    pub timeout_ms: u64,
    /// Extra wait in milliseconds when the selector never appears.
    pub grace_ms: u64,
}

impl WaitStrategy {
    pub fn selector(css: impl Into<String>, timeout_ms: u64, grace_ms: u64) -> Self {
        Self {
            css: css.into(),
            timeout_ms,
            grace_ms,
        }
    }
}

/// Trait for fetching the full HTML content of a URL.
///
/// Implementations may use plain HTTP requests or a headless browser.
/// All configuration (user agent, proxy, timeouts, wait strategy) is set
/// at construction time; `fetch` is a simple URL-in, HTML-out interface.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the HTML content of the given URL.
    async fn fetch(&self, url: &str) -> Result<String>;
}
