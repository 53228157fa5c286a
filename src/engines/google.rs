//! Browser backend: renders Google's results page and scrapes it.
//!
//! Google's results rely on JavaScript rendering, so the page is fetched
//! through a `PageFetcher` (a `BrowserFetcher` in production). Extraction
//! runs the ordered strategies in [`crate::extract`].

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::backend::SerpBackend;
use crate::extract::extract_results;
use crate::fetcher::{PageFetcher, WaitStrategy};
use crate::{Result, SearchError, SearchMethod, SearchResult, SerpQuery};

/// Results page origin.
pub const DEFAULT_BASE_URL: &str = "https://www.google.com";

/// Domain whose results are never competitors.
pub const ENGINE_DOMAIN: &str = "google.com";

/// Container that holds organic results once rendering finishes.
pub const RESULT_CONTAINER_SELECTOR: &str = "#search";

/// Elements only present on the interstitial served instead of results.
const BLOCK_PAGE_SELECTOR: &str =
    "form[action*='/sorry/'], #captcha-form, div.g-recaptcha, iframe[src*='recaptcha']";

const BLOCK_PAGE_TEXT: &str = "unusual traffic from your computer network";

/// Wait strategy matching the results page: container up to 10s, then a
/// 3s grace period if it never shows.
pub fn results_wait_strategy() -> WaitStrategy {
    WaitStrategy::selector(RESULT_CONTAINER_SELECTOR, 10_000, 3_000)
}

/// Headless-browser scraping client.
pub struct BrowserScrapingClient {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
    engine_domain: String,
}

impl BrowserScrapingClient {
    /// Creates a client that renders pages with `fetcher`.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            base_url: DEFAULT_BASE_URL.to_string(),
            engine_domain: ENGINE_DOMAIN.to_string(),
        }
    }

    /// Overrides the results page origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Domain filtered out of results.
    pub fn engine_domain(&self) -> &str {
        &self.engine_domain
    }

    fn build_url(&self, query: &SerpQuery) -> Result<Url> {
        let mut url = format!(
            "{}/search?q={}&num={}",
            self.base_url,
            urlencoding::encode(&query.keyword),
            query.count
        );
        if let Some(ref language) = query.language {
            url.push_str(&format!("&hl={}", urlencoding::encode(language)));
        }
        if let Some(ref location) = query.location {
            url.push_str(&format!("&gl={}", urlencoding::encode(&location.to_lowercase())));
        }
        Ok(Url::parse(&url)?)
    }

    fn parse_results(&self, html: &str, base: &Url, count: usize) -> Result<Vec<SearchResult>> {
        if let Some((strategy, mut results)) = extract_results(html, base, &self.engine_domain)? {
            debug!("Strategy '{}' extracted {} results", strategy, results.len());
            results.truncate(count);
            return Ok(results);
        }

        // Result text may quote the block page; only an empty page is judged.
        if is_block_page(html)? {
            return Err(SearchError::Blocked(
                "google".to_string(),
                "served a CAPTCHA / unusual traffic page".to_string(),
            ));
        }
        Ok(Vec::new())
    }
}

fn is_block_page(html: &str) -> Result<bool> {
    let selector = Selector::parse(BLOCK_PAGE_SELECTOR).map_err(|e| {
        SearchError::Parse(format!("Failed to parse selector '{}': {:?}", BLOCK_PAGE_SELECTOR, e))
    })?;
    let document = Html::parse_document(html);
    if document.select(&selector).next().is_some() {
        return Ok(true);
    }
    let text = document.root_element().text().collect::<String>().to_lowercase();
    Ok(text.contains(BLOCK_PAGE_TEXT))
}

#[async_trait]
impl SerpBackend for BrowserScrapingClient {
    fn method(&self) -> SearchMethod {
        SearchMethod::Browser
    }

    async fn search(&self, query: &SerpQuery) -> Result<Vec<SearchResult>> {
        let url = self.build_url(query)?;
        let html = self.fetcher.fetch(url.as_str()).await?;
        self.parse_results(&html, &url, query.count)
    }
}
