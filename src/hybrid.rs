//! Hybrid fetcher: cache, rate limit, structured API, browser fallback.
//!
//! Per request the fetcher:
//!
//! 1. serves a fresh cache entry for `{keyword, location}` without any
//!    external call,
//! 2. waits for a rate-limiter slot,
//! 3. runs the forced backend alone, or the structured backend (when it has
//!    quota) followed by the browser backend on any error or empty set,
//! 4. caches non-empty results for the TTL.
//!
//! Failures never escape: if nothing usable comes back the caller gets an
//! empty list.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::backend::SerpBackend;
use crate::cache::{CacheManager, CacheStats};
use crate::engines::ENGINE_DOMAIN;
use crate::quota::{QuotaCounter, QuotaStats};
use crate::rate_limiter::RateLimiter;
use crate::result::normalize_results;
use crate::{Result, SearchError, SearchMethod, SearchResult, SerpQuery};

/// How long results stay cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on one structured API call.
pub const DEFAULT_STRUCTURED_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on one browser render, including launch.
pub const DEFAULT_BROWSER_TIMEOUT: Duration = Duration::from_secs(60);

/// Composes both backends behind a cache and a rate limiter.
pub struct SerpHybridFetcher {
    structured: Arc<dyn SerpBackend>,
    browser: Arc<dyn SerpBackend>,
    quota: Arc<QuotaCounter>,
    cache: Arc<CacheManager<Vec<SearchResult>>>,
    rate_limiter: Arc<RateLimiter>,
    cache_ttl: Duration,
    structured_timeout: Duration,
    browser_timeout: Duration,
    engine_domain: String,
}

impl SerpHybridFetcher {
    /// Creates a fetcher with a fresh cache and a 2 requests/second limiter.
    ///
    /// `quota` must be the counter the structured backend records on.
    pub fn new(
        structured: Arc<dyn SerpBackend>,
        browser: Arc<dyn SerpBackend>,
        quota: Arc<QuotaCounter>,
    ) -> Self {
        Self {
            structured,
            browser,
            quota,
            cache: Arc::new(CacheManager::new()),
            rate_limiter: Arc::new(RateLimiter::new(2, Duration::from_secs(1))),
            cache_ttl: DEFAULT_CACHE_TTL,
            structured_timeout: DEFAULT_STRUCTURED_TIMEOUT,
            browser_timeout: DEFAULT_BROWSER_TIMEOUT,
            engine_domain: ENGINE_DOMAIN.to_string(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<CacheManager<Vec<SearchResult>>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the per-call timeouts for the structured and browser backends.
    pub fn with_timeouts(mut self, structured: Duration, browser: Duration) -> Self {
        self.structured_timeout = structured;
        self.browser_timeout = browser;
        self
    }

    /// Sets the domain stripped from every result list.
    pub fn with_engine_domain(mut self, engine_domain: impl Into<String>) -> Self {
        self.engine_domain = engine_domain.into();
        self
    }

    /// Returns results for `query`, or an empty list if every path failed.
    pub async fn search(
        &self,
        query: &SerpQuery,
        forced: Option<SearchMethod>,
    ) -> Vec<SearchResult> {
        let key = query.cache_key();
        if let Some(mut cached) = self.cache.get(&key).await {
            debug!("Cache hit for '{}'", key);
            cached.truncate(query.count);
            return cached;
        }

        if let Err(e) = self.rate_limiter.acquire().await {
            warn!("Dropping request for '{}': {}", query.keyword, e);
            return Vec::new();
        }

        let results = match forced {
            Some(method) => {
                info!("Using forced {} backend for '{}'", method, query.keyword);
                self.attempt(self.backend(method), query)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Forced {} backend failed: {}", method, e);
                        Vec::new()
                    })
            }
            None => self.with_fallback(query).await,
        };

        if results.is_empty() {
            warn!("No results for '{}' from any backend", query.keyword);
        } else {
            self.cache.set(key, results.clone(), self.cache_ttl).await;
        }
        results
    }

    async fn with_fallback(&self, query: &SerpQuery) -> Vec<SearchResult> {
        if self.structured.is_available() {
            match self.attempt(self.structured.as_ref(), query).await {
                Ok(results) => return results,
                Err(e) => info!("Structured search failed, falling back to browser: {}", e),
            }
        } else {
            debug!("Structured backend unavailable, using browser");
        }

        self.attempt(self.browser.as_ref(), query)
            .await
            .unwrap_or_else(|e| {
                warn!("Browser search failed: {}", e);
                Vec::new()
            })
    }

    fn backend(&self, method: SearchMethod) -> &dyn SerpBackend {
        match method {
            SearchMethod::Structured => self.structured.as_ref(),
            SearchMethod::Browser => self.browser.as_ref(),
        }
    }

    /// One bounded call; empty output counts as a failure.
    async fn attempt(
        &self,
        backend: &dyn SerpBackend,
        query: &SerpQuery,
    ) -> Result<Vec<SearchResult>> {
        let limit = match backend.method() {
            SearchMethod::Structured => self.structured_timeout,
            SearchMethod::Browser => self.browser_timeout,
        };
        let results = match timeout(limit, backend.search(query)).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                // Skip the API until the daily reset instead of asking again.
                if e.is_quota_exceeded() {
                    self.quota.mark_exhausted();
                }
                return Err(e);
            }
            Err(_) => return Err(SearchError::Timeout),
        };

        let results = normalize_results(results, &self.engine_domain, query.count);
        if results.is_empty() {
            return Err(SearchError::ExtractionEmpty(backend.name()));
        }
        debug!("{} backend returned {} results", backend.name(), results.len());
        Ok(results)
    }

    pub fn quota_stats(&self) -> QuotaStats {
        self.quota.stats()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Zeroes the structured usage counter.
    pub fn reset_daily_quota(&self) {
        self.quota.reset();
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
