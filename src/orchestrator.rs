//! Public facade: request validation, delegation, output mapping, stats.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::backend::SerpBackend;
use crate::cache::{CacheManager, CacheStats};
use crate::config::SerpConfig;
use crate::engines::{BrowserScrapingClient, StructuredSearchClient};
use crate::fetcher::PageFetcher;
use crate::hybrid::SerpHybridFetcher;
use crate::proxy::{HttpProbe, ProxyManager, ProxyStats};
use crate::quota::{QuotaCounter, QuotaStats};
use crate::rate_limiter::RateLimiter;
use crate::{AnalysisRequest, Result, ResultType, SearchResult, SerpQuery};

#[cfg(feature = "headless")]
use crate::browser::{BrowserFetcher, BrowserPool, BrowserPoolConfig};

/// A competitor as handed to downstream collaborators.
///
/// Metric fields are filled later by other services and are always `None`
/// here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorRecord {
    pub position: u32,
    pub url: String,
    pub domain: String,
    pub title: String,
    pub description: String,
    pub result_type: ResultType,
    pub domain_authority: Option<f64>,
    pub page_authority: Option<f64>,
    pub backlinks: Option<u64>,
    pub referring_domains: Option<u64>,
    pub spam_score: Option<f64>,
}

impl From<SearchResult> for CompetitorRecord {
    fn from(result: SearchResult) -> Self {
        Self {
            position: result.position,
            url: result.url,
            domain: result.domain,
            title: result.title,
            description: result.description,
            result_type: result.result_type,
            domain_authority: None,
            page_authority: None,
            backlinks: None,
            referring_domains: None,
            spam_score: None,
        }
    }
}

/// Usage statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserStats {
    pub structured_api: QuotaStats,
    pub cache: CacheStats,
}

/// Entry point for competitor analysis.
pub struct ParserOrchestrator {
    fetcher: SerpHybridFetcher,
    proxies: Option<Arc<ProxyManager>>,
    #[cfg(feature = "headless")]
    browser_pool: Option<Arc<BrowserPool>>,
}

impl ParserOrchestrator {
    /// Wraps an already wired fetcher.
    pub fn new(fetcher: SerpHybridFetcher) -> Self {
        Self {
            fetcher,
            proxies: None,
            #[cfg(feature = "headless")]
            browser_pool: None,
        }
    }

    /// Wires every component from `config`.
    ///
    /// Nothing touches the network here: the proxy pool loads on first use
    /// and the browser launches on the first browser search.
    pub fn from_config(config: &SerpConfig) -> Result<Self> {
        let quota = Arc::new(QuotaCounter::new(config.daily_quota));
        let structured = StructuredSearchClient::new(
            config.api_key.clone(),
            config.engine_id.clone(),
            Arc::clone(&quota),
        )?
        .with_endpoint(config.api_endpoint.clone());

        let proxies = if config.use_proxies {
            let manager = ProxyManager::from_sources(config.proxy_sources.as_slice())?
                .with_probe(HttpProbe::new(
                    config.proxy_probe_url.clone(),
                    config.proxy_probe_timeout,
                ))
                .with_max_probed(config.proxy_max_probe);
            Some(Arc::new(manager))
        } else {
            None
        };

        #[cfg(feature = "headless")]
        let (page_fetcher, browser_pool) = {
            let mut pool = BrowserPool::new(BrowserPoolConfig {
                headless: config.headless,
                chrome_path: config.chrome_path.clone(),
                ..Default::default()
            });
            if let Some(ref proxies) = proxies {
                pool = pool.with_proxies(Arc::clone(proxies));
            }
            let pool = Arc::new(pool);
            let fetcher: Arc<dyn PageFetcher> = Arc::new(
                BrowserFetcher::new(Arc::clone(&pool))
                    .with_wait(crate::engines::results_wait_strategy()),
            );
            (fetcher, Some(pool))
        };

        #[cfg(not(feature = "headless"))]
        let page_fetcher: Arc<dyn PageFetcher> = {
            let mut fetcher = crate::fetcher_http::HttpFetcher::new();
            if let Some(ref proxies) = proxies {
                fetcher = fetcher.with_proxies(Arc::clone(proxies));
            }
            Arc::new(fetcher)
        };

        let browser: Arc<dyn SerpBackend> = Arc::new(BrowserScrapingClient::new(page_fetcher));
        let fetcher = SerpHybridFetcher::new(Arc::new(structured), browser, quota)
            .with_cache(Arc::new(CacheManager::new()))
            .with_rate_limiter(Arc::new(RateLimiter::new(
                config.rate_limit_requests,
                config.rate_limit_window,
            )))
            .with_cache_ttl(config.cache_ttl);

        debug!(
            "Orchestrator wired (quota {}/day, proxies {})",
            config.daily_quota,
            if config.use_proxies { "on" } else { "off" }
        );

        Ok(Self {
            fetcher,
            proxies,
            #[cfg(feature = "headless")]
            browser_pool,
        })
    }

    /// Attaches a proxy pool for [`Self::proxy_stats`].
    pub fn with_proxies(mut self, proxies: Arc<ProxyManager>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Returns ranked competitors for `request`.
    ///
    /// Only malformed requests are errors; backend failures yield an
    /// empty list.
    pub async fn analyze_competitors(&self, request: &AnalysisRequest) -> Result<Vec<CompetitorRecord>> {
        request.validate()?;
        let query = SerpQuery::from(request);
        info!(
            "Analyzing competitors for '{}' ({})",
            query.keyword,
            query.location.as_deref().unwrap_or("any location")
        );

        let results = self.fetcher.search(&query, request.forced_method).await;
        Ok(results.into_iter().map(CompetitorRecord::from).collect())
    }

    pub async fn get_stats(&self) -> ParserStats {
        ParserStats {
            structured_api: self.fetcher.quota_stats(),
            cache: self.fetcher.cache_stats().await,
        }
    }

    /// Zeroes the structured API usage counter.
    pub fn reset_daily_quota(&self) {
        self.fetcher.reset_daily_quota();
    }

    /// Proxy pool statistics, or `None` when proxies are disabled.
    pub async fn proxy_stats(&self) -> Option<ProxyStats> {
        match self.proxies {
            Some(ref proxies) => Some(proxies.get_stats().await),
            None => None,
        }
    }

    /// Returns the underlying fetcher.
    pub fn fetcher(&self) -> &SerpHybridFetcher {
        &self.fetcher
    }

    /// Releases the browser, if one was launched.
    pub async fn shutdown(&self) {
        #[cfg(feature = "headless")]
        if let Some(ref pool) = self.browser_pool {
            pool.shutdown().await;
        }
        debug!("Orchestrator shut down");
    }
}
