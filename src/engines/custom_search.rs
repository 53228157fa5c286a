//! Structured backend: Google Custom Search JSON API.
//!
//! One authenticated GET per search. Each successful call is recorded on
//! the shared [`QuotaCounter`]; once the daily ceiling is reached the
//! client reports itself unavailable so the fetcher goes straight to the
//! browser backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::backend::SerpBackend;
use crate::quota::QuotaCounter;
use crate::result::renumber;
use crate::{Result, SearchError, SearchMethod, SearchResult, SerpQuery};

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Largest `num` the API accepts per call.
pub const MAX_RESULTS_PER_CALL: usize = 10;

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Debug, Deserialize)]
struct CustomSearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Authenticated, quota-tracked API search client.
pub struct StructuredSearchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: Option<String>,
    quota: Arc<QuotaCounter>,
}

impl StructuredSearchClient {
    /// Creates a client. Missing credentials are allowed here and only
    /// surface when a search is attempted.
    pub fn new(
        api_key: Option<String>,
        engine_id: Option<String>,
        quota: Arc<QuotaCounter>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            engine_id: engine_id.filter(|id| !id.trim().is_empty()),
            quota,
        })
    }

    /// Overrides the API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Returns whether credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.engine_id.is_some()
    }

    /// Returns whether a call is currently allowed.
    pub fn can_use(&self) -> bool {
        self.has_credentials() && self.quota.has_remaining()
    }

    /// Returns the shared quota counter.
    pub fn quota(&self) -> &Arc<QuotaCounter> {
        &self.quota
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.api_key, &self.engine_id) {
            (Some(key), Some(cx)) => Ok((key.as_str(), cx.as_str())),
            _ => Err(SearchError::Configuration(
                "structured search requires SERP_API_KEY and SERP_ENGINE_ID".to_string(),
            )),
        }
    }

    fn build_params(&self, query: &SerpQuery, key: &str, cx: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("key", key.to_string()),
            ("cx", cx.to_string()),
            ("q", query.keyword.clone()),
            ("num", query.count.clamp(1, MAX_RESULTS_PER_CALL).to_string()),
        ];
        if let Some(ref location) = query.location {
            params.push(("gl", location.to_lowercase()));
        }
        if let Some(ref language) = query.language {
            params.push(("hl", language.clone()));
        }
        params
    }
}

fn is_quota_body(body: &str) -> bool {
    body.contains("dailyLimitExceeded")
        || body.contains("rateLimitExceeded")
        || body.contains("Quota exceeded")
        || body.contains("RESOURCE_EXHAUSTED")
}

#[async_trait]
impl SerpBackend for StructuredSearchClient {
    fn method(&self) -> SearchMethod {
        SearchMethod::Structured
    }

    fn is_available(&self) -> bool {
        self.can_use()
    }

    async fn search(&self, query: &SerpQuery) -> Result<Vec<SearchResult>> {
        let (key, cx) = self.credentials()?;
        if !self.quota.has_remaining() {
            return Err(SearchError::QuotaExceeded(format!(
                "daily limit of {} calls reached",
                self.quota.limit()
            )));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.build_params(query, key, cx))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::QuotaExceeded(format!("HTTP {}", status)));
        }
        if status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            if is_quota_body(&body) {
                return Err(SearchError::QuotaExceeded(format!("HTTP {}", status)));
            }
            return Err(SearchError::Other(format!(
                "Structured search rejected the request: HTTP {}",
                status
            )));
        }

        let payload: CustomSearchResponse = response.error_for_status()?.json().await?;
        let used = self.quota.record_call();
        debug!(
            "Structured search returned {} items ({}/{} quota used)",
            payload.items.len(),
            used,
            self.quota.limit()
        );

        let mut results: Vec<SearchResult> = payload
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .filter_map(|item| SearchResult::organic(item.link, item.title.trim(), item.snippet.trim()))
            .take(query.count)
            .collect();
        renumber(&mut results);
        Ok(results)
    }
}
