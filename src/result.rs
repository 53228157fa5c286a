//! Search result types.

use serde::{Deserialize, Serialize};
use url::Url;

/// Type of search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    /// Standard organic listing.
    #[default]
    Organic,
}

/// A single ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// 1-based rank within one result list.
    pub position: u32,
    /// Absolute result URL.
    pub url: String,
    /// Lowercased host without a leading `www.`.
    pub domain: String,
    /// Result title.
    pub title: String,
    /// Result description/snippet.
    pub description: String,
    /// Type of result.
    pub result_type: ResultType,
}

impl SearchResult {
    /// Creates an organic result, deriving the domain from the URL.
    ///
    /// Returns `None` when the URL has no host.
    pub fn organic(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Option<Self> {
        let url = url.into();
        let domain = extract_domain(&url)?;
        Some(Self {
            position: 0,
            url,
            domain,
            title: title.into(),
            description: description.into(),
            result_type: ResultType::Organic,
        })
    }

    /// Sets the position.
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

/// Returns the lowercased host of `url` with any leading `www.` removed.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let domain = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

/// Returns true if `domain` is the engine's own domain or one of its subdomains.
pub fn is_engine_domain(domain: &str, engine_domain: &str) -> bool {
    domain == engine_domain
        || domain
            .strip_suffix(engine_domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Assigns contiguous 1-based positions in list order.
pub fn renumber(results: &mut [SearchResult]) {
    for (i, result) in results.iter_mut().enumerate() {
        result.position = i as u32 + 1;
    }
}

/// Drops results pointing at the engine itself, truncates to `limit` and renumbers.
pub fn normalize_results(
    results: Vec<SearchResult>,
    engine_domain: &str,
    limit: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| !r.domain.is_empty() && !is_engine_domain(&r.domain, engine_domain))
        .take(limit)
        .collect();
    renumber(&mut results);
    results
}
