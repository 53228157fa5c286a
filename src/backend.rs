//! Backend trait shared by the structured and browser clients.

use async_trait::async_trait;

use crate::{Result, SearchMethod, SearchResult, SerpQuery};

/// A source of ranked search results.
///
/// The hybrid fetcher only sees this trait, so either backend can be
/// replaced (or faked in tests) without touching the fallback logic.
#[async_trait]
pub trait SerpBackend: Send + Sync {
    /// Which method this backend implements.
    fn method(&self) -> SearchMethod;

    /// Returns whether the backend can currently be called.
    ///
    /// The structured client reports `false` once its quota is spent or
    /// when credentials are missing.
    fn is_available(&self) -> bool {
        true
    }

    /// Performs a search and returns results in rank order.
    async fn search(&self, query: &SerpQuery) -> Result<Vec<SearchResult>>;

    /// Returns the backend name used in logs.
    fn name(&self) -> String {
        self.method().to_string()
    }
}
