//! Error types for SERP acquisition.

use thiserror::Error;

/// Result type alias for SERP operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while acquiring search results.
#[derive(Error, Debug)]
pub enum SearchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Required configuration (credentials, settings) is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The structured backend refused the call because its quota is spent.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The backend responded but nothing usable could be extracted.
    #[error("No usable results from {0} backend")]
    ExtractionEmpty(String),

    /// The target engine served a bot-detection page.
    #[error("Blocked by {0}: {1}")]
    Blocked(String, String),

    /// Headless browser failure (launch, navigation, tab handling).
    #[error("Browser error: {0}")]
    Browser(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Search timeout exceeded.
    #[error("Search timeout exceeded")]
    Timeout,

    /// The rate limiter could not admit the call within its iteration guard.
    #[error("Rate limiter gave up after {0} attempts")]
    RateLimited(u32),

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Returns true for the quota-exhaustion condition.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, SearchError::QuotaExceeded(_))
    }

    /// Returns true for network, timeout and browser failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SearchError::Http(_) | SearchError::Timeout | SearchError::Browser(_)
        )
    }
}
