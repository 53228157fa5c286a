//! Analysis requests and backend-facing queries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SearchError;

/// Default number of results per request.
pub const DEFAULT_RESULT_COUNT: usize = 10;

/// Upper bound on results per request.
pub const MAX_RESULT_COUNT: usize = 100;

/// Backend used to acquire results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Authenticated JSON search API.
    Structured,
    /// Headless-browser scraping of the rendered results page.
    Browser,
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMethod::Structured => f.write_str("structured"),
            SearchMethod::Browser => f.write_str("browser"),
        }
    }
}

impl FromStr for SearchMethod {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "api" => Ok(SearchMethod::Structured),
            "browser" | "scraper" => Ok(SearchMethod::Browser),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown search method '{}'",
                other
            ))),
        }
    }
}

fn default_result_count() -> usize {
    DEFAULT_RESULT_COUNT
}

/// A competitor-analysis request as submitted by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Keyword to search for.
    pub keyword: String,
    /// Country/location code (e.g., "us").
    #[serde(default)]
    pub location: Option<String>,
    /// Interface language (e.g., "en").
    #[serde(default)]
    pub language: Option<String>,
    /// Number of results wanted.
    #[serde(default = "default_result_count")]
    pub result_count: usize,
    /// Operator override pinning a single backend.
    #[serde(default)]
    pub forced_method: Option<SearchMethod>,
}

impl AnalysisRequest {
    /// Creates a request for the given keyword with default settings.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            location: None,
            language: None,
            result_count: DEFAULT_RESULT_COUNT,
            forced_method: None,
        }
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the number of results.
    pub fn with_result_count(mut self, count: usize) -> Self {
        self.result_count = count;
        self
    }

    /// Pins the request to one backend.
    pub fn with_forced_method(mut self, method: SearchMethod) -> Self {
        self.forced_method = Some(method);
        self
    }

    /// Rejects malformed requests.
    pub fn validate(&self) -> crate::Result<()> {
        if self.keyword.trim().is_empty() {
            return Err(SearchError::InvalidQuery("Keyword cannot be empty".into()));
        }
        if self.result_count == 0 || self.result_count > MAX_RESULT_COUNT {
            return Err(SearchError::InvalidQuery(format!(
                "Result count must be between 1 and {}, got {}",
                MAX_RESULT_COUNT, self.result_count
            )));
        }
        Ok(())
    }
}

/// The query handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerpQuery {
    pub keyword: String,
    pub location: Option<String>,
    pub language: Option<String>,
    pub count: usize,
}

impl SerpQuery {
    /// Creates a query with the default count.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            location: None,
            language: None,
            count: DEFAULT_RESULT_COUNT,
        }
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the result count.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Cache key: keyword and location only, normalized.
    ///
    /// Both parts are percent-encoded so a `:` inside either cannot shift the
    /// boundary between them.
    pub fn cache_key(&self) -> String {
        let location = self
            .location
            .as_deref()
            .map(|l| l.trim().to_lowercase())
            .unwrap_or_default();
        format!(
            "serp:{}:{}",
            urlencoding::encode(&self.keyword.trim().to_lowercase()),
            urlencoding::encode(&location)
        )
    }
}

impl From<&AnalysisRequest> for SerpQuery {
    fn from(request: &AnalysisRequest) -> Self {
        Self {
            keyword: request.keyword.trim().to_string(),
            location: request.location.clone().filter(|l| !l.trim().is_empty()),
            language: request.language.clone().filter(|l| !l.trim().is_empty()),
            count: request.result_count,
        }
    }
}
