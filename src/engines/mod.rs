//! Search backends.

// Authenticated JSON API
mod custom_search;

// Rendered results page
mod google;

pub use custom_search::{StructuredSearchClient, DEFAULT_ENDPOINT, MAX_RESULTS_PER_CALL};
pub use google::{
    results_wait_strategy, BrowserScrapingClient, DEFAULT_BASE_URL, ENGINE_DOMAIN,
    RESULT_CONTAINER_SELECTOR,
};
