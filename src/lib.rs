//! # serp-hybrid
//!
//! Turns a keyword into a ranked list of competitor domains.
//!
//! Results come from a quota-limited search API when it is usable, and from
//! a headless browser scraping the rendered results page otherwise. Both
//! paths sit behind:
//!
//! - a sliding-window rate limiter
//! - a TTL result cache keyed on keyword and location
//! - an optional pool of probed public proxies
//!
//! Backend failures never reach the caller; they degrade to an empty list.
//!
//! ## Example
//!
//! ```rust,no_run
//! use serp_hybrid::{AnalysisRequest, ParserOrchestrator, SerpConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = ParserOrchestrator::from_config(&SerpConfig::from_env()?)?;
//!
//!     let request = AnalysisRequest::new("best running shoes")
//!         .with_location("us")
//!         .with_result_count(5);
//!     for competitor in orchestrator.analyze_competitors(&request).await? {
//!         println!("{}. {} ({})", competitor.position, competitor.domain, competitor.url);
//!     }
//!
//!     println!("{:?}", orchestrator.get_stats().await);
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```

mod backend;
mod config;
mod error;
mod hybrid;
mod orchestrator;
mod query;
mod result;

pub mod cache;
pub mod engines;
pub mod extract;
pub mod fetcher;
pub mod fetcher_http;
pub mod proxy;
pub mod quota;
pub mod rate_limiter;

#[cfg(feature = "headless")]
pub mod browser;
#[cfg(feature = "headless")]
pub mod browser_setup;

pub use backend::SerpBackend;
pub use self::config::SerpConfig;
pub use error::{Result, SearchError};
pub use hybrid::{
    SerpHybridFetcher, DEFAULT_BROWSER_TIMEOUT, DEFAULT_CACHE_TTL, DEFAULT_STRUCTURED_TIMEOUT,
};
pub use orchestrator::{CompetitorRecord, ParserOrchestrator, ParserStats};
pub use query::{AnalysisRequest, SearchMethod, SerpQuery, DEFAULT_RESULT_COUNT, MAX_RESULT_COUNT};
pub use result::{
    extract_domain, is_engine_domain, normalize_results, renumber, ResultType, SearchResult,
};
