//! Environment-provided configuration.
//!
//! Variables carry the `SERP_` prefix followed by the field name, e.g.
//! `SERP_DAILY_QUOTA=250`. Durations name their unit (`_MS`, `_SECS`) and
//! `SERP_PROXY_SOURCES` is a comma-separated list.

use std::time::Duration;

use ::config::{Config, Environment};
use serde::Deserialize;

use crate::engines::DEFAULT_ENDPOINT;
use crate::proxy::{DEFAULT_MAX_PROBED, DEFAULT_PROBE_TIMEOUT, DEFAULT_PROBE_URL, DEFAULT_PROXY_SOURCES};
use crate::{Result, SearchError};

const ENV_PREFIX: &str = "SERP";

/// Settings for wiring a [`crate::ParserOrchestrator`].
#[derive(Debug, Clone, PartialEq)]
pub struct SerpConfig {
    /// Structured API key (`SERP_API_KEY`).
    pub api_key: Option<String>,
    /// Structured API engine identifier (`SERP_ENGINE_ID`).
    pub engine_id: Option<String>,
    pub api_endpoint: String,
    /// Structured calls allowed per day.
    pub daily_quota: u32,
    /// Requests admitted per rate-limit window.
    pub rate_limit_requests: usize,
    pub rate_limit_window: Duration,
    pub cache_ttl: Duration,
    /// Route browser/HTTP page fetches through the public proxy pool.
    pub use_proxies: bool,
    pub proxy_sources: Vec<String>,
    pub proxy_probe_url: String,
    pub proxy_probe_timeout: Duration,
    /// Candidates probed per load.
    pub proxy_max_probe: usize,
    pub headless: bool,
    /// Chrome executable (`SERP_CHROME_PATH`); when unset the `CHROME`
    /// variable and the usual install locations are searched.
    pub chrome_path: Option<String>,
}

/// Raw variables as they appear in the environment.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct EnvSettings {
    api_key: Option<String>,
    engine_id: Option<String>,
    api_endpoint: String,
    daily_quota: u32,
    rate_limit_requests: usize,
    rate_limit_window_ms: u64,
    cache_ttl_secs: u64,
    use_proxies: bool,
    proxy_sources: Vec<String>,
    proxy_probe_url: String,
    proxy_probe_timeout_ms: u64,
    proxy_max_probe: usize,
    headless: bool,
    chrome_path: Option<String>,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            api_endpoint: DEFAULT_ENDPOINT.to_string(),
            daily_quota: 100,
            rate_limit_requests: 2,
            rate_limit_window_ms: 1000,
            cache_ttl_secs: 86_400,
            use_proxies: false,
            proxy_sources: DEFAULT_PROXY_SOURCES.iter().map(|s| s.to_string()).collect(),
            proxy_probe_url: DEFAULT_PROBE_URL.to_string(),
            proxy_probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            proxy_max_probe: DEFAULT_MAX_PROBED,
            headless: true,
            chrome_path: None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<EnvSettings> for SerpConfig {
    fn from(settings: EnvSettings) -> Self {
        let mut proxy_sources: Vec<String> = settings
            .proxy_sources
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if proxy_sources.is_empty() {
            proxy_sources = EnvSettings::default().proxy_sources;
        }

        Self {
            api_key: non_blank(settings.api_key),
            engine_id: non_blank(settings.engine_id),
            api_endpoint: settings.api_endpoint,
            daily_quota: settings.daily_quota,
            rate_limit_requests: settings.rate_limit_requests,
            rate_limit_window: Duration::from_millis(settings.rate_limit_window_ms),
            cache_ttl: Duration::from_secs(settings.cache_ttl_secs),
            use_proxies: settings.use_proxies,
            proxy_sources,
            proxy_probe_url: settings.proxy_probe_url,
            proxy_probe_timeout: Duration::from_millis(settings.proxy_probe_timeout_ms),
            proxy_max_probe: settings.proxy_max_probe,
            headless: settings.headless,
            chrome_path: non_blank(settings.chrome_path),
        }
    }
}

impl Default for SerpConfig {
    fn default() -> Self {
        EnvSettings::default().into()
    }
}

impl SerpConfig {
    /// Reads `SERP_*` variables from the process environment. Unset or
    /// empty variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::load(environment())
    }

    fn load(source: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(source)
            .build()
            .and_then(|config| config.try_deserialize::<EnvSettings>())
            .map_err(|e| SearchError::Configuration(e.to_string()))?;
        Ok(settings.into())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .ignore_empty(true)
        .list_separator(",")
        .with_list_parse_key("proxy_sources")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_vars(vars: &[(&str, &str)]) -> Result<SerpConfig> {
        let vars: ::config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SerpConfig::load(environment().source(Some(vars)))
    }

    #[test]
    fn test_defaults() {
        let c = load_vars(&[]).unwrap();
        assert_eq!(c, SerpConfig::default());
        assert_eq!(c.daily_quota, 100);
        assert_eq!(c.rate_limit_requests, 2);
        assert_eq!(c.rate_limit_window, Duration::from_secs(1));
        assert_eq!(c.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(c.proxy_probe_timeout, DEFAULT_PROBE_TIMEOUT);
        assert!(!c.use_proxies);
        assert!(c.headless);
        assert_eq!(c.proxy_sources.len(), DEFAULT_PROXY_SOURCES.len());
        assert!(c.api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let c = load_vars(&[
            ("SERP_API_KEY", "abc"),
            ("SERP_ENGINE_ID", "cx1"),
            ("SERP_DAILY_QUOTA", "250"),
            ("SERP_RATE_LIMIT_REQUESTS", "5"),
            ("SERP_RATE_LIMIT_WINDOW_MS", "2000"),
            ("SERP_CACHE_TTL_SECS", "60"),
            ("SERP_USE_PROXIES", "yes"),
            ("SERP_PROXY_SOURCES", "http://a/list.txt, ,http://b/list.json"),
            ("SERP_PROXY_PROBE_TIMEOUT_MS", "1500"),
            ("SERP_PROXY_MAX_PROBE", "20"),
            ("SERP_HEADLESS", "false"),
            ("SERP_CHROME_PATH", "/usr/bin/chromium"),
        ])
        .unwrap();
        assert_eq!(c.api_key.as_deref(), Some("abc"));
        assert_eq!(c.engine_id.as_deref(), Some("cx1"));
        assert_eq!(c.daily_quota, 250);
        assert_eq!(c.rate_limit_requests, 5);
        assert_eq!(c.rate_limit_window, Duration::from_secs(2));
        assert_eq!(c.cache_ttl, Duration::from_secs(60));
        assert!(c.use_proxies);
        assert_eq!(c.proxy_sources, vec!["http://a/list.txt", "http://b/list.json"]);
        assert_eq!(c.proxy_probe_timeout, Duration::from_millis(1500));
        assert_eq!(c.proxy_max_probe, 20);
        assert!(!c.headless);
        assert_eq!(c.chrome_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn test_single_proxy_source() {
        let c = load_vars(&[("SERP_PROXY_SOURCES", "http://a/list.txt")]).unwrap();
        assert_eq!(c.proxy_sources, vec!["http://a/list.txt"]);
    }

    #[test]
    fn test_numeric_api_key_stays_a_string() {
        let c = load_vars(&[("SERP_API_KEY", "12345")]).unwrap();
        assert_eq!(c.api_key.as_deref(), Some("12345"));
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let c = load_vars(&[("SERP_API_KEY", "  "), ("SERP_DAILY_QUOTA", "")]).unwrap();
        assert!(c.api_key.is_none());
        assert_eq!(c.daily_quota, 100);
    }

    #[test]
    fn test_unprefixed_variables_are_ignored() {
        let c = load_vars(&[("DAILY_QUOTA", "5"), ("OTHER_DAILY_QUOTA", "7")]).unwrap();
        assert_eq!(c.daily_quota, 100);
    }

    #[test]
    fn test_invalid_number_is_configuration_error() {
        let err = load_vars(&[("SERP_DAILY_QUOTA", "lots")]).unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
    }

    #[test]
    fn test_invalid_bool_is_configuration_error() {
        let err = load_vars(&[("SERP_HEADLESS", "maybe")]).unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
    }
}
