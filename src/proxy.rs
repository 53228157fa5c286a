//! Validated proxy pool fed by public proxy lists.
//!
//! Sources are fetched concurrently and merged; a failing source only
//! contributes nothing. Candidates are probed through a [`ProxyProbe`] and
//! only the ones that answered in time enter the working pool, fastest
//! first. An empty pool is a normal state: callers connect directly.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::{Client, Proxy as ReqwestProxy};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::{Result, SearchError};

/// Default endpoint used to probe proxies.
pub const DEFAULT_PROBE_URL: &str = "http://httpbin.org/ip";

/// Default probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of candidates probed per load.
pub const DEFAULT_MAX_PROBED: usize = 200;

const PROBE_CONCURRENCY: usize = 50;

/// Public proxy lists used when none are configured.
pub const DEFAULT_PROXY_SOURCES: &[&str] = &[
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=10000&country=all",
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
    "https://raw.githubusercontent.com/clarketm/proxy-list/master/proxy-list-raw.txt",
    "https://proxylist.geonode.com/api/proxy-list?limit=200&page=1&sort_by=lastChecked&sort_type=desc",
];

static PROXY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<scheme>https?|socks5)://)?(?P<host>[A-Za-z0-9.\-]+):(?P<port>\d{1,5})\b")
        .expect("proxy line pattern is valid")
});

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    /// HTTP proxy
    #[default]
    Http,
    /// HTTPS proxy
    Https,
    /// SOCKS5 proxy
    Socks5,
}

impl ProxyProtocol {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            "socks5" | "socks" => Some(ProxyProtocol::Socks5),
            _ => None,
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

/// A proxy candidate and the outcome of its last probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub protocol: ProxyProtocol,
    pub is_working: bool,
    pub latency_ms: Option<u64>,
    pub last_checked_at: Option<SystemTime>,
    pub country: Option<String>,
}

impl Proxy {
    /// Creates an unprobed HTTP proxy.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: ProxyProtocol::Http,
            is_working: false,
            latency_ms: None,
            last_checked_at: None,
            country: None,
        }
    }

    /// Sets the proxy protocol.
    pub fn with_protocol(mut self, protocol: ProxyProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the country code.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Returns the `host:port` identity used for de-duplication.
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the proxy URL string.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }
}

/// Trait for a source of proxy candidates.
#[async_trait]
pub trait ProxyProvider: Send + Sync {
    /// Fetches the current candidate list.
    async fn fetch_proxies(&self) -> Result<Vec<Proxy>>;

    /// Short label for logs.
    fn name(&self) -> String;
}

/// A provider that returns a fixed list of proxies.
pub struct StaticProxyProvider {
    proxies: Vec<Proxy>,
}

impl StaticProxyProvider {
    /// Creates a new static proxy provider.
    pub fn new(proxies: Vec<Proxy>) -> Self {
        Self { proxies }
    }
}

#[async_trait]
impl ProxyProvider for StaticProxyProvider {
    async fn fetch_proxies(&self) -> Result<Vec<Proxy>> {
        Ok(self.proxies.clone())
    }

    fn name(&self) -> String {
        "static".to_string()
    }
}

/// A provider backed by a public proxy-list URL (plain text or JSON).
pub struct HttpListProvider {
    url: String,
    client: Client,
    default_protocol: ProxyProtocol,
}

impl HttpListProvider {
    /// Creates a provider for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SearchError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
            default_protocol: ProxyProtocol::Http,
        })
    }

    /// Protocol assumed for entries that do not name one.
    pub fn with_default_protocol(mut self, protocol: ProxyProtocol) -> Self {
        self.default_protocol = protocol;
        self
    }
}

#[async_trait]
impl ProxyProvider for HttpListProvider {
    async fn fetch_proxies(&self) -> Result<Vec<Proxy>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_proxy_list(&body, self.default_protocol))
    }

    fn name(&self) -> String {
        self.url.clone()
    }
}

fn source_protocol(url: &str) -> ProxyProtocol {
    if url.to_ascii_lowercase().contains("socks5") {
        ProxyProtocol::Socks5
    } else {
        ProxyProtocol::Http
    }
}

/// Parses a proxy list body: JSON (array, or object with a `data` /
/// `proxies` array) or plain `host:port` lines.
pub fn parse_proxy_list(body: &str, default_protocol: ProxyProtocol) -> Vec<Proxy> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return parse_json_list(&value, default_protocol);
        }
    }

    body.lines()
        .filter_map(|line| {
            let caps = PROXY_LINE.captures(line.trim())?;
            let port = caps["port"].parse::<u16>().ok().filter(|p| *p != 0)?;
            let protocol = caps
                .name("scheme")
                .and_then(|s| ProxyProtocol::parse(s.as_str()))
                .unwrap_or(default_protocol);
            Some(Proxy::new(&caps["host"], port).with_protocol(protocol))
        })
        .collect()
}

fn parse_json_list(value: &Value, default_protocol: ProxyProtocol) -> Vec<Proxy> {
    let entries: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("data").or_else(|| map.get("proxies")) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    entries
        .iter()
        .filter_map(|entry| {
            let host = entry
                .get("ip")
                .or_else(|| entry.get("host"))
                .and_then(Value::as_str)?;
            let port = match entry.get("port")? {
                Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
                Value::String(s) => s.trim().parse::<u16>().ok(),
                _ => None,
            }
            .filter(|p| *p != 0)?;

            let protocol = entry
                .get("protocols")
                .and_then(Value::as_array)
                .and_then(|list| list.iter().filter_map(Value::as_str).find_map(ProxyProtocol::parse))
                .or_else(|| {
                    entry
                        .get("protocol")
                        .and_then(Value::as_str)
                        .and_then(ProxyProtocol::parse)
                })
                .unwrap_or(default_protocol);

            let mut proxy = Proxy::new(host, port).with_protocol(protocol);
            if let Some(country) = entry
                .get("country")
                .or_else(|| entry.get("country_code"))
                .and_then(Value::as_str)
            {
                proxy = proxy.with_country(country);
            }
            Some(proxy)
        })
        .collect()
}

/// Checks whether a proxy can reach a known endpoint.
#[async_trait]
pub trait ProxyProbe: Send + Sync {
    /// Returns the round-trip latency on success.
    async fn probe(&self, proxy: &Proxy) -> Result<Duration>;
}

/// Probes by issuing a GET through the proxy.
pub struct HttpProbe {
    target: String,
    timeout: Duration,
}

impl HttpProbe {
    /// Creates a probe against `target` with a per-probe timeout.
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_URL, DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl ProxyProbe for HttpProbe {
    async fn probe(&self, proxy: &Proxy) -> Result<Duration> {
        let upstream = ReqwestProxy::all(proxy.url())
            .map_err(|e| SearchError::Other(format!("Failed to create proxy: {}", e)))?;
        let client = Client::builder()
            .proxy(upstream)
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()?;

        let start = Instant::now();
        client.get(&self.target).send().await?.error_for_status()?;
        Ok(start.elapsed())
    }
}

/// Statistics from the latest load cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyStats {
    pub total_probed: usize,
    pub working: usize,
    /// Percentage of probed candidates that passed.
    pub success_rate: f64,
    pub average_latency_ms: f64,
}

/// Loads, validates and rotates proxies.
pub struct ProxyManager {
    providers: Vec<Arc<dyn ProxyProvider>>,
    probe: Arc<dyn ProxyProbe>,
    max_probed: usize,
    working: RwLock<Vec<Proxy>>,
    stats: RwLock<ProxyStats>,
    current_index: AtomicUsize,
    first_load: OnceCell<()>,
}

impl ProxyManager {
    /// Creates a manager over the given providers with the default probe.
    pub fn new(providers: Vec<Arc<dyn ProxyProvider>>) -> Self {
        Self {
            providers,
            probe: Arc::new(HttpProbe::default()),
            max_probed: DEFAULT_MAX_PROBED,
            working: RwLock::new(Vec::new()),
            stats: RwLock::new(ProxyStats::default()),
            current_index: AtomicUsize::new(0),
            first_load: OnceCell::new(),
        }
    }

    /// Creates a manager with one [`HttpListProvider`] per URL.
    ///
    /// Lists whose URL names SOCKS5 default their bare entries to it.
    pub fn from_sources<S: AsRef<str>>(sources: &[S]) -> Result<Self> {
        let providers = sources
            .iter()
            .map(|url| {
                let url = url.as_ref();
                let provider = HttpListProvider::new(url)?.with_default_protocol(source_protocol(url));
                Ok(Arc::new(provider) as Arc<dyn ProxyProvider>)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(providers))
    }

    /// Replaces the probe.
    pub fn with_probe<P: ProxyProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Sets how many candidates are probed per load.
    pub fn with_max_probed(mut self, max_probed: usize) -> Self {
        self.max_probed = max_probed;
        self
    }

    /// Fetches all sources, probes candidates and replaces the working pool.
    pub async fn load_proxies(&self) -> ProxyStats {
        let fetches = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            async move {
                match provider.fetch_proxies().await {
                    Ok(list) => {
                        debug!("Proxy source {} returned {} entries", provider.name(), list.len());
                        list
                    }
                    Err(e) => {
                        warn!("Proxy source {} failed: {}", provider.name(), e);
                        Vec::new()
                    }
                }
            }
        });
        let fetched = join_all(fetches).await;

        let mut seen = HashSet::new();
        let candidates: Vec<Proxy> = fetched
            .into_iter()
            .flatten()
            .filter(|p| seen.insert(p.key()))
            .take(self.max_probed)
            .collect();

        let total_probed = candidates.len();
        let probe = Arc::clone(&self.probe);
        let mut working: Vec<Proxy> = stream::iter(candidates)
            .map(|mut proxy| {
                let probe = Arc::clone(&probe);
                async move {
                    let outcome = probe.probe(&proxy).await;
                    proxy.last_checked_at = Some(SystemTime::now());
                    match outcome {
                        Ok(latency) => {
                            proxy.is_working = true;
                            proxy.latency_ms = Some(latency.as_millis() as u64);
                            Some(proxy)
                        }
                        Err(_) => None,
                    }
                }
            })
            .buffer_unordered(PROBE_CONCURRENCY)
            .filter_map(|p| async move { p })
            .collect()
            .await;

        working.sort_by_key(|p| p.latency_ms.unwrap_or(u64::MAX));

        let stats = compute_stats(total_probed, &working);
        info!(
            "Proxy pool loaded: {}/{} working ({:.1}%)",
            stats.working, stats.total_probed, stats.success_rate
        );

        *self.working.write().await = working;
        *self.stats.write().await = stats.clone();
        self.current_index.store(0, Ordering::SeqCst);
        // Inside the lazy first load this is already initializing; ignore.
        let _ = self.first_load.set(());

        stats
    }

    /// Returns the next working proxy, loading the pool on first use.
    pub async fn get_working_proxy(&self) -> Option<Proxy> {
        self.first_load
            .get_or_init(|| async {
                self.load_proxies().await;
            })
            .await;

        let working = self.working.read().await;
        if working.is_empty() {
            return None;
        }
        let index = self.current_index.fetch_add(1, Ordering::SeqCst) % working.len();
        working.get(index).cloned()
    }

    /// Returns the statistics of the latest load.
    pub async fn get_stats(&self) -> ProxyStats {
        self.stats.read().await.clone()
    }

    /// Returns whether the working pool is empty.
    pub async fn is_empty(&self) -> bool {
        self.working.read().await.is_empty()
    }

    /// Returns a snapshot of the working pool, fastest first.
    pub async fn working_proxies(&self) -> Vec<Proxy> {
        self.working.read().await.clone()
    }

    /// Creates a reqwest Client routed through the next working proxy.
    ///
    /// Falls back to a direct connection when the pool is empty.
    pub async fn create_client(&self, user_agent: &str, timeout: Duration) -> Result<Client> {
        let mut builder = Client::builder().user_agent(user_agent).timeout(timeout);

        if let Some(proxy) = self.get_working_proxy().await {
            debug!("Using proxy: {}", proxy.key());
            let upstream = ReqwestProxy::all(proxy.url())
                .map_err(|e| SearchError::Other(format!("Failed to create proxy: {}", e)))?;
            builder = builder.proxy(upstream);
        } else {
            debug!("No working proxy, connecting directly");
        }

        builder
            .build()
            .map_err(|e| SearchError::Other(format!("Failed to create HTTP client: {}", e)))
    }
}

fn compute_stats(total_probed: usize, working: &[Proxy]) -> ProxyStats {
    let success_rate = if total_probed == 0 {
        0.0
    } else {
        working.len() as f64 / total_probed as f64 * 100.0
    };
    let latencies: Vec<u64> = working.iter().filter_map(|p| p.latency_ms).collect();
    let average_latency_ms = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
    };
    ProxyStats {
        total_probed,
        working: working.len(),
        success_rate,
        average_latency_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Passes proxies listed in `latencies`, fails every other one.
    struct FakeProbe {
        latencies: HashMap<String, u64>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProbe {
        fn new(passing: &[(&str, u64)]) -> Self {
            Self {
                latencies: passing.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ProxyProbe for FakeProbe {
        async fn probe(&self, proxy: &Proxy) -> Result<Duration> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.latencies
                .get(&proxy.key())
                .map(|ms| Duration::from_millis(*ms))
                .ok_or(SearchError::Timeout)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ProxyProvider for FailingProvider {
        async fn fetch_proxies(&self) -> Result<Vec<Proxy>> {
            Err(SearchError::Other("source down".to_string()))
        }

        fn name(&self) -> String {
            "failing".to_string()
        }
    }

    fn provider(entries: &[(&str, u16)]) -> Arc<dyn ProxyProvider> {
        Arc::new(StaticProxyProvider::new(
            entries.iter().map(|(h, p)| Proxy::new(*h, *p)).collect(),
        ))
    }

    #[test]
    fn test_proxy_url_and_key() {
        let proxy = Proxy::new("10.0.0.1", 1080).with_protocol(ProxyProtocol::Socks5);
        assert_eq!(proxy.url(), "socks5://10.0.0.1:1080");
        assert_eq!(proxy.key(), "10.0.0.1:1080");
        assert!(!proxy.is_working);
    }

    #[test]
    fn test_parse_plain_text_list() {
        let body = "1.2.3.4:8080\n\n  5.6.7.8:3128  \nsocks5://9.9.9.9:1080\ngarbage line\n1.1.1.1:99999\n";
        let proxies = parse_proxy_list(body, ProxyProtocol::Http);
        assert_eq!(proxies.len(), 3);
        assert_eq!(proxies[0].key(), "1.2.3.4:8080");
        assert_eq!(proxies[1].key(), "5.6.7.8:3128");
        assert_eq!(proxies[2].protocol, ProxyProtocol::Socks5);
    }

    #[test]
    fn test_parse_json_object_list() {
        let body = r#"{"data":[
            {"ip":"1.2.3.4","port":"8080","protocols":["socks5"],"country":"US"},
            {"ip":"5.6.7.8","port":3128},
            {"ip":"bad","port":"x"}
        ],"total":3}"#;
        let proxies = parse_proxy_list(body, ProxyProtocol::Http);
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[0].protocol, ProxyProtocol::Socks5);
        assert_eq!(proxies[0].country.as_deref(), Some("US"));
        assert_eq!(proxies[1].protocol, ProxyProtocol::Http);
    }

    #[test]
    fn test_parse_json_array_list() {
        let body = r#"[{"host":"1.2.3.4","port":80,"protocol":"https"}]"#;
        let proxies = parse_proxy_list(body, ProxyProtocol::Http);
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].protocol, ProxyProtocol::Https);
    }

    #[tokio::test]
    async fn test_load_keeps_only_passing_sorted_by_latency() {
        let manager = ProxyManager::new(vec![provider(&[
            ("1.1.1.1", 80),
            ("2.2.2.2", 80),
            ("3.3.3.3", 80),
        ])])
        .with_probe(FakeProbe::new(&[("1.1.1.1:80", 300), ("3.3.3.3:80", 100)]));

        let stats = manager.load_proxies().await;
        assert_eq!(stats.total_probed, 3);
        assert_eq!(stats.working, 2);
        assert!((stats.success_rate - 66.666).abs() < 0.01);
        assert_eq!(stats.average_latency_ms, 200.0);

        let pool = manager.working_proxies().await;
        assert_eq!(pool[0].host, "3.3.3.3");
        assert_eq!(pool[1].host, "1.1.1.1");
        assert!(pool.iter().all(|p| p.is_working && p.last_checked_at.is_some()));
    }

    #[tokio::test]
    async fn test_failed_probe_is_never_returned() {
        let manager = ProxyManager::new(vec![provider(&[("1.1.1.1", 80), ("2.2.2.2", 80)])])
            .with_probe(FakeProbe::new(&[("2.2.2.2:80", 50)]));
        manager.load_proxies().await;

        for _ in 0..10 {
            let proxy = manager.get_working_proxy().await.unwrap();
            assert_eq!(proxy.host, "2.2.2.2");
        }
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_others() {
        let manager = ProxyManager::new(vec![
            Arc::new(FailingProvider),
            provider(&[("1.1.1.1", 80)]),
        ])
        .with_probe(FakeProbe::new(&[("1.1.1.1:80", 10)]));

        let stats = manager.load_proxies().await;
        assert_eq!(stats.working, 1);
    }

    #[tokio::test]
    async fn test_duplicates_are_merged_and_probe_bounded() {
        let probe = FakeProbe::new(&[("1.1.1.1:80", 10)]);
        let calls = Arc::clone(&probe.calls);
        let manager = ProxyManager::new(vec![
            provider(&[("1.1.1.1", 80), ("2.2.2.2", 80), ("3.3.3.3", 80)]),
            provider(&[("1.1.1.1", 80), ("4.4.4.4", 80)]),
        ])
        .with_probe(probe)
        .with_max_probed(3);

        let stats = manager.load_proxies().await;
        assert_eq!(stats.total_probed, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_get_working_proxy_loads_lazily_once() {
        let probe = FakeProbe::new(&[("1.1.1.1:80", 10), ("2.2.2.2:80", 20)]);
        let calls = Arc::clone(&probe.calls);
        let manager = ProxyManager::new(vec![provider(&[("1.1.1.1", 80), ("2.2.2.2", 80)])])
            .with_probe(probe);

        assert!(manager.is_empty().await);
        let first = manager.get_working_proxy().await.unwrap();
        let second = manager.get_working_proxy().await.unwrap();
        let third = manager.get_working_proxy().await.unwrap();

        assert_eq!(first.host, "1.1.1.1");
        assert_eq!(second.host, "2.2.2.2");
        assert_eq!(third.host, "1.1.1.1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explicit_load_prevents_second_lazy_load() {
        let probe = FakeProbe::new(&[("1.1.1.1:80", 10)]);
        let calls = Arc::clone(&probe.calls);
        let manager = ProxyManager::new(vec![provider(&[("1.1.1.1", 80)])]).with_probe(probe);

        manager.load_proxies().await;
        manager.get_working_proxy().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_sources_give_empty_pool() {
        let manager = ProxyManager::new(vec![Arc::new(FailingProvider)])
            .with_probe(FakeProbe::new(&[]));
        assert!(manager.get_working_proxy().await.is_none());

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_probed, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_latency_ms, 0.0);
    }

    #[tokio::test]
    async fn test_create_client_without_proxies() {
        let manager = ProxyManager::new(vec![]).with_probe(FakeProbe::new(&[]));
        let client = manager
            .create_client("test-agent", Duration::from_secs(5))
            .await
            .unwrap();
        drop(client);
    }

    #[tokio::test]
    async fn test_create_client_with_proxy() {
        let manager = ProxyManager::new(vec![provider(&[("127.0.0.1", 8080)])])
            .with_probe(FakeProbe::new(&[("127.0.0.1:8080", 5)]));
        let client = manager
            .create_client("test-agent", Duration::from_secs(5))
            .await
            .unwrap();
        drop(client);
    }

    #[test]
    fn test_source_protocol_from_list_url() {
        assert_eq!(
            source_protocol("https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt"),
            ProxyProtocol::Socks5
        );
        assert_eq!(
            source_protocol("https://api.proxyscrape.com/v2/?request=getproxies&protocol=SOCKS5"),
            ProxyProtocol::Socks5
        );
        assert_eq!(source_protocol(DEFAULT_PROXY_SOURCES[1]), ProxyProtocol::Http);
    }

    #[tokio::test]
    async fn test_socks_list_entries_default_to_socks5() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("10.0.0.1:1080\nhttp://10.0.0.2:8080\n"))
            .mount(&server)
            .await;

        let provider = HttpListProvider::new(format!("{}/socks5.txt", server.uri()))
            .unwrap()
            .with_default_protocol(ProxyProtocol::Socks5);
        let proxies = provider.fetch_proxies().await.unwrap();
        assert_eq!(proxies[0].url(), "socks5://10.0.0.1:1080");
        assert_eq!(proxies[1].url(), "http://10.0.0.2:8080");
    }

    #[test]
    fn test_from_sources_builds_one_provider_per_url() {
        let manager = ProxyManager::from_sources(DEFAULT_PROXY_SOURCES).unwrap();
        assert_eq!(manager.providers.len(), DEFAULT_PROXY_SOURCES.len());
    }
}
