//! Headless browser rendering for the browser backend.
//!
//! This module is only available when the `headless` Cargo feature is enabled.
//! It provides a shared browser process and a `PageFetcher` implementation
//! that renders pages using Chrome/Chromium via the Chrome DevTools Protocol,
//! with best-effort anti-detection shims applied before every navigation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::future::BoxFuture;
use futures::StreamExt;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::fetcher::{PageFetcher, WaitStrategy};
use crate::fetcher_http::DEFAULT_USER_AGENT;
use crate::proxy::ProxyManager;
use crate::{Result, SearchError};

/// Patches the properties headless Chrome leaks to detection scripts.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
Object.defineProperty(navigator, 'plugins', {
  get: () => [
    { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer' },
    { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai' },
    { name: 'Native Client', filename: 'internal-nacl-plugin' },
  ],
});
window.chrome = window.chrome || { runtime: {} };
"#;

/// Configuration for the browser pool.
#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    /// Maximum number of concurrent browser tabs.
    pub max_tabs: usize,
    /// Whether to run the browser in headless mode.
    pub headless: bool,
    /// Path to the Chrome/Chromium executable. If `None`, auto-detected.
    pub chrome_path: Option<String>,
    /// Fixed proxy URL. When unset, a working proxy is taken from the pool
    /// (if any) at launch time.
    pub proxy_url: Option<String>,
    /// Window size in pixels.
    pub window_size: (u32, u32),
    /// Additional launch arguments for Chrome.
    pub launch_args: Vec<String>,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            max_tabs: 4,
            headless: true,
            chrome_path: None,
            proxy_url: None,
            window_size: (1366, 768),
            launch_args: Vec::new(),
        }
    }
}

/// A handle launched on first use and launched again once invalidated.
struct LaunchSlot<T> {
    current: Mutex<Option<Arc<T>>>,
}

impl<T> LaunchSlot<T> {
    fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Failed launches are not cached; the next call tries again.
    async fn get_or_launch<F, Fut>(&self, launch: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut guard = self.current.lock().await;
        if let Some(ref current) = *guard {
            return Ok(Arc::clone(current));
        }
        let launched = Arc::new(launch().await?);
        *guard = Some(Arc::clone(&launched));
        Ok(launched)
    }

    /// Drops `stale` if it is still the current handle. A handle that was
    /// already replaced by a concurrent relaunch is left alone.
    async fn invalidate(&self, stale: &Arc<T>) -> bool {
        let mut guard = self.current.lock().await;
        let is_current = guard.as_ref().is_some_and(|current| Arc::ptr_eq(current, stale));
        if is_current {
            *guard = None;
        }
        is_current
    }

    async fn take(&self) -> Option<Arc<T>> {
        self.current.lock().await.take()
    }
}

/// A shared pool managing a single browser process with tab concurrency control.
///
/// The browser is lazily launched on the first `acquire_browser()` call. A
/// semaphore limits the number of concurrent tabs to prevent memory exhaustion.
/// A browser that fails a fetch is discarded, and the next fetch launches a
/// fresh one with the next pool proxy (or none once the pool is empty).
pub struct BrowserPool {
    config: BrowserPoolConfig,
    proxies: Option<Arc<ProxyManager>>,
    browser: LaunchSlot<Browser>,
    tab_semaphore: Arc<Semaphore>,
}

impl BrowserPool {
    /// Creates a new browser pool with the given configuration.
    pub fn new(config: BrowserPoolConfig) -> Self {
        let max_tabs = config.max_tabs.max(1);
        Self {
            config,
            proxies: None,
            browser: LaunchSlot::new(),
            tab_semaphore: Arc::new(Semaphore::new(max_tabs)),
        }
    }

    /// Draws the launch proxy from the given pool.
    pub fn with_proxies(mut self, proxies: Arc<ProxyManager>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Returns the tab semaphore for acquiring permits before opening tabs.
    pub fn tab_semaphore(&self) -> &Arc<Semaphore> {
        &self.tab_semaphore
    }

    async fn launch_proxy(&self) -> Option<String> {
        if let Some(ref url) = self.config.proxy_url {
            return Some(url.clone());
        }
        match self.proxies {
            Some(ref proxies) => proxies.get_working_proxy().await.map(|p| p.url()),
            None => None,
        }
    }

    /// Lazily launches the browser and returns a shared handle.
    pub async fn acquire_browser(&self) -> Result<Arc<Browser>> {
        self.browser.get_or_launch(|| self.launch()).await
    }

    /// Discards `browser` so the next fetch launches a new one.
    pub async fn invalidate(&self, browser: &Arc<Browser>) {
        if self.browser.invalidate(browser).await {
            warn!("Discarding browser after a failed fetch; relaunching on next use");
        }
    }

    async fn launch(&self) -> Result<Browser> {
        debug!("Launching headless browser");

        let mut builder = BrowserConfig::builder();

        if self.config.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        if let Some(ref path) = self.config.chrome_path {
            builder = builder.chrome_executable(path);
        } else {
            let chrome_path = crate::browser_setup::ensure_chrome()?;
            debug!("Using Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);
        }

        // --headless=new puts "HeadlessChrome" in the UA, which engines block.
        builder = builder.arg(format!("--user-agent={}", DEFAULT_USER_AGENT));
        builder = builder.arg("--disable-blink-features=AutomationControlled");

        let (width, height) = self.config.window_size;
        builder = builder
            .window_size(width, height)
            .arg(format!("--window-size={},{}", width, height))
            .arg("--lang=en-US");

        builder = builder
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--mute-audio")
            .arg("--no-first-run");

        match self.launch_proxy().await {
            Some(proxy) => {
                debug!("Browser will use proxy {}", proxy);
                builder = builder.arg(format!("--proxy-server={}", proxy));
            }
            None => debug!("Browser will connect directly"),
        }

        for arg in &self.config.launch_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| SearchError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to launch browser: {}", e)))?;

        // Spawn the CDP event handler as a background task
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser CDP handler error: {}", e);
                }
            }
            debug!("Browser CDP handler exited");
        });

        Ok(browser)
    }

    /// Drops the shared browser handle; the process exits with its last tab.
    pub async fn shutdown(&self) {
        if self.browser.take().await.is_some() {
            debug!("Browser pool shut down");
        }
    }
}

/// Closes a tab once the fetch is done with it.
///
/// A fetch cancelled mid-render (e.g. by an outer timeout) drops the guard
/// with the tab still open; the close then runs on a spawned task.
struct TabGuard<T: Send + 'static> {
    tab: Option<T>,
    close: fn(T) -> BoxFuture<'static, ()>,
}

impl<T: Send + 'static> TabGuard<T> {
    fn new(tab: T, close: fn(T) -> BoxFuture<'static, ()>) -> Self {
        Self {
            tab: Some(tab),
            close,
        }
    }

    async fn close(mut self) {
        if let Some(tab) = self.tab.take() {
            (self.close)(tab).await;
        }
    }
}

impl<T: Send + 'static> Drop for TabGuard<T> {
    fn drop(&mut self) {
        if let Some(tab) = self.tab.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn((self.close)(tab));
                }
                Err(_) => warn!("No runtime to close an abandoned browser tab"),
            }
        }
    }
}

fn close_page(page: Page) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if let Err(e) = page.close().await {
            warn!("Failed to close browser tab: {}", e);
        }
    })
}

/// A `PageFetcher` that renders pages in a headless browser.
///
/// Each `fetch()` call opens a blank tab, installs the user agent and the
/// stealth script, navigates, runs the optional `WaitStrategy`, extracts the
/// rendered HTML and closes the tab.
pub struct BrowserFetcher {
    pool: Arc<BrowserPool>,
    wait: Option<WaitStrategy>,
    user_agent: String,
    navigation_timeout: Duration,
}

impl BrowserFetcher {
    /// Creates a browser fetcher that reads the page right after the load
    /// event.
    pub fn new(pool: Arc<BrowserPool>) -> Self {
        Self {
            pool,
            wait: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout: Duration::from_secs(30),
        }
    }

    /// Waits for a selector after the load event.
    pub fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Sets a custom user agent for browser requests.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the navigation timeout.
    pub fn with_navigation_timeout(mut self, navigation_timeout: Duration) -> Self {
        self.navigation_timeout = navigation_timeout;
        self
    }

    async fn prepare(&self, page: &Page) -> Result<()> {
        page.set_user_agent(
            SetUserAgentOverrideParams::builder()
                .user_agent(self.user_agent.clone())
                .accept_language("en-US,en;q=0.9")
                .build()
                .map_err(SearchError::Browser)?,
        )
        .await
        .map_err(|e| SearchError::Browser(format!("Failed to set user agent: {}", e)))?;

        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to install stealth script: {}", e)))?;
        Ok(())
    }

    async fn navigate(&self, page: &Page, url: &str) -> Result<()> {
        match timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(SearchError::Browser(format!("Navigation failed: {}", e))),
            Err(_) => Err(SearchError::Timeout),
        }
    }

    async fn wait_until_ready(&self, page: &Page) {
        let Some(ref wait) = self.wait else {
            return;
        };
        // A missing container may mean a CAPTCHA or a slow render;
        // give it a grace period and let the parser decide.
        let found = timeout(Duration::from_millis(wait.timeout_ms), async {
            loop {
                if page.find_element(wait.css.as_str()).await.is_ok() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        })
        .await;
        if found.is_err() {
            debug!(
                "Selector '{}' not found within {}ms, waiting {}ms grace period",
                wait.css, wait.timeout_ms, wait.grace_ms
            );
            tokio::time::sleep(Duration::from_millis(wait.grace_ms)).await;
        }
    }

    async fn render(&self, page: &Page, url: &str) -> Result<String> {
        self.prepare(page).await?;
        self.navigate(page, url).await?;
        self.wait_until_ready(page).await;
        page.content()
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to get page content: {}", e)))
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        // Acquire a tab permit to limit concurrency
        let _permit = self
            .pool
            .tab_semaphore()
            .acquire()
            .await
            .map_err(|e| SearchError::Browser(format!("Tab semaphore closed: {}", e)))?;

        let browser = self.pool.acquire_browser().await?;

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                self.pool.invalidate(&browser).await;
                return Err(SearchError::Browser(format!("Failed to open tab: {}", e)));
            }
        };

        let tab = TabGuard::new(page.clone(), close_page);
        let html = self.render(&page, url).await;
        tab.close().await;

        // A dead launch proxy or CDP connection fails every later fetch too.
        if let Err(ref e) = html {
            debug!("Browser fetch of {} failed: {}", url, e);
            if e.is_transport() {
                self.pool.invalidate(&browser).await;
            }
        }

        html
    }
}
