use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use trialwatch_core::error::AppError;
use trialwatch_core::models::RowCells;
use trialwatch_core::traits::PageSource;

use crate::table::{DEFAULT_TABLE_SELECTOR, TableParser};

/// MFDS clinical trial approval listing.
pub const DEFAULT_LISTING_URL: &str = "https://emedi.mfds.go.kr/cliTrial/MNU20307#list";

/// Script function the listing uses to switch pages.
pub const DEFAULT_PAGINATION_FN: &str = "fn_egov_link_page";

/// Chromium flags for an unattended, GPU-less headless session.
const HEADLESS_ARGS: [&str; 7] = [
    "--headless=new",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-popup-blocking",
    "--disable-translate",
    "--no-first-run",
];

/// Largest accepted multiplier for the settle delays.
pub const MAX_SETTLE_FACTOR: f64 = 10.0;

/// Where and how to read the registry listing.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub listing_url: String,
    pub table_selector: String,
    /// Page-script function called as `name(N)` to display page N.
    pub pagination_fn: String,
    /// Wait after the listing is first opened.
    pub initial_settle: Duration,
    /// Wait after switching to another page.
    pub page_settle: Duration,
    /// Pause after reading a page, before the next one is requested.
    pub between_pages: Duration,
    /// Upper bound for reading one page, settle delay included.
    pub nav_timeout: Duration,
    /// Explicit Chrome/Chromium binary; otherwise well-known paths are tried.
    pub chrome_bin: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            table_selector: DEFAULT_TABLE_SELECTOR.to_string(),
            pagination_fn: DEFAULT_PAGINATION_FN.to_string(),
            initial_settle: Duration::from_secs(5),
            page_settle: Duration::from_secs(3),
            between_pages: Duration::from_secs(1),
            nav_timeout: Duration::from_secs(30),
            chrome_bin: None,
        }
    }
}

impl RegistryConfig {
    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = url.into();
        self
    }

    pub fn with_table_selector(mut self, selector: impl Into<String>) -> Self {
        self.table_selector = selector.into();
        self
    }

    pub fn with_chrome_bin(mut self, path: Option<PathBuf>) -> Self {
        self.chrome_bin = path;
        self
    }

    /// Scale every settle delay, e.g. for a slow registry day.
    ///
    /// The factor must lie in `0.0..=MAX_SETTLE_FACTOR`.
    pub fn with_settle_factor(mut self, factor: f64) -> Result<Self, AppError> {
        if !(0.0..=MAX_SETTLE_FACTOR).contains(&factor) {
            return Err(AppError::ConfigError(format!(
                "Settle factor must be between 0 and {MAX_SETTLE_FACTOR}, got {factor}"
            )));
        }
        self.initial_settle = self.initial_settle.mul_f64(factor);
        self.page_settle = self.page_settle.mul_f64(factor);
        self.between_pages = self.between_pages.mul_f64(factor);
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !self.listing_url.starts_with("http://") && !self.listing_url.starts_with("https://") {
            return Err(AppError::ConfigError(format!(
                "Listing URL must be http(s): {}",
                self.listing_url
            )));
        }
        let valid_fn = !self.pagination_fn.is_empty()
            && self
                .pagination_fn
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$');
        if !valid_fn {
            return Err(AppError::ConfigError(format!(
                "Pagination function must be a plain identifier: {}",
                self.pagination_fn
            )));
        }
        Ok(())
    }

    /// Script that displays `page`.
    fn pagination_script(&self, page: u32) -> String {
        format!("{}({page})", self.pagination_fn)
    }
}

/// Headless-browser view of the registry listing.
///
/// The listing is rendered by page scripts, so it is read through Chromium
/// via the Chrome DevTools Protocol. One tab is opened at launch and reused
/// for every page of the run: page 1 is the listing as loaded, other pages
/// are shown by calling the listing's own pagination function.
pub struct RegistryBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    tab: Page,
    parser: TableParser,
    config: RegistryConfig,
    current_page: AtomicU32,
}

impl RegistryBrowser {
    /// Launch headless Chromium and open the listing.
    ///
    /// Requires a Chromium / Chrome binary, either configured, at a
    /// well-known path, or found by `chromiumoxide` itself.
    pub async fn launch(config: RegistryConfig) -> Result<Self, AppError> {
        config.validate()?;
        let parser = TableParser::new(&config.table_selector)?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .args(HEADLESS_ARGS);
        // A snap install only exposes a wrapper script at /snap/bin/chromium
        // that drops the headless flags; point at the real binary instead.
        if let Some(bin) = find_chrome_binary(config.chrome_bin.as_ref()) {
            tracing::info!(binary = %bin.display(), "Launching registry browser");
            builder = builder.chrome_executable(bin);
        }
        let browser_config = builder
            .build()
            .map_err(|e| AppError::Generic(format!("Browser config error: {e}")))?;

        let (mut browser, mut events) = Browser::launch(browser_config)
            .await
            .map_err(|e| AppError::Generic(format!("Failed to launch browser: {e}")))?;

        // Nothing reaches the tab unless the CDP event stream is drained.
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Registry browser connection lost");
                    break;
                }
            }
        });

        let tab = match open_listing(&browser, &config).await {
            Ok(tab) => tab,
            Err(e) => {
                close_browser(&mut browser, &handler).await;
                return Err(e);
            }
        };
        tokio::time::sleep(config.initial_settle).await;

        Ok(Self {
            browser,
            handler,
            tab,
            parser,
            config,
            current_page: AtomicU32::new(1),
        })
    }

    /// Close the browser and stop the CDP handler.
    pub async fn shutdown(mut self) {
        close_browser(&mut self.browser, &self.handler).await;
    }

    async fn render(&self, page: u32) -> Result<String, AppError> {
        if self.current_page.load(Ordering::SeqCst) != page {
            self.tab
                .evaluate(self.config.pagination_script(page))
                .await
                .map_err(|e| AppError::RenderError {
                    page,
                    message: format!("Pagination failed: {e}"),
                })?;
            self.current_page.store(page, Ordering::SeqCst);
            tokio::time::sleep(self.config.page_settle).await;
        }

        self.tab.content().await.map_err(|e| AppError::RenderError {
            page,
            message: format!("Failed to read page content: {e}"),
        })
    }
}

impl PageSource for RegistryBrowser {
    async fn page_rows(&self, page: u32) -> Result<Vec<RowCells>, AppError> {
        let timeout = self.config.nav_timeout;
        let html = match tokio::time::timeout(timeout, self.render(page)).await {
            Ok(inner) => inner?,
            Err(_) => return Err(AppError::Timeout(timeout.as_secs())),
        };
        tracing::debug!(%page, bytes = html.len(), "Rendered page");

        let rows = self
            .parser
            .parse(&html)
            .map_err(|message| AppError::ExtractionError { page, message })?;

        tokio::time::sleep(self.config.between_pages).await;
        Ok(rows)
    }
}

/// Opens page 1 of the listing in a fresh tab, bounded by the navigation timeout.
async fn open_listing(browser: &Browser, config: &RegistryConfig) -> Result<Page, AppError> {
    tracing::info!(url = %config.listing_url, "Opening registry listing");
    tokio::time::timeout(config.nav_timeout, browser.new_page(config.listing_url.as_str()))
        .await
        .map_err(|_| AppError::Timeout(config.nav_timeout.as_secs()))?
        .map_err(|e| AppError::RenderError {
            page: 1,
            message: format!("Failed to open {}: {e}", config.listing_url),
        })
}

async fn close_browser(browser: &mut Browser, handler: &JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "Browser did not close cleanly");
    }
    let _ = browser.wait().await;
    handler.abort();
}

/// Chrome/Chromium binary for the registry browser.
///
/// `CHROME_BIN` (passed in as `explicit`) is used when the file exists.
/// Otherwise the first installed candidate wins, starting with the binary
/// inside a snap install. `None` leaves the lookup to `chromiumoxide`.
fn find_chrome_binary(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
    ];

    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.clone());
        }
        tracing::warn!(path = %path.display(), "Configured Chrome binary not found");
    }

    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}
