pub mod detail;
pub mod scroll;
pub mod stealth;

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use scroll::ScrollPolicy;

const WINDOW_WIDTH: u32 = 1920;
const WINDOW_HEIGHT: u32 = 1080;
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const PAGE_GRACE: Duration = Duration::from_secs(3);
const EXPAND_PAUSE: Duration = Duration::from_millis(500);
const EXPAND_SELECTOR: &str = r#"a[data-marker="expand-text"]"#;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("failed to open {url}: {reason}")]
    Navigation { url: String, reason: String },
    #[error("failed to capture page markup: {0}")]
    Snapshot(String),
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub headless: bool,
    /// Use this binary instead of auto-detecting an installed Chromium.
    pub chrome_executable: Option<PathBuf>,
    /// Fixed user agent; a random pool entry when unset.
    pub user_agent: Option<String>,
    pub navigation_timeout: Duration,
    pub grace: Duration,
    pub expand_descriptions: bool,
    pub scroll: ScrollPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            user_agent: None,
            navigation_timeout: NAVIGATION_TIMEOUT,
            grace: PAGE_GRACE,
            expand_descriptions: true,
            scroll: ScrollPolicy::default(),
        }
    }
}

/// One Chromium process with a single prepared tab. Call [`close`] on every
/// path; dropping only stops the CDP handler.
///
/// [`close`]: BrowserSession::close
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(config: &RenderConfig) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
            .viewport(Viewport {
                width: WINDOW_WIDTH,
                height: WINDOW_HEIGHT,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .request_timeout(config.navigation_timeout)
            .arg(format!("--lang={}", stealth::LOCALE))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(DriverError::Launch)?;

        let (mut browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;
        let handler_task = spawn_handler(handler);

        match open_page(&browser, config).await {
            Ok(page) => {
                info!("Browser launched (headless: {})", config.headless);
                Ok(Self { browser, page, handler_task })
            }
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                Err(e)
            }
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Rendered markup, via `outerHTML` first and the CDP content call second.
    pub async fn html(&self) -> Result<String, DriverError> {
        if let Ok(value) = self.page.evaluate("document.documentElement.outerHTML").await {
            if let Ok(html) = value.into_value::<String>() {
                if !html.is_empty() {
                    return Ok(html);
                }
            }
        }
        self.page
            .content()
            .await
            .map_err(|e| DriverError::Snapshot(e.to_string()))
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        debug!("Browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

async fn open_page(browser: &Browser, config: &RenderConfig) -> Result<Page, DriverError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| DriverError::Launch(e.to_string()))?;

    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| stealth::random_user_agent().to_string());
    stealth::apply(&page, &user_agent)
        .await
        .map_err(|e| DriverError::Launch(e.to_string()))?;

    Ok(page)
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("CDP handler event error: {}", e);
            }
        }
    })
}

/// Click every element matching `selector`, pausing after each. Failures are
/// per element and never fatal.
pub(crate) async fn click_all(page: &Page, selector: &str, pause: Duration) -> usize {
    let elements = match page.find_elements(selector).await {
        Ok(els) => els,
        Err(e) => {
            debug!("No clickable {}: {}", selector, e);
            return 0;
        }
    };

    let mut clicked = 0;
    for el in elements {
        match el.click().await {
            Ok(_) => clicked += 1,
            Err(e) => debug!("Click on {} failed: {}", selector, e),
        }
        sleep(pause).await;
    }
    clicked
}

/// A source of fully rendered seller listing pages.
pub(crate) trait ListingSource {
    async fn render(&self, url: &str) -> Result<String, DriverError>;
}

/// Renders each listing in its own fresh browser session.
pub struct ChromeDriver {
    config: RenderConfig,
}

impl ChromeDriver {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

impl ListingSource for ChromeDriver {
    async fn render(&self, url: &str) -> Result<String, DriverError> {
        render_listing(url, &self.config).await
    }
}

/// Launch, load `url`, scroll until the listing settles, return the markup.
/// The browser is closed on every exit path.
pub async fn render_listing(url: &str, config: &RenderConfig) -> Result<String, DriverError> {
    let session = BrowserSession::launch(config).await?;
    let result = drive_listing(&session, url, config).await;
    session.close().await;
    result
}

async fn drive_listing(
    session: &BrowserSession,
    url: &str,
    config: &RenderConfig,
) -> Result<String, DriverError> {
    info!("Opening {}", url);
    session.goto(url).await?;
    sleep(config.grace).await;

    let outcome = scroll::stabilize(session.page(), &config.scroll).await;
    info!(
        "Scrolling stopped ({:?}) after {} cycles with {} items",
        outcome.reason, outcome.cycles, outcome.signals.items
    );

    if config.expand_descriptions {
        let clicked = click_all(session.page(), EXPAND_SELECTOR, EXPAND_PAUSE).await;
        if clicked > 0 {
            debug!("Expanded {} descriptions", clicked);
        }
    }

    session.html().await
}
