use crate::config::BrowserSettings;
use crate::error::{AppError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use super::page::{BrowserPage, PageSource};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::StreamExt;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const LAUNCH_ATTEMPTS: u64 = 3;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the Chrome process for the whole program run. Pages come and go per attempt;
/// the browser itself is released once, by [`PageSource::close`].
pub struct ChromeSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
}

impl ChromeSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        tracing::info!("Launching Chrome (headless={})", settings.headless);

        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .request_timeout(Duration::from_secs(settings.navigation_timeout_secs))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-timer-throttling")
            .arg("--disable-renderer-backgrounding")
            .arg("--disable-dev-shm-usage");

        if cfg!(target_os = "linux") {
            builder = builder
                .no_sandbox()
                .arg("--disable-setuid-sandbox")
                .arg("--disable-gpu");
        }

        if !settings.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to build browser config: {}", e)))?;

        let mut last_error = None;
        for attempt in 1..=LAUNCH_ATTEMPTS {
            match Browser::launch(config.clone()).await {
                Ok((browser, mut handler)) => {
                    let handle = tokio::spawn(async move {
                        while let Some(event) = handler.next().await {
                            if let Err(e) = event {
                                let error_str = format!("{:?}", e);
                                // CDP events the client has no type for; harmless
                                if !error_str.contains("data did not match any variant") {
                                    tracing::debug!("Browser handler error: {}", e);
                                }
                            }
                        }
                    });

                    tracing::info!("Chrome launched");
                    return Ok(Self {
                        browser: Some(browser),
                        handler: Some(handle),
                    });
                }
                Err(e) => {
                    tracing::warn!("Launch attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                    if attempt < LAUNCH_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(1000 * attempt)).await;
                    }
                }
            }
        }

        Err(AppError::Browser(format!(
            "Failed to launch browser after {} attempts: {}",
            LAUNCH_ATTEMPTS,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    fn browser(&self) -> Result<&Browser> {
        self.browser
            .as_ref()
            .ok_or_else(|| AppError::Browser("Browser already closed".into()))
    }
}

impl PageSource for ChromeSession {
    type Page = CdpPage;

    async fn new_page(&self, url: &str) -> Result<CdpPage> {
        let page = self.browser()?.new_page(url).await?;
        Ok(CdpPage::new(page))
    }

    /// Idempotent; a second call is a no-op.
    async fn close(&mut self) -> Result<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        tracing::info!("Closing browser");
        browser.close().await?;
        if let Err(e) = browser.wait().await {
            tracing::warn!("Browser process did not exit cleanly: {}", e);
        }

        if let Some(handle) = self.handler.take() {
            handle.abort();
        }
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        let handler = self.handler.take();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let _ = browser.close().await;
                if let Some(handle) = handler {
                    handle.abort();
                }
            });
        }
    }
}

/// Requests seen on the wire that have neither finished nor failed yet.
#[derive(Debug)]
pub(crate) struct RequestTracker {
    pending: HashSet<String>,
    quiet_since: Option<Instant>,
}

impl RequestTracker {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            pending: HashSet::new(),
            quiet_since: Some(now),
        }
    }

    pub(crate) fn started(&mut self, request_id: &str) {
        self.pending.insert(request_id.to_string());
        self.quiet_since = None;
    }

    /// Finished or failed. Ids that started before tracking began are ignored.
    pub(crate) fn settled(&mut self, request_id: &str, now: Instant) {
        if self.pending.remove(request_id) && self.pending.is_empty() {
            self.quiet_since = Some(now);
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn idle_for(&self, window: Duration, now: Instant) -> bool {
        self.quiet_since
            .is_some_and(|since| now.saturating_duration_since(since) >= window)
    }
}

/// A single browser tab with the readiness waits the scraper relies on.
#[derive(Clone)]
pub struct CdpPage {
    page: Page,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }
}

impl BrowserPage for CdpPage {
    async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation()).await??;
        Ok(())
    }

    /// Polls for the selector. A failed probe (the document is mid-navigation and its
    /// execution context is gone) counts as "not there yet".
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );

        let start = Instant::now();
        loop {
            let probe = match self.page.evaluate(script.as_str()).await {
                Ok(result) => result.into_value::<bool>().map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match probe {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => tracing::debug!("selector probe for {} failed: {}", selector, e),
            }

            if start.elapsed() > timeout {
                return Err(AppError::Timeout(format!(
                    "waiting for selector: {}",
                    selector
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Waits until no request has been in flight for `idle`. Requests are tracked
    /// through the Network domain events, so navigations during the wait are fine.
    async fn wait_for_network_idle(&self, idle: Duration, timeout: Duration) -> Result<()> {
        let mut sent = self.page.event_listener::<EventRequestWillBeSent>().await?;
        let mut finished = self.page.event_listener::<EventLoadingFinished>().await?;
        let mut failed = self.page.event_listener::<EventLoadingFailed>().await?;

        let start = Instant::now();
        let mut tracker = RequestTracker::new(start);

        loop {
            let now = Instant::now();
            if tracker.idle_for(idle, now) {
                return Ok(());
            }
            if now.duration_since(start) > timeout {
                return Err(AppError::Timeout(format!(
                    "waiting for network idle ({} requests in flight)",
                    tracker.in_flight()
                )));
            }

            tokio::select! {
                Some(event) = sent.next() => tracker.started(event.request_id.inner()),
                Some(event) = finished.next() => {
                    tracker.settled(event.request_id.inner(), Instant::now())
                }
                Some(event) = failed.next() => {
                    tracker.settled(event.request_id.inner(), Instant::now())
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page.find_element(selector).await?.click().await?;
        Ok(())
    }

    /// Focuses the field, waits `delay` for its handlers to attach, then types.
    async fn type_into(&self, selector: &str, text: &str, delay: Duration) -> Result<()> {
        let element = self.page.find_element(selector).await?;
        element.click().await?;
        tokio::time::sleep(delay).await;
        element.type_str(text).await?;
        Ok(())
    }

    async fn save_full_screenshot(&self, path: &Path) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page.save_screenshot(params, path).await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}
