use super::extractor::{extract_hrefs, extract_texts};
use super::page::{BrowserPage, PageSource};
use crate::aggregation::parse_percent;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::screenshot_path;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    AwaitingExternalAuth,
    Authenticated,
    OnDataPage,
    OnDetailPage(usize),
    Done,
}

impl SessionState {
    pub fn advance(self, next: SessionState) -> Result<SessionState> {
        use SessionState::*;

        let allowed = match (self, next) {
            (Unauthenticated, AwaitingExternalAuth) | (Unauthenticated, Authenticated) => true,
            (AwaitingExternalAuth, Authenticated) => true,
            (Authenticated, OnDataPage) => true,
            (OnDataPage, OnDetailPage(0)) | (OnDataPage, Done) => true,
            (OnDetailPage(i), OnDetailPage(j)) => j == i + 1,
            (OnDetailPage(_), Done) => true,
            _ => false,
        };

        if allowed {
            Ok(next)
        } else {
            Err(AppError::Browser(format!(
                "invalid session transition {:?} -> {:?}",
                self, next
            )))
        }
    }
}

/// What one archetype detail visit produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailCapture {
    pub name: String,
    pub winrate: f64,
    pub screenshot: String,
}

/// Pairs archetype names with their detail links, in table order. Names and links come
/// from two different selectors, so their counts must agree.
pub fn pair_detail_links<'n>(
    archetypes: &'n [String],
    links: Vec<String>,
) -> Result<Vec<(&'n str, String)>> {
    if links.len() != archetypes.len() {
        return Err(AppError::DataQuality(format!(
            "{} archetype names but {} detail links",
            archetypes.len(),
            links.len()
        )));
    }
    Ok(archetypes.iter().map(String::as_str).zip(links).collect())
}

/// Drives one attempt through login, the statistics view and the detail pages.
pub struct SessionNavigator<'a, B: PageSource> {
    session: &'a B,
    config: &'a Config,
    page: B::Page,
    state: SessionState,
}

impl<'a, B: PageSource> SessionNavigator<'a, B> {
    pub async fn open(session: &'a B, config: &'a Config) -> Result<Self> {
        let page = session.new_page("about:blank").await?;
        Ok(Self {
            session,
            config,
            page,
            state: SessionState::Unauthenticated,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The main tab; after [`open_data_page`](Self::open_data_page) it shows the
    /// statistics table.
    pub fn page(&self) -> &B::Page {
        &self.page
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        self.state = self.state.advance(next)?;
        tracing::debug!("session state: {:?}", self.state);
        Ok(())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.browser.navigation_timeout_secs)
    }

    fn idle_window(&self) -> Duration {
        Duration::from_millis(self.config.browser.network_idle_ms)
    }

    pub async fn login(&mut self) -> Result<()> {
        let config = self.config;
        let login_url = &config.site.login_url;
        self.page.goto(login_url).await?;
        self.page.wait_for_network_idle(self.idle_window(), self.timeout()).await?;

        if self.page.url().await? != *login_url {
            tracing::info!("Session already authenticated");
            return self.transition(SessionState::Authenticated);
        }

        self.transition(SessionState::AwaitingExternalAuth)?;
        tracing::info!("Not logged in, continuing to the identity provider");

        let selectors = &config.selectors;
        let creds = &config.credentials;
        let field_delay = Duration::from_millis(config.browser.field_delay_ms);

        self.page.click(&selectors.login_redirect).await?;
        self.page.wait_for_navigation(self.timeout()).await?;
        self.page.wait_for_selector(&selectors.email_field, self.timeout()).await?;

        self.page.type_into(&selectors.email_field, &creds.email, field_delay).await?;
        self.page.type_into(&selectors.password_field, &creds.password, field_delay).await?;

        self.page.wait_for_selector(&selectors.blizzard_login, self.timeout()).await?;
        tokio::time::sleep(field_delay).await;
        self.page.click(&selectors.blizzard_login).await?;
        self.page.wait_for_navigation(self.timeout()).await?;
        self.page.wait_for_network_idle(self.idle_window(), self.timeout()).await?;

        tracing::info!("Logged in as {}", creds.email);
        self.transition(SessionState::Authenticated)
    }

    pub async fn open_data_page(&mut self) -> Result<()> {
        self.page.goto(&self.config.site.meta_url).await?;
        self.page.wait_for_network_idle(self.idle_window(), self.timeout()).await?;
        self.page
            .wait_for_selector(&self.config.selectors.archetypes, self.timeout())
            .await?;

        // The table keeps re-rendering client-side after the network goes quiet.
        tokio::time::sleep(Duration::from_millis(self.config.browser.settle_delay_ms)).await;

        self.transition(SessionState::OnDataPage)
    }

    /// Visits every archetype's detail page, one tab at a time, in table order.
    pub async fn visit_archetypes(
        &mut self,
        archetypes: &[String],
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<DetailCapture>> {
        let links = extract_hrefs(&self.page, &self.config.selectors.archetype_links).await?;
        let pairs = pair_detail_links(archetypes, links)?;

        tokio::fs::create_dir_all(&self.config.output.screenshot_dir).await?;

        let mut captures = Vec::with_capacity(pairs.len());
        for (i, (name, link)) in pairs.iter().enumerate() {
            self.transition(SessionState::OnDetailPage(i))?;
            let capture = self.visit_detail(name, link, timestamp).await?;
            tracing::info!(
                "[{}/{}] {}: winrate {}%",
                i + 1,
                archetypes.len(),
                capture.name,
                capture.winrate
            );
            captures.push(capture);
        }

        self.transition(SessionState::Done)?;
        Ok(captures)
    }

    async fn visit_detail(
        &self,
        name: &str,
        link: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<DetailCapture> {
        let url = format!("{}{}", link, self.config.site.detail_fragment);
        let page = self.session.new_page(&url).await?;

        let result = self.capture_detail(&page, name, timestamp).await;

        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close detail page for {}: {}", name, e);
        }
        result
    }

    async fn capture_detail(
        &self,
        page: &B::Page,
        name: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<DetailCapture> {
        let winrate_selector = &self.config.selectors.winrate;

        page.wait_for_network_idle(self.idle_window(), self.timeout()).await?;
        page.wait_for_selector(winrate_selector, self.timeout()).await?;

        let raw = extract_texts(page, winrate_selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Parse(format!("no winrate found for {}", name)))?;
        let winrate = parse_percent(&raw)?;

        let screenshot = screenshot_path(&self.config.output.screenshot_dir, name, timestamp);
        page.save_full_screenshot(Path::new(&screenshot)).await?;

        Ok(DetailCapture {
            name: name.to_string(),
            winrate,
            screenshot,
        })
    }

    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::warn!("Failed to close main page: {}", e);
        }
    }
}
