use super::dom::DomQuery;
use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// Tab-level operations the navigator needs on top of DOM reads.
#[allow(async_fn_in_trait)]
pub trait BrowserPage: DomQuery + Sized {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn url(&self) -> Result<String>;

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<()>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Resolves once no request has been in flight for `idle`.
    async fn wait_for_network_idle(&self, idle: Duration, timeout: Duration) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn type_into(&self, selector: &str, text: &str, delay: Duration) -> Result<()>;

    async fn save_full_screenshot(&self, path: &Path) -> Result<()>;

    async fn close(self) -> Result<()>;
}

/// Something that opens tabs: a running browser, or a scripted one in tests.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    type Page: BrowserPage;

    async fn new_page(&self, url: &str) -> Result<Self::Page>;

    async fn close(&mut self) -> Result<()>;
}
