//! A scripted browser for driving the navigator without Chrome. Every call is
//! appended to a shared log so tests can check what happened and in which order.

use super::dom::{DomQuery, HtmlPage};
use super::page::{BrowserPage, PageSource};
use crate::config::Config;
use crate::error::{AppError, Result};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub(crate) const BASE_URL: &str = "https://hsreplay.net/meta/";
pub(crate) const HOME_URL: &str = "https://hsreplay.net/";

pub(crate) const META_HTML: &str = r#"
<div id="archetype-popularity">
  <span class="games-played">100</span><span class="games-played">100</span>
  <span class="games-played">100</span><span class="games-played">100</span>
  <span class="games-played">100</span><span class="games-played">100</span>
  <div class="row">
    <a class="player-class" href="/archetypes/1/control-warrior">Control Warrior</a>
    <span class="table-cell">10%</span><span class="table-cell">20%</span>
    <span class="table-cell">30%</span><span class="table-cell">40%</span>
    <span class="table-cell">50%</span><span class="table-cell">60%</span>
    <span class="table-cell">35%</span>
  </div>
  <div class="row">
    <a class="player-class" href="/archetypes/2/big-priest">Big Priest</a>
    <span class="table-cell">5%</span><span class="table-cell">5%</span>
    <span class="table-cell">5%</span><span class="table-cell">5%</span>
    <span class="table-cell">5%</span><span class="table-cell">5%</span>
    <span class="table-cell">5%</span>
  </div>
</div>
"#;

pub(crate) const DETAIL_HTML: &str =
    r#"<div class="winrate-cell"><span class="value">54.2%</span></div>"#;

pub(crate) type CallLog = Rc<RefCell<Vec<String>>>;

/// How the scripted site behaves.
pub(crate) struct Script {
    pub login_url: String,
    pub logged_in: bool,
    /// Detail pages whose URL contains this never show a win rate.
    pub broken_detail: Option<String>,
}

pub(crate) struct ScriptedBrowser {
    script: Rc<Script>,
    log: CallLog,
}

impl ScriptedBrowser {
    pub fn new(config: &Config, logged_in: bool) -> Self {
        Self {
            script: Rc::new(Script {
                login_url: config.site.login_url.clone(),
                logged_in,
                broken_detail: None,
            }),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_broken_detail(mut self, fragment: &str) -> Self {
        self.script = Rc::new(Script {
            login_url: self.script.login_url.clone(),
            logged_in: self.script.logged_in,
            broken_detail: Some(fragment.to_string()),
        });
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl PageSource for ScriptedBrowser {
    type Page = ScriptedPage;

    async fn new_page(&self, url: &str) -> Result<ScriptedPage> {
        self.log.borrow_mut().push(format!("open {}", url));
        Ok(ScriptedPage {
            script: self.script.clone(),
            log: self.log.clone(),
            url: RefCell::new(url.to_string()),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().push("release".to_string());
        Ok(())
    }
}

pub(crate) struct ScriptedPage {
    script: Rc<Script>,
    log: CallLog,
    url: RefCell<String>,
}

impl ScriptedPage {
    fn record(&self, entry: String) {
        self.log.borrow_mut().push(entry);
    }

    fn is_broken(&self) -> bool {
        let url = self.url.borrow();
        self.script
            .broken_detail
            .as_deref()
            .is_some_and(|fragment| url.contains(fragment))
    }
}

impl DomQuery for ScriptedPage {
    async fn property_values(&self, selector: &str, property: &str) -> Result<Vec<String>> {
        self.record(format!("query {}", selector));
        let html = if self.url.borrow().contains("/archetypes/") {
            DETAIL_HTML
        } else {
            META_HTML
        };
        HtmlPage::parse(html)
            .with_base_url(BASE_URL)?
            .property_values(selector, property)
            .await
    }
}

impl BrowserPage for ScriptedPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(format!("goto {}", url));
        let landed = if url == self.script.login_url && self.script.logged_in {
            HOME_URL
        } else {
            url
        };
        *self.url.borrow_mut() = landed.to_string();
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.url.borrow().clone())
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<()> {
        if self.is_broken() {
            return Err(AppError::Timeout(format!("waiting for selector: {}", selector)));
        }
        Ok(())
    }

    async fn wait_for_network_idle(&self, _idle: Duration, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click {}", selector));
        Ok(())
    }

    async fn type_into(&self, selector: &str, _text: &str, _delay: Duration) -> Result<()> {
        self.record(format!("type {}", selector));
        Ok(())
    }

    async fn save_full_screenshot(&self, path: &Path) -> Result<()> {
        self.record(format!("screenshot {}", path.display()));
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.record(format!("close {}", self.url.borrow()));
        Ok(())
    }
}

/// Defaults with credentials set, no fixed delays and screenshots under `dir`.
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.credentials.email = "player@example.com".into();
    config.credentials.password = "hunter2".into();
    config.browser.settle_delay_ms = 0;
    config.browser.field_delay_ms = 0;
    config.output.screenshot_dir = dir.display().to_string();
    config
}

pub(crate) fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{:?} not in log {:#?}", entry, log))
}
