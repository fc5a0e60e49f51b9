use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_LOGIN_URL: &str = "https://hsreplay.net/account/login/?next=%2F";
pub const DEFAULT_META_URL: &str = "https://hsreplay.net/meta/#tab=popularity&popularitySortBy=rank0";
pub const DEFAULT_DETAIL_FRAGMENT: &str = "#rankRange=LEGEND_THROUGH_FIVE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub browser: BrowserSettings,
    pub selectors: SelectorConfig,
    pub database: DatabaseConfig,
    pub output: OutputConfig,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub login_url: String,
    /// Aggregated statistics view; the fragment picks the popularity tab and sort column.
    pub meta_url: String,
    /// Appended to every archetype detail link to select the rank range.
    pub detail_fragment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_executable: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout_secs: u64,
    /// Quiet window used by the network-idle check.
    pub network_idle_ms: u64,
    /// Fallback wait after the data view reports idle, for client-side rendering.
    pub settle_delay_ms: u64,
    /// Fallback wait between focusing a login field and typing into it.
    pub field_delay_ms: u64,
}

/// Named CSS selectors. Treated as opaque strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub login_redirect: String,
    pub email_field: String,
    pub password_field: String,
    pub blizzard_login: String,
    pub archetypes: String,
    pub archetype_links: String,
    pub winrate: String,
    pub popularity: String,
    pub games_played: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub table: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub screenshot_dir: String,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            meta_url: DEFAULT_META_URL.to_string(),
            detail_fragment: DEFAULT_DETAIL_FRAGMENT.to_string(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_executable: None,
            window_width: 1280,
            window_height: 1024,
            navigation_timeout_secs: 30,
            network_idle_ms: 500,
            settle_delay_ms: 3000,
            field_delay_ms: 100,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            login_redirect: "body > div.container > div > form > p:nth-child(2) > button"
                .to_string(),
            email_field: "#accountName".to_string(),
            password_field: "#password".to_string(),
            blizzard_login: "#submit".to_string(),
            archetypes: "#archetype-popularity .player-class".to_string(),
            archetype_links: "#archetype-popularity a.player-class".to_string(),
            winrate: ".winrate-cell .value".to_string(),
            popularity: "#archetype-popularity .table-cell".to_string(),
            games_played: "#archetype-popularity .games-played".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000".to_string(),
            namespace: "hsreplay".to_string(),
            database: "metagame".to_string(),
            table: "snapshots".to_string(),
            username: None,
            password: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: "./screenshots".to_string(),
        }
    }
}

fn env_string(key: &str, target: &mut String) {
    if let Ok(value) = std::env::var(key) {
        *target = value;
    }
}

fn env_optional(key: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(key) {
        *target = Some(value);
    }
}

fn env_parsed<T: FromStr>(key: &str, target: &mut T) {
    if let Some(value) = std::env::var(key).ok().and_then(|v| v.parse().ok()) {
        *target = value;
    }
}

impl Config {
    /// Built-in defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Loads `config.toml` (explicit path, or the per-user default if it exists) and
    /// applies environment overrides on top. Environment always wins over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(AppError::Configuration(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                Some(p.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.exists()),
        };

        let mut config = match file_path {
            Some(p) => {
                tracing::info!("Loading configuration from {}", p.display());
                Self::from_toml_file(&p)?
            }
            None => return Ok(Self::from_env()),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str::<Config>(&contents)?)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("metagame-scraper").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        env_string("HSREPLAY_LOGIN_URL", &mut self.site.login_url);
        env_string("HSREPLAY_META_URL", &mut self.site.meta_url);
        env_string("HSREPLAY_DETAIL_FRAGMENT", &mut self.site.detail_fragment);

        env_parsed("BROWSER_HEADLESS", &mut self.browser.headless);
        env_optional("CHROME_EXECUTABLE", &mut self.browser.chrome_executable);
        env_parsed("NAVIGATION_TIMEOUT_SECS", &mut self.browser.navigation_timeout_secs);
        env_parsed("NETWORK_IDLE_MS", &mut self.browser.network_idle_ms);
        env_parsed("SETTLE_DELAY_MS", &mut self.browser.settle_delay_ms);
        env_parsed("FIELD_DELAY_MS", &mut self.browser.field_delay_ms);

        env_string("SURREAL_URL", &mut self.database.url);
        env_string("SURREAL_NAMESPACE", &mut self.database.namespace);
        env_string("SURREAL_DATABASE", &mut self.database.database);
        env_string("SURREAL_TABLE", &mut self.database.table);
        env_optional("SURREAL_USER", &mut self.database.username);
        env_optional("SURREAL_PASS", &mut self.database.password);

        env_string("SCREENSHOT_DIR", &mut self.output.screenshot_dir);

        env_string("BLIZZARD_EMAIL", &mut self.credentials.email);
        env_string("BLIZZARD_PASSWORD", &mut self.credentials.password);
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("site.login_url", &self.site.login_url),
            ("site.meta_url", &self.site.meta_url),
        ] {
            if url::Url::parse(value).is_err() {
                errors.push(format!("{} is not a valid URL: {}", name, value));
            }
        }

        let s = &self.selectors;
        for (name, value) in [
            ("login_redirect", &s.login_redirect),
            ("email_field", &s.email_field),
            ("password_field", &s.password_field),
            ("blizzard_login", &s.blizzard_login),
            ("archetypes", &s.archetypes),
            ("archetype_links", &s.archetype_links),
            ("winrate", &s.winrate),
            ("popularity", &s.popularity),
            ("games_played", &s.games_played),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("selectors.{} must not be empty", name));
            }
        }

        if self.browser.navigation_timeout_secs == 0 {
            errors.push("Navigation timeout must be greater than 0".to_string());
        }

        if self.database.url.is_empty() {
            errors.push("Database URL must be set".to_string());
        }

        if self.database.table.is_empty() {
            errors.push("Database table must be set".to_string());
        }

        if self.credentials.email.is_empty() || self.credentials.password.is_empty() {
            errors.push(
                "Credentials missing (set BLIZZARD_EMAIL and BLIZZARD_PASSWORD)".to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
