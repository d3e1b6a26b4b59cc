use crate::model::ConfigError;
use crate::scraper::Retailer;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CLICK_DELAY_MS: u64 = 500;
pub const DEFAULT_SCRAPE_DELAY_MS: u64 = 3000;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Seconds between full scrape passes. Absent means a single pass.
    #[serde(default)]
    pub run_interval_seconds: Option<u64>,
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Where page HTML is dumped when a category's container is missing.
    #[serde(default)]
    pub debug_html_dir: Option<String>,
    /// JSON dump of the whole catalog, rewritten after every pass.
    #[serde(default)]
    pub catalog_export_path: Option<String>,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub retailers: Vec<RetailerConfig>,
    #[serde(default)]
    pub delays: ScrapeDelays,
    #[serde(default)]
    pub timeouts: ScrapeTimeouts,
    #[serde(default)]
    pub pagination: PaginationPolicy,
    #[serde(default)]
    pub pacing: PacingConfig,
}

#[derive(Debug, Deserialize)]
pub struct RetailerConfig {
    pub retailer: Retailer,
    /// Category -> URL overrides. Empty means the retailer's built-in set.
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
}

impl RetailerConfig {
    pub fn category_urls(&self) -> BTreeMap<String, String> {
        if self.categories.is_empty() {
            self.retailer.default_categories()
        } else {
            self.categories.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub executable: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_agent: None,
        }
    }
}

/// UI-settle delays used while paginating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScrapeDelays {
    /// Wait before probing for the "load more" control.
    pub click_delay_ms: u64,
    /// Wait after pagination before the final snapshot.
    pub scrape_delay_ms: u64,
}

impl Default for ScrapeDelays {
    fn default() -> Self {
        Self {
            click_delay_ms: DEFAULT_CLICK_DELAY_MS,
            scrape_delay_ms: DEFAULT_SCRAPE_DELAY_MS,
        }
    }
}

impl ScrapeDelays {
    /// Applies `CLICK_DELAY` / `SCRAPE_DELAY` from `lookup`. Unparsable values
    /// keep the current setting.
    pub fn with_overrides<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            click_delay_ms: read_millis(&lookup, "CLICK_DELAY", self.click_delay_ms),
            scrape_delay_ms: read_millis(&lookup, "SCRAPE_DELAY", self.scrape_delay_ms),
        }
    }
}

fn read_millis<F>(lookup: &F, key: &str, fallback: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => fallback,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(ms) => ms,
            Err(_) => {
                warn!("Ignoring {}={:?}: not a millisecond count, using {}", key, raw, fallback);
                fallback
            }
        },
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScrapeTimeouts {
    pub navigation_secs: u64,
    pub container_wait_ms: u64,
    pub container_poll_ms: u64,
    pub category_secs: u64,
    /// Upper bound on browser shutdown; past it the browser is abandoned.
    pub browser_close_secs: u64,
}

impl Default for ScrapeTimeouts {
    fn default() -> Self {
        Self {
            navigation_secs: 120,
            container_wait_ms: 15_000,
            container_poll_ms: 250,
            category_secs: 900,
            browser_close_secs: 30,
        }
    }
}

impl ScrapeTimeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    pub fn container_wait(&self) -> Duration {
        Duration::from_millis(self.container_wait_ms)
    }

    pub fn container_poll(&self) -> Duration {
        Duration::from_millis(self.container_poll_ms.max(1))
    }

    pub fn category(&self) -> Duration {
        Duration::from_secs(self.category_secs)
    }

    pub fn browser_close(&self) -> Duration {
        Duration::from_secs(self.browser_close_secs)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PaginationPolicy {
    /// Hard ceiling on "load more" clicks per category.
    pub max_clicks: usize,
    /// Extra probe attempts when the control probe itself errors.
    pub probe_retries: u32,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            max_clicks: 200,
            probe_retries: 2,
        }
    }
}

/// Inter-request pacing between category starts.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub stagger_ms: u64,
    pub jitter_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            stagger_ms: 1000,
            jitter_ms: 750,
        }
    }
}

fn default_database_path() -> String {
    "catalog.db".to_string()
}

fn default_true() -> bool {
    true
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    if config.retailers.is_empty() {
        return Err(ConfigError::Invalid("no retailers configured".into()));
    }
    Ok(config)
}

/// Reads the JSON config and applies `CLICK_DELAY` / `SCRAPE_DELAY` on top.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    config.delays = config.delays.with_overrides(|key| std::env::var(key).ok());
    Ok(config)
}
