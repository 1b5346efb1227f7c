//! Configuration management for presswatch.
//!
//! Settings are loaded from an optional TOML file with baked-in defaults for
//! the three agency sources. Environment variables (via .env / dotenvy) can
//! override the data directory and database path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::ScraperType;

/// One configured agency endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stable slug used as the database id (e.g. "doj").
    pub id: String,
    /// Human-readable agency name.
    pub name: String,
    /// Base URL used to resolve relative links.
    pub base_url: String,
    /// Which site adapter drives this source.
    pub scraper_type: ScraperType,
    /// Listing page override; defaults to the adapter's well-known URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub press_releases_url: Option<String>,
    /// Disabled sources are skipped by every scraping run.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Tunables shared by every scraper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// User agent sent on every HTTP request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry attempts for transient fetch failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between successful requests, in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Hard page-count cap per scraping run.
    #[serde(default = "default_max_pages")]
    pub max_pages_per_run: usize,
    /// Fallback-pagination early-stop: stop when this fraction of a page's
    /// dated rows is older than the requested range start. Empirical cutoff.
    #[serde(default = "default_stale_page_threshold")]
    pub stale_page_threshold: f64,
    /// Extracted content shorter than this is rejected outright.
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
    /// Content at least this long is accepted without trying later selectors.
    #[serde(default = "default_good_content_len")]
    pub good_content_len: usize,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_max_pages() -> usize {
    20
}

fn default_stale_page_threshold() -> f64 {
    0.8
}

fn default_min_content_len() -> usize {
    50
}

fn default_good_content_len() -> usize {
    100
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            request_delay_ms: default_request_delay_ms(),
            max_pages_per_run: default_max_pages(),
            stale_page_threshold: default_stale_page_threshold(),
            min_content_len: default_min_content_len(),
            good_content_len: default_good_content_len(),
        }
    }
}

impl ScrapingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Explicit Chrome/Chromium executable path; tried first when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    /// Run headless (default true).
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Page load timeout in seconds.
    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: default_headless(),
            timeout_secs: default_browser_timeout(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_browser_timeout() -> u64 {
    30
}

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Data directory holding the database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "Settings::default_sources")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("presswatch")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sources: Self::default_sources(),
            scraping: ScrapingConfig::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings, preferring an explicit path, then `PRESSWATCH_CONFIG`,
    /// then `presswatch.toml` in the current directory, then defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let candidate = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("PRESSWATCH_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from("presswatch.toml");
                local.exists().then_some(local)
            });

        let mut settings = match candidate {
            Some(p) => {
                let raw = std::fs::read_to_string(&p)
                    .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", p.display(), e))?;
                toml::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("invalid config {}: {}", p.display(), e))?
            }
            None => Settings::default(),
        };

        if let Ok(dir) = std::env::var("PRESSWATCH_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }

        Ok(settings)
    }

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        if let Ok(db) = std::env::var("PRESSWATCH_DB") {
            return PathBuf::from(db);
        }
        self.data_dir.join("presswatch.db")
    }

    /// The three agencies the pipeline ships with.
    pub fn default_sources() -> Vec<SourceConfig> {
        vec![
            SourceConfig {
                id: "doj".to_string(),
                name: "Department of Justice".to_string(),
                base_url: "https://www.justice.gov".to_string(),
                scraper_type: ScraperType::Doj,
                press_releases_url: Some(
                    "https://www.justice.gov/news/press-releases".to_string(),
                ),
                enabled: true,
            },
            SourceConfig {
                id: "sec".to_string(),
                name: "Securities and Exchange Commission".to_string(),
                base_url: "https://www.sec.gov".to_string(),
                scraper_type: ScraperType::Sec,
                press_releases_url: Some(
                    "https://www.sec.gov/newsroom/press-releases".to_string(),
                ),
                enabled: true,
            },
            SourceConfig {
                id: "cftc".to_string(),
                name: "Commodity Futures Trading Commission".to_string(),
                base_url: "https://www.cftc.gov".to_string(),
                scraper_type: ScraperType::Cftc,
                press_releases_url: Some(
                    "https://www.cftc.gov/PressRoom/PressReleases".to_string(),
                ),
                enabled: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_three_agencies() {
        let settings = Settings::default();
        let ids: Vec<_> = settings.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["doj", "sec", "cftc"]);
        assert!(settings.sources.iter().all(|s| s.enabled));
    }

    #[test]
    fn parses_partial_toml() {
        let raw = r#"
            data_dir = "/tmp/pw"

            [[sources]]
            id = "doj"
            name = "DOJ"
            base_url = "https://www.justice.gov"
            scraper_type = "doj"
            enabled = false

            [scraping]
            max_pages_per_run = 5
        "#;
        let settings: Settings = toml::from_str(raw).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/pw"));
        assert_eq!(settings.sources.len(), 1);
        assert!(!settings.sources[0].enabled);
        assert_eq!(settings.scraping.max_pages_per_run, 5);
        // Unspecified knobs keep their defaults.
        assert!((settings.scraping.stale_page_threshold - 0.8).abs() < f64::EPSILON);
    }
}
