use serde::Deserialize;

/// Main configuration structure for Shiori
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "listing")]
    pub listings: Vec<ListingEntry>,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub favorites: Option<FavoritesConfig>,
}

/// Catalog site access
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the site; item names are paths directly below it
    pub url: String,

    /// Session cookie sent with every page and API request
    #[serde(default)]
    pub cookie: String,
}

impl SiteConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of items on every full listing page
    #[serde(rename = "page-size")]
    pub page_size: usize,

    /// Number of items processed concurrently within a page
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Retries after the first failed attempt of a request
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Retry delay is `backoff-base ^ attempt` seconds
    #[serde(rename = "backoff-base")]
    pub backoff_base: f64,

    /// Per-request transport timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_size: 48,
            batch_size: 10,
            max_retries: 10,
            backoff_base: 1.5,
            timeout_secs: 30,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite catalog database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory holding one cover file per item id
    #[serde(rename = "covers-dir")]
    pub covers_dir: String,
}

/// A listing template walked by `sync`
#[derive(Debug, Clone, Deserialize)]
pub struct ListingEntry {
    /// Path below the base URL; the page number is appended to it
    pub path: String,
}

/// Listings whose items receive a positive or negative label
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelsConfig {
    #[serde(default)]
    pub positive: Vec<String>,

    #[serde(default)]
    pub negative: Vec<String>,
}

/// Bookmark call that switches favorites listings on for the session
#[derive(Debug, Clone, Deserialize)]
pub struct FavoritesConfig {
    #[serde(rename = "probe-id")]
    pub probe_id: u64,

    #[serde(default = "default_favorites_mode")]
    pub mode: u8,
}

fn default_favorites_mode() -> u8 {
    5
}
