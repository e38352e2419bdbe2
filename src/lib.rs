//! Shiori: an incremental catalog crawler
//!
//! This crate walks the paginated listings of a catalog site, extracts one
//! structured record per item from its detail page, caches each item's cover
//! image once, and keeps a persisted catalog up to date across runs.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod storage;

use thiserror::Error;

/// Main error type for Shiori operations
#[derive(Debug, Error)]
pub enum ShioriError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Missing items on page {page} ({found} instead of {expected}): {url}")]
    IncompletePage {
        url: String,
        page: u32,
        found: usize,
        expected: usize,
    },

    #[error("Listing page {url} is malformed: {message}")]
    Listing { url: String, message: String },

    #[error("Listing page not found: {url}")]
    ListingNotFound { url: String },

    #[error("Bookmark API error: {0}")]
    Api(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Transport-level failures, retried by the fetcher until the budget runs out
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
}

/// A detail page that does not carry a required field in the expected shape
///
/// These are never retried: the markup is deterministically wrong for this
/// item, which usually means the site changed its layout.
#[derive(Debug, Error)]
#[error("{kind} ({url})")]
pub struct ExtractionError {
    pub url: String,
    pub kind: ExtractionErrorKind,
}

/// What exactly went wrong while extracting a record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionErrorKind {
    #[error("Missing {0} section")]
    MissingSection(&'static str),

    #[error("Empty {0} section")]
    EmptySection(&'static str),

    #[error("Can't parse {field}: '{value}'")]
    Unparseable { field: &'static str, value: String },

    #[error("Can't find {0}")]
    MissingElement(&'static str),

    #[error("{field} out of range: '{value}'")]
    OutOfRange { field: &'static str, value: String },
}

impl ExtractionError {
    pub fn new(url: impl Into<String>, kind: ExtractionErrorKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Result type alias for Shiori operations
pub type Result<T> = std::result::Result<T, ShioriError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{Catalog, ItemRecord};
pub use config::Config;
pub use crawler::{ItemOutcome, LinkPage, PagedWalker, UpdatePolicy};
