//! Configuration module for Shiori
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use shiori::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shiori.toml")).unwrap();
//! println!("Walking {} listings", config.listings.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FavoritesConfig, LabelsConfig, ListingEntry, OutputConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
