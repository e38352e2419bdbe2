use crate::config::types::{Config, CrawlerConfig, LabelsConfig, ListingEntry, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_listings(&config.listings)?;
    validate_labels(&config.labels)?;
    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site url '{}': {}", config.url, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "Site url '{}' must use http or https",
            config.url
        )));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "Site url '{}' must not carry a query or fragment",
            config.url
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    if config.backoff_base.is_nan() || config.backoff_base < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_base must be >= 1.0, got {}",
            config.backoff_base
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.covers_dir.is_empty() {
        return Err(ConfigError::Validation(
            "covers_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_listings(listings: &[ListingEntry]) -> Result<(), ConfigError> {
    for entry in listings {
        validate_listing_path(&entry.path)?;
    }
    Ok(())
}

fn validate_labels(labels: &LabelsConfig) -> Result<(), ConfigError> {
    for path in labels.positive.iter().chain(&labels.negative) {
        validate_listing_path(path)?;
    }
    Ok(())
}

/// Validates a listing path template (relative to the base URL)
fn validate_listing_path(path: &str) -> Result<(), ConfigError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::Validation(
            "Listing path cannot be empty".to_string(),
        ));
    }

    if trimmed.contains("://") || trimmed.contains('?') || trimmed.contains('#') {
        return Err(ConfigError::Validation(format!(
            "Listing path '{}' must be a plain path below the site url",
            path
        )));
    }

    Ok(())
}
