//! Bookmark API
//!
//! Favorites listings only show up for a session once the account has used
//! the bookmark feature; bookmarking a known item with the configured mode
//! switches them on.

use crate::config::FavoritesConfig;
use crate::crawler::fetcher::Fetcher;
use crate::{FetchError, Result, ShioriError};
use reqwest::multipart::Form;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BookmarkReply {
    status: i64,
}

/// Bookmarks item `id` with `mode`; returns whether the site accepted it
pub async fn add_to_favorites(fetcher: &Fetcher, base_url: &str, id: u64, mode: u8) -> Result<bool> {
    let url = format!("{}/api", base_url.trim_end_matches('/'));
    let form = Form::new()
        .text("controller", "manga")
        .text("action", "bookmark")
        .text("mid", id.to_string())
        .text("mode", mode.to_string());

    let response = fetcher.post_form(&url, form).await?;
    let reply: BookmarkReply = response
        .json()
        .await
        .map_err(|source| FetchError::Http { url, source })?;

    Ok(reply.status == 1)
}

/// Switches favorites listings on for the configured session
pub async fn enable_favorites(fetcher: &Fetcher, base_url: &str, config: &FavoritesConfig) -> Result<()> {
    if add_to_favorites(fetcher, base_url, config.probe_id, config.mode).await? {
        tracing::info!("Enabled favorites");
        Ok(())
    } else {
        Err(ShioriError::Api("Failed to enable favorites".to_string()))
    }
}
