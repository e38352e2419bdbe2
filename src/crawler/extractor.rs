//! Item record extraction
//!
//! Fetches an item's detail page, derives a complete record from it, and
//! makes sure the item's cover is in the cover cache. A record is only
//! returned when every field was derived; the cover is only downloaded once
//! the page itself proved valid, and never when the cache already has it.

use crate::catalog::{CoverCache, ItemRecord};
use crate::crawler::detail::{parse_detail, ParsedDetail};
use crate::crawler::fetcher::{Fetched, Fetcher};
use crate::{ExtractionError, Result};
use chrono::Utc;
use std::sync::Arc;

pub struct BookExtractor {
    fetcher: Arc<Fetcher>,
    covers: Arc<dyn CoverCache>,
    base_url: String,
}

impl BookExtractor {
    pub fn new(fetcher: Arc<Fetcher>, covers: Arc<dyn CoverCache>, base_url: &str) -> Self {
        Self {
            fetcher,
            covers,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn detail_url(&self, name: &str) -> String {
        format!("{}/{}/", self.base_url, name)
    }

    pub fn covers(&self) -> &Arc<dyn CoverCache> {
        &self.covers
    }

    /// Extracts the record for `name`
    ///
    /// Returns `Fetched::NotFound` when the item no longer exists.
    pub async fn extract(&self, name: &str) -> Result<Fetched<ItemRecord>> {
        let url = self.detail_url(name);
        tracing::debug!("Loading item {}", name);

        let html = match self.fetcher.fetch_text(&url).await? {
            Fetched::Found(html) => html,
            Fetched::NotFound => {
                tracing::warn!("Item {} not found at {}", name, url);
                return Ok(Fetched::NotFound);
            }
        };

        let detail = parse_detail(&html, &url, Utc::now())?;
        let cover = self.ensure_cover(&detail, &url).await?;

        Ok(Fetched::Found(detail.into_record(name, cover)))
    }

    /// Makes sure the cover for `detail.id` is cached; false when the site has none
    async fn ensure_cover(&self, detail: &ParsedDetail, url: &str) -> Result<bool> {
        if self.covers.contains(detail.id).await? {
            return Ok(true);
        }

        let cover_url = detail
            .cover_url()
            .map_err(|kind| ExtractionError::new(url, kind))?;

        match self.fetcher.fetch_bytes(cover_url).await? {
            Fetched::Found(bytes) => {
                self.covers.store(detail.id, &bytes).await?;
                tracing::debug!("Cached cover for {} ({} bytes)", detail.id, bytes.len());
                Ok(true)
            }
            Fetched::NotFound => {
                tracing::debug!("No cover available for {} at {}", detail.id, cover_url);
                Ok(false)
            }
        }
    }
}
