//! Listing pages and the sources that produce them
//!
//! A listing page enumerates item names, a fixed number per page, and tells
//! whether it is the last one. The walker only sees the `LinkSource` trait so
//! it can be driven by any listing template, or by a stub in tests.

use crate::crawler::consts;
use crate::crawler::fetcher::{Fetched, Fetcher};
use crate::crawler::retry::retry;
use crate::{Result, ShioriError};
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;

/// Item names discovered on one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPage {
    /// Names in listing order
    pub names: Vec<String>,

    /// True when this is the final page of the listing
    pub last: bool,
}

impl LinkPage {
    pub fn new(names: Vec<String>, last: bool) -> Self {
        Self { names, last }
    }

    /// Rejects an under-full page that does not claim to be the last one
    ///
    /// A short page in the middle of a listing means the site served a
    /// truncated page; walking on would silently miss items.
    pub fn ensure_complete(&self, page: u32, page_size: usize, url: &str) -> Result<()> {
        if !self.last && self.names.len() < page_size {
            return Err(ShioriError::IncompletePage {
                url: url.to_string(),
                page,
                found: self.names.len(),
                expected: page_size,
            });
        }
        Ok(())
    }
}

/// Strategy for loading numbered listing pages
#[async_trait]
pub trait LinkSource: Send + Sync {
    /// Loads page `page` (1-based)
    async fn load_page(&self, page: u32) -> Result<LinkPage>;

    /// Human-readable location of a page, used in errors and logs
    fn describe(&self, page: u32) -> String {
        format!("page {}", page)
    }
}

/// A listing template on the catalog site, e.g. `{base}/list/all/last-added/{page}/`
#[derive(Debug, Clone)]
pub struct ListingSource {
    fetcher: Arc<Fetcher>,
    base_url: String,
    path: String,
    page_size: usize,
}

impl ListingSource {
    pub fn new(fetcher: Arc<Fetcher>, base_url: &str, path: &str, page_size: usize) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            path: path.trim_matches('/').to_string(),
            page_size,
        }
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}/{}/{}/", self.base_url, self.path, page)
    }

    async fn try_load(&self, page: u32, url: &str) -> Result<Option<LinkPage>> {
        let body = match self.fetcher.try_text(url).await? {
            Fetched::Found(body) => body,
            Fetched::NotFound => return Ok(None),
        };

        let links = parse_listing(&body, &self.base_url, page).map_err(|message| {
            ShioriError::Listing {
                url: url.to_string(),
                message,
            }
        })?;
        links.ensure_complete(page, self.page_size, url)?;
        Ok(Some(links))
    }
}

#[async_trait]
impl LinkSource for ListingSource {
    async fn load_page(&self, page: u32) -> Result<LinkPage> {
        let url = self.page_url(page);
        tracing::info!("Loading page {}", page);

        // Truncated pages are as transient as network errors, so the whole
        // load is retried, not only the request.
        let links = retry(self.fetcher.policy(), &url, || self.try_load(page, &url)).await?;

        links.ok_or(ShioriError::ListingNotFound { url })
    }

    fn describe(&self, page: u32) -> String {
        self.page_url(page)
    }
}

/// Parses a listing page into item names
///
/// The total page count is the last non-empty entry of the pagination bar;
/// the page is final when that count equals `page`.
pub fn parse_listing(html: &str, base_url: &str, page: u32) -> std::result::Result<LinkPage, String> {
    let document = Html::parse_document(html);

    let total = document
        .select(&consts::PAGINATION_SELECTOR)
        .map(|li| li.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .last()
        .ok_or_else(|| "Can't find pagination".to_string())?;
    tracing::info!("Loaded page {}/{}", page, total);

    let names = document
        .select(&consts::ITEM_LINK_SELECTOR)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| item_name(href, base_url))
        .collect();

    Ok(LinkPage {
        names,
        last: total == page.to_string(),
    })
}

/// Turns an item link into the item's name (its path below the base URL)
fn item_name(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    let base = base_url.trim_end_matches('/');
    let relative = href
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or_else(|| href.trim_start_matches('/'));
    let name = relative.trim_end_matches('/');

    (!name.is_empty()).then(|| name.to_string())
}
