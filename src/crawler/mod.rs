//! Crawler module for catalog listings and item pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Paged listing walks with batched item processing
//! - Detail page extraction into item records
//! - Sync and label run coordination

mod consts;
mod coordinator;
mod detail;
mod extractor;
mod favorites;
mod fetcher;
mod listing;
mod policy;
mod retry;
mod walker;

pub use coordinator::{CatalogStats, Coordinator, ExportReport, RunReport, SyncOptions};
pub use detail::{parse_detail, DetailPage, ParsedDetail};
pub use extractor::BookExtractor;
pub use favorites::{add_to_favorites, enable_favorites};
pub use fetcher::{build_http_client, Fetched, Fetcher};
pub use listing::{parse_listing, LinkPage, LinkSource, ListingSource};
pub use policy::UpdatePolicy;
pub use retry::{retry, RetryPolicy};
pub use walker::{ItemOutcome, PagedWalker, WalkSummary};
