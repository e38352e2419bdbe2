//! Paged walk over a listing
//!
//! The walker requests listing pages one after the other, hands every newly
//! seen item name to a caller-supplied callback in batches of concurrent
//! invocations, checkpoints after each page, and decides when to stop.
//!
//! # Early stop
//!
//! With early stop enabled, a page on which every callback answered
//! [`ItemOutcome::Skip`] ends the walk without requesting further pages.
//! This is only sound when the listing is sorted newest first: once a whole
//! page is already known, every later page is assumed to be known as well.
//! The walker cannot verify that ordering; it is a property of the listing
//! template the caller chooses.

use crate::crawler::listing::LinkSource;
use crate::Result;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::future::Future;

/// What a per-item callback did with its item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The item was (re)processed and merged into the catalog
    Continue,

    /// Nothing to do for this item
    Skip,
}

/// Counters for one completed walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Listing pages requested
    pub pages: u32,

    /// Callback invocations that returned `Continue`
    pub processed: usize,

    /// Callback invocations that returned `Skip`
    pub skipped: usize,

    /// Names seen again on a later page and not handed out twice
    pub duplicates: usize,

    /// The walk ended on a page of skips rather than on the final page
    pub stopped_early: bool,
}

/// Page-by-page driver over a [`LinkSource`]
#[derive(Debug, Clone)]
pub struct PagedWalker {
    page_size: usize,
    batch_size: usize,
    early_stop: bool,
    start_page: u32,
}

impl PagedWalker {
    /// Creates a walker expecting `page_size` names on every non-final page
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            batch_size: 10,
            early_stop: false,
            start_page: 1,
        }
    }

    /// Number of callbacks running concurrently (at least 1)
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn early_stop(mut self, enabled: bool) -> Self {
        self.early_stop = enabled;
        self
    }

    pub fn start_page(mut self, page: u32) -> Self {
        self.start_page = page.max(1);
        self
    }

    /// Walks the listing until its final page or an early stop
    ///
    /// `on_item` is called once per distinct name; the calls of a batch run
    /// concurrently and the next batch starts only when the whole batch has
    /// finished. `on_page_done` runs after every page that did not trigger
    /// an early stop.
    ///
    /// Any error from the source or a callback ends the walk immediately;
    /// pages already checkpointed stay checkpointed.
    pub async fn walk<S, F, Fut, P>(
        &self,
        source: &S,
        mut on_item: F,
        mut on_page_done: P,
    ) -> Result<WalkSummary>
    where
        S: LinkSource + ?Sized,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<ItemOutcome>>,
        P: FnMut(u32) -> Result<()>,
    {
        let mut summary = WalkSummary::default();
        let mut seen = HashSet::new();
        let mut page = self.start_page;

        loop {
            let links = source.load_page(page).await?;
            summary.pages += 1;
            links.ensure_complete(page, self.page_size, &source.describe(page))?;

            let mut fresh = Vec::with_capacity(links.names.len());
            for name in links.names {
                if seen.insert(name.clone()) {
                    fresh.push(name);
                } else {
                    tracing::debug!("{} already handled during this walk", name);
                    summary.duplicates += 1;
                }
            }

            let mut outcomes = Vec::with_capacity(fresh.len());
            for batch in fresh.chunks(self.batch_size) {
                let results = try_join_all(batch.iter().cloned().map(&mut on_item)).await?;
                outcomes.extend(results);
            }

            let skipped = outcomes.iter().filter(|o| **o == ItemOutcome::Skip).count();
            summary.skipped += skipped;
            summary.processed += outcomes.len() - skipped;
            tracing::debug!(
                "Page {}: {} processed, {} skipped",
                page,
                outcomes.len() - skipped,
                skipped
            );

            if self.early_stop && !outcomes.is_empty() && skipped == outcomes.len() {
                tracing::info!("Page {} holds no new items, stopping early", page);
                summary.stopped_early = true;
                break;
            }

            on_page_done(page)?;

            if links.last {
                break;
            }
            page += 1;
        }

        Ok(summary)
    }
}
