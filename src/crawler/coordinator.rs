//! Crawler coordinator - sync and label runs
//!
//! This module ties the walker, the extractor and the catalog store together:
//! - `sync` walks every configured listing and refreshes the records the
//!   update policy asks for, stopping a listing early once a page is known
//! - `label` walks the positive and negative listings and labels their items
//! - the catalog is checkpointed to the store after every listing page
//!
//! Each run is recorded in the store together with the configuration hash.

use crate::catalog::{Catalog, CoverCache, FsCoverCache, SharedCatalog};
use crate::config::Config;
use crate::crawler::extractor::BookExtractor;
use crate::crawler::favorites::enable_favorites;
use crate::crawler::fetcher::{Fetched, Fetcher};
use crate::crawler::listing::ListingSource;
use crate::crawler::policy::UpdatePolicy;
use crate::crawler::walker::{ItemOutcome, PagedWalker};
use crate::storage::{open_store, CatalogStore, RunKind, RunStatus, SqliteStore};
use crate::Result;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Options of a sync run
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub policy: UpdatePolicy,

    /// First listing page to request on every listing
    pub start_page: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            policy: UpdatePolicy::new_only(),
            start_page: 1,
        }
    }
}

/// Totals over all listings walked by one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub listings: usize,
    pub pages: u32,
    pub processed: usize,
    pub skipped: usize,
    pub duplicates: usize,

    /// Listings that ended on a page of known items
    pub stopped_early: usize,

    /// Records written to the store by checkpoints
    pub saved: usize,
}

/// Catalog counters as persisted in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub records: u64,
    pub labelled: u64,
    pub covers: u64,
}

impl fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records:          {}", self.records)?;
        writeln!(f, "Labelled records: {}", self.labelled)?;
        write!(f, "Cached covers:    {}", self.covers)
    }
}

/// Result of a cover export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub exported: usize,

    /// Labelled records flagged with a cover the cache no longer has
    pub missing: usize,
}

/// Drives runs over the configured listings
pub struct Coordinator<S: CatalogStore = SqliteStore> {
    config: Config,
    config_hash: String,
    fetcher: Arc<Fetcher>,
    extractor: BookExtractor,
    store: S,
    catalog: Catalog,
}

impl Coordinator<SqliteStore> {
    /// Opens the database and cover directory named by the configuration
    pub async fn open(config: Config, config_hash: impl Into<String>) -> Result<Self> {
        let store = open_store(Path::new(&config.output.database_path))?;
        let covers = FsCoverCache::open(&config.output.covers_dir).await?;
        let fetcher = Fetcher::from_config(&config)?;

        Self::with_parts(config, config_hash, Arc::new(fetcher), store, Arc::new(covers))
    }
}

impl<S: CatalogStore> Coordinator<S> {
    /// Creates a coordinator over explicit collaborators and loads the catalog
    pub fn with_parts(
        config: Config,
        config_hash: impl Into<String>,
        fetcher: Arc<Fetcher>,
        store: S,
        covers: Arc<dyn CoverCache>,
    ) -> Result<Self> {
        let catalog = store.load_catalog()?;
        tracing::info!("Loaded catalog with {} records", catalog.len());

        let extractor = BookExtractor::new(Arc::clone(&fetcher), covers, config.site.base_url());

        Ok(Self {
            config,
            config_hash: config_hash.into(),
            fetcher,
            extractor,
            store,
            catalog,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Refreshes the catalog from every configured listing
    pub async fn sync(&mut self, options: SyncOptions) -> Result<RunReport> {
        let run_id = self.store.create_run(RunKind::Sync, &self.config_hash)?;
        tracing::info!("Starting sync run {} ({:?})", run_id, options.policy);

        if self.config.listings.is_empty() {
            tracing::warn!("No listings configured, nothing to sync");
        }

        let catalog = SharedCatalog::new(std::mem::take(&mut self.catalog));
        let result = self.sync_listings(&catalog, options).await;
        self.catalog = catalog.into_inner();

        self.finish_run(run_id, result)
    }

    /// Labels the items of the positive and negative listings
    ///
    /// Items already carrying the listing's label are skipped unless
    /// `update_all` is set. Labelling walks never stop early.
    pub async fn label(&mut self, update_all: bool) -> Result<RunReport> {
        let run_id = self.store.create_run(RunKind::Label, &self.config_hash)?;
        tracing::info!("Starting label run {}", run_id);

        let catalog = SharedCatalog::new(std::mem::take(&mut self.catalog));
        let result = self.label_listings(&catalog, update_all).await;
        self.catalog = catalog.into_inner();

        self.finish_run(run_id, result)
    }

    /// Counts records, labels and covers in the store
    pub fn stats(&self) -> Result<CatalogStats> {
        Ok(CatalogStats {
            records: self.store.count_items()?,
            labelled: self.store.count_labelled()?,
            covers: self.store.count_with_cover()?,
        })
    }

    /// Copies the cover of every labelled record to `<dir>/<label>/<id>.jpg`
    ///
    /// A cached cover is exported even when the record's cover flag is unset.
    pub async fn export_covers(&self, dir: &Path) -> Result<ExportReport> {
        let covers = self.extractor.covers();
        let mut records: Vec<_> = self.catalog.labelled().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));

        for label in ["true", "false"] {
            tokio::fs::create_dir_all(dir.join(label)).await?;
        }

        let mut report = ExportReport::default();
        for record in records {
            let Some(label) = record.label else { continue };

            match covers.load(record.id).await? {
                Some(bytes) => {
                    let target = dir.join(label.to_string()).join(format!("{}.jpg", record.id));
                    tokio::fs::write(&target, bytes).await?;
                    report.exported += 1;
                }
                None if record.cover => {
                    tracing::warn!("Cover for {} ({}) is not cached", record.name, record.id);
                    report.missing += 1;
                }
                None => {}
            }
        }

        tracing::info!(
            "Exported {} covers to {} ({} missing)",
            report.exported,
            dir.display(),
            report.missing
        );
        Ok(report)
    }

    fn walker(&self) -> PagedWalker {
        PagedWalker::new(self.config.crawler.page_size).batch_size(self.config.crawler.batch_size)
    }

    fn listing_source(&self, path: &str) -> ListingSource {
        ListingSource::new(
            Arc::clone(&self.fetcher),
            self.config.site.base_url(),
            path,
            self.config.crawler.page_size,
        )
    }

    async fn sync_listings(&mut self, catalog: &SharedCatalog, options: SyncOptions) -> Result<RunReport> {
        let walker = self
            .walker()
            .early_stop(!options.policy.force_all)
            .start_page(options.start_page);

        let mut report = RunReport::default();
        for listing in &self.config.listings {
            tracing::info!("Syncing listing {}", listing.path);
            let source = self.listing_source(&listing.path);
            let extractor = &self.extractor;
            let policy = options.policy;

            walk_listing(&walker, &source, &mut self.store, catalog, &mut report, |name| {
                sync_item(extractor, catalog, policy, name)
            })
            .await?;
        }

        Ok(report)
    }

    async fn label_listings(&mut self, catalog: &SharedCatalog, update_all: bool) -> Result<RunReport> {
        if let Some(favorites) = &self.config.favorites {
            enable_favorites(&self.fetcher, self.config.site.base_url(), favorites).await?;
        }

        let walker = self.walker();
        let labels = &self.config.labels;
        let listings = labels
            .positive
            .iter()
            .map(|path| (path, true))
            .chain(labels.negative.iter().map(|path| (path, false)));

        let mut report = RunReport::default();
        for (path, value) in listings {
            tracing::info!("Loading {} labels from {}", value, path);
            let source = self.listing_source(path);
            let extractor = &self.extractor;

            walk_listing(&walker, &source, &mut self.store, catalog, &mut report, |name| {
                label_item(extractor, catalog, value, update_all, name)
            })
            .await?;
        }

        Ok(report)
    }

    /// Writes the remaining changes and stamps the run with its outcome
    fn finish_run(&mut self, run_id: i64, result: Result<RunReport>) -> Result<RunReport> {
        match result {
            Ok(mut report) => {
                let changes = self.catalog.take_changes();
                report.saved += self.store.save_records(&changes)?;
                self.store.finish_run(run_id, RunStatus::Completed)?;

                tracing::info!(
                    "Run {} completed: {} pages, {} processed, {} skipped, {} records saved",
                    run_id,
                    report.pages,
                    report.processed,
                    report.skipped,
                    report.saved
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Run {} failed: {}", run_id, e);
                if let Err(store_err) = self.store.finish_run(run_id, RunStatus::Failed) {
                    tracing::warn!("Could not mark run {} as failed: {}", run_id, store_err);
                }
                Err(e)
            }
        }
    }
}

/// Walks one listing, checkpointing the catalog after every page
async fn walk_listing<S, F, Fut>(
    walker: &PagedWalker,
    source: &ListingSource,
    store: &mut S,
    catalog: &SharedCatalog,
    report: &mut RunReport,
    on_item: F,
) -> Result<()>
where
    S: CatalogStore,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<ItemOutcome>>,
{
    let mut saved = 0;
    let summary = walker
        .walk(source, on_item, |page| {
            let changes = catalog.lock().take_changes();
            let written = store.save_records(&changes)?;
            tracing::debug!("Checkpoint after page {}: {} records", page, written);
            saved += written;
            Ok(())
        })
        .await?;

    report.listings += 1;
    report.pages += summary.pages;
    report.processed += summary.processed;
    report.skipped += summary.skipped;
    report.duplicates += summary.duplicates;
    report.stopped_early += usize::from(summary.stopped_early);
    report.saved += saved;
    Ok(())
}

/// Re-extracts `name` unless the policy keeps the current record
async fn sync_item(
    extractor: &BookExtractor,
    catalog: &SharedCatalog,
    policy: UpdatePolicy,
    name: String,
) -> Result<ItemOutcome> {
    let existing = catalog.lock().get(&name).cloned();
    if policy.should_skip(existing.as_ref()) {
        tracing::debug!("Item {} is already in the catalog", name);
        return Ok(ItemOutcome::Skip);
    }

    if let Fetched::Found(record) = extractor.extract(&name).await? {
        let mut catalog = catalog.lock();
        let record = record.replacing(catalog.get(&name));
        catalog.upsert(record);
    }

    Ok(ItemOutcome::Continue)
}

/// Labels `name`, extracting its record first when the catalog lacks it
async fn label_item(
    extractor: &BookExtractor,
    catalog: &SharedCatalog,
    value: bool,
    update_all: bool,
    name: String,
) -> Result<ItemOutcome> {
    let existing = catalog.lock().get(&name).map(|record| record.label);

    match existing {
        Some(label) if label == Some(value) && !update_all => return Ok(ItemOutcome::Skip),
        Some(_) => {}
        None => match extractor.extract(&name).await? {
            Fetched::Found(record) => {
                catalog.lock().upsert(record);
            }
            Fetched::NotFound => return Ok(ItemOutcome::Continue),
        },
    }

    catalog.lock().set_label(&name, value);
    Ok(ItemOutcome::Continue)
}
