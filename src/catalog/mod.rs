//! Catalog of extracted item records
//!
//! The catalog maps each item's `name` (the slug it is listed under) to its
//! record. It is owned by the run that drives the crawl and handed to the
//! walker callbacks by reference; nothing in the crate keeps a global copy.

pub mod covers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub use covers::{CoverCache, FsCoverCache, MemoryCoverCache};

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Identifier assigned by the source site
    pub id: u64,

    /// Unique key within the catalog
    pub name: String,

    /// Whether the cover asset for `id` is present in the cover cache
    pub cover: bool,

    pub views: u64,
    pub pages: u32,
    pub chapters: u32,

    /// Release year, `None` when the site lists it as unknown
    pub year: Option<i32>,

    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,

    /// Average rating in `[0, 5]`
    pub score: f64,
    pub votes: u64,

    /// Earliest chapter upload time, when any chapter annotates one
    pub uploaded: Option<DateTime<Utc>>,

    /// Set by labelling runs; carried over when the record is re-extracted
    pub label: Option<bool>,
}

impl ItemRecord {
    /// Returns a copy of `self` that keeps the label of the record it replaces
    pub fn replacing(mut self, previous: Option<&ItemRecord>) -> Self {
        if self.label.is_none() {
            self.label = previous.and_then(|p| p.label);
        }
        self
    }
}

/// Mapping from item name to record
///
/// Every insert and label change is remembered until the next
/// [`Catalog::take_changes`], which is what a checkpoint persists.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<String, ItemRecord>,
    changed: HashSet<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ItemRecord> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Inserts or wholesale-replaces the record stored under its name
    ///
    /// Returns the record that was replaced, if any.
    pub fn upsert(&mut self, record: ItemRecord) -> Option<ItemRecord> {
        self.changed.insert(record.name.clone());
        self.items.insert(record.name.clone(), record)
    }

    /// Sets the label of a known record; returns false for unknown names
    pub fn set_label(&mut self, name: &str, label: bool) -> bool {
        match self.items.get_mut(name) {
            Some(record) => {
                record.label = Some(label);
                self.changed.insert(name.to_string());
                true
            }
            None => false,
        }
    }

    /// Records inserted or relabelled since the last call, in name order
    pub fn take_changes(&mut self) -> Vec<ItemRecord> {
        let mut names: Vec<_> = self.changed.drain().collect();
        names.sort();
        names
            .iter()
            .filter_map(|name| self.items.get(name).cloned())
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.values()
    }

    pub fn labelled(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.values().filter(|r| r.label.is_some())
    }
}

/// Builds a catalog of already persisted records (no pending changes)
impl FromIterator<ItemRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = ItemRecord>>(iter: I) -> Self {
        let items = iter
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
        Self {
            items,
            changed: HashSet::new(),
        }
    }
}

/// Catalog shared between the concurrent callbacks of one batch
///
/// Callbacks of a batch run on the same task and never hold the guard across
/// an await point, so the lock is only ever contended for the duration of a
/// map lookup or insert.
#[derive(Debug, Default)]
pub struct SharedCatalog {
    inner: Mutex<Catalog>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Mutex::new(catalog),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Catalog> {
        // A panicking callback aborts the walk anyway; the map itself stays consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_inner(self) -> Catalog {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) fn sample_record(name: &str, id: u64) -> ItemRecord {
    ItemRecord {
        id,
        name: name.to_string(),
        cover: false,
        views: 100,
        pages: 20,
        chapters: 1,
        year: Some(2019),
        authors: vec!["someone".to_string()],
        categories: vec!["manga".to_string()],
        tags: vec!["comedy".to_string()],
        score: 4.5,
        votes: 10,
        uploaded: None,
        label: None,
    }
}
