//! Storage traits and error types

use crate::catalog::{Catalog, ItemRecord};
use crate::storage::{RunKind, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt row for {name}: {message}")]
    CorruptRow { name: String, message: String },

    #[error("{field} of {name} does not fit a database integer: {value}")]
    OutOfRange {
        name: String,
        field: &'static str,
        value: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence backend for the catalog
///
/// The catalog is loaded once per run and checkpointed after every listing
/// page, so `save_records` only ever receives the records that changed.
pub trait CatalogStore {
    // ===== Run Management =====

    /// Records the start of a run and returns its ID
    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Stamps the run's finish time together with its final status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Catalog =====

    fn load_catalog(&self) -> StorageResult<Catalog>;

    /// Upserts `records` by name in a single transaction
    ///
    /// Returns the number of rows written.
    fn save_records(&mut self, records: &[ItemRecord]) -> StorageResult<usize>;

    // ===== Statistics =====

    fn count_items(&self) -> StorageResult<u64>;

    fn count_labelled(&self) -> StorageResult<u64>;

    fn count_with_cover(&self) -> StorageResult<u64>;
}
