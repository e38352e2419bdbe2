//! Storage module for persisting the catalog
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Catalog load and per-page checkpoints
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{CatalogStore, StorageError, StorageResult};

use crate::Result;
use std::path::Path;

/// Initializes or opens a catalog database
pub fn open_store(path: &Path) -> Result<SqliteStore> {
    Ok(SqliteStore::new(path)?)
}

/// Represents a run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub kind: RunKind,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// What a run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Sync,
    Label,
}

impl RunKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Label => "label",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "sync" => Some(Self::Sync),
            "label" => Some(Self::Label),
            _ => None,
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
