//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CatalogStore trait.

use crate::catalog::{Catalog, ItemRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CatalogStore, StorageError, StorageResult};
use crate::storage::{RunKind, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const ITEM_COLUMNS: &str = "name, id, cover, views, pages, chapters, year, authors, categories, \
                            tags, score, votes, uploaded, label";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Raw column values of one `items` row
struct ItemRow {
    name: String,
    id: i64,
    cover: bool,
    views: i64,
    pages: u32,
    chapters: u32,
    year: Option<i32>,
    authors: String,
    categories: String,
    tags: String,
    score: f64,
    votes: i64,
    uploaded: Option<String>,
    label: Option<bool>,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            id: row.get(1)?,
            cover: row.get(2)?,
            views: row.get(3)?,
            pages: row.get(4)?,
            chapters: row.get(5)?,
            year: row.get(6)?,
            authors: row.get(7)?,
            categories: row.get(8)?,
            tags: row.get(9)?,
            score: row.get(10)?,
            votes: row.get(11)?,
            uploaded: row.get(12)?,
            label: row.get(13)?,
        })
    }

    fn into_record(self) -> StorageResult<ItemRecord> {
        let corrupt = |message: String| StorageError::CorruptRow {
            name: self.name.clone(),
            message,
        };

        let unsigned = |column: &str, value: i64| {
            u64::try_from(value).map_err(|_| corrupt(format!("negative {}: {}", column, value)))
        };

        let uploaded = match &self.uploaded {
            Some(text) => Some(
                DateTime::parse_from_rfc3339(text)
                    .map_err(|e| corrupt(format!("bad upload time '{}': {}", text, e)))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(ItemRecord {
            id: unsigned("id", self.id)?,
            views: unsigned("views", self.views)?,
            votes: unsigned("votes", self.votes)?,
            cover: self.cover,
            pages: self.pages,
            chapters: self.chapters,
            year: self.year,
            authors: serde_json::from_str(&self.authors)?,
            categories: serde_json::from_str(&self.categories)?,
            tags: serde_json::from_str(&self.tags)?,
            score: self.score,
            uploaded,
            label: self.label,
            name: self.name,
        })
    }
}

fn signed(record: &ItemRecord, field: &'static str, value: u64) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| StorageError::OutOfRange {
        name: record.name.clone(),
        field,
        value,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        kind: RunKind::from_db_string(&row.get::<_, String>(1)?).unwrap_or(RunKind::Sync),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl CatalogStore for SqliteStore {
    // ===== Run Management =====

    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (kind, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, kind, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Catalog =====

    fn load_catalog(&self) -> StorageResult<Catalog> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM items", ITEM_COLUMNS))?;

        let rows = stmt.query_map([], ItemRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }

        Ok(records.into_iter().collect())
    }

    fn save_records(&mut self, records: &[ItemRecord]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO items ({}, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(name) DO UPDATE SET
                    id = excluded.id,
                    cover = excluded.cover,
                    views = excluded.views,
                    pages = excluded.pages,
                    chapters = excluded.chapters,
                    year = excluded.year,
                    authors = excluded.authors,
                    categories = excluded.categories,
                    tags = excluded.tags,
                    score = excluded.score,
                    votes = excluded.votes,
                    uploaded = excluded.uploaded,
                    label = excluded.label,
                    updated_at = excluded.updated_at",
                ITEM_COLUMNS
            ))?;

            for record in records {
                stmt.execute(params![
                    record.name,
                    signed(record, "id", record.id)?,
                    record.cover,
                    signed(record, "views", record.views)?,
                    record.pages,
                    record.chapters,
                    record.year,
                    serde_json::to_string(&record.authors)?,
                    serde_json::to_string(&record.categories)?,
                    serde_json::to_string(&record.tags)?,
                    record.score,
                    signed(record, "votes", record.votes)?,
                    record.uploaded.map(|t| t.to_rfc3339()),
                    record.label,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    // ===== Statistics =====

    fn count_items(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM items")
    }

    fn count_labelled(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM items WHERE label IS NOT NULL")
    }

    fn count_with_cover(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM items WHERE cover = 1")
    }
}
