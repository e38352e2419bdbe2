//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Shiori database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track sync and label runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per catalog record, keyed by item name
CREATE TABLE IF NOT EXISTS items (
    name TEXT PRIMARY KEY,
    id INTEGER NOT NULL,
    cover INTEGER NOT NULL DEFAULT 0,
    views INTEGER NOT NULL,
    pages INTEGER NOT NULL,
    chapters INTEGER NOT NULL,
    year INTEGER,
    authors TEXT NOT NULL,
    categories TEXT NOT NULL,
    tags TEXT NOT NULL,
    score REAL NOT NULL,
    votes INTEGER NOT NULL,
    uploaded TEXT,
    label INTEGER,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_id ON items(id);
CREATE INDEX IF NOT EXISTS idx_items_label ON items(label);
"#;

pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
