//! Canonical SQLite schema for the journal.
//!
//! - `documents` holds every document; `id` is the stable [`crate::model::DocId`]
//! - `journal_meta` tracks the schema version alongside `PRAGMA user_version`

/// Migration v1: documents table plus journal metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (id >= 0)
);

CREATE TABLE IF NOT EXISTS journal_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO journal_meta (id, schema_version, created_at_us)
VALUES (1, 1, 0);
";

/// Migration v2: listing index.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_documents_updated
    ON documents(updated_at_us DESC);
";

/// Indexes expected after all migrations have run.
pub const REQUIRED_INDEXES: &[&str] = &["idx_documents_updated"];
