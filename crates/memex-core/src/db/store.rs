use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

use super::{migrations, open_journal};
use crate::error::MemexError;
use crate::model::{DocId, Document, DocumentSummary, describe};
use crate::store::{DocumentStore, StoreResult, now_us};

/// [`DocumentStore`] backed by the journal SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create and migrate) the journal at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = open_journal(path)?;
        tracing::debug!(path = %path.display(), "opened journal store");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Fresh, migrated in-memory journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema migration fails.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let mut conn = Connection::open_in_memory().context("open in-memory journal")?;
        migrations::migrate(&mut conn).context("apply journal migrations")?;
        Ok(Self { conn, path: None })
    }

    /// Database file path, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .context("count documents")
            .map_err(MemexError::Store)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        body: row.get(3)?,
        created_at_us: row.get(4)?,
        updated_at_us: row.get(5)?,
    })
}

impl DocumentStore for SqliteStore {
    fn list_index(&self) -> StoreResult<Vec<DocumentSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, description FROM documents ORDER BY id ASC")
            .context("prepare list_index query")
            .map_err(MemexError::Store)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(DocumentSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                })
            })
            .context("run list_index query")
            .map_err(MemexError::Store)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("read list_index rows")
            .map_err(MemexError::Store)
    }

    fn get(&self, id: DocId) -> StoreResult<Option<Document>> {
        self.conn
            .query_row(
                "SELECT id, title, description, body, created_at_us, updated_at_us \
                 FROM documents WHERE id = ?1",
                params![id],
                row_to_document,
            )
            .optional()
            .with_context(|| format!("get document {id}"))
            .map_err(MemexError::Store)
    }

    fn create(&mut self, title: &str, body: &str) -> StoreResult<DocId> {
        let ts = now_us();
        self.conn
            .execute(
                "INSERT INTO documents (title, description, body, created_at_us, updated_at_us) \
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![title, describe(body), body, ts],
            )
            .context("insert document")
            .map_err(MemexError::Store)?;

        let raw = self.conn.last_insert_rowid();
        let id = u64::try_from(raw)
            .map(DocId::new)
            .map_err(|_| MemexError::store(anyhow::anyhow!("negative rowid {raw}")))?;
        tracing::debug!(doc_id = %id, title, "created document");
        Ok(id)
    }

    fn update(&mut self, id: DocId, body: &str) -> StoreResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE documents SET body = ?2, description = ?3, updated_at_us = ?4 \
                 WHERE id = ?1",
                params![id, body, describe(body), now_us()],
            )
            .with_context(|| format!("update document {id}"))
            .map_err(MemexError::Store)?;

        if changed == 0 {
            return Err(MemexError::DocumentNotFound(id));
        }
        tracing::debug!(doc_id = %id, bytes = body.len(), "updated document body");
        Ok(())
    }
}
