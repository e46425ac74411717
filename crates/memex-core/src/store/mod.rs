//! Document store interface.
//!
//! The navigator and the task orchestrator only see [`DocumentStore`]. Two
//! implementations ship with the crate:
//!
//! - [`crate::db::SqliteStore`]: the on-disk journal (`.memex/documents.sqlite3`)
//! - [`MemoryStore`]: an in-process map used by tests and demos
//!
//! Implementations must give read-your-writes consistency to the calling
//! process: a `get` after `create`/`update` observes the write.

mod memory;

pub use memory::MemoryStore;

use crate::error::MemexError;
use crate::model::{DocId, Document, DocumentSummary};

pub type StoreResult<T> = Result<T, MemexError>;

pub trait DocumentStore {
    /// All documents, ordered by ascending ID.
    ///
    /// # Errors
    ///
    /// Returns [`MemexError::Store`] if the backing storage cannot be read.
    fn list_index(&self) -> StoreResult<Vec<DocumentSummary>>;

    /// Fetch one document. `Ok(None)` when the ID is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`MemexError::Store`] if the backing storage cannot be read.
    fn get(&self, id: DocId) -> StoreResult<Option<Document>>;

    /// Persist a new document and return its freshly assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`MemexError::Store`] if the write fails.
    fn create(&mut self, title: &str, body: &str) -> StoreResult<DocId>;

    /// Replace the body of an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`MemexError::DocumentNotFound`] for an unknown ID, or
    /// [`MemexError::Store`] if the write fails.
    fn update(&mut self, id: DocId, body: &str) -> StoreResult<()>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Box<S> {
    fn list_index(&self) -> StoreResult<Vec<DocumentSummary>> {
        (**self).list_index()
    }

    fn get(&self, id: DocId) -> StoreResult<Option<Document>> {
        (**self).get(id)
    }

    fn create(&mut self, title: &str, body: &str) -> StoreResult<DocId> {
        (**self).create(title, body)
    }

    fn update(&mut self, id: DocId, body: &str) -> StoreResult<()> {
        (**self).update(id, body)
    }
}

/// Current wall clock in microseconds since the UNIX epoch.
pub(crate) fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}
