use std::collections::BTreeMap;

use super::{DocumentStore, StoreResult, now_us};
use crate::error::MemexError;
use crate::model::{DocId, Document, DocumentSummary, describe};

/// In-process document store keyed by ascending ID.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: BTreeMap<DocId, Document>,
    next_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Build a store pre-populated with `(title, body)` pairs, IDs from 1.
    #[must_use]
    pub fn with_documents<'a>(docs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut store = Self::new();
        for (title, body) in docs {
            store.insert(title, body);
        }
        store
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn insert(&mut self, title: &str, body: &str) -> DocId {
        let id = DocId::new(self.next_id.max(1));
        self.next_id = id.get() + 1;
        let ts = now_us();
        self.docs.insert(
            id,
            Document {
                id,
                title: title.to_string(),
                description: describe(body),
                body: body.to_string(),
                created_at_us: ts,
                updated_at_us: ts,
            },
        );
        id
    }
}

impl DocumentStore for MemoryStore {
    fn list_index(&self) -> StoreResult<Vec<DocumentSummary>> {
        Ok(self.docs.values().map(Document::summary).collect())
    }

    fn get(&self, id: DocId) -> StoreResult<Option<Document>> {
        Ok(self.docs.get(&id).cloned())
    }

    fn create(&mut self, title: &str, body: &str) -> StoreResult<DocId> {
        Ok(self.insert(title, body))
    }

    fn update(&mut self, id: DocId, body: &str) -> StoreResult<()> {
        let doc = self
            .docs
            .get_mut(&id)
            .ok_or(MemexError::DocumentNotFound(id))?;
        doc.body = body.to_string();
        doc.description = describe(body);
        doc.updated_at_us = now_us();
        Ok(())
    }
}
