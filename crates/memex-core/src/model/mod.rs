//! Document value types shared by the store, the navigator and the UI.

pub mod document;

pub use document::{DocId, Document, DocumentSummary, InvalidDocId, describe};
