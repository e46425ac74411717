//! memex-core library.
//!
//! A journal of plain-text documents joined by inline `[label](doc:ID)`
//! links, browsed one document at a time with a back-history, and grown by
//! background AI and image tasks.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::MemexError`] at the public seams, `anyhow`
//!   with `.context(..)` inside the SQLite layer and config loading.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).

pub mod config;
pub mod db;
pub mod error;
pub mod hypertext;
pub mod model;
pub mod nav;
pub mod service;
pub mod store;
pub mod task;
pub mod transfer;

pub use db::SqliteStore;
pub use error::{ErrorCode, MemexError};
pub use model::{DocId, Document, DocumentSummary};
pub use nav::{BackOutcome, LinkInsertion, NavState, Navigator, OpenOutcome, SkipReason};
pub use store::{DocumentStore, MemoryStore};
pub use task::{Orchestrator, TaskFailure, TaskKind, TaskObserver, TaskSuccess};
