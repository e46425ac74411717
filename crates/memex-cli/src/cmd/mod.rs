//! `mx` subcommand handlers and the plumbing they share.

pub mod ask;
pub mod completions;
pub mod export;
pub mod image;
pub mod import;
pub mod init;
pub mod link;
pub mod list;
pub mod new;
pub mod show;

use crate::output::{CliError, OutputMode, render_error};
use anyhow::Context as _;
use chrono::{DateTime, Local, Utc};
use memex_core::config::{self, EffectiveConfig, MEMEX_DIR};
use memex_core::service::openai::OpenAiClient;
use memex_core::service::{Completion, ImageSynthesis};
use memex_core::task::{CollectingObserver, TaskFailure, TaskSettings};
use memex_core::{
    DocumentStore, ErrorCode, LinkInsertion, MemexError, Navigator, Orchestrator, SqliteStore,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// An opened journal: resolved config plus the document database.
pub struct Journal {
    pub config: EffectiveConfig,
    pub store: SqliteStore,
}

/// Open the journal under `project_root`, rendering a structured error when
/// it is missing or its config is broken.
///
/// # Errors
///
/// Returns an error if `.memex/` does not exist, the config cannot be
/// parsed, or the database cannot be opened.
pub fn open_journal(output: OutputMode, project_root: &Path) -> anyhow::Result<Journal> {
    if !project_root.join(MEMEX_DIR).is_dir() {
        return Err(fail_code(
            output,
            ErrorCode::NotInitialized,
            format!("no journal found in {}", project_root.display()),
        ));
    }

    let config = config::resolve_config(project_root).map_err(|err| fail(output, &err))?;

    let store_path = config.project.store_path(project_root);
    let store = SqliteStore::open(&store_path).with_context(|| {
        format!("Failed to open document store: {}", store_path.display())
    });
    match store {
        Ok(store) => Ok(Journal { config, store }),
        Err(err) => Err(fail(output, &MemexError::Store(err))),
    }
}

/// Render `err` to stderr and turn it into the handler's error value.
pub fn fail(output: OutputMode, err: &MemexError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(err)) {
        return render_err;
    }
    anyhow::anyhow!("{err}")
}

/// Like [`fail`], for conditions that have a code but no [`MemexError`].
pub fn fail_code(output: OutputMode, code: ErrorCode, message: impl Into<String>) -> anyhow::Error {
    let message = message.into();
    let cli_error = CliError::with_details(
        message.clone(),
        code.hint().unwrap_or(code.message()),
        code.code(),
    );
    if let Err(render_err) = render_error(output, &cli_error) {
        return render_err;
    }
    anyhow::anyhow!(message)
}

/// Render a failed background task.
pub fn fail_task(output: OutputMode, failure: &TaskFailure) -> anyhow::Error {
    fail_code(output, failure.code, failure.to_string())
}

/// Service client configured from the journal, shared by both task kinds.
pub fn service_client(config: &EffectiveConfig) -> Arc<OpenAiClient> {
    Arc::new(OpenAiClient::new(
        config.project.ai.clone(),
        config.project.image.clone(),
        config.api_key(),
    ))
}

/// Orchestrator wired to `client` for both AI and image tasks.
pub fn orchestrator(config: &EffectiveConfig, client: &Arc<OpenAiClient>) -> Orchestrator {
    let completion: Arc<dyn Completion> = Arc::<OpenAiClient>::clone(client);
    let images: Arc<dyn ImageSynthesis> = Arc::<OpenAiClient>::clone(client);
    Orchestrator::new(completion, images, TaskSettings::from(&config.project.ai))
}

/// Block until every dispatched task has been delivered.
pub fn settle_all<S: DocumentStore>(
    orch: &mut Orchestrator,
    nav: &mut Navigator<S>,
) -> CollectingObserver {
    let mut observer = CollectingObserver::default();
    while orch.pending_count() > 0 {
        orch.wait_and_deliver(Duration::from_millis(250), nav, &mut observer);
    }
    observer
}

/// Link outcome as reported by `link` and `ask`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LinkReport {
    Inserted { doc_id: u64, start: usize, end: usize },
    Skipped { reason: String },
}

impl From<&LinkInsertion> for LinkReport {
    fn from(link: &LinkInsertion) -> Self {
        match link {
            LinkInsertion::Inserted { doc_id, range } => Self::Inserted {
                doc_id: doc_id.get(),
                start: range.start,
                end: range.end,
            },
            LinkInsertion::Skipped(reason) => Self::Skipped {
                reason: reason.to_string(),
            },
        }
    }
}

impl LinkReport {
    pub fn describe(&self) -> String {
        match self {
            Self::Inserted { doc_id, .. } => format!("linked in document {doc_id}"),
            Self::Skipped { reason } => format!("link skipped: {reason}"),
        }
    }
}

pub fn micros_to_local_datetime(us: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(us)
        .map(|ts| {
            ts.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| us.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memex_core::{DocId, SkipReason};

    #[test]
    fn link_report_from_insertion() {
        let inserted = LinkInsertion::Inserted {
            doc_id: DocId::new(4),
            range: 5..20,
        };
        assert_eq!(
            LinkReport::from(&inserted),
            LinkReport::Inserted {
                doc_id: 4,
                start: 5,
                end: 20
            }
        );

        let skipped = LinkReport::from(&LinkInsertion::Skipped(SkipReason::TextNotFound));
        assert_eq!(
            skipped.describe(),
            "link skipped: text not found outside existing links"
        );
    }

    #[test]
    fn link_report_json_is_tagged() {
        let report = LinkReport::Skipped {
            reason: "no document is open".to_string(),
        };
        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["reason"], "no document is open");
    }

    #[test]
    fn datetime_falls_back_to_raw_micros() {
        assert_eq!(micros_to_local_datetime(i64::MAX), i64::MAX.to_string());
        assert_eq!(micros_to_local_datetime(0).len(), "1970-01-01 00:00:00".len());
    }
}
