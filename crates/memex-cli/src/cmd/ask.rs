//! `mx ask`: expand on a snippet with the AI service.

use crate::output::{OutputMode, pretty_kv, render};
use clap::Args;
use memex_core::task::TaskSuccess;
use memex_core::{DocId, DocumentStore, ErrorCode, Navigator, TaskKind};
use serde::Serialize;
use std::path::Path;

use super::{LinkReport, fail, fail_code, fail_task, open_journal, orchestrator, service_client, settle_all};

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Document the snippet comes from.
    pub id: DocId,

    /// Snippet to expand on. It is linked to the reply when found.
    #[arg(long)]
    pub text: String,

    /// Prompt prefix (defaults to `ai.prompt_prefix` from the config).
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
struct AskReport {
    task: u64,
    context: DocId,
    new_id: DocId,
    title: String,
    link: LinkReport,
}

/// Execute `mx ask`: dispatch one AI task and wait for it to settle.
///
/// # Errors
///
/// Returns an error if the document does not exist, the snippet is empty,
/// or the task fails.
pub fn run_ask(args: &AskArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    if args.text.trim().is_empty() {
        return Err(fail_code(output, ErrorCode::EmptySelection, "snippet is empty"));
    }

    let journal = open_journal(output, project_root)?;
    let client = service_client(&journal.config);
    let mut orch = orchestrator(&journal.config, &client);
    let mut nav = Navigator::new(journal.store);
    nav.open(args.id).map_err(|err| fail(output, &err))?;

    let prefix = args
        .prefix
        .clone()
        .unwrap_or_else(|| orch.settings().prompt_prefix.clone());
    let prompt = format!("{prefix}{}", args.text);
    let handle = orch.dispatch_with_prompt(TaskKind::AiQuery, &args.text, prompt, Some(args.id));
    tracing::info!(task = %handle.id, doc_id = %args.id, "waiting for AI reply");

    let observer = settle_all(&mut orch, &mut nav);
    if let Some(failure) = observer.failures.first() {
        return Err(fail_task(output, failure));
    }

    let Some(TaskSuccess::Document { task, new_id, link }) = observer.successes.into_iter().next()
    else {
        return Err(fail_code(
            output,
            ErrorCode::InternalUnexpected,
            "AI task finished without a document",
        ));
    };

    let title = nav
        .store()
        .get(new_id)
        .map_err(|err| fail(output, &err))?
        .map(|doc| doc.title)
        .unwrap_or_default();

    let report = AskReport {
        task: task.get(),
        context: args.id,
        new_id,
        title,
        link: LinkReport::from(&link),
    };
    render(output, &report, |report, w| {
        if output.is_pretty() {
            writeln!(w, "✓ Stored AI reply as document {}", report.new_id)?;
            pretty_kv(w, "Title", &report.title)?;
            pretty_kv(w, "Link", report.link.describe())
        } else {
            writeln!(w, "{}\t{}", report.new_id, report.link.describe())
        }
    })
}
