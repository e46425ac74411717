//! `mx link`: turn text in a document into a link.

use crate::output::{OutputMode, render};
use clap::Args;
use memex_core::{DocId, DocumentStore, MemexError, Navigator};
use serde::Serialize;
use std::path::Path;

use super::{LinkReport, fail, open_journal};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Document to edit.
    pub id: DocId,

    /// Text to turn into a link (first plain-text occurrence).
    #[arg(long)]
    pub text: String,

    /// Document the new link points at.
    #[arg(long)]
    pub target: DocId,
}

#[derive(Debug, Serialize)]
struct LinkOutcome {
    id: DocId,
    target: DocId,
    text: String,
    #[serde(flatten)]
    link: LinkReport,
}

/// Execute `mx link`. A missing snippet is reported, not an error.
///
/// # Errors
///
/// Returns an error if either document does not exist or the store write
/// fails.
pub fn run_link(args: &LinkArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let journal = open_journal(output, project_root)?;
    let mut nav = Navigator::new(journal.store);

    let target_exists = nav
        .store()
        .get(args.target)
        .map_err(|err| fail(output, &err))?
        .is_some();
    if !target_exists {
        return Err(fail(output, &MemexError::DocumentNotFound(args.target)));
    }

    nav.open(args.id).map_err(|err| fail(output, &err))?;
    let insertion = nav
        .insert_link(&args.text, args.target)
        .map_err(|err| fail(output, &err))?;

    let outcome = LinkOutcome {
        id: args.id,
        target: args.target,
        text: args.text.clone(),
        link: LinkReport::from(&insertion),
    };
    render(output, &outcome, |outcome, w| match outcome.link {
        LinkReport::Inserted { .. } => writeln!(
            w,
            "✓ Linked \"{}\" in document {} to document {}",
            outcome.text, outcome.id, outcome.target
        ),
        LinkReport::Skipped { .. } => writeln!(w, "{}", outcome.link.describe()),
    })
}
