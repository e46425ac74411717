//! `mx new`: create a document.

use crate::output::{OutputMode, render};
use anyhow::Context as _;
use clap::{ArgGroup, Args};
use memex_core::{DocId, DocumentStore};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{fail, open_journal};

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("content").required(true).args(["body", "file"])))]
pub struct NewArgs {
    /// Document title.
    #[arg(long)]
    pub title: String,

    /// Document body, as inline text.
    #[arg(long)]
    pub body: Option<String>,

    /// Read the body from a UTF-8 file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct NewReport {
    id: DocId,
    title: String,
}

/// Execute `mx new`.
///
/// # Errors
///
/// Returns an error if the body file cannot be read or the document cannot
/// be stored.
pub fn run_new(args: &NewArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let body = match (&args.body, &args.file) {
        (Some(body), _) => body.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => String::new(),
    };

    let mut journal = open_journal(output, project_root)?;
    let id = journal
        .store
        .create(&args.title, &body)
        .map_err(|err| fail(output, &err))?;

    let report = NewReport {
        id,
        title: args.title.clone(),
    };
    render(output, &report, |report, w| {
        if output.is_pretty() {
            writeln!(w, "✓ Created document {}: {}", report.id, report.title)
        } else {
            writeln!(w, "{}", report.id)
        }
    })
}
