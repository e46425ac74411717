//! `mx export`: write a document body to a file or stdout.

use crate::output::{OutputMode, render};
use clap::Args;
use memex_core::transfer;
use memex_core::{DocId, DocumentStore, MemexError};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{fail, open_journal};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Document to export.
    pub id: DocId,

    /// Destination file. The body goes to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ExportReport {
    id: DocId,
    path: String,
}

#[derive(Debug, Serialize)]
struct ExportBody {
    id: DocId,
    title: String,
    body: String,
}

/// Execute `mx export <id>`.
///
/// # Errors
///
/// Returns an error if the document does not exist or the file cannot be
/// written.
pub fn run_export(args: &ExportArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let journal = open_journal(output, project_root)?;

    if let Some(path) = &args.output {
        transfer::export_file(&journal.store, args.id, path).map_err(|err| fail(output, &err))?;
        let report = ExportReport {
            id: args.id,
            path: path.display().to_string(),
        };
        return render(output, &report, |report, w| {
            if output.is_pretty() {
                writeln!(w, "✓ Exported document {} to {}", report.id, report.path)
            } else {
                writeln!(w, "{}", report.path)
            }
        });
    }

    let doc = journal
        .store
        .get(args.id)
        .map_err(|err| fail(output, &err))?
        .ok_or_else(|| fail(output, &MemexError::DocumentNotFound(args.id)))?;
    let body = ExportBody {
        id: doc.id,
        title: doc.title,
        body: doc.body,
    };
    // Human modes print the body verbatim so it can be piped.
    render(output, &body, |body, w| write!(w, "{}", body.body))
}
