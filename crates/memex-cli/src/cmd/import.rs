//! `mx import`: import a text file as a new document.

use crate::output::{OutputMode, render};
use clap::Args;
use memex_core::DocId;
use memex_core::transfer;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{fail, open_journal};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Text file to import. Its file name becomes the title.
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct ImportReport {
    id: DocId,
    path: String,
}

/// Execute `mx import <file>`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the document cannot be
/// stored.
pub fn run_import(args: &ImportArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut journal = open_journal(output, project_root)?;
    let id = transfer::import_file(&mut journal.store, &args.file).map_err(|err| fail(output, &err))?;

    let report = ImportReport {
        id,
        path: args.file.display().to_string(),
    };
    render(output, &report, |report, w| {
        if output.is_pretty() {
            writeln!(w, "✓ Imported {} as document {}", report.path, report.id)
        } else {
            writeln!(w, "{}", report.id)
        }
    })
}
