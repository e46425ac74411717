//! `mx image`: generate an image and save it as PNG.

use crate::output::{OutputMode, pretty_kv, render};
use clap::Args;
use memex_core::task::TaskSuccess;
use memex_core::{DocId, ErrorCode, MemexError, Navigator, TaskKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{fail, fail_code, fail_task, open_journal, orchestrator, service_client, settle_all};

#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Document the prompt belongs to (names the default output file).
    pub id: Option<DocId>,

    /// Image prompt.
    #[arg(long)]
    pub text: String,

    /// Destination PNG file (defaults to `doc_<id>_image.png`).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ImageReport {
    task: u64,
    path: String,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
}

/// Execute `mx image`.
///
/// # Errors
///
/// Returns an error if the prompt is empty, the document does not exist,
/// generation fails, or the file cannot be written.
pub fn run_image(args: &ImageArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    if args.text.trim().is_empty() {
        return Err(fail_code(output, ErrorCode::EmptySelection, "image prompt is empty"));
    }

    let journal = open_journal(output, project_root)?;
    let client = service_client(&journal.config);
    let mut orch = orchestrator(&journal.config, &client);
    let mut nav = Navigator::new(journal.store);
    if let Some(id) = args.id {
        nav.open(id).map_err(|err| fail(output, &err))?;
    }

    orch.dispatch(TaskKind::ImageGeneration, &args.text, args.id);
    let observer = settle_all(&mut orch, &mut nav);
    if let Some(failure) = observer.failures.first() {
        return Err(fail_task(output, failure));
    }

    let Some(TaskSuccess::Image { task, image, .. }) = observer.successes.into_iter().next() else {
        return Err(fail_code(
            output,
            ErrorCode::InternalUnexpected,
            "image task finished without an image",
        ));
    };

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(image.default_file_name()));
    image.save(&path).map_err(|source| {
        fail(
            output,
            &MemexError::Export {
                path: path.display().to_string(),
                source,
            },
        )
    })?;

    let dimensions = image.png_dimensions();
    let report = ImageReport {
        task: task.get(),
        path: path.display().to_string(),
        bytes: image.bytes.len(),
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
    };
    render(output, &report, |report, w| {
        if output.is_pretty() {
            writeln!(w, "✓ Saved image to {}", report.path)?;
            if let (Some(width), Some(height)) = (report.width, report.height) {
                pretty_kv(w, "Size", format!("{width}x{height}"))?;
            }
            pretty_kv(w, "Bytes", report.bytes.to_string())
        } else {
            writeln!(w, "{}", report.path)
        }
    })
}
