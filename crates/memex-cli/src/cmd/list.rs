//! `mx list`: the document index.

use crate::output::{OutputMode, pretty_rule, render_mode};
use clap::Args;
use memex_core::{DocumentStore, DocumentSummary};
use std::io::Write;
use std::path::Path;

use super::{fail, open_journal};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum documents to show.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Execute `mx list`.
///
/// # Errors
///
/// Returns an error if the journal cannot be opened or read.
pub fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let journal = open_journal(output, project_root)?;
    let mut index = journal
        .store
        .list_index()
        .map_err(|err| fail(output, &err))?;
    if let Some(limit) = args.limit {
        index.truncate(limit);
    }

    render_mode(
        output,
        &index,
        |index, w| {
            for doc in index {
                writeln!(w, "{}\t{}\t{}", doc.id, doc.title, doc.description)?;
            }
            Ok(())
        },
        |index, w| render_pretty(index, w),
    )
}

fn render_pretty(index: &[DocumentSummary], w: &mut dyn Write) -> std::io::Result<()> {
    if index.is_empty() {
        writeln!(w, "No documents yet.")?;
        return writeln!(w, "Create one with `mx new --title <title> --body <text>`.");
    }

    writeln!(w, "{:>6}  {:<28}  DESCRIPTION", "ID", "TITLE")?;
    pretty_rule(w)?;
    for doc in index {
        writeln!(
            w,
            "{:>6}  {:<28}  {}",
            doc.id,
            truncate(&doc.title, 28),
            truncate(&doc.description, 34)
        )?;
    }
    pretty_rule(w)?;
    writeln!(w, "{} document(s)", index.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memex_core::DocId;

    #[test]
    fn list_args_defaults() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ListArgs,
        }
        let w = Wrapper::parse_from(["test"]);
        assert!(w.args.limit.is_none());
        let w = Wrapper::parse_from(["test", "-n", "3"]);
        assert_eq!(w.args.limit, Some(3));
    }

    #[test]
    fn truncate_marks_cut_titles() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn pretty_listing_has_header_and_count() {
        let index = vec![DocumentSummary {
            id: DocId::new(1),
            title: "Felines".to_string(),
            description: "cats are great".to_string(),
        }];
        let mut buf = Vec::new();
        render_pretty(&index, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("    ID  TITLE"));
        assert!(text.contains("Felines"));
        assert!(text.ends_with("1 document(s)\n"));
    }
}
