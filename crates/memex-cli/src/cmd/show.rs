//! `mx show`: display one document with its outgoing links.

use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use clap::Args;
use memex_core::hypertext;
use memex_core::{DocId, Document, DocumentStore, MemexError};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::{fail, micros_to_local_datetime, open_journal};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Document ID to display.
    pub id: DocId,
}

/// Full document detail as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct ShowDocument {
    pub id: DocId,
    pub title: String,
    pub description: String,
    pub body: String,
    pub links: Vec<ShowLink>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

#[derive(Debug, Serialize)]
pub struct ShowLink {
    pub label: String,
    pub target: DocId,
}

impl From<Document> for ShowDocument {
    fn from(doc: Document) -> Self {
        let links = hypertext::links(&doc.body)
            .map(|(label, target)| ShowLink { label, target })
            .collect();
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            body: doc.body,
            links,
            created_at_us: doc.created_at_us,
            updated_at_us: doc.updated_at_us,
        }
    }
}

/// Execute `mx show <id>`.
///
/// # Errors
///
/// Returns an error if the journal cannot be opened or the document does
/// not exist.
pub fn run_show(args: &ShowArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let journal = open_journal(output, project_root)?;
    let doc = journal
        .store
        .get(args.id)
        .map_err(|err| fail(output, &err))?
        .ok_or_else(|| fail(output, &MemexError::DocumentNotFound(args.id)))?;

    let detail = ShowDocument::from(doc);
    render_mode(output, &detail, render_text, render_pretty)
}

fn render_text(doc: &ShowDocument, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "{}\t{}", doc.id, doc.title)?;
    writeln!(w)?;
    writeln!(w, "{}", doc.body)?;
    for link in &doc.links {
        writeln!(w, "link\t{}\t{}", link.target, link.label)?;
    }
    Ok(())
}

fn render_pretty(doc: &ShowDocument, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("{} · {}", doc.id, doc.title))?;
    pretty_kv(w, "Created", micros_to_local_datetime(doc.created_at_us))?;
    pretty_kv(w, "Updated", micros_to_local_datetime(doc.updated_at_us))?;
    writeln!(w)?;
    writeln!(w, "{}", doc.body)?;

    if !doc.links.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Links")?;
        for link in &doc.links {
            writeln!(w, "  [{}] → {}", link.label, link.target)?;
        }
    }
    pretty_rule(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ShowDocument {
        ShowDocument::from(Document {
            id: DocId::new(1),
            title: "Felines".to_string(),
            description: "cats are [great](doc:2)".to_string(),
            body: "cats are [great](doc:2) and [sleepy](doc:3)".to_string(),
            created_at_us: 0,
            updated_at_us: 0,
        })
    }

    #[test]
    fn outgoing_links_in_body_order() {
        let doc = sample();
        let labels: Vec<_> = doc.links.iter().map(|l| (l.label.as_str(), l.target.get())).collect();
        assert_eq!(labels, vec![("great", 2), ("sleepy", 3)]);
    }

    #[test]
    fn text_rendering_lists_links() {
        let mut buf = Vec::new();
        render_text(&sample(), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("1\tFelines\n\ncats are"));
        assert!(text.contains("link\t2\tgreat\n"));
        assert!(text.contains("link\t3\tsleepy\n"));
    }

    #[test]
    fn json_shape() {
        let value = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(value["id"], 1);
        assert_eq!(value["links"][1]["target"], 3);
        assert_eq!(value["links"][1]["label"], "sleepy");
    }
}
