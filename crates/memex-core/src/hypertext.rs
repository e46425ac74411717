//! Inline hypertext link parser.
//!
//! Document bodies carry links as literal markup:
//!
//! ```text
//! [label](doc:ID)
//! ```
//!
//! where `label` is a non-empty run of characters other than `]` and `ID` is
//! `[0-9]+`. [`parse`] splits a body into an ordered, lossless sequence of
//! [`Span`]s: concatenating every span's source text reproduces the body
//! byte-for-byte. Anything that looks like a link but does not form a full
//! match (unterminated label, empty label, non-numeric or overflowing id)
//! stays in the surrounding plain text.
//!
//! Scanning is a single left-to-right pass. Links never nest: a `[` inside a
//! label is ordinary label text, and the leftmost `[` that starts a complete
//! match wins.

use std::fmt::Write as _;
use std::ops::Range;

use serde::Serialize;

use crate::model::DocId;

const TARGET_PREFIX: &str = "](doc:";

/// A contiguous run of a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Span {
    Plain { text: String },
    Link {
        label: String,
        target: DocId,
        /// Digit count of the id as written, so `doc:007` renders back verbatim.
        #[serde(skip)]
        id_width: usize,
    },
}

impl Span {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    #[must_use]
    pub fn link(label: impl Into<String>, target: DocId) -> Self {
        Self::Link {
            label: label.into(),
            target,
            id_width: digit_count(target),
        }
    }

    /// Visible text: the plain text itself, or the link label.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } => text,
            Self::Link { label, .. } => label,
        }
    }

    /// Link target, if this span is a link.
    #[must_use]
    pub const fn target(&self) -> Option<DocId> {
        match self {
            Self::Plain { .. } => None,
            Self::Link { target, .. } => Some(*target),
        }
    }

    #[must_use]
    pub const fn is_link(&self) -> bool {
        matches!(self, Self::Link { .. })
    }

    /// Byte length of this span's source markup.
    #[must_use]
    pub fn source_len(&self) -> usize {
        match self {
            Self::Plain { text } => text.len(),
            Self::Link {
                label, id_width, ..
            } => 1 + label.len() + TARGET_PREFIX.len() + id_width + 1,
        }
    }

    fn write_source(&self, out: &mut String) {
        match self {
            Self::Plain { text } => out.push_str(text),
            Self::Link {
                label,
                target,
                id_width,
            } => {
                let _ = write!(
                    out,
                    "[{label}{TARGET_PREFIX}{:0width$})",
                    target.get(),
                    width = *id_width
                );
            }
        }
    }
}

/// A span together with its byte range in the parsed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSpan {
    pub range: Range<usize>,
    pub span: Span,
}

/// Format link markup for `label` pointing at `target`.
#[must_use]
pub fn link_markup(label: &str, target: DocId) -> String {
    format!("[{label}{TARGET_PREFIX}{target})")
}

/// Parse `body` into spans.
#[must_use]
pub fn parse(body: &str) -> Vec<Span> {
    parse_with_offsets(body)
        .into_iter()
        .map(|located| located.span)
        .collect()
}

/// Parse `body` into spans annotated with their byte ranges.
///
/// Plain spans are maximal: two plain spans are never adjacent, and an empty
/// body yields no spans.
#[must_use]
pub fn parse_with_offsets(body: &str) -> Vec<LocatedSpan> {
    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some(rel) = body[cursor..].find('[') {
        let open = cursor + rel;
        match match_link(body, open) {
            Some(found) => {
                if plain_start < open {
                    spans.push(LocatedSpan {
                        range: plain_start..open,
                        span: Span::plain(&body[plain_start..open]),
                    });
                }
                spans.push(LocatedSpan {
                    range: open..found.end,
                    span: Span::Link {
                        label: body[found.label].to_string(),
                        target: found.target,
                        id_width: found.id_width,
                    },
                });
                cursor = found.end;
                plain_start = found.end;
            }
            None => cursor = open + 1,
        }
    }

    if plain_start < body.len() {
        spans.push(LocatedSpan {
            range: plain_start..body.len(),
            span: Span::plain(&body[plain_start..]),
        });
    }

    spans
}

/// Reassemble the source markup of `spans`.
///
/// For any body `b`, `render(&parse(b)) == b`.
#[must_use]
pub fn render(spans: &[Span]) -> String {
    let mut out = String::with_capacity(spans.iter().map(Span::source_len).sum());
    for span in spans {
        span.write_source(&mut out);
    }
    out
}

/// Byte range of the first occurrence of `label` lying entirely inside plain
/// text (never inside existing link markup).
///
/// Returns `None` when `label` is empty or does not occur.
#[must_use]
pub fn locate(body: &str, label: &str) -> Option<Range<usize>> {
    locate_all(body, label).into_iter().next()
}

/// Every non-overlapping occurrence of `label` in the plain spans of `body`,
/// in order.
#[must_use]
pub fn locate_all(body: &str, label: &str) -> Vec<Range<usize>> {
    if label.is_empty() {
        return Vec::new();
    }

    parse_with_offsets(body)
        .into_iter()
        .filter(|located| !located.span.is_link())
        .flat_map(|located| {
            let base = located.range.start;
            located
                .span
                .text()
                .match_indices(label)
                .map(move |(offset, _)| base + offset..base + offset + label.len())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Outgoing links of `body` as `(label, target)` pairs, in order.
pub fn links(body: &str) -> impl Iterator<Item = (String, DocId)> {
    parse(body).into_iter().filter_map(|span| match span {
        Span::Link { label, target, .. } => Some((label, target)),
        Span::Plain { .. } => None,
    })
}

struct LinkMatch {
    label: Range<usize>,
    target: DocId,
    id_width: usize,
    end: usize,
}

fn digit_count(id: DocId) -> usize {
    id.get().checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// Try to match `[label](doc:ID)` starting at byte `open` (which holds `[`).
fn match_link(body: &str, open: usize) -> Option<LinkMatch> {
    let label_start = open + 1;
    let label_end = label_start + body[label_start..].find(']')?;
    if label_end == label_start {
        return None;
    }

    let rest = body[label_end..].strip_prefix(TARGET_PREFIX)?;
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    let target = DocId::from_digits(&rest[..digits_len])?;
    if rest.as_bytes().get(digits_len) != Some(&b')') {
        return None;
    }

    Some(LinkMatch {
        label: label_start..label_end,
        target,
        id_width: digits_len,
        end: label_end + TARGET_PREFIX.len() + digits_len + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> DocId {
        DocId::new(raw)
    }

    #[test]
    fn empty_body_has_no_spans() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn plain_body_is_one_span() {
        assert_eq!(parse("just words"), vec![Span::plain("just words")]);
    }

    #[test]
    fn link_between_plain_text() {
        assert_eq!(
            parse("See [this idea](doc:42) later"),
            vec![
                Span::plain("See "),
                Span::link("this idea", id(42)),
                Span::plain(" later"),
            ]
        );
    }

    #[test]
    fn adjacent_links_produce_no_empty_plain_spans() {
        assert_eq!(
            parse("[a](doc:1)[b](doc:2)"),
            vec![Span::link("a", id(1)), Span::link("b", id(2))]
        );
    }

    #[test]
    fn non_numeric_id_degrades_to_plain() {
        let body = "[broken(doc:x)";
        assert_eq!(parse(body), vec![Span::plain(body)]);
    }

    #[test]
    fn malformed_candidates_degrade_to_plain() {
        for body in [
            "[label](doc:)",
            "[label](doc:12",
            "[label](doc:1a)",
            "[label] (doc:1)",
            "[](doc:3)",
            "[unterminated",
            "[label](doc:99999999999999999999)",
            "[label](DOC:1)",
        ] {
            assert_eq!(parse(body), vec![Span::plain(body)], "body: {body}");
        }
    }

    #[test]
    fn bracket_inside_label_is_literal() {
        assert_eq!(
            parse("[a [b](doc:1)"),
            vec![Span::link("a [b", id(1))]
        );
    }

    #[test]
    fn failed_candidate_resumes_at_next_bracket() {
        assert_eq!(
            parse("[x] and [y](doc:7)"),
            vec![Span::plain("[x] and "), Span::link("y", id(7))]
        );
    }

    #[test]
    fn label_may_span_lines() {
        assert_eq!(
            parse("[two\nlines](doc:5)"),
            vec![Span::link("two\nlines", id(5))]
        );
    }

    #[test]
    fn offsets_cover_body_exactly() {
        let body = "héllo [wörld](doc:3) ✓";
        let spans = parse_with_offsets(body);
        let mut expected_start = 0;
        for located in &spans {
            assert_eq!(located.range.start, expected_start);
            assert_eq!(located.range.len(), located.span.source_len());
            expected_start = located.range.end;
        }
        assert_eq!(expected_start, body.len());
    }

    #[test]
    fn render_reconstructs_body() {
        let body = "a [b](doc:1) [c] [d](doc:x) [e](doc:0007)";
        let spans = parse(body);
        assert_eq!(render(&spans), body);
        assert_eq!(parse(&render(&spans)), spans);
    }

    #[test]
    fn leading_zeros_keep_their_width() {
        let spans = parse("[e](doc:007)");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].target(), Some(id(7)));
        assert_eq!(spans[0].source_len(), "[e](doc:007)".len());
        assert_ne!(spans[0], Span::link("e", id(7)));
    }

    #[test]
    fn locate_finds_first_plain_occurrence() {
        assert_eq!(locate("See this idea", "this idea"), Some(4..13));
    }

    #[test]
    fn locate_skips_text_inside_links() {
        let body = "[idea](doc:1) and idea";
        let range = locate(body, "idea").expect("found in plain text");
        assert_eq!(&body[range.clone()], "idea");
        assert_eq!(range.start, 18);
    }

    #[test]
    fn locate_all_lists_plain_occurrences_only() {
        let body = "idea [idea](doc:1) idea";
        assert_eq!(locate_all(body, "idea"), vec![0..4, 19..23]);
        assert!(locate_all(body, "").is_empty());
    }

    #[test]
    fn locate_misses_when_only_linked() {
        assert_eq!(locate("[idea](doc:1)", "idea"), None);
        assert_eq!(locate("nothing here", "idea"), None);
        assert_eq!(locate("anything", ""), None);
    }

    #[test]
    fn links_lists_outgoing_targets() {
        let found: Vec<_> = links("[a](doc:1) x [b](doc:2)").collect();
        assert_eq!(
            found,
            vec![("a".to_string(), id(1)), ("b".to_string(), id(2))]
        );
    }

    #[test]
    fn link_markup_matches_parser() {
        let markup = link_markup("this idea", id(42));
        assert_eq!(markup, "[this idea](doc:42)");
        assert_eq!(parse(&markup), vec![Span::link("this idea", id(42))]);
    }
}
