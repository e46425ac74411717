//! Navigation controller: the current document, its parsed view, and the
//! back-history stack.
//!
//! ```text
//! NoDocument  --open(a)-->           Viewing(a)
//! Viewing(a)  --open(b), b != a-->   Viewing(b)   history.push(a)
//! Viewing(a)  --open(a)-->           Viewing(a)   view refreshed, history untouched
//! Viewing(a)  --back, non-empty-->   Viewing(top) history.pop()
//! Viewing(a)  --back, empty-->       Viewing(a)   BackOutcome::NoHistory
//! ```
//!
//! Every transition fetches before it mutates: a missing document leaves the
//! state exactly as it was.

use std::fmt;
use std::ops::Range;

use crate::error::MemexError;
use crate::hypertext::{self, Span};
use crate::model::{DocId, Document, describe};
use crate::service::GeneratedImage;
use crate::store::{DocumentStore, StoreResult, now_us};

/// What the presentation layer renders for the current document.
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub document: Document,
    pub spans: Vec<Span>,
    /// Ephemeral generated image; never persisted.
    pub image: Option<GeneratedImage>,
}

impl DocumentView {
    fn new(document: Document) -> Self {
        let spans = hypertext::parse(&document.body);
        Self {
            document,
            spans,
            image: None,
        }
    }

    fn refresh(&mut self, document: Document) {
        self.spans = hypertext::parse(&document.body);
        self.document = document;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    NoDocument,
    Viewing(DocId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A different document is now current.
    Opened,
    /// The current document was re-read from the store.
    Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    Returned(DocId),
    NoHistory,
}

/// Why a link insertion did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCurrentDocument,
    TextNotFound,
    /// The text contains `]` and cannot be a link label.
    UnlinkableText,
    /// Every plain occurrence sits after an unmatched `[` that would take the
    /// new link markup into a longer label.
    AbsorbedByBracket,
    /// The user navigated away from the document the request was made in.
    ContextChanged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoCurrentDocument => "no document is open",
            Self::TextNotFound => "text not found outside existing links",
            Self::UnlinkableText => "text containing ']' cannot become a link",
            Self::AbsorbedByBracket => "an unmatched '[' before the text would absorb the link",
            Self::ContextChanged => "the originating document is no longer open",
        };
        f.write_str(text)
    }
}

/// Result of [`Navigator::insert_link`]. A skip is a reportable no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkInsertion {
    Inserted {
        doc_id: DocId,
        /// Byte range of the new link markup in the updated body.
        range: Range<usize>,
    },
    Skipped(SkipReason),
}

impl LinkInsertion {
    #[must_use]
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted { .. })
    }
}

pub struct Navigator<S> {
    store: S,
    current: Option<DocumentView>,
    history: Vec<DocId>,
}

impl<S: DocumentStore> Navigator<S> {
    pub const fn new(store: S) -> Self {
        Self {
            store,
            current: None,
            history: Vec::new(),
        }
    }

    fn fetch(&self, id: DocId) -> StoreResult<Document> {
        self.store.get(id)?.ok_or(MemexError::DocumentNotFound(id))
    }

    /// Make `id` the current document.
    ///
    /// # Errors
    ///
    /// [`MemexError::DocumentNotFound`] if the store has no such document, or
    /// a store error. The navigation state is unchanged on error.
    pub fn open(&mut self, id: DocId) -> StoreResult<OpenOutcome> {
        let document = self.fetch(id)?;

        match self.current.as_mut() {
            Some(view) if view.document.id == id => {
                view.refresh(document);
                tracing::debug!(doc_id = %id, "refreshed current document");
                Ok(OpenOutcome::Refreshed)
            }
            Some(view) => {
                let left = view.document.id;
                self.history.push(left);
                *view = DocumentView::new(document);
                tracing::debug!(doc_id = %id, from = %left, depth = self.history.len(), "opened document");
                Ok(OpenOutcome::Opened)
            }
            None => {
                self.current = Some(DocumentView::new(document));
                tracing::debug!(doc_id = %id, "opened first document");
                Ok(OpenOutcome::Opened)
            }
        }
    }

    /// Return to the most recent history entry without recording the one
    /// being left.
    ///
    /// # Errors
    ///
    /// [`MemexError::DocumentNotFound`] if the history target has vanished
    /// from the store; history and view are left untouched.
    pub fn back(&mut self) -> StoreResult<BackOutcome> {
        let Some(&target) = self.history.last() else {
            tracing::debug!("back with empty history");
            return Ok(BackOutcome::NoHistory);
        };

        let document = self.fetch(target)?;
        self.history.pop();
        self.current = Some(DocumentView::new(document));
        tracing::debug!(doc_id = %target, depth = self.history.len(), "went back");
        Ok(BackOutcome::Returned(target))
    }

    /// Turn the first plain-text occurrence of `original_text` in the current
    /// body into a link to `new_id`, persist it, and re-parse.
    ///
    /// An occurrence is only used if the rewritten body parses back with
    /// exactly `[original_text](doc:new_id)` at that position; otherwise the
    /// next plain occurrence is tried.
    ///
    /// # Errors
    ///
    /// Only store failures. Missing text or no current document yield
    /// [`LinkInsertion::Skipped`] without touching anything.
    pub fn insert_link(
        &mut self,
        original_text: &str,
        new_id: DocId,
    ) -> StoreResult<LinkInsertion> {
        let Some(view) = self.current.as_ref() else {
            tracing::info!(target_id = %new_id, "link insertion skipped: no current document");
            return Ok(LinkInsertion::Skipped(SkipReason::NoCurrentDocument));
        };
        let doc_id = view.document.id;

        if original_text.contains(']') {
            tracing::info!(doc_id = %doc_id, target_id = %new_id, "link insertion skipped: text contains ']'");
            return Ok(LinkInsertion::Skipped(SkipReason::UnlinkableText));
        }

        let candidates = hypertext::locate_all(&view.document.body, original_text);
        if candidates.is_empty() {
            tracing::info!(doc_id = %doc_id, target_id = %new_id, "link insertion skipped: text not found");
            return Ok(LinkInsertion::Skipped(SkipReason::TextNotFound));
        }

        let markup = hypertext::link_markup(original_text, new_id);
        let expected = Span::link(original_text, new_id);
        let rewritten = candidates.into_iter().find_map(|range| {
            let mut body = view.document.body.clone();
            body.replace_range(range.clone(), &markup);
            let link_range = range.start..range.start + markup.len();
            let parses_back = hypertext::parse_with_offsets(&body)
                .iter()
                .any(|located| located.range == link_range && located.span == expected);
            parses_back.then_some((body, link_range))
        });
        let Some((body, link_range)) = rewritten else {
            tracing::info!(doc_id = %doc_id, target_id = %new_id, "link insertion skipped: absorbed by unmatched '['");
            return Ok(LinkInsertion::Skipped(SkipReason::AbsorbedByBracket));
        };

        let mut document = view.document.clone();
        self.store.update(doc_id, &body)?;

        document.description = describe(&body);
        document.body = body;
        document.updated_at_us = now_us();
        if let Some(view) = self.current.as_mut() {
            view.refresh(document);
        }

        tracing::debug!(doc_id = %doc_id, target_id = %new_id, start = link_range.start, "inserted link");
        Ok(LinkInsertion::Inserted {
            doc_id,
            range: link_range,
        })
    }

    /// [`Navigator::insert_link`], but only while `context` is still current.
    ///
    /// # Errors
    ///
    /// Store failures from the insertion itself.
    pub fn insert_link_if_current(
        &mut self,
        context: DocId,
        original_text: &str,
        new_id: DocId,
    ) -> StoreResult<LinkInsertion> {
        if self.current_id() != Some(context) {
            tracing::info!(context = %context, target_id = %new_id, "link insertion skipped: context changed");
            return Ok(LinkInsertion::Skipped(SkipReason::ContextChanged));
        }
        self.insert_link(original_text, new_id)
    }

    /// Attach `image` to the current view. Refused (returns `false`) when the
    /// image belongs to a document that is no longer current.
    pub fn attach_image(&mut self, image: GeneratedImage) -> bool {
        let Some(view) = self.current.as_mut() else {
            return false;
        };
        if image.doc_id.is_some_and(|id| id != view.document.id) {
            return false;
        }
        view.image = Some(image);
        true
    }

    pub fn take_image(&mut self) -> Option<GeneratedImage> {
        self.current.as_mut().and_then(|view| view.image.take())
    }
}

impl<S> Navigator<S> {
    #[must_use]
    pub fn current_id(&self) -> Option<DocId> {
        self.current.as_ref().map(|view| view.document.id)
    }

    #[must_use]
    pub fn state(&self) -> NavState {
        self.current_id().map_or(NavState::NoDocument, NavState::Viewing)
    }

    #[must_use]
    pub const fn view(&self) -> Option<&DocumentView> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&GeneratedImage> {
        self.current.as_ref().and_then(|view| view.image.as_ref())
    }

    /// Back-history, bottom to top.
    #[must_use]
    pub fn history(&self) -> &[DocId] {
        &self.history
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S> fmt::Debug for Navigator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current_id())
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}
