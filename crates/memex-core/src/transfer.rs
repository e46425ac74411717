//! Plain-text import and export.

use std::path::Path;

use crate::error::MemexError;
use crate::model::DocId;
use crate::store::{DocumentStore, StoreResult};

/// Keep printable ASCII plus newline, carriage return and tab.
#[must_use]
pub fn sanitize_import(text: &str) -> String {
    text.chars()
        .filter(|c| matches!(c, '\n' | '\r' | '\t' | ' '..='~'))
        .collect()
}

/// Import `path` as a new document titled with the file name.
///
/// Bytes that are not valid UTF-8 are dropped along with every other
/// character outside the printable ASCII range.
///
/// # Errors
///
/// [`MemexError::Import`] if the file cannot be read, or a store error.
pub fn import_file<S: DocumentStore + ?Sized>(store: &mut S, path: &Path) -> StoreResult<DocId> {
    let bytes = std::fs::read(path).map_err(|source| MemexError::Import {
        path: path.display().to_string(),
        source,
    })?;
    let body = sanitize_import(&String::from_utf8_lossy(&bytes));
    let title = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

    let id = store.create(&title, &body)?;
    tracing::info!(doc_id = %id, path = %path.display(), bytes = body.len(), "imported document");
    Ok(id)
}

/// Write the body of `id` to `path`.
///
/// # Errors
///
/// [`MemexError::DocumentNotFound`], [`MemexError::Export`] if the file
/// cannot be written, or a store error.
pub fn export_file<S: DocumentStore + ?Sized>(store: &S, id: DocId, path: &Path) -> StoreResult<()> {
    let document = store.get(id)?.ok_or(MemexError::DocumentNotFound(id))?;
    std::fs::write(path, document.body.as_bytes()).map_err(|source| MemexError::Export {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(doc_id = %id, path = %path.display(), "exported document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::MemoryStore;

    #[test]
    fn sanitize_keeps_printable_ascii_and_line_structure() {
        assert_eq!(sanitize_import("caf\u{e9}\tok\r\nnext\u{7}"), "caf\tok\r\nnext");
        assert_eq!(sanitize_import("[link](doc:1)"), "[link](doc:1)");
        assert_eq!(sanitize_import("\u{1F600}"), "");
    }

    #[test]
    fn import_uses_file_name_as_title() -> StoreResult<()> {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"first line\n\xff\xfesecond").expect("write");

        let mut store = MemoryStore::new();
        let id = import_file(&mut store, &path)?;
        let doc = store.get(id)?.expect("imported");
        assert_eq!(doc.title, "notes.txt");
        assert_eq!(doc.body, "first line\nsecond");
        Ok(())
    }

    #[test]
    fn import_missing_file_is_import_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = MemoryStore::new();
        let err = import_file(&mut store, &dir.path().join("absent.txt")).expect_err("missing");
        assert_eq!(err.error_code(), ErrorCode::ImportFailed);
        assert!(store.is_empty());
    }

    #[test]
    fn export_writes_body() -> StoreResult<()> {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.txt");
        let mut store = MemoryStore::new();
        let id = store.create("T", "see [x](doc:1)")?;

        export_file(&store, id, &path)?;
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "see [x](doc:1)");

        let err = export_file(&store, DocId::new(42), &path).expect_err("unknown id");
        assert!(matches!(err, MemexError::DocumentNotFound(_)));
        Ok(())
    }
}
