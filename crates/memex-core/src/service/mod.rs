//! External collaborators run on background task threads.
//!
//! Both traits are blocking: the orchestrator calls them from a worker
//! thread, never from the interactive control path. Implementations are
//! shared across workers, hence `Send + Sync`.

pub mod openai;

use std::fmt;
use std::path::Path;

use crate::error::ErrorCode;
use crate::model::DocId;

/// Failure reported by an AI or image collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed service response: {0}")]
    Malformed(String),
}

impl ServiceError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingApiKey => ErrorCode::MissingApiKey,
            Self::Transport { .. } => ErrorCode::ServiceUnavailable,
            Self::Status { .. } => ErrorCode::ServiceRejected,
            Self::Malformed(_) => ErrorCode::MalformedServiceResponse,
        }
    }
}

/// Text completion: turns a prompt into the reply text.
pub trait Completion: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the service cannot produce a reply.
    fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Image synthesis: turns a prompt into an encoded image.
pub trait ImageSynthesis: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the service cannot produce an image.
    fn generate(&self, prompt: &str) -> Result<GeneratedImage, ServiceError>;
}

/// An in-memory image returned by [`ImageSynthesis`].
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Encoded image bytes (PNG from the bundled client).
    pub bytes: Vec<u8>,
    pub prompt: String,
    /// Document the image was generated for, filled in by the orchestrator.
    pub doc_id: Option<DocId>,
}

impl GeneratedImage {
    #[must_use]
    pub fn new(bytes: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            bytes,
            prompt: prompt.into(),
            doc_id: None,
        }
    }

    /// Default file name offered when saving: `doc_<id>_image.png`.
    #[must_use]
    pub fn default_file_name(&self) -> String {
        self.doc_id.map_or_else(
            || "doc_unknown_image.png".to_string(),
            |id| format!("doc_{id}_image.png"),
        )
    }

    /// Width and height read from a PNG header, if the bytes are a PNG.
    #[must_use]
    pub fn png_dimensions(&self) -> Option<(u32, u32)> {
        const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
        if self.bytes.len() < 24 || !self.bytes.starts_with(SIGNATURE) || &self.bytes[12..16] != b"IHDR" {
            return None;
        }
        let width = u32::from_be_bytes(self.bytes[16..20].try_into().ok()?);
        let height = u32::from_be_bytes(self.bytes[20..24].try_into().ok()?);
        Some((width, height))
    }

    /// Write the encoded bytes to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("bytes", &self.bytes.len())
            .field("prompt", &self.prompt)
            .field("doc_id", &self.doc_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(&13_u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes
    }

    #[test]
    fn default_file_name_uses_document_id() {
        let mut image = GeneratedImage::new(vec![], "a lighthouse");
        assert_eq!(image.default_file_name(), "doc_unknown_image.png");
        image.doc_id = Some(DocId::new(12));
        assert_eq!(image.default_file_name(), "doc_12_image.png");
    }

    #[test]
    fn png_dimensions_reads_ihdr() {
        let image = GeneratedImage::new(tiny_png_header(1024, 768), "x");
        assert_eq!(image.png_dimensions(), Some((1024, 768)));
        let junk = GeneratedImage::new(b"not an image".to_vec(), "x");
        assert_eq!(junk.png_dimensions(), None);
    }

    #[test]
    fn save_writes_bytes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.png");
        let image = GeneratedImage::new(vec![1, 2, 3], "x");
        image.save(&path).expect("save");
        assert_eq!(std::fs::read(&path).expect("read back"), vec![1, 2, 3]);
    }

    #[test]
    fn service_errors_map_to_codes() {
        assert_eq!(ServiceError::MissingApiKey.error_code(), ErrorCode::MissingApiKey);
        assert_eq!(
            ServiceError::Status {
                status: 429,
                body: "quota".into()
            }
            .to_string(),
            "service returned HTTP 429: quota"
        );
    }
}
