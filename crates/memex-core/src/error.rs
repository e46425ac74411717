use std::fmt;

use crate::model::DocId;

/// Machine-readable error codes for scripted callers and the `--json` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    AlreadyInitialized,
    DocumentNotFound,
    InvalidDocumentId,
    LinkTextNotFound,
    EmptySelection,
    MissingApiKey,
    ServiceUnavailable,
    ServiceRejected,
    MalformedServiceResponse,
    StoreFailure,
    ImportFailed,
    ExportFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::AlreadyInitialized => "E1003",
            Self::DocumentNotFound => "E2001",
            Self::InvalidDocumentId => "E2002",
            Self::LinkTextNotFound => "E2003",
            Self::EmptySelection => "E2004",
            Self::MissingApiKey => "E4001",
            Self::ServiceUnavailable => "E4002",
            Self::ServiceRejected => "E4003",
            Self::MalformedServiceResponse => "E4004",
            Self::StoreFailure => "E5001",
            Self::ImportFailed => "E5002",
            Self::ExportFailed => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Journal not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::AlreadyInitialized => "Journal already initialized",
            Self::DocumentNotFound => "Document not found",
            Self::InvalidDocumentId => "Invalid document ID",
            Self::LinkTextNotFound => "Link text not found in document",
            Self::EmptySelection => "Nothing selected",
            Self::MissingApiKey => "No API key configured",
            Self::ServiceUnavailable => "Service unreachable",
            Self::ServiceRejected => "Service rejected the request",
            Self::MalformedServiceResponse => "Malformed service response",
            Self::StoreFailure => "Document store failure",
            Self::ImportFailed => "Import failed",
            Self::ExportFailed => "Export failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `mx init` to create a journal in this directory."),
            Self::ConfigParseError => Some("Fix syntax in .memex/config.toml and retry."),
            Self::AlreadyInitialized => {
                Some("Use `mx init --force` to rewrite the default config.")
            }
            Self::DocumentNotFound => Some("Run `mx list` to see available document IDs."),
            Self::InvalidDocumentId => Some("Document IDs are non-negative integers."),
            Self::LinkTextNotFound => {
                Some("The text must appear verbatim outside existing links.")
            }
            Self::EmptySelection => Some("Select text first."),
            Self::MissingApiKey => {
                Some("Set OPENAI_API_KEY, add ai.api_key to the config, or press K in the browser.")
            }
            Self::ServiceUnavailable => Some("Check network connectivity and the endpoint URL."),
            Self::ServiceRejected => Some("Check the API key, model name and account quota."),
            Self::MalformedServiceResponse => None,
            Self::StoreFailure => Some("Check disk space and permissions on .memex/."),
            Self::ImportFailed | Self::ExportFailed => {
                Some("Check that the path exists and is readable/writable.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Typed errors surfaced by the core to the calling layer.
#[derive(Debug, thiserror::Error)]
pub enum MemexError {
    #[error("document {0} not found")]
    DocumentNotFound(DocId),

    #[error("document store error: {0:#}")]
    Store(#[source] anyhow::Error),

    #[error("failed to load config {path}: {message}")]
    Config { path: String, message: String },

    #[error("failed to import {path}: {source}")]
    Import {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to export to {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl MemexError {
    /// Wrap a store-layer failure.
    pub fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::Store(err.into())
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::DocumentNotFound(_) => ErrorCode::DocumentNotFound,
            Self::Store(_) => ErrorCode::StoreFailure,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::Import { .. } => ErrorCode::ImportFailed,
            Self::Export { .. } => ErrorCode::ExportFailed,
            Self::Io { .. } => ErrorCode::StoreFailure,
        }
    }

    /// Remediation text suitable for a `suggestion:` line.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.error_code()
            .hint()
            .unwrap_or("No further detail available.")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, MemexError};
    use crate::model::DocId;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::AlreadyInitialized,
            ErrorCode::DocumentNotFound,
            ErrorCode::InvalidDocumentId,
            ErrorCode::LinkTextNotFound,
            ErrorCode::EmptySelection,
            ErrorCode::MissingApiKey,
            ErrorCode::ServiceUnavailable,
            ErrorCode::ServiceRejected,
            ErrorCode::MalformedServiceResponse,
            ErrorCode::StoreFailure,
            ErrorCode::ImportFailed,
            ErrorCode::ExportFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::DocumentNotFound.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn not_found_maps_to_code_and_hint() {
        let err = MemexError::DocumentNotFound(DocId::new(7));
        assert_eq!(err.to_string(), "document 7 not found");
        assert_eq!(err.error_code(), ErrorCode::DocumentNotFound);
        assert!(err.suggestion().contains("mx list"));
    }
}
