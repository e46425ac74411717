use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Maximum characters kept in a generated description.
pub const DESCRIPTION_MAX_CHARS: usize = 80;

/// Stable identifier of a document.
///
/// IDs are non-negative and never exceed `i64::MAX`, so every value maps onto
/// an SQLite `INTEGER PRIMARY KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(u64);

impl DocId {
    /// Largest representable document ID.
    pub const MAX: u64 = i64::MAX.unsigned_abs();

    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Parse a run of ASCII digits (`[0-9]+`) into an ID.
    ///
    /// Returns `None` for an empty string, any non-digit character, or a
    /// value above [`DocId::MAX`].
    #[must_use]
    pub fn from_digits(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u64 = raw.parse().ok()?;
        (value <= Self::MAX).then_some(Self(value))
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a valid [`DocId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid document id '{0}': expected a non-negative integer")]
pub struct InvalidDocId(pub String);

impl FromStr for DocId {
    type Err = InvalidDocId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_digits(s.trim()).ok_or_else(|| InvalidDocId(s.to_string()))
    }
}

impl ToSql for DocId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = i64::try_from(self.0)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
        Ok(ToSqlOutput::from(value))
    }
}

impl FromSql for DocId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        u64::try_from(raw)
            .map(Self)
            .map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

/// One row of the document index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocId,
    pub title: String,
    pub description: String,
}

/// A full document as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub description: String,
    pub body: String,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Document {
    #[must_use]
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

/// Derive a listing description from a body: the first non-empty line,
/// trimmed and truncated to [`DESCRIPTION_MAX_CHARS`] with an ellipsis.
#[must_use]
pub fn describe(body: &str) -> String {
    let line = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    if line.chars().count() <= DESCRIPTION_MAX_CHARS {
        return line.to_string();
    }

    let mut out: String = line.chars().take(DESCRIPTION_MAX_CHARS - 1).collect();
    out.push('…');
    out
}
