//! # Identifier Newtypes
//!
//! - [`ContentId`]: content-derived identifier of a file in the store
//!   (e.g. `bafybeig...` or `Qm...`). Opaque and compared byte-for-byte.
//! - [`LedgerTxId`]: identifier of the ledger transaction carrying an anchor.
//!   The empty string is a sentinel for "anchored, transaction id unknown".

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound on accepted content identifier length.
const MAX_CONTENT_ID_LEN: usize = 128;

/// A content identifier in the content-addressed store.
///
/// Validated on construction: non-empty, ASCII alphanumeric only, at most
/// 128 characters. This rejects path traversal and query injection before a
/// value reaches any collaborator URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Create a validated content identifier.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyContentId);
        }
        if trimmed.len() > MAX_CONTENT_ID_LEN {
            return Err(ValidationError::ContentIdTooLong {
                max: MAX_CONTENT_ID_LEN,
                actual: trimmed.len(),
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidContentId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A ledger transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerTxId(String);

impl LedgerTxId {
    /// Wrap a transaction id returned by the ledger.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The empty sentinel recorded when an anchor is known to exist but its
    /// transaction id could not be recovered.
    pub fn unknown() -> Self {
        Self(String::new())
    }

    /// Whether this is the empty sentinel.
    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LedgerTxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
