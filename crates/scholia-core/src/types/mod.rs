//! # Core Type Definitions
//!
//! This module contains the types shared by every layer of the engine:
//! - Content-derived identifiers (`Id`)
//! - Error types (`ScholiaError`) and the crate `Result` alias
//!
//! ## Identity Guarantees
//!
//! Every identifier is the lowercase hex BLAKE3 digest of the record's
//! defining fields. Identifiers:
//! - Are pure functions of their inputs (no counters, no randomness),
//!   except attribute instances, which mix in a creation timestamp
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of any stored record (type, attribute, node, rel, typerel).
///
/// Rel endpoints may point at either nodes or types, so a single id type is
/// shared by all five record families.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(String);

impl Id {
    /// Wrap an already computed identifier (e.g. read back from storage).
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Hash arbitrary content into an identifier.
    #[must_use]
    pub fn hash_of(content: &str) -> Self {
        Self(digest(content))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the raw string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// BLAKE3 digest of `content`, hex encoded.
#[must_use]
pub fn digest(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Scholia engine.
///
/// - Queries that find nothing return `None`/empty, not `NotFound`
/// - `NotFound` is reserved for operations whose contract needs the record
/// - Storage errors propagate unchanged to the caller
#[derive(Debug, Error)]
pub enum ScholiaError {
    /// A record required by the operation does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The operation's precondition does not hold (e.g. updating a missing node).
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Transaction misuse: nested begin, commit/rollback without begin,
    /// or a mutation outside a transaction.
    #[error("Transaction state error: {0}")]
    TransactionState(String),

    /// A raw value could not be decoded by its primitive codec.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A uniqueness or reference constraint was violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A type definition is malformed or an unknown typeclass was requested.
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// A stored record does not match its own identity or shape.
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage backend error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Crate-wide result alias.
pub type Result<T, E = ScholiaError> = std::result::Result<T, E>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_is_deterministic() {
        assert_eq!(Id::hash_of("article"), Id::hash_of("article"));
        assert_ne!(Id::hash_of("article"), Id::hash_of("author"));
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let d = digest("scholia");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn id_ordering_is_lexicographic() {
        let mut ids = vec![Id::new("c"), Id::new("a"), Id::new("b")];
        ids.sort();
        assert_eq!(ids, vec![Id::new("a"), Id::new("b"), Id::new("c")]);
    }

    #[test]
    fn error_messages_name_the_failure() {
        let err = ScholiaError::CorruptRecord {
            id: "abc".to_string(),
            reason: "id mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Corrupt record abc: id mismatch");
    }
}
