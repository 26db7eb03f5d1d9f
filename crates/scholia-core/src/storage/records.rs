//! # Storage Projections
//!
//! The row shapes of the five record families. In-memory builders
//! (`TypeDef`, `Node`, `Rel`, `AttributeInstance`) project to these with
//! `to_record()` and are rebuilt from them with `from_record()`.
//!
//! Rows are stored `postcard`-encoded, keyed by `id`.

use crate::types::{Id, Result, ScholiaError};
use serde::{Deserialize, Serialize};

/// A row of the `type` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub id: Id,
    pub typeclass: String,
    pub typename: String,
    pub supertype: Option<Id>,
    /// Variant-specific payload, already encoded.
    pub args: Option<String>,
}

/// A row of the `attribute` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub id: Id,
    /// Attribute type id.
    pub type_id: Id,
    /// Value encoded by the attribute's primitive codec.
    pub raw: String,
}

/// A row of the `node` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Id,
    /// Concept id.
    pub type_id: Id,
    pub name: String,
    /// Ordered attribute ids, `/`-joined.
    pub attr: String,
}

/// A row of the `rel` or `typerel` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelRecord {
    pub id: Id,
    pub type_id: Id,
    pub name: String,
    /// Ordered attribute ids, `/`-joined.
    pub attr: String,
    pub fromid: Id,
    pub toid: Id,
}

/// Encode a row for storage.
pub(crate) fn encode_row<T: Serialize>(row: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(row).map_err(|e| ScholiaError::SerializationError(e.to_string()))
}

/// Decode a stored row.
pub(crate) fn decode_row<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    postcard::from_bytes(bytes).map_err(|e| ScholiaError::SerializationError(e.to_string()))
}
