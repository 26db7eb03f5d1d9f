//! # Storage Contracts
//!
//! The storage mapping is split the same way callers use it:
//! - `StoreRead`: point and indexed lookups, safe inside or outside a
//!   transaction. Traversals only ever see this half.
//! - `StoreWrite`: merges (true upserts keyed by id) and deletes. Every
//!   mutation requires an open transaction.
//! - `Transactional`: non-reentrant begin/commit/rollback.
//!
//! Lookups that find nothing return `None` or an empty `Vec`, never
//! `NotFound`.

use super::records::{AttributeRecord, NodeRecord, RelRecord, TypeRecord};
use crate::instance::{node_identity, rel_identity};
use crate::schema::TypeClass;
use crate::types::{Id, Result};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// The two rel-shaped record families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelFamily {
    /// `rel`: edges between nodes.
    Instance,
    /// `typerel`: edges between types.
    Schema,
}

impl RelFamily {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "rel",
            Self::Schema => "typerel",
        }
    }
}

impl fmt::Display for RelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row counts per record family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub types: u64,
    pub attributes: u64,
    pub nodes: u64,
    pub rels: u64,
    pub type_rels: u64,
}

/// Explicit transaction control.
///
/// Transactions do not nest: `begin` while one is open, or
/// `commit`/`rollback` with none open, is a `TransactionState` error.
pub trait Transactional {
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    fn in_transaction(&self) -> bool;
}

/// Run `mutate` inside a new transaction.
///
/// Commits when `mutate` succeeds. On failure the transaction is rolled
/// back and the original error is returned unchanged.
pub fn atomically<S, T, F>(store: &mut S, mutate: F) -> Result<T>
where
    S: Transactional + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    store.begin()?;
    match mutate(store) {
        Ok(value) => {
            store.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = store.rollback() {
                warn!(error = %rollback_err, "rollback after failed write also failed");
            }
            Err(err)
        }
    }
}

/// Read side of the storage mapping.
pub trait StoreRead {
    fn type_by_id(&self, id: &Id) -> Result<Option<TypeRecord>>;

    /// Lookup on the unique `(typeclass, typename)` key.
    fn type_by_name(&self, class: TypeClass, typename: &str) -> Result<Option<TypeRecord>>;

    /// Every stored type of one typeclass, ordered by typename.
    fn types_by_class(&self, class: TypeClass) -> Result<Vec<TypeRecord>>;

    fn attribute_by_id(&self, id: &Id) -> Result<Option<AttributeRecord>>;

    fn node_by_id(&self, id: &Id) -> Result<Option<NodeRecord>>;

    /// Lookup on the unique `(type, name)` key.
    fn node_by_name(&self, node_type: &Id, name: &str) -> Result<Option<NodeRecord>> {
        self.node_by_id(&node_identity(node_type, name))
    }

    /// Every node of one concept, ordered by id.
    fn nodes_by_type(&self, node_type: &Id) -> Result<Vec<NodeRecord>>;

    fn rel_by_id(&self, family: RelFamily, id: &Id) -> Result<Option<RelRecord>>;

    fn rel_by_name(
        &self,
        family: RelFamily,
        rel_type: &Id,
        name: &str,
    ) -> Result<Option<RelRecord>> {
        self.rel_by_id(family, &rel_identity(rel_type, name))
    }

    fn rels_by_type(&self, family: RelFamily, rel_type: &Id) -> Result<Vec<RelRecord>>;

    /// Outgoing rels of one type.
    fn rels_by_from(&self, family: RelFamily, rel_type: &Id, from: &Id)
    -> Result<Vec<RelRecord>>;

    /// Incoming rels of one type.
    fn rels_by_to(&self, family: RelFamily, rel_type: &Id, to: &Id) -> Result<Vec<RelRecord>>;

    fn counts(&self) -> Result<StoreCounts>;
}

/// Write side of the storage mapping.
///
/// Deletes do not cascade and are not blocked by referencing rows;
/// deleting an absent id returns `Ok(false)`. Reference constraints are
/// checked when a row is merged.
pub trait StoreWrite: StoreRead + Transactional {
    /// Upsert a type. `(typeclass, typename)` must stay unique.
    fn merge_type(&mut self, record: &TypeRecord) -> Result<()>;

    /// Upsert an attribute. Its type must be stored.
    fn merge_attribute(&mut self, record: &AttributeRecord) -> Result<()>;

    /// Upsert a node. Its type must be stored.
    fn merge_node(&mut self, record: &NodeRecord) -> Result<()>;

    /// Upsert a rel. Its type and both endpoints must be stored, and an
    /// existing row with the same id must have the same endpoints.
    fn merge_rel(&mut self, family: RelFamily, record: &RelRecord) -> Result<()>;

    fn delete_type(&mut self, id: &Id) -> Result<bool>;

    fn delete_attribute(&mut self, id: &Id) -> Result<bool>;

    fn delete_node(&mut self, id: &Id) -> Result<bool>;

    fn delete_rel(&mut self, family: RelFamily, id: &Id) -> Result<bool>;

    /// Delete every rel of `rel_type` leaving `from`. Returns how many were removed.
    fn delete_rels_by_from(&mut self, family: RelFamily, rel_type: &Id, from: &Id)
    -> Result<usize>;

    /// Delete every rel of `rel_type` entering `to`. Returns how many were removed.
    fn delete_rels_by_to(&mut self, family: RelFamily, rel_type: &Id, to: &Id) -> Result<usize>;
}
