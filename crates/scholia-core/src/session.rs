//! # Session Module
//!
//! A session pairs a store with the schema installed in it and owns the
//! composite-write discipline:
//! - Every write runs inside [`Session::write`]: begin, mutate, commit
//! - Any error in the mutate phase rolls back and is returned unchanged
//! - Updates replace a record's whole attribute list, never patch it
//!
//! [`Outcome`] is the `{success, error}` shape composite writes report at
//! the external boundary.

use crate::instance::{AttributeInstance, Node, Rel};
use crate::primitives::{ID_LIST_SEPARATOR, Value, decode_ids};
use crate::schema::{ConceptFields, SchemaRegistry, TypeClass, TypeDef};
use crate::storage::{NodeRecord, RedbStore, RelFamily, StoreRead, StoreWrite, atomically};
use crate::types::{Id, Result, ScholiaError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result of a composite write as reported across the external boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }

    #[must_use]
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::failed(e),
        }
    }
}

// =============================================================================
// READ HELPERS
// =============================================================================

/// Decode a node's attribute values, in positional order.
pub fn read_values<S: StoreRead + ?Sized>(
    store: &S,
    registry: &SchemaRegistry,
    node: &NodeRecord,
) -> Result<Vec<Value>> {
    decode_ids(&node.attr, ID_LIST_SEPARATOR)
        .iter()
        .map(|id| {
            let record = store.attribute_by_id(id)?.ok_or_else(|| ScholiaError::CorruptRecord {
                id: node.id.to_string(),
                reason: format!("attribute {} is missing", id),
            })?;
            let attr_type = registry.get(&record.type_id).ok_or_else(|| {
                ScholiaError::NotFound(format!("attribute type {}", record.type_id))
            })?;
            Ok(AttributeInstance::from_record(&record, attr_type)?
                .value()
                .clone())
        })
        .collect()
}

/// Decode a node's attributes into a named record.
pub fn read_fields<F, S>(store: &S, registry: &SchemaRegistry, node: &NodeRecord) -> Result<F>
where
    F: ConceptFields,
    S: StoreRead + ?Sized,
{
    F::from_values(&read_values(store, registry, node)?)
}

/// Fail unless the concept's field names are exactly `F::FIELDS`.
fn check_layout<F: ConceptFields>(registry: &SchemaRegistry, concept: &TypeDef) -> Result<()> {
    let layout = registry.layout(concept)?;
    let names: Vec<&str> = layout.iter().map(|(name, _)| *name).collect();
    if names == F::FIELDS {
        Ok(())
    } else {
        Err(ScholiaError::InvalidType(format!(
            "concept '{}' has fields {:?}, record expects {:?}",
            concept.typename(),
            names,
            F::FIELDS
        )))
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A store plus the schema installed in it.
#[derive(Debug)]
pub struct Session<S = RedbStore> {
    store: S,
    registry: SchemaRegistry,
}

impl Session<RedbStore> {
    /// Open (or create) a file-backed store and install `registry` into it.
    pub fn open(path: impl AsRef<Path>, registry: SchemaRegistry) -> Result<Self> {
        Self::new(RedbStore::open(path)?, registry)
    }

    /// A throwaway in-memory session.
    pub fn in_memory(registry: SchemaRegistry) -> Result<Self> {
        Self::new(RedbStore::in_memory()?, registry)
    }
}

impl<S: StoreWrite> Session<S> {
    /// Install `registry` into `store`. Installing is idempotent.
    pub fn new(mut store: S, registry: SchemaRegistry) -> Result<Self> {
        registry.install(&mut store)?;
        Ok(Self { store, registry })
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Run a composite write in one transaction.
    ///
    /// On error the transaction is rolled back, so none of the records
    /// written by `mutate` stay visible.
    pub fn write<T, F>(&mut self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Tx<'_, S>) -> Result<T>,
    {
        let registry = &self.registry;
        atomically(&mut self.store, |store| {
            let mut tx = Tx { store, registry };
            mutate(&mut tx)
        })
    }

    /// Decode a node's attributes into a named record. `None` if the node
    /// does not exist.
    pub fn fields<F: ConceptFields>(&self, node: &Id) -> Result<Option<F>> {
        match self.store.node_by_id(node)? {
            Some(record) => Ok(Some(read_fields(&self.store, &self.registry, &record)?)),
            None => Ok(None),
        }
    }
}

// =============================================================================
// TRANSACTION HANDLE
// =============================================================================

/// The store and schema as seen from inside [`Session::write`].
pub struct Tx<'a, S: ?Sized> {
    store: &'a mut S,
    registry: &'a SchemaRegistry,
}

impl<S: StoreWrite + ?Sized> Tx<'_, S> {
    /// Read view of the store, including this transaction's own writes.
    #[must_use]
    pub fn store(&self) -> &S {
        &*self.store
    }

    /// Direct access to the store, for raw merges.
    pub fn store_mut(&mut self) -> &mut S {
        &mut *self.store
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        self.registry
    }

    fn require_node(&self, id: &Id) -> Result<NodeRecord> {
        self.store
            .node_by_id(id)?
            .ok_or_else(|| ScholiaError::PreconditionFailed(format!("node {} does not exist", id)))
    }

    /// Create a node of `concept` from positional values.
    ///
    /// Fails with `PreconditionFailed` if a node with this concept and
    /// name already exists.
    pub fn create_node(
        &mut self,
        concept: &TypeDef,
        name: &str,
        values: Vec<Value>,
    ) -> Result<Node> {
        let node = Node::new(concept, name)?;
        if self.store.node_by_id(node.id())?.is_some() {
            return Err(ScholiaError::PreconditionFailed(format!(
                "{} '{}' already exists",
                concept.typename(),
                name
            )));
        }
        let attributes = self.store_values(concept, values)?;
        let node = node.with_attributes(attributes);
        self.store.merge_node(&node.to_record())?;
        debug!(concept = concept.typename(), node = %node.id(), "node created");
        Ok(node)
    }

    /// Create a node from a named record.
    pub fn create<F: ConceptFields>(
        &mut self,
        concept: &TypeDef,
        name: &str,
        fields: F,
    ) -> Result<Node> {
        check_layout::<F>(self.registry, concept)?;
        self.create_node(concept, name, fields.into_values())
    }

    fn store_values(&mut self, concept: &TypeDef, values: Vec<Value>) -> Result<Vec<Id>> {
        let instances = self.registry.instantiate(concept, values)?;
        let mut ids = Vec::with_capacity(instances.len());
        for instance in instances {
            self.store.merge_attribute(&instance.to_record())?;
            ids.push(instance.id().clone());
        }
        Ok(ids)
    }

    /// Replace the whole attribute list of an existing node: delete the old
    /// attribute rows, store fresh instances, merge the node with the new
    /// id list.
    pub fn replace_attributes(&mut self, id: &Id, values: Vec<Value>) -> Result<Node> {
        let registry = self.registry;
        let record = self.require_node(id)?;
        let concept = registry
            .get(&record.type_id)
            .ok_or_else(|| ScholiaError::NotFound(format!("concept {}", record.type_id)))?;
        concept.expect_class(TypeClass::Concept)?;
        let mut node = Node::from_record(&record)?;
        for old in node.attributes().to_vec() {
            self.store.delete_attribute(&old)?;
            node.remove_attr(&old);
        }
        for new in self.store_values(concept, values)? {
            node.add_attr(new);
        }
        self.store.merge_node(&node.to_record())?;
        Ok(node)
    }

    /// [`Tx::replace_attributes`] from a named record.
    pub fn replace<F: ConceptFields>(&mut self, id: &Id, fields: F) -> Result<Node> {
        let registry = self.registry;
        let record = self.require_node(id)?;
        let concept = registry
            .get(&record.type_id)
            .ok_or_else(|| ScholiaError::NotFound(format!("concept {}", record.type_id)))?;
        check_layout::<F>(registry, concept)?;
        self.replace_attributes(id, fields.into_values())
    }

    /// Decode a node's attributes into a named record.
    pub fn fields<F: ConceptFields>(&self, node: &NodeRecord) -> Result<F> {
        read_fields(&*self.store, self.registry, node)
    }

    /// Link two existing nodes with the conventional endpoint-derived name.
    pub fn link(&mut self, rel_type: &TypeDef, from: &Id, to: &Id) -> Result<Rel> {
        rel_type.expect_class(TypeClass::InstanceRel)?;
        let from = Node::from_record(&self.require_node(from)?)?;
        let to = Node::from_record(&self.require_node(to)?)?;
        let rel = Rel::link(rel_type, &from, &to)?;
        self.store.merge_rel(RelFamily::Instance, &rel.to_record())?;
        Ok(rel)
    }

    /// Delete every rel touching `node`, over every registered
    /// InstanceRel, together with the rels' attributes. Returns how many
    /// rels were removed.
    pub fn detach(&mut self, node: &Id) -> Result<usize> {
        let rel_types: Vec<Id> = self
            .registry
            .iter()
            .filter(|def| def.typeclass() == TypeClass::InstanceRel)
            .map(|def| def.id().clone())
            .collect();
        let mut removed = 0;
        for rel_type in &rel_types {
            let touching = self
                .store
                .rels_by_from(RelFamily::Instance, rel_type, node)?
                .into_iter()
                .chain(self.store.rels_by_to(RelFamily::Instance, rel_type, node)?);
            for rel in touching {
                for attr in decode_ids(&rel.attr, ID_LIST_SEPARATOR) {
                    self.store.delete_attribute(&attr)?;
                }
            }
            removed += self
                .store
                .delete_rels_by_from(RelFamily::Instance, rel_type, node)?;
            removed += self
                .store
                .delete_rels_by_to(RelFamily::Instance, rel_type, node)?;
        }
        Ok(removed)
    }

    /// Delete a node and its attribute rows. Rels are left alone; call
    /// [`Tx::detach`] first to remove them.
    pub fn delete_node(&mut self, id: &Id) -> Result<bool> {
        let Some(record) = self.store.node_by_id(id)? else {
            return Ok(false);
        };
        for attr in decode_ids(&record.attr, ID_LIST_SEPARATOR) {
            self.store.delete_attribute(&attr)?;
        }
        self.store.delete_node(id)
    }
}
