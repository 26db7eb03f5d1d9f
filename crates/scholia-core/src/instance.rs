//! # Instance Model
//!
//! Concrete data conforming to the schema:
//! - `AttributeInstance`: one encoded scalar, owned by a node or rel
//! - `Node`: an instance of a Concept
//! - `Rel`: an instance of an InstanceRel (or a TypeRel between types)
//!
//! ## Identity Rules
//!
//! | record              | id                                   |
//! |---------------------|--------------------------------------|
//! | `AttributeInstance` | `H(type + creation timestamp)`       |
//! | `Node`              | `H(type + name)`                     |
//! | `Rel`               | `H(type + name)`, endpoints excluded |
//!
//! A node's name is its uniqueness key within its Concept. A rel's name
//! must encode its endpoints; [`Rel::link`] builds the conventional
//! `"{from}_{verb}_{to}"` name.

use crate::primitives::{
    ID_LIST_SEPARATOR, MAX_NAME_LENGTH, PrimitiveKind, Value, decode_ids, encode_ids,
    validate_name,
};
use crate::schema::{TypeClass, TypeDef, TypeKind, meta};
use crate::storage::{AttributeRecord, NodeRecord, RelRecord};
use crate::types::{Id, Result, ScholiaError};
use std::sync::atomic::{AtomicU64, Ordering};

/// Disambiguates attribute instances created within one clock tick.
static CREATION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn creation_stamp() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = CREATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}:{}", nanos, seq)
}

/// Identity of a node: `H(type + name)`.
#[must_use]
pub fn node_identity(node_type: &Id, name: &str) -> Id {
    Id::hash_of(&format!("{}{}", node_type, name))
}

/// Identity of a rel: `H(type + name)`.
#[must_use]
pub fn rel_identity(rel_type: &Id, name: &str) -> Id {
    Id::hash_of(&format!("{}{}", rel_type, name))
}

// =============================================================================
// ATTRIBUTE INSTANCE
// =============================================================================

/// Codec parameters of an Attribute type.
fn attribute_spec(attr_type: &TypeDef) -> Result<(bool, PrimitiveKind)> {
    match attr_type.kind() {
        TypeKind::Attribute {
            required,
            value_type,
        } => meta::primitive_kind_of(value_type)
            .map(|kind| (*required, kind))
            .ok_or_else(|| {
                ScholiaError::InvalidType(format!(
                    "attribute '{}' has a non-primitive value type",
                    attr_type.typename()
                ))
            }),
        _ => Err(ScholiaError::InvalidType(format!(
            "'{}' is a {}, expected attribute",
            attr_type.typename(),
            attr_type.typeclass()
        ))),
    }
}

/// A single attribute value.
///
/// An optional attribute may hold `Value::Void`, stored as the empty string.
/// An empty raw value of an optional attribute always reads back as `Void`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInstance {
    id: Id,
    attr_type: Id,
    value: Value,
    raw: String,
}

impl AttributeInstance {
    /// Create a fresh instance. Every call yields a new id, even for an
    /// identical value.
    ///
    /// An optional attribute whose value encodes to `""` holds `Void`, the
    /// value its stored row decodes to.
    pub fn new(attr_type: &TypeDef, value: Value) -> Result<Self> {
        let (required, kind) = attribute_spec(attr_type)?;
        let raw = match &value {
            Value::Void if kind != PrimitiveKind::Void => String::new(),
            other => kind.encode(other)?,
        };
        let value = if raw.is_empty() && kind != PrimitiveKind::Void {
            if required {
                return Err(ScholiaError::PreconditionFailed(format!(
                    "attribute '{}' is required",
                    attr_type.typename()
                )));
            }
            Value::Void
        } else {
            value
        };
        let id = Id::hash_of(&format!("{}{}", attr_type.id(), creation_stamp()));
        Ok(Self {
            id,
            attr_type: attr_type.id().clone(),
            value,
            raw,
        })
    }

    #[must_use]
    pub fn id(&self) -> &Id {
        &self.id
    }

    #[must_use]
    pub fn attr_type(&self) -> &Id {
        &self.attr_type
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Project to an `attribute` row.
    #[must_use]
    pub fn to_record(&self) -> AttributeRecord {
        AttributeRecord {
            id: self.id.clone(),
            type_id: self.attr_type.clone(),
            raw: self.raw.clone(),
        }
    }

    /// Rebuild from a stored row, decoding with the attribute's codec.
    pub fn from_record(record: &AttributeRecord, attr_type: &TypeDef) -> Result<Self> {
        if &record.type_id != attr_type.id() {
            return Err(ScholiaError::CorruptRecord {
                id: record.id.to_string(),
                reason: format!("attribute is not of type '{}'", attr_type.typename()),
            });
        }
        let (required, kind) = attribute_spec(attr_type)?;
        let value = if record.raw.is_empty() && !required && kind != PrimitiveKind::Void {
            Value::Void
        } else {
            kind.decode(&record.raw)?
        };
        Ok(Self {
            id: record.id.clone(),
            attr_type: record.type_id.clone(),
            value,
            raw: record.raw.clone(),
        })
    }
}

// =============================================================================
// NODE
// =============================================================================

/// An instance of a Concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: Id,
    node_type: Id,
    name: String,
    attributes: Vec<Id>,
}

impl Node {
    /// Create a node of the given concept. Same concept and name, same id.
    pub fn new(concept: &TypeDef, name: &str) -> Result<Self> {
        concept.expect_class(TypeClass::Concept)?;
        validate_name(name, MAX_NAME_LENGTH, "node name")?;
        Ok(Self {
            id: node_identity(concept.id(), name),
            node_type: concept.id().clone(),
            name: name.to_string(),
            attributes: Vec::new(),
        })
    }

    /// Builder-style attribute list replacement.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<Id>) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn id(&self) -> &Id {
        &self.id
    }

    #[must_use]
    pub fn node_type(&self) -> &Id {
        &self.node_type
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute ids, in the concept's declared order.
    #[must_use]
    pub fn attributes(&self) -> &[Id] {
        &self.attributes
    }

    /// Append an attribute id. No deduplication.
    pub fn add_attr(&mut self, id: Id) {
        self.attributes.push(id);
    }

    /// Remove every occurrence of an attribute id. Returns whether any was removed.
    pub fn remove_attr(&mut self, id: &Id) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a != id);
        self.attributes.len() != before
    }

    /// Project to a `node` row.
    #[must_use]
    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id.clone(),
            type_id: self.node_type.clone(),
            name: self.name.clone(),
            attr: encode_ids(&self.attributes, ID_LIST_SEPARATOR),
        }
    }

    /// Rebuild from a stored row. The row's id must match `H(type + name)`.
    pub fn from_record(record: &NodeRecord) -> Result<Self> {
        if node_identity(&record.type_id, &record.name) != record.id {
            return Err(ScholiaError::CorruptRecord {
                id: record.id.to_string(),
                reason: "node id does not match type and name".to_string(),
            });
        }
        Ok(Self {
            id: record.id.clone(),
            node_type: record.type_id.clone(),
            name: record.name.clone(),
            attributes: decode_ids(&record.attr, ID_LIST_SEPARATOR),
        })
    }
}

// =============================================================================
// REL
// =============================================================================

/// A directed relation instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rel {
    id: Id,
    rel_type: Id,
    name: String,
    attributes: Vec<Id>,
    from: Id,
    to: Id,
}

impl Rel {
    /// Create a rel with an explicit name. The caller is responsible for
    /// embedding the endpoints in `name`; the store rejects a merge that
    /// would silently re-point an existing rel.
    pub fn new(rel_type: &TypeDef, name: &str, from: Id, to: Id) -> Result<Self> {
        if rel_type.rel_args().is_none() {
            return Err(ScholiaError::InvalidType(format!(
                "'{}' is a {}, expected a relation type",
                rel_type.typename(),
                rel_type.typeclass()
            )));
        }
        validate_name(name, MAX_NAME_LENGTH, "rel name")?;
        Ok(Self {
            id: rel_identity(rel_type.id(), name),
            rel_type: rel_type.id().clone(),
            name: name.to_string(),
            attributes: Vec::new(),
            from,
            to,
        })
    }

    /// Link two nodes, naming the rel `"{from}_{verb}_{to}"` with the
    /// relation's typename as verb. The nodes must match the relation's
    /// declared endpoint concepts.
    pub fn link(rel_type: &TypeDef, from: &Node, to: &Node) -> Result<Self> {
        let args = rel_type.rel_args().ok_or_else(|| {
            ScholiaError::InvalidType(format!(
                "'{}' is a {}, expected a relation type",
                rel_type.typename(),
                rel_type.typeclass()
            ))
        })?;
        if from.node_type() != &args.from || to.node_type() != &args.to {
            return Err(ScholiaError::PreconditionFailed(format!(
                "'{}' cannot link '{}' to '{}': endpoint types differ from the declaration",
                rel_type.typename(),
                from.name(),
                to.name()
            )));
        }
        let name = format!("{}_{}_{}", from.id(), rel_type.typename(), to.id());
        Self::new(rel_type, &name, from.id().clone(), to.id().clone())
    }

    /// Builder-style attribute list replacement.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<Id>) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn id(&self) -> &Id {
        &self.id
    }

    #[must_use]
    pub fn rel_type(&self) -> &Id {
        &self.rel_type
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attributes(&self) -> &[Id] {
        &self.attributes
    }

    #[must_use]
    pub fn from(&self) -> &Id {
        &self.from
    }

    #[must_use]
    pub fn to(&self) -> &Id {
        &self.to
    }

    /// Append an attribute id. No deduplication.
    pub fn add_attr(&mut self, id: Id) {
        self.attributes.push(id);
    }

    /// Remove every occurrence of an attribute id.
    pub fn remove_attr(&mut self, id: &Id) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a != id);
        self.attributes.len() != before
    }

    /// Project to a `rel` / `typerel` row.
    #[must_use]
    pub fn to_record(&self) -> RelRecord {
        RelRecord {
            id: self.id.clone(),
            type_id: self.rel_type.clone(),
            name: self.name.clone(),
            attr: encode_ids(&self.attributes, ID_LIST_SEPARATOR),
            fromid: self.from.clone(),
            toid: self.to.clone(),
        }
    }

    /// Rebuild from a stored row. The row's id must match `H(type + name)`.
    pub fn from_record(record: &RelRecord) -> Result<Self> {
        if rel_identity(&record.type_id, &record.name) != record.id {
            return Err(ScholiaError::CorruptRecord {
                id: record.id.to_string(),
                reason: "rel id does not match type and name".to_string(),
            });
        }
        Ok(Self {
            id: record.id.clone(),
            rel_type: record.type_id.clone(),
            name: record.name.clone(),
            attributes: decode_ids(&record.attr, ID_LIST_SEPARATOR),
            from: record.fromid.clone(),
            to: record.toid.clone(),
        })
    }
}
