//! # Type Definitions
//!
//! `TypeDef` is the schema-level record: a typeclass-specific payload
//! (`TypeKind`) plus a typename and a supertype.
//!
//! ## Identity
//!
//! ```text
//! id = H( H(supertype or "") + H(typeclass) + H(typename) )
//! ```
//!
//! `args` never take part in identity. Re-declaring a type with the same
//! typeclass, typename and supertype yields the same id, so re-merging is
//! safe; changing args on an existing id overwrites it in place.

use super::meta;
use super::typeclass::TypeClass;
use crate::primitives::{
    ID_LIST_SEPARATOR, MAX_TYPENAME_LENGTH, PrimitiveKind, REL_ARGS_SEPARATOR, REL_ATTR_SEPARATOR,
    decode_ids, encode_ids, validate_name,
};
use crate::storage::TypeRecord;
use crate::types::{Id, Result, ScholiaError, digest};
use std::sync::Arc;

// =============================================================================
// ARGS
// =============================================================================

/// Endpoints and attribute list of a `TypeRel` or `InstanceRel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelArgs {
    pub from: Id,
    pub to: Id,
    pub attributes: Vec<Id>,
}

impl RelArgs {
    /// Encode as `from/to!a1@a2@...`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.from,
            ID_LIST_SEPARATOR,
            self.to,
            REL_ARGS_SEPARATOR,
            encode_ids(&self.attributes, REL_ATTR_SEPARATOR)
        )
    }

    /// Decode the form produced by [`RelArgs::encode`].
    pub fn decode(raw: &str) -> Result<Self> {
        let (endpoints, attributes) = raw.split_once(REL_ARGS_SEPARATOR).unwrap_or((raw, ""));
        let (from, to) = endpoints.split_once(ID_LIST_SEPARATOR).ok_or_else(|| {
            ScholiaError::InvalidType(format!("rel args '{}' lack endpoints", raw))
        })?;
        if from.is_empty() || to.is_empty() {
            return Err(ScholiaError::InvalidType(format!(
                "rel args '{}' have an empty endpoint",
                raw
            )));
        }
        Ok(Self {
            from: Id::new(from),
            to: Id::new(to),
            attributes: decode_ids(attributes, REL_ATTR_SEPARATOR),
        })
    }
}

/// Typeclass-specific payload of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    ConceptType,
    AttributeType,
    EntityType,
    RelType,
    Primitive(PrimitiveKind),
    /// One scalar field.
    Attribute { required: bool, value_type: Id },
    /// Ordered attribute type ids. Order is significant.
    Concept { attributes: Vec<Id> },
    /// Marks a Concept as a realization in the dual entity layer.
    Entity { concept: Id },
    TypeRel(RelArgs),
    InstanceRel(RelArgs),
}

impl TypeKind {
    /// The typeclass this payload belongs to.
    #[must_use]
    pub fn typeclass(&self) -> TypeClass {
        match self {
            Self::ConceptType => TypeClass::ConceptType,
            Self::AttributeType => TypeClass::AttributeType,
            Self::EntityType => TypeClass::EntityType,
            Self::RelType => TypeClass::RelType,
            Self::Primitive(_) => TypeClass::Primitive,
            Self::Attribute { .. } => TypeClass::Attribute,
            Self::Concept { .. } => TypeClass::Concept,
            Self::Entity { .. } => TypeClass::Entity,
            Self::TypeRel(_) => TypeClass::TypeRel,
            Self::InstanceRel(_) => TypeClass::InstanceRel,
        }
    }

    /// The supertype every type of this kind must carry.
    fn supertype(&self) -> Option<Id> {
        match self {
            Self::ConceptType
            | Self::AttributeType
            | Self::EntityType
            | Self::RelType
            | Self::Primitive(_) => None,
            Self::Attribute { .. } => Some(meta::attribute_type().id().clone()),
            Self::Concept { .. } => Some(meta::concept_type().id().clone()),
            Self::Entity { .. } => Some(meta::entity_type().id().clone()),
            Self::TypeRel(_) | Self::InstanceRel(_) => Some(meta::rel_type().id().clone()),
        }
    }

    /// Encode the args column.
    fn encode_args(&self) -> Option<String> {
        match self {
            Self::ConceptType
            | Self::AttributeType
            | Self::EntityType
            | Self::RelType
            | Self::Primitive(_) => None,
            Self::Attribute {
                required,
                value_type,
            } => Some(format!("{}{}{}", required, ID_LIST_SEPARATOR, value_type)),
            Self::Concept { attributes } => Some(encode_ids(attributes, ID_LIST_SEPARATOR)),
            Self::Entity { concept } => Some(concept.to_string()),
            Self::TypeRel(args) | Self::InstanceRel(args) => Some(args.encode()),
        }
    }
}

// =============================================================================
// TYPE DEFINITION
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
struct TypeInner {
    id: Id,
    typename: String,
    supertype: Option<Id>,
    kind: TypeKind,
}

/// A schema-level type.
///
/// Cloning is cheap and shares the definition, so a meta-type resolved from
/// storage is the very same object as the process-wide singleton (see
/// [`TypeDef::is_same`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef(Arc<TypeInner>);

/// Compute the identity of a type.
#[must_use]
pub fn type_identity(supertype: Option<&Id>, typeclass: TypeClass, typename: &str) -> Id {
    let supertype = supertype.map(Id::as_str).unwrap_or("");
    Id::hash_of(&format!(
        "{}{}{}",
        digest(supertype),
        digest(typeclass.as_str()),
        digest(typename)
    ))
}

impl TypeDef {
    /// Build a definition, deriving supertype and id from the payload.
    ///
    /// Only reachable from this module and the meta-type initializer.
    pub(super) fn build(kind: TypeKind, typename: impl Into<String>) -> Self {
        let typename = typename.into();
        let supertype = kind.supertype();
        let id = type_identity(supertype.as_ref(), kind.typeclass(), &typename);
        Self(Arc::new(TypeInner {
            id,
            typename,
            supertype,
            kind,
        }))
    }

    fn checked(kind: TypeKind, typename: &str) -> Result<Self> {
        validate_name(typename, MAX_TYPENAME_LENGTH, "typename")?;
        Ok(Self::build(kind, typename))
    }

    /// Declare a scalar attribute.
    pub fn attribute(typename: &str, required: bool, value: PrimitiveKind) -> Result<Self> {
        Self::checked(
            TypeKind::Attribute {
                required,
                value_type: meta::primitive(value).id().clone(),
            },
            typename,
        )
    }

    /// Declare a concept with an ordered attribute list.
    pub fn concept(typename: &str, attributes: &[&TypeDef]) -> Result<Self> {
        for attribute in attributes {
            attribute.expect_class(TypeClass::Attribute)?;
        }
        Self::checked(
            TypeKind::Concept {
                attributes: attributes.iter().map(|a| a.id().clone()).collect(),
            },
            typename,
        )
    }

    /// Mark a concept as an entity realization.
    pub fn entity(typename: &str, concept: &TypeDef) -> Result<Self> {
        concept.expect_class(TypeClass::Concept)?;
        Self::checked(
            TypeKind::Entity {
                concept: concept.id().clone(),
            },
            typename,
        )
    }

    /// Declare a schema-level relation.
    pub fn type_rel(
        typename: &str,
        from: &TypeDef,
        to: &TypeDef,
        attributes: &[&TypeDef],
    ) -> Result<Self> {
        let args = Self::endpoint_args(from, to, attributes)?;
        Self::checked(TypeKind::TypeRel(args), typename)
    }

    /// Declare an instance-level relation.
    pub fn instance_rel(
        typename: &str,
        from: &TypeDef,
        to: &TypeDef,
        attributes: &[&TypeDef],
    ) -> Result<Self> {
        let args = Self::endpoint_args(from, to, attributes)?;
        Self::checked(TypeKind::InstanceRel(args), typename)
    }

    fn endpoint_args(from: &TypeDef, to: &TypeDef, attributes: &[&TypeDef]) -> Result<RelArgs> {
        for endpoint in [from, to] {
            if !matches!(endpoint.typeclass(), TypeClass::Concept | TypeClass::Entity) {
                return Err(ScholiaError::InvalidType(format!(
                    "rel endpoint '{}' is a {}, expected concept or entity",
                    endpoint.typename(),
                    endpoint.typeclass()
                )));
            }
        }
        for attribute in attributes {
            attribute.expect_class(TypeClass::Attribute)?;
        }
        Ok(RelArgs {
            from: from.id().clone(),
            to: to.id().clone(),
            attributes: attributes.iter().map(|a| a.id().clone()).collect(),
        })
    }

    /// The schema-level shadow of an instance relation: same typename and
    /// args, typeclass `typeRel`. `None` for every other kind.
    #[must_use]
    pub fn shadow_type_rel(&self) -> Option<Self> {
        match self.kind() {
            TypeKind::InstanceRel(args) => Some(Self::build(
                TypeKind::TypeRel(args.clone()),
                self.typename(),
            )),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> &Id {
        &self.0.id
    }

    #[must_use]
    pub fn typename(&self) -> &str {
        &self.0.typename
    }

    #[must_use]
    pub fn supertype(&self) -> Option<&Id> {
        self.0.supertype.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    #[must_use]
    pub fn typeclass(&self) -> TypeClass {
        self.0.kind.typeclass()
    }

    /// Whether both handles point at the same definition object.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Relation args for `TypeRel` / `InstanceRel`.
    #[must_use]
    pub fn rel_args(&self) -> Option<&RelArgs> {
        match self.kind() {
            TypeKind::TypeRel(args) | TypeKind::InstanceRel(args) => Some(args),
            _ => None,
        }
    }

    /// Ordered attribute ids of a concept (empty for other kinds).
    #[must_use]
    pub fn concept_attributes(&self) -> &[Id] {
        match self.kind() {
            TypeKind::Concept { attributes } => attributes,
            _ => &[],
        }
    }

    /// Fail unless this type has the given typeclass.
    pub fn expect_class(&self, class: TypeClass) -> Result<()> {
        if self.typeclass() == class {
            Ok(())
        } else {
            Err(ScholiaError::InvalidType(format!(
                "'{}' is a {}, expected {}",
                self.typename(),
                self.typeclass(),
                class
            )))
        }
    }

    // -------------------------------------------------------------------------
    // Storage projection
    // -------------------------------------------------------------------------

    /// Project to a `type` row.
    #[must_use]
    pub fn to_record(&self) -> TypeRecord {
        TypeRecord {
            id: self.id().clone(),
            typeclass: self.typeclass().as_str().to_string(),
            typename: self.typename().to_string(),
            supertype: self.supertype().cloned(),
            args: self.kind().encode_args(),
        }
    }

    /// Rebuild a definition from a stored row.
    ///
    /// Meta-types and primitives resolve to their singletons. The rebuilt
    /// id and supertype must match the row.
    pub fn from_record(record: &TypeRecord) -> Result<Self> {
        let class = TypeClass::parse(&record.typeclass)?;
        let def = match class {
            TypeClass::ConceptType => meta::concept_type().clone(),
            TypeClass::AttributeType => meta::attribute_type().clone(),
            TypeClass::EntityType => meta::entity_type().clone(),
            TypeClass::RelType => meta::rel_type().clone(),
            TypeClass::Primitive => {
                meta::primitive(PrimitiveKind::from_typename(&record.typename)?).clone()
            }
            TypeClass::Attribute => {
                let args = required_args(record)?;
                let (required, value_type) = args
                    .split_once(ID_LIST_SEPARATOR)
                    .ok_or_else(|| corrupt(record, "attribute args lack a value type"))?;
                let required = match required {
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(corrupt(
                            record,
                            &format!("required flag '{}' is not a boolean", other),
                        ));
                    }
                };
                let value_type = Id::new(value_type);
                if meta::primitive_kind_of(&value_type).is_none() {
                    return Err(corrupt(record, "value type is not a primitive"));
                }
                Self::build(
                    TypeKind::Attribute {
                        required,
                        value_type,
                    },
                    record.typename.clone(),
                )
            }
            TypeClass::Concept => Self::build(
                TypeKind::Concept {
                    attributes: decode_ids(required_args(record)?, ID_LIST_SEPARATOR),
                },
                record.typename.clone(),
            ),
            TypeClass::Entity => {
                let concept = required_args(record)?;
                if concept.is_empty() {
                    return Err(corrupt(record, "entity args lack a concept"));
                }
                Self::build(
                    TypeKind::Entity {
                        concept: Id::new(concept),
                    },
                    record.typename.clone(),
                )
            }
            TypeClass::TypeRel => Self::build(
                TypeKind::TypeRel(RelArgs::decode(required_args(record)?)?),
                record.typename.clone(),
            ),
            TypeClass::InstanceRel => Self::build(
                TypeKind::InstanceRel(RelArgs::decode(required_args(record)?)?),
                record.typename.clone(),
            ),
        };

        if def.id() != &record.id {
            return Err(corrupt(
                record,
                "stored id does not match typeclass/typename/supertype",
            ));
        }
        if def.supertype() != record.supertype.as_ref() {
            return Err(corrupt(record, "unexpected supertype"));
        }
        Ok(def)
    }
}

fn required_args(record: &TypeRecord) -> Result<&str> {
    record
        .args
        .as_deref()
        .ok_or_else(|| corrupt(record, "missing args"))
}

fn corrupt(record: &TypeRecord, reason: &str) -> ScholiaError {
    ScholiaError::CorruptRecord {
        id: record.id.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title() -> TypeDef {
        TypeDef::attribute("article.title", true, PrimitiveKind::String).expect("attribute")
    }

    fn year() -> TypeDef {
        TypeDef::attribute("article.year", false, PrimitiveKind::Number).expect("attribute")
    }

    #[test]
    fn identity_ignores_args() {
        let a = TypeDef::concept("article", &[&title()]).expect("concept");
        let b = TypeDef::concept("article", &[&title(), &year()]).expect("concept");
        assert_eq!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn identity_depends_on_typeclass() {
        let article = TypeDef::concept("article", &[&title()]).expect("concept");
        let rel = TypeDef::instance_rel("cites", &article, &article, &[]).expect("rel");
        let shadow = rel.shadow_type_rel().expect("shadow");
        assert_eq!(shadow.typename(), rel.typename());
        assert_eq!(shadow.typeclass(), TypeClass::TypeRel);
        assert_ne!(shadow.id(), rel.id());
        assert_eq!(shadow.rel_args(), rel.rel_args());
    }

    #[test]
    fn supertypes_follow_the_meta_types() {
        assert_eq!(title().supertype(), Some(meta::attribute_type().id()));
        let article = TypeDef::concept("article", &[&title()]).expect("concept");
        assert_eq!(article.supertype(), Some(meta::concept_type().id()));
        let entity = TypeDef::entity("article", &article).expect("entity");
        assert_eq!(entity.supertype(), Some(meta::entity_type().id()));
    }

    #[test]
    fn args_encoding() {
        let t = title();
        let record = t.to_record();
        let value_type = meta::primitive(PrimitiveKind::String).id();
        assert_eq!(record.args, Some(format!("true/{}", value_type)));

        let article = TypeDef::concept("article", &[&t, &year()]).expect("concept");
        assert_eq!(
            article.to_record().args,
            Some(format!("{}/{}", t.id(), year().id()))
        );

        let rel = TypeDef::instance_rel("cites", &article, &article, &[&t]).expect("rel");
        assert_eq!(
            rel.to_record().args,
            Some(format!("{}/{}!{}", article.id(), article.id(), t.id()))
        );
    }

    #[test]
    fn records_rebuild_every_variant() {
        let t = title();
        let article = TypeDef::concept("article", &[&t, &year()]).expect("concept");
        let entity = TypeDef::entity("article", &article).expect("entity");
        let rel = TypeDef::instance_rel("cites", &article, &article, &[&t]).expect("rel");
        let shadow = rel.shadow_type_rel().expect("shadow");

        for def in [t, article, entity, rel, shadow] {
            let back = TypeDef::from_record(&def.to_record()).expect("rebuild");
            assert_eq!(back, def);
        }
    }

    #[test]
    fn meta_records_resolve_to_singletons() {
        let record = meta::concept_type().to_record();
        let back = TypeDef::from_record(&record).expect("rebuild");
        assert!(back.is_same(meta::concept_type()));

        let record = meta::primitive(PrimitiveKind::Boolean).to_record();
        let back = TypeDef::from_record(&record).expect("rebuild");
        assert!(back.is_same(meta::primitive(PrimitiveKind::Boolean)));
    }

    #[test]
    fn tampered_records_are_corrupt() {
        let mut record = title().to_record();
        record.typename = "article.subtitle".to_string();
        assert!(matches!(
            TypeDef::from_record(&record),
            Err(ScholiaError::CorruptRecord { .. })
        ));

        let mut record = title().to_record();
        record.args = Some("maybe/xyz".to_string());
        assert!(matches!(
            TypeDef::from_record(&record),
            Err(ScholiaError::CorruptRecord { .. })
        ));

        let mut record = title().to_record();
        record.args = None;
        assert!(TypeDef::from_record(&record).is_err());
    }

    #[test]
    fn constructors_validate_inputs() {
        assert!(TypeDef::attribute("", true, PrimitiveKind::String).is_err());
        let article = TypeDef::concept("article", &[&title()]).expect("concept");
        // A concept is not an attribute.
        assert!(TypeDef::concept("broken", &[&article]).is_err());
        // An attribute is not a rel endpoint.
        assert!(TypeDef::instance_rel("bad", &title(), &article, &[]).is_err());
        assert!(TypeDef::entity("bad", &title()).is_err());
    }

    #[test]
    fn rel_args_decode() {
        let args = RelArgs::decode("a/b!x@y").expect("decode");
        assert_eq!(args.from, Id::new("a"));
        assert_eq!(args.to, Id::new("b"));
        assert_eq!(args.attributes, vec![Id::new("x"), Id::new("y")]);

        let bare = RelArgs::decode("a/b").expect("decode");
        assert!(bare.attributes.is_empty());

        assert!(RelArgs::decode("ab!x").is_err());
        assert!(RelArgs::decode("/b!").is_err());
    }
}
