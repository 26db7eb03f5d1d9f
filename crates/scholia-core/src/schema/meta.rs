//! # Meta-Types
//!
//! The four meta-types (`ConceptType`, `AttributeType`, `EntityType`,
//! `RelType`) and the four primitive value types are process-wide
//! constants, built exactly once on first use. There is no public
//! constructor for them; every other component compares against these
//! instances by id.

use super::typedef::{TypeDef, TypeKind};
use crate::primitives::PrimitiveKind;
use crate::types::Id;
use std::sync::LazyLock;

struct MetaTypes {
    concept_type: TypeDef,
    attribute_type: TypeDef,
    entity_type: TypeDef,
    rel_type: TypeDef,
    /// Indexed in `PrimitiveKind::ALL` order.
    primitives: [TypeDef; 4],
}

static META: LazyLock<MetaTypes> = LazyLock::new(|| MetaTypes {
    concept_type: TypeDef::build(TypeKind::ConceptType, "ConceptType"),
    attribute_type: TypeDef::build(TypeKind::AttributeType, "AttributeType"),
    entity_type: TypeDef::build(TypeKind::EntityType, "EntityType"),
    rel_type: TypeDef::build(TypeKind::RelType, "RelType"),
    primitives: PrimitiveKind::ALL
        .map(|kind| TypeDef::build(TypeKind::Primitive(kind), kind.typename())),
});

/// The supertype of every Concept.
pub fn concept_type() -> &'static TypeDef {
    &META.concept_type
}

/// The supertype of every Attribute.
pub fn attribute_type() -> &'static TypeDef {
    &META.attribute_type
}

/// The supertype of every Entity.
pub fn entity_type() -> &'static TypeDef {
    &META.entity_type
}

/// The supertype of every TypeRel and InstanceRel.
pub fn rel_type() -> &'static TypeDef {
    &META.rel_type
}

/// The stored type of a primitive value kind.
pub fn primitive(kind: PrimitiveKind) -> &'static TypeDef {
    let index = match kind {
        PrimitiveKind::Number => 0,
        PrimitiveKind::String => 1,
        PrimitiveKind::Boolean => 2,
        PrimitiveKind::Void => 3,
    };
    &META.primitives[index]
}

/// Resolve a primitive type id back to its kind.
pub fn primitive_kind_of(id: &Id) -> Option<PrimitiveKind> {
    PrimitiveKind::ALL
        .into_iter()
        .find(|kind| primitive(*kind).id() == id)
}

/// All eight built-in types, meta-types first.
pub fn builtins() -> Vec<&'static TypeDef> {
    let mut all = vec![concept_type(), attribute_type(), entity_type(), rel_type()];
    all.extend(META.primitives.iter());
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeClass;

    #[test]
    fn singletons_are_shared() {
        assert!(concept_type().is_same(concept_type()));
        let cloned = rel_type().clone();
        assert!(cloned.is_same(rel_type()));
    }

    #[test]
    fn meta_types_have_no_supertype() {
        for def in builtins() {
            assert!(def.supertype().is_none());
            assert!(def.to_record().args.is_none());
        }
    }

    #[test]
    fn builtin_ids_are_distinct() {
        let mut ids: Vec<_> = builtins().into_iter().map(|d| d.id().clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn primitive_lookup_by_id() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(primitive_kind_of(primitive(kind).id()), Some(kind));
            assert_eq!(primitive(kind).typeclass(), TypeClass::Primitive);
        }
        assert_eq!(primitive_kind_of(concept_type().id()), None);
    }
}
