//! The closed set of typeclasses a stored type record can carry.

use crate::types::{Result, ScholiaError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a type record.
///
/// The wire strings are part of the persisted layout and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeClass {
    ConceptType,
    AttributeType,
    EntityType,
    RelType,
    Primitive,
    Attribute,
    Concept,
    Entity,
    TypeRel,
    InstanceRel,
}

impl TypeClass {
    /// Every typeclass, ordered so that a type only ever references
    /// typeclasses listed before it.
    pub const ALL: [Self; 10] = [
        Self::ConceptType,
        Self::AttributeType,
        Self::EntityType,
        Self::RelType,
        Self::Primitive,
        Self::Attribute,
        Self::Concept,
        Self::Entity,
        Self::TypeRel,
        Self::InstanceRel,
    ];

    /// The persisted string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConceptType => "conceptType",
            Self::AttributeType => "attributeType",
            Self::EntityType => "entityType",
            Self::RelType => "relType",
            Self::Primitive => "primitive",
            Self::Attribute => "attribute",
            Self::Concept => "concept",
            Self::Entity => "entity",
            Self::TypeRel => "typeRel",
            Self::InstanceRel => "instanceRel",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == raw)
            .ok_or_else(|| ScholiaError::InvalidType(format!("unknown typeclass '{}'", raw)))
    }

    /// Whether this is one of the four meta-type classes.
    #[must_use]
    pub const fn is_meta(self) -> bool {
        matches!(
            self,
            Self::ConceptType | Self::AttributeType | Self::EntityType | Self::RelType
        )
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_round_trip() {
        for class in TypeClass::ALL {
            assert_eq!(TypeClass::parse(class.as_str()).expect("parse"), class);
        }
    }

    #[test]
    fn unknown_typeclass_is_rejected() {
        assert!(matches!(
            TypeClass::parse("Concept"),
            Err(ScholiaError::InvalidType(_))
        ));
    }

    #[test]
    fn meta_classes() {
        let meta: Vec<_> = TypeClass::ALL.into_iter().filter(|c| c.is_meta()).collect();
        assert_eq!(meta.len(), 4);
        assert!(!TypeClass::InstanceRel.is_meta());
    }
}
