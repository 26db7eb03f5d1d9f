//! # Schema Registry
//!
//! The in-memory catalog of every type a session knows about.
//!
//! - Seeded with the eight built-ins
//! - `register` checks that every referenced type is already known, so
//!   registration order is dependency order
//! - Each InstanceRel gets exactly one shadow TypeRel, built when the
//!   InstanceRel is registered and kept in an explicit map keyed by the
//!   InstanceRel id

use super::meta;
use super::typeclass::TypeClass;
use super::typedef::{TypeDef, TypeKind};
use crate::instance::{AttributeInstance, Rel};
use crate::primitives::Value;
use crate::storage::{RelFamily, StoreRead, StoreWrite, atomically};
use crate::types::{Id, Result, ScholiaError};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Registered types, in registration order.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    types: BTreeMap<Id, TypeDef>,
    names: BTreeMap<(TypeClass, String), Id>,
    order: Vec<Id>,
    /// InstanceRel id -> its shadow TypeRel.
    shadows: BTreeMap<Id, TypeDef>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// A registry holding only the built-in types.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            types: BTreeMap::new(),
            names: BTreeMap::new(),
            order: Vec::new(),
            shadows: BTreeMap::new(),
        };
        for def in meta::builtins() {
            registry.insert(def.clone());
        }
        registry
    }

    fn insert(&mut self, def: TypeDef) {
        let id = def.id().clone();
        self.names
            .insert((def.typeclass(), def.typename().to_string()), id.clone());
        if self.types.insert(id.clone(), def).is_none() {
            self.order.push(id);
        }
    }

    /// Register a type.
    ///
    /// Re-registering an identical definition is a no-op. Re-registering
    /// the same id with different args replaces the definition in place.
    pub fn register(&mut self, def: TypeDef) -> Result<TypeDef> {
        if def.typeclass().is_meta() || def.typeclass() == TypeClass::Primitive {
            return Err(ScholiaError::InvalidType(format!(
                "built-in type '{}' cannot be registered",
                def.typename()
            )));
        }
        if let Some(owner) = self
            .names
            .get(&(def.typeclass(), def.typename().to_string()))
        {
            if owner != def.id() {
                return Err(ScholiaError::ConstraintViolation(format!(
                    "{} '{}' is already registered",
                    def.typeclass(),
                    def.typename()
                )));
            }
        }
        self.check_references(&def)?;

        if let Some(shadow) = def.shadow_type_rel() {
            self.insert(shadow.clone());
            self.shadows.insert(def.id().clone(), shadow);
        }
        debug!(typeclass = %def.typeclass(), typename = def.typename(), "type registered");
        self.insert(def.clone());
        Ok(def)
    }

    fn check_references(&self, def: &TypeDef) -> Result<()> {
        let check = |id: &Id, classes: &[TypeClass], role: &str| -> Result<()> {
            match self.types.get(id) {
                Some(found) if classes.contains(&found.typeclass()) => Ok(()),
                Some(found) => Err(ScholiaError::InvalidType(format!(
                    "{} of '{}' is a {}",
                    role,
                    def.typename(),
                    found.typeclass()
                ))),
                None => Err(ScholiaError::NotFound(format!(
                    "{} {} of '{}' is not registered",
                    role,
                    id,
                    def.typename()
                ))),
            }
        };
        match def.kind() {
            TypeKind::ConceptType
            | TypeKind::AttributeType
            | TypeKind::EntityType
            | TypeKind::RelType
            | TypeKind::Primitive(_) => Ok(()),
            TypeKind::Attribute { value_type, .. } => {
                check(value_type, &[TypeClass::Primitive], "value type")
            }
            TypeKind::Concept { attributes } => attributes
                .iter()
                .try_for_each(|a| check(a, &[TypeClass::Attribute], "attribute")),
            TypeKind::Entity { concept } => check(concept, &[TypeClass::Concept], "concept"),
            TypeKind::TypeRel(args) | TypeKind::InstanceRel(args) => {
                let endpoint = [TypeClass::Concept, TypeClass::Entity];
                check(&args.from, &endpoint, "source")?;
                check(&args.to, &endpoint, "target")?;
                args.attributes
                    .iter()
                    .try_for_each(|a| check(a, &[TypeClass::Attribute], "attribute"))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn get(&self, id: &Id) -> Option<&TypeDef> {
        self.types.get(id)
    }

    #[must_use]
    pub fn by_name(&self, class: TypeClass, typename: &str) -> Option<&TypeDef> {
        self.names
            .get(&(class, typename.to_string()))
            .and_then(|id| self.types.get(id))
    }

    /// Like [`SchemaRegistry::by_name`], failing with `NotFound`.
    pub fn require(&self, class: TypeClass, typename: &str) -> Result<&TypeDef> {
        self.by_name(class, typename).ok_or_else(|| {
            ScholiaError::NotFound(format!("{} '{}' is not registered", class, typename))
        })
    }

    /// The shadow TypeRel of a registered InstanceRel.
    #[must_use]
    pub fn shadow_of(&self, instance_rel: &Id) -> Option<&TypeDef> {
        self.shadows.get(instance_rel)
    }

    /// Concepts marked by an Entity, in registration order.
    #[must_use]
    pub fn entity_concepts(&self) -> Vec<&TypeDef> {
        self.iter()
            .filter_map(|def| match def.kind() {
                TypeKind::Entity { concept } => self.types.get(concept),
                _ => None,
            })
            .collect()
    }

    /// Every registered type, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.order.iter().filter_map(|id| self.types.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(field name, attribute type)` pairs of a concept, in declared
    /// order. The field name is the attribute typename after its last `.`.
    pub fn layout(&self, concept: &TypeDef) -> Result<Vec<(&str, &TypeDef)>> {
        concept.expect_class(TypeClass::Concept)?;
        concept
            .concept_attributes()
            .iter()
            .map(|id| {
                let attr = self.types.get(id).ok_or_else(|| {
                    ScholiaError::NotFound(format!("attribute {} is not registered", id))
                })?;
                let field = attr
                    .typename()
                    .rsplit('.')
                    .next()
                    .unwrap_or(attr.typename());
                Ok((field, attr))
            })
            .collect()
    }

    /// Build fresh attribute instances for a concept's positional values.
    pub fn instantiate(
        &self,
        concept: &TypeDef,
        values: Vec<Value>,
    ) -> Result<Vec<AttributeInstance>> {
        let layout = self.layout(concept)?;
        if layout.len() != values.len() {
            return Err(ScholiaError::PreconditionFailed(format!(
                "concept '{}' has {} attributes, got {} values",
                concept.typename(),
                layout.len(),
                values.len()
            )));
        }
        layout
            .into_iter()
            .zip(values)
            .map(|((_, attr), value)| AttributeInstance::new(attr, value))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Merge every registered type into the store, plus one typerel row
    /// per InstanceRel linking its endpoint types, in one transaction.
    pub fn install<S: StoreWrite + ?Sized>(&self, store: &mut S) -> Result<()> {
        atomically(store, |store| {
            for def in self.iter() {
                store.merge_type(&def.to_record())?;
            }
            for (rel_id, shadow) in &self.shadows {
                let Some(args) = shadow.rel_args() else {
                    continue;
                };
                let name = format!("{}_{}_{}", args.from, shadow.typename(), args.to);
                let row = Rel::new(shadow, &name, args.from.clone(), args.to.clone())?;
                store.merge_rel(RelFamily::Schema, &row.to_record())?;
                debug!(instance_rel = %rel_id, "shadow typerel installed");
            }
            Ok(())
        })?;
        info!(types = self.len(), shadows = self.shadows.len(), "schema installed");
        Ok(())
    }

    /// Rebuild a registry from the type records of a store.
    pub fn load<S: StoreRead + ?Sized>(store: &S) -> Result<Self> {
        let mut registry = Self::new();
        for class in TypeClass::ALL {
            for record in store.types_by_class(class)? {
                let def = TypeDef::from_record(&record)?;
                if registry.types.get(def.id()) == Some(&def) {
                    continue;
                }
                registry.register(def)?;
            }
        }
        debug!(types = registry.len(), "schema loaded");
        Ok(registry)
    }
}
