//! Standalone records: authors, affiliations, domains, entities and the
//! improvements linking them.
//!
//! Node names are the `name` field, so adding the same name twice under one
//! concept is a `PreconditionFailed`.

use super::catalog::{AffiliationFields, EntityRole, NamedFields, PersonFields};
use super::{KnowledgeBase, require_of};
use crate::schema::{ConceptFields, TypeDef};
use crate::storage::StoreWrite;
use crate::types::{Id, Result};
use tracing::info;

impl<S: StoreWrite> KnowledgeBase<S> {
    fn add_named<F: ConceptFields>(
        &mut self,
        concept: &TypeDef,
        name: &str,
        fields: F,
    ) -> Result<Id> {
        let node = self.session.write(|tx| tx.create(concept, name, fields))?;
        info!(concept = concept.typename(), node = %node.id(), "record added");
        Ok(node.id().clone())
    }

    pub fn add_author(&mut self, fields: PersonFields) -> Result<Id> {
        let concept = self.catalog.author.clone();
        let name = fields.name.clone();
        self.add_named(&concept, &name, fields)
    }

    pub fn add_affiliation(&mut self, fields: AffiliationFields) -> Result<Id> {
        let concept = self.catalog.affiliation.clone();
        let name = fields.name.clone();
        self.add_named(&concept, &name, fields)
    }

    pub fn add_domain(&mut self, fields: NamedFields) -> Result<Id> {
        let concept = self.catalog.domain.clone();
        let name = fields.name.clone();
        self.add_named(&concept, &name, fields)
    }

    /// Add an abstract entity, a real entity or a bare improvement.
    pub fn add_entity(&mut self, role: EntityRole, fields: NamedFields) -> Result<Id> {
        let concept = self.catalog.concept_of(role).clone();
        let name = fields.name.clone();
        self.add_named(&concept, &name, fields)
    }

    /// Record that abstract entity `from` evolved into `to`.
    pub fn link_evolution(&mut self, from: &Id, to: &Id) -> Result<Id> {
        let evolve = &self.catalog.evolve;
        let rel = self.session.write(|tx| tx.link(evolve, from, to))?;
        Ok(rel.id().clone())
    }

    /// Add an improvement advancing abstract entity `target`, built on
    /// the abstract entities in `origins`.
    pub fn link_improvement(
        &mut self,
        fields: NamedFields,
        target: &Id,
        origins: &[Id],
    ) -> Result<Id> {
        let catalog = &self.catalog;
        let name = fields.name.clone();
        let improvement = self.session.write(|tx| {
            require_of(tx.store(), target, &catalog.entity)?;
            let node = tx.create(&catalog.improvement, &name, fields)?;
            tx.link(&catalog.advance, node.id(), target)?;
            for origin in origins {
                tx.link(&catalog.origin, node.id(), origin)?;
            }
            Ok(node.id().clone())
        })?;
        info!(improvement = %improvement, origins = origins.len(), "improvement linked");
        Ok(improvement)
    }
}
