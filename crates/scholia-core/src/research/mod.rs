//! # Research Knowledge Base
//!
//! The research catalog installed into a [`Session`], with the composite
//! writes and read-backs built on top of it:
//! - `directory`: authors, affiliations, domains, entities, improvements
//! - `articles`: articles with their references and signatures
//! - `evolution`: problems, definitions, contributions
//!
//! Every composite write runs in a single transaction. Traversal queries
//! are forwarded to [`crate::traversal`] with the catalog's rel types.

mod articles;
mod catalog;
mod directory;
mod evolution;

pub use articles::{
    ArticleInput, ArticleView, ReferenceInput, ReferenceView, SignatureInput, SignatureView,
};
pub use catalog::{
    AffiliationFields, ArticleFields, EntityRole, NamedFields, PersonFields, ReferenceFields,
    ResearchCatalog, SignatureFields,
};

use crate::schema::{SchemaRegistry, TypeDef};
use crate::session::Session;
use crate::storage::{NodeRecord, RedbStore, RelFamily, StoreRead, StoreWrite};
use crate::traversal::{self, Subgraph};
use crate::types::{Id, Result, ScholiaError};
use std::path::Path;

/// A session over the research catalog.
#[derive(Debug)]
pub struct KnowledgeBase<S = RedbStore> {
    session: Session<S>,
    catalog: ResearchCatalog,
}

impl KnowledgeBase<RedbStore> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(RedbStore::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(RedbStore::in_memory()?)
    }
}

impl<S: StoreWrite> KnowledgeBase<S> {
    /// Register the catalog and install it into `store`.
    pub fn new(store: S) -> Result<Self> {
        let mut registry = SchemaRegistry::new();
        let catalog = ResearchCatalog::register(&mut registry)?;
        Ok(Self {
            session: Session::new(store, registry)?,
            catalog,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    #[must_use]
    pub fn store(&self) -> &S {
        self.session.store()
    }

    #[must_use]
    pub fn catalog(&self) -> &ResearchCatalog {
        &self.catalog
    }

    // -------------------------------------------------------------------------
    // Traversals
    // -------------------------------------------------------------------------

    /// Entities reachable from `start` over `evolve`.
    pub fn evolution_chain(&self, start: &Id) -> Result<Subgraph> {
        traversal::evolution_chain(self.store(), start, self.catalog.evolve.id())
    }

    pub fn improvement_path(&self, real_start: &Id) -> Result<Subgraph> {
        traversal::improvement_path(self.store(), &self.catalog.improvement_schema(), real_start)
    }

    pub fn definitions_and_solutions(&self, problem: &Id) -> Result<Subgraph> {
        traversal::definitions_and_solutions(
            self.store(),
            &self.catalog.solution_schema(),
            problem,
        )
    }

    /// One hop over every catalog relation.
    pub fn neighborhood(&self, node: &Id) -> Result<Subgraph> {
        traversal::neighborhood(self.store(), node, &self.catalog.neighborhood_relations())
    }

    pub fn find_abstract_entity(&self, real: &Id) -> Result<Option<NodeRecord>> {
        traversal::find_abstract_entity(self.store(), &self.catalog.improvement_schema(), real)
    }

    pub fn find_real_entities(&self, abstract_id: &Id) -> Result<Vec<NodeRecord>> {
        traversal::find_real_entities(self.store(), &self.catalog.improvement_schema(), abstract_id)
    }
}

// =============================================================================
// SHARED LOOKUPS
// =============================================================================

/// The node `id`, which must exist and be of `concept`.
fn require_of<S: StoreRead + ?Sized>(
    store: &S,
    id: &Id,
    concept: &TypeDef,
) -> Result<NodeRecord> {
    match store.node_by_id(id)? {
        Some(node) if &node.type_id == concept.id() => Ok(node),
        Some(node) => Err(ScholiaError::PreconditionFailed(format!(
            "node {} is a {}, expected {}",
            id,
            node.type_id,
            concept.typename()
        ))),
        None => Err(ScholiaError::PreconditionFailed(format!(
            "{} {} does not exist",
            concept.typename(),
            id
        ))),
    }
}

/// Nodes at the far end of `rel_type` rels leaving `from`, ordered by name.
fn targets<S: StoreRead + ?Sized>(
    store: &S,
    rel_type: &TypeDef,
    from: &Id,
) -> Result<Vec<NodeRecord>> {
    let mut nodes = Vec::new();
    for rel in store.rels_by_from(RelFamily::Instance, rel_type.id(), from)? {
        nodes.extend(store.node_by_id(&rel.toid)?);
    }
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(nodes)
}

/// Nodes at the near end of `rel_type` rels entering `to`, ordered by name.
fn sources<S: StoreRead + ?Sized>(
    store: &S,
    rel_type: &TypeDef,
    to: &Id,
) -> Result<Vec<NodeRecord>> {
    let mut nodes = Vec::new();
    for rel in store.rels_by_to(RelFamily::Instance, rel_type.id(), to)? {
        nodes.extend(store.node_by_id(&rel.fromid)?);
    }
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Transactional;

    #[test]
    fn reopening_keeps_the_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kb.redb");
        let types = {
            let kb = KnowledgeBase::open(&path).expect("open");
            kb.store().counts().expect("counts").types
        };
        let kb = KnowledgeBase::open(&path).expect("reopen");
        let counts = kb.store().counts().expect("counts");
        assert_eq!(counts.types, types);
        assert_eq!(counts.type_rels, 10);
        assert!(!kb.store().in_transaction());
        let loaded = SchemaRegistry::load(kb.store()).expect("load");
        assert_eq!(loaded.len(), kb.session().registry().len());
    }

    #[test]
    fn require_of_checks_concept() {
        let mut kb = KnowledgeBase::in_memory().expect("kb");
        let author = kb
            .add_author(PersonFields {
                name: "Ada".to_string(),
                email: None,
            })
            .expect("author");
        let catalog = kb.catalog().clone();
        assert!(require_of(kb.store(), &author, &catalog.author).is_ok());
        assert!(matches!(
            require_of(kb.store(), &author, &catalog.domain),
            Err(ScholiaError::PreconditionFailed(_))
        ));
        assert!(matches!(
            require_of(kb.store(), &Id::new("ghost"), &catalog.author),
            Err(ScholiaError::PreconditionFailed(_))
        ));
    }
}
