//! Dual-layer entity resolution and the improvement path.
//!
//! An abstract entity is a name only. Real entities (objects, algorithms,
//! problems, ...) realize it under their own concepts. No rel connects the
//! two layers: they are joined on the raw value of the first positional
//! attribute.

use super::{ADVANCE, Accumulator, INSTANCE_OF, ORIGIN, Subgraph, resolve};
use crate::primitives::{ID_LIST_SEPARATOR, decode_ids};
use crate::storage::{NodeRecord, RelFamily, StoreRead};
use crate::types::{Id, Result};
use std::collections::BTreeSet;

const REAL: &str = "real";
const ABSTRACT: &str = "abstract";
const IMPROVEMENT: &str = "improvement";

/// The concepts and rels the improvement walk runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImprovementSchema {
    /// Concept of abstract entities.
    pub abstract_concept: Id,
    /// Every concept whose nodes realize an abstract entity.
    pub real_concepts: Vec<Id>,
    /// InstanceRel improvement -> advanced abstract entity.
    pub advance: Id,
    /// InstanceRel improvement -> origin abstract entity.
    pub origin: Id,
}

/// Raw value of a node's first positional attribute.
fn join_key<S: StoreRead + ?Sized>(store: &S, node: &NodeRecord) -> Result<Option<String>> {
    let Some(first) = decode_ids(&node.attr, ID_LIST_SEPARATOR).into_iter().next() else {
        return Ok(None);
    };
    Ok(store.attribute_by_id(&first)?.map(|attr| attr.raw))
}

fn matching<S: StoreRead + ?Sized>(
    store: &S,
    concept: &Id,
    key: &str,
) -> Result<Vec<NodeRecord>> {
    let mut found = Vec::new();
    for node in store.nodes_by_type(concept)? {
        if join_key(store, &node)?.as_deref() == Some(key) {
            found.push(node);
        }
    }
    Ok(found)
}

fn abstract_of<S: StoreRead + ?Sized>(
    store: &S,
    schema: &ImprovementSchema,
    real: &NodeRecord,
) -> Result<Option<NodeRecord>> {
    let Some(key) = join_key(store, real)? else {
        return Ok(None);
    };
    Ok(matching(store, &schema.abstract_concept, &key)?
        .into_iter()
        .next())
}

fn reals_of<S: StoreRead + ?Sized>(
    store: &S,
    schema: &ImprovementSchema,
    abstract_node: &NodeRecord,
) -> Result<Vec<NodeRecord>> {
    let Some(key) = join_key(store, abstract_node)? else {
        return Ok(Vec::new());
    };
    let mut reals = Vec::new();
    for concept in &schema.real_concepts {
        reals.extend(matching(store, concept, &key)?);
    }
    Ok(reals)
}

/// The abstract entity a real entity realizes, if any.
pub fn find_abstract_entity<S: StoreRead + ?Sized>(
    store: &S,
    schema: &ImprovementSchema,
    real: &Id,
) -> Result<Option<NodeRecord>> {
    match store.node_by_id(real)? {
        Some(node) => abstract_of(store, schema, &node),
        None => Ok(None),
    }
}

/// Every real entity realizing an abstract entity, across all real concepts.
pub fn find_real_entities<S: StoreRead + ?Sized>(
    store: &S,
    schema: &ImprovementSchema,
    abstract_id: &Id,
) -> Result<Vec<NodeRecord>> {
    match store.node_by_id(abstract_id)? {
        Some(node) => reals_of(store, schema, &node),
        None => Ok(Vec::new()),
    }
}

/// Walk improvements backwards from a real entity.
///
/// Starting at the abstract counterpart of `real_start`, every improvement
/// advancing an abstract entity is emitted, then its origin entities, then
/// the real realizations of each origin, repeating from each origin. Only
/// abstract entities guard against cycles.
///
/// Edges: real -> abstract (`instanceOf`), improvement -> abstract
/// (`advance`), origin -> improvement (`origin`).
pub fn improvement_path<S: StoreRead + ?Sized>(
    store: &S,
    schema: &ImprovementSchema,
    real_start: &Id,
) -> Result<Subgraph> {
    let mut acc = Accumulator::default();
    let Some(real) = store.node_by_id(real_start)? else {
        return Ok(acc.finish());
    };
    acc.visit(&real, Some(REAL));
    let Some(start) = abstract_of(store, schema, &real)? else {
        return Ok(acc.finish());
    };
    acc.visit(&start, Some(ABSTRACT));
    acc.edge(&real.id, &start.id, INSTANCE_OF);

    let mut expanded: BTreeSet<Id> = BTreeSet::new();
    expanded.insert(start.id.clone());
    let mut pending = vec![start];

    while let Some(entity) = pending.pop() {
        for advance in store.rels_by_to(RelFamily::Instance, &schema.advance, &entity.id)? {
            let Some(improvement) = resolve(store, &advance.fromid, &advance.id)? else {
                continue;
            };
            acc.visit(&improvement, Some(IMPROVEMENT));
            acc.edge(&improvement.id, &entity.id, ADVANCE);

            for origin_rel in
                store.rels_by_from(RelFamily::Instance, &schema.origin, &improvement.id)?
            {
                let Some(origin) = resolve(store, &origin_rel.toid, &origin_rel.id)? else {
                    continue;
                };
                acc.visit(&origin, Some(ABSTRACT));
                acc.edge(&origin.id, &improvement.id, ORIGIN);

                if expanded.insert(origin.id.clone()) {
                    for realization in reals_of(store, schema, &origin)? {
                        acc.visit(&realization, Some(REAL));
                        acc.edge(&realization.id, &origin.id, INSTANCE_OF);
                    }
                    pending.push(origin);
                }
            }
        }
    }
    Ok(acc.finish())
}
