//! # Graph Traversals
//!
//! Read-only walks over the `rel` family that answer the domain queries.
//! Every walk:
//! - Is generic over [`StoreRead`] and never mutates
//! - Returns an empty [`Subgraph`] when the start node does not exist
//! - Deduplicates nodes through one `visited` set, but records every edge,
//!   including edges back into already visited nodes
//! - Drops an edge whose endpoint node no longer resolves, together with
//!   that endpoint (logged at `trace`)

mod chain;
mod neighborhood;
mod paths;
mod resolution;

pub use chain::evolution_chain;
pub use neighborhood::{RelationLabel, neighborhood};
pub use paths::{SolutionSchema, definitions_and_solutions};
pub use resolution::{
    ImprovementSchema, find_abstract_entity, find_real_entities, improvement_path,
};

use crate::storage::{NodeRecord, StoreRead};
use crate::types::{Id, Result};
use serde::Serialize;
use std::collections::BTreeSet;

// =============================================================================
// EDGE KINDS
// =============================================================================

/// Real entity -> its abstract counterpart.
pub const INSTANCE_OF: &str = "instanceOf";

/// Improvement -> the abstract entity it advances.
pub const ADVANCE: &str = "advance";

/// Origin abstract entity -> the improvement built on it.
pub const ORIGIN: &str = "origin";

// =============================================================================
// RESULT SHAPES
// =============================================================================

/// A discovered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDescriptor {
    pub id: Id,
    pub node_type: Id,
    pub name: String,
    /// Role of the node in the walk, when the walk assigns one.
    pub label: Option<String>,
}

/// A traversed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeDescriptor {
    pub from: Id,
    pub to: Id,
    pub kind: String,
}

/// Nodes and edges in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<NodeDescriptor>,
    pub edges: Vec<EdgeDescriptor>,
}

impl Subgraph {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    #[must_use]
    pub fn contains_node(&self, id: &Id) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    /// Node ids, in discovery order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<&Id> {
        self.nodes.iter().map(|n| &n.id).collect()
    }
}

/// The two accumulators plus the `visited` set of one walk.
#[derive(Debug, Default)]
struct Accumulator {
    graph: Subgraph,
    visited: BTreeSet<Id>,
}

impl Accumulator {
    /// Emit `node` unless already visited. Returns whether it was new.
    fn visit(&mut self, node: &NodeRecord, label: Option<&str>) -> bool {
        if !self.visited.insert(node.id.clone()) {
            return false;
        }
        self.graph.nodes.push(NodeDescriptor {
            id: node.id.clone(),
            node_type: node.type_id.clone(),
            name: node.name.clone(),
            label: label.map(str::to_string),
        });
        true
    }

    fn edge(&mut self, from: &Id, to: &Id, kind: &str) {
        self.graph.edges.push(EdgeDescriptor {
            from: from.clone(),
            to: to.clone(),
            kind: kind.to_string(),
        });
    }

    fn finish(self) -> Subgraph {
        self.graph
    }
}

/// Edge kind for a rel type: its typename, or the raw id when the type
/// record is gone.
fn rel_kind<S: StoreRead + ?Sized>(store: &S, rel_type: &Id) -> Result<String> {
    Ok(store
        .type_by_id(rel_type)?
        .map(|record| record.typename)
        .unwrap_or_else(|| rel_type.to_string()))
}

/// Resolve an edge endpoint, logging a dangling reference.
fn resolve<S: StoreRead + ?Sized>(store: &S, id: &Id, via: &Id) -> Result<Option<NodeRecord>> {
    let node = store.node_by_id(id)?;
    if node.is_none() {
        tracing::trace!(node = %id, rel = %via, "skipping dangling edge");
    }
    Ok(node)
}
