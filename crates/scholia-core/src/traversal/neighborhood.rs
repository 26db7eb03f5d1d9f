//! One-hop neighborhood over an enumerated set of relations.

use super::{Accumulator, Subgraph, resolve};
use crate::storage::{RelFamily, StoreRead};
use crate::types::{Id, Result};

/// A relation to follow and the label its neighbors get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLabel {
    pub rel_type: Id,
    pub label: String,
}

impl RelationLabel {
    #[must_use]
    pub fn new(rel_type: Id, label: impl Into<String>) -> Self {
        Self {
            rel_type,
            label: label.into(),
        }
    }
}

/// Every node one outgoing or incoming edge away from `node`, over the
/// given relations.
///
/// A neighbor reached through several relations is emitted once, labelled
/// by the first relation that reached it. Every traversed edge is recorded
/// once with its relation's label as kind; a self-loop counts as outgoing.
pub fn neighborhood<S: StoreRead + ?Sized>(
    store: &S,
    node: &Id,
    relations: &[RelationLabel],
) -> Result<Subgraph> {
    let mut acc = Accumulator::default();
    let Some(center) = store.node_by_id(node)? else {
        return Ok(acc.finish());
    };
    acc.visit(&center, None);

    for relation in relations {
        for rel in store.rels_by_from(RelFamily::Instance, &relation.rel_type, &center.id)? {
            if let Some(target) = resolve(store, &rel.toid, &rel.id)? {
                acc.edge(&center.id, &target.id, &relation.label);
                acc.visit(&target, Some(&relation.label));
            }
        }
        for rel in store.rels_by_to(RelFamily::Instance, &relation.rel_type, &center.id)? {
            if rel.fromid == rel.toid {
                continue;
            }
            if let Some(source) = resolve(store, &rel.fromid, &rel.id)? {
                acc.edge(&source.id, &center.id, &relation.label);
                acc.visit(&source, Some(&relation.label));
            }
        }
    }
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal::fixtures::Graph;

    #[test]
    fn collects_both_directions_with_labels() {
        let mut g = Graph::new();
        let (item, step) = (g.item.clone(), g.step.clone());
        let center = g.node(&item, "center", "center");
        let next = g.node(&item, "next", "next");
        let prev = g.node(&item, "prev", "prev");
        let far = g.node(&item, "far", "far");
        g.link(&step, &center, &next);
        g.link(&step, &prev, &center);
        g.link(&step, &next, &far);

        let relations = [RelationLabel::new(step.id().clone(), "evolves")];
        let result = neighborhood(&g.store, &center, &relations).expect("neighborhood");
        assert_eq!(result.nodes.len(), 3);
        assert!(!result.contains_node(&far));
        assert_eq!(result.nodes[0].label, None);
        assert!(
            result.nodes[1..]
                .iter()
                .all(|n| n.label.as_deref() == Some("evolves"))
        );
    }

    #[test]
    fn neighbors_are_deduplicated() {
        let mut g = Graph::new();
        let (item, step) = (g.item.clone(), g.step.clone());
        let a = g.node(&item, "a", "a");
        let b = g.node(&item, "b", "b");
        g.link(&step, &a, &b);
        g.link(&step, &b, &a);

        let relations = [RelationLabel::new(step.id().clone(), "step")];
        let result = neighborhood(&g.store, &a, &relations).expect("neighborhood");
        assert_eq!(result.node_ids(), vec![&a, &b]);
        assert_eq!(result.edges.len(), 2);
    }

    #[test]
    fn self_loop_is_one_edge() {
        let mut g = Graph::new();
        let (item, step) = (g.item.clone(), g.step.clone());
        let a = g.node(&item, "a", "a");
        g.link(&step, &a, &a);

        let relations = [RelationLabel::new(step.id().clone(), "step")];
        let result = neighborhood(&g.store, &a, &relations).expect("neighborhood");
        assert_eq!(result.node_ids(), vec![&a]);
        assert_eq!(result.edges.len(), 1);
        assert_eq!((&result.edges[0].from, &result.edges[0].to), (&a, &a));
    }

    #[test]
    fn unlisted_relations_are_ignored() {
        let mut g = Graph::new();
        let (item, step) = (g.item.clone(), g.step.clone());
        let a = g.node(&item, "a", "a");
        let b = g.node(&item, "b", "b");
        g.link(&step, &a, &b);

        let result = neighborhood(&g.store, &a, &[]).expect("neighborhood");
        assert_eq!(result.node_ids(), vec![&a]);
    }

    #[test]
    fn dangling_neighbor_is_dropped() {
        let mut g = Graph::new();
        let (item, step) = (g.item.clone(), g.step.clone());
        let a = g.node(&item, "a", "a");
        let b = g.node(&item, "b", "b");
        g.link(&step, &a, &b);
        g.remove(&b);

        let relations = [RelationLabel::new(step.id().clone(), "step")];
        let result = neighborhood(&g.store, &a, &relations).expect("neighborhood");
        assert_eq!(result.node_ids(), vec![&a]);
        assert!(result.edges.is_empty());
    }
}
