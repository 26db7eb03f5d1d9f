//! Two-level reverse path discovery ("definitions and solutions").

use super::{Accumulator, Subgraph, rel_kind, resolve};
use crate::storage::{RelFamily, StoreRead};
use crate::types::{Id, Result};

/// The rels the solution walk runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionSchema {
    /// InstanceRel definition -> problem.
    pub refine: Id,
    /// InstanceRel contribution -> definition.
    pub solution_to: Id,
}

/// Definitions refining `problem`, then contributions solving each of them.
///
/// Exactly two reverse hops, no recursion. Both hops share one `visited`
/// set, so a contribution solving two definitions appears once with both
/// edges.
pub fn definitions_and_solutions<S: StoreRead + ?Sized>(
    store: &S,
    schema: &SolutionSchema,
    problem: &Id,
) -> Result<Subgraph> {
    let mut acc = Accumulator::default();
    let Some(problem) = store.node_by_id(problem)? else {
        return Ok(acc.finish());
    };
    let refine = rel_kind(store, &schema.refine)?;
    let solution_to = rel_kind(store, &schema.solution_to)?;
    acc.visit(&problem, None);

    let mut definitions = Vec::new();
    for rel in store.rels_by_to(RelFamily::Instance, &schema.refine, &problem.id)? {
        let Some(definition) = resolve(store, &rel.fromid, &rel.id)? else {
            continue;
        };
        acc.edge(&definition.id, &problem.id, &refine);
        if acc.visit(&definition, None) {
            definitions.push(definition.id);
        }
    }

    for definition in &definitions {
        for rel in store.rels_by_to(RelFamily::Instance, &schema.solution_to, definition)? {
            let Some(contribution) = resolve(store, &rel.fromid, &rel.id)? else {
                continue;
            };
            acc.edge(&contribution.id, definition, &solution_to);
            acc.visit(&contribution, None);
        }
    }
    Ok(acc.finish())
}
