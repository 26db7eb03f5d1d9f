//! Outgoing-only chain traversal ("evolution chains").

use super::{Accumulator, Subgraph, rel_kind, resolve};
use crate::storage::{RelFamily, StoreRead};
use crate::types::{Id, Result};

/// Follow outgoing rels of one type from `start`, depth first.
///
/// Each node is expanded at most once, so cycles terminate. Every edge
/// is still recorded, so a cycle shows up as a closing edge into a node
/// that is already in the result.
pub fn evolution_chain<S: StoreRead + ?Sized>(
    store: &S,
    start: &Id,
    rel_type: &Id,
) -> Result<Subgraph> {
    let mut acc = Accumulator::default();
    let Some(first) = store.node_by_id(start)? else {
        return Ok(acc.finish());
    };
    let kind = rel_kind(store, rel_type)?;

    acc.visit(&first, None);
    let mut stack = vec![
        store
            .rels_by_from(RelFamily::Instance, rel_type, &first.id)?
            .into_iter(),
    ];
    while let Some(frame) = stack.last_mut() {
        let Some(rel) = frame.next() else {
            stack.pop();
            continue;
        };
        let Some(target) = resolve(store, &rel.toid, &rel.id)? else {
            continue;
        };
        acc.edge(&rel.fromid, &target.id, &kind);
        if acc.visit(&target, None) {
            stack.push(
                store
                    .rels_by_from(RelFamily::Instance, rel_type, &target.id)?
                    .into_iter(),
            );
        }
    }
    Ok(acc.finish())
}
