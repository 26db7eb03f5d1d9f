//! Problems, the definitions refining them, and the contributions
//! solving those definitions.

use super::catalog::{EntityRole, NamedFields};
use super::{KnowledgeBase, require_of, sources};
use crate::storage::StoreWrite;
use crate::types::{Id, Result};
use tracing::info;

impl<S: StoreWrite> KnowledgeBase<S> {
    pub fn add_problem(&mut self, fields: NamedFields) -> Result<Id> {
        self.add_entity(EntityRole::Problem, fields)
    }

    /// Add a definition and its `refine` rel to `problem`.
    pub fn add_definition(&mut self, problem: &Id, fields: NamedFields) -> Result<Id> {
        let catalog = &self.catalog;
        let name = fields.name.clone();
        self.session.write(|tx| {
            let node = tx.create(&catalog.definition, &name, fields)?;
            tx.link(&catalog.refine, node.id(), problem)?;
            Ok(node.id().clone())
        })
    }

    /// Add a contribution and its `solutionTo` rel to `definition`.
    pub fn add_contribution(&mut self, definition: &Id, fields: NamedFields) -> Result<Id> {
        let catalog = &self.catalog;
        let name = fields.name.clone();
        self.session.write(|tx| {
            let node = tx.create(&catalog.contribution, &name, fields)?;
            tx.link(&catalog.solution_to, node.id(), definition)?;
            Ok(node.id().clone())
        })
    }

    /// Delete a problem and every definition refining it, with every rel
    /// touching any of them. Contributions stay, detached. Returns `false`
    /// if the problem does not exist.
    pub fn delete_problem(&mut self, problem: &Id) -> Result<bool> {
        let catalog = &self.catalog;
        let removed = self.session.write(|tx| {
            if tx.store().node_by_id(problem)?.is_none() {
                return Ok(None);
            }
            require_of(tx.store(), problem, &catalog.problem)?;
            let definitions = sources(tx.store(), &catalog.refine, problem)?;
            let mut rels = 0;
            for definition in &definitions {
                rels += tx.detach(&definition.id)?;
                tx.delete_node(&definition.id)?;
            }
            rels += tx.detach(problem)?;
            tx.delete_node(problem)?;
            Ok(Some((definitions.len(), rels)))
        })?;
        let Some((definitions, rels)) = removed else {
            return Ok(false);
        };
        info!(problem = %problem, definitions, rels, "problem deleted");
        Ok(true)
    }
}
