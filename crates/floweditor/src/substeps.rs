//! Sub-Step Store: floating node groups anchored to a container node.
//!
//! Node edits here use the same list operations as containers do, but never
//! touch the graph store.

use crate::nodes;
use flowcore::{EditError, Notifier, Position, SubStepContainer, WorkflowNode};

pub struct SubStepStore {
    sub_steps: Vec<SubStepContainer>,
    notifier: Notifier,
}

impl SubStepStore {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            sub_steps: Vec::new(),
            notifier,
        }
    }

    pub fn sub_steps(&self) -> &[SubStepContainer] {
        &self.sub_steps
    }

    pub fn get(&self, sub_step_id: &str) -> Option<&SubStepContainer> {
        self.sub_steps.iter().find(|s| s.id == sub_step_id)
    }

    pub fn len(&self) -> usize {
        self.sub_steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_steps.is_empty()
    }

    /// Sub-steps anchored to a specific node of a specific container
    pub fn for_parent(&self, container_id: &str, node_id: &str) -> Vec<&SubStepContainer> {
        self.sub_steps
            .iter()
            .filter(|s| s.anchored_to(container_id, node_id))
            .collect()
    }

    /// Add a sub-step; one with the same id already present wins
    pub fn add_sub_step_container(&mut self, sub_step: SubStepContainer) -> bool {
        if self.get(&sub_step.id).is_some() {
            return false;
        }
        tracing::debug!(
            id = %sub_step.id,
            parent = %sub_step.parent_node_id,
            "sub-step added"
        );
        self.sub_steps.push(sub_step);
        true
    }

    pub fn remove_sub_step_container(&mut self, sub_step_id: &str) -> Option<SubStepContainer> {
        let index = self.sub_steps.iter().position(|s| s.id == sub_step_id)?;
        Some(self.sub_steps.remove(index))
    }

    /// Edit name, description, position, expansion or replace the node list
    pub fn update_sub_step_container<F>(&mut self, sub_step_id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut SubStepContainer),
    {
        match self.sub_steps.iter_mut().find(|s| s.id == sub_step_id) {
            Some(sub_step) => {
                let id = sub_step.id.clone();
                edit(sub_step);
                sub_step.id = id;
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, sub_step_id: &str, position: Position) -> bool {
        self.update_sub_step_container(sub_step_id, |s| s.position = position)
    }

    pub fn toggle_expanded(&mut self, sub_step_id: &str) -> bool {
        self.update_sub_step_container(sub_step_id, |s| s.expanded = !s.expanded)
    }

    /// Remove every sub-step whose anchor matches `predicate`
    pub fn remove_where<P>(&mut self, mut predicate: P) -> Vec<SubStepContainer>
    where
        P: FnMut(&SubStepContainer) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sub_steps)
            .into_iter()
            .partition(|s| predicate(s));
        self.sub_steps = kept;
        removed
    }

    pub fn replace_all(&mut self, sub_steps: Vec<SubStepContainer>) {
        self.sub_steps = sub_steps;
    }

    pub fn clear(&mut self) {
        self.sub_steps.clear();
    }

    // ----- nodes inside a sub-step -----

    pub fn add_node_to_sub_step(
        &mut self,
        sub_step_id: &str,
        node: WorkflowNode,
        index: Option<usize>,
    ) -> Result<bool, EditError> {
        let Some(sub_step) = self.sub_steps.iter_mut().find(|s| s.id == sub_step_id) else {
            return Ok(false);
        };
        match nodes::insert(&mut sub_step.nodes, node, index, sub_step_id) {
            Ok(()) => Ok(true),
            Err(err) => {
                tracing::warn!(sub_step = sub_step_id, "sub-step edit rejected: {}", err);
                self.notifier.error(err.to_string());
                Err(err)
            }
        }
    }

    pub fn update_node_in_sub_step<F>(
        &mut self,
        sub_step_id: &str,
        node_id: &str,
        edit: F,
    ) -> Result<bool, EditError>
    where
        F: FnOnce(&mut WorkflowNode),
    {
        let Some(list) = self.nodes_mut(sub_step_id) else {
            return Ok(false);
        };
        match nodes::update_guarded(list, node_id, edit, sub_step_id) {
            Ok(changed) => Ok(changed),
            Err(err) => {
                tracing::warn!(sub_step = sub_step_id, "sub-step edit rejected: {}", err);
                self.notifier.error(err.to_string());
                Err(err)
            }
        }
    }

    pub fn remove_node_from_sub_step(
        &mut self,
        sub_step_id: &str,
        node_id: &str,
    ) -> Option<WorkflowNode> {
        self.nodes_mut(sub_step_id)
            .and_then(|list| nodes::remove(list, node_id))
    }

    pub fn toggle_node_in_sub_step(&mut self, sub_step_id: &str, node_id: &str) -> bool {
        self.nodes_mut(sub_step_id)
            .is_some_and(|list| nodes::toggle(list, node_id))
    }

    pub fn move_node_in_sub_step(&mut self, sub_step_id: &str, from: usize, to: usize) -> bool {
        self.nodes_mut(sub_step_id)
            .is_some_and(|list| nodes::reorder(list, from, to))
    }

    pub fn duplicate_node_in_sub_step(
        &mut self,
        sub_step_id: &str,
        node_id: &str,
    ) -> Result<Option<String>, EditError> {
        let Some(list) = self.nodes_mut(sub_step_id) else {
            return Ok(None);
        };
        match nodes::duplicate(list, node_id, sub_step_id) {
            Ok(id) => Ok(id),
            Err(err) => {
                self.notifier.error(err.to_string());
                Err(err)
            }
        }
    }

    fn nodes_mut(&mut self, sub_step_id: &str) -> Option<&mut Vec<WorkflowNode>> {
        self.sub_steps
            .iter_mut()
            .find(|s| s.id == sub_step_id)
            .map(|s| &mut s.nodes)
    }
}
