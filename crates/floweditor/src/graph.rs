//! Workflow Graph Store: triggers, containers, nodes, branches and form
//! fields, plus the undo/redo history that spans all of them.
//!
//! Stale ids never fail: a mutation that cannot find its target returns
//! `false`/`None` and records nothing. Guard violations (a second form node,
//! removing a protected branch, ...) return an [`EditError`] and publish an
//! error notification; the state is left as it was.

use crate::history::History;
use crate::nodes;
use crate::registry::Registries;
use flowcore::{
    Branch, ConditionalKind, Container, EditError, FormField, Notifier, Position, Route, Tool,
    Trigger, WorkflowNode, DEFAULT_BRANCH,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Everything the graph history snapshots.
///
/// Entities sit behind `Arc`s: cloning the state copies pointers, and an edit
/// deep-clones only the trigger or container it touches (`Arc::make_mut`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphState {
    pub workflow_name: String,
    pub triggers: Vec<Arc<Trigger>>,
    pub trigger_logic: Arc<Vec<Value>>,
    pub containers: Vec<Arc<Container>>,
    pub form_fields: Arc<Vec<FormField>>,
}

impl GraphState {
    pub fn from_parts(
        workflow_name: impl Into<String>,
        triggers: Vec<Trigger>,
        trigger_logic: Vec<Value>,
        containers: Vec<Container>,
        form_fields: Vec<FormField>,
    ) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            triggers: triggers.into_iter().map(Arc::new).collect(),
            trigger_logic: Arc::new(trigger_logic),
            containers: containers.into_iter().map(Arc::new).collect(),
            form_fields: Arc::new(form_fields),
        }
    }

    pub fn trigger(&self, trigger_id: &str) -> Option<&Trigger> {
        self.triggers
            .iter()
            .map(Arc::as_ref)
            .find(|t| t.id == trigger_id)
    }

    pub fn container(&self, container_id: &str) -> Option<&Container> {
        self.containers
            .iter()
            .map(Arc::as_ref)
            .find(|c| c.id == container_id)
    }

    /// Look a node up anywhere inside a container, branch nodes included
    pub fn find_node(&self, container_id: &str, node_id: &str) -> Option<&WorkflowNode> {
        self.container(container_id)?.find_node(node_id)
    }

    /// Ids of every trigger, trigger-chain node and container node
    pub fn entity_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for trigger in &self.triggers {
            ids.extend(trigger.entity_ids());
        }
        for container in &self.containers {
            ids.extend(container.node_ids());
        }
        ids
    }

    pub fn owned_triggers(&self) -> Vec<Trigger> {
        self.triggers.iter().map(|t| t.as_ref().clone()).collect()
    }

    pub fn owned_containers(&self) -> Vec<Container> {
        self.containers.iter().map(|c| c.as_ref().clone()).collect()
    }

    fn trigger_mut(&mut self, trigger_id: &str) -> Option<&mut Trigger> {
        self.triggers
            .iter_mut()
            .find(|t| t.id == trigger_id)
            .map(Arc::make_mut)
    }

    fn container_mut(&mut self, container_id: &str) -> Option<&mut Container> {
        self.containers
            .iter_mut()
            .find(|c| c.id == container_id)
            .map(Arc::make_mut)
    }

    /// Conditional node anywhere in the container.
    ///
    /// `Ok(None)` for stale ids, `Err` when the node exists but has no branches.
    fn conditional_mut(
        &mut self,
        container_id: &str,
        node_id: &str,
    ) -> Result<Option<&mut WorkflowNode>, EditError> {
        let exists = self
            .container(container_id)
            .and_then(|c| c.find_node(node_id))
            .map(|n| n.conditional_kind().is_some());
        match exists {
            None => Ok(None),
            Some(false) => Err(EditError::NotConditional {
                node_id: node_id.to_string(),
            }),
            Some(true) => Ok(self
                .container_mut(container_id)
                .and_then(|c| c.find_node_mut(node_id))),
        }
    }
}

pub struct GraphStore {
    state: GraphState,
    history: History<GraphState>,
    registries: Arc<Registries>,
    notifier: Notifier,
}

impl GraphStore {
    pub fn new(registries: Arc<Registries>, notifier: Notifier, history_limit: usize) -> Self {
        let state = GraphState::default();
        Self {
            history: History::new(state.clone(), history_limit),
            state,
            registries,
            notifier,
        }
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn workflow_name(&self) -> &str {
        &self.state.workflow_name
    }

    pub fn trigger(&self, trigger_id: &str) -> Option<&Trigger> {
        self.state.trigger(trigger_id)
    }

    pub fn container(&self, container_id: &str) -> Option<&Container> {
        self.state.container(container_id)
    }

    pub fn find_node(&self, container_id: &str, node_id: &str) -> Option<&WorkflowNode> {
        self.state.find_node(container_id, node_id)
    }

    /// Replace the whole state and restart history from it
    pub fn load(&mut self, state: GraphState) {
        self.history.reset(state.clone());
        self.state = state;
        tracing::info!(
            triggers = self.state.triggers.len(),
            containers = self.state.containers.len(),
            "graph state loaded"
        );
    }

    /// Reset to an empty workflow with empty history
    pub fn clear(&mut self) {
        self.load(GraphState::default());
    }

    // ----- history -----

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.state = snapshot.clone();
                tracing::debug!(position = self.history.position(), "undo");
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.state = snapshot.clone();
                tracing::debug!(position = self.history.position(), "redo");
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Run an infallible edit; record a snapshot only if it changed something
    fn apply<F>(&mut self, action: &'static str, edit: F) -> bool
    where
        F: FnOnce(&mut GraphState) -> bool,
    {
        let changed = edit(&mut self.state);
        if changed {
            self.history.record(self.state.clone());
            tracing::debug!(action, "graph mutation committed");
        }
        changed
    }

    /// Run a guarded edit. The closure must check guards before mutating.
    fn try_apply<F>(&mut self, action: &'static str, edit: F) -> Result<bool, EditError>
    where
        F: FnOnce(&mut GraphState) -> Result<bool, EditError>,
    {
        match edit(&mut self.state) {
            Ok(changed) => {
                if changed {
                    self.history.record(self.state.clone());
                    tracing::debug!(action, "graph mutation committed");
                }
                Ok(changed)
            }
            Err(err) => {
                tracing::warn!(action, "graph mutation rejected: {}", err);
                self.notifier.error(err.to_string());
                Err(err)
            }
        }
    }

    // ----- workflow -----

    pub fn set_workflow_name(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        self.apply("set_workflow_name", |state| {
            if state.workflow_name == name {
                return false;
            }
            state.workflow_name = name;
            true
        })
    }

    pub fn set_trigger_logic(&mut self, logic: Vec<Value>) -> bool {
        self.apply("set_trigger_logic", |state| {
            if *state.trigger_logic == logic {
                return false;
            }
            state.trigger_logic = Arc::new(logic);
            true
        })
    }

    // ----- triggers -----

    /// Append a trigger; a trigger with the same id already present wins
    pub fn add_trigger(&mut self, trigger: Trigger) -> bool {
        self.apply("add_trigger", |state| {
            if state.trigger(&trigger.id).is_some() {
                return false;
            }
            state.triggers.push(Arc::new(trigger));
            true
        })
    }

    pub fn update_trigger<F>(&mut self, trigger_id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut Trigger),
    {
        self.apply("update_trigger", |state| match state.trigger_mut(trigger_id) {
            Some(trigger) => {
                edit(trigger);
                true
            }
            None => false,
        })
    }

    pub fn delete_trigger(&mut self, trigger_id: &str) -> Option<Trigger> {
        let mut removed = None;
        self.apply("delete_trigger", |state| {
            if let Some(index) = state.triggers.iter().position(|t| t.id == trigger_id) {
                removed = Some(Arc::unwrap_or_clone(state.triggers.remove(index)));
            }
            removed.is_some()
        });
        removed
    }

    pub fn toggle_trigger(&mut self, trigger_id: &str) -> bool {
        self.update_trigger(trigger_id, |trigger| trigger.enabled = !trigger.enabled)
    }

    pub fn move_trigger(&mut self, from: usize, to: usize) -> bool {
        self.apply("move_trigger", |state| {
            nodes::reorder(&mut state.triggers, from, to)
        })
    }

    /// Add a node to a trigger's post-processing chain
    pub fn add_trigger_node(
        &mut self,
        trigger_id: &str,
        node: WorkflowNode,
        index: Option<usize>,
    ) -> Result<bool, EditError> {
        self.try_apply("add_trigger_node", |state| {
            let Some(existing) = state.trigger(trigger_id) else {
                return Ok(false);
            };
            let chain = existing.nodes.as_deref().unwrap_or_default();
            nodes::check_form(chain, &node, trigger_id)?;
            let Some(trigger) = state.trigger_mut(trigger_id) else {
                return Ok(false);
            };
            nodes::insert(trigger.nodes.get_or_insert_with(Vec::new), node, index, trigger_id)?;
            Ok(true)
        })
    }

    pub fn update_trigger_node<F>(&mut self, trigger_id: &str, node_id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut WorkflowNode),
    {
        self.apply("update_trigger_node", |state| {
            match state.trigger_mut(trigger_id).and_then(|t| t.nodes.as_mut()) {
                Some(chain) => nodes::update(chain, node_id, edit),
                None => false,
            }
        })
    }

    pub fn delete_trigger_node(&mut self, trigger_id: &str, node_id: &str) -> Option<WorkflowNode> {
        let mut removed = None;
        self.apply("delete_trigger_node", |state| {
            removed = state
                .trigger_mut(trigger_id)
                .and_then(|t| t.nodes.as_mut())
                .and_then(|chain| nodes::remove(chain, node_id));
            removed.is_some()
        });
        removed
    }

    // ----- containers -----

    pub fn add_container(&mut self, container: Container) -> Result<bool, EditError> {
        let index = self.state.containers.len();
        self.insert_container_at(container, index)
    }

    /// Insert at `index` (clamped); a container with the same id already
    /// present wins. A container arriving with two form nodes is rejected.
    pub fn insert_container_at(
        &mut self,
        container: Container,
        index: usize,
    ) -> Result<bool, EditError> {
        self.try_apply("insert_container_at", |state| {
            if state.container(&container.id).is_some() {
                return Ok(false);
            }
            nodes::check_form_edit(&[], &container.nodes, &container.id)?;
            let index = index.min(state.containers.len());
            state.containers.insert(index, Arc::new(container));
            Ok(true)
        })
    }

    /// Edit a container in place. An edit that leaves it with an extra form
    /// node is rejected and nothing changes.
    pub fn update_container<F>(&mut self, container_id: &str, edit: F) -> Result<bool, EditError>
    where
        F: FnOnce(&mut Container),
    {
        self.try_apply("update_container", |state| {
            let Some(existing) = state.container(container_id) else {
                return Ok(false);
            };
            let mut edited = existing.clone();
            edit(&mut edited);
            edited.id = existing.id.clone();
            nodes::check_form_edit(&existing.nodes, &edited.nodes, container_id)?;
            if let Some(container) = state.container_mut(container_id) {
                *container = edited;
            }
            Ok(true)
        })
    }

    pub fn delete_container(&mut self, container_id: &str) -> Option<Container> {
        let mut removed = None;
        self.apply("delete_container", |state| {
            if let Some(index) = state.containers.iter().position(|c| c.id == container_id) {
                removed = Some(Arc::unwrap_or_clone(state.containers.remove(index)));
            }
            removed.is_some()
        });
        removed
    }

    pub fn move_container(&mut self, from: usize, to: usize) -> bool {
        self.apply("move_container", |state| {
            nodes::reorder(&mut state.containers, from, to)
        })
    }

    /// Copy a container and all its nodes with fresh ids, right after the original
    pub fn duplicate_container(&mut self, container_id: &str) -> Option<String> {
        let mut new_id = None;
        self.apply("duplicate_container", |state| {
            let Some(index) = state.containers.iter().position(|c| c.id == container_id) else {
                return false;
            };
            let original = &state.containers[index];
            let copy = Container {
                id: flowcore::generate_id("container"),
                title: format!("{} (copy)", original.title),
                subtitle: original.subtitle.clone(),
                nodes: original.nodes.iter().map(WorkflowNode::with_fresh_ids).collect(),
            };
            new_id = Some(copy.id.clone());
            state.containers.insert(index + 1, Arc::new(copy));
            true
        });
        new_id
    }

    // ----- nodes -----

    /// Insert a node into a container's top-level list.
    ///
    /// A second form node in the same container is rejected with
    /// [`EditError::DuplicateFormNode`].
    pub fn add_node(
        &mut self,
        container_id: &str,
        node: WorkflowNode,
        index: Option<usize>,
    ) -> Result<bool, EditError> {
        self.try_apply("add_node", |state| {
            let Some(existing) = state.container(container_id) else {
                return Ok(false);
            };
            nodes::check_form(&existing.nodes, &node, container_id)?;
            let Some(container) = state.container_mut(container_id) else {
                return Ok(false);
            };
            nodes::insert(&mut container.nodes, node, index, container_id)?;
            Ok(true)
        })
    }

    /// Edit a top-level node. Turning it into a second form node is rejected.
    pub fn update_node<F>(
        &mut self,
        container_id: &str,
        node_id: &str,
        edit: F,
    ) -> Result<bool, EditError>
    where
        F: FnOnce(&mut WorkflowNode),
    {
        self.try_apply("update_node", |state| {
            let Some(existing) = state.container(container_id) else {
                return Ok(false);
            };
            let mut list = existing.nodes.clone();
            if !nodes::update_guarded(&mut list, node_id, edit, container_id)? {
                return Ok(false);
            }
            if let Some(container) = state.container_mut(container_id) {
                container.nodes = list;
            }
            Ok(true)
        })
    }

    pub fn delete_node(&mut self, container_id: &str, node_id: &str) -> Option<WorkflowNode> {
        let mut removed = None;
        self.apply("delete_node", |state| {
            removed = state
                .container_mut(container_id)
                .and_then(|c| nodes::remove(&mut c.nodes, node_id));
            removed.is_some()
        });
        removed
    }

    pub fn toggle_node(&mut self, container_id: &str, node_id: &str) -> bool {
        self.apply("toggle_node", |state| match state.container_mut(container_id) {
            Some(container) => nodes::toggle(&mut container.nodes, node_id),
            None => false,
        })
    }

    pub fn move_node(&mut self, container_id: &str, from: usize, to: usize) -> bool {
        self.apply("move_node", |state| match state.container_mut(container_id) {
            Some(container) => nodes::reorder(&mut container.nodes, from, to),
            None => false,
        })
    }

    /// Copy a node (fresh ids, branches included) right after the original
    pub fn duplicate_node(
        &mut self,
        container_id: &str,
        node_id: &str,
    ) -> Result<Option<String>, EditError> {
        let mut new_id = None;
        self.try_apply("duplicate_node", |state| {
            let Some(existing) = state.container(container_id) else {
                return Ok(false);
            };
            let Some(original) = existing.nodes.iter().find(|n| n.id == node_id) else {
                return Ok(false);
            };
            if original.contains_form() {
                return Err(EditError::DuplicateFormNode {
                    container_id: container_id.to_string(),
                });
            }
            let Some(container) = state.container_mut(container_id) else {
                return Ok(false);
            };
            new_id = nodes::duplicate(&mut container.nodes, node_id, container_id)?;
            Ok(new_id.is_some())
        })?;
        Ok(new_id)
    }

    // ----- conditional branches -----

    /// Append a node to one branch of a conditional node
    pub fn add_node_to_branch(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
        node: WorkflowNode,
    ) -> Result<bool, EditError> {
        self.add_conditional_node(container_id, node_id, branch_id, node, None)
    }

    /// Insert a node into one branch of a conditional node at `index`.
    ///
    /// The single-form rule covers the whole container, branches included.
    pub fn add_conditional_node(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
        node: WorkflowNode,
        index: Option<usize>,
    ) -> Result<bool, EditError> {
        self.try_apply("add_conditional_node", |state| {
            let Some(container) = state.container(container_id) else {
                return Ok(false);
            };
            let Some(target) = container.find_node(node_id) else {
                return Ok(false);
            };
            if target.conditional_kind().is_none() {
                return Err(EditError::NotConditional {
                    node_id: node_id.to_string(),
                });
            }
            if target.branch(branch_id).is_none() {
                return Ok(false);
            }
            if node.contains_form() && container.has_form_node() {
                return Err(EditError::DuplicateFormNode {
                    container_id: container_id.to_string(),
                });
            }
            let Some(list) = branch_nodes_mut(state, container_id, node_id, branch_id) else {
                return Ok(false);
            };
            nodes::insert(list, node, index, container_id)?;
            Ok(true)
        })
    }

    pub fn update_conditional_node<F>(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
        target_id: &str,
        edit: F,
    ) -> bool
    where
        F: FnOnce(&mut WorkflowNode),
    {
        self.apply("update_conditional_node", |state| {
            match branch_nodes_mut(state, container_id, node_id, branch_id) {
                Some(list) => nodes::update(list, target_id, edit),
                None => false,
            }
        })
    }

    /// Remove `target_id` from exactly `branch_id`; other branches are not searched
    pub fn delete_node_from_branch(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
        target_id: &str,
    ) -> Option<WorkflowNode> {
        let mut removed = None;
        self.apply("delete_node_from_branch", |state| {
            let holds = state
                .find_node(container_id, node_id)
                .and_then(|n| n.branch(branch_id))
                .is_some_and(|b| b.nodes.iter().any(|n| n.id == target_id));
            if !holds {
                return false;
            }
            removed = branch_nodes_mut(state, container_id, node_id, branch_id)
                .and_then(|list| nodes::remove(list, target_id));
            removed.is_some()
        });
        removed
    }

    /// Remove `target_id` from whichever branch of the conditional holds it.
    ///
    /// Returns the branch id and the removed node.
    pub fn delete_conditional_node(
        &mut self,
        container_id: &str,
        node_id: &str,
        target_id: &str,
    ) -> Option<(String, WorkflowNode)> {
        let branch_id = self
            .state
            .find_node(container_id, node_id)?
            .branches
            .iter()
            .flatten()
            .find(|b| b.nodes.iter().any(|n| n.id == target_id))?
            .id
            .clone();
        let removed = self.delete_node_from_branch(container_id, node_id, &branch_id, target_id)?;
        Some((branch_id, removed))
    }

    pub fn toggle_conditional_node(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
        target_id: &str,
    ) -> bool {
        self.apply("toggle_conditional_node", |state| {
            match branch_nodes_mut(state, container_id, node_id, branch_id) {
                Some(list) => nodes::toggle(list, target_id),
                None => false,
            }
        })
    }

    pub fn move_conditional_node(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
        from: usize,
        to: usize,
    ) -> bool {
        self.apply("move_conditional_node", |state| {
            match branch_nodes_mut(state, container_id, node_id, branch_id) {
                Some(list) => nodes::reorder(list, from, to),
                None => false,
            }
        })
    }

    /// Append a `caseN` branch to a switch node and return its id
    pub fn add_switch_case(
        &mut self,
        container_id: &str,
        node_id: &str,
    ) -> Result<Option<String>, EditError> {
        let mut case_id = None;
        self.try_apply("add_switch_case", |state| {
            let Some(node) = state.conditional_mut(container_id, node_id)? else {
                return Ok(false);
            };
            if node.conditional_kind() == Some(ConditionalKind::If) {
                return Err(EditError::FixedBranches {
                    node_id: node_id.to_string(),
                });
            }
            let id = node.next_case_id();
            node.branches
                .get_or_insert_with(Vec::new)
                .push(Branch::new(id.clone()));
            node.normalize_branches();
            case_id = Some(id);
            Ok(true)
        })?;
        Ok(case_id)
    }

    /// Remove a switch case together with its nodes.
    ///
    /// `default` and both branches of an `if` node are protected.
    pub fn delete_branch(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
    ) -> Result<Option<Branch>, EditError> {
        let mut removed = None;
        self.try_apply("delete_branch", |state| {
            let kind = match state.find_node(container_id, node_id) {
                Some(node) => node.conditional_kind(),
                None => return Ok(false),
            };
            match kind {
                None => {
                    return Err(EditError::NotConditional {
                        node_id: node_id.to_string(),
                    })
                }
                Some(ConditionalKind::If) => {
                    return Err(EditError::FixedBranches {
                        node_id: node_id.to_string(),
                    })
                }
                Some(ConditionalKind::Switch) if branch_id == DEFAULT_BRANCH => {
                    return Err(EditError::ProtectedBranch {
                        node_id: node_id.to_string(),
                        branch_id: branch_id.to_string(),
                    })
                }
                Some(ConditionalKind::Switch) => {}
            }
            let has_branch = state
                .find_node(container_id, node_id)
                .is_some_and(|n| n.branch(branch_id).is_some());
            if !has_branch {
                return Ok(false);
            }
            let Some(node) = state.conditional_mut(container_id, node_id)? else {
                return Ok(false);
            };
            if let Some(branches) = node.branches.as_mut() {
                if let Some(index) = branches.iter().position(|b| b.id == branch_id) {
                    removed = Some(branches.remove(index));
                }
            }
            node.sync_routes();
            Ok(removed.is_some())
        })?;
        Ok(removed)
    }

    pub fn set_branch_position(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
        position: Position,
    ) -> bool {
        self.apply("set_branch_position", |state| {
            let current = state
                .find_node(container_id, node_id)
                .and_then(|n| n.branch(branch_id))
                .map(|b| b.position);
            if current.is_none() || current == Some(position) {
                return false;
            }
            match state
                .container_mut(container_id)
                .and_then(|c| c.find_node_mut(node_id))
                .and_then(|n| n.branch_mut(branch_id))
            {
                Some(branch) => {
                    branch.position = position;
                    true
                }
                None => false,
            }
        })
    }

    /// Edit the route (label, exit action) describing one branch
    pub fn update_route<F>(&mut self, container_id: &str, node_id: &str, branch_id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut Route),
    {
        self.apply("update_route", |state| {
            let known = state
                .find_node(container_id, node_id)
                .and_then(|n| n.routes.as_ref())
                .is_some_and(|routes| routes.iter().any(|r| r.id == branch_id));
            if !known {
                return false;
            }
            let route = state
                .container_mut(container_id)
                .and_then(|c| c.find_node_mut(node_id))
                .and_then(|n| n.routes.as_mut())
                .and_then(|routes| routes.iter_mut().find(|r| r.id == branch_id));
            match route {
                Some(route) => {
                    edit(route);
                    route.id = branch_id.to_string();
                    true
                }
                None => false,
            }
        })
    }

    // ----- tools -----

    /// Attach a tool to a node whose definition supports tools
    pub fn add_tool_to_node(
        &mut self,
        container_id: &str,
        node_id: &str,
        tool: Tool,
    ) -> Result<bool, EditError> {
        let registries = Arc::clone(&self.registries);
        self.try_apply("add_tool_to_node", |state| {
            let Some(node) = state.find_node(container_id, node_id) else {
                return Ok(false);
            };
            if !registries.node_supports_tools(&node.node_type) {
                return Err(EditError::ToolsUnsupported {
                    node_id: node_id.to_string(),
                });
            }
            let Some(node) = state
                .container_mut(container_id)
                .and_then(|c| c.find_node_mut(node_id))
            else {
                return Ok(false);
            };
            node.tools.get_or_insert_with(Vec::new).push(tool);
            Ok(true)
        })
    }

    pub fn remove_tool_from_node(
        &mut self,
        container_id: &str,
        node_id: &str,
        tool_id: &str,
    ) -> Option<Tool> {
        let mut removed = None;
        self.apply("remove_tool_from_node", |state| {
            let holds = state
                .find_node(container_id, node_id)
                .and_then(|n| n.tools.as_ref())
                .is_some_and(|tools| tools.iter().any(|t| t.id == tool_id));
            if !holds {
                return false;
            }
            if let Some(tools) = state
                .container_mut(container_id)
                .and_then(|c| c.find_node_mut(node_id))
                .and_then(|n| n.tools.as_mut())
            {
                if let Some(index) = tools.iter().position(|t| t.id == tool_id) {
                    removed = Some(tools.remove(index));
                }
            }
            removed.is_some()
        });
        removed
    }

    // ----- form fields -----

    pub fn set_form_fields(&mut self, fields: Vec<FormField>) -> bool {
        self.apply("set_form_fields", |state| {
            if *state.form_fields == fields {
                return false;
            }
            state.form_fields = Arc::new(fields);
            true
        })
    }

    pub fn add_form_field(&mut self, field: FormField) -> bool {
        self.apply("add_form_field", |state| {
            if state.form_fields.iter().any(|f| f.id == field.id) {
                return false;
            }
            Arc::make_mut(&mut state.form_fields).push(field);
            true
        })
    }

    pub fn update_form_field<F>(&mut self, field_id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut FormField),
    {
        self.apply("update_form_field", |state| {
            if !state.form_fields.iter().any(|f| f.id == field_id) {
                return false;
            }
            match Arc::make_mut(&mut state.form_fields)
                .iter_mut()
                .find(|f| f.id == field_id)
            {
                Some(field) => {
                    edit(field);
                    true
                }
                None => false,
            }
        })
    }

    pub fn remove_form_field(&mut self, field_id: &str) -> Option<FormField> {
        let mut removed = None;
        self.apply("remove_form_field", |state| {
            if let Some(index) = state.form_fields.iter().position(|f| f.id == field_id) {
                removed = Some(Arc::make_mut(&mut state.form_fields).remove(index));
            }
            removed.is_some()
        });
        removed
    }

    pub fn move_form_field(&mut self, from: usize, to: usize) -> bool {
        self.apply("move_form_field", |state| {
            if from >= state.form_fields.len() {
                return false;
            }
            nodes::reorder(Arc::make_mut(&mut state.form_fields), from, to)
        })
    }
}

/// Node list of one branch of a conditional node, found anywhere in the container
fn branch_nodes_mut<'a>(
    state: &'a mut GraphState,
    container_id: &str,
    node_id: &str,
    branch_id: &str,
) -> Option<&'a mut Vec<WorkflowNode>> {
    state
        .find_node(container_id, node_id)
        .and_then(|n| n.branch(branch_id))?;
    state
        .container_mut(container_id)?
        .find_node_mut(node_id)?
        .branch_mut(branch_id)
        .map(|b| &mut b.nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GraphStore {
        GraphStore::new(Arc::new(Registries::new()), Notifier::default(), 50)
    }

    #[test]
    fn test_snapshots_share_untouched_containers() {
        let mut graph = store();
        graph.add_container(Container::new("c1", "One")).unwrap();
        graph.add_container(Container::new("c2", "Two")).unwrap();
        let before = graph.state().clone();

        graph.add_node("c2", WorkflowNode::new("n1", "http"), None).unwrap();

        assert!(Arc::ptr_eq(&before.containers[0], &graph.state().containers[0]));
        assert!(!Arc::ptr_eq(&before.containers[1], &graph.state().containers[1]));
    }

    #[test]
    fn test_noop_mutations_record_nothing() {
        let mut graph = store();
        graph.add_container(Container::new("c1", "One")).unwrap();
        let len = graph.history_len();

        assert!(!graph.toggle_node("c1", "missing"));
        assert!(!graph.update_container("missing", |c| c.title = "x".to_string()).unwrap());
        assert!(graph.delete_node("c1", "missing").is_none());
        assert_eq!(graph.history_len(), len);
    }

    #[test]
    fn test_rejected_mutation_publishes_notification() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let mut graph = GraphStore::new(Arc::new(Registries::new()), notifier, 50);
        graph.add_container(Container::new("c1", "One")).unwrap();
        graph.add_node("c1", WorkflowNode::new("f1", "form"), None).unwrap();

        assert!(graph.add_node("c1", WorkflowNode::new("f2", "form"), None).is_err());
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, flowcore::NotificationLevel::Error);
    }

    #[test]
    fn test_container_edits_cannot_add_a_second_form() {
        let mut graph = store();
        let crowded = Container::new("c1", "One")
            .with_node(WorkflowNode::new("f1", "form"))
            .with_node(WorkflowNode::new("f2", "form"));
        assert!(graph.add_container(crowded).is_err());
        assert!(graph.container("c1").is_none());

        graph
            .add_container(Container::new("c1", "One").with_node(WorkflowNode::new("f1", "form")))
            .unwrap();
        let len = graph.history_len();
        let result = graph.update_container("c1", |c| {
            c.nodes.push(WorkflowNode::new("f2", "form"));
        });
        assert!(result.is_err());
        assert_eq!(graph.container("c1").unwrap().nodes.len(), 1);
        assert_eq!(graph.history_len(), len);
    }
}
