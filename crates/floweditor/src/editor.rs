use crate::analysis::{self, Diagnostics};
use crate::config::EditorConfig;
use crate::connections::ConnectionStore;
use crate::graph::{GraphState, GraphStore};
use crate::nodes::NodeScope;
use crate::registry::Registries;
use crate::substeps::SubStepStore;
use crate::transfer::{self, DocumentInfo};
use flowcore::{
    Branch, Config, Connection, Container, EditError, EndpointType, EntityKind, ExecutionMonitor,
    FlowError, ImportError, NodeExecutionEvent, Notification, Notifier, SubStepContainer, Trigger,
    WorkflowDocument, WorkflowNode,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Ids produced by [`Editor::add_action_from_output`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedAction {
    pub sub_step_id: String,
    pub node_id: String,
    pub connection_id: String,
}

/// What [`Editor::prune_orphans`] removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub sub_steps: usize,
    pub connections: usize,
}

/// One editing session over a workflow document.
///
/// Owns the graph, sub-step and connection stores and is the only place
/// where an edit in one store is followed through into the others.
pub struct Editor {
    registries: Arc<Registries>,
    config: EditorConfig,
    graph: GraphStore,
    connections: ConnectionStore,
    sub_steps: SubStepStore,
    notifier: Notifier,
    execution: ExecutionMonitor,
    info: DocumentInfo,
}

impl Editor {
    /// Create a new editor with default settings
    pub fn new(registries: Arc<Registries>) -> Self {
        Self::with_config(registries, EditorConfig::default())
    }

    /// Create a new editor with custom configuration
    pub fn with_config(registries: Arc<Registries>, config: EditorConfig) -> Self {
        let notifier = Notifier::new(config.notification_capacity);
        let graph = GraphStore::new(
            Arc::clone(&registries),
            notifier.clone(),
            config.history_limit.max(1),
        );
        let info = DocumentInfo {
            version: config.document_version.clone(),
            ..DocumentInfo::default()
        };

        Self {
            registries,
            graph,
            connections: ConnectionStore::new(),
            sub_steps: SubStepStore::new(notifier.clone()),
            notifier,
            execution: ExecutionMonitor::new(),
            info,
            config,
        }
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Direct graph access for edits that do not cascade.
    ///
    /// Deletions should go through the editor so sub-steps and connections
    /// follow.
    pub fn graph_mut(&mut self) -> &mut GraphStore {
        &mut self.graph
    }

    pub fn connections(&self) -> &ConnectionStore {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut ConnectionStore {
        &mut self.connections
    }

    pub fn sub_steps(&self) -> &SubStepStore {
        &self.sub_steps
    }

    pub fn sub_steps_mut(&mut self) -> &mut SubStepStore {
        &mut self.sub_steps
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Subscribe to user-facing notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.info.description = description.into();
    }

    // ----- history -----

    /// Step the graph back. Sub-steps and connections that depended on
    /// anything the step removes go with it.
    pub fn undo(&mut self) -> bool {
        self.step_history("undo", GraphStore::undo)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history("redo", GraphStore::redo)
    }

    fn step_history(&mut self, action: &str, step: fn(&mut GraphStore) -> bool) -> bool {
        let before = analysis::known_endpoints(self.graph.state(), &[]);
        let anchored: HashSet<String> = self
            .sub_steps
            .sub_steps()
            .iter()
            .filter(|s| {
                self.graph
                    .find_node(&s.parent_container_id, &s.parent_node_id)
                    .is_some()
            })
            .map(|s| s.id.clone())
            .collect();

        if !step(&mut self.graph) {
            return false;
        }

        let after = analysis::known_endpoints(self.graph.state(), &[]);
        let mut removed: HashSet<String> = before.difference(&after).cloned().collect();
        let graph = &self.graph;
        let orphans = self.sub_steps.remove_where(|s| {
            anchored.contains(&s.id)
                && graph
                    .find_node(&s.parent_container_id, &s.parent_node_id)
                    .is_none()
        });
        absorb_sub_steps(&mut removed, orphans);
        self.drop_connections(&removed, action);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.graph.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.graph.can_redo()
    }

    // ----- registry-backed creation -----

    /// Instantiate a trigger from the registry and append it
    pub fn add_trigger_from_registry(
        &mut self,
        trigger_type: &str,
        overrides: Option<Config>,
    ) -> Result<String, EditError> {
        let Some(trigger) = self.registries.triggers.create_instance(trigger_type, overrides) else {
            return Err(self.unknown_type(EntityKind::Trigger, trigger_type));
        };
        let id = trigger.id.clone();
        let config = trigger.config.clone();
        if self.graph.add_trigger(trigger) {
            self.warn_if_invalid(EntityKind::Trigger, trigger_type, &config);
        }
        Ok(id)
    }

    /// Instantiate a node from the registry and insert it into `scope`.
    ///
    /// Returns `Ok(None)` when the scope no longer exists.
    pub fn add_node_from_registry(
        &mut self,
        scope: &NodeScope,
        node_type: &str,
        overrides: Option<Config>,
        index: Option<usize>,
    ) -> Result<Option<String>, EditError> {
        let Some(node) = self.registries.nodes.create_instance(node_type, overrides) else {
            return Err(self.unknown_type(EntityKind::Node, node_type));
        };
        let id = node.id.clone();
        let config = node.config.clone();
        let added = self.add_node_in(scope, node, index)?;
        if added {
            self.warn_if_invalid(EntityKind::Node, node_type, &config);
        }
        Ok(added.then_some(id))
    }

    /// Instantiate a tool and attach it to a node that supports tools
    pub fn add_tool_from_registry(
        &mut self,
        container_id: &str,
        node_id: &str,
        tool_type: &str,
    ) -> Result<Option<String>, EditError> {
        let Some(tool) = self.registries.tools.create_instance(tool_type, None) else {
            return Err(self.unknown_type(EntityKind::Tool, tool_type));
        };
        let id = tool.id.clone();
        let added = self.graph.add_tool_to_node(container_id, node_id, tool)?;
        Ok(added.then_some(id))
    }

    /// Add an action from a node's output: a new sub-step anchored at the
    /// node, holding one fresh `node_type` instance, wired to it with an
    /// automatic connection.
    ///
    /// Returns `Ok(None)` when the parent node does not exist.
    pub fn add_action_from_output(
        &mut self,
        container_id: &str,
        node_id: &str,
        node_type: &str,
    ) -> Result<Option<AttachedAction>, EditError> {
        let Some(definition) = self.registries.nodes.get(node_type) else {
            return Err(self.unknown_type(EntityKind::Node, node_type));
        };
        let name = definition.label.clone();
        if self.graph.find_node(container_id, node_id).is_none() {
            return Ok(None);
        }
        let Some(node) = self.registries.nodes.create_instance(node_type, None) else {
            return Err(self.unknown_type(EntityKind::Node, node_type));
        };

        let new_node_id = node.id.clone();
        let sub_step = SubStepContainer::new(container_id, node_id, name).with_node(node);
        let sub_step_id = sub_step.id.clone();
        self.sub_steps.add_sub_step_container(sub_step);

        let connection =
            Connection::new(node_id, EndpointType::Node, new_node_id.as_str(), EndpointType::Node)
                .automatic();
        let connection_id = self.connections.add_connection(connection);

        tracing::debug!(parent = node_id, sub_step = %sub_step_id, "action added from output");
        Ok(Some(AttachedAction {
            sub_step_id,
            node_id: new_node_id,
            connection_id,
        }))
    }

    /// Check a config against the type's validator.
    ///
    /// A failure is reported through the notification channel; callers decide
    /// whether to block.
    pub fn validate_node_config(&self, node_type: &str, config: &Config) -> Result<(), EditError> {
        let result = self.registries.nodes.validate(node_type, config);
        if let Err(err) = &result {
            self.notifier.error(err.to_string());
        }
        result
    }

    /// Replace a node's config. The edit is kept even when validation fails;
    /// the failure is notified.
    pub fn set_node_config(&mut self, scope: &NodeScope, node_id: &str, config: Config) -> bool {
        let node_type = match scope {
            NodeScope::Container(container_id) => self
                .graph
                .find_node(container_id, node_id)
                .map(|n| n.node_type.clone()),
            NodeScope::SubStep(sub_step_id) => self
                .sub_steps
                .get(sub_step_id)
                .and_then(|s| s.nodes.iter().find(|n| n.id == node_id))
                .map(|n| n.node_type.clone()),
        };
        let Some(node_type) = node_type else {
            return false;
        };
        self.warn_if_invalid(EntityKind::Node, &node_type, &config);
        matches!(
            self.update_node_in(scope, node_id, move |node| node.config = config),
            Ok(true)
        )
    }

    // ----- scoped node API -----

    pub fn add_node_in(
        &mut self,
        scope: &NodeScope,
        node: WorkflowNode,
        index: Option<usize>,
    ) -> Result<bool, EditError> {
        match scope {
            NodeScope::Container(id) => self.graph.add_node(id, node, index),
            NodeScope::SubStep(id) => self.sub_steps.add_node_to_sub_step(id, node, index),
        }
    }

    pub fn update_node_in<F>(
        &mut self,
        scope: &NodeScope,
        node_id: &str,
        edit: F,
    ) -> Result<bool, EditError>
    where
        F: FnOnce(&mut WorkflowNode),
    {
        match scope {
            NodeScope::Container(id) => self.graph.update_node(id, node_id, edit),
            NodeScope::SubStep(id) => self.sub_steps.update_node_in_sub_step(id, node_id, edit),
        }
    }

    pub fn delete_node_in(&mut self, scope: &NodeScope, node_id: &str) -> Option<WorkflowNode> {
        match scope {
            NodeScope::Container(id) => self.delete_node(id, node_id),
            NodeScope::SubStep(id) => self.remove_node_from_sub_step(id, node_id),
        }
    }

    pub fn toggle_node_in(&mut self, scope: &NodeScope, node_id: &str) -> bool {
        match scope {
            NodeScope::Container(id) => self.graph.toggle_node(id, node_id),
            NodeScope::SubStep(id) => self.sub_steps.toggle_node_in_sub_step(id, node_id),
        }
    }

    pub fn move_node_in(&mut self, scope: &NodeScope, from: usize, to: usize) -> bool {
        match scope {
            NodeScope::Container(id) => self.graph.move_node(id, from, to),
            NodeScope::SubStep(id) => self.sub_steps.move_node_in_sub_step(id, from, to),
        }
    }

    pub fn duplicate_node_in(
        &mut self,
        scope: &NodeScope,
        node_id: &str,
    ) -> Result<Option<String>, EditError> {
        match scope {
            NodeScope::Container(id) => self.graph.duplicate_node(id, node_id),
            NodeScope::SubStep(id) => self.sub_steps.duplicate_node_in_sub_step(id, node_id),
        }
    }

    // ----- cascading deletes -----

    pub fn delete_trigger(&mut self, trigger_id: &str) -> Option<Trigger> {
        let trigger = self.graph.delete_trigger(trigger_id)?;
        let removed: HashSet<String> = trigger.entity_ids().into_iter().collect();
        self.drop_connections(&removed, "delete_trigger");
        Some(trigger)
    }

    pub fn delete_trigger_node(&mut self, trigger_id: &str, node_id: &str) -> Option<WorkflowNode> {
        let node = self.graph.delete_trigger_node(trigger_id, node_id)?;
        self.drop_connections(&subtree_ids(&node), "delete_trigger_node");
        Some(node)
    }

    /// Delete a container together with every sub-step anchored inside it
    /// and every connection touching what was removed
    pub fn delete_container(&mut self, container_id: &str) -> Option<Container> {
        let container = self.graph.delete_container(container_id)?;
        let mut removed: HashSet<String> = container.node_ids().into_iter().collect();
        removed.insert(container.id.clone());
        let orphans = self
            .sub_steps
            .remove_where(|s| s.parent_container_id == container_id);
        absorb_sub_steps(&mut removed, orphans);
        self.drop_connections(&removed, "delete_container");
        Some(container)
    }

    pub fn delete_node(&mut self, container_id: &str, node_id: &str) -> Option<WorkflowNode> {
        let node = self.graph.delete_node(container_id, node_id)?;
        self.cascade_nodes(container_id, subtree_ids(&node), "delete_node");
        Some(node)
    }

    pub fn delete_node_from_branch(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
        target_id: &str,
    ) -> Option<WorkflowNode> {
        let node = self
            .graph
            .delete_node_from_branch(container_id, node_id, branch_id, target_id)?;
        self.cascade_nodes(container_id, subtree_ids(&node), "delete_node_from_branch");
        Some(node)
    }

    pub fn delete_conditional_node(
        &mut self,
        container_id: &str,
        node_id: &str,
        target_id: &str,
    ) -> Option<(String, WorkflowNode)> {
        let (branch_id, node) = self
            .graph
            .delete_conditional_node(container_id, node_id, target_id)?;
        self.cascade_nodes(container_id, subtree_ids(&node), "delete_conditional_node");
        Some((branch_id, node))
    }

    /// Delete a switch case, its nodes, their dependents, and the edges fanning
    /// out of that case
    pub fn delete_branch(
        &mut self,
        container_id: &str,
        node_id: &str,
        branch_id: &str,
    ) -> Result<Option<Branch>, EditError> {
        let Some(branch) = self.graph.delete_branch(container_id, node_id, branch_id)? else {
            return Ok(None);
        };
        let mut removed = HashSet::new();
        for node in &branch.nodes {
            removed.extend(subtree_ids(node));
        }
        let fan_out = self.connections.remove_branch_connections(node_id, branch_id);
        if fan_out > 0 {
            tracing::debug!(node_id, branch_id, count = fan_out, "branch connections removed");
        }
        self.cascade_nodes(container_id, removed, "delete_branch");
        Ok(Some(branch))
    }

    pub fn remove_sub_step(&mut self, sub_step_id: &str) -> Option<SubStepContainer> {
        let sub_step = self.sub_steps.remove_sub_step_container(sub_step_id)?;
        let mut removed = HashSet::new();
        absorb_sub_steps(&mut removed, vec![sub_step.clone()]);
        self.drop_connections(&removed, "remove_sub_step");
        Some(sub_step)
    }

    pub fn remove_node_from_sub_step(
        &mut self,
        sub_step_id: &str,
        node_id: &str,
    ) -> Option<WorkflowNode> {
        let node = self.sub_steps.remove_node_from_sub_step(sub_step_id, node_id)?;
        self.drop_connections(&subtree_ids(&node), "remove_node_from_sub_step");
        Some(node)
    }

    /// Remove sub-steps anchored to any of `removed` in `container_id`, then
    /// every connection touching the removed nodes or the sub-steps' nodes
    fn cascade_nodes(&mut self, container_id: &str, mut removed: HashSet<String>, action: &str) {
        let orphans = self.sub_steps.remove_where(|s| {
            s.parent_container_id == container_id && removed.contains(&s.parent_node_id)
        });
        absorb_sub_steps(&mut removed, orphans);
        self.drop_connections(&removed, action);
    }

    fn drop_connections(&mut self, removed: &HashSet<String>, action: &str) {
        let count = self.connections.remove_connections_for(removed);
        if count > 0 {
            tracing::debug!(action, count, "dependent connections removed");
        }
    }

    // ----- connections -----

    /// Add an edge. Several edges may share a target.
    pub fn add_connection(&mut self, connection: Connection) -> String {
        self.connections.add_connection(connection)
    }

    pub fn remove_connection(&mut self, connection_id: &str) -> Option<Connection> {
        self.connections.remove_connection(connection_id)
    }

    // ----- import / export -----

    /// Assemble the current state into a document
    pub fn export_document(&self) -> WorkflowDocument {
        transfer::assemble(
            &self.info,
            self.graph.state(),
            self.sub_steps.sub_steps(),
            self.connections.connections(),
        )
    }

    pub fn export_json(&self) -> Result<String, FlowError> {
        let document = self.export_document();
        let json = serde_json::to_string_pretty(&document)?;
        tracing::info!(
            name = %document.name,
            containers = document.containers.len(),
            connections = document.connections.len(),
            "workflow exported"
        );
        Ok(json)
    }

    /// Parse and load a document. On failure nothing is changed and the
    /// error is notified.
    pub fn import_json(&mut self, json: &str) -> Result<(), ImportError> {
        match transfer::parse_document(json) {
            Ok(document) => self.import_document(document),
            Err(err) => {
                tracing::warn!("import rejected: {}", err);
                self.notifier.error(format!("Import failed: {}", err));
                Err(err)
            }
        }
    }

    /// Replace all three stores with `document` and restart history.
    ///
    /// Everything is prepared before the first store is touched.
    pub fn import_document(&mut self, mut document: WorkflowDocument) -> Result<(), ImportError> {
        if let Err(err) = transfer::normalize_document(&mut document) {
            let err = ImportError::Shape(err.to_string());
            self.notifier.error(format!("Import failed: {}", err));
            return Err(err);
        }
        let unknown = transfer::resolve_icons(&mut document, &self.registries);
        if !unknown.is_empty() {
            self.notifier
                .warn(format!("Unknown types loaded without icons: {}", unknown.join(", ")));
        }

        let WorkflowDocument {
            version,
            name,
            description,
            metadata,
            triggers,
            trigger_logic,
            containers,
            form_fields,
            sub_steps,
            connections,
            exported_at: _,
        } = document;
        let state = GraphState::from_parts(name, triggers, trigger_logic, containers, form_fields);

        self.graph.load(state);
        self.sub_steps.replace_all(sub_steps);
        self.connections.replace_all(connections);
        self.info = DocumentInfo {
            version,
            description,
            metadata,
        };
        self.execution.reset();

        tracing::info!(
            name = %self.graph.workflow_name(),
            sub_steps = self.sub_steps.len(),
            connections = self.connections.len(),
            "workflow imported"
        );
        self.notifier
            .success(format!("Workflow '{}' imported", self.graph.workflow_name()));
        Ok(())
    }

    /// Start over with an empty document
    pub fn new_document(&mut self, name: impl Into<String>) {
        let state = GraphState {
            workflow_name: name.into(),
            ..GraphState::default()
        };
        self.graph.load(state);
        self.sub_steps.clear();
        self.connections.replace_all(Vec::new());
        self.info = DocumentInfo {
            version: self.config.document_version.clone(),
            ..DocumentInfo::default()
        };
        self.execution.reset();
    }

    // ----- execution status -----

    pub fn apply_execution_event(&mut self, event: NodeExecutionEvent) {
        self.execution.apply(event);
    }

    pub fn execution(&self) -> &ExecutionMonitor {
        &self.execution
    }

    // ----- diagnostics -----

    pub fn diagnose(&self) -> Diagnostics {
        analysis::diagnose(
            self.graph.state(),
            self.sub_steps.sub_steps(),
            self.connections.connections(),
        )
    }

    /// Remove sub-steps whose parent is gone, then every connection left
    /// pointing at nothing
    pub fn prune_orphans(&mut self) -> PruneReport {
        let orphans: HashSet<String> =
            analysis::orphan_sub_steps(self.graph.state(), self.sub_steps.sub_steps())
                .into_iter()
                .collect();
        let sub_steps = self.sub_steps.remove_where(|s| orphans.contains(&s.id)).len();

        let known = analysis::known_endpoints(self.graph.state(), self.sub_steps.sub_steps());
        let dangling: HashSet<String> = self
            .connections
            .connections()
            .iter()
            .flat_map(|c| [c.source_id.clone(), c.target_id.clone()])
            .filter(|id| !known.contains(id))
            .collect();
        let connections = self.connections.remove_connections_for(&dangling);

        let report = PruneReport {
            sub_steps,
            connections,
        };
        if report != PruneReport::default() {
            tracing::warn!(
                sub_steps = report.sub_steps,
                connections = report.connections,
                "pruned orphaned references"
            );
        }
        report
    }

    fn unknown_type(&self, kind: EntityKind, type_id: &str) -> EditError {
        let err = EditError::UnknownType {
            kind,
            type_id: type_id.to_string(),
        };
        tracing::warn!(%kind, type_id, "unknown registry type");
        self.notifier.error(err.to_string());
        err
    }

    fn warn_if_invalid(&self, kind: EntityKind, type_id: &str, config: &Config) {
        let result = match kind {
            EntityKind::Trigger => self.registries.triggers.validate(type_id, config),
            EntityKind::Node => self.registries.nodes.validate(type_id, config),
            EntityKind::Tool => self.registries.tools.validate(type_id, config),
        };
        if let Err(err) = result {
            tracing::debug!(type_id, "configuration needs attention: {}", err);
            self.notifier.warn(err.to_string());
        }
    }
}

fn subtree_ids(node: &WorkflowNode) -> HashSet<String> {
    let mut ids = Vec::new();
    node.collect_ids(&mut ids);
    ids.into_iter().collect()
}

fn absorb_sub_steps(removed: &mut HashSet<String>, sub_steps: Vec<SubStepContainer>) {
    for sub_step in sub_steps {
        tracing::debug!(sub_step = %sub_step.id, "sub-step removed with its parent");
        removed.insert(sub_step.id.clone());
        removed.extend(sub_step.node_ids());
    }
}
