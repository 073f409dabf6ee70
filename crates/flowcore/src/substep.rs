use crate::ids::generate_id;
use crate::workflow::{Position, WorkflowNode};
use serde::{Deserialize, Serialize};

fn expanded_by_default() -> bool {
    true
}

/// Floating node group anchored to `(parent_container_id, parent_node_id)`.
///
/// Stored outside the container's node list so it can be positioned and
/// edited without touching the main spine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStepContainer {
    pub id: String,
    pub parent_node_id: String,
    pub parent_container_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default = "expanded_by_default")]
    pub expanded: bool,
    #[serde(default)]
    pub position: Position,
}

impl SubStepContainer {
    pub fn new(
        parent_container_id: impl Into<String>,
        parent_node_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id("substep"),
            parent_node_id: parent_node_id.into(),
            parent_container_id: parent_container_id.into(),
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            expanded: true,
            position: Position::default(),
        }
    }

    pub fn with_node(mut self, node: WorkflowNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn anchored_to(&self, container_id: &str, node_id: &str) -> bool {
        self.parent_container_id == container_id && self.parent_node_id == node_id
    }

    /// Every node id in the group, branch nodes included
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for node in &self.nodes {
            node.collect_ids(&mut ids);
        }
        ids
    }
}
