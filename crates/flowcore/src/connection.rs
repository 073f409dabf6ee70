use crate::ids::generate_id;
use serde::{Deserialize, Serialize};

/// Kind of entity at either end of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    Trigger,
    Node,
    Container,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Created by the editor itself, e.g. when an action is added from an output
    Automatic,
    /// Drawn by the user
    #[default]
    Manual,
}

/// Terminal of a node: `Left` receives edges, `Right` emits them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

/// Explicit directed edge, independent of container ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_id: String,
    pub source_type: EndpointType,
    pub target_id: String,
    pub target_type: EndpointType,
    #[serde(default)]
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub side: Side,
    /// Branch of a conditional source this edge fans out from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_output: Option<String>,
}

impl Connection {
    pub fn new(
        source_id: impl Into<String>,
        source_type: EndpointType,
        target_id: impl Into<String>,
        target_type: EndpointType,
    ) -> Self {
        Self {
            id: generate_id("conn"),
            source_id: source_id.into(),
            source_type,
            target_id: target_id.into(),
            target_type,
            connection_type: ConnectionType::Manual,
            side: Side::Right,
            branch_output: None,
        }
    }

    pub fn automatic(mut self) -> Self {
        self.connection_type = ConnectionType::Automatic;
        self
    }

    pub fn with_branch_output(mut self, branch: impl Into<String>) -> Self {
        self.branch_output = Some(branch.into());
        self
    }

    pub fn touches(&self, entity_id: &str) -> bool {
        self.source_id == entity_id || self.target_id == entity_id
    }
}
