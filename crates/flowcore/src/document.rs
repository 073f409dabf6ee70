use crate::connection::Connection;
use crate::substep::SubStepContainer;
use crate::workflow::{Config, Container, FormField, Trigger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DOCUMENT_VERSION: &str = "1.0";

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// The serialized union of graph, sub-step and connection state.
///
/// This is the only unit that has to round-trip losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Config,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// Opaque trigger combination rules, carried through unchanged
    #[serde(default)]
    pub trigger_logic: Vec<Value>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
    #[serde(default)]
    pub sub_steps: Vec<SubStepContainer>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

impl Default for WorkflowDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: String::new(),
            description: String::new(),
            metadata: Config::new(),
            triggers: Vec::new(),
            trigger_logic: Vec::new(),
            containers: Vec::new(),
            form_fields: Vec::new(),
            sub_steps: Vec::new(),
            connections: Vec::new(),
            exported_at: None,
        }
    }
}

impl WorkflowDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Copy without the derived export timestamp, for structural comparison
    pub fn without_timestamp(&self) -> Self {
        Self {
            exported_at: None,
            ..self.clone()
        }
    }

    pub fn node_count(&self) -> usize {
        let container_nodes: usize = self.containers.iter().map(|c| c.node_ids().len()).sum();
        let sub_step_nodes: usize = self.sub_steps.iter().map(|s| s.node_ids().len()).sum();
        container_nodes + sub_step_nodes
    }
}
