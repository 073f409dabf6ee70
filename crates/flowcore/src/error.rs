use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Which registry an unknown type was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Trigger,
    Node,
    Tool,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Trigger => f.write_str("trigger"),
            EntityKind::Node => f.write_str("node"),
            EntityKind::Tool => f.write_str("tool"),
        }
    }
}

/// Recoverable, user-visible edit failures.
///
/// A mutation that fails with one of these leaves every store unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Step '{container_id}' already contains a form node")]
    DuplicateFormNode { container_id: String },

    #[error("Branch '{branch_id}' of node '{node_id}' cannot be removed")]
    ProtectedBranch { node_id: String, branch_id: String },

    #[error("Node '{node_id}' has a fixed set of branches")]
    FixedBranches { node_id: String },

    #[error("Node '{node_id}' is not a conditional node")]
    NotConditional { node_id: String },

    #[error("Node '{node_id}' does not support tools")]
    ToolsUnsupported { node_id: String },

    #[error("Unknown {kind} type: {type_id}")]
    UnknownType { kind: EntityKind, type_id: String },

    #[error("Invalid configuration for '{type_id}': {message}")]
    Validation { type_id: String, message: String },
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Invalid workflow document: {}", .0.join("; "))]
    Structure(Vec<String>),

    #[error("Unexpected document shape: {0}")]
    Shape(String),
}

impl ImportError {
    /// Enumerated structural errors, empty for other variants
    pub fn errors(&self) -> &[String] {
        match self {
            ImportError::Structure(errors) => errors,
            _ => &[],
        }
    }
}
