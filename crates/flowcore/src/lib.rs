//! Core abstractions for the workflow editor
//!
//! This crate provides the entity model shared by every store, the error
//! taxonomy, and the side channels (notifications, execution status) the
//! editor reports through. It has no editing logic of its own.

mod connection;
mod document;
mod error;
pub mod events;
mod ids;
mod substep;
mod workflow;

pub use connection::{Connection, ConnectionType, EndpointType, Side};
pub use document::{WorkflowDocument, DOCUMENT_VERSION};
pub use error::{EditError, EntityKind, FlowError, ImportError};
pub use events::*;
pub use ids::generate_id;
pub use substep::SubStepContainer;
pub use workflow::{
    Branch, ConditionalKind, Config, Container, FormField, Position, Route, Tool, Trigger,
    WorkflowNode, DEFAULT_BRANCH, FALSE_BRANCH, FORM_NODE_TYPE, TRUE_BRANCH,
};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
