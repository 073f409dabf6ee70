//! Workflow editing engine
//!
//! This crate provides the stores behind the visual editor: the registries,
//! the graph store with its undo/redo history, the connection overlay, the
//! floating sub-steps, and the import/export that ties them into one
//! document. The [`Editor`] session orchestrates edits that span stores.

pub mod analysis;
mod config;
mod connections;
mod editor;
mod graph;
mod history;
pub mod nodes;
pub mod registry;
mod substeps;
pub mod transfer;

pub use analysis::Diagnostics;
pub use config::EditorConfig;
pub use connections::{ConnectionStore, DragSession, DragState};
pub use editor::{AttachedAction, Editor, PruneReport};
pub use graph::{GraphState, GraphStore};
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use nodes::NodeScope;
pub use registry::{
    Capabilities, Definition, NodeRegistry, Registries, Registry, RegistryKind, ToolRegistry,
    TriggerRegistry, Validator,
};
pub use substeps::SubStepStore;
pub use transfer::DocumentInfo;
