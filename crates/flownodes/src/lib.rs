//! Standard catalog
//!
//! Built-in trigger, node and tool definitions for the editor registries

mod actions;
mod tools;
mod triggers;
mod validate;

pub use actions::register_actions;
pub use tools::register_tools;
pub use triggers::register_triggers;

use floweditor::Registries;
use std::sync::Arc;

/// Register all standard types with a set of registries
pub fn register_all(registries: &mut Registries) {
    register_triggers(&mut registries.triggers);
    register_actions(&mut registries.nodes);
    register_tools(&mut registries.tools);
    tracing::debug!(
        triggers = registries.triggers.len(),
        nodes = registries.nodes.len(),
        tools = registries.tools.len(),
        "standard catalog registered"
    );
}

/// Registries holding the standard catalog, ready to share across editors
pub fn standard_registries() -> Arc<Registries> {
    let mut registries = Registries::new();
    register_all(&mut registries);
    Arc::new(registries)
}
