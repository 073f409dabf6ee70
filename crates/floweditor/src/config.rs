use crate::history::DEFAULT_HISTORY_LIMIT;
use flowcore::DOCUMENT_VERSION;
use serde::{Deserialize, Serialize};

/// Configuration for an editor session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snapshots kept for undo/redo, at least 1
    pub history_limit: usize,
    pub notification_capacity: usize,
    /// Version stamped on exported documents
    pub document_version: String,
}

impl EditorConfig {
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            notification_capacity: 256,
            document_version: DOCUMENT_VERSION.to_string(),
        }
    }
}
