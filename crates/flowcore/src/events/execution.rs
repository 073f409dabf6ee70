//! Read-only view of execution progress pushed by the remote runner.
//!
//! The editor never executes nodes; it only remembers the latest event per
//! node so the canvas can show status badges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Error,
}

/// Progress event keyed by node id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionEvent {
    pub node_id: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeExecutionState {
    pub status: ExecutionStatus,
    pub input_data: Option<Value>,
    pub output_data: Option<Value>,
    pub duration: Option<f64>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub pending: usize,
    pub running: usize,
    pub success: usize,
    pub error: usize,
}

#[derive(Debug, Default)]
pub struct ExecutionMonitor {
    states: HashMap<String, NodeExecutionState>,
}

impl ExecutionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. Data fields missing from a later event keep the
    /// values reported earlier for the same node.
    pub fn apply(&mut self, event: NodeExecutionEvent) {
        tracing::debug!(node_id = %event.node_id, status = ?event.status, "execution event");
        let now = Utc::now();
        match self.states.get_mut(&event.node_id) {
            Some(state) => {
                state.status = event.status;
                state.input_data = event.input_data.or(state.input_data.take());
                state.output_data = event.output_data.or(state.output_data.take());
                state.duration = event.duration.or(state.duration);
                state.error = match event.status {
                    ExecutionStatus::Error => event.error.or(state.error.take()),
                    _ => event.error,
                };
                state.updated_at = now;
            }
            None => {
                self.states.insert(
                    event.node_id,
                    NodeExecutionState {
                        status: event.status,
                        input_data: event.input_data,
                        output_data: event.output_data,
                        duration: event.duration,
                        error: event.error,
                        updated_at: now,
                    },
                );
            }
        }
    }

    pub fn status(&self, node_id: &str) -> Option<ExecutionStatus> {
        self.states.get(node_id).map(|s| s.status)
    }

    pub fn state(&self, node_id: &str) -> Option<&NodeExecutionState> {
        self.states.get(node_id)
    }

    pub fn summary(&self) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();
        for state in self.states.values() {
            match state.status {
                ExecutionStatus::Pending => summary.pending += 1,
                ExecutionStatus::Running => summary.running += 1,
                ExecutionStatus::Success => summary.success += 1,
                ExecutionStatus::Error => summary.error += 1,
            }
        }
        summary
    }

    pub fn reset(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(node_id: &str, status: ExecutionStatus) -> NodeExecutionEvent {
        NodeExecutionEvent {
            node_id: node_id.to_string(),
            status,
            input_data: None,
            output_data: None,
            duration: None,
            error: None,
        }
    }

    #[test]
    fn test_latest_status_wins_and_data_is_kept() {
        let mut monitor = ExecutionMonitor::new();
        let mut running = event("n1", ExecutionStatus::Running);
        running.input_data = Some(json!({"q": 1}));
        monitor.apply(running);

        let mut done = event("n1", ExecutionStatus::Success);
        done.output_data = Some(json!({"ok": true}));
        done.duration = Some(12.0);
        monitor.apply(done);

        let state = monitor.state("n1").unwrap();
        assert_eq!(state.status, ExecutionStatus::Success);
        assert_eq!(state.input_data, Some(json!({"q": 1})));
        assert_eq!(state.output_data, Some(json!({"ok": true})));
        assert_eq!(state.duration, Some(12.0));
    }

    #[test]
    fn test_events_deserialize_from_camel_case() {
        let event: NodeExecutionEvent = serde_json::from_value(json!({
            "nodeId": "n2",
            "status": "error",
            "error": "timeout",
            "duration": 5000
        }))
        .unwrap();
        let mut monitor = ExecutionMonitor::new();
        monitor.apply(event);
        monitor.apply(self::event("n3", ExecutionStatus::Pending));

        assert_eq!(monitor.status("n2"), Some(ExecutionStatus::Error));
        let summary = monitor.summary();
        assert_eq!(summary.error, 1);
        assert_eq!(summary.pending, 1);

        monitor.reset();
        assert!(monitor.status("n2").is_none());
    }
}
