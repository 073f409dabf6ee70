mod execution;
mod notify;

pub use execution::{
    ExecutionMonitor, ExecutionStatus, ExecutionSummary, NodeExecutionEvent, NodeExecutionState,
};
pub use notify::{Notification, NotificationLevel, Notifier};
