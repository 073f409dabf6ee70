use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
    Warning,
}

/// User-facing message raised by a store instead of an error unwinding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Notification side channel shared by every store of one editor session
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publish a notification; dropped silently when nobody listens
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?level, "{}", message);
        let _ = self.sender.send(Notification {
            level,
            message,
            timestamp: Utc::now(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Warning, message);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_notifications() {
        let notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();
        notifier.error("boom");
        let received = rx.try_recv().unwrap();
        assert_eq!(received.level, NotificationLevel::Error);
        assert_eq!(received.message, "boom");
    }

    #[test]
    fn test_notify_without_subscribers_is_harmless() {
        let notifier = Notifier::new(0);
        notifier.info("nobody is listening");
    }
}
