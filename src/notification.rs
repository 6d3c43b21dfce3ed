//! Non-modal status messages
//!
//! Persistence problems never interrupt reading. They end up here so the
//! host can show them in a status line and tests can observe them.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    /// How many times this message was raised while still visible
    pub occurrences: u32,
    pub expires_at: Instant,
}

impl Notification {
    pub fn new(message: impl Into<String>, level: NotificationLevel, duration: Duration) -> Self {
        Self {
            message: message.into(),
            level,
            occurrences: 1,
            expires_at: Instant::now() + duration,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

}

/// Most recent first
#[derive(Debug, Default)]
pub struct NotificationManager {
    notifications: Vec<Notification>,
    default_duration: Duration,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::with_default_duration(Duration::from_secs(5))
    }

    pub fn with_default_duration(default_duration: Duration) -> Self {
        Self {
            notifications: Vec::new(),
            default_duration,
        }
    }

    /// Post a message. A visible message with the same text and level is
    /// refreshed and moved to the front instead of being duplicated.
    pub fn notify(&mut self, message: impl Into<String>, level: NotificationLevel) {
        let message = message.into();
        let existing = self
            .notifications
            .iter()
            .position(|n| n.level == level && n.message == message && !n.is_expired());

        let notification = match existing {
            Some(idx) => {
                let mut n = self.notifications.remove(idx);
                n.occurrences += 1;
                n.expires_at = Instant::now() + self.default_duration;
                n
            }
            None => Notification::new(message, level, self.default_duration),
        };
        self.notifications.insert(0, notification);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationLevel::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationLevel::Error);
    }

    /// Remove expired notifications, returns true if any were removed
    pub fn update(&mut self) -> bool {
        let initial_len = self.notifications.len();
        self.notifications.retain(|n| !n.is_expired());
        self.notifications.len() != initial_len
    }

    pub fn current(&self) -> Option<&Notification> {
        self.notifications.first()
    }

    pub fn all(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn has_errors(&self) -> bool {
        self.notifications
            .iter()
            .any(|n| n.level == NotificationLevel::Error)
    }

    pub fn count(&self) -> usize {
        self.notifications.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn notification_expiration() {
        let notification =
            Notification::new("test", NotificationLevel::Info, Duration::from_millis(50));
        assert!(!notification.is_expired());

        thread::sleep(Duration::from_millis(60));
        assert!(notification.is_expired());
    }

    #[test]
    fn manager_orders_newest_first() {
        let mut manager = NotificationManager::new();

        manager.notify("Saved", NotificationLevel::Info);
        manager.warn("Bookmarks file was unreadable");
        manager.error("Could not save highlights");

        assert_eq!(manager.count(), 3);
        let current = manager.current().unwrap();
        assert_eq!(current.message, "Could not save highlights");
        assert_eq!(current.level, NotificationLevel::Error);
        assert!(manager.has_errors());
    }

    #[test]
    fn manager_collapses_repeats() {
        let mut manager = NotificationManager::new();

        manager.error("Could not save highlights");
        manager.notify("Other", NotificationLevel::Info);
        manager.error("Could not save highlights");

        assert_eq!(manager.count(), 2);
        let current = manager.current().unwrap();
        assert_eq!(current.message, "Could not save highlights");
        assert_eq!(current.occurrences, 2);
    }

    #[test]
    fn manager_removes_expired() {
        let mut manager = NotificationManager::with_default_duration(Duration::from_millis(50));

        manager.warn("Short-lived");
        assert_eq!(manager.count(), 1);

        thread::sleep(Duration::from_millis(60));
        assert!(manager.update());
        assert_eq!(manager.count(), 0);
    }
}
