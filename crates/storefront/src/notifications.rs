//! Transient user-facing notices.
//!
//! Each notice lives for the configured display duration. Expired notices
//! are pruned whenever [`NotificationBus::active`] is read.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Warning,
    Info,
}

/// One notice shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub level: Level,
    pub expires_at: Instant,
}

impl Notification {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Posts notices and keeps the unexpired ones.
#[derive(Debug)]
pub struct NotificationBus {
    duration: Duration,
    active: Mutex<Vec<Notification>>,
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            duration,
            active: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Post a notice; returns its id.
    pub fn notify(&self, message: impl Into<String>, level: Level) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            level,
            expires_at: Instant::now() + self.duration,
        };

        match level {
            Level::Error | Level::Warning => {
                warn!(id = %notification.id, ?level, message = %notification.message, "Notification");
            }
            Level::Success | Level::Info => {
                info!(id = %notification.id, ?level, message = %notification.message, "Notification");
            }
        }

        let id = notification.id;
        let _ = self.sender.send(notification.clone());
        self.lock().push(notification);
        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Level::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Level::Error)
    }

    pub fn warning(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Level::Warning)
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Level::Info)
    }

    /// Unexpired notices, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        self.active_at(Instant::now())
    }

    fn active_at(&self, now: Instant) -> Vec<Notification> {
        let mut active = self.lock();
        active.retain(|n| !n.is_expired(now));
        active.clone()
    }

    /// Remove a notice before it expires. Returns whether it was present.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut active = self.lock();
        let before = active.len();
        active.retain(|n| n.id != id);
        active.len() != before
    }

    /// Every notice posted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_and_dismiss() {
        let bus = NotificationBus::new(Duration::from_secs(3));
        let id = bus.success("Added to cart");
        bus.error("Could not reach the store");

        let active = bus.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].message, "Added to cart");

        assert!(bus.dismiss(id));
        assert!(!bus.dismiss(id));
        assert_eq!(bus.active().len(), 1);
    }

    #[test]
    fn test_expired_notices_pruned() {
        let bus = NotificationBus::new(Duration::from_millis(10));
        bus.info("Hello");
        let later = Instant::now() + Duration::from_millis(20);
        assert!(bus.active_at(later).is_empty());
        assert!(bus.active().is_empty());
    }

    #[test]
    fn test_subscribers_see_notices() {
        let bus = NotificationBus::new(Duration::from_secs(3));
        let mut rx = bus.subscribe();
        bus.warning("Wishlist is empty");
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.level, Level::Warning);
    }
}
