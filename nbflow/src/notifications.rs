//! Notification channel for user-visible feedback
//!
//! Fire-and-forget events published by the tracker, the pipeline, and the
//! persistence layer. Notifications are retained in a bounded active list
//! (most recent first) and fanned out to any number of live subscribers.
//! Non-persistent entries expire after their duration; persistent ones wait
//! for explicit acknowledgement.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Default lifetime of a non-persistent notification.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(5000);

const MAX_RETAINED: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub timestamp: Instant,
    pub severity: Severity,
    pub title: String,
    pub message: Option<String>,
    pub persistent: bool,
    pub duration: Duration,
}

impl Notification {
    fn expired(&self, now: Instant) -> bool {
        !self.persistent && now.duration_since(self.timestamp) >= self.duration
    }
}

struct HubInner {
    notifications: Vec<Notification>,
    next_id: u64,
}

/// Shared handle to the process-wide notification stream.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<Mutex<HubInner>>,
    tx: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                notifications: Vec::new(),
                next_id: 0,
            })),
            tx,
        }
    }

    /// Publish a notification, assigning its id and timestamp.
    pub fn publish(
        &self,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
        persistent: bool,
        duration: Duration,
    ) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;

        let notification = Notification {
            id,
            timestamp: Instant::now(),
            severity,
            title: title.into(),
            message: {
                let m = message.into();
                if m.is_empty() {
                    None
                } else {
                    Some(m)
                }
            },
            persistent,
            duration,
        };

        // Deliver to live subscribers; nobody listening is fine
        let _ = self.tx.send(notification.clone());

        inner.notifications.push(notification);
        if inner.notifications.len() > MAX_RETAINED {
            inner.notifications.remove(0);
        }

        id
    }

    pub fn info(&self, title: impl Into<String>, message: impl Into<String>) -> u64 {
        self.publish(Severity::Info, title, message, false, DEFAULT_DURATION)
    }

    pub fn success(&self, title: impl Into<String>, message: impl Into<String>) -> u64 {
        self.publish(Severity::Success, title, message, false, DEFAULT_DURATION)
    }

    pub fn warning(&self, title: impl Into<String>, message: impl Into<String>) -> u64 {
        self.publish(Severity::Warning, title, message, false, DEFAULT_DURATION)
    }

    /// Errors persist until acknowledged.
    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) -> u64 {
        self.publish(Severity::Error, title, message, true, DEFAULT_DURATION)
    }

    /// Remove a notification regardless of its persistence flag.
    pub fn acknowledge(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.notifications.retain(|n| n.id != id);
    }

    /// Remove all notifications.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.notifications.clear();
    }

    /// Active (non-expired) notifications, most recent first.
    pub fn active(&self) -> Vec<Notification> {
        let now = Instant::now();
        let inner = self.inner.lock().unwrap();
        inner
            .notifications
            .iter()
            .rev()
            .filter(|n| !n.expired(now))
            .cloned()
            .collect()
    }

    /// Drop expired notifications from the retained list.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.notifications.retain(|n| !n.expired(now));
    }

    /// Subscribe to the live stream. Receivers only see notifications
    /// published after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
