//! Transient notifications.
//!
//! [`NotificationCenter`] keeps the newest notifications first in a bounded
//! buffer. An entry leaves either when it is pushed past capacity or when its
//! display window runs out, whichever happens first. Eviction cancels the
//! pending expiry, and an expiry for an entry that is already gone does
//! nothing.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;

pub const DEFAULT_CAPACITY: usize = 50;
pub const DEFAULT_DISPLAY_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("notification-{}", uuid::Uuid::new_v4()),
            kind,
            title: title.into(),
            message: message.into(),
            timestamp,
            read: false,
        }
    }
}

/// Fire-and-forget receiver of notifications.
pub trait NotificationSink: Send {
    fn emit(&mut self, notification: Notification);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn emit(&mut self, _notification: Notification) {}
}

/// Bounded, self-expiring notification buffer.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    /// Newest first
    entries: VecDeque<Notification>,
    /// (deadline, notification id)
    expiries: BTreeSet<(DateTime<Utc>, String)>,
    capacity: usize,
    display_window: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::seconds(DEFAULT_DISPLAY_SECS as i64))
    }
}

impl NotificationCenter {
    pub fn new(capacity: usize, display_window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            expiries: BTreeSet::new(),
            capacity,
            display_window,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    /// Earliest pending expiry.
    pub fn next_expiry(&self) -> Option<DateTime<Utc>> {
        self.expiries.first().map(|(deadline, _)| *deadline)
    }

    pub fn push(&mut self, notification: Notification) {
        self.expiries.insert((self.deadline(&notification), notification.id.clone()));
        self.entries.push_front(notification);
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                self.cancel_expiry(&evicted);
            }
        }
    }

    /// Remove every entry whose display window ended at or before `now`.
    /// Returns the ids actually removed.
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut expired = Vec::new();
        while let Some((deadline, _)) = self.expiries.first() {
            if *deadline > now {
                break;
            }
            let Some((_, id)) = self.expiries.pop_first() else {
                break;
            };
            if let Some(pos) = self.entries.iter().position(|n| n.id == id) {
                self.entries.remove(pos);
                expired.push(id);
            }
        }
        expired
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.entries.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    /// Remove one entry ahead of its expiry.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let Some(pos) = self.entries.iter().position(|n| n.id == id) else {
            return false;
        };
        if let Some(removed) = self.entries.remove(pos) {
            self.cancel_expiry(&removed);
        }
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.expiries.clear();
    }

    fn deadline(&self, notification: &Notification) -> DateTime<Utc> {
        notification.timestamp + self.display_window
    }

    fn cancel_expiry(&mut self, notification: &Notification) {
        let key = (self.deadline(notification), notification.id.clone());
        self.expiries.remove(&key);
    }
}

impl NotificationSink for NotificationCenter {
    fn emit(&mut self, notification: Notification) {
        self.push(notification);
    }
}

/// Notification center shared between the manager and an expiry sweeper.
pub type SharedNotificationCenter = Arc<Mutex<NotificationCenter>>;

impl NotificationSink for SharedNotificationCenter {
    fn emit(&mut self, notification: Notification) {
        self.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}

fn sweep(center: &SharedNotificationCenter, now: DateTime<Utc>) -> usize {
    center
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .expire_due(now)
        .len()
}

/// Periodically expire notifications on the current tokio runtime.
///
/// Aborting the returned handle stops all pending expiries.
pub fn spawn_expiry_sweeper(
    center: SharedNotificationCenter,
    clock: Arc<dyn Clock>,
    period: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let expired = sweep(&center, clock.now());
            if expired > 0 {
                debug!(expired, "notifications expired");
            }
        }
    })
}
