//! Session notifications for action outcomes.
//!
//! Every user-initiated action ends in exactly one notification (plus an
//! optional warning). The list lives in memory for the lifetime of the
//! session and is never persisted.
//!
//! ## Features
//!
//! - Newest-first list with per-item removal and bulk clear
//! - Unread counter with mark-all-read
//! - Optional desktop delivery (`desktop-notifications` feature)

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClimateError;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    /// Non-fatal problem; the action still completed.
    Warning,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
        }
    }
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct NotificationState {
    /// Newest first.
    items: Vec<Notification>,
    unread: usize,
    next_id: u64,
}

/// Session-owned notification list.
///
/// Cloning yields another handle to the same list.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    state: Arc<RwLock<NotificationState>>,
    desktop: bool,
}

impl NotificationCenter {
    /// Creates an empty notification center.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also delivers each notification to the desktop when the
    /// `desktop-notifications` feature is compiled in.
    pub fn with_desktop_delivery(mut self, enabled: bool) -> Self {
        self.desktop = enabled;
        self
    }

    /// Adds a notification and returns its id.
    pub fn add(&self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        let message = message.into();
        let id = {
            let mut state = self.state.write().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state.items.insert(
                0,
                Notification {
                    id,
                    kind,
                    message: message.clone(),
                    timestamp: Utc::now(),
                },
            );
            state.unread += 1;
            id
        };

        match kind {
            NotificationKind::Error => tracing::warn!(id, "{}", message),
            NotificationKind::Warning => tracing::warn!(id, "{}", message),
            _ => tracing::info!(id, "{}", message),
        }

        if self.desktop {
            self.deliver(kind, &message);
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.add(NotificationKind::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.add(NotificationKind::Error, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.add(NotificationKind::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.add(NotificationKind::Warning, message)
    }

    /// Converts an error into its user-facing notification.
    pub fn report(&self, err: &ClimateError) -> u64 {
        self.error(err.user_message())
    }

    /// Removes one notification. Returns false if it did not exist.
    pub fn remove(&self, id: u64) -> bool {
        let mut state = self.state.write().unwrap();
        let before = state.items.len();
        state.items.retain(|n| n.id != id);
        state.items.len() != before
    }

    /// Removes every notification and resets the unread counter.
    pub fn clear_all(&self) {
        let mut state = self.state.write().unwrap();
        state.items.clear();
        state.unread = 0;
    }

    /// Resets the unread counter without removing anything.
    pub fn mark_all_read(&self) {
        self.state.write().unwrap().unread = 0;
    }

    pub fn unread_count(&self) -> usize {
        self.state.read().unwrap().unread
    }

    /// Returns a snapshot, newest first.
    pub fn list(&self) -> Vec<Notification> {
        self.state.read().unwrap().items.clone()
    }

    /// Returns the most recent notification.
    pub fn latest(&self) -> Option<Notification> {
        self.state.read().unwrap().items.first().cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(feature = "desktop-notifications")]
    fn deliver(&self, kind: NotificationKind, message: &str) {
        use notify_rust::Notification as DesktopNotification;

        let summary = match kind {
            NotificationKind::Success => "ClimateVision",
            NotificationKind::Error => "ClimateVision - Error",
            NotificationKind::Info => "ClimateVision",
            NotificationKind::Warning => "ClimateVision - Warning",
        };

        if let Err(e) = DesktopNotification::new()
            .summary(summary)
            .body(message)
            .appname("ClimateVision")
            .timeout(notify_rust::Timeout::Milliseconds(5000))
            .show()
        {
            tracing::debug!("Desktop notification failed: {}", e);
        }
    }

    #[cfg(not(feature = "desktop-notifications"))]
    fn deliver(&self, _kind: NotificationKind, _message: &str) {}
}
