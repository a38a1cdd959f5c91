//! Push payload decoding and notification construction.
//!
//! Push messages arrive while no page may be open. The payload is expected
//! to be JSON with `title` and `body`, but a reminder may also arrive as
//! plain text, or with no payload at all; decoding degrades instead of
//! failing.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use snackkit_common::NotificationConfig;
use std::sync::Mutex;

use crate::ServiceWorkerError;

/// Decoded push message content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
}

impl PushPayload {
    /// Decode an inbound push payload.
    ///
    /// - No payload: fixed default title and body.
    /// - JSON with `title` and `body`: used as-is.
    /// - Anything else: default title, raw text as the body.
    pub fn decode(defaults: &NotificationConfig, data: Option<&[u8]>) -> Self {
        match data {
            None => Self {
                title: defaults.default_title.clone(),
                body: defaults.default_body.clone(),
            },
            Some(raw) => match serde_json::from_slice::<PushPayload>(raw) {
                Ok(payload) => payload,
                Err(_) => Self {
                    title: defaults.default_title.clone(),
                    body: String::from_utf8_lossy(raw).into_owned(),
                },
            },
        }
    }
}

/// The closed set of check-in actions a notification offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckinAction {
    Passed,
    Stopped,
}

impl CheckinAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckinAction::Passed => "passed",
            CheckinAction::Stopped => "stopped",
        }
    }

    /// Parse a platform action identifier. Anything unknown counts as a
    /// plain body click.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "passed" => Some(CheckinAction::Passed),
            "stopped" => Some(CheckinAction::Stopped),
            _ => None,
        }
    }

    /// The flag sent to the check-in endpoint.
    pub fn passed(self) -> bool {
        matches!(self, CheckinAction::Passed)
    }
}

/// A labeled button on a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub action: CheckinAction,
    pub title: String,
}

/// A notification ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibration: Vec<u32>,
    /// Deduplication tag: a new notification with the same tag replaces the
    /// one currently showing instead of stacking.
    pub tag: String,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the reminder notification: decoded payload content plus the
    /// fixed appearance and the two check-in actions.
    pub fn reminder(config: &NotificationConfig, payload: PushPayload) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            icon: config.icon.clone(),
            badge: config.badge.clone(),
            vibration: config.vibration.clone(),
            tag: config.tag.clone(),
            actions: vec![
                NotificationAction {
                    action: CheckinAction::Passed,
                    title: config.passed_label.clone(),
                },
                NotificationAction {
                    action: CheckinAction::Stopped,
                    title: config.stopped_label.clone(),
                },
            ],
        }
    }
}

/// Rendering seam for notifications.
///
/// Push messages are not redelivered by the platform layer, so a failed
/// `show` is final: log it, never retry.
pub trait NotificationSink: Send + Sync {
    /// Render a notification, replacing any notification with the same tag.
    fn show(&self, notification: Notification) -> Result<(), ServiceWorkerError>;

    /// Dismiss the notification currently shown under `tag`, if any.
    fn close(&self, tag: &str);
}

/// In-memory notification tray, keyed by tag.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    shown: Mutex<HashMap<String, Notification>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The notification currently shown under `tag`, if any.
    pub fn shown(&self, tag: &str) -> Option<Notification> {
        self.lock().get(tag).cloned()
    }

    /// How many notifications are showing.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Notification>> {
        self.shown.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationSink for NotificationCenter {
    fn show(&self, notification: Notification) -> Result<(), ServiceWorkerError> {
        self.lock().insert(notification.tag.clone(), notification);
        Ok(())
    }

    fn close(&self, tag: &str) {
        self.lock().remove(tag);
    }
}
