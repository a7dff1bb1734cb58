use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Error,
}

/// How long a notification stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTimeout {
    /// The center's configured default
    #[default]
    Default,
    After(Duration),
    /// Stays until removed explicitly
    Persistent,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Assigned by the notification center when shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    #[serde(default)]
    pub timeout: NotificationTimeout,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: NotificationKind::Error,
            title: None,
            message: message.into(),
            timeout: NotificationTimeout::Default,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            ..Self::error(message)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_timeout(mut self, timeout: NotificationTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn persistent(self) -> Self {
        self.with_timeout(NotificationTimeout::Persistent)
    }
}

/// Anything that can display notifications.
pub trait NotificationSink: Send + Sync {
    /// Shows `notification` and returns its assigned id.
    fn notify(&self, notification: Notification) -> String;
}
