//! Notification center with timed dismissal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use isdash_core::config::NotificationSettings;
use isdash_core::notification::{Notification, NotificationSink, NotificationTimeout};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::observable::{Observable, Subscription};

/// Holds the visible notifications, oldest first.
#[derive(Clone)]
pub struct NotificationCenter {
    notifications: Arc<Observable<Vec<Notification>>>,
    /// Pending dismissal timer per notification id.
    timers: Arc<Mutex<HashMap<String, CancellationToken>>>,
    default_timeout: Duration,
}

impl NotificationCenter {
    pub fn new(settings: &NotificationSettings) -> Self {
        Self {
            notifications: Arc::new(Observable::new(Vec::new())),
            timers: Arc::new(Mutex::new(HashMap::new())),
            default_timeout: settings.default_timeout(),
        }
    }

    /// Adds `notification` and returns its new id.
    ///
    /// Unless persistent, the notification is removed once its timeout
    /// elapses.
    pub fn show(&self, mut notification: Notification) -> String {
        let id = Uuid::new_v4().to_string();
        notification.id = Some(id.clone());
        let timeout = notification.timeout;
        tracing::debug!(id = %id, message = %notification.message, "show notification");

        self.notifications.update(|list| list.push(notification));
        self.schedule_removal(&id, timeout);
        id
    }

    /// Removes the notification with `id`. Unknown ids are ignored.
    pub fn remove(&self, id: &str) {
        self.cancel_timer(id);
        let present = self
            .notifications
            .with(|list| list.iter().any(|n| n.id.as_deref() == Some(id)));
        if present {
            self.notifications
                .update(|list| list.retain(|n| n.id.as_deref() != Some(id)));
        }
    }

    /// Replaces the message and restarts the timeout of a shown notification.
    ///
    /// Returns false when no notification has `id`.
    pub fn update(&self, id: &str, message: impl Into<String>, timeout: NotificationTimeout) -> bool {
        let present = self
            .notifications
            .with(|list| list.iter().any(|n| n.id.as_deref() == Some(id)));
        if !present {
            return false;
        }

        let message = message.into();
        self.notifications.update(|list| {
            if let Some(n) = list.iter_mut().find(|n| n.id.as_deref() == Some(id)) {
                n.message = message;
                n.timeout = timeout;
            }
        });
        self.schedule_removal(id, timeout);
        true
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.get()
    }

    pub fn clear(&self) {
        for (_, timer) in self.lock_timers().drain() {
            timer.cancel();
        }
        self.notifications.set(Vec::new());
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&Vec<Notification>) + Send + Sync + 'static,
    ) -> Subscription {
        self.notifications.subscribe(listener)
    }

    fn lock_timers(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_timer(&self, id: &str) {
        if let Some(timer) = self.lock_timers().remove(id) {
            timer.cancel();
        }
    }

    /// Replaces any pending timer of `id` with one for `timeout`.
    fn schedule_removal(&self, id: &str, timeout: NotificationTimeout) {
        self.cancel_timer(id);
        let delay = match timeout {
            NotificationTimeout::Persistent => return,
            NotificationTimeout::Default => self.default_timeout,
            NotificationTimeout::After(delay) => delay,
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(id, "no runtime, notification will not auto-dismiss");
            return;
        };

        let cancel = CancellationToken::new();
        self.lock_timers().insert(id.to_string(), cancel.clone());
        let center = self.clone();
        let id = id.to_string();
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => center.remove(&id),
            }
        });
    }
}

impl NotificationSink for NotificationCenter {
    fn notify(&self, notification: Notification) -> String {
        self.show(notification)
    }
}
