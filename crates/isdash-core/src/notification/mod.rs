//! Notifications surfaced to the user.

pub mod model;

pub use model::{Notification, NotificationKind, NotificationSink, NotificationTimeout};
