//! Dashboard configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer; every field has a
//! default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::search::InsertionOrder;

/// Records requested per page when the caller gives no limit.
pub const DEFAULT_SDK_CLIENT_REQUEST_LIMIT: usize = 2;
/// Records requested for the welcome list on first load.
pub const WELCOME_LIST_RESULTS_NUMBER: usize = 5;
pub const DEFAULT_API_VERSION: &str = "v0.1";
pub const FEED_INTERVAL_MS: u64 = 5_000;
pub const NOTIFICATION_TIMEOUT_DEFAULT_MS: u64 = 5_000;
pub const JWT_CHECK_INTERVAL_SECS: u64 = 60;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub search: SearchSettings,
    pub feed: FeedSettings,
    pub notifications: NotificationSettings,
    pub auth: AuthSettings,
}

/// Integration Services gateway connection settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub gateway_url: String,
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:3000".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Behaviour of a search controller.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Page size used when the caller gives no limit
    pub page_size: usize,
    /// Limit applied to the welcome list on first load
    pub welcome_list_size: usize,
    /// Newest records first
    pub sort_descending: bool,
    pub insertion_order: InsertionOrder,
    /// Fixed pause between consecutive page requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_delay_ms: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_SDK_CLIENT_REQUEST_LIMIT,
            welcome_list_size: WELCOME_LIST_RESULTS_NUMBER,
            sort_descending: true,
            insertion_order: InsertionOrder::Append,
            page_delay_ms: None,
        }
    }
}

impl SearchSettings {
    pub fn page_delay(&self) -> Option<Duration> {
        self.page_delay_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Returns a copy with `page_size` forced to at least one.
    pub fn normalized(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeedSettings {
    pub interval_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            interval_ms: FEED_INTERVAL_MS,
        }
    }
}

impl FeedSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationSettings {
    pub default_timeout_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: NOTIFICATION_TIMEOUT_DEFAULT_MS,
        }
    }
}

impl NotificationSettings {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_check_interval_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_check_interval_secs: JWT_CHECK_INTERVAL_SECS,
        }
    }
}

impl AuthSettings {
    pub fn jwt_check_interval(&self) -> Duration {
        Duration::from_secs(self.jwt_check_interval_secs.max(1))
    }
}
