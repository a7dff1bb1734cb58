use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::search::SearchRecord;

/// Topic a channel publishes under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTopic {
    #[serde(rename = "type")]
    pub topic_type: String,
    pub source: String,
}

/// Channel metadata as returned by the channel-info endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    pub channel_address: String,
    pub author_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub subscriber_ids: Vec<String>,

    #[serde(default)]
    pub topics: Vec<ChannelTopic>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_message: Option<DateTime<Utc>>,
}

impl ChannelInfo {
    pub fn is_owned_by(&self, did: &str) -> bool {
        self.author_id == did
    }

    /// True for subscribers other than the author.
    pub fn is_subscribed_by(&self, did: &str) -> bool {
        self.subscriber_ids.iter().any(|id| id == did) && !self.is_owned_by(did)
    }

    /// The relation of `did` to this channel. Authors are always authorized.
    pub fn subscription_state(&self, did: &str) -> SubscriptionState {
        if self.is_owned_by(did) {
            SubscriptionState::Authorized
        } else if self.is_subscribed_by(did) {
            SubscriptionState::Subscribed
        } else {
            SubscriptionState::NotSubscribed
        }
    }
}

impl SearchRecord for ChannelInfo {
    fn record_id(&self) -> &str {
        &self.channel_address
    }
}

/// Body of a channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLog {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub log_type: Option<String>,

    pub created: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_payload: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// A message read from a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelData {
    pub link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    pub log: ChannelLog,
}

/// Time window for a channel read. Unset bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadWindow {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// The authenticated user's relation to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionState {
    Authorized,
    Subscribed,
    NotSubscribed,
}
