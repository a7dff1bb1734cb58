use async_trait::async_trait;
use chrono::SecondsFormat;
use isdash_core::channel::{ChannelData, ChannelInfo, ChannelReader, ReadWindow};
use isdash_core::error::Result;
use isdash_core::search::{PageCriteria, PaginatedFetchService};
use std::sync::Arc;

use super::IsApiClient;

/// Channel search, lookup and reads over `channel-info/*` and `channels/*`.
#[derive(Clone)]
pub struct ChannelDirectory {
    client: Arc<IsApiClient>,
}

impl ChannelDirectory {
    pub fn new(client: Arc<IsApiClient>) -> Self {
        Self { client }
    }
}

/// Query parameters of `GET channel-info/search`.
///
/// An identifier query lists the channels of that author and takes
/// precedence over the owner filter.
fn search_query(criteria: &PageCriteria) -> Vec<(String, String)> {
    let mut query = Vec::new();
    let mut push = |key: &str, value: &str| query.push((key.to_string(), value.to_string()));

    if let Some(author) = criteria.identifier_query.as_deref().or(criteria.owner_filter.as_deref()) {
        push("author-id", author);
    }
    if let Some(source) = &criteria.free_text_query {
        push("topic-source", source);
    }
    if let Some(topic_type) = &criteria.type_query {
        push("topic-type", topic_type);
    }
    for (key, value) in &criteria.extra_filters {
        push(key, value);
    }
    push("limit", &criteria.page_size.to_string());
    push("index", &criteria.page_index.to_string());
    push("asc", &(!criteria.sort_descending).to_string());
    query
}

/// Query parameters of `GET channels/logs/{address}`.
fn read_query(window: &ReadWindow) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(start) = window.start_date {
        query.push((
            "start-date".to_string(),
            start.to_rfc3339_opts(SecondsFormat::Millis, true),
        ));
    }
    if let Some(end) = window.end_date {
        query.push((
            "end-date".to_string(),
            end.to_rfc3339_opts(SecondsFormat::Millis, true),
        ));
    }
    query
}

#[async_trait]
impl PaginatedFetchService for ChannelDirectory {
    type Record = ChannelInfo;

    async fn fetch_page(&self, criteria: &PageCriteria) -> Result<Vec<ChannelInfo>> {
        self.client
            .get_json("channel-info/search", &search_query(criteria), None)
            .await
    }

    async fn fetch_by_identifier(&self, id: &str) -> Result<ChannelInfo> {
        self.client
            .get_json(
                &format!("channel-info/channel/{}", id),
                &[],
                Some(("channel", id)),
            )
            .await
    }
}

#[async_trait]
impl ChannelReader for ChannelDirectory {
    async fn read(&self, channel_address: &str, window: ReadWindow) -> Result<Vec<ChannelData>> {
        self.client
            .get_json(
                &format!("channels/logs/{}", channel_address),
                &read_query(&window),
                None,
            )
            .await
    }
}
