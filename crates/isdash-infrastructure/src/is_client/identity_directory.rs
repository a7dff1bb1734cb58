use async_trait::async_trait;
use isdash_core::error::Result;
use isdash_core::identity::Identity;
use isdash_core::search::{PageCriteria, PaginatedFetchService};
use std::sync::Arc;

use super::IsApiClient;

/// Identity search and lookup over `identities/*`.
#[derive(Clone)]
pub struct IdentityDirectory {
    client: Arc<IsApiClient>,
}

impl IdentityDirectory {
    pub fn new(client: Arc<IsApiClient>) -> Self {
        Self { client }
    }
}

/// Query parameters of `GET identities/search`.
fn search_query(criteria: &PageCriteria) -> Vec<(String, String)> {
    let mut query = Vec::new();
    let mut push = |key: &str, value: &str| query.push((key.to_string(), value.to_string()));

    if let Some(username) = &criteria.free_text_query {
        push("username", username);
    }
    if let Some(user_type) = &criteria.type_query {
        push("type", user_type);
    }
    if let Some(creator) = criteria.owner_filter.as_deref().or(criteria.identifier_query.as_deref()) {
        push("creator", creator);
    }
    for (key, value) in &criteria.extra_filters {
        push(key, value);
    }
    push("limit", &criteria.page_size.to_string());
    push("index", &criteria.page_index.to_string());
    push("asc", &(!criteria.sort_descending).to_string());
    query
}

#[async_trait]
impl PaginatedFetchService for IdentityDirectory {
    type Record = Identity;

    async fn fetch_page(&self, criteria: &PageCriteria) -> Result<Vec<Identity>> {
        let identities: Vec<Identity> = self
            .client
            .get_json("identities/search", &search_query(criteria), None)
            .await?;
        Ok(identities)
    }

    async fn fetch_by_identifier(&self, id: &str) -> Result<Identity> {
        let identity: Identity = self
            .client
            .get_json(
                &format!("identities/identity/{}", id),
                &[],
                Some(("identity", id)),
            )
            .await?;
        Ok(identity.with_credential_count())
    }
}
