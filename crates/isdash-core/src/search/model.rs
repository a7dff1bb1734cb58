//! Search domain models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Filter key restricting results to records created (or authored) by a DID.
pub const OWNER_FILTER_KEY: &str = "owner";

/// Identifies one logical search invocation.
///
/// Tokens are minted by a controller from a monotonically increasing counter,
/// so two invocations of the same controller never share a token.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SearchToken(u64);

impl SearchToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the token that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SearchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scalar filter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => f.write_str(s),
            FilterValue::Integer(i) => write!(f, "{}", i),
            FilterValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Mapping from filter name to an optional scalar.
///
/// A key mapped to `None` is treated as "unset" and never reaches the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(flatten)]
    entries: BTreeMap<String, Option<FilterValue>>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to records owned by `did`.
    pub fn with_owner(mut self, did: impl Into<String>) -> Self {
        self.set(OWNER_FILTER_KEY, Some(FilterValue::Text(did.into())));
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.set(key, Some(value.into()));
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: Option<FilterValue>) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.get(key).and_then(|v| v.as_ref())
    }

    /// The owner DID, when the owner filter is set to a text value.
    pub fn owner(&self) -> Option<&str> {
        match self.get(OWNER_FILTER_KEY) {
            Some(FilterValue::Text(did)) => Some(did.as_str()),
            _ => None,
        }
    }

    /// Set filters other than the owner filter, in key order.
    pub fn extra(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != OWNER_FILTER_KEY)
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Option::is_none)
    }
}

/// Caller-supplied options for one search invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Number of records wanted up front. Sizes the opening request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default)]
    pub filters: SearchFilters,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Value object describing one controller invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub filters: SearchFilters,
    pub page_size: usize,
    pub limit: Option<usize>,
    pub token: SearchToken,
}

/// Where newly fetched pages are merged into the accumulated results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertionOrder {
    /// New pages go after earlier pages (default)
    #[default]
    Append,
    /// New pages go before earlier pages
    Prepend,
}

/// Position for a single record added outside the page loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Front,
    Back,
}

/// Criteria for one listing request against a paginated endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_filter: Option<String>,
    /// Remaining filters, already rendered to strings
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_filters: Vec<(String, String)>,
    pub page_index: u32,
    pub page_size: usize,
    pub sort_descending: bool,
}

/// Event published by a search controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchEvent {
    /// An invocation began its page loop
    Started { token: SearchToken, query: String },
    /// A page was merged into the result set
    PageLoaded {
        token: SearchToken,
        page_index: u32,
        records: usize,
    },
    /// A page fetch failed and was treated as empty
    SearchPageFailed {
        query: String,
        page_index: u32,
        message: String,
    },
    /// The caller was not authenticated; nothing was fetched
    Unauthenticated { query: String },
    /// An invocation reached a terminal state
    Finished { token: SearchToken, total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_next_is_strictly_greater() {
        let t = SearchToken::new(7);
        assert!(t.next() > t);
        assert_eq!(t.next().value(), 8);
    }

    #[test]
    fn test_filters_owner_and_extra() {
        let mut filters = SearchFilters::new()
            .with_owner("did:iota:me")
            .with("hidden", false)
            .with("type", "Person");
        filters.set("unset", None);

        assert_eq!(filters.owner(), Some("did:iota:me"));
        let extra: Vec<_> = filters
            .extra()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            extra,
            vec![
                ("hidden".to_string(), "false".to_string()),
                ("type".to_string(), "Person".to_string()),
            ]
        );
    }

    #[test]
    fn test_filters_with_only_unset_values_are_empty() {
        let mut filters = SearchFilters::new();
        assert!(filters.is_empty());
        filters.set("owner", None);
        assert!(filters.is_empty());
        assert_eq!(filters.owner(), None);
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = SearchEvent::SearchPageFailed {
            query: "alice".into(),
            page_index: 2,
            message: "boom".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "search_page_failed");
        assert_eq!(json["page_index"], 2);
    }
}
