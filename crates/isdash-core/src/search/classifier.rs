//! Query classification.
//!
//! A raw query string means different things depending on its shape: a DID
//! asks for a direct lookup, a user type name asks for a type listing, and
//! anything else is a free-text token.

use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use crate::identity::UserType;

/// Prefix shared by every IOTA decentralized identifier.
pub const DID_PREFIX: &str = "did:iota:";

static CHANNEL_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{80}:[0-9a-f]{24}$").expect("channel address pattern is valid")
});

/// How the controller should treat a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryClassification {
    /// Fetch exactly one record by identifier, no pagination
    Lookup(String),
    /// Paginated listing filtered by an identifier (e.g. a channel's author DID)
    IdentifierListing(String),
    /// Paginated listing filtered by a free-text token
    FreeText(String),
    /// Paginated listing filtered by a type name
    TypeName(String),
}

/// Decides how a raw query is interpreted.
pub trait QueryClassifier: Send + Sync {
    fn classify(&self, query: &str) -> QueryClassification;
}

/// Any `Fn(&str) -> QueryClassification` is a classifier.
impl<F> QueryClassifier for F
where
    F: Fn(&str) -> QueryClassification + Send + Sync,
{
    fn classify(&self, query: &str) -> QueryClassification {
        self(query)
    }
}

pub fn is_did(query: &str) -> bool {
    query.starts_with(DID_PREFIX)
}

pub fn is_channel_address(query: &str) -> bool {
    CHANNEL_ADDRESS.is_match(query)
}

/// Classifier for identity search.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityQueryClassifier;

impl QueryClassifier for IdentityQueryClassifier {
    fn classify(&self, query: &str) -> QueryClassification {
        if is_did(query) {
            QueryClassification::Lookup(query.to_string())
        } else if UserType::from_str(query).is_ok() {
            QueryClassification::TypeName(query.to_string())
        } else {
            QueryClassification::FreeText(query.to_string())
        }
    }
}

/// Classifier for channel search.
///
/// A DID lists the channels authored by that identity; a full channel
/// address is looked up directly; anything else matches the topic source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelQueryClassifier;

impl QueryClassifier for ChannelQueryClassifier {
    fn classify(&self, query: &str) -> QueryClassification {
        if is_did(query) {
            QueryClassification::IdentifierListing(query.to_string())
        } else if is_channel_address(query) {
            QueryClassification::Lookup(query.to_string())
        } else {
            QueryClassification::FreeText(query.to_string())
        }
    }
}
