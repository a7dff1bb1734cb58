use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::search::SearchRecord;

/// Kind of entity an identity claims to be.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum UserType {
    Organization,
    Service,
    Person,
    Device,
    Product,
    Unknown,
}

/// Role of the authenticated user, as carried in the JWT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    User,
}

/// An identity as returned by the identities endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<serde_json::Value>,

    #[serde(default)]
    pub verifiable_credentials: Vec<serde_json::Value>,

    #[serde(default)]
    pub is_server_identity: bool,

    #[serde(default)]
    pub hidden: bool,

    /// Populated client-side: the search endpoint does not report it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_credentials: Option<usize>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            registration_date: None,
            creator: None,
            role: None,
            claim: None,
            verifiable_credentials: Vec::new(),
            is_server_identity: false,
            hidden: false,
            number_of_credentials: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// The `type` field of the identity's claim, when present.
    pub fn claim_type(&self) -> Option<&str> {
        self.claim.as_ref()?.get("type")?.as_str()
    }

    /// Fills in `number_of_credentials` from the embedded credentials.
    pub fn with_credential_count(mut self) -> Self {
        self.number_of_credentials = Some(self.verifiable_credentials.len());
        self
    }
}

impl SearchRecord for Identity {
    fn record_id(&self) -> &str {
        &self.id
    }
}
