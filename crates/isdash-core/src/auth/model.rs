use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IsdashError, Result};
use crate::identity::UserRole;

/// Credentials of the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationData {
    pub did: String,
    pub jwt: String,
}

impl AuthenticationData {
    pub fn new(did: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            jwt: jwt.into(),
        }
    }

    /// A session counts as authenticated once it carries a non-empty JWT.
    pub fn is_authenticated(&self) -> bool {
        !self.jwt.is_empty()
    }

    pub fn claims(&self) -> Result<JwtClaims> {
        JwtClaims::decode(&self.jwt)
    }
}

/// User section of the JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// The subset of the JWT payload the dashboard reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtClaims {
    /// Expiry as seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub user: Option<JwtUser>,
}

impl JwtClaims {
    /// Decodes the payload segment of a JWT without verifying its signature.
    pub fn decode(token: &str) -> Result<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| IsdashError::InvalidToken("missing payload segment".into()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| IsdashError::InvalidToken(format!("payload is not base64url: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IsdashError::InvalidToken(format!("payload is not JSON: {}", e)))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// Tokens without an `exp` claim never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| now > expiry)
    }

    pub fn role(&self) -> UserRole {
        self.user
            .as_ref()
            .and_then(|u| u.role)
            .unwrap_or_default()
    }
}

/// Returns whether `token` has expired at `now`.
///
/// # Errors
/// `IsdashError::InvalidToken` when the payload cannot be decoded.
pub fn is_jwt_expired(token: &str, now: DateTime<Utc>) -> Result<bool> {
    Ok(JwtClaims::decode(token)?.is_expired_at(now))
}

#[cfg(test)]
pub(crate) fn encode_test_jwt(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}
