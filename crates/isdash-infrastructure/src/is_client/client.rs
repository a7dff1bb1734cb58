use isdash_core::auth::AuthRepository;
use isdash_core::config::ApiConfig;
use isdash_core::error::{IsdashError, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Shared connection to an Integration Services gateway.
///
/// Every request carries the API key as the `api-key` query parameter and,
/// when a session is stored, the JWT as a bearer token.
#[derive(Clone)]
pub struct IsApiClient {
    http: Client,
    gateway_url: String,
    api_version: String,
    api_key: Option<String>,
    auth: Option<Arc<dyn AuthRepository>>,
}

impl IsApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| IsdashError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            auth: None,
        })
    }

    /// Sends the stored JWT with every request.
    pub fn with_auth(mut self, auth: Arc<dyn AuthRepository>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Full URL of an API path, e.g. `identities/search`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/{}/{}",
            self.gateway_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// GETs `path` and decodes the JSON body.
    ///
    /// `lookup` names the entity for single-record lookups, turning a 404
    /// into `NotFound`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        lookup: Option<(&'static str, &str)>,
    ) -> Result<T> {
        let url = self.endpoint(path);
        let mut request = self.http.get(&url).query(query);
        if let Some(api_key) = &self.api_key {
            request = request.query(&[("api-key", api_key)]);
        }
        if let Some(jwt) = self.jwt().await? {
            request = request.bearer_auth(jwt);
        }

        tracing::debug!(url = %url, "GET");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, body, lookup));
        }
        Ok(response.json::<T>().await?)
    }

    async fn jwt(&self) -> Result<Option<String>> {
        let Some(auth) = &self.auth else {
            return Ok(None);
        };
        Ok(auth
            .load()
            .await?
            .filter(|data| data.is_authenticated())
            .map(|data| data.jwt))
    }
}

fn status_error(status: StatusCode, body: String, lookup: Option<(&'static str, &str)>) -> IsdashError {
    match (status, lookup) {
        (StatusCode::UNAUTHORIZED, _) => IsdashError::Unauthenticated,
        (StatusCode::NOT_FOUND, Some((entity_type, id))) => IsdashError::not_found(entity_type, id),
        _ => IsdashError::http_status(
            status.as_u16(),
            format!("IS API error ({}): {}", status, body),
        ),
    }
}
