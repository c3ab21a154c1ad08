//! Authenticated Linear API client and its lazily built singleton

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error};
use url::Url;

use crate::credential::ApiKey;
use crate::error::{CredentialError, Result};
use crate::resolver::CredentialResolver;
use crate::store::CredentialListener;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Map a raw API failure message to a caller-facing error
fn classify(message: &str) -> CredentialError {
    let lower = message.to_lowercase();
    let text = if lower.contains("authentication") {
        "Linear API authentication failed. Check your API key.".to_string()
    } else if lower.contains("not found") {
        format!("Resource not found: {}", message)
    } else if lower.contains("permission") {
        format!("Permission denied: {}", message)
    } else {
        format!("Linear API error: {}", message)
    };
    CredentialError::Api(text)
}

/// HTTP client carrying the API key on every request
#[derive(Debug)]
pub struct LinearClient {
    http: Client,
    endpoint: Url,
}

impl LinearClient {
    /// Build a client for `endpoint` authenticated with `key`
    pub fn new(key: &ApiKey, endpoint: Url) -> Result<Self> {
        let mut auth = HeaderValue::from_str(key.expose()).map_err(|_| {
            CredentialError::Api("API key contains characters not allowed in a header".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run a GraphQL query or mutation and decode its `data`
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T> {
        let body = json!({
            "query": query,
            "variables": variables.unwrap_or_else(|| json!({})),
        });

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("GraphQL response status: {}", status);

        let parsed: GraphQlResponse<T> = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                error!("Unexpected GraphQL response body: {}", e);
                return Err(classify(&format!("invalid response: {}", e)));
            }
            Err(_) => return Err(classify(&format!("HTTP {}: {}", status, text))),
        };

        if !parsed.errors.is_empty() {
            let message = parsed
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(classify(&message));
        }

        if !status.is_success() {
            return Err(classify(&format!("HTTP {}", status)));
        }

        parsed
            .data
            .ok_or_else(|| classify("response contained no data"))
    }
}

/// Lazily builds one [`LinearClient`] and rebuilds it after invalidation
pub struct LinearClientFactory {
    resolver: Arc<CredentialResolver>,
    endpoint: Url,
    client: Mutex<Option<Arc<LinearClient>>>,
}

impl LinearClientFactory {
    pub fn new(resolver: Arc<CredentialResolver>, endpoint: Url) -> Self {
        Self {
            resolver,
            endpoint,
            client: Mutex::new(None),
        }
    }

    /// The shared client, built on first use from the current key
    pub async fn get_client(&self) -> Result<Arc<LinearClient>> {
        let mut slot = self.client.lock().await;

        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let key = match self.resolver.cached().await {
            Some(key) => key,
            None => self
                .resolver
                .get_credential()
                .await
                .ok_or(CredentialError::NotConfigured)?,
        };

        let client = Arc::new(LinearClient::new(&key, self.endpoint.clone())?);
        *slot = Some(client.clone());

        debug!("Built Linear client with key {}", key.masked());
        Ok(client)
    }

    /// Drop the cached client so the next request re-resolves the key
    pub async fn invalidate(&self) {
        if self.client.lock().await.take().is_some() {
            debug!("Linear client invalidated");
        }
    }
}

#[async_trait]
impl CredentialListener for LinearClientFactory {
    async fn invalidate(&self) {
        LinearClientFactory::invalidate(self).await;
    }
}
