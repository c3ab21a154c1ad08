//! Read-side orchestration over the storage backends

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::CredentialCache;
use crate::credential::ApiKey;
use crate::storage::SecretBackend;

/// Which backend satisfied a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// OS keychain
    Primary,
    /// Env file
    Fallback,
    /// Nothing found
    None,
}

/// Computed view over backend state, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStatus {
    pub configured: bool,
    pub source: CredentialSource,
    /// Env file location
    pub backing_path: PathBuf,
    pub backing_exists: bool,
}

/// Resolves the API key across backends in fixed priority order
pub struct CredentialResolver {
    primary: Arc<dyn SecretBackend>,
    fallback: Arc<dyn SecretBackend>,
    cache: CredentialCache,
}

impl CredentialResolver {
    /// Create a resolver; `primary` is always consulted before `fallback`
    pub fn new(
        primary: Arc<dyn SecretBackend>,
        fallback: Arc<dyn SecretBackend>,
        cache: CredentialCache,
    ) -> Self {
        Self {
            primary,
            fallback,
            cache,
        }
    }

    pub fn primary(&self) -> &Arc<dyn SecretBackend> {
        &self.primary
    }

    pub fn fallback(&self) -> &Arc<dyn SecretBackend> {
        &self.fallback
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    fn by_priority(&self) -> [(CredentialSource, &dyn SecretBackend); 2] {
        [
            (CredentialSource::Primary, self.primary.as_ref()),
            (CredentialSource::Fallback, self.fallback.as_ref()),
        ]
    }

    /// Read backends in order and mirror the outcome into the cache.
    ///
    /// If the store changes the key while the backends are being read, the
    /// result is discarded and the backends are read again.
    async fn resolve(&self) -> Option<(CredentialSource, ApiKey)> {
        loop {
            let observed = self.cache.generation().await;
            let found = self.read_backends().await;
            let value = found.as_ref().map(|(_, key)| key.clone());
            if self.cache.publish(observed, value).await {
                return found;
            }
            debug!("API key changed during resolution, resolving again");
        }
    }

    async fn read_backends(&self) -> Option<(CredentialSource, ApiKey)> {
        for (source, backend) in self.by_priority() {
            let key = match backend.load().await {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(e) => {
                    warn!("{} lookup failed, trying next backend: {}", backend.backend_name(), e);
                    continue;
                }
            };

            if !key.has_expected_prefix() {
                warn!(
                    "Ignoring value in {} without the expected key prefix",
                    backend.backend_name()
                );
                continue;
            }

            let key = ApiKey::new(key.expose().trim());
            debug!("Resolved API key {} from {}", key.masked(), backend.backend_name());
            return Some((source, key));
        }

        debug!("No API key found in any backend");
        None
    }

    /// The current API key, or `None` if no backend holds a valid one
    pub async fn get_credential(&self) -> Option<ApiKey> {
        self.resolve().await.map(|(_, key)| key)
    }

    /// Whether any backend holds a valid key
    pub async fn is_configured(&self) -> bool {
        self.get_credential().await.is_some()
    }

    /// Resolve and report where the key came from
    pub async fn get_status(&self) -> ResolutionStatus {
        let source = self
            .resolve()
            .await
            .map(|(source, _)| source)
            .unwrap_or(CredentialSource::None);

        let backing_path = self
            .fallback
            .location()
            .map(|path| path.to_path_buf())
            .unwrap_or_default();
        let backing_exists = !backing_path.as_os_str().is_empty() && backing_path.exists();

        ResolutionStatus {
            configured: source != CredentialSource::None,
            source,
            backing_path,
            backing_exists,
        }
    }

    /// Last resolved key, without consulting backends
    pub async fn cached(&self) -> Option<ApiKey> {
        self.cache.get().await
    }
}
