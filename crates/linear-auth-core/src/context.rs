//! Wiring of the credential layer for one process

use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::CredentialCache;
use crate::client::LinearClientFactory;
use crate::config::CredentialConfig;
use crate::error::Result;
use crate::manage::AuthManager;
use crate::resolver::CredentialResolver;
use crate::storage::{FileBackend, KeychainBackend, SecretBackend};
use crate::store::CredentialStore;

/// All credential components sharing one cache
pub struct AuthContext {
    pub resolver: Arc<CredentialResolver>,
    pub store: Arc<CredentialStore>,
    pub clients: Arc<LinearClientFactory>,
    pub manager: AuthManager,
}

impl AuthContext {
    /// Build the layer for the current platform.
    ///
    /// Fails with `UnsupportedPlatform` where no native vault is supported;
    /// there is deliberately no file-only mode.
    pub async fn new(config: &CredentialConfig) -> Result<Self> {
        let primary = Arc::new(KeychainBackend::for_current_platform(config)?);
        let fallback = Arc::new(FileBackend::new(config.env_path.clone()));
        info!(
            "Credential backends: {} then {:?}",
            primary.vault_name(),
            config.env_path
        );
        Ok(Self::with_backends(primary, fallback, config).await)
    }

    /// Build the layer over explicit backends (for testing)
    pub async fn with_backends(
        primary: Arc<dyn SecretBackend>,
        fallback: Arc<dyn SecretBackend>,
        config: &CredentialConfig,
    ) -> Self {
        let cache = CredentialCache::new();
        let resolver = Arc::new(CredentialResolver::new(primary, fallback, cache));
        let store = Arc::new(CredentialStore::new(resolver.clone()));
        let clients = Arc::new(LinearClientFactory::new(
            resolver.clone(),
            config.endpoint.clone(),
        ));
        store.subscribe(clients.clone()).await;

        let manager = AuthManager::new(resolver.clone(), store.clone());
        debug!("Credential layer ready");

        Self {
            resolver,
            store,
            clients,
            manager,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredentialError;
    use crate::manage::{AuthAction, AuthOutcome};
    use crate::testing::MemoryBackend;
    use std::path::Path;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_setup_through_manager_invalidates_clients() {
        let dir = TempDir::new().unwrap();
        let config = CredentialConfig::with_home(dir.path());
        let context = AuthContext::with_backends(
            Arc::new(MemoryBackend::new()),
            Arc::new(FileBackend::new(config.env_path.clone())),
            &config,
        )
        .await;

        assert!(matches!(
            context.clients.get_client().await,
            Err(CredentialError::NotConfigured)
        ));

        let report = context
            .manager
            .handle(AuthAction::Setup, Some("lin_api_abcdefghijklmno1234"))
            .await;
        assert_eq!(report.outcome, AuthOutcome::Saved);
        assert_eq!(report.status.backing_path, config.env_path);
        assert!(!report.status.backing_exists);

        assert!(context.clients.get_client().await.is_ok());
    }

    #[tokio::test]
    async fn test_new_selects_platform_vault() {
        let config = CredentialConfig::with_home(Path::new("/nonexistent-home"));
        let result = AuthContext::new(&config).await;

        if cfg!(any(target_os = "macos", target_os = "linux")) {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(CredentialError::UnsupportedPlatform { .. })
            ));
        }
    }
}
