//! Write-side orchestration: setup and removal of the API key

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::credential::validated;
use crate::error::Result;
use crate::resolver::CredentialResolver;

/// Something holding state derived from the API key
#[async_trait]
pub trait CredentialListener: Send + Sync {
    /// Drop anything built from the previous key
    async fn invalidate(&self);
}

/// Validates, persists and publishes API key changes
pub struct CredentialStore {
    resolver: Arc<CredentialResolver>,
    listeners: RwLock<Vec<Arc<dyn CredentialListener>>>,
    /// Serializes validate -> backend write -> cache update -> invalidation
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store writing through the resolver's backends
    pub fn new(resolver: Arc<CredentialResolver>) -> Self {
        Self {
            resolver,
            listeners: RwLock::new(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Register a listener to be invalidated on every change
    pub async fn subscribe(&self, listener: Arc<dyn CredentialListener>) {
        self.listeners.write().await.push(listener);
    }

    /// Validate `raw` and store it in the keychain.
    ///
    /// Nothing is written when validation fails. The env file is never
    /// written here; it stays a read fallback for older installations.
    pub async fn set_credential(&self, raw: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let key = validated(raw)?;

        let primary = self.resolver.primary();
        primary.store(&key).await?;

        self.resolver.cache().set(key.clone()).await;
        self.notify().await;

        info!("API key {} saved to {}", key.masked(), primary.backend_name());
        Ok(())
    }

    /// Remove the key from every backend.
    ///
    /// Each backend is attempted independently; failures are logged and do
    /// not stop the other attempt. Returns `true` if either backend removed
    /// something. The cache is cleared regardless.
    pub async fn remove_credential(&self) -> bool {
        let _guard = self.write_lock.lock().await;

        let mut removed = false;
        for backend in [self.resolver.primary(), self.resolver.fallback()] {
            match backend.delete().await {
                Ok(true) => {
                    info!("Removed API key from {}", backend.backend_name());
                    removed = true;
                }
                Ok(false) => debug!("No API key stored in {}", backend.backend_name()),
                Err(e) => warn!("Could not remove API key from {}: {}", backend.backend_name(), e),
            }
        }

        self.resolver.cache().clear().await;
        self.notify().await;

        removed
    }

    async fn notify(&self) {
        for listener in self.listeners.read().await.iter() {
            listener.invalidate().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CredentialCache;
    use crate::credential::ValidationFailure;
    use crate::error::CredentialError;
    use crate::resolver::CredentialSource;
    use crate::storage::{FileBackend, SecretBackend};
    use crate::testing::{FailingBackend, MemoryBackend, SlowBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    const KEY: &str = "lin_api_abcdefghijklmno1234";

    #[derive(Default)]
    struct CountingListener {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialListener for CountingListener {
        async fn invalidate(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        _dir: TempDir,
        primary: Arc<MemoryBackend>,
        file: Arc<FileBackend>,
        resolver: Arc<CredentialResolver>,
        store: CredentialStore,
        listener: Arc<CountingListener>,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let primary = Arc::new(MemoryBackend::new());
        let file = Arc::new(FileBackend::new(dir.path().join("plugins").join(".env")));
        let resolver = Arc::new(CredentialResolver::new(
            primary.clone(),
            file.clone(),
            CredentialCache::new(),
        ));
        let store = CredentialStore::new(resolver.clone());
        let listener = Arc::new(CountingListener::default());
        store.subscribe(listener.clone()).await;

        Fixture {
            _dir: dir,
            primary,
            file,
            resolver,
            store,
            listener,
        }
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let f = fixture().await;

        f.store.set_credential(KEY).await.unwrap();

        assert_eq!(f.resolver.cached().await.unwrap().expose(), KEY);
        assert_eq!(f.resolver.get_credential().await.unwrap().expose(), KEY);
        assert_eq!(f.listener.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_stores_trimmed_value_in_primary_only() {
        let f = fixture().await;

        f.store.set_credential(&format!("  {}\n", KEY)).await.unwrap();

        assert_eq!(f.primary.load().await.unwrap().unwrap().expose(), KEY);
        assert!(!f.file.exists());
    }

    #[tokio::test]
    async fn test_invalid_key_touches_nothing() {
        let f = fixture().await;
        assert!(f.primary.load().await.unwrap().is_none());

        let err = f.store.set_credential("bad-key").await.unwrap_err();
        assert_eq!(err.validation_failure(), Some(&ValidationFailure::WrongFormat));
        assert!(err.to_string().contains("wrong format"));

        assert!(f.primary.load().await.unwrap().is_none());
        assert!(f.file.load().await.unwrap().is_none());
        assert!(f.resolver.cached().await.is_none());
        assert_eq!(f.listener.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_propagates_and_leaves_cache() {
        let resolver = Arc::new(CredentialResolver::new(
            Arc::new(FailingBackend),
            Arc::new(MemoryBackend::new()),
            CredentialCache::new(),
        ));
        let store = CredentialStore::new(resolver.clone());

        let err = store.set_credential(KEY).await.unwrap_err();
        assert!(matches!(err, CredentialError::BackendUnavailable { .. }));
        assert!(resolver.cached().await.is_none());
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let f = fixture().await;

        f.store.set_credential("lin_api_abcdefghijklmno1234").await.unwrap();
        let status = f.resolver.get_status().await;
        assert!(status.configured);
        assert_eq!(status.source, CredentialSource::Primary);

        assert!(f.store.remove_credential().await);
        let status = f.resolver.get_status().await;
        assert!(!status.configured);
        assert_eq!(status.source, CredentialSource::None);
        assert!(f.resolver.get_credential().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_when_empty_is_idempotent() {
        let f = fixture().await;

        assert!(!f.store.remove_credential().await);
        assert!(!f.store.remove_credential().await);
        assert_eq!(f.listener.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remove_cleans_env_file() {
        let f = fixture().await;
        std::fs::create_dir_all(f.file.path().parent().unwrap()).unwrap();
        std::fs::write(
            f.file.path(),
            "FIRST=1\n# Linear API (for cycle management)\nLINEAR_API_KEY=lin_api_xxxxxxxxxxxxxxxxxxxx\nLAST=2\n",
        )
        .unwrap();
        assert_eq!(
            f.resolver.get_status().await.source,
            CredentialSource::Fallback
        );

        assert!(f.store.remove_credential().await);

        let content = std::fs::read_to_string(f.file.path()).unwrap();
        assert_eq!(content, "FIRST=1\nLAST=2\n");
        assert!(f.resolver.cached().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_continues_after_primary_failure() {
        let dir = TempDir::new().unwrap();
        let file = Arc::new(FileBackend::new(dir.path().join(".env")));
        file.store(&crate::credential::ApiKey::new(KEY)).await.unwrap();

        let cache = CredentialCache::new();
        cache.set(crate::credential::ApiKey::new(KEY)).await;
        let resolver = Arc::new(CredentialResolver::new(
            Arc::new(FailingBackend),
            file.clone(),
            cache.clone(),
        ));
        let store = CredentialStore::new(resolver);

        assert!(store.remove_credential().await);
        assert!(file.load().await.unwrap().is_none());
        assert!(cache.get().await.is_none());

        // Nothing left anywhere; the failing vault alone does not count as removal
        assert!(!store.remove_credential().await);
    }

    const OLD_KEY: &str = "lin_api_OLDOLDOLDOLDOLDOLD";
    const NEW_KEY: &str = "lin_api_NEWNEWNEWNEWNEWNEW";

    fn slow_resolver() -> Arc<CredentialResolver> {
        Arc::new(CredentialResolver::new(
            Arc::new(SlowBackend::with_value(OLD_KEY, Duration::from_millis(200))),
            Arc::new(MemoryBackend::new()),
            CredentialCache::new(),
        ))
    }

    #[tokio::test]
    async fn test_read_in_flight_does_not_restore_replaced_key() {
        let resolver = slow_resolver();
        let store = CredentialStore::new(resolver.clone());

        let reader = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.get_credential().await }
        });
        // Let the reader snapshot the old value before the write lands
        tokio::time::sleep(Duration::from_millis(50)).await;

        store.set_credential(NEW_KEY).await.unwrap();
        let read = reader.await.unwrap();

        assert_eq!(read.unwrap().expose(), NEW_KEY);
        assert_eq!(resolver.cached().await.unwrap().expose(), NEW_KEY);
    }

    #[tokio::test]
    async fn test_read_in_flight_does_not_restore_removed_key() {
        let resolver = slow_resolver();
        let store = CredentialStore::new(resolver.clone());

        let reader = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.get_credential().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.remove_credential().await);

        assert!(reader.await.unwrap().is_none());
        assert!(resolver.cached().await.is_none());
    }
}
