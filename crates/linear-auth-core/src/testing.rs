//! Backend doubles for unit tests

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::credential::ApiKey;
use crate::error::{CredentialError, Result};
use crate::storage::SecretBackend;

/// Keychain stand-in holding the value in memory
#[derive(Default)]
pub struct MemoryBackend {
    value: RwLock<Option<ApiKey>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: &str) -> Self {
        Self {
            value: RwLock::new(Some(ApiKey::new(value))),
        }
    }
}

#[async_trait]
impl SecretBackend for MemoryBackend {
    async fn store(&self, value: &ApiKey) -> Result<()> {
        *self.value.write().await = Some(value.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<ApiKey>> {
        Ok(self.value.read().await.clone())
    }

    async fn delete(&self) -> Result<bool> {
        Ok(self.value.write().await.take().is_some())
    }

    fn backend_name(&self) -> &'static str {
        "Memory"
    }
}

/// Backend whose vault can never be reached
pub struct FailingBackend;

#[async_trait]
impl SecretBackend for FailingBackend {
    async fn store(&self, _value: &ApiKey) -> Result<()> {
        Err(CredentialError::unavailable("Failing", "vault unreachable"))
    }

    async fn load(&self) -> Result<Option<ApiKey>> {
        Err(CredentialError::unavailable("Failing", "vault unreachable"))
    }

    async fn delete(&self) -> Result<bool> {
        Err(CredentialError::unavailable("Failing", "vault unreachable"))
    }

    fn backend_name(&self) -> &'static str {
        "Failing"
    }
}

/// Memory backend whose reads take `delay` after snapshotting the value
pub struct SlowBackend {
    inner: MemoryBackend,
    delay: Duration,
}

impl SlowBackend {
    pub fn with_value(value: &str, delay: Duration) -> Self {
        Self {
            inner: MemoryBackend::with_value(value),
            delay,
        }
    }
}

#[async_trait]
impl SecretBackend for SlowBackend {
    async fn store(&self, value: &ApiKey) -> Result<()> {
        self.inner.store(value).await
    }

    async fn load(&self) -> Result<Option<ApiKey>> {
        let value = self.inner.load().await;
        tokio::time::sleep(self.delay).await;
        value
    }

    async fn delete(&self) -> Result<bool> {
        self.inner.delete().await
    }

    fn backend_name(&self) -> &'static str {
        "Slow"
    }
}
