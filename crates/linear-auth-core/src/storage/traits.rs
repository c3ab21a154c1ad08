//! Storage trait definitions

use async_trait::async_trait;
use std::path::Path;

use crate::credential::ApiKey;
use crate::error::Result;

/// A place the API key can be persisted.
///
/// `load` separates "nothing stored" (`Ok(None)`) from "could not look"
/// (`Err`); the resolver treats both as a miss but only logs the latter.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Persist the key so a later `load` returns it
    async fn store(&self, value: &ApiKey) -> Result<()>;

    /// Retrieve the stored key
    async fn load(&self) -> Result<Option<ApiKey>>;

    /// Remove the stored key, returning whether anything was removed
    async fn delete(&self) -> Result<bool>;

    /// Human-readable name for this backend
    fn backend_name(&self) -> &'static str;

    /// Backing file, for backends that have one
    fn location(&self) -> Option<&Path> {
        None
    }
}
