//! In-memory mirror of the last resolved API key
//!
//! One cache is created at start-up and handed to the resolver, the store and
//! the client factory. Clones share the same slot.
//!
//! Every write from the store bumps a generation counter. A resolution
//! records the generation before reading the backends and publishes its
//! result only if no write happened in between, so a slow read can never
//! put a replaced key back.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::credential::ApiKey;

#[derive(Default)]
struct Slot {
    value: Option<ApiKey>,
    generation: u64,
}

/// Shared slot holding the current API key
#[derive(Clone, Default)]
pub struct CredentialCache {
    slot: Arc<RwLock<Slot>>,
}

impl CredentialCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, without consulting any backend
    pub async fn get(&self) -> Option<ApiKey> {
        self.slot.read().await.value.clone()
    }

    /// Replace the cached value
    pub async fn set(&self, key: ApiKey) {
        let mut slot = self.slot.write().await;
        slot.value = Some(key);
        slot.generation += 1;
    }

    /// Drop the cached value
    pub async fn clear(&self) {
        let mut slot = self.slot.write().await;
        // Assigning drops the old key, which zeroizes it
        slot.value = None;
        slot.generation += 1;
    }

    pub async fn is_populated(&self) -> bool {
        self.slot.read().await.value.is_some()
    }

    /// Number of writes so far
    pub async fn generation(&self) -> u64 {
        self.slot.read().await.generation
    }

    /// Store a resolved value unless a write happened since `observed`.
    ///
    /// Returns `false` and leaves the slot untouched when the generation
    /// has moved on.
    pub async fn publish(&self, observed: u64, value: Option<ApiKey>) -> bool {
        let mut slot = self.slot.write().await;
        if slot.generation != observed {
            return false;
        }
        slot.value = value;
        true
    }
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache").finish_non_exhaustive()
    }
}
