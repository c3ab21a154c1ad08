//! In-memory API key handling with automatic zeroization

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::validator::KEY_PREFIX;

/// Linear API key - automatically zeroed when dropped
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey {
    value: String,
}

impl ApiKey {
    /// Wrap a raw key value. No validation happens here; see [`super::validated`].
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the secret value (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Whether the value carries the Linear key prefix
    pub fn has_expected_prefix(&self) -> bool {
        self.value.trim().starts_with(KEY_PREFIX)
    }

    /// Display form safe for logs, e.g. `lin_api_...`
    pub fn masked(&self) -> String {
        let shown: String = self.value.chars().take(KEY_PREFIX.len()).collect();
        format!("{}...", shown)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"[REDACTED]")
            .finish()
    }
}
