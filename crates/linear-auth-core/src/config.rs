//! Credential layer configuration
//!
//! Everything here is fixed at process start. The backend priority itself is
//! not configurable; only locations, identities and the helper timeout are.

use directories::BaseDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{CredentialError, Result};

/// Linear GraphQL endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.linear.app/graphql";

/// Environment-file key holding the API key
pub const ENV_KEY: &str = "LINEAR_API_KEY";

/// Comment written above the key when it is appended to the env file
pub const ENV_COMMENT: &str = "# Linear API (for cycle management)";

/// Keychain account attribute
pub const KEYCHAIN_ACCOUNT: &str = "linear-cycles-mcp-local";

/// Keychain service attribute
pub const KEYCHAIN_SERVICE: &str = "linear-cycles-mcp-api-key";

/// Default time allowed for a secret-store helper process
pub const DEFAULT_HELPER_TIMEOUT: Duration = Duration::from_secs(10);

/// (service, account) pair addressing the key in the native secret store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeychainIdentity {
    pub service: String,
    pub account: String,
}

impl Default for KeychainIdentity {
    fn default() -> Self {
        Self {
            service: KEYCHAIN_SERVICE.to_string(),
            account: KEYCHAIN_ACCOUNT.to_string(),
        }
    }
}

/// Credential layer configuration
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Shared plugins env file (`~/.claude/plugins/.env`)
    pub env_path: PathBuf,
    /// Native secret store identity
    pub identity: KeychainIdentity,
    /// macOS keychain file targeted by `security`
    pub keychain_path: PathBuf,
    /// Upper bound on a single helper invocation
    pub helper_timeout: Duration,
    /// GraphQL endpoint used by the client factory
    pub endpoint: Url,
}

impl CredentialConfig {
    /// Build the default configuration rooted at the current user's home
    pub fn new() -> Result<Self> {
        let dirs = BaseDirs::new()
            .ok_or_else(|| CredentialError::Config("Could not determine home directory".to_string()))?;
        Ok(Self::with_home(dirs.home_dir()))
    }

    /// Build the default configuration rooted at `home` (for testing)
    pub fn with_home(home: &Path) -> Self {
        Self {
            env_path: default_env_path(home),
            identity: KeychainIdentity::default(),
            keychain_path: home
                .join("Library")
                .join("Keychains")
                .join("login.keychain-db"),
            helper_timeout: DEFAULT_HELPER_TIMEOUT,
            endpoint: default_endpoint(),
        }
    }

    /// Override the env file location
    pub fn with_env_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_path = path.into();
        self
    }

    /// Override the helper timeout
    pub fn with_helper_timeout(mut self, timeout: Duration) -> Self {
        self.helper_timeout = timeout;
        self
    }

    /// Override the GraphQL endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.endpoint = Url::parse(endpoint)
            .map_err(|e| CredentialError::Config(format!("Invalid endpoint {}: {}", endpoint, e)))?;
        Ok(self)
    }
}

fn default_env_path(home: &Path) -> PathBuf {
    home.join(".claude").join("plugins").join(".env")
}

fn default_endpoint() -> Url {
    // The constant is a valid URL; a failure here is a programming error.
    Url::parse(DEFAULT_ENDPOINT).expect("DEFAULT_ENDPOINT is a valid URL")
}
