//! Error types for linear-auth-core

use std::time::Duration;
use thiserror::Error;

use crate::credential::ValidationFailure;

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Credential error types
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Invalid API key: {0}")]
    Validation(ValidationFailure),

    #[error("{backend} is unavailable: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("`{program}` did not finish within {timeout:?}")]
    BackendTimeout { program: String, timeout: Duration },

    #[error(
        "Secure credential storage is not supported on {platform}. \
         Supported platforms: macOS (login keychain via the bundled `security` tool); \
         Linux (install libsecret-tools for `secret-tool` and run a Secret Service daemon \
         such as gnome-keyring)"
    )]
    UnsupportedPlatform { platform: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("Linear API key not configured. Use the manage_auth tool to set up authentication.")]
    NotConfigured,

    #[error("{0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CredentialError {
    pub(crate) fn unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// The validation failure, if this error came from the validator
    pub fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Validation(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<ValidationFailure> for CredentialError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure)
    }
}
