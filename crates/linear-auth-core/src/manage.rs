//! `manage_auth` actions: status, setup and removal of the API key
//!
//! Returns structured reports; rendering them for a human is left to the
//! caller.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use crate::credential::ValidationFailure;
use crate::error::CredentialError;
use crate::resolver::{CredentialResolver, ResolutionStatus};
use crate::store::CredentialStore;

/// Action requested by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    Status,
    Setup,
    Remove,
}

impl FromStr for AuthAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Self::Status),
            "setup" => Ok(Self::Setup),
            "remove" => Ok(Self::Remove),
            other => Err(format!(
                "Unknown action: {}. Use 'status', 'setup', or 'remove'.",
                other
            )),
        }
    }
}

/// What an action did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AuthOutcome {
    /// A valid key is available
    Configured,
    /// No backend holds a valid key
    NotConfigured,
    /// The key was stored
    Saved,
    /// The key was removed from at least one backend
    Removed,
    /// Removal found nothing to remove
    NothingStored,
    /// The supplied key failed validation
    Rejected {
        reason: ValidationFailure,
        message: String,
    },
    /// The backend could not complete the action
    Failed { error: String },
}

/// Result of one action, with the status observed afterwards
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthReport {
    pub action: AuthAction,
    pub success: bool,
    pub outcome: AuthOutcome,
    pub status: ResolutionStatus,
}

/// Front door for operator-facing credential management
pub struct AuthManager {
    resolver: Arc<CredentialResolver>,
    store: Arc<CredentialStore>,
}

impl AuthManager {
    pub fn new(resolver: Arc<CredentialResolver>, store: Arc<CredentialStore>) -> Self {
        Self { resolver, store }
    }

    /// Run `action`; `api_key` is only used by setup
    pub async fn handle(&self, action: AuthAction, api_key: Option<&str>) -> AuthReport {
        let outcome = match action {
            AuthAction::Status => self.status_outcome().await,
            AuthAction::Setup => self.setup(api_key).await,
            AuthAction::Remove => self.remove().await,
        };

        let success = !matches!(
            outcome,
            AuthOutcome::Rejected { .. } | AuthOutcome::Failed { .. }
        );

        AuthReport {
            action,
            success,
            outcome,
            status: self.resolver.get_status().await,
        }
    }

    async fn status_outcome(&self) -> AuthOutcome {
        if self.resolver.is_configured().await {
            AuthOutcome::Configured
        } else {
            AuthOutcome::NotConfigured
        }
    }

    async fn setup(&self, api_key: Option<&str>) -> AuthOutcome {
        let raw = api_key.unwrap_or_default();

        match self.store.set_credential(raw).await {
            Ok(()) => AuthOutcome::Saved,
            Err(CredentialError::Validation(reason)) => AuthOutcome::Rejected {
                reason,
                message: reason.to_string(),
            },
            Err(e) => {
                error!("Error storing API key: {}", e);
                AuthOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn remove(&self) -> AuthOutcome {
        if self.store.remove_credential().await {
            info!("API key removed");
            AuthOutcome::Removed
        } else {
            AuthOutcome::NothingStored
        }
    }
}
