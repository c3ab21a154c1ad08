//! OS Keychain storage backend
//!
//! Uses the system vault through its command-line helper:
//! - macOS: Keychain (`security`)
//! - Linux: Secret Service (`secret-tool`, GNOME Keyring / KWallet)
//!
//! Helpers run as child processes with a bounded wait.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::platform::{HelperCommand, HelperOutput, Platform, SecretStore};
use super::SecretBackend;
use crate::config::{CredentialConfig, KeychainIdentity};
use crate::credential::ApiKey;
use crate::error::{CredentialError, Result};

const BACKEND_NAME: &str = "OS keychain";

/// OS Keychain storage backend
pub struct KeychainBackend {
    store: Box<dyn SecretStore>,
    identity: KeychainIdentity,
    timeout: Duration,
}

impl KeychainBackend {
    /// Select the vault for the current platform.
    ///
    /// Fails with `UnsupportedPlatform` anywhere other than macOS and Linux.
    pub fn for_current_platform(config: &CredentialConfig) -> Result<Self> {
        let platform = Platform::current()?;
        let store = platform.secret_store(config);
        debug!("Selected {} for credential storage", store.name());
        Ok(Self::new(store, config.identity.clone(), config.helper_timeout))
    }

    /// Create a backend over an explicit strategy
    pub fn new(store: Box<dyn SecretStore>, identity: KeychainIdentity, timeout: Duration) -> Self {
        Self {
            store,
            identity,
            timeout,
        }
    }

    /// Name of the underlying vault
    pub fn vault_name(&self) -> &'static str {
        self.store.name()
    }

    /// Run a helper to completion, bounded by the configured timeout
    async fn run(&self, command: HelperCommand) -> Result<HelperOutput> {
        let mut child = Command::new(command.program)
            .args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CredentialError::unavailable(
                    BACKEND_NAME,
                    format!("`{}` was not found on PATH", command.program),
                ),
                _ => CredentialError::unavailable(
                    BACKEND_NAME,
                    format!("failed to start `{}`: {}", command.program, e),
                ),
            })?;

        if let (Some(input), Some(mut stdin)) = (command.stdin.as_deref(), child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await.map_err(|e| {
                CredentialError::unavailable(
                    BACKEND_NAME,
                    format!("failed to write to `{}`: {}", command.program, e),
                )
            })?;
            // Dropping stdin closes the pipe so the helper sees EOF
        }

        // The child is killed on drop if the timeout elapses
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CredentialError::BackendTimeout {
                program: command.program.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| {
                CredentialError::unavailable(
                    BACKEND_NAME,
                    format!("`{}` failed: {}", command.program, e),
                )
            })?;

        Ok(HelperOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn failure(&self, action: &str, output: &HelperOutput) -> CredentialError {
        CredentialError::unavailable(
            BACKEND_NAME,
            format!(
                "{} {} failed (exit {:?}): {}",
                self.store.program(),
                action,
                output.code,
                output.stderr.trim()
            ),
        )
    }
}

#[async_trait]
impl SecretBackend for KeychainBackend {
    async fn store(&self, value: &ApiKey) -> Result<()> {
        let output = self
            .run(self.store.store_command(&self.identity, value))
            .await?;

        if !output.success() {
            return Err(self.failure("store", &output));
        }

        debug!("Stored API key {} in {}", value.masked(), self.store.name());
        Ok(())
    }

    async fn load(&self) -> Result<Option<ApiKey>> {
        let output = self.run(self.store.lookup_command(&self.identity)).await?;

        if output.success() {
            let value = output.stdout.trim();
            if value.is_empty() {
                debug!("Empty item in {}", self.store.name());
                return Ok(None);
            }
            debug!("Retrieved API key from {}", self.store.name());
            return Ok(Some(ApiKey::new(value)));
        }

        if self.store.is_not_found(&output) {
            debug!("API key not found in {}", self.store.name());
            return Ok(None);
        }

        Err(self.failure("lookup", &output))
    }

    async fn delete(&self) -> Result<bool> {
        // Look first so both vaults can report whether anything was removed
        if self.load().await?.is_none() {
            return Ok(false);
        }

        let output = self.run(self.store.delete_command(&self.identity)).await?;

        if output.success() {
            debug!("Deleted API key from {}", self.store.name());
            return Ok(true);
        }

        if self.store.is_not_found(&output) {
            warn!("API key vanished from {} before deletion", self.store.name());
            return Ok(false);
        }

        Err(self.failure("delete", &output))
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}
