//! # linear-auth-core
//!
//! Credential layer for the Linear API key used by the Linear Cycles MCP
//! tools:
//! - Lookup across the OS keychain and the shared plugins env file
//! - Format validation before anything is stored
//! - Keychain writes through the platform's secret-store helper
//! - An explicit in-memory cache kept in sync with every write
//! - A lazily built, invalidatable authenticated API client

pub mod cache;
pub mod client;
pub mod config;
mod context;
pub mod credential;
pub mod error;
pub mod manage;
pub mod resolver;
pub mod storage;
pub mod store;

#[cfg(test)]
mod testing;

pub use cache::CredentialCache;
pub use client::{LinearClient, LinearClientFactory};
pub use config::{CredentialConfig, KeychainIdentity};
pub use context::AuthContext;
pub use credential::{validate, validated, ApiKey, ValidationFailure};
pub use error::{CredentialError, Result};
pub use manage::{AuthAction, AuthManager, AuthOutcome, AuthReport};
pub use resolver::{CredentialResolver, CredentialSource, ResolutionStatus};
pub use storage::{FileBackend, KeychainBackend, Platform, SecretBackend, SecretStore};
pub use store::{CredentialListener, CredentialStore};
