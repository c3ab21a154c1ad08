//! Storage backends for API key persistence
//!
//! Two backends, consulted in this order:
//! 1. OS Keychain (primary, the only one written by setup)
//! 2. Env file (fallback for installations that predate the keychain)

mod env_file;
mod keychain;
mod platform;
mod traits;

pub use env_file::{parse_env, FileBackend};
pub use keychain::KeychainBackend;
pub use platform::{HelperCommand, HelperOutput, MacKeychain, Platform, SecretService, SecretStore};
pub use traits::SecretBackend;
