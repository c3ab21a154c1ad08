//! Per-platform secret store strategies
//!
//! Each supported platform talks to its native vault through a command-line
//! helper:
//! - macOS: `security` against the login keychain file
//! - Linux: `secret-tool` against the Secret Service daemon
//!
//! A strategy only describes the helper invocations; running them is the
//! keychain backend's job.

use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{CredentialConfig, KeychainIdentity};
use crate::credential::ApiKey;
use crate::error::{CredentialError, Result};

/// `security` exit status for "item not found"
const SECURITY_ITEM_NOT_FOUND: i32 = 44;

/// Label shown for the item in Secret Service browsers
const SECRET_LABEL: &str = "Linear API key (linear-cycles-mcp)";

/// Supported host platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
}

impl Platform {
    /// Detect the platform this process runs on
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS identifier (as in `std::env::consts::OS`) to a platform
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "macos" => Ok(Self::MacOs),
            "linux" => Ok(Self::Linux),
            other => Err(CredentialError::UnsupportedPlatform {
                platform: other.to_string(),
            }),
        }
    }

    /// Build the secret store strategy for this platform
    pub fn secret_store(self, config: &CredentialConfig) -> Box<dyn SecretStore> {
        match self {
            Self::MacOs => Box::new(MacKeychain::new(config.keychain_path.clone())),
            Self::Linux => Box::new(SecretService),
        }
    }
}

/// One helper process invocation
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HelperCommand {
    #[zeroize(skip)]
    pub program: &'static str,
    pub args: Vec<String>,
    /// Written to the helper's stdin, then stdin is closed
    pub stdin: Option<String>,
}

impl HelperCommand {
    fn new(program: &'static str, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            stdin: None,
        }
    }

    fn with_stdin(mut self, input: &str) -> Self {
        self.stdin = Some(input.to_string());
        self
    }
}

impl std::fmt::Debug for HelperCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Arguments may carry the secret
        f.debug_struct("HelperCommand")
            .field("program", &self.program)
            .field("args", &format_args!("[{} args]", self.args.len()))
            .finish()
    }
}

/// Captured result of a finished helper process
#[derive(Debug, Clone, Default)]
pub struct HelperOutput {
    /// Exit code, `None` if the helper was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl HelperOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Strategy describing how a platform's vault is driven
pub trait SecretStore: Send + Sync {
    /// Human-readable vault name
    fn name(&self) -> &'static str;

    /// Helper executable
    fn program(&self) -> &'static str;

    /// Create or overwrite the item
    fn store_command(&self, identity: &KeychainIdentity, value: &ApiKey) -> HelperCommand;

    /// Print the item's secret on stdout
    fn lookup_command(&self, identity: &KeychainIdentity) -> HelperCommand;

    /// Remove the item
    fn delete_command(&self, identity: &KeychainIdentity) -> HelperCommand;

    /// Whether a failed lookup means "no such item" rather than an access error
    fn is_not_found(&self, output: &HelperOutput) -> bool;
}

/// macOS login keychain via `/usr/bin/security`
///
/// `add-generic-password` only takes the secret as the `-w` argument (a bare
/// trailing `-w` prompts on the controlling terminal instead of reading
/// stdin). While the store command runs, the key is therefore visible in its
/// argument list to other processes of the same machine. Lookups and deletes
/// never carry the key; [`SecretService`] passes it on stdin.
pub struct MacKeychain {
    keychain_path: PathBuf,
}

impl MacKeychain {
    pub fn new(keychain_path: PathBuf) -> Self {
        Self { keychain_path }
    }

    fn item_args(&self, verb: &str, identity: &KeychainIdentity) -> Vec<String> {
        vec![
            verb.to_string(),
            "-a".to_string(),
            identity.account.clone(),
            "-s".to_string(),
            identity.service.clone(),
        ]
    }

    fn keychain(&self) -> String {
        self.keychain_path.to_string_lossy().into_owned()
    }
}

impl SecretStore for MacKeychain {
    fn name(&self) -> &'static str {
        "macOS Keychain"
    }

    fn program(&self) -> &'static str {
        "security"
    }

    // The value lands in argv; see the type docs
    fn store_command(&self, identity: &KeychainIdentity, value: &ApiKey) -> HelperCommand {
        let mut args = self.item_args("add-generic-password", identity);
        args.push("-w".to_string());
        args.push(value.expose().to_string());
        args.push("-U".to_string());
        args.push(self.keychain());
        HelperCommand::new(self.program(), args)
    }

    fn lookup_command(&self, identity: &KeychainIdentity) -> HelperCommand {
        let mut args = self.item_args("find-generic-password", identity);
        args.push("-w".to_string());
        args.push(self.keychain());
        HelperCommand::new(self.program(), args)
    }

    fn delete_command(&self, identity: &KeychainIdentity) -> HelperCommand {
        let mut args = self.item_args("delete-generic-password", identity);
        args.push(self.keychain());
        HelperCommand::new(self.program(), args)
    }

    fn is_not_found(&self, output: &HelperOutput) -> bool {
        output.code == Some(SECURITY_ITEM_NOT_FOUND)
            || output.stderr.contains("could not be found")
    }
}

/// Linux Secret Service via `secret-tool` (libsecret)
pub struct SecretService;

impl SecretService {
    fn attributes(identity: &KeychainIdentity) -> [String; 4] {
        [
            "account".to_string(),
            identity.account.clone(),
            "service".to_string(),
            identity.service.clone(),
        ]
    }
}

impl SecretStore for SecretService {
    fn name(&self) -> &'static str {
        "Linux Secret Service"
    }

    fn program(&self) -> &'static str {
        "secret-tool"
    }

    fn store_command(&self, identity: &KeychainIdentity, value: &ApiKey) -> HelperCommand {
        let mut args = vec!["store".to_string(), format!("--label={}", SECRET_LABEL)];
        args.extend(Self::attributes(identity));
        HelperCommand::new(self.program(), args).with_stdin(value.expose())
    }

    fn lookup_command(&self, identity: &KeychainIdentity) -> HelperCommand {
        let mut args = vec!["lookup".to_string()];
        args.extend(Self::attributes(identity));
        HelperCommand::new(self.program(), args)
    }

    fn delete_command(&self, identity: &KeychainIdentity) -> HelperCommand {
        let mut args = vec!["clear".to_string()];
        args.extend(Self::attributes(identity));
        HelperCommand::new(self.program(), args)
    }

    fn is_not_found(&self, output: &HelperOutput) -> bool {
        // lookup exits 1 with no output when nothing matches
        output.code == Some(1) && output.stdout.trim().is_empty() && output.stderr.trim().is_empty()
    }
}
