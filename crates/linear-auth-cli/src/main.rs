//! Linear auth CLI - manage the Linear API key shared by the Linear Cycles MCP tools
//!
//! The key is stored in the OS keychain. Keys placed in
//! `~/.claude/plugins/.env` by older installations are still honoured on read
//! and cleaned up on removal.
//!
//! Reports are printed to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};

use linear_auth_core::{AuthAction, AuthContext, CredentialConfig};

/// Linear auth - manage the Linear API key used by the Linear Cycles MCP tools
#[derive(Parser, Debug)]
#[command(name = "linear-auth")]
#[command(version)]
#[command(about = "Manage the Linear API key stored in the OS keychain")]
struct Args {
    /// Env file consulted as a read fallback (default: ~/.claude/plugins/.env)
    #[arg(long, env = "LINEAR_AUTH_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Seconds to wait for the keychain helper before giving up
    #[arg(long, env = "LINEAR_AUTH_HELPER_TIMEOUT", default_value = "10")]
    helper_timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show whether a key is configured and where it was found
    Status,
    /// Validate and store a key in the OS keychain
    Setup {
        /// The key. Prefer leaving this out and answering the hidden prompt,
        /// which keeps the key out of shell history and the process list.
        #[arg(long, env = "LINEAR_AUTH_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// Remove the key from the keychain and the env file
    Remove,
    /// Exit non-zero with setup instructions when no key is configured
    Check,
}

const SETUP_NOTICE: &str = "\
================================================================================
LINEAR CYCLES MCP - FIRST TIME SETUP
================================================================================

No Linear API key found. To configure:

1. Get your API key from: https://linear.app/settings/api

2. Run: linear-auth setup (and paste the key at the prompt)

Or use: manage_auth({ action: \"setup\", apiKey: \"lin_api_...\" })
================================================================================";

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = CredentialConfig::new()?
        .with_helper_timeout(Duration::from_secs(args.helper_timeout));
    if let Some(path) = args.env_file {
        config = config.with_env_path(path);
    }
    debug!("Using env file {:?}", config.env_path);

    let context = AuthContext::new(&config)
        .await
        .map_err(|e| format!("Failed to initialize credential storage: {}", e))?;

    let report = match args.command {
        Command::Status => context.manager.handle(AuthAction::Status, None).await,
        Command::Setup { api_key } => {
            let api_key = match api_key {
                Some(key) => key,
                None => rpassword::prompt_password("Linear API key: ")?,
            };
            context
                .manager
                .handle(AuthAction::Setup, Some(&api_key))
                .await
        }
        Command::Remove => context.manager.handle(AuthAction::Remove, None).await,
        Command::Check => {
            if context.resolver.is_configured().await {
                info!("Linear API key is configured");
                return Ok(ExitCode::SUCCESS);
            }
            eprintln!("{}", SETUP_NOTICE);
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_setup() {
        let args = Args::parse_from([
            "linear-auth",
            "--env-file",
            "/tmp/x.env",
            "setup",
            "--api-key",
            "lin_api_abcdefghijklmno1234",
        ]);

        assert_eq!(args.env_file, Some(PathBuf::from("/tmp/x.env")));
        assert!(matches!(
            args.command,
            Command::Setup { api_key: Some(ref key) } if key == "lin_api_abcdefghijklmno1234"
        ));
    }

    #[test]
    fn test_api_key_env_value_is_hidden() {
        let command = Args::command();
        let setup = command.find_subcommand("setup").unwrap();
        let api_key = setup
            .get_arguments()
            .find(|arg| arg.get_id() == "api_key")
            .unwrap();

        assert_eq!(api_key.get_env(), Some(std::ffi::OsStr::new("LINEAR_AUTH_API_KEY")));
        assert!(api_key.is_hide_env_values_set());
    }
}
