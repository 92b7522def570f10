//! Provider-first argument routing and the per-provider clap surface.
//!
//! The provider is a positional prefix (`caflip claude list`), not a flag.
//! Routing peels it off before clap sees the remainder; invocations that
//! omit it get guidance on the distinct usage exit code instead of being
//! guessed at.

use clap::{Parser, Subcommand};

use caflip_provider::ProviderKind;

/// Subcommand names that are never interpreted as an alias token.
const COMMAND_TOKENS: &[&str] = &["list", "add", "remove", "next", "status", "alias"];

#[derive(Debug, PartialEq, Eq)]
pub enum Routing {
    /// `caflip <provider> ...`: hand the remainder to clap.
    Qualified {
        kind: ProviderKind,
        rest: Vec<String>,
    },
    Help,
    Version,
}

/// An invocation rejected before clap ever parses it; printed to stderr and
/// exited with the usage code.
#[derive(Debug, PartialEq, Eq)]
pub struct UsageError {
    pub message: String,
}

impl UsageError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

/// Splits the provider prefix off the raw arguments.
///
/// `last_provider` only shapes the guidance text for provider-less
/// invocations; it never silently selects a provider.
pub fn route(args: &[String], last_provider: ProviderKind) -> Result<Routing, UsageError> {
    let Some(first) = args.first().map(String::as_str) else {
        return Err(UsageError::new(format!(
            "Provider is required for non-interactive commands\nTry: caflip {last_provider} list"
        )));
    };

    match first {
        "help" | "--help" | "-h" => return Ok(Routing::Help),
        "--version" | "-V" => return Ok(Routing::Version),
        "--provider" => {
            return Err(UsageError::new(
                "Use positional provider syntax: caflip <claude|codex> <command>".to_string(),
            ))
        }
        _ => {}
    }

    if let Ok(kind) = first.parse::<ProviderKind>() {
        return Ok(Routing::Qualified {
            kind,
            rest: args[1..].to_vec(),
        });
    }

    if COMMAND_TOKENS.contains(&first) {
        return Err(UsageError::new(format!(
            "Provider is required for non-interactive commands\nTry: caflip {last_provider} {first}"
        )));
    }
    if first.starts_with('-') {
        return Err(UsageError::new(format!(
            "Unknown option '{first}'\nTry: caflip {last_provider} <command>"
        )));
    }
    Err(UsageError::new(format!(
        "Alias requires provider prefix\nTry: caflip {last_provider} <alias>"
    )))
}

#[derive(Debug, Parser)]
#[command(
    name = "caflip",
    about = "Rotate coding-agent CLI logins between managed accounts",
    version
)]
pub struct ProviderCli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List managed accounts in rotation order
    List,
    /// Add the currently logged-in account to the rotation
    Add {
        /// Alias to assign to the new account
        #[arg(long)]
        alias: Option<String>,
    },
    /// Remove a managed account by email or alias
    Remove { identifier: String },
    /// Switch to the next account in rotation order
    Next,
    /// Show the currently logged-in account
    Status {
        /// Emit a machine-readable JSON payload
        #[arg(long)]
        json: bool,
    },
    /// Assign an alias to the current or a named account
    Alias {
        name: String,
        identifier: Option<String>,
    },
    /// Any other token is an alias to switch to
    #[command(external_subcommand)]
    Switch(Vec<String>),
}
