//! caflip binary: provider-first routing, logging bootstrap, exit codes.
//!
//! Exit codes: 0 success, 1 command failure, 2 usage (including a required
//! but omitted provider prefix).

mod cli_args;
mod commands;
mod meta;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use caflip_provider::ProviderKind;

use crate::cli_args::{Command, ProviderCli, Routing};

const USAGE_EXIT_CODE: u8 = 2;

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .context("HOME environment variable is not set")
}

fn print_help() {
    println!(
        "caflip - coding agent account switcher (Claude Code + Codex)

Usage:
  caflip <claude|codex> <command>
  caflip <claude|codex> <alias>

Commands:
  list                     List managed accounts
  add [--alias <name>]     Add the currently logged-in account
  remove <email>           Remove an account
  next                     Switch to the next account in rotation
  status [--json]          Show the current account
  alias <name> [<email>]   Set an alias for the current or target account
  help                     Show this help

Examples:
  caflip claude list       List managed Claude Code accounts
  caflip claude work       Switch Claude Code account by alias
  caflip codex add --alias personal
                           Add the current Codex account with an alias"
    );
}

fn dispatch(ctx: &commands::ProviderContext, command: Command) -> Result<()> {
    match command {
        Command::List => commands::list(ctx),
        Command::Add { alias } => commands::add(ctx, alias),
        Command::Remove { identifier } => commands::remove(ctx, &identifier),
        Command::Next => commands::next(ctx),
        Command::Status { json } => commands::status(ctx, json),
        Command::Alias { name, identifier } => {
            commands::set_alias(ctx, &name, identifier.as_deref())
        }
        Command::Switch(tokens) => match tokens.as_slice() {
            [token] => commands::switch_by_alias(ctx, token),
            _ => anyhow::bail!("alias switching takes exactly one token"),
        },
    }
}

fn run(kind: ProviderKind, rest: Vec<String>, home: &PathBuf) -> ExitCode {
    let cli = match ProviderCli::try_parse_from(std::iter::once("caflip".to_string()).chain(rest)) {
        Ok(cli) => cli,
        // clap prints help/version on stdout (code 0) and usage on stderr (code 2).
        Err(error) => error.exit(),
    };

    if let Err(error) = meta::write_last_provider(home, kind) {
        tracing::debug!(%error, "failed to record last provider");
    }

    let ctx = commands::ProviderContext::new(home, kind);
    match dispatch(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let home = match home_dir() {
        Ok(home) => home,
        Err(error) => {
            eprintln!("Error: {error:#}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    match cli_args::route(&args, meta::read_last_provider(&home)) {
        Ok(Routing::Help) => {
            print_help();
            ExitCode::SUCCESS
        }
        Ok(Routing::Version) => {
            println!("caflip {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Ok(Routing::Qualified { kind, rest }) => run(kind, rest, &home),
        Err(usage) => {
            eprintln!("{}", usage.message);
            ExitCode::from(USAGE_EXIT_CODE)
        }
    }
}
