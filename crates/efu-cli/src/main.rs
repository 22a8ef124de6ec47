//! efu - embedded firmware update packaging tool
//!
//! Builds update packages in a working package file, one object at a time,
//! and exports the metadata consumed by the update client.

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod config;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use efu_core::EfuError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::*;
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "efu")]
#[command(about = "Embedded firmware update packaging tool")]
#[command(version)]
#[command(long_about = "
efu builds firmware update packages. Objects are added to a working package
file one at a time, each with an installation mode and its options, and the
package metadata is exported for the update client.

Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Working package file
    #[arg(long, global = true, env = "EFU_PACKAGE_FILE", default_value = ".efu", hide = true)]
    package_file: PathBuf,

    /// Configuration file (default: ~/.efu)
    #[arg(long, global = true, env = "EFU_GLOBAL_CONFIG", hide = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Package editing commands
    #[command(subcommand)]
    Package(PackageCommands),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Remove the working package file
    Cleanup,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("efu={log_level},efu_core={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Package(cmd) => commands::package::execute(cmd, &cli.package_file, cli.json),
        Commands::Config(cmd) => {
            let config_file = match &cli.config_file {
                Some(path) => path.clone(),
                None => config::Config::default_path()?,
            };
            commands::config::execute(cmd, &config_file, cli.json)
        }
        Commands::Cleanup => commands::cleanup::execute(&cli.package_file, cli.json),
    }
}

/// 0 ok, 1 generic, 2 missing package file, 3 object not found, 4 invalid input
fn exit_code(e: &anyhow::Error) -> u8 {
    if let Some(cli_error) = e.downcast_ref::<CliError>() {
        return match cli_error {
            CliError::PackageFileMissing(_) => 2,
            CliError::InvalidInput(_) | CliError::JsonError(_) => 4,
            _ => 1,
        };
    }
    match e.downcast_ref::<EfuError>() {
        Some(EfuError::ObjectNotFound(_)) => 3,
        Some(EfuError::Io { .. }) => 1,
        Some(err) if err.is_user_error() => 4,
        _ => 1,
    }
}
