//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Storage commands live under `storage`, local settings under `config`.

use clap::{Parser, Subcommand};
use nimbus_core::config::BASE_URL_ENV;

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

pub mod completions;
pub mod config;
pub mod storage;

/// nimbus - object storage transfer and sync CLI
///
/// Moves files between the local filesystem and the platform's
/// S3-compatible object store.
#[derive(Parser, Debug)]
#[command(name = "nimbus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Platform API endpoint the object store host is derived from
    #[arg(long, global = true, env = BASE_URL_ENV)]
    pub api_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transfer, synchronize and manage objects
    #[command(subcommand)]
    Storage(storage::StorageCommands),

    /// Show or change local settings
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Options shared by every storage command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub output: OutputConfig,
    pub api_endpoint: Option<String>,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let globals = GlobalOptions {
        output: OutputConfig {
            json: cli.json,
            no_color: cli.no_color,
            no_progress: cli.no_progress,
            quiet: cli.quiet,
        },
        api_endpoint: cli.api_endpoint,
    };

    match cli.command {
        Commands::Storage(cmd) => storage::execute(cmd, globals).await,
        Commands::Config(cmd) => config::execute(cmd, globals.output),
        Commands::Completions(args) => completions::execute(args),
    }
}
