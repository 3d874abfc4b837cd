//! nimbus - object storage transfer and sync CLI
//!
//! Copies and synchronizes files between the local filesystem and an
//! S3-compatible object store.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod exit_code;
mod output;

use commands::Cli;
use exit_code::ExitCode;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug
    let default_level = if cli.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = tokio::select! {
        code = commands::execute(cli) => code,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            ExitCode::Interrupted
        }
    };

    std::process::exit(exit_code.as_i32());
}
