//! Storage commands
//!
//! Every storage command runs against one client built from the local
//! configuration. Setup failures are reported here, so the individual
//! commands only deal with their own operation.

use clap::Subcommand;
use nimbus_core::{Config, ConfigManager, Error, ObjectStore, Result};
use nimbus_s3::S3Client;

use super::GlobalOptions;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

mod cp;
mod ls;
mod mb;
mod presign;
mod rm;
mod stat;
mod sync;

#[derive(Subcommand, Debug)]
pub enum StorageCommands {
    /// Copy files to or from the object store
    Cp(cp::CpArgs),

    /// Synchronize a local directory with a remote prefix
    Sync(sync::SyncArgs),

    /// List buckets or the contents of a prefix
    Ls(ls::LsArgs),

    /// Create a bucket
    Mb(mb::MbArgs),

    /// Remove an object, a prefix or a bucket
    Rm(rm::RmArgs),

    /// Show object metadata
    Stat(stat::StatArgs),

    /// Generate a time-limited URL for an object
    Presign(presign::PresignArgs),
}

/// Load the configuration, applying command-line overrides
pub fn load_config(globals: &GlobalOptions) -> Result<Config> {
    let mut config = ConfigManager::new()?.load()?;
    if let Some(endpoint) = globals.api_endpoint.as_deref().filter(|e| !e.is_empty()) {
        config.account.api_endpoint = endpoint.to_string();
    }
    Ok(config)
}

/// Build the object store client for the configured account
pub async fn connect(config: &Config) -> Result<S3Client> {
    let credential = config.credential()?;
    let endpoint = config.store_endpoint()?;
    S3Client::new(&credential, &endpoint, &config.storage.region).await
}

/// Report `err` and map it to its exit code
pub(crate) fn fail(formatter: &Formatter, context: &str, err: &Error) -> ExitCode {
    formatter.error(&format!("{context}: {err}"));
    ExitCode::from(err)
}

/// Execute a storage command
pub async fn execute(cmd: StorageCommands, globals: GlobalOptions) -> ExitCode {
    let config = match load_config(&globals) {
        Ok(config) => config,
        Err(e) => {
            return fail(
                &Formatter::new(globals.output),
                "Failed to load configuration",
                &e,
            );
        }
    };
    let formatter = Formatter::new(globals.output.with_defaults(&config));

    let client = match connect(&config).await {
        Ok(client) => client,
        Err(e) => return fail(&formatter, "Failed to connect to storage", &e),
    };
    let store: &dyn ObjectStore = &client;

    match cmd {
        StorageCommands::Cp(args) => cp::execute(args, store, &formatter).await,
        StorageCommands::Sync(args) => sync::execute(args, store, &formatter).await,
        StorageCommands::Ls(args) => ls::execute(args, store, &formatter).await,
        StorageCommands::Mb(args) => mb::execute(args, store, &formatter).await,
        StorageCommands::Rm(args) => rm::execute(args, store, &formatter).await,
        StorageCommands::Stat(args) => stat::execute(args, store, &formatter).await,
        StorageCommands::Presign(args) => presign::execute(args, store, &formatter).await,
    }
}
