//! sync command - One-way synchronization
//!
//! `up` makes the remote prefix match the local directory, `down` the
//! reverse. Only missing or (with --checksums) changed files are moved.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use humansize::{BINARY, format_size};
use nimbus_core::sync::sync;
use nimbus_core::{ObjectStore, Progress, RemotePath, SyncDirection, SyncOptions, SyncReport};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, TransferProgress};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Local directory to remote prefix
    #[default]
    Up,
    /// Remote prefix to local directory
    Down,
}

impl From<DirectionArg> for SyncDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Up => SyncDirection::Up,
            DirectionArg::Down => SyncDirection::Down,
        }
    }
}

/// Synchronize a local directory with a remote prefix
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Local directory
    pub local: PathBuf,

    /// Remote bucket[/prefix]
    pub remote: String,

    /// Remove destination files that do not exist in the source
    #[arg(long)]
    pub delete: bool,

    /// Direction of the synchronization
    #[arg(long, value_enum, default_value_t = DirectionArg::Up)]
    pub direction: DirectionArg,

    /// Skip files whose MD5 matches the other side
    #[arg(long)]
    pub checksums: bool,

    /// Keep going after a failed file and report failures at the end
    #[arg(long)]
    pub continue_on_error: bool,
}

/// Execute the sync command
pub async fn execute(args: SyncArgs, store: &dyn ObjectStore, formatter: &Formatter) -> ExitCode {
    let remote = match RemotePath::parse(&args.remote) {
        Ok(remote) => remote,
        Err(e) => return fail(formatter, "Invalid remote path", &e),
    };

    let options = SyncOptions {
        direction: args.direction.into(),
        checksums: args.checksums,
        delete: args.delete,
        continue_on_error: args.continue_on_error,
    };
    let label = match options.direction {
        SyncDirection::Up => "Uploading",
        SyncDirection::Down => "Downloading",
    };
    let progress: Arc<dyn Progress> = TransferProgress::shared(formatter.config(), label);

    let report = match sync(store, &args.local, &remote, options, progress).await {
        Ok(report) => report,
        Err(e) => return fail(formatter, "Sync failed", &e),
    };

    print_report(formatter, &report, &args.local, &remote)
}

fn print_report(
    formatter: &Formatter,
    report: &SyncReport,
    local: &std::path::Path,
    remote: &RemotePath,
) -> ExitCode {
    if formatter.is_json() {
        formatter.json(report);
    } else {
        for failure in &report.failures {
            formatter.warning(&format!("{}: {}", failure.destination, failure.error));
        }
        let (from, to) = match report.direction {
            SyncDirection::Up => (local.display().to_string(), remote.to_string()),
            SyncDirection::Down => (remote.to_string(), local.display().to_string()),
        };
        formatter.success(&format!(
            "Synchronized {from} → {to}: {} transferred ({}), {} unchanged, {} deleted",
            report.transferred,
            format_size(report.bytes, BINARY),
            report.skipped,
            report.deleted
        ));
    }

    if report.is_success() {
        ExitCode::Success
    } else {
        formatter.error(&format!("{} operation(s) failed", report.failures.len()));
        ExitCode::GeneralError
    }
}
