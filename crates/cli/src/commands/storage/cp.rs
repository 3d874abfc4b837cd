//! cp command - Copy files to or from the object store
//!
//! The direction is decided by the source: an existing local file or
//! directory is uploaded, anything shaped like `bucket/key` is downloaded.

use std::sync::Arc;

use clap::Args;
use humansize::{BINARY, format_size};
use nimbus_core::transfer::Direction;
use nimbus_core::{CopyPlan, CopyReport, ObjectStore, Progress, RunOptions, classify, copy};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, TransferProgress};

/// Copy files to or from the object store
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source: local file or directory, or bucket/key
    pub source: String,

    /// Destination: bucket[/key] for uploads, local path for downloads
    pub target: String,

    /// Copy directories and prefixes recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Keep going after a failed file and report failures at the end
    #[arg(long)]
    pub continue_on_error: bool,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, store: &dyn ObjectStore, formatter: &Formatter) -> ExitCode {
    let plan = match classify(&args.source, &args.target, args.recursive) {
        Ok(plan) => plan,
        Err(e) => return fail(formatter, "Invalid copy", &e),
    };

    let label = match plan {
        CopyPlan::UploadFile { .. } | CopyPlan::UploadDir { .. } => "Uploading",
        CopyPlan::DownloadObject { .. } | CopyPlan::DownloadPrefix { .. } => "Downloading",
    };
    let progress: Arc<dyn Progress> = TransferProgress::shared(formatter.config(), label);
    let options = RunOptions {
        continue_on_error: args.continue_on_error,
    };

    let report = match copy(store, &plan, options, progress).await {
        Ok(report) => report,
        Err(e) => return fail(formatter, "Copy failed", &e),
    };

    print_report(formatter, &report)
}

fn print_report(formatter: &Formatter, report: &CopyReport) -> ExitCode {
    if formatter.is_json() {
        formatter.json(report);
    } else {
        for failure in &report.run.failures {
            formatter.warning(&format!(
                "{} → {}: {}",
                failure.source, failure.destination, failure.error
            ));
        }
        let verb = match report.direction {
            Direction::Upload => "Uploaded",
            Direction::Download => "Downloaded",
        };
        formatter.success(&format!(
            "{verb} {} → {} ({} file(s), {})",
            report.source,
            report.destination,
            report.run.transferred,
            format_size(report.run.bytes, BINARY)
        ));
    }

    if report.run.is_success() {
        ExitCode::Success
    } else {
        formatter.error(&format!(
            "{} file(s) failed to copy",
            report.run.failures.len()
        ));
        ExitCode::GeneralError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use crate::commands::storage::StorageCommands;
    use clap::Parser;

    fn parse(args: &[&str]) -> CpArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Storage(StorageCommands::Cp(args)) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_recursive_copy() {
        let args = parse(&["nimbus", "storage", "cp", "-r", "./data", "bucket/data"]);
        assert!(args.recursive);
        assert!(!args.continue_on_error);
        assert_eq!(args.source, "./data");
        assert_eq!(args.target, "bucket/data");
    }

    #[test]
    fn test_parse_continue_on_error() {
        let args = parse(&[
            "nimbus",
            "storage",
            "cp",
            "--recursive",
            "--continue-on-error",
            "bucket/prefix",
            "./out",
        ]);
        assert!(args.continue_on_error);
    }

    #[test]
    fn test_cp_requires_two_paths() {
        assert!(Cli::try_parse_from(["nimbus", "storage", "cp", "only-one"]).is_err());
    }
}
