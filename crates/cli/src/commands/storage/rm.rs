//! rm command - Remove objects, prefixes and buckets

use clap::Args;
use nimbus_core::{ObjectStore, RemotePath, RemoveReport, remove};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Remove an object, a prefix or a bucket
#[derive(Args, Debug)]
pub struct RmArgs {
    /// bucket[/key]
    pub target: String,

    /// Remove everything under the prefix, or the bucket itself
    #[arg(short, long)]
    pub recursive: bool,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, store: &dyn ObjectStore, formatter: &Formatter) -> ExitCode {
    let target = match RemotePath::parse(&args.target) {
        Ok(target) => target,
        Err(e) => return fail(formatter, "Invalid target", &e),
    };

    let report = match remove(store, &target, args.recursive).await {
        Ok(report) => report,
        Err(e) => return fail(formatter, &format!("Failed to remove {target}"), &e),
    };

    print_report(formatter, &target, &report)
}

fn print_report(formatter: &Formatter, target: &RemotePath, report: &RemoveReport) -> ExitCode {
    if formatter.is_json() {
        formatter.json(report);
    } else if report.bucket_removed {
        formatter.success(&format!("Bucket {} deleted", target.bucket));
    } else {
        for key in &report.deleted {
            formatter.println(&format!("Deleted {}/{key}", target.bucket));
        }
        for (key, reason) in &report.failed {
            formatter.warning(&format!("Failed to delete {}/{key}: {reason}", target.bucket));
        }
    }

    if report.failed.is_empty() {
        ExitCode::Success
    } else {
        formatter.error(&format!("{} object(s) could not be deleted", report.failed.len()));
        ExitCode::GeneralError
    }
}
