//! ls command - List buckets and objects
//!
//! Without an argument (or with `/`) lists buckets, otherwise one level of
//! the given prefix, directories first.

use clap::Args;
use nimbus_core::listing::list;
use nimbus_core::{ListEntry, Listing, ObjectStore};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

const PLACEHOLDER: &str = "-";

/// List buckets or objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// bucket[/prefix]; lists buckets when omitted
    #[arg(default_value = "")]
    pub path: String,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, store: &dyn ObjectStore, formatter: &Formatter) -> ExitCode {
    let listing = match list(store, &args.path).await {
        Ok(listing) => listing,
        Err(e) => return fail(formatter, "Failed to list", &e),
    };

    if formatter.is_json() {
        formatter.json(&listing);
        return ExitCode::Success;
    }

    let rows = match &listing {
        Listing::Buckets { entries } => entries
            .iter()
            .map(|e| vec![date(e), formatter.dir_name(&format!("{}/", e.name))])
            .collect(),
        Listing::Prefix { entries, .. } => entries.iter().map(|e| row(formatter, e)).collect(),
    };
    formatter.table(rows, 1);
    ExitCode::Success
}

fn date(entry: &ListEntry) -> String {
    entry
        .last_modified
        .map(|t| t.strftime("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn row(formatter: &Formatter, entry: &ListEntry) -> Vec<String> {
    let size = entry
        .size_human
        .clone()
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let name = if entry.is_dir {
        formatter.dir_name(&entry.name)
    } else {
        entry.name.clone()
    };
    vec![size, date(entry), name]
}
