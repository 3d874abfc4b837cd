//! mb command - Make bucket
//!
//! Creating a bucket that already exists succeeds.

use clap::{Args, ValueEnum};
use nimbus_core::{
    BucketAcl, BucketCreation, BucketOptions, Error, ObjectStore, RemotePath, make_bucket,
};
use serde::Serialize;

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AclArg {
    #[default]
    Private,
    PublicRead,
}

impl From<AclArg> for BucketAcl {
    fn from(arg: AclArg) -> Self {
        match arg {
            AclArg::Private => BucketAcl::Private,
            AclArg::PublicRead => BucketAcl::PublicRead,
        }
    }
}

/// Create a bucket
#[derive(Args, Debug)]
pub struct MbArgs {
    /// Bucket name
    pub bucket: String,

    /// Region (location constraint) for the bucket
    #[arg(long)]
    pub region: Option<String>,

    /// Canned ACL applied to the bucket
    #[arg(long, value_enum, default_value_t = AclArg::Private)]
    pub acl: AclArg,
}

#[derive(Debug, Serialize)]
struct MbOutput {
    status: BucketCreation,
    bucket: String,
}

/// Execute the mb command
pub async fn execute(args: MbArgs, store: &dyn ObjectStore, formatter: &Formatter) -> ExitCode {
    let bucket = match bucket_name(&args.bucket) {
        Ok(bucket) => bucket,
        Err(e) => return fail(formatter, "Invalid bucket", &e),
    };

    let options = BucketOptions {
        region: args.region,
        acl: args.acl.into(),
    };

    let status = match make_bucket(store, &bucket, &options).await {
        Ok(status) => status,
        Err(e) => return fail(formatter, &format!("Failed to create bucket {bucket}"), &e),
    };

    if formatter.is_json() {
        formatter.json(&MbOutput { status, bucket });
    } else {
        match status {
            BucketCreation::Created => formatter.success(&format!("Bucket created: {bucket}")),
            BucketCreation::AlreadyExists => {
                formatter.success(&format!("Bucket already exists: {bucket}"))
            }
        }
    }
    ExitCode::Success
}

fn bucket_name(arg: &str) -> Result<String, Error> {
    let path = RemotePath::parse(arg.trim_end_matches('/'))?;
    if !path.key.is_empty() {
        return Err(Error::Usage(format!(
            "'{arg}' is not a bucket name, it contains a key"
        )));
    }
    Ok(path.bucket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::storage::StorageCommands;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_bucket_name() {
        assert_eq!(bucket_name("results").unwrap(), "results");
        assert_eq!(bucket_name("s3://results/").unwrap(), "results");
        assert!(matches!(bucket_name("results/key"), Err(Error::Usage(_))));
    }

    #[test]
    fn test_parse_acl() {
        let cli = Cli::try_parse_from([
            "nimbus",
            "storage",
            "mb",
            "results",
            "--acl",
            "public-read",
            "--region",
            "eu-west-1",
        ])
        .unwrap();
        match cli.command {
            Commands::Storage(StorageCommands::Mb(args)) => {
                assert_eq!(BucketAcl::from(args.acl), BucketAcl::PublicRead);
                assert_eq!(args.region.as_deref(), Some("eu-west-1"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_acl_rejected() {
        assert!(
            Cli::try_parse_from(["nimbus", "storage", "mb", "b", "--acl", "authenticated-read"])
                .is_err()
        );
    }
}
