//! presign command - Generate a time-limited object URL

use std::time::Duration;

use clap::Args;
use nimbus_core::{Error, ObjectStore, PresignMethod, RemotePath};
use serde::Serialize;

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Generate a time-limited URL for an object
#[derive(Args, Debug)]
pub struct PresignArgs {
    /// Object path (bucket/key)
    pub path: String,

    /// How long the URL stays valid, e.g. 15m, 1h, 2days
    #[arg(long, default_value = "1h", value_parser = humantime::parse_duration)]
    pub expire: Duration,

    /// HTTP method the URL grants: GET or PUT
    #[arg(long, default_value = "GET")]
    pub method: String,
}

#[derive(Debug, Serialize)]
struct PresignOutput {
    url: String,
    method: PresignMethod,
    expires_in_secs: u64,
}

/// Execute the presign command
pub async fn execute(args: PresignArgs, store: &dyn ObjectStore, formatter: &Formatter) -> ExitCode {
    let (path, method) = match parse(&args) {
        Ok(parsed) => parsed,
        Err(e) => return fail(formatter, "Invalid presign request", &e),
    };

    let url = match store.presign(&path, method, args.expire).await {
        Ok(url) => url,
        Err(e) => return fail(formatter, "Failed to presign", &e),
    };

    if formatter.is_json() {
        formatter.json(&PresignOutput {
            url,
            method,
            expires_in_secs: args.expire.as_secs(),
        });
    } else {
        formatter.println(&url);
    }
    ExitCode::Success
}

fn parse(args: &PresignArgs) -> Result<(RemotePath, PresignMethod), Error> {
    let method: PresignMethod = args.method.parse()?;
    let path = RemotePath::parse(&args.path)?;
    if path.key.is_empty() {
        return Err(Error::Usage(format!(
            "'{}' is missing an object key",
            args.path
        )));
    }
    Ok((path, method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::storage::StorageCommands;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    fn parse_args(args: &[&str]) -> PresignArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Storage(StorageCommands::Presign(args)) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = parse_args(&["nimbus", "storage", "presign", "b/k"]);
        assert_eq!(args.expire, Duration::from_secs(3600));
        let (path, method) = parse(&args).unwrap();
        assert_eq!(path, RemotePath::new("b", "k"));
        assert_eq!(method, PresignMethod::Get);
    }

    #[test]
    fn test_expire_and_method() {
        let args = parse_args(&[
            "nimbus", "storage", "presign", "b/k", "--expire", "15m", "--method", "put",
        ]);
        assert_eq!(args.expire, Duration::from_secs(900));
        assert_eq!(parse(&args).unwrap().1, PresignMethod::Put);
    }

    #[test]
    fn test_delete_method_is_usage_error() {
        let args = parse_args(&["nimbus", "storage", "presign", "b/k", "--method", "DELETE"]);
        let err = parse(&args).unwrap_err();
        assert_eq!(ExitCode::from(&err), ExitCode::UsageError);
    }

    #[test]
    fn test_bucket_only_is_usage_error() {
        let args = parse_args(&["nimbus", "storage", "presign", "b"]);
        assert!(matches!(parse(&args), Err(Error::Usage(_))));
    }

    #[test]
    fn test_bad_duration_rejected() {
        assert!(
            Cli::try_parse_from(["nimbus", "storage", "presign", "b/k", "--expire", "soon"])
                .is_err()
        );
    }
}
