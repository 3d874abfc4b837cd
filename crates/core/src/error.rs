//! Error types for nimbus-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for nimbus-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for nimbus-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination or malformed path
    #[error("Usage error: {0}")]
    Usage(String),

    /// Missing or rejected store credentials
    #[error("Credential error: {0}")]
    Credential(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error on a specific local path
    #[error("{action} {}: {source}", path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local fingerprint does not match the one returned by the store
    #[error("Checksum mismatch for {key}: local={local} remote={remote}")]
    Integrity {
        key: String,
        local: String,
        remote: String,
    },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store unreachable or returned a non-success status
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Wrap an IO error with the local path it happened on
    pub fn file(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            action,
            path: path.into(),
            source,
        }
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) | Error::Config(_) => 2, // UsageError
            Error::Network(_) => 3,                  // NetworkError
            Error::Credential(_) => 4,               // CredentialError
            Error::NotFound(_) => 5,                 // NotFound
            Error::Integrity { .. } => 6,            // IntegrityError
            _ => 1,                                  // GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::Usage("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        assert_eq!(Error::Credential("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        let integrity = Error::Integrity {
            key: "k".into(),
            local: "a".into(),
            remote: "b".into(),
        };
        assert_eq!(integrity.exit_code(), 6);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
        let io = std::io::Error::other("boom");
        assert_eq!(Error::file("Cannot open", "/tmp/x", io).exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::Usage("invalid source path: foo".into());
        assert_eq!(err.to_string(), "Usage error: invalid source path: foo");

        let err = Error::Integrity {
            key: "data/a.bin".into(),
            local: "abc".into(),
            remote: "def".into(),
        };
        assert_eq!(
            err.to_string(),
            "Checksum mismatch for data/a.bin: local=abc remote=def"
        );

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::file("Cannot open", "/tmp/nope", io);
        assert_eq!(err.to_string(), "Cannot open /tmp/nope: missing");
    }
}
