//! Process exit codes
//!
//! Scripts branch on these values, so existing numbers never change
//! meaning. Every `nimbus_core::Error` maps onto exactly one of them.

use nimbus_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,

    /// General/unspecified error, including partially failed batches
    GeneralError = 1,

    /// User input error: invalid arguments, malformed path, bad configuration
    UsageError = 2,

    /// Store unreachable or returned an unexpected status
    NetworkError = 3,

    /// Missing or rejected credentials
    CredentialError = 4,

    /// Resource not found: bucket or object does not exist
    NotFound = 5,

    /// Uploaded content does not match the local fingerprint
    IntegrityError = 6,

    /// Operation was interrupted (e.g., Ctrl+C)
    Interrupted = 130,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::NetworkError),
            4 => Some(Self::CredentialError),
            5 => Some(Self::NotFound),
            6 => Some(Self::IntegrityError),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Get a human-readable description of the exit code
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Operation completed successfully",
            Self::GeneralError => "General error",
            Self::UsageError => "Invalid arguments or path format",
            Self::NetworkError => "Network error",
            Self::CredentialError => "Missing or rejected credentials",
            Self::NotFound => "Resource not found",
            Self::IntegrityError => "Checksum mismatch",
            Self::Interrupted => "Operation interrupted",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        Self::from_i32(err.exit_code()).unwrap_or(Self::GeneralError)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in [
            ExitCode::Success,
            ExitCode::GeneralError,
            ExitCode::UsageError,
            ExitCode::NetworkError,
            ExitCode::CredentialError,
            ExitCode::NotFound,
            ExitCode::IntegrityError,
            ExitCode::Interrupted,
        ] {
            assert_eq!(ExitCode::from_i32(code.as_i32()), Some(code));
        }
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
        assert_eq!(ExitCode::from_i32(7), None);
    }

    #[test]
    fn test_exit_code_from_error() {
        assert_eq!(
            ExitCode::from(&Error::Usage("x".into())),
            ExitCode::UsageError
        );
        assert_eq!(
            ExitCode::from(&Error::Config("x".into())),
            ExitCode::UsageError
        );
        assert_eq!(
            ExitCode::from(&Error::Credential("x".into())),
            ExitCode::CredentialError
        );
        assert_eq!(
            ExitCode::from(&Error::NotFound("x".into())),
            ExitCode::NotFound
        );
        let integrity = Error::Integrity {
            key: "k".into(),
            local: "a".into(),
            remote: "b".into(),
        };
        assert_eq!(ExitCode::from(&integrity), ExitCode::IntegrityError);
        assert_eq!(
            ExitCode::from(&Error::General("x".into())),
            ExitCode::GeneralError
        );
    }

    #[test]
    fn test_exit_code_display() {
        let display = format!("{}", ExitCode::IntegrityError);
        assert!(display.contains("6"));
        assert!(display.contains("Checksum"));
    }
}
