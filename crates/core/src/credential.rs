//! Store credentials and endpoint resolution
//!
//! Credentials come from the external login flow via the config file. This
//! module only validates them and derives the values the S3 adapter needs.

use std::fmt;

use crate::error::{Error, Result};

/// Header carrying the tenant identity on every store request
pub const IDENTITY_HEADER: &str = "X-Amz-Meta-User-Id";

/// Offset added to the numeric user id before it is sent to the store
pub const IDENTITY_OFFSET: u64 = 1000;

/// Per-user object store credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key: String,
    secret_key: String,
    user_id: u32,
}

impl Credential {
    /// Create a credential, rejecting empty keys
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        user_id: u32,
    ) -> Result<Self> {
        let access_key = access_key.into();
        let secret_key = secret_key.into();
        if access_key.is_empty() || secret_key.is_empty() {
            return Err(Error::Credential(
                "S3 credentials not found. Please login again".into(),
            ));
        }
        Ok(Self {
            access_key,
            secret_key,
            user_id,
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    /// Value of [`IDENTITY_HEADER`] for this user
    pub fn identity_header_value(&self) -> String {
        (u64::from(self.user_id) + IDENTITY_OFFSET).to_string()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Object store address derived from the platform API endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl StoreEndpoint {
    /// Strip scheme and path from the API endpoint and attach the store port
    pub fn from_api_endpoint(api_endpoint: &str, port: u16, secure: bool) -> Result<Self> {
        let parsed = url::Url::parse(api_endpoint)
            .map_err(|e| Error::Config(format!("invalid API endpoint '{api_endpoint}': {e}")))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config(format!("API endpoint has no host: {api_endpoint}")))?;
        Ok(Self {
            host: host.to_string(),
            port,
            secure,
        })
    }

    /// Full URL handed to the S3 client
    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for StoreEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}
