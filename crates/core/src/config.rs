//! Configuration management
//!
//! This module handles loading, saving, and migrating the nimbus configuration file.
//! The configuration file is stored in TOML format at ~/.config/nimbus/config.toml,
//! or under `$NIMBUS_CONFIG_DIR` when that variable is set.
//!
//! PROTECTED FILE: Changes to schema_version require migration support.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::credential::{Credential, StoreEndpoint};
use crate::error::{Error, Result};

/// Current configuration schema version
///
/// IMPORTANT: Bumping this version requires:
/// 1. Adding a migration in `ConfigManager::migrate`
/// 2. Updating migration tests
/// 3. Marking the change as BREAKING
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "NIMBUS_CONFIG_DIR";

/// Environment variable overriding the API endpoint
pub const BASE_URL_ENV: &str = "NIMBUS_BASE_URL";

/// API endpoint used when neither the config file nor the environment sets one
pub const DEFAULT_API_ENDPOINT: &str = "https://nimbus.example.org";

/// Port the object store listens on, relative to the API host
pub const DEFAULT_STORAGE_PORT: u16 = 9443;

/// Default output format
const DEFAULT_OUTPUT: &str = "human";

/// Default color setting
const DEFAULT_COLOR: &str = "auto";

/// Placeholder printed instead of secrets
pub const REDACTED: &str = "<redacted>";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Resolved account details written after login
    #[serde(default)]
    pub account: Account,

    /// Object store connection settings
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always", or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Show progress bars
    #[serde(default = "default_true")]
    pub progress: bool,
}

/// Account details supplied by the external login flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Base URL of the platform API
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Login name
    #[serde(default)]
    pub username: String,

    /// Object store access key; falls back to `username` when empty
    #[serde(default)]
    pub s3_access_user: String,

    /// Object store secret key
    #[serde(default)]
    pub s3_access_token: String,

    /// Numeric user identifier used for tenant isolation
    #[serde(default)]
    pub user_id: u32,
}

/// Object store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Port of the object store on the API host
    #[serde(default = "default_storage_port")]
    pub port: u16,

    /// Use TLS
    #[serde(default = "default_true")]
    pub secure: bool,

    /// Signing region
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_storage_port() -> u16 {
    DEFAULT_STORAGE_PORT
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// API endpoint from the environment, or the built-in default
pub fn default_api_endpoint() -> String {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string())
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            progress: true,
        }
    }
}

impl Default for Account {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            username: String::new(),
            s3_access_user: String::new(),
            s3_access_token: String::new(),
            user_id: 0,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            port: default_storage_port(),
            secure: true,
            region: default_region(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            account: Account::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Config {
    /// Resolve the store credential from the account section
    pub fn credential(&self) -> Result<Credential> {
        let access_key = if self.account.s3_access_user.is_empty() {
            &self.account.username
        } else {
            &self.account.s3_access_user
        };
        Credential::new(
            access_key,
            &self.account.s3_access_token,
            self.account.user_id,
        )
    }

    /// Derive the object store endpoint from the API endpoint
    pub fn store_endpoint(&self) -> Result<StoreEndpoint> {
        StoreEndpoint::from_api_endpoint(
            &self.account.api_endpoint,
            self.storage.port,
            self.storage.secure,
        )
    }

    /// Copy of this configuration with secrets replaced by a placeholder
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.account.s3_access_token.is_empty() {
            copy.account.s3_access_token = REDACTED.to_string();
        }
        copy
    }

    /// Set a configuration value by key name
    ///
    /// Keys are matched case-insensitively and ignore `_` and `-`, so
    /// `s3AccessToken`, `s3_access_token` and `s3-access-token` are equivalent.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let wanted = normalize_key(key);
        let (_, setter) = SETTERS
            .iter()
            .find(|(name, _)| normalize_key(name) == wanted)
            .ok_or_else(|| {
                Error::Usage(format!(
                    "unknown configuration key '{key}'. Known keys: {}",
                    known_keys().join(", ")
                ))
            })?;
        setter(self, value)
    }
}

type Setter = fn(&mut Config, &str) -> Result<()>;

/// Recognized configuration keys and their typed setters
const SETTERS: &[(&str, Setter)] = &[
    ("apiEndpoint", |c, v| {
        let expected = "an absolute URL with a host, e.g. https://hpc.example.edu";
        let parsed = url::Url::parse(v).map_err(|_| invalid_value("apiEndpoint", v, expected))?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid_value("apiEndpoint", v, expected));
        }
        c.account.api_endpoint = v.to_string();
        Ok(())
    }),
    ("username", |c, v| {
        c.account.username = v.to_string();
        Ok(())
    }),
    ("s3AccessUser", |c, v| {
        c.account.s3_access_user = v.to_string();
        Ok(())
    }),
    ("s3AccessToken", |c, v| {
        c.account.s3_access_token = v.to_string();
        Ok(())
    }),
    ("userId", |c, v| {
        c.account.user_id = parse_value("userId", v)?;
        Ok(())
    }),
    ("storagePort", |c, v| {
        c.storage.port = parse_value("storagePort", v)?;
        Ok(())
    }),
    ("storageSecure", |c, v| {
        c.storage.secure = parse_value("storageSecure", v)?;
        Ok(())
    }),
    ("region", |c, v| {
        c.storage.region = v.to_string();
        Ok(())
    }),
    ("output", |c, v| {
        match v {
            "human" | "json" => c.defaults.output = v.to_string(),
            _ => return Err(invalid_value("output", v, "human or json")),
        }
        Ok(())
    }),
    ("color", |c, v| {
        match v {
            "auto" | "always" | "never" => c.defaults.color = v.to_string(),
            _ => return Err(invalid_value("color", v, "auto, always or never")),
        }
        Ok(())
    }),
    ("progress", |c, v| {
        c.defaults.progress = parse_value("progress", v)?;
        Ok(())
    }),
];

/// Names of all keys accepted by [`Config::set`]
pub fn known_keys() -> Vec<&'static str> {
    SETTERS.iter().map(|(name, _)| *name).collect()
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| invalid_value(key, value, std::any::type_name::<T>()))
}

fn invalid_value(key: &str, value: &str, expected: &str) -> Error {
    Error::Usage(format!(
        "invalid value '{value}' for '{key}': expected {expected}"
    ))
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("nimbus"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade nimbus.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist. On unix the file is
    /// owner read/write only (600) before any content is written.
    pub fn save(&self, config: &Config) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.config_path)?;

        // mode() only applies on creation; tighten a pre-existing file too
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        tracing::debug!(path = %self.config_path.display(), "configuration saved");
        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;

        // No migrations exist yet; version 1 is the first schema.
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}
