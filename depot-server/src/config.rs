//! # Configuration Management
//!
//! The registry is configured through a TOML file (`depot.toml` by default).
//! Every section but `[index]` and `[storage]` has defaults:
//!
//! - [`GeneralConfig`]: bind address, public URL, access control
//! - [`FrontendConfig`]: the server-rendered web pages
//! - `[index]`: the index management strategy ([`Index`])
//! - `[storage]`: the crate storage strategy ([`Storage`])
//! - [`DatabaseConfig`]: the SQLite database
//! - [`LimitsConfig`]: upload limits
//! - [`InternalConfig`]: the internal management API used by peer instances
//! - `[logging]`: see [`LogSettings`]
//!
//! ```rust,no_run
//! use depot_server::config::Config;
//!
//! // Load from file with fallback to defaults
//! let config = Config::load_or_default("depot.toml")?;
//! config.validate()?;
//! # Ok::<(), depot_server::config::ConfigError>(())
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use depot_core::index::cli::CommandLineIndex;
use depot_core::storage::disk::DiskStorage;
use depot_core::{Index, Storage};
use depot_logging::LogSettings;
use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure for the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    /// Index management strategy
    pub index: Index,
    /// Crate storage strategy
    pub storage: Storage,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub internal: InternalConfig,
    #[serde(default)]
    pub logging: LogSettings,
}

/// Network and access settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Socket address to listen on
    pub bind_address: String,
    /// URL under which clients reach this instance; used in the index `config.json`
    pub public_url: String,
    /// Require a valid API token to read the index and download crates
    pub auth_required: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            public_url: "http://localhost:3000".to_string(),
            auth_required: false,
        }
    }
}

/// Server-rendered frontend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub enabled: bool,
    /// Instance title shown in page headers
    pub title: String,
    /// Short description shown on the home page
    pub description: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "depot".to_string(),
            description: "A private Cargo registry".to_string(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database, or `:memory:`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "depot.db".to_string(),
        }
    }
}

/// Upload limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of a `.crate` archive, in megabytes
    pub max_crate_size_mb: u64,
    /// Maximum size of any request body, in megabytes
    pub max_request_body_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_crate_size_mb: 10,
            max_request_body_size_mb: 12,
        }
    }
}

/// Internal management API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalConfig {
    pub enabled: bool,
    /// Bearer token peers must present
    pub token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            frontend: FrontendConfig::default(),
            index: Index::CommandLine(CommandLineIndex::new("crate-index")),
            storage: Storage::Disk(DiskStorage::new("crate-storage")),
            database: DatabaseConfig::default(),
            limits: LimitsConfig::default(),
            internal: InternalConfig::default(),
            logging: LogSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&config_str)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a file if it exists, otherwise use defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check settings that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address()?;

        url::Url::parse(&self.general.public_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "general.public_url '{}' is not a valid URL: {e}",
                self.general.public_url
            ))
        })?;

        if self.internal.enabled && self.internal.token.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "internal.token must be set when the internal API is enabled".to_string(),
            ));
        }

        if self.limits.max_crate_size_mb == 0 || self.limits.max_request_body_size_mb == 0 {
            return Err(ConfigError::Invalid(
                "limits must be greater than zero".to_string(),
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must be set".to_string()));
        }

        Ok(())
    }

    /// The parsed listening address.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        self.general.bind_address.parse().map_err(|e| {
            ConfigError::Invalid(format!(
                "general.bind_address '{}' is not a socket address: {e}",
                self.general.bind_address
            ))
        })
    }

    /// Public URL without a trailing slash.
    pub fn public_url(&self) -> &str {
        self.general.public_url.trim_end_matches('/')
    }

    /// Maximum `.crate` archive size in bytes.
    pub fn max_crate_size_bytes(&self) -> u64 {
        self.limits.max_crate_size_mb * 1024 * 1024
    }

    /// Maximum request body size in bytes.
    pub fn max_request_body_size_bytes(&self) -> usize {
        (self.limits.max_request_body_size_mb * 1024 * 1024) as usize
    }
}
