//! Configuration for the account sync layer.
//!
//! Configuration is loaded from a TOML file (default: `account.toml`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use account_core::DeleteFriendResult;
use serde::Deserialize;

/// Root configuration for the sync layer.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Remote account service configuration.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Local store configuration.
    #[serde(default)]
    pub local: LocalConfig,
    /// Policy switches.
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Remote account service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the account service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Deadline for each remote call, in seconds. A call that exceeds it
    /// is treated as a remote failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

/// Policy switches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    /// What `delete_friend` reports after compensation.
    #[serde(default)]
    pub delete_friend_result: DeleteFriendResult,
}

// Default value functions
fn default_endpoint() -> String {
    "https://account.blockfall.gg".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_database_path() -> PathBuf {
    PathBuf::from("account.db")
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            local: LocalConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The remote call deadline as a [`Duration`].
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
