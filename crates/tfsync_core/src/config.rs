//! Repository configuration (`.tfsync/config.toml`).

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a tfsync repository.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Replay behavior.
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Storage-related configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Tracked remotes, keyed by remote id.
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteConfig>,
}

impl Config {
    /// Loads configuration from `<root>/config.toml`, or defaults if absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| SyncError::ConfigError(format!("failed to read config: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| SyncError::ConfigError(format!("failed to parse config: {}", e)))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves configuration to `<root>/config.toml`.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = root.join("config.toml");
        let content = toml::to_string_pretty(self)
            .map_err(|e| SyncError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| SyncError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }
}

/// Replay behavior shared by all remotes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplayConfig {
    /// Fold path case when looking up known paths (default: true).
    pub ignore_case: bool,

    /// Seconds between progress notifications during a full-tree copy
    /// (default: 30).
    pub progress_interval_secs: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            ignore_case: true,
            progress_interval_secs: 30,
        }
    }
}

impl ReplayConfig {
    /// Returns the progress interval as a Duration.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Compression level for zstd (1-22, default: 3).
    pub compression_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
        }
    }
}

/// One tracked folder on a source server.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RemoteConfig {
    /// Server collection URL.
    pub url: String,

    /// Server path of the tracked folder, e.g. `$/Project/Trunk`.
    pub repository: String,

    /// Regex over repo-relative paths; matching items are never replayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_paths: Option<String>,

    /// Omit the `git-tfs-id` trailer from commit messages.
    #[serde(default)]
    pub no_meta_data: bool,

    /// Account used against the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// `<repository> on <url>`, followed by ` as <username>` when one is set.
impl fmt::Display for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.repository, self.url)?;
        if let Some(user) = &self.username {
            write!(f, " as {}", user)?;
        }
        Ok(())
    }
}
