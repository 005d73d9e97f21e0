//! Configuration System
//!
//! Layered configuration: built-in defaults, then the user file, then the
//! workspace's `config/config.toml`, then `PAGEHOST_*` environment variables.
//! Values are validated once after merging.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

mod merge_policy;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Origin serving the content pages and the page viewer
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Broadcast channel shared by the host and the detached tab
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Directory scanned for content pages, relative to the workspace
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,

    #[serde(default)]
    pub handshake: HandshakeConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Detached-tab ready handshake: poll every `interval_ms`, give up after
/// `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl HandshakeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Storage paths, relative to the workspace unless absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_variable_sets_dir")]
    pub variable_sets_dir: PathBuf,

    #[serde(default = "default_preferences_path")]
    pub preferences_path: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_channel_name() -> String {
    "custom-page-handler".to_string()
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from("pages")
}

fn default_interval_ms() -> u64 {
    100
}

fn default_max_attempts() -> u32 {
    50
}

fn default_variable_sets_dir() -> PathBuf {
    PathBuf::from("variable_sets")
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from(".pagehost/preferences")
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            channel_name: default_channel_name(),
            pages_dir: default_pages_dir(),
            handshake: HandshakeConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            variable_sets_dir: default_variable_sets_dir(),
            preferences_path: default_preferences_path(),
        }
    }
}

impl HostConfig {
    /// Validate the merged configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.channel_name.trim().is_empty() {
            errors.push("channel_name cannot be empty".to_string());
        }
        if self.handshake.interval_ms == 0 {
            errors.push("handshake.interval_ms must be positive".to_string());
        }
        if self.handshake.max_attempts == 0 {
            errors.push("handshake.max_attempts must be positive".to_string());
        }
        if let Err(e) = self.parsed_base_url() {
            errors.push(e.to_string());
        }
        if self.storage.variable_sets_dir.as_os_str().is_empty() {
            errors.push("storage.variable_sets_dir cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url '{}': {}", self.base_url, e)))
    }

    pub fn pages_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.pages_dir)
    }

    pub fn variable_sets_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.storage.variable_sets_dir)
    }

    pub fn preferences_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.storage.preferences_path)
    }
}

/// Loads [`HostConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Merge every source for `workspace_root` and validate the result.
    pub fn load(workspace_root: &Path) -> Result<HostConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::environment::add_to_builder(builder);

        let config: HostConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single explicit file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<HostConfig, ConfigError> {
        let config: HostConfig = merge_policy::builder_with_defaults()?
            .add_source(::config::File::from(path.to_path_buf()).required(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
