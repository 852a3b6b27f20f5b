//! Configuration management.
//!
//! Configuration is loaded from a platform config directory with sensible
//! defaults. All config structs implement `Default` with values matching
//! the reference deployment.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bedrock connection settings
    pub bedrock: BedrockConfig,

    /// Generation parameters
    pub inference: InferenceConfig,

    /// Concurrent dispatch settings
    pub batch: BatchConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.bedrock-captions.bedrock-captions/config.toml
    /// - Linux: ~/.config/bedrock-captions/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\bedrock-captions\config\config.toml
    ///
    /// Falls back to ~/.bedrock-captions/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "bedrock-captions", "bedrock-captions")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".bedrock-captions").join("config.toml")
            })
    }

    /// Per-request timeout in milliseconds, derived from `bedrock.timeout_secs`.
    pub fn timeout_ms(&self) -> u64 {
        self.bedrock.timeout_secs.saturating_mul(1000)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
