//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.bedrock.model_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bedrock.model_id must not be empty".into(),
            ));
        }
        if self.bedrock.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "bedrock.timeout_secs must be > 0".into(),
            ));
        }
        if self.inference.temperature < 0.0 || self.inference.temperature > 1.0 {
            return Err(ConfigError::ValidationError(
                "inference.temperature must be between 0.0 and 1.0".into(),
            ));
        }
        if self.inference.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "inference.max_tokens must be > 0".into(),
            ));
        }
        if self.inference.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "inference.top_k must be > 0".into(),
            ));
        }
        if self.inference.prompt.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "inference.prompt must not be empty".into(),
            ));
        }
        if self.batch.max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_workers must be > 0".into(),
            ));
        }
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "logging.level must be one of error/warn/info/debug/trace, got '{other}'"
                )));
            }
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "logging.format must be 'pretty' or 'json', got '{other}'"
                )));
            }
        }
        Ok(())
    }
}
