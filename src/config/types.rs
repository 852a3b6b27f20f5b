//! Sub-configuration structs with defaults matching the reference deployment.

use serde::{Deserialize, Serialize};

/// Bedrock connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockConfig {
    /// Bedrock model identifier
    pub model_id: String,

    /// AWS region. When unset, the SDK default resolution chain applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Named credentials profile. When unset, the SDK default chain applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            region: None,
            profile: None,
            timeout_secs: 30,
        }
    }
}

/// Generation parameters sent with every description request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Sampling temperature (0.0-1.0). Lower is more deterministic.
    pub temperature: f32,

    /// Maximum tokens to generate per description
    pub max_tokens: u32,

    /// Top-k filtering parameter
    pub top_k: u32,

    /// Prompt template sent alongside each image
    pub prompt: String,

    /// Provenance tag recorded on every generated annotation
    pub provenance: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 200,
            top_k: 250,
            prompt: "Describe this image in a few sentences.".to_string(),
            provenance: "amazon-bedrock".to_string(),
        }
    }
}

/// Batch dispatch settings for concurrent description requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Remote-services gate. When false, documents pass through untouched.
    pub enabled: bool,

    /// Maximum concurrent Bedrock calls
    pub max_workers: usize,

    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base backoff delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_workers: 3,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
