//! Error types for the caption pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (node references, service error codes).

use thiserror::Error;

/// Top-level error type for caption operations.
#[derive(Error, Debug)]
pub enum CaptionError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Description generation errors
    #[error("Description error: {0}")]
    Describe(#[from] DescribeError),

    /// Document model errors
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors from the document node model.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A caption or parent reference points at nothing
    #[error("Reference {0} does not resolve to a document item")]
    UnresolvedRef(String),

    /// Embedded image URI is not a base64 data URI
    #[error("Image URI is not a base64 data URI")]
    NotDataUri,

    /// Embedded image payload failed to decode
    #[error("Invalid base64 image payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
}

/// Errors from a single description request.
#[derive(Error, Debug)]
pub enum DescribeError {
    /// The Bedrock API call failed. `code` carries the service exception
    /// name (e.g. "ThrottlingException") when one was returned.
    #[error("Bedrock API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
    },

    /// The request exceeded the per-request timeout
    #[error("Timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The model produced no text content
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// The image could not be prepared for submission
    #[error("Image encoding failed: {0}")]
    ImageEncode(String),
}

/// Convenience type alias for caption results.
pub type Result<T> = std::result::Result<T, CaptionError>;

/// Convenience type alias for description-stage results.
pub type DescribeResult<T> = std::result::Result<T, DescribeError>;
