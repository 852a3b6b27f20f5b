//! Vision model trait and request/response types.
//!
//! Defines the interface the batch engine dispatches through, so tests and
//! alternative backends can stand in for the Bedrock client.

use crate::config::InferenceConfig;
use crate::error::DescribeError;
use async_trait::async_trait;
use base64::Engine;
use std::io::Cursor;
use std::time::Duration;

/// Media types the messages API accepts in image content blocks.
const ACCEPTED_MEDIA_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Base64-encoded image ready to submit to the model.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g. "image/png")
    pub media_type: String,
}

impl ImagePayload {
    /// Build a payload from encoded image bytes.
    ///
    /// Formats the model does not accept (TIFF, BMP, ...) are decoded and
    /// re-encoded as PNG before submission.
    pub fn from_bytes(bytes: &[u8], media_type: &str) -> Result<Self, DescribeError> {
        if ACCEPTED_MEDIA_TYPES.contains(&media_type) {
            return Ok(Self {
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
                media_type: media_type.to_string(),
            });
        }

        tracing::debug!("Re-encoding {media_type} image as PNG for submission");
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| DescribeError::ImageEncode(format!("decode {media_type}: {e}")))?;
        let mut png = Cursor::new(Vec::new());
        decoded
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| DescribeError::ImageEncode(format!("encode png: {e}")))?;

        Ok(Self {
            data: base64::engine::general_purpose::STANDARD.encode(png.get_ref()),
            media_type: "image/png".to_string(),
        })
    }
}

/// A single description request.
#[derive(Debug, Clone)]
pub struct DescribeRequest {
    /// The image to describe
    pub image: ImagePayload,
    /// Prompt template instructing the model
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Top-k filtering parameter
    pub top_k: u32,
}

impl DescribeRequest {
    /// Build a request from an image payload and the configured inference
    /// parameters.
    pub fn new(image: ImagePayload, inference: &InferenceConfig) -> Self {
        Self {
            image,
            prompt: inference.prompt.clone(),
            temperature: inference.temperature,
            max_tokens: inference.max_tokens,
            top_k: inference.top_k,
        }
    }
}

/// A generated description.
#[derive(Debug, Clone)]
pub struct Description {
    /// Generated text
    pub text: String,
    /// Model identifier that produced it
    pub model: String,
    /// Tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait implemented by vision-language backends.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the batch engine holds an `Arc<dyn VisionModel>`).
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Backend name for logging (e.g. "bedrock").
    fn name(&self) -> &str;

    /// Provenance tag recorded on annotations produced by this backend.
    fn provenance(&self) -> &str;

    /// Generate a description for the given request.
    async fn describe(&self, request: &DescribeRequest) -> Result<Description, DescribeError>;

    /// Per-request timeout for this backend.
    fn timeout(&self) -> Duration;
}
