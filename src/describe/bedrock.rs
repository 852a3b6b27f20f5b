//! AWS Bedrock vision backend.
//!
//! Invokes Anthropic Claude models through the Bedrock runtime using the
//! messages body format, with the image sent as a base64 content block.
//! SDK-internal retries are disabled; the batch engine owns the retry policy.

use super::model::{DescribeRequest, Description, VisionModel};
use crate::config::Config;
use crate::error::DescribeError;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Messages format revision Bedrock expects for Anthropic models.
const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Vision backend calling Anthropic models on the Bedrock runtime.
pub struct BedrockVision {
    client: Client,
    model_id: String,
    provenance: String,
    timeout: Duration,
}

impl BedrockVision {
    /// Build a Bedrock client from the crate configuration.
    ///
    /// Region and credentials profile fall back to the SDK default
    /// resolution chain when not configured.
    pub async fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.bedrock.timeout_secs);
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        if let Some(region) = &config.bedrock.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.bedrock.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        tracing::debug!(
            "Bedrock client ready: model={}, region={:?}",
            config.bedrock.model_id,
            sdk_config.region()
        );

        Self {
            client: Client::new(&sdk_config),
            model_id: config.bedrock.model_id.clone(),
            provenance: config.inference.provenance.clone(),
            timeout,
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct MessagesBody {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f32,
    top_k: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Serialize the invoke-model body for a request.
fn build_body(request: &DescribeRequest) -> Result<String, DescribeError> {
    let body = MessagesBody {
        anthropic_version: ANTHROPIC_VERSION,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        top_k: request.top_k,
        messages: vec![Message {
            role: "user".to_string(),
            content: vec![
                ContentBlock::Image {
                    source: ImageSource {
                        source_type: "base64".to_string(),
                        media_type: request.image.media_type.clone(),
                        data: request.image.data.clone(),
                    },
                },
                ContentBlock::Text {
                    text: request.prompt.clone(),
                },
            ],
        }],
    };
    serde_json::to_string(&body).map_err(|e| DescribeError::Api {
        message: format!("Failed to serialize request body: {e}"),
        code: None,
    })
}

/// Parse the invoke-model response body into a description.
fn parse_body(
    bytes: &[u8],
    fallback_model: &str,
    latency_ms: u64,
) -> Result<Description, DescribeError> {
    let response: MessagesResponse =
        serde_json::from_slice(bytes).map_err(|e| DescribeError::Api {
            message: format!("Failed to parse response body: {e}"),
            code: None,
        })?;

    let text = response
        .content
        .into_iter()
        .filter_map(|c| c.text)
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(DescribeError::EmptyResponse);
    }

    Ok(Description {
        text,
        model: response
            .model
            .unwrap_or_else(|| fallback_model.to_string()),
        tokens_used: response
            .usage
            .map(|u| u.input_tokens + u.output_tokens),
        latency_ms,
    })
}

/// Map an SDK error to a typed describe error, preserving the service
/// exception code for retry classification.
fn map_sdk_error(err: SdkError<InvokeModelError>) -> DescribeError {
    let code = ProvideErrorMetadata::code(&err).map(str::to_string);
    DescribeError::Api {
        message: format!("{}", DisplayErrorContext(&err)),
        code,
    }
}

#[async_trait]
impl VisionModel for BedrockVision {
    fn name(&self) -> &str {
        "bedrock"
    }

    fn provenance(&self) -> &str {
        &self.provenance
    }

    async fn describe(&self, request: &DescribeRequest) -> Result<Description, DescribeError> {
        let start = Instant::now();
        let body = build_body(request)?;

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body.into_bytes()))
            .send()
            .await
            .map_err(map_sdk_error)?;

        parse_body(
            output.body().as_ref(),
            &self.model_id,
            start.elapsed().as_millis() as u64,
        )
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
