//! Bedrock Captions - Picture descriptions for converted documents.
//!
//! Takes documents produced by a conversion pipeline, sends every embedded
//! picture to an AWS Bedrock vision-language model, and splices the
//! generated descriptions back into the document's caption and annotation
//! structures.
//!
//! # Architecture
//!
//! ```text
//! Document JSON → collect pictures → Bedrock (bounded fan-out) → annotate in place
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use bedrock_captions::{Captioner, Config, Document};
//!
//! #[tokio::main]
//! async fn main() -> bedrock_captions::Result<()> {
//!     let config = Config::load()?;
//!     let captioner = Captioner::new(config).await?;
//!
//!     let mut doc = Document::from_json_file("./report.json".as_ref())?;
//!     let report = captioner.annotate_document(&mut doc).await;
//!     println!("Described {} pictures", report.stats.described);
//!     doc.save_json("./report.annotated.json".as_ref(), true)?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod describe;
pub mod document;
pub mod error;
pub mod logging;
pub mod output;

// Re-exports for convenient access
pub use config::Config;
pub use describe::{
    BatchOptions, BedrockVision, DescribeOutcome, DescribeRequest, Describer, Description,
    ImagePayload, VisionModel,
};
pub use document::{
    annotate_pictures, AnnotateStats, DescriptionRecord, Document, ImageRef, PictureItem, RefItem,
    TextItem,
};
pub use error::{CaptionError, ConfigError, DescribeError, DescribeResult, DocumentError, Result};
pub use output::{OutputFormat, OutputWriter};

use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result of one annotate pass: counters plus the per-picture records.
#[derive(Debug, Default)]
pub struct AnnotateReport {
    /// Counts for the pass
    pub stats: AnnotateStats,

    /// One record per successfully described picture, for export
    pub records: Vec<DescriptionRecord>,
}

/// The main entry point: describes document pictures and annotates them
/// in place.
pub struct Captioner {
    config: Config,
    describer: Describer,
}

impl Captioner {
    /// Create a captioner backed by AWS Bedrock.
    pub async fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing bedrock-captions v{VERSION}");
        let model = BedrockVision::from_config(&config).await;
        Ok(Self::with_model(config, Arc::new(model)))
    }

    /// Create a captioner with a custom vision backend.
    pub fn with_model(config: Config, model: Arc<dyn VisionModel>) -> Self {
        let options = BatchOptions::from_config(&config);
        Self {
            config,
            describer: Describer::new(model, options),
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Describe every picture with a usable embedded image and splice the
    /// results into the document.
    ///
    /// Pictures without an embedded image (or with one that cannot be
    /// decoded) are skipped. When `[batch].enabled` is false the document
    /// passes through untouched.
    pub async fn annotate_document(&self, doc: &mut Document) -> AnnotateReport {
        if !self.config.batch.enabled {
            tracing::warn!(
                "Remote description batching is disabled; skipping {} pictures",
                doc.pictures.len()
            );
            return AnnotateReport {
                stats: AnnotateStats {
                    skipped: doc.pictures.len(),
                    ..Default::default()
                },
                records: Vec::new(),
            };
        }

        let mut skipped = 0usize;
        let mut indices = Vec::new();
        let mut requests = Vec::new();

        for (index, picture) in doc.pictures.iter().enumerate() {
            let Some(image) = &picture.image else {
                tracing::debug!("{} has no embedded image; skipping", picture.self_ref);
                skipped += 1;
                continue;
            };
            let payload = image
                .decode()
                .map_err(|e| e.to_string())
                .and_then(|(bytes, media_type)| {
                    ImagePayload::from_bytes(&bytes, &media_type).map_err(|e| e.to_string())
                });
            match payload {
                Ok(payload) => {
                    indices.push(index);
                    requests.push(DescribeRequest::new(payload, &self.config.inference));
                }
                Err(message) => {
                    tracing::warn!("Unusable image on {}: {message}", picture.self_ref);
                    skipped += 1;
                }
            }
        }

        if requests.is_empty() {
            tracing::info!("No pictures with embedded images to describe in '{}'", doc.name);
            return AnnotateReport {
                stats: AnnotateStats {
                    skipped,
                    ..Default::default()
                },
                records: Vec::new(),
            };
        }

        tracing::info!(
            "Submitting {} of {} pictures in '{}' for description",
            requests.len(),
            doc.pictures.len(),
            doc.name
        );
        let outcomes = self.describer.describe_batch(requests).await;
        let pairs: Vec<(usize, DescribeOutcome)> = indices.into_iter().zip(outcomes).collect();

        let provenance = self.describer.model().provenance().to_string();
        let (mut stats, records) = annotate_pictures(doc, pairs, &provenance);
        stats.skipped += skipped;

        tracing::info!(
            "Annotated '{}': {} described, {} failed, {} skipped",
            doc.name,
            stats.described,
            stats.failed,
            stats.skipped
        );
        AnnotateReport { stats, records }
    }
}
