//! Splices generated descriptions back into the document.
//!
//! For every successful description, the picture gains a provenance-tagged
//! annotation and the text is made visible in exports through the picture's
//! caption: appended to the existing caption item when one is linked, or as
//! a newly created caption item otherwise.

use super::{Document, DescriptionAnnotation, RefItem, CAPTION_LABEL};
use crate::describe::DescribeOutcome;
use serde::{Deserialize, Serialize};

/// Prefix prepended to description text when it lands in a caption.
pub const CAPTION_PREFIX: &str = "Image Description: ";

/// Counters for one annotate pass over a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotateStats {
    /// Pictures that received a description
    pub described: usize,

    /// Pictures whose description request failed
    pub failed: usize,

    /// Pictures skipped (no usable embedded image, or batching disabled)
    pub skipped: usize,
}

/// Flat per-picture record of a generated description, for JSONL export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionRecord {
    /// Reference path of the described picture
    pub picture_ref: String,

    /// The generated description text
    pub text: String,

    /// Which system produced the text
    pub provenance: String,

    /// Model identifier that generated the text
    pub model: String,

    /// Round-trip latency in milliseconds
    pub latency_ms: u64,

    /// Tokens used (input + output), if reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

/// Apply a batch of description outcomes to their pictures, in place.
///
/// Each pair carries the index of the picture the outcome was generated for.
/// Failed outcomes are logged and counted but leave the picture untouched.
pub fn annotate_pictures(
    doc: &mut Document,
    outcomes: Vec<(usize, DescribeOutcome)>,
    provenance: &str,
) -> (AnnotateStats, Vec<DescriptionRecord>) {
    let mut stats = AnnotateStats::default();
    let mut records = Vec::new();

    for (index, outcome) in outcomes {
        let picture_ref = doc.pictures[index].self_ref.clone();
        let description = match outcome {
            DescribeOutcome::Described(description) => description,
            DescribeOutcome::Failed(message) => {
                tracing::warn!("Description failed for {picture_ref}: {message}");
                stats.failed += 1;
                continue;
            }
        };

        doc.pictures[index]
            .annotations
            .push(DescriptionAnnotation::new(&description.text, provenance));
        attach_caption(doc, index, &description.text);

        records.push(DescriptionRecord {
            picture_ref,
            text: description.text,
            provenance: provenance.to_string(),
            model: description.model,
            latency_ms: description.latency_ms,
            tokens_used: description.tokens_used,
        });
        stats.described += 1;
    }

    (stats, records)
}

/// Make the description visible in exports via the picture's caption.
fn attach_caption(doc: &mut Document, index: usize, text: &str) {
    if let Some(caption_ref) = doc.pictures[index].captions.first().cloned() {
        // Append to the existing caption item
        match doc.resolve_text_mut(&caption_ref) {
            Some(caption) => {
                caption.text.push_str("\n\n");
                caption.text.push_str(CAPTION_PREFIX);
                caption.text.push_str(text);
            }
            None => {
                tracing::warn!(
                    "Caption reference {} on {} does not resolve; leaving caption unchanged",
                    caption_ref.cref,
                    doc.pictures[index].self_ref
                );
            }
        }
    } else {
        // Create a new caption under the picture's parent, or the body when
        // the parent reference does not resolve to a known item.
        let parent = doc.pictures[index]
            .parent
            .clone()
            .filter(|p| doc.has_item(&p.cref))
            .unwrap_or_else(|| doc.body.clone());
        let caption_ref: RefItem =
            doc.add_text(CAPTION_LABEL, format!("{CAPTION_PREFIX}{text}"), Some(parent));
        doc.pictures[index].captions.push(caption_ref);
    }
}
