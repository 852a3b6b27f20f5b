//! In-memory model of the converted document's node structures.
//!
//! The crate does not parse source documents. It operates on the JSON dump
//! produced by the host conversion pipeline: text items, picture items with
//! embedded page images, and the references that link captions to pictures.
//! Annotated documents serialize back to the same shape.

mod annotate;

pub use annotate::{annotate_pictures, AnnotateStats, DescriptionRecord, CAPTION_PREFIX};

use crate::error::DocumentError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Annotation kind recorded on generated descriptions.
pub const DESCRIPTION_KIND: &str = "description";

/// Item label used for caption text items.
pub const CAPTION_LABEL: &str = "caption";

/// Reference to another document item by its `self_ref` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefItem {
    /// Target path, e.g. `#/texts/4`
    #[serde(rename = "$ref")]
    pub cref: String,
}

impl RefItem {
    pub fn new(cref: impl Into<String>) -> Self {
        Self { cref: cref.into() }
    }
}

/// A block of text in the document body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextItem {
    /// This item's own reference path, e.g. `#/texts/4`
    pub self_ref: String,

    /// Item label ("paragraph", "caption", "section_header", ...)
    pub label: String,

    /// The text content
    pub text: String,

    /// Parent item, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<RefItem>,
}

/// A grouping node (list, section, inline container).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupItem {
    /// This item's own reference path, e.g. `#/groups/2`
    pub self_ref: String,

    /// Group label ("list", "section", ...)
    #[serde(default)]
    pub label: String,
}

/// An embedded image carried by a picture item.
///
/// The host pipeline embeds page images as base64 data URIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    /// MIME type as recorded by the converter
    pub mime_type: String,

    /// `data:<mime>;base64,<payload>` URI
    pub uri: String,
}

impl ImageRef {
    /// Build an image reference from raw encoded bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            mime_type: mime_type.to_string(),
            uri: format!("data:{mime_type};base64,{payload}"),
        }
    }

    /// Decode the embedded payload.
    ///
    /// Returns the raw image bytes and the media type taken from the URI
    /// (falling back to `mime_type` when the URI omits one). Non-data URIs
    /// are rejected; fetching external images is the host's job.
    pub fn decode(&self) -> Result<(Vec<u8>, String), DocumentError> {
        let rest = self.uri.strip_prefix("data:").ok_or(DocumentError::NotDataUri)?;
        let (header, payload) = rest.split_once(";base64,").ok_or(DocumentError::NotDataUri)?;
        let media_type = if header.is_empty() {
            self.mime_type.clone()
        } else {
            header.to_string()
        };
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
        Ok((bytes, media_type))
    }
}

/// A generated description attached to a picture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionAnnotation {
    /// Annotation kind; always `description` for items produced here
    pub kind: String,

    /// The generated description text
    pub text: String,

    /// Which system produced the text
    pub provenance: String,
}

impl DescriptionAnnotation {
    pub fn new(text: impl Into<String>, provenance: impl Into<String>) -> Self {
        Self {
            kind: DESCRIPTION_KIND.to_string(),
            text: text.into(),
            provenance: provenance.into(),
        }
    }
}

/// A picture embedded in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PictureItem {
    /// This item's own reference path, e.g. `#/pictures/0`
    pub self_ref: String,

    /// Parent item, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<RefItem>,

    /// References to caption text items
    #[serde(default)]
    pub captions: Vec<RefItem>,

    /// Attached annotations (generated descriptions land here)
    #[serde(default)]
    pub annotations: Vec<DescriptionAnnotation>,

    /// The embedded image, when the converter exported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

fn default_body() -> RefItem {
    RefItem::new("#/body")
}

/// The converted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document name (usually the source file stem)
    #[serde(default)]
    pub name: String,

    /// All text items, indexed by their `self_ref` suffix
    #[serde(default)]
    pub texts: Vec<TextItem>,

    /// All picture items
    #[serde(default)]
    pub pictures: Vec<PictureItem>,

    /// Grouping nodes
    #[serde(default)]
    pub groups: Vec<GroupItem>,

    /// The document body reference, the fallback parent for new items
    #[serde(default = "default_body")]
    pub body: RefItem,
}

impl Document {
    /// Parse a document from its JSON dump.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a document from a JSON file on disk.
    pub fn from_json_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&content)?)
    }

    /// Serialize the document back to JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Write the document to a JSON file on disk.
    pub fn save_json(&self, path: &Path, pretty: bool) -> crate::error::Result<()> {
        std::fs::write(path, self.to_json(pretty)?)?;
        Ok(())
    }

    /// Resolve a reference to a text item.
    pub fn resolve_text(&self, r: &RefItem) -> Option<&TextItem> {
        self.texts.iter().find(|t| t.self_ref == r.cref)
    }

    /// Resolve a reference to a text item, mutably.
    pub fn resolve_text_mut(&mut self, r: &RefItem) -> Option<&mut TextItem> {
        self.texts.iter_mut().find(|t| t.self_ref == r.cref)
    }

    /// Whether a reference resolves to a known item (text, group, or body).
    pub fn has_item(&self, cref: &str) -> bool {
        cref == self.body.cref
            || self.texts.iter().any(|t| t.self_ref == cref)
            || self.groups.iter().any(|g| g.self_ref == cref)
    }

    /// Append a new text item and return a reference to it.
    pub fn add_text(
        &mut self,
        label: impl Into<String>,
        text: impl Into<String>,
        parent: Option<RefItem>,
    ) -> RefItem {
        let self_ref = format!("#/texts/{}", self.texts.len());
        self.texts.push(TextItem {
            self_ref: self_ref.clone(),
            label: label.into(),
            text: text.into(),
            parent,
        });
        RefItem::new(self_ref)
    }
}
