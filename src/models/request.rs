//! The canonical request handed to generation.

use super::asset::{CanonicalExtension, StoredAsset};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Whether a request carries an image next to its prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    TextOnly,
    Multimodal,
}

impl IngestMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TextOnly => "text-only",
            Self::Multimodal => "multimodal",
        }
    }
}

/// An attachment that has been validated and persisted.
///
/// Keeps the canonical bytes around so they can be forwarded to the
/// generation backend without reading the file back.
#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub asset: StoredAsset,
    pub extension: CanonicalExtension,
    pub width: u32,
    pub height: u32,
    pub bytes: Bytes,
}

impl StoredAttachment {
    pub fn mime_type(&self) -> &'static str {
        self.extension.mime_type()
    }
}

/// Output of request normalization.
#[derive(Debug, Clone)]
pub struct IngestedRequest {
    /// Trimmed, never empty.
    pub prompt: String,
    pub model_override: Option<String>,
    pub attachment: Option<StoredAttachment>,
}

impl IngestedRequest {
    /// Mode is a property of the request, fixed before any backend call.
    pub fn mode(&self) -> IngestMode {
        if self.attachment.is_some() {
            IngestMode::Multimodal
        } else {
            IngestMode::TextOnly
        }
    }

    pub fn model_or<'a>(&'a self, default_model: &'a str) -> &'a str {
        self.model_override.as_deref().unwrap_or(default_model)
    }
}
