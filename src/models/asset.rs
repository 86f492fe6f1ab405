//! Validated images and the assets they become once written to disk.

use bytes::Bytes;
use serde::Serialize;
use std::{fmt, path::Path};

/// Extensions an accepted image may be persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CanonicalExtension {
    Png,
    Jpg,
    Jpeg,
    Webp,
    Gif,
}

impl CanonicalExtension {
    /// Derive the extension from a client filename.
    ///
    /// Unknown or missing extensions fall back to `.png`. Matching is
    /// case-insensitive and the result is always lowercase.
    pub fn from_file_name(file_name: &str) -> Self {
        let ext = Path::new(file_name.trim())
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("jpg") => Self::Jpg,
            Some("jpeg") => Self::Jpeg,
            Some("webp") => Self::Webp,
            Some("gif") => Self::Gif,
            _ => Self::Png,
        }
    }

    /// Extension including the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Jpg => ".jpg",
            Self::Jpeg => ".jpeg",
            Self::Webp => ".webp",
            Self::Gif => ".gif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpg | Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Webp => image::ImageFormat::WebP,
            Self::Gif => image::ImageFormat::Gif,
        }
    }
}

impl fmt::Display for CanonicalExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image that passed validation and was re-encoded into its canonical
/// pixel mode. Lives only until it is persisted.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub canonical_bytes: Bytes,
    pub canonical_extension: CanonicalExtension,
    pub width: u32,
    pub height: u32,
}

/// Reference to an image written into the asset directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    /// 128-bit random token, lowercase hex.
    pub id: String,

    /// Path relative to the asset directory (`{id}{ext}`).
    pub relative_path: String,
}
