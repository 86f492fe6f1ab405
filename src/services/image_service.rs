//! Image decoding, validation and canonical re-encoding.
//!
//! Everything here is pure CPU work over in-memory bytes. Callers on the async
//! runtime should run it through `tokio::task::spawn_blocking`.

use crate::models::{
    asset::{CanonicalExtension, ValidatedImage},
    field::FilePart,
};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

/// Default upper bound for an attachment, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted for attachments.
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const PNG_COLOR_TYPE_OFFSET: usize = 25;
const PNG_COLOR_TYPE_INDEXED: u8 = 3;

/// Why an attachment was rejected.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("empty file body")]
    EmptyBody,
    #[error("file too large ({size} bytes); maximum size is {limit_mb}MB", limit_mb = .limit / (1024 * 1024))]
    TooLarge { size: u64, limit: usize },
    #[error("invalid file type `{0}`; allowed types: {allowed}", allowed = ALLOWED_CONTENT_TYPES.join(", "))]
    UnsupportedType(String),
    #[error("invalid image file: {0}")]
    Corrupt(String),
}

/// Validates attachments against a size limit and re-encodes them.
#[derive(Debug, Clone, Copy)]
pub struct ImageValidator {
    max_bytes: usize,
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl ImageValidator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Validate an uploaded file part and produce its canonical form.
    ///
    /// Checks run cheapest first: declared size, actual size, declared
    /// content type, then a full decode.
    pub fn decode_and_validate(&self, part: &FilePart) -> Result<ValidatedImage, AttachmentError> {
        if let Some(declared) = part.declared_size {
            self.ensure_within_limit(declared)?;
        }
        self.ensure_within_limit(part.bytes.len() as u64)?;

        if let Some(content_type) = part.content_type.as_deref() {
            let normalized = normalize_mime_type(content_type);
            if !ALLOWED_CONTENT_TYPES.contains(&normalized.as_str()) {
                return Err(AttachmentError::UnsupportedType(normalized));
            }
        }

        let extension = CanonicalExtension::from_file_name(&part.file_name);
        self.canonicalize(&part.bytes, extension)
    }

    /// Canonicalize an image produced by the generation backend.
    ///
    /// Generated images are always stored as PNG.
    pub fn normalize_generated(&self, bytes: &[u8]) -> Result<ValidatedImage, AttachmentError> {
        if bytes.is_empty() {
            return Err(AttachmentError::EmptyBody);
        }
        self.canonicalize(bytes, CanonicalExtension::Png)
    }

    fn ensure_within_limit(&self, size: u64) -> Result<(), AttachmentError> {
        if size > self.max_bytes as u64 {
            return Err(AttachmentError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    fn canonicalize(
        &self,
        bytes: &[u8],
        extension: CanonicalExtension,
    ) -> Result<ValidatedImage, AttachmentError> {
        let decoded = decode(bytes)?;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(AttachmentError::Corrupt(
                "image has zero width or height".into(),
            ));
        }

        // Alpha and palette images stay RGBA, everything else becomes RGB.
        let keep_alpha = decoded.color().has_alpha() || is_palette_image(bytes);
        let pixels = if keep_alpha {
            DynamicImage::ImageRgba8(decoded.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(decoded.to_rgb8())
        };

        let canonical_bytes = encode(pixels, extension)?;
        self.ensure_within_limit(canonical_bytes.len() as u64)?;

        Ok(ValidatedImage {
            canonical_bytes: Bytes::from(canonical_bytes),
            canonical_extension: extension,
            width,
            height,
        })
    }
}

/// Strip MIME parameters and lowercase (`image/PNG; q=1` -> `image/png`).
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, AttachmentError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| AttachmentError::Corrupt(err.to_string()))?;
    if reader.format().is_none() {
        return Err(AttachmentError::Corrupt("unrecognized image format".into()));
    }
    reader
        .decode()
        .map_err(|err| AttachmentError::Corrupt(err.to_string()))
}

fn encode(pixels: DynamicImage, extension: CanonicalExtension) -> Result<Vec<u8>, AttachmentError> {
    let format = extension.image_format();
    // JPEG has no alpha channel.
    let pixels = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(pixels.to_rgb8()),
        _ => pixels,
    };

    let mut out = Cursor::new(Vec::new());
    pixels
        .write_to(&mut out, format)
        .map_err(|err| AttachmentError::Corrupt(format!("could not re-encode image: {}", err)))?;
    Ok(out.into_inner())
}

/// Palette-based sources: indexed PNGs (IHDR color type 3) and GIFs.
fn is_palette_image(bytes: &[u8]) -> bool {
    if bytes.starts_with(b"GIF8") {
        return true;
    }
    bytes.starts_with(PNG_SIGNATURE)
        && bytes.get(PNG_COLOR_TYPE_OFFSET) == Some(&PNG_COLOR_TYPE_INDEXED)
}
