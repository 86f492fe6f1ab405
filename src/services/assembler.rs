//! Maps ingestion and generation outcomes to the outward JSON bodies.

use crate::{
    models::{
        asset::StoredAsset,
        request::IngestedRequest,
        response::{GenerateResponse, UploadResponse},
    },
    services::{
        generation::{GenerationFailure, GenerationOutcome},
        normalizer::RequestError,
    },
};

/// Prefix under which the store directory is served.
pub const STATIC_PREFIX: &str = "/static";

/// Builds absolute URLs for stored assets.
#[derive(Debug, Clone)]
pub struct AssetUrls {
    base: String,
}

impl AssetUrls {
    /// `base` is scheme and authority, e.g. `http://localhost:8000`.
    pub fn new(base: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, asset: &StoredAsset) -> String {
        format!("{}{}/{}", self.base, STATIC_PREFIX, asset.relative_path)
    }
}

/// Build the `/generate` body for a request that was ingested.
///
/// The mode comes from the ingested request, so a failed generation still
/// reports whether an image was attached.
pub fn assemble(
    request: &IngestedRequest,
    model: &str,
    outcome: Result<GenerationOutcome, GenerationFailure>,
    urls: &AssetUrls,
) -> GenerateResponse {
    let mode = request.mode();
    let (success, message, texts, image_urls) = match outcome {
        Ok(outcome) => (
            true,
            format!("{} generation succeeded", mode.label()),
            outcome.texts,
            outcome.images.iter().map(|asset| urls.url_for(asset)).collect(),
        ),
        Err(failure) => (false, failure.to_string(), Vec::new(), Vec::new()),
    };

    GenerateResponse {
        success,
        message,
        model: model.to_string(),
        prompt: request.prompt.clone(),
        mode: Some(mode),
        texts,
        image_urls,
    }
}

/// Build the `/generate` body for a request rejected during ingestion.
pub fn reject(prompt: &str, model: &str, error: &RequestError) -> GenerateResponse {
    GenerateResponse {
        success: false,
        message: error.to_string(),
        model: model.to_string(),
        prompt: prompt.to_string(),
        mode: None,
        texts: Vec::new(),
        image_urls: Vec::new(),
    }
}

/// Build the `/upload` body for a stored attachment.
pub fn uploaded(asset: &StoredAsset, urls: &AssetUrls) -> UploadResponse {
    UploadResponse {
        success: true,
        message: "image uploaded".to_string(),
        image_url: Some(urls.url_for(asset)),
        filename: Some(asset.relative_path.clone()),
    }
}
