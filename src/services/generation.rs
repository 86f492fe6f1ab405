//! Generation backend client and post-processing of its output.
//!
//! The backend is a trait object on `AppState`, so handlers and tests never
//! depend on a concrete HTTP client.

use crate::{
    models::{asset::StoredAsset, request::IngestedRequest},
    services::{
        image_service::ImageValidator,
        normalizer::ProcessingError,
        storage_service::AssetStore,
    },
};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum GenerationBackendError {
    #[error("GOOGLE_API_KEY not set in environment")]
    NotConfigured,
    #[error("request to generation backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation backend returned no candidates")]
    EmptyResponse,
    #[error("generation backend returned an undecodable payload: {0}")]
    BadPayload(String),
}

/// Image passed inline to the backend alongside the prompt.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Bytes,
}

/// Raw backend output, before generated images are stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOutput {
    pub texts: Vec<String>,
    pub images: Vec<Bytes>,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: Option<InlineImage>,
    ) -> Result<GenerationOutput, GenerationBackendError>;
}

/// Stand-in used when no API key is configured. Every call fails.
#[derive(Debug, Default)]
pub struct UnconfiguredBackend;

#[async_trait]
impl GenerationBackend for UnconfiguredBackend {
    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _image: Option<InlineImage>,
    ) -> Result<GenerationOutput, GenerationBackendError> {
        Err(GenerationBackendError::NotConfigured)
    }
}

/// `generateContent` client for the Gemini REST API.
pub struct GeminiBackend {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GeminiBackend {
    /// Build a client with the request timeout applied.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, GenerationBackendError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: Option<InlineImage>,
    ) -> Result<GenerationOutput, GenerationBackendError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, model);

        let mut parts = vec![json!({ "text": prompt })];
        if let Some(image) = &image {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(&image.data),
                }
            }));
        }
        let request_body = json!({ "contents": [{ "parts": parts }] });

        debug!(
            model,
            multimodal = image.is_some(),
            "sending generateContent request"
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GenerationBackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| GenerationBackendError::BadPayload(err.to_string()))?;
        parse_response(payload)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<Blob>,
}

#[derive(Debug, Deserialize)]
struct Blob {
    data: String,
}

fn parse_response(
    payload: GenerateContentResponse,
) -> Result<GenerationOutput, GenerationBackendError> {
    let parts = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .ok_or(GenerationBackendError::EmptyResponse)?;

    let mut output = GenerationOutput::default();
    for part in parts {
        if let Some(text) = part.text {
            output.texts.push(text);
        }
        if let Some(blob) = part.inline_data {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(blob.data.as_bytes())
                .map_err(|err| GenerationBackendError::BadPayload(err.to_string()))?;
            output.images.push(Bytes::from(bytes));
        }
    }
    Ok(output)
}

/// Backend output after generated images have been stored.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    pub texts: Vec<String>,
    pub images: Vec<StoredAsset>,
}

#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("generation failed: {0}")]
    Backend(#[from] GenerationBackendError),
    #[error("failed to process generated output: {0}")]
    Output(#[from] ProcessingError),
}

/// Call the backend for an ingested request and store every returned image.
pub async fn run_generation(
    backend: &dyn GenerationBackend,
    validator: ImageValidator,
    store: &AssetStore,
    model: &str,
    request: &IngestedRequest,
) -> Result<GenerationOutcome, GenerationFailure> {
    let inline = request.attachment.as_ref().map(|attachment| InlineImage {
        mime_type: attachment.mime_type().to_string(),
        data: attachment.bytes.clone(),
    });

    let output = backend.generate(model, &request.prompt, inline).await?;

    let images = try_join_all(output.images.into_iter().map(|raw| async move {
        let image = tokio::task::spawn_blocking(move || validator.normalize_generated(&raw))
            .await
            .map_err(|err| ProcessingError::Worker(err.to_string()))??;
        Ok::<_, ProcessingError>(store.persist(&image).await?)
    }))
    .await?;

    info!(
        model,
        texts = output.texts.len(),
        images = images.len(),
        "generation finished"
    );

    Ok(GenerationOutcome {
        texts: output.texts,
        images,
    })
}
