//! Builds the canonical [`IngestedRequest`] from parsed form fields.

use crate::{
    models::{
        field::RawField,
        request::{IngestedRequest, StoredAttachment},
    },
    services::{
        classifier::AttachmentState,
        image_service::{AttachmentError, ImageValidator},
        storage_service::{AssetStore, StorageError},
    },
};
use thiserror::Error;
use tracing::{debug, info};

/// Failures while turning a valid image into a stored asset.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Image(#[from] AttachmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("image worker failed: {0}")]
    Worker(String),
}

/// Request-level rejection. Each variant is a distinct client-visible outcome.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("prompt is required")]
    MissingPrompt,
    #[error("invalid image attachment: {0}")]
    BadAttachment(#[source] AttachmentError),
    #[error("image attachment could not be processed: {0}")]
    AttachmentProcessingFailed(#[source] ProcessingError),
}

impl From<ProcessingError> for RequestError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Image(inner) => RequestError::BadAttachment(inner),
            other => RequestError::AttachmentProcessingFailed(other),
        }
    }
}

/// Orchestrates classification, validation and storage for one request.
pub struct RequestNormalizer<'a> {
    validator: ImageValidator,
    store: &'a AssetStore,
}

impl<'a> RequestNormalizer<'a> {
    pub fn new(validator: ImageValidator, store: &'a AssetStore) -> Self {
        Self { validator, store }
    }

    /// Produce an [`IngestedRequest`] or the reason it was rejected.
    ///
    /// The prompt is checked before any attachment work, so a rejected
    /// request never leaves a stored asset behind.
    pub async fn normalize(
        &self,
        prompt_field: Option<RawField>,
        model_field: Option<RawField>,
        attachment: AttachmentState,
    ) -> Result<IngestedRequest, RequestError> {
        let prompt = prompt_field
            .as_ref()
            .and_then(RawField::as_text)
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
            .ok_or(RequestError::MissingPrompt)?
            .to_string();

        let model_override = model_field
            .as_ref()
            .and_then(RawField::as_text)
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .map(str::to_string);

        let attachment = self.ingest_attachment(attachment).await?;

        Ok(IngestedRequest {
            prompt,
            model_override,
            attachment,
        })
    }

    /// Validate and store an attachment, if there is one.
    pub async fn ingest_attachment(
        &self,
        attachment: AttachmentState,
    ) -> Result<Option<StoredAttachment>, RequestError> {
        let part = match attachment {
            AttachmentState::Absent => return Ok(None),
            AttachmentState::Invalid(reason) => return Err(RequestError::BadAttachment(reason)),
            AttachmentState::Present(part) => part,
        };

        debug!(
            file_name = %part.file_name,
            bytes = part.bytes.len(),
            content_type = ?part.content_type,
            "validating attachment"
        );

        let validator = self.validator;
        let image = tokio::task::spawn_blocking(move || validator.decode_and_validate(&part))
            .await
            .map_err(|err| ProcessingError::Worker(err.to_string()))?
            .map_err(ProcessingError::Image)?;

        let asset = self
            .store
            .persist(&image)
            .await
            .map_err(ProcessingError::Storage)?;

        info!(
            asset_id = %asset.id,
            width = image.width,
            height = image.height,
            "stored attachment {}",
            asset.relative_path
        );

        Ok(Some(StoredAttachment {
            asset,
            extension: image.canonical_extension,
            width: image.width,
            height: image.height,
            bytes: image.canonical_bytes,
        }))
    }
}
