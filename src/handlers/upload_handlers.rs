//! `POST /upload`: store a single image and return its URL.

use super::{IMAGE_FIELD, asset_urls};
use crate::{
    errors::AppError,
    models::response::UploadResponse,
    services::{assembler, form_parser, normalizer::RequestNormalizer},
    state::AppState,
};
use axum::{
    Json,
    extract::{Request, State},
};
use tracing::{info, warn};

const NO_IMAGE: &str = "No valid image file provided";

#[tracing::instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<UploadResponse>, AppError> {
    let urls = asset_urls(&state.config, request.headers());
    let mut form = form_parser::parse_form(request).await?;

    let attachment = form.take_attachment(IMAGE_FIELD);
    if attachment.is_absent() {
        info!(origin = ?form.origin(), "upload without attachment");
        return Ok(Json(UploadResponse::failed(NO_IMAGE)));
    }

    let normalizer = RequestNormalizer::new(state.validator, &state.store);
    let body = match normalizer.ingest_attachment(attachment).await {
        Ok(Some(stored)) => assembler::uploaded(&stored.asset, &urls),
        Ok(None) => UploadResponse::failed(NO_IMAGE),
        Err(err) => {
            warn!(error = %err, "upload rejected");
            UploadResponse::failed(err.to_string())
        }
    };
    Ok(Json(body))
}
