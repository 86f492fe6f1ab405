//! `POST /generate`: ingest a prompt with an optional image and run generation.

use super::{IMAGE_FIELD, MODEL_FIELD, PROMPT_FIELD, asset_urls};
use crate::{
    errors::AppError,
    models::{field::RawField, response::GenerateResponse},
    services::{
        assembler, form_parser, generation::run_generation, normalizer::RequestNormalizer,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Request, State},
};
use tracing::{info, warn};

#[tracing::instrument(skip_all, fields(mode = tracing::field::Empty, model = tracing::field::Empty))]
pub async fn generate(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<GenerateResponse>, AppError> {
    let urls = asset_urls(&state.config, request.headers());
    let mut form = form_parser::parse_form(request).await?;

    let prompt = form.take(PROMPT_FIELD);
    let model = form.take(MODEL_FIELD);
    let attachment = form.take_attachment(IMAGE_FIELD);

    let raw_prompt = prompt
        .as_ref()
        .and_then(RawField::as_text)
        .unwrap_or_default()
        .to_string();
    let requested_model = model
        .as_ref()
        .and_then(RawField::as_text)
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or(state.config.default_model.as_str())
        .to_string();

    let normalizer = RequestNormalizer::new(state.validator, &state.store);
    let ingested = match normalizer.normalize(prompt, model, attachment).await {
        Ok(ingested) => ingested,
        Err(err) => {
            warn!(error = %err, origin = ?form.origin(), "request rejected");
            return Ok(Json(assembler::reject(&raw_prompt, &requested_model, &err)));
        }
    };

    let model = ingested.model_or(&state.config.default_model);
    let span = tracing::Span::current();
    span.record("mode", ingested.mode().label());
    span.record("model", model);
    info!(prompt_len = ingested.prompt.len(), "request ingested");

    let outcome = run_generation(
        state.backend.as_ref(),
        state.validator,
        &state.store,
        model,
        &ingested,
    )
    .await;
    if let Err(err) = &outcome {
        warn!(error = %err, "generation failed");
    }

    Ok(Json(assembler::assemble(&ingested, model, outcome, &urls)))
}
