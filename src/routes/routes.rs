//! Defines routes for the image generation gateway.
//!
//! ## Structure
//! - **Ingestion endpoints**
//!   - `POST /generate` -> prompt + optional image, runs generation
//!   - `POST /upload`   -> store a single image
//!
//! - **Static assets**
//!   - `GET /static/{filename}` -> files from the storage directory
//!
//! - **Service endpoints**
//!   - `GET /`, `GET /health`, `GET /readyz`

use crate::{
    config::AppConfig,
    handlers::{
        generate_handlers::generate,
        health_handlers::{health, index, readyz},
        upload_handlers::upload,
    },
    services::assembler::STATIC_PREFIX,
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Build the router for all gateway routes.
///
/// The body limit covers the whole request, so it must leave room above
/// the attachment limit for the oversize check to report `TooLarge`.
pub fn routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/generate", post(generate))
        .route("/upload", post(upload))
        .nest_service(STATIC_PREFIX, ServeDir::new(&config.storage_dir))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
}

fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
