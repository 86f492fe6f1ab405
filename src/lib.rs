//! Image generation gateway.
//!
//! Accepts a prompt with an optional image over `multipart/form-data`,
//! normalizes the many ways clients say "no image", validates and stores
//! attachments, and forwards the canonical request to a generation backend.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use state::AppState;

/// Build the complete application router for `state`.
pub fn app(state: AppState) -> Router {
    routes::routes::routes(&state.config).with_state(state)
}
