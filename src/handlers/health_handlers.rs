//! Liveness, readiness and service index.
//!
//! - GET /        -> endpoint listing
//! - GET /health  -> simple liveness ("ok")
//! - GET /readyz  -> readiness that checks disk I/O in the storage directory

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;

/// `GET /health`
///
/// Cheap liveness probe; never performs I/O.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Write/read/delete probe against the storage directory.
/// HTTP 200 when it passes, HTTP 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let disk = match state.store.probe().await {
        Ok(()) => CheckStatus {
            ok: true,
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, "readiness probe failed");
            CheckStatus {
                ok: false,
                error: Some(err.to_string()),
            }
        }
    };

    let ok = disk.ok;
    let mut checks = HashMap::new();
    checks.insert("disk", disk);

    let body = ReadyResponse {
        status: if ok { "ok".into() } else { "error".into() },
        checks,
    };
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "default_model": state.config.default_model,
        "max_file_size": state.config.max_file_size,
        "endpoints": {
            "POST /generate": "multipart form: prompt (required), model (optional), image (optional file)",
            "POST /upload": "multipart form: image (required file)",
            "GET /static/{filename}": "stored images",
            "GET /health": "liveness",
            "GET /readyz": "readiness"
        }
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
