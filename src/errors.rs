use crate::services::form_parser::FormError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Transport-level failure: the request never reached business logic.
///
/// Business outcomes are 200 responses with `success: false`; this type is
/// only for bodies that could not be read or parsed at all.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<FormError> for AppError {
    fn from(err: FormError) -> Self {
        let status = match &err {
            FormError::UnsupportedContentType(_) | FormError::MissingContentType => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            FormError::Multipart(inner) => inner.status(),
            FormError::MultipartRejected(inner) => inner.status(),
            FormError::UrlEncoded(inner) => inner.status(),
            FormError::Body(inner) => inner.status(),
            FormError::Recovery(_) => StatusCode::BAD_REQUEST,
        };
        AppError::new(status, err.to_string())
    }
}
