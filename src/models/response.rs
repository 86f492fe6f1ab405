//! JSON bodies returned to API clients.
//!
//! Business outcomes are always HTTP 200; `success` tells the client whether
//! the request did what it asked.

use super::request::IngestMode;
use serde::{Deserialize, Serialize};

/// Body of `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub model: String,
    pub prompt: String,
    /// `None` when the request was rejected before ingestion finished.
    pub mode: Option<IngestMode>,
    pub texts: Vec<String>,
    pub image_urls: Vec<String>,
}

/// Body of `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub image_url: Option<String>,
    pub filename: Option<String>,
}

impl UploadResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            image_url: None,
            filename: None,
        }
    }
}
