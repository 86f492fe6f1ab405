#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imagegen_gateway::{
    config::{AppConfig, Args},
    services::generation::{
        GenerationBackend, GenerationBackendError, GenerationOutput, InlineImage,
    },
    state::AppState,
};
use serde_json::Value;
use std::{
    io::Cursor,
    path::Path,
    sync::{Arc, Mutex},
};
use tempfile::TempDir;

pub const BOUNDARY: &str = "----imagegen-test-boundary";

/// One recorded backend call.
#[derive(Debug, Clone)]
pub struct BackendCall {
    pub model: String,
    pub prompt: String,
    pub image_mime: Option<String>,
}

/// In-memory backend that records calls and replays a fixed result.
pub struct MockBackend {
    pub calls: Mutex<Vec<BackendCall>>,
    result: Mutex<Option<Result<GenerationOutput, String>>>,
}

impl MockBackend {
    pub fn replying(output: GenerationOutput) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            result: Mutex::new(Some(Ok(output))),
        })
    }

    pub fn failing(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            result: Mutex::new(Some(Err(format!("{}:{}", status, body)))),
        })
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: Option<InlineImage>,
    ) -> Result<GenerationOutput, GenerationBackendError> {
        self.calls.lock().unwrap().push(BackendCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
            image_mime: image.map(|image| image.mime_type),
        });

        match self.result.lock().unwrap().clone() {
            Some(Ok(output)) => Ok(output),
            Some(Err(raw)) => {
                let (status, body) = raw.split_once(':').unwrap_or(("500", ""));
                Err(GenerationBackendError::Status {
                    status: status.parse().unwrap_or(500),
                    body: body.to_string(),
                })
            }
            None => Ok(GenerationOutput::default()),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub dir: TempDir,
    pub backend: Arc<MockBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_backend(MockBackend::replying(GenerationOutput {
            texts: vec!["generated".into()],
            images: Vec::new(),
        }))
    }

    pub fn with_backend(backend: Arc<MockBackend>) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::resolve(Args::default(), |_| None).unwrap();
        config.storage_dir = dir.path().to_path_buf();
        config.public_base_url = Some("http://test.local".into());

        let state = AppState::new(config, backend.clone());
        Self {
            router: imagegen_gateway::app(state),
            dir,
            backend,
        }
    }

    /// Stored asset names, excluding anything hidden.
    pub fn stored_files(&self) -> Vec<String> {
        list_files(self.dir.path())
    }
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// A part of a hand-built multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    raw_request(
        uri,
        &format!("multipart/form-data; boundary={}", BOUNDARY),
        multipart_body(parts),
    )
}

pub fn raw_request(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([200, 40, 40, 255]),
    ));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
