//! Turns an inbound request body into a map of [`RawField`]s.
//!
//! Parsing is two-phase. The `Content-Type` header is inspected first:
//! a well-formed `multipart/form-data` header goes to axum's strict parser,
//! `application/x-www-form-urlencoded` goes to the form decoder, and a
//! multipart header *without* a boundary goes straight to the recovery
//! parser in [`fallback_parser`](super::fallback_parser). Nothing else is
//! retried.

use crate::{
    models::field::{FilePart, RawField},
    services::{
        classifier::{self, AttachmentState},
        fallback_parser::{self, ParseError},
    },
};
use axum::{
    body::Bytes,
    extract::{
        Form, FromRequest, Multipart, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::{BytesRejection, FormRejection},
    },
    http::{HeaderMap, header},
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// How the body of a request is encoded, judged from its headers alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyEncoding {
    Multipart { boundary: String },
    MultipartWithoutBoundary,
    UrlEncoded,
    Unsupported(Option<String>),
}

/// Which parser produced a [`FormFields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOrigin {
    Strict,
    Recovered,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("unsupported content type `{0}`; expected multipart/form-data")]
    UnsupportedContentType(String),
    #[error("missing Content-Type header; expected multipart/form-data")]
    MissingContentType,
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("malformed multipart body: {0}")]
    MultipartRejected(#[from] MultipartRejection),
    #[error("malformed form body: {0}")]
    UrlEncoded(#[from] FormRejection),
    #[error("could not read request body: {0}")]
    Body(#[from] BytesRejection),
    #[error("malformed multipart body: {0}")]
    Recovery(#[from] ParseError),
}

/// Named fields of one request, tagged with the parser that produced them.
#[derive(Debug)]
pub struct FormFields {
    origin: FormOrigin,
    fields: HashMap<String, RawField>,
}

impl FormFields {
    pub fn new(origin: FormOrigin, fields: impl IntoIterator<Item = RawField>) -> Self {
        Self {
            origin,
            fields: fields
                .into_iter()
                .map(|field| (field.name.clone(), field))
                .collect(),
        }
    }

    pub fn origin(&self) -> FormOrigin {
        self.origin
    }

    pub fn get(&self, name: &str) -> Option<&RawField> {
        self.fields.get(name)
    }

    /// Remove and return a field.
    pub fn take(&mut self, name: &str) -> Option<RawField> {
        self.fields.remove(name)
    }

    /// Remove the attachment field and classify it.
    ///
    /// Recovered forms never carry an attachment, whatever the part held.
    pub fn take_attachment(&mut self, name: &str) -> AttachmentState {
        let field = self.fields.remove(name);
        match self.origin {
            FormOrigin::Strict => classifier::classify(field),
            FormOrigin::Recovered => {
                if field.is_some() {
                    debug!(field = name, "ignoring attachment on boundary-less request");
                }
                AttachmentState::Absent
            }
        }
    }
}

/// Classify the body encoding from the `Content-Type` header.
pub fn detect_encoding(headers: &HeaderMap) -> BodyEncoding {
    let Some(raw) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return BodyEncoding::Unsupported(None);
    };

    let mut params = raw.split(';');
    let essence = params.next().unwrap_or_default().trim().to_ascii_lowercase();

    match essence.as_str() {
        "multipart/form-data" => {
            let boundary = params.find_map(|param| {
                let (key, value) = param.split_once('=')?;
                if !key.trim().eq_ignore_ascii_case("boundary") {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                (!value.is_empty()).then(|| value.to_string())
            });
            match boundary {
                Some(boundary) => BodyEncoding::Multipart { boundary },
                None => BodyEncoding::MultipartWithoutBoundary,
            }
        }
        "application/x-www-form-urlencoded" => BodyEncoding::UrlEncoded,
        _ => BodyEncoding::Unsupported(Some(raw.to_string())),
    }
}

/// Parse a request body into form fields.
///
/// Every path buffers through an axum extractor, so all of them honor the
/// router's `DefaultBodyLimit`.
pub async fn parse_form(request: Request) -> Result<FormFields, FormError> {
    match detect_encoding(request.headers()) {
        BodyEncoding::Multipart { .. } => parse_strict_multipart(request).await,
        BodyEncoding::MultipartWithoutBoundary => recover_without_boundary(request).await,
        BodyEncoding::UrlEncoded => {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &()).await?;
            Ok(FormFields::new(
                FormOrigin::Strict,
                pairs
                    .into_iter()
                    .map(|(name, value)| RawField::text(name, value)),
            ))
        }
        BodyEncoding::Unsupported(Some(content_type)) => {
            Err(FormError::UnsupportedContentType(content_type))
        }
        BodyEncoding::Unsupported(None) => Err(FormError::MissingContentType),
    }
}

async fn parse_strict_multipart(request: Request) -> Result<FormFields, FormError> {
    let mut multipart = Multipart::from_request(request, &()).await?;
    let mut fields = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        let raw = match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let declared_size = field
                    .headers()
                    .get(header::CONTENT_LENGTH)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok());
                let bytes = field.bytes().await?;
                RawField::file(
                    name,
                    FilePart {
                        file_name,
                        content_type,
                        bytes,
                        declared_size,
                    },
                )
            }
            None => {
                let value = field.text().await?;
                RawField::text(name, value)
            }
        };

        debug!(field = %raw.name, kind = ?raw.kind(), "parsed form field");
        fields.push(raw);
    }

    Ok(FormFields::new(FormOrigin::Strict, fields))
}

async fn recover_without_boundary(request: Request) -> Result<FormFields, FormError> {
    let body = Bytes::from_request(request, &()).await?;
    let recovered = fallback_parser::recover(&body)?;

    warn!(
        fields = recovered.len(),
        "multipart request without boundary parameter; recovered text fields only"
    );

    // File parts carry no trustworthy value here; they read as absent.
    let fields = recovered.into_iter().filter_map(|(name, field)| {
        if field.was_file {
            debug!(field = %name, "dropping file part from boundary-less request");
            return None;
        }
        Some(RawField::text(name, field.value))
    });
    Ok(FormFields::new(FormOrigin::Recovered, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::FieldKind;
    use axum::{body::Body, http::HeaderValue};

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    fn request(content_type: &str, body: impl Into<Body>) -> Request {
        Request::builder()
            .method("POST")
            .uri("/generate")
            .header(header::CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    #[test]
    fn detects_each_body_encoding() {
        assert_eq!(
            detect_encoding(&headers("multipart/form-data; boundary=abc")),
            BodyEncoding::Multipart { boundary: "abc".into() }
        );
        assert_eq!(
            detect_encoding(&headers("Multipart/Form-Data; charset=utf-8; BOUNDARY=\"q\"")),
            BodyEncoding::Multipart { boundary: "q".into() }
        );
        assert_eq!(
            detect_encoding(&headers("multipart/form-data")),
            BodyEncoding::MultipartWithoutBoundary
        );
        assert_eq!(
            detect_encoding(&headers("multipart/form-data; boundary=")),
            BodyEncoding::MultipartWithoutBoundary
        );
        assert_eq!(
            detect_encoding(&headers("application/x-www-form-urlencoded")),
            BodyEncoding::UrlEncoded
        );
        assert_eq!(
            detect_encoding(&headers("application/json")),
            BodyEncoding::Unsupported(Some("application/json".into()))
        );
        assert_eq!(detect_encoding(&HeaderMap::new()), BodyEncoding::Unsupported(None));
    }

    #[tokio::test]
    async fn strict_multipart_tags_text_and_file_parts() {
        let body = "--XX\r\n\
            Content-Disposition: form-data; name=\"prompt\"\r\n\r\n\
            hello\r\n\
            --XX\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n\
            \r\n\
            --XX--\r\n";

        let mut form = parse_form(request("multipart/form-data; boundary=XX", body))
            .await
            .unwrap();

        assert_eq!(form.origin(), FormOrigin::Strict);
        assert_eq!(form.get("prompt").and_then(RawField::as_text), Some("hello"));
        assert_ne!(form.get("prompt").map(RawField::kind), Some(FieldKind::File));
        assert!(form.take_attachment("image").is_absent());
    }

    #[tokio::test]
    async fn urlencoded_forms_are_text_only() {
        let mut form = parse_form(
            request("application/x-www-form-urlencoded", "prompt=hi+there&image="),
        )
        .await
        .unwrap();

        assert_eq!(form.take("prompt").unwrap().as_text(), Some("hi there"));
        assert!(form.take_attachment("image").is_absent());
    }

    #[tokio::test]
    async fn boundary_less_body_is_recovered_without_attachment() {
        let body = "--tok\r\n\
            Content-Disposition: form-data; name=\"prompt\"\r\n\r\n\
            draw a cat\r\n\
            --tok\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"cat.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            PNGDATA\r\n\
            --tok--\r\n";

        let mut form = parse_form(request("multipart/form-data", body))
            .await
            .unwrap();

        assert_eq!(form.origin(), FormOrigin::Recovered);
        assert_eq!(form.take("prompt").unwrap().as_text(), Some("draw a cat"));
        assert!(form.take_attachment("image").is_absent());
    }

    #[tokio::test]
    async fn boundary_less_file_parts_read_as_absent() {
        let body = "--tok\r\n\
            Content-Disposition: form-data; name=\"prompt\"; filename=\"p.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            from a file\r\n\
            --tok\r\n\
            Content-Disposition: form-data; name=\"model\"\r\n\r\n\
            m1\r\n\
            --tok--\r\n";

        let mut form = parse_form(request("multipart/form-data", body))
            .await
            .unwrap();

        assert!(form.get("prompt").is_none());
        assert_eq!(form.take("model").unwrap().as_text(), Some("m1"));
    }

    #[tokio::test]
    async fn boundary_less_body_without_marker_fails() {
        let err = parse_form(request("multipart/form-data", "prompt=hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::Recovery(ParseError::NoBoundaryMarker)));
    }

    #[tokio::test]
    async fn other_content_types_are_refused() {
        let err = parse_form(request("application/json", "{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::UnsupportedContentType(_)));
    }
}
