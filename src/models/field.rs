//! Form fields as produced by the parsing boundary.
//!
//! Every part of an inbound form is turned into a [`RawField`] exactly once,
//! so downstream code decides "text or file" with a single `match` instead of
//! probing the value again.

use bytes::Bytes;

/// One named part of an inbound form.
#[derive(Debug, Clone)]
pub struct RawField {
    /// Form field name (`prompt`, `model`, `image`, ...).
    pub name: String,

    /// Decoded value of the part.
    pub value: FieldValue,
}

/// Payload of a form part. A part is a file exactly when its
/// `Content-Disposition` carried a `filename` parameter, even an empty one.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    File(FilePart),
}

/// A file part with everything the client declared about it.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Filename as sent by the client; may be empty or whitespace.
    pub file_name: String,

    /// Declared MIME type of the part, if any.
    pub content_type: Option<String>,

    /// Raw part body.
    pub bytes: Bytes,

    /// Size announced in the part's own `Content-Length` header, if any.
    pub declared_size: Option<u64>,
}

/// Coarse kind of a field, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    File,
}

impl RawField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, part: FilePart) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::File(part),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self.value {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::File(_) => FieldKind::File,
        }
    }

    /// Text value of the field, or `None` for file parts.
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Text(value) => Some(value),
            FieldValue::File(_) => None,
        }
    }
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
            declared_size: None,
        }
    }
}
