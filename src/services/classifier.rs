//! Decides whether an optional `image` field actually carries an attachment.
//!
//! Clients encode "no file" in several ways: they omit the field, send it as
//! an empty text value (`curl -F image=`), or send an empty file part with an
//! empty filename (browser file inputs with nothing selected). All of these
//! collapse to [`AttachmentState::Absent`] here and nowhere else.

use crate::{
    models::field::{FieldValue, FilePart, RawField},
    services::image_service::AttachmentError,
};

/// Outcome of classifying the attachment field.
#[derive(Debug)]
pub enum AttachmentState {
    Absent,
    Invalid(AttachmentError),
    /// A file part with a non-blank filename and a non-empty body.
    Present(FilePart),
}

impl AttachmentState {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Classify the attachment field of a form.
pub fn classify(field: Option<RawField>) -> AttachmentState {
    let Some(field) = field else {
        return AttachmentState::Absent;
    };

    let part = match field.value {
        FieldValue::Text(_) => return AttachmentState::Absent,
        FieldValue::File(part) => part,
    };

    if part.file_name.trim().is_empty() {
        return AttachmentState::Absent;
    }
    if part.bytes.is_empty() {
        return AttachmentState::Invalid(AttachmentError::EmptyBody);
    }

    AttachmentState::Present(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn file_field(name: &str, body: &'static [u8]) -> RawField {
        RawField::file(
            "image",
            FilePart::new(name, Some("image/png"), Bytes::from_static(body)),
        )
    }

    #[test]
    fn omitted_field_is_absent() {
        assert!(classify(None).is_absent());
    }

    #[test]
    fn text_values_are_absent() {
        assert!(classify(Some(RawField::text("image", ""))).is_absent());
        assert!(classify(Some(RawField::text("image", "not a file"))).is_absent());
    }

    #[test]
    fn file_part_with_blank_filename_is_absent() {
        assert!(classify(Some(file_field("", b""))).is_absent());
        assert!(classify(Some(file_field("   ", b"data"))).is_absent());
    }

    #[test]
    fn named_file_without_body_is_invalid() {
        match classify(Some(file_field("cat.png", b""))) {
            AttachmentState::Invalid(AttachmentError::EmptyBody) => {}
            other => panic!("expected empty body, got {:?}", other),
        }
    }

    #[test]
    fn named_file_with_body_is_present() {
        match classify(Some(file_field("cat.png", b"\x89PNG"))) {
            AttachmentState::Present(part) => {
                assert_eq!(part.file_name, "cat.png");
                assert_eq!(part.bytes.len(), 4);
            }
            other => panic!("expected present, got {:?}", other),
        }
    }
}
