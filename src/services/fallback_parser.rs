//! Recovery parser for `multipart/form-data` bodies sent without a
//! `boundary` parameter.
//!
//! Some clients (notably `curl -H 'Content-Type: multipart/form-data' -F ...`)
//! override the header and drop the boundary while still producing a normal
//! multipart body. The boundary is guessed from the first body line.
//!
//! Only text fields are recovered. Without a declared boundary there is no
//! guarantee that a binary file part was split correctly, so callers must
//! treat any attachment on this path as absent.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

/// Matches the `name` parameter of a part header, not `filename`.
static NAME_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(?:^|[;\s])name\s*=\s*"([^"]*)""#).expect("valid regex"));

static FILENAME_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)filename\s*=\s*""#).expect("valid regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("multipart body does not start with a `--` boundary line")]
    NoBoundaryMarker,
    #[error("no named parts found for boundary `{0}`")]
    NoParts(String),
}

/// A field recovered from a boundary-less body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredField {
    pub value: String,
    /// The part declared a `filename`; its value is not trustworthy.
    pub was_file: bool,
}

/// Recover the named fields of a multipart body whose boundary is unknown.
///
/// Later parts with the same name replace earlier ones.
pub fn recover(raw_body: &[u8]) -> Result<BTreeMap<String, RecoveredField>, ParseError> {
    // Binary parts may not be UTF-8; they are dropped anyway.
    let body = String::from_utf8_lossy(raw_body);

    let first_line = body.split('\n').next().unwrap_or_default().trim_end_matches('\r');
    let boundary = first_line
        .strip_prefix("--")
        .map(str::trim_end)
        .filter(|b| !b.is_empty())
        .ok_or(ParseError::NoBoundaryMarker)?;

    let delimiter = format!("--{}", boundary);
    let mut fields = BTreeMap::new();

    for segment in body.split(delimiter.as_str()) {
        // Closing delimiter is `--boundary--`.
        if segment.starts_with("--") {
            break;
        }
        let Some((headers, content)) = split_headers(segment) else {
            continue;
        };
        let Some(name) = NAME_PARAM
            .captures(headers)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };

        fields.insert(
            name,
            RecoveredField {
                value: content.trim().to_string(),
                was_file: FILENAME_PARAM.is_match(headers),
            },
        );
    }

    if fields.is_empty() {
        return Err(ParseError::NoParts(boundary.to_string()));
    }
    Ok(fields)
}

/// Split a part into its header block and content at the first blank line.
fn split_headers(segment: &str) -> Option<(&str, &str)> {
    let segment = segment.trim_start_matches(['\r', '\n']);
    let crlf = segment.find("\r\n\r\n").map(|i| (i, 4));
    let lf = segment.find("\n\n").map(|i| (i, 2));

    let (idx, sep_len) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&segment[..idx], &segment[idx + sep_len..]))
}
