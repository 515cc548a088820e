//! Data URI helpers and MIME type guessing.
//!
//! [`encode`], [`encode_file`] and [`encode_image`] build `data:<mime>;base64,...`
//! strings without touching the network. Note that the input transformer uploads
//! data URIs it finds, so these are for callers embedding data elsewhere.

use crate::transform::ImageLike;
use crate::{Error, ErrorContext, Result};
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

static DATA_URI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:[^;]+;base64,").expect("valid data URI pattern"));

/// Encode bytes (or UTF-8 text) as a data URI.
pub fn encode(data: impl AsRef<[u8]>, content_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(data.as_ref())
    )
}

/// Encode a local file, guessing its content type from the extension.
pub fn encode_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    Ok(encode(bytes, guess_mime_type(path)))
}

/// Encode an image in the given format (e.g. `"png"`).
pub fn encode_image(image: &dyn ImageLike, format: &str) -> Result<String> {
    let bytes = image.save(format)?;
    Ok(encode(bytes, &format!("image/{}", format.to_lowercase())))
}

/// A decoded `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl DataUri {
    pub fn matches(s: &str) -> bool {
        DATA_URI_PATTERN.is_match(s)
    }

    /// `Ok(None)` when `s` is not a data URI; an error when it looks like one but
    /// the payload is not valid base64.
    pub fn parse(s: &str) -> Result<Option<Self>> {
        if !Self::matches(s) {
            return Ok(None);
        }
        let Some((header, encoded)) = s.split_once(',') else {
            return Ok(None);
        };
        let content_type = header
            .trim_start_matches("data:")
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string();
        // Wrapped payloads are common; line breaks carry no data.
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let data = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| {
                Error::validation_with_context(
                    "Invalid base64 payload in data URI",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("data_uri"),
                )
            })?;
        Ok(Some(Self { content_type, data }))
    }
}

/// MIME type for a file name or path, by extension.
pub fn guess_mime_type(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/vnd.microsoft.icon",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
