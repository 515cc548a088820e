//! Input transformer: uploads binary payloads found in an argument tree and
//! replaces them with the URLs they were uploaded to.
//!
//! Nodes are handled in a fixed priority order (see [`InputKind`]):
//!
//! | Kind | Action |
//! |------|--------|
//! | sequence | transform each element, keep order |
//! | mapping | transform each value, keep every key |
//! | image | encode as PNG and upload |
//! | data URI | base64-decode and upload with the embedded MIME type |
//! | file path | upload the file, MIME guessed from the extension |
//! | readable | read fully, rewind, upload |
//! | literal | unchanged |
//!
//! The first failing upload aborts the whole walk; nothing is submitted with a
//! partially transformed tree.

mod input;

pub use input::{classify, EncodedImage, ImageLike, Input, InputKind, NamedReader, Readable};

use crate::encoding::{guess_mime_type, DataUri, DEFAULT_CONTENT_TYPE};
use crate::{Error, ErrorContext, Result};
use async_recursion::async_recursion;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_IMAGE_FORMAT: &str = "png";
pub const DEFAULT_FILE_NAME: &str = "upload.bin";

/// Upload primitives used by the blocking transformer.
pub trait Uploader {
    fn upload(&self, data: Vec<u8>, content_type: &str, file_name: Option<&str>) -> Result<String>;

    fn upload_image(&self, image: &dyn ImageLike, format: &str) -> Result<String> {
        let bytes = image.save(format)?;
        self.upload(bytes, &format!("image/{}", format.to_lowercase()), None)
    }

    fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        self.upload(bytes, guess_mime_type(path), file_name_of(path).as_deref())
    }
}

/// Upload primitives used by the async transformer.
#[async_trait::async_trait]
pub trait AsyncUploader: Send + Sync {
    async fn upload(
        &self,
        data: Vec<u8>,
        content_type: &str,
        file_name: Option<&str>,
    ) -> Result<String>;

    async fn upload_image(&self, image: &dyn ImageLike, format: &str) -> Result<String> {
        let bytes = image.save(format)?;
        self.upload(bytes, &format!("image/{}", format.to_lowercase()), None)
            .await
    }

    async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        self.upload(bytes, guess_mime_type(path), file_name_of(path).as_deref())
            .await
    }
}

pub(crate) fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// A readable source drained into memory, ready for upload.
struct ReadPayload {
    data: Vec<u8>,
    content_type: String,
    file_name: Option<String>,
}

fn drain_reader(reader: &mut dyn Readable) -> Result<ReadPayload> {
    let data = reader.read_all()?;
    reader.rewind()?;

    let content_type = match reader.content_type().filter(|c| !c.is_empty()) {
        Some(ct) => ct.to_string(),
        None => {
            let name = reader.name().unwrap_or(DEFAULT_FILE_NAME);
            guess_mime_type(name).to_string()
        }
    };
    let file_name = reader.name().and_then(|n| file_name_of(Path::new(n)));

    Ok(ReadPayload {
        data,
        content_type,
        file_name,
    })
}

fn leaf_path(input: &Input) -> Option<PathBuf> {
    match input {
        Input::Path(p) => Some(p.clone()),
        Input::Value(Value::String(s)) => Some(PathBuf::from(s)),
        _ => None,
    }
}

fn data_uri_of(input: &Input) -> Result<DataUri> {
    let parsed = match input {
        Input::Value(Value::String(s)) => DataUri::parse(s)?,
        _ => None,
    };
    parsed.ok_or_else(|| {
        Error::validation_with_context(
            "expected a data URI",
            ErrorContext::new().with_source("transform"),
        )
    })
}

/// Literal leaves: JSON passes through, a path that names no file becomes its string form.
fn literal(input: &Input) -> Value {
    match input {
        Input::Value(v) => v.clone(),
        Input::Path(p) => Value::String(p.to_string_lossy().into_owned()),
        _ => Value::Null,
    }
}

fn log_failure(kind: InputKind, err: &Error) {
    warn!(kind = ?kind, error = %err, "failed to upload input payload");
}

/// Blocking transform.
pub fn transform<U: Uploader + ?Sized>(uploader: &U, input: &mut Input) -> Result<Value> {
    let kind = classify(input);
    let uploaded = match kind {
        InputKind::Sequence => {
            return match input {
                Input::List(items) => items
                    .iter_mut()
                    .map(|item| transform(uploader, item))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array),
                Input::Value(Value::Array(items)) => items
                    .iter()
                    .map(|item| transform(uploader, &mut Input::from(item.clone())))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array),
                _ => Ok(literal(input)),
            };
        }
        InputKind::Mapping => {
            return match input {
                Input::Map(map) => map
                    .iter_mut()
                    .map(|(k, v)| -> Result<(String, Value)> {
                        Ok((k.clone(), transform(uploader, v)?))
                    })
                    .collect::<Result<Map<_, _>>>()
                    .map(Value::Object),
                Input::Value(Value::Object(map)) => map
                    .iter()
                    .map(|(k, v)| -> Result<(String, Value)> {
                        Ok((k.clone(), transform(uploader, &mut Input::from(v.clone()))?))
                    })
                    .collect::<Result<Map<_, _>>>()
                    .map(Value::Object),
                _ => Ok(literal(input)),
            };
        }
        InputKind::Image => match input {
            Input::Image(img) => uploader.upload_image(img.as_ref(), DEFAULT_IMAGE_FORMAT),
            _ => return Ok(literal(input)),
        },
        InputKind::DataUri => data_uri_of(input)
            .and_then(|uri| uploader.upload(uri.data, &uri.content_type, None)),
        InputKind::FilePath => match leaf_path(input) {
            Some(path) => uploader.upload_file(&path),
            None => return Ok(literal(input)),
        },
        InputKind::Readable => match input {
            Input::Reader(reader) => drain_reader(reader.as_mut()).and_then(|p| {
                uploader.upload(p.data, &p.content_type, p.file_name.as_deref())
            }),
            _ => return Ok(literal(input)),
        },
        InputKind::Literal => return Ok(literal(input)),
    };

    uploaded.map(Value::String).map_err(|e| {
        log_failure(kind, &e);
        e
    })
}

/// Async transform. Same rules as [`transform`].
#[async_recursion]
pub async fn transform_async(uploader: &dyn AsyncUploader, input: &mut Input) -> Result<Value> {
    let kind = classify(input);
    let uploaded = match kind {
        InputKind::Sequence => {
            let mut out = Vec::new();
            match input {
                Input::List(items) => {
                    for item in items.iter_mut() {
                        out.push(transform_async(uploader, item).await?);
                    }
                }
                Input::Value(Value::Array(items)) => {
                    for item in items.iter() {
                        out.push(transform_async(uploader, &mut Input::from(item.clone())).await?);
                    }
                }
                _ => return Ok(literal(input)),
            }
            return Ok(Value::Array(out));
        }
        InputKind::Mapping => {
            let mut out = Map::new();
            match input {
                Input::Map(map) => {
                    for (k, v) in map.iter_mut() {
                        out.insert(k.clone(), transform_async(uploader, v).await?);
                    }
                }
                Input::Value(Value::Object(map)) => {
                    for (k, v) in map.iter() {
                        let value = transform_async(uploader, &mut Input::from(v.clone())).await?;
                        out.insert(k.clone(), value);
                    }
                }
                _ => return Ok(literal(input)),
            }
            return Ok(Value::Object(out));
        }
        InputKind::Image => match input {
            Input::Image(img) => {
                uploader
                    .upload_image(img.as_ref(), DEFAULT_IMAGE_FORMAT)
                    .await
            }
            _ => return Ok(literal(input)),
        },
        InputKind::DataUri => match data_uri_of(input) {
            Ok(uri) => uploader.upload(uri.data, &uri.content_type, None).await,
            Err(e) => Err(e),
        },
        InputKind::FilePath => match leaf_path(input) {
            Some(path) => uploader.upload_file(&path).await,
            None => return Ok(literal(input)),
        },
        InputKind::Readable => match input {
            Input::Reader(reader) => match drain_reader(reader.as_mut()) {
                Ok(p) => {
                    uploader
                        .upload(p.data, &p.content_type, p.file_name.as_deref())
                        .await
                }
                Err(e) => Err(e),
            },
            _ => return Ok(literal(input)),
        },
        InputKind::Literal => return Ok(literal(input)),
    };

    uploaded.map(Value::String).map_err(|e| {
        log_failure(kind, &e);
        e
    })
}

/// Default file name for uploads that carry none.
pub(crate) fn file_name_or_default(file_name: Option<&str>) -> &str {
    file_name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_FILE_NAME)
}

/// Content type for an upload, falling back to `application/octet-stream`.
pub(crate) fn content_type_or_default(content_type: &str) -> &str {
    if content_type.trim().is_empty() {
        DEFAULT_CONTENT_TYPE
    } else {
        content_type
    }
}
