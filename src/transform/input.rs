use crate::encoding::DataUri;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Something that can be encoded to image bytes.
pub trait ImageLike: Send + Sync {
    /// Pixel mode, e.g. `"RGB"` or `"RGBA"`.
    fn mode(&self) -> &str;

    /// Native format of the image, if known (e.g. `"png"`).
    fn format(&self) -> Option<&str>;

    /// Encode the image in `format`.
    fn save(&self, format: &str) -> Result<Vec<u8>>;
}

/// Something whose full contents can be read for upload.
pub trait Readable: Send {
    fn read_all(&mut self) -> std::io::Result<Vec<u8>>;

    /// Reset to the start after reading. No-op for sources that cannot seek.
    fn rewind(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Explicit content type, if the source carries one.
    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Name (possibly a path) used to guess the content type and the upload file name.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// Already-encoded image bytes.
///
/// Saving only succeeds in the bytes' own format. The transformer always asks
/// for PNG, so wrap PNG data or implement [`ImageLike`] over a real encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    format: String,
    mode: String,
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>, format: impl Into<String>) -> Self {
        Self {
            bytes,
            format: format.into().to_lowercase(),
            mode: "RGB".to_string(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

impl ImageLike for EncodedImage {
    fn mode(&self) -> &str {
        &self.mode
    }

    fn format(&self) -> Option<&str> {
        Some(&self.format)
    }

    fn save(&self, format: &str) -> Result<Vec<u8>> {
        let same = format.eq_ignore_ascii_case(&self.format)
            || (is_jpeg(format) && is_jpeg(&self.format));
        if !same {
            return Err(Error::validation_with_context(
                format!("cannot re-encode a {} image as {}", self.format, format),
                ErrorContext::new().with_source("encoded_image"),
            ));
        }
        Ok(self.bytes.clone())
    }
}

fn is_jpeg(format: &str) -> bool {
    format.eq_ignore_ascii_case("jpeg") || format.eq_ignore_ascii_case("jpg")
}

/// A seekable reader with optional name and content type.
pub struct NamedReader<R> {
    inner: R,
    name: Option<String>,
    content_type: Option<String>,
}

impl<R: Read + Seek + Send> NamedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            name: None,
            content_type: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek + Send> Readable for NamedReader<R> {
    fn read_all(&mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn rewind(&mut self) -> std::io::Result<()> {
        self.inner.seek(SeekFrom::Start(0)).map(|_| ())
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Readable for std::fs::File {
    fn read_all(&mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn rewind(&mut self) -> std::io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }
}

impl<T: AsRef<[u8]> + Send> Readable for std::io::Cursor<T> {
    fn read_all(&mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn rewind(&mut self) -> std::io::Result<()> {
        self.set_position(0);
        Ok(())
    }
}

/// Argument tree handed to a submission.
///
/// Plain JSON converts with `From<Value>`; the other variants carry payloads that
/// are uploaded before submission and replaced by their URL.
pub enum Input {
    List(Vec<Input>),
    Map(BTreeMap<String, Input>),
    Image(Box<dyn ImageLike>),
    /// Uploaded when it names an existing file, otherwise kept as a string.
    Path(PathBuf),
    Reader(Box<dyn Readable>),
    Value(Value),
}

impl Input {
    pub fn image(image: impl ImageLike + 'static) -> Self {
        Input::Image(Box::new(image))
    }

    pub fn reader(reader: impl Readable + 'static) -> Self {
        Input::Reader(Box::new(reader))
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Input::Path(path.into())
    }

    /// Build a mapping from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Input)>,
    {
        Input::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::List(items) => f.debug_list().entries(items).finish(),
            Input::Map(map) => f.debug_map().entries(map).finish(),
            Input::Image(img) => f
                .debug_struct("Image")
                .field("mode", &img.mode())
                .field("format", &img.format())
                .finish(),
            Input::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Input::Reader(r) => f.debug_struct("Reader").field("name", &r.name()).finish(),
            Input::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

impl From<Value> for Input {
    fn from(v: Value) -> Self {
        match v {
            Value::Array(items) => Input::List(items.into_iter().map(Input::from).collect()),
            Value::Object(map) => {
                Input::Map(map.into_iter().map(|(k, v)| (k, Input::from(v))).collect())
            }
            other => Input::Value(other),
        }
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input::Value(Value::String(s.to_string()))
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Input::Value(Value::String(s))
    }
}

impl From<PathBuf> for Input {
    fn from(p: PathBuf) -> Self {
        Input::Path(p)
    }
}

impl From<Vec<Input>> for Input {
    fn from(items: Vec<Input>) -> Self {
        Input::List(items)
    }
}

impl From<BTreeMap<String, Input>> for Input {
    fn from(map: BTreeMap<String, Input>) -> Self {
        Input::Map(map)
    }
}

/// What the transformer does with a node, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Sequence,
    Mapping,
    Image,
    DataUri,
    FilePath,
    Readable,
    Literal,
}

/// Classify a node. Pure apart from the file-existence check for strings and paths.
pub fn classify(input: &Input) -> InputKind {
    match input {
        Input::List(_) | Input::Value(Value::Array(_)) => InputKind::Sequence,
        Input::Map(_) | Input::Value(Value::Object(_)) => InputKind::Mapping,
        Input::Image(_) => InputKind::Image,
        Input::Value(Value::String(s)) if DataUri::matches(s) => InputKind::DataUri,
        Input::Value(Value::String(s)) if is_existing_file(Path::new(s)) => InputKind::FilePath,
        Input::Path(p) if is_existing_file(p) => InputKind::FilePath,
        Input::Reader(_) => InputKind::Readable,
        _ => InputKind::Literal,
    }
}

fn is_existing_file(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_file()
}
