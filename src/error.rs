use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// Structured error context for configuration and validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field or URL that caused the error (e.g., "handle.status_url", "upload.upload_url")
    pub field_path: Option<String>,
    /// Additional context about the error
    pub details: Option<String>,
    /// Component that raised the error (e.g., "transform", "request_handle")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Rate-limit triple reported by the API through `x-ratelimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: i64,
    pub remaining: i64,
    pub reset: i64,
}

/// Normalized API error.
///
/// Produced for every non-2xx response (after the retry budget is spent) and for
/// jobs that complete with `success: false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientError {
    pub message: String,
    pub code: Option<String>,
    pub error_type: Option<String>,
    pub details: Option<Value>,
    pub timestamp: Option<String>,
    pub request_id: Option<String>,
    pub rate_limit: Option<RateLimit>,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Render the error in the API's own envelope shape.
    pub fn to_json(&self) -> Value {
        let mut error = Map::new();
        error.insert(
            "code".to_string(),
            Value::String(self.code.clone().unwrap_or_else(|| "UNKNOWN_ERROR".to_string())),
        );
        error.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(t) = &self.error_type {
            error.insert("type".to_string(), Value::String(t.clone()));
        }
        if let Some(d) = self.details.as_ref().filter(|d| !is_empty_json(d)) {
            error.insert("details".to_string(), d.clone());
        }

        let mut out = Map::new();
        out.insert("error".to_string(), Value::Object(error));
        if let Some(ts) = &self.timestamp {
            out.insert("timestamp".to_string(), Value::String(ts.clone()));
        }
        if let Some(id) = &self.request_id {
            out.insert("request_id".to_string(), Value::String(id.clone()));
        }
        if let Some(rl) = &self.rate_limit {
            out.insert(
                "rate_limit".to_string(),
                json!({ "limit": rl.limit, "remaining": rl.remaining, "reset": rl.reset }),
            );
        }
        Value::Object(out)
    }
}

fn is_empty_json(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(code.clone());
        }
        if !self.message.is_empty() {
            parts.push(self.message.clone());
        }
        if let Some(d) = self.details.as_ref().filter(|d| !is_empty_json(d)) {
            parts.push(format!("Details: {}", d));
        }
        if let Some(ts) = &self.timestamp {
            parts.push(format!("Timestamp: {}", ts));
        }
        if let Some(id) = &self.request_id {
            parts.push(format!("Request ID: {}", id));
        }
        write!(f, "{}", parts.join(" | "))
    }
}

impl std::error::Error for ClientError {}

/// Unified error type for the queue client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("API error: {0}")]
    Api(ClientError),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl From<ClientError> for Error {
    fn from(e: ClientError) -> Self {
        Error::Api(e)
    }
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// The normalized API error, if this is one.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// True when the underlying transport gave up because of the per-call timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Transport(crate::transport::TransportError::Timeout(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_populated_parts() {
        let mut e = ClientError::new("Invalid prompt")
            .with_code("INVALID_INPUT")
            .with_timestamp("2025-01-01T00:00:00Z");
        e.request_id = Some("req-9".to_string());
        assert_eq!(
            e.to_string(),
            "INVALID_INPUT | Invalid prompt | Timestamp: 2025-01-01T00:00:00Z | Request ID: req-9"
        );
    }

    #[test]
    fn to_json_uses_unknown_code_when_missing() {
        let e = ClientError::new("boom");
        let v = e.to_json();
        assert_eq!(v["error"]["code"], "UNKNOWN_ERROR");
        assert_eq!(v["error"]["message"], "boom");
        assert!(v.get("rate_limit").is_none());
    }

    #[test]
    fn to_json_includes_rate_limit_and_details() {
        let mut e = ClientError::new("slow down")
            .with_code("429")
            .with_type("rate_limit_error")
            .with_details(json!({"retry": true}));
        e.rate_limit = Some(RateLimit {
            limit: 100,
            remaining: 0,
            reset: 1700000000,
        });
        let v = e.to_json();
        assert_eq!(v["error"]["type"], "rate_limit_error");
        assert_eq!(v["error"]["details"]["retry"], true);
        assert_eq!(v["rate_limit"]["remaining"], 0);
    }

    #[test]
    fn validation_error_formats_context() {
        let err = Error::validation_with_context(
            "URL is empty",
            ErrorContext::new()
                .with_field_path("handle.status_url")
                .with_source("request_handle"),
        );
        assert_eq!(
            err.to_string(),
            "Validation error: URL is empty (field: handle.status_url, source: request_handle)"
        );
    }
}
