//! HTTP transport: authenticated sessions with the status-keyed retry wrapper.
//!
//! [`HttpTransport`] serves the async client and [`BlockingTransport`] the blocking
//! one. Both are built once per client, carry the bearer credential and user agent
//! as default headers, and are never mutated afterwards.

pub mod blocking;
pub mod http;
pub(crate) mod sse;

pub use blocking::BlockingTransport;
pub use http::HttpTransport;

use crate::config::Endpoints;
use crate::{Error, ErrorContext, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

/// Everything needed to build a transport, minus the credential.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub user_agent: String,
    pub proxy_url: Option<String>,
}

pub(crate) fn default_user_agent() -> String {
    format!("sunra-client/{} (rust)", env!("CARGO_PKG_VERSION"))
}

pub(crate) fn auth_headers(api_key: &str) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
        Error::configuration_with_context(
            "API key is not a valid header value",
            ErrorContext::new()
                .with_details(e.to_string())
                .with_source("transport"),
        )
    })?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Http(e)
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_header_is_bearer_and_sensitive() {
        let h = auth_headers("abc").unwrap();
        let v = h.get(AUTHORIZATION).unwrap();
        assert_eq!(v.to_str().unwrap(), "Bearer abc");
        assert!(v.is_sensitive());
    }

    #[test]
    fn invalid_key_is_a_configuration_error() {
        let err = auth_headers("bad\nkey").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn user_agent_names_the_client() {
        assert!(default_user_agent().starts_with("sunra-client/"));
    }
}
