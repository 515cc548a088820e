//! Endpoint layout and process-wide configuration.
//!
//! The API lives under `https://api.<host>/v1/`. The host defaults to
//! [`DEFAULT_HOST`] and can be overridden through `SUNRA_HOST` or the client
//! builder. A single credential may be configured for the whole process with
//! [`configure`]; clients resolve it once, when they first touch the network.

use arc_swap::ArcSwapOption;
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "sunra.ai";
pub const HOST_ENV: &str = "SUNRA_HOST";
pub const KEY_ENV: &str = "SUNRA_KEY";
pub const TIMEOUT_ENV: &str = "SUNRA_HTTP_TIMEOUT_SECS";
pub const PROXY_ENV: &str = "SUNRA_PROXY_URL";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

static CONFIGURED_CREDENTIALS: ArcSwapOption<String> = ArcSwapOption::const_empty();

/// Set the process-wide credential used by clients that were not given one explicitly.
///
/// Clients that already built their transport keep the credential they resolved.
pub fn configure(credentials: impl Into<String>) {
    CONFIGURED_CREDENTIALS.store(Some(Arc::new(credentials.into())));
}

/// The process-wide credential, if one was configured.
pub fn configured_credentials() -> Option<String> {
    CONFIGURED_CREDENTIALS
        .load_full()
        .map(|k| k.as_ref().clone())
}

pub fn reset_configuration() {
    CONFIGURED_CREDENTIALS.store(None);
}

/// Base URLs for the queue and storage APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Always ends with `/`.
    queue_url: String,
    /// Never ends with `/`.
    storage_url: String,
}

impl Endpoints {
    pub fn for_host(host: &str) -> Self {
        Self::new(
            format!("https://api.{}/v1/queue/", host),
            format!("https://api.{}/v1/storage", host),
        )
    }

    pub fn new(queue_url: impl Into<String>, storage_url: impl Into<String>) -> Self {
        let mut queue_url = queue_url.into();
        if !queue_url.ends_with('/') {
            queue_url.push('/');
        }
        let storage_url = storage_url.into().trim_end_matches('/').to_string();
        Self {
            queue_url,
            storage_url,
        }
    }

    pub fn from_env() -> Self {
        let host = env::var(HOST_ENV)
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        Self::for_host(host.trim())
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn storage_url(&self) -> &str {
        &self.storage_url
    }

    /// `<queue>/<application>[/<path>]`, without query string.
    pub fn application_url(&self, application: &str, path: Option<&str>) -> String {
        let mut url = format!("{}{}", self.queue_url, application.trim_start_matches('/'));
        if let Some(p) = path.map(|p| p.trim_start_matches('/')).filter(|p| !p.is_empty()) {
            url.push('/');
            url.push_str(p);
        }
        url
    }

    pub fn request_url(&self, request_id: &str) -> String {
        format!("{}requests/{}", self.queue_url, request_id)
    }

    pub fn status_stream_url(&self, request_id: &str) -> String {
        format!("{}/status/stream", self.request_url(request_id))
    }

    pub fn upload_initiate_url(&self) -> String {
        format!("{}/upload/initiate", self.storage_url)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::for_host(DEFAULT_HOST)
    }
}

/// Default per-call timeout, overridable through `SUNRA_HTTP_TIMEOUT_SECS`.
pub(crate) fn timeout_from_env() -> Duration {
    env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

pub(crate) fn proxy_from_env() -> Option<String> {
    env::var(PROXY_ENV).ok().filter(|p| !p.trim().is_empty())
}
