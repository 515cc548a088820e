use crate::auth::{Credentials, KeyEnv};
use crate::client::policy::DEFAULT_MAX_ATTEMPTS;
use crate::client::{AsyncClient, SyncClient};
use crate::config::{self, Endpoints};
use crate::transport::{default_user_agent, TransportSettings};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`AsyncClient`] and [`SyncClient`].
///
/// Environment knobs are read once, in [`ClientBuilder::new`]:
/// - `SUNRA_HOST` (API host, default `sunra.ai`)
/// - `SUNRA_HTTP_TIMEOUT_SECS` (default per-call timeout, 120 s)
/// - `SUNRA_PROXY_URL` (proxy for every request)
///
/// The credential is not resolved here. It is resolved once, when the built client
/// first needs its transport.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    credentials: Credentials,
    key_env: KeyEnv,
    timeout: Duration,
    endpoints: Endpoints,
    max_attempts: u32,
    user_agent: String,
    proxy_url: Option<String>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            credentials: Credentials::Default,
            key_env: KeyEnv::default(),
            timeout: config::timeout_from_env(),
            endpoints: Endpoints::from_env(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            user_agent: default_user_agent(),
            proxy_url: config::proxy_from_env(),
        }
    }

    /// Use this key instead of the process-wide configuration or `SUNRA_KEY`.
    pub fn credentials(mut self, credentials: impl Into<Credentials>) -> Self {
        self.credentials = credentials.into();
        self
    }

    /// Supply the key lazily. The resolver runs at most once per built client.
    pub fn credentials_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.credentials = Credentials::Resolver(Arc::new(resolver));
        self
    }

    /// Replace the `SUNRA_KEY` lookup used as the last credential fallback.
    pub fn key_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.key_env = KeyEnv::new(lookup);
        self
    }

    /// Default timeout applied to each network call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// API host, e.g. `sunra.ai`. Replaces any earlier base URL override.
    pub fn host(mut self, host: &str) -> Self {
        self.endpoints = Endpoints::for_host(host.trim());
        self
    }

    /// Override both base URLs.
    ///
    /// This is primarily for testing with mock servers; production code should
    /// use [`host`](Self::host).
    pub fn base_urls(mut self, queue_url: impl Into<String>, storage_url: impl Into<String>) -> Self {
        self.endpoints = Endpoints::new(queue_url, storage_url);
        self
    }

    /// Total attempts per request for retryable statuses (at least 1, default 3).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    fn into_parts(self) -> (Credentials, KeyEnv, TransportSettings) {
        let settings = TransportSettings {
            endpoints: self.endpoints,
            timeout: self.timeout,
            max_attempts: self.max_attempts,
            user_agent: self.user_agent,
            proxy_url: self.proxy_url,
        };
        (self.credentials, self.key_env, settings)
    }

    pub fn build(self) -> AsyncClient {
        let (credentials, key_env, settings) = self.into_parts();
        AsyncClient::from_parts(credentials, key_env, settings)
    }

    pub fn build_blocking(self) -> SyncClient {
        let (credentials, key_env, settings) = self.into_parts();
        SyncClient::from_parts(credentials, key_env, settings)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides() {
        let b = ClientBuilder::new()
            .credentials("k")
            .timeout(Duration::from_secs(5))
            .host("example.com")
            .max_attempts(0)
            .user_agent("ua/1");
        assert_eq!(b.max_attempts, 1);
        let (creds, _, settings) = b.into_parts();
        assert!(matches!(creds, Credentials::Key(ref k) if k == "k"));
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.endpoints.queue_url(), "https://api.example.com/v1/queue/");
        assert_eq!(settings.user_agent, "ua/1");
    }

    #[test]
    fn base_urls_replace_host() {
        let b = ClientBuilder::new().base_urls("http://127.0.0.1:1/q", "http://127.0.0.1:1/s/");
        let (_, _, settings) = b.into_parts();
        assert_eq!(settings.endpoints.queue_url(), "http://127.0.0.1:1/q/");
        assert_eq!(settings.endpoints.storage_url(), "http://127.0.0.1:1/s");
    }
}
