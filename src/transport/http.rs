use crate::client::error_classification::normalize;
use crate::client::policy::{Decision, RetryPolicy};
use crate::config::Endpoints;
use crate::{Error, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Proxy, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{auth_headers, TransportError, TransportSettings};

/// Async session: an authenticated client for the API plus a bare client for
/// signed upload URLs.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    upload_client: reqwest::Client,
    endpoints: Endpoints,
    policy: RetryPolicy,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(api_key: &str, settings: &TransportSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(auth_headers(api_key)?)
            .user_agent(settings.user_agent.as_str());
        let mut upload_builder = reqwest::Client::builder();

        if let Some(proxy_url) = &settings.proxy_url {
            match Proxy::all(proxy_url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy.clone());
                    upload_builder = upload_builder.proxy(proxy);
                }
                Err(e) => warn!(proxy = proxy_url.as_str(), error = %e, "ignoring invalid proxy URL"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;
        let upload_client = upload_builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            upload_client,
            endpoints: settings.endpoints.clone(),
            policy: RetryPolicy::new(settings.max_attempts),
            timeout: settings.timeout,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Limit for a single network operation. Never applied to a whole event stream.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue a request, retrying retryable statuses within the attempt budget.
    ///
    /// 2xx responses are returned untouched. Any other status ends as a normalized
    /// [`crate::ClientError`]. Connection failures and timeouts are not retried.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut req = self.client.request(method.clone(), url);
            if let Some(body) = body {
                req = req.json(body);
            }
            if let Some(headers) = headers {
                req = req.headers(headers.clone());
            }
            req = req.timeout(timeout.unwrap_or(self.timeout));

            let resp = req.send().await?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp);
            }

            match self.policy.decide(status, attempt) {
                Decision::Retry => {
                    debug!(
                        method = %method,
                        url,
                        http_status = status.as_u16(),
                        attempt,
                        retries_left = self.policy.max_attempts - attempt,
                        "retrying request"
                    );
                }
                Decision::Fail => return Err(Self::into_error(resp).await),
            }
        }
    }

    /// [`execute`](Self::execute) and decode the body as JSON.
    pub async fn execute_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let resp = self.execute(method, url, body, None, timeout).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Open a server-sent-events connection (single attempt).
    ///
    /// `timeout` bounds only the wait for the response head. The body has no
    /// overall deadline; callers limit each read instead.
    pub async fn open_event_stream(&self, url: &str, timeout: Option<Duration>) -> Result<Response> {
        let limit = timeout.unwrap_or(self.timeout);
        let send = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send();
        let resp = tokio::time::timeout(limit, send)
            .await
            .map_err(|_| timed_out("opening event stream", limit))??;
        if !resp.status().is_success() {
            return Err(Self::into_error(resp).await);
        }
        Ok(resp)
    }

    /// PUT raw bytes to a pre-signed URL. No credential is attached.
    pub async fn put_signed(&self, url: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let resp = self
            .upload_client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .timeout(self.timeout)
            .body(Bytes::from(data))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::into_error(resp).await);
        }
        Ok(())
    }

    async fn into_error(resp: Response) -> Error {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await.unwrap_or_default();
        Error::Api(normalize(status, &headers, &body))
    }
}

pub(crate) fn timed_out(operation: &str, limit: Duration) -> Error {
    Error::Transport(TransportError::Timeout(format!(
        "{} exceeded {:?}",
        operation, limit
    )))
}
