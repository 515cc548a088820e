use crate::client::error_classification::normalize;
use crate::client::policy::{Decision, RetryPolicy};
use crate::config::Endpoints;
use crate::{Error, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Proxy};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{auth_headers, TransportError, TransportSettings};

/// Blocking counterpart of [`super::HttpTransport`].
///
/// Must not be created or dropped from inside an async runtime.
#[derive(Debug)]
pub struct BlockingTransport {
    client: Client,
    upload_client: Client,
    endpoints: Endpoints,
    policy: RetryPolicy,
}

impl BlockingTransport {
    pub fn new(api_key: &str, settings: &TransportSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .default_headers(auth_headers(api_key)?)
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout);
        let mut upload_builder = Client::builder().timeout(settings.timeout);

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
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn execute(
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
            if let Some(t) = timeout {
                req = req.timeout(t);
            }

            let resp = req.send()?;
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
                Decision::Fail => return Err(Self::into_error(resp)),
            }
        }
    }

    pub fn execute_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let resp = self.execute(method, url, body, None, timeout)?;
        let bytes = resp.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn open_event_stream(&self, url: &str, timeout: Option<Duration>) -> Result<Response> {
        let mut req = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp = req.send()?;
        if !resp.status().is_success() {
            return Err(Self::into_error(resp));
        }
        Ok(resp)
    }

    pub fn put_signed(&self, url: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let resp = self
            .upload_client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()?;
        if !resp.status().is_success() {
            return Err(Self::into_error(resp));
        }
        Ok(())
    }

    fn into_error(resp: Response) -> Error {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().unwrap_or_default();
        Error::Api(normalize(status, &headers, &body))
    }
}
