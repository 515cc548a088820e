//! Request handles: one submitted job, polled until it completes.
//!
//! Both flavours drive the same state machine. `status()` is one poll,
//! `iter_events()` polls until the first `Completed` (inclusive) and then stops,
//! and `get()` runs that loop to the end before fetching the result.

use crate::client::error_classification::job_failure;
use crate::client::types::DEFAULT_POLL_INTERVAL;
use crate::config::Endpoints;
use crate::transport::http::timed_out;
use crate::transport::sse::{decode_event, SseParser};
use crate::transport::{BlockingTransport, HttpTransport};
use crate::types::status::is_terminal_stream_event;
use crate::types::{Status, SubmitResponse};
use crate::{BoxStream, Error, ErrorContext, Result};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Identifiers and URLs of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestUrls {
    request_id: String,
    response_url: String,
    status_url: String,
    cancel_url: String,
}

impl RequestUrls {
    fn from_submit(resp: SubmitResponse) -> Self {
        Self {
            request_id: resp.request_id,
            response_url: resp.response_url,
            status_url: resp.status_url,
            cancel_url: resp.cancel_url,
        }
    }

    fn for_request(endpoints: &Endpoints, request_id: &str) -> Self {
        let base = endpoints.request_url(request_id);
        Self {
            request_id: request_id.to_string(),
            status_url: format!("{}/status", base),
            cancel_url: format!("{}/cancel", base),
            response_url: base,
        }
    }
}

/// An empty URL means the submission response lacked it; the handle cannot be used.
fn require_url<'a>(url: &'a str, field: &str) -> Result<&'a str> {
    if url.is_empty() {
        return Err(Error::validation_with_context(
            format!("request handle has no {}", field),
            ErrorContext::new()
                .with_field_path(format!("handle.{}", field))
                .with_source("request_handle"),
        ));
    }
    Ok(url)
}

/// `Ok(())` for a successful completion, the job's error otherwise.
fn check_completion(status: Option<Status>) -> Result<()> {
    match status {
        Some(Status::Completed {
            success: false,
            error,
            ..
        }) => Err(Error::Api(job_failure(error.as_ref()))),
        Some(Status::Completed { .. }) => Ok(()),
        _ => Err(Error::UnknownStatus(
            "status polling ended before completion".to_string(),
        )),
    }
}

/// Async handle for a submitted request.
#[derive(Clone)]
pub struct AsyncRequestHandle {
    urls: RequestUrls,
    transport: Arc<HttpTransport>,
}

impl fmt::Debug for AsyncRequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRequestHandle")
            .field("request_id", &self.urls.request_id)
            .field("status_url", &self.urls.status_url)
            .finish()
    }
}

impl AsyncRequestHandle {
    pub(crate) fn from_submit(resp: SubmitResponse, transport: Arc<HttpTransport>) -> Self {
        Self {
            urls: RequestUrls::from_submit(resp),
            transport,
        }
    }

    /// Rebuild a handle for a job submitted earlier.
    pub fn from_request_id(transport: Arc<HttpTransport>, request_id: &str) -> Self {
        Self {
            urls: RequestUrls::for_request(transport.endpoints(), request_id),
            transport,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.urls.request_id
    }

    pub fn response_url(&self) -> &str {
        &self.urls.response_url
    }

    pub fn status_url(&self) -> &str {
        &self.urls.status_url
    }

    pub fn cancel_url(&self) -> &str {
        &self.urls.cancel_url
    }

    pub async fn status(&self) -> Result<Status> {
        let url = require_url(&self.urls.status_url, "status_url")?;
        let body = self
            .transport
            .execute_json(Method::GET, url, None, None)
            .await?;
        Status::from_json(&body)
    }

    /// Poll every `interval` until the job completes.
    ///
    /// The stream yields each polled status, ends right after the first
    /// `Completed`, and ends after yielding an error.
    pub fn iter_events(&self, interval: Duration) -> BoxStream<'static, Status> {
        futures::stream::unfold(Some((self.clone(), true)), move |state| async move {
            let (handle, first) = state?;
            if !first {
                tokio::time::sleep(interval).await;
            }
            match handle.status().await {
                Ok(status) => {
                    let next = if status.is_completed() {
                        None
                    } else {
                        Some((handle, false))
                    };
                    Some((Ok(status), next))
                }
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }

    /// Wait for completion and fetch the result body.
    pub async fn get(&self) -> Result<Value> {
        let mut events = self.iter_events(DEFAULT_POLL_INTERVAL);
        let mut last = None;
        while let Some(status) = events.next().await {
            last = Some(status?);
        }
        check_completion(last)?;

        let url = require_url(&self.urls.response_url, "response_url")?;
        self.transport
            .execute_json(Method::GET, url, None, None)
            .await
    }

    pub async fn cancel(&self) -> Result<()> {
        let url = require_url(&self.urls.cancel_url, "cancel_url")?;
        self.transport
            .execute(Method::PUT, url, None, None, None)
            .await?;
        debug!(request_id = self.urls.request_id.as_str(), "request cancelled");
        Ok(())
    }

    /// Open the push-based status stream for this request.
    ///
    /// Each event is yielded verbatim; the stream ends after an event whose
    /// `status` is `COMPLETED`, `FAILED` or `CANCELLED`, dropping the connection.
    /// `timeout` (or the client timeout) limits each read, not the whole stream.
    pub async fn stream_status(
        &self,
        timeout: Option<Duration>,
    ) -> Result<BoxStream<'static, Value>> {
        let url = self
            .transport
            .endpoints()
            .status_stream_url(&self.urls.request_id);
        let resp = self.transport.open_event_stream(&url, timeout).await?;
        let read_limit = timeout.unwrap_or_else(|| self.transport.timeout());
        Ok(sse_values(resp.bytes_stream().boxed(), read_limit))
    }
}

fn sse_values(
    body: futures::stream::BoxStream<'static, reqwest::Result<Bytes>>,
    read_limit: Duration,
) -> BoxStream<'static, Value> {
    futures::stream::unfold(Some((body, SseParser::new(), false)), move |state| async move {
        let (mut body, mut parser, mut eof) = state?;
        loop {
            if let Some(data) = parser.next_data() {
                return match decode_event(&data) {
                    Ok(event) => {
                        let next = if is_terminal_stream_event(&event) {
                            None
                        } else {
                            Some((body, parser, eof))
                        };
                        Some((Ok(event), next))
                    }
                    Err(e) => Some((Err(e), None)),
                };
            }
            if eof {
                return None;
            }
            let next = match tokio::time::timeout(read_limit, body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    return Some((Err(timed_out("event stream read", read_limit)), None));
                }
            };
            match next {
                Some(Ok(chunk)) => parser.push(&chunk),
                Some(Err(e)) => return Some((Err(e.into()), None)),
                None => {
                    parser.finish();
                    eof = true;
                }
            }
        }
    })
    .boxed()
}

/// Blocking handle for a submitted request.
#[derive(Clone)]
pub struct SyncRequestHandle {
    urls: RequestUrls,
    transport: Arc<BlockingTransport>,
}

impl fmt::Debug for SyncRequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRequestHandle")
            .field("request_id", &self.urls.request_id)
            .field("status_url", &self.urls.status_url)
            .finish()
    }
}

impl SyncRequestHandle {
    pub(crate) fn from_submit(resp: SubmitResponse, transport: Arc<BlockingTransport>) -> Self {
        Self {
            urls: RequestUrls::from_submit(resp),
            transport,
        }
    }

    pub fn from_request_id(transport: Arc<BlockingTransport>, request_id: &str) -> Self {
        Self {
            urls: RequestUrls::for_request(transport.endpoints(), request_id),
            transport,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.urls.request_id
    }

    pub fn response_url(&self) -> &str {
        &self.urls.response_url
    }

    pub fn status_url(&self) -> &str {
        &self.urls.status_url
    }

    pub fn cancel_url(&self) -> &str {
        &self.urls.cancel_url
    }

    pub fn status(&self) -> Result<Status> {
        let url = require_url(&self.urls.status_url, "status_url")?;
        let body = self.transport.execute_json(Method::GET, url, None, None)?;
        Status::from_json(&body)
    }

    pub fn iter_events(&self, interval: Duration) -> StatusEvents {
        StatusEvents {
            handle: self.clone(),
            interval,
            first: true,
            done: false,
        }
    }

    pub fn get(&self) -> Result<Value> {
        let mut last = None;
        for status in self.iter_events(DEFAULT_POLL_INTERVAL) {
            last = Some(status?);
        }
        check_completion(last)?;

        let url = require_url(&self.urls.response_url, "response_url")?;
        self.transport.execute_json(Method::GET, url, None, None)
    }

    pub fn cancel(&self) -> Result<()> {
        let url = require_url(&self.urls.cancel_url, "cancel_url")?;
        self.transport.execute(Method::PUT, url, None, None, None)?;
        debug!(request_id = self.urls.request_id.as_str(), "request cancelled");
        Ok(())
    }

    pub fn stream_status(&self, timeout: Option<Duration>) -> Result<SseEvents> {
        let url = self
            .transport
            .endpoints()
            .status_stream_url(&self.urls.request_id);
        let response = self.transport.open_event_stream(&url, timeout)?;
        Ok(SseEvents::new(response))
    }
}

/// Blocking poll loop returned by [`SyncRequestHandle::iter_events`].
#[derive(Debug)]
pub struct StatusEvents {
    handle: SyncRequestHandle,
    interval: Duration,
    first: bool,
    done: bool,
}

impl Iterator for StatusEvents {
    type Item = Result<Status>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.first {
            std::thread::sleep(self.interval);
        }
        self.first = false;

        let polled = self.handle.status();
        match &polled {
            Ok(status) if !status.is_completed() => {}
            _ => self.done = true,
        }
        Some(polled)
    }
}

/// Blocking server-sent-events reader.
///
/// The connection is released as soon as a terminal event has been yielded.
pub struct SseEvents {
    response: Option<reqwest::blocking::Response>,
    parser: SseParser,
    done: bool,
}

impl fmt::Debug for SseEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseEvents")
            .field("open", &self.response.is_some())
            .field("done", &self.done)
            .finish()
    }
}

impl SseEvents {
    fn new(response: reqwest::blocking::Response) -> Self {
        Self {
            response: Some(response),
            parser: SseParser::new(),
            done: false,
        }
    }

    fn close(&mut self) {
        self.response = None;
        self.done = true;
    }
}

impl Iterator for SseEvents {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = [0u8; 8192];
        loop {
            if self.done {
                return None;
            }
            if let Some(data) = self.parser.next_data() {
                let event = decode_event(&data);
                match &event {
                    Ok(value) if !is_terminal_stream_event(value) => {}
                    _ => self.close(),
                }
                return Some(event);
            }
            let Some(response) = self.response.as_mut() else {
                self.done = true;
                return None;
            };
            match response.read(&mut buf) {
                Ok(0) => {
                    self.parser.finish();
                    self.response = None;
                }
                Ok(n) => self.parser.push(&buf[..n]),
                Err(e) => {
                    self.close();
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn urls_for_request_id_use_single_slash() {
        let urls = RequestUrls::for_request(&Endpoints::for_host("example.com"), "abc");
        assert_eq!(
            urls.response_url,
            "https://api.example.com/v1/queue/requests/abc"
        );
        assert_eq!(
            urls.status_url,
            "https://api.example.com/v1/queue/requests/abc/status"
        );
        assert_eq!(
            urls.cancel_url,
            "https://api.example.com/v1/queue/requests/abc/cancel"
        );
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = require_url("", "status_url").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("handle.status_url")
        );
    }

    #[test]
    fn failed_completion_carries_job_error() {
        let status = Status::Completed {
            logs: None,
            metrics: Default::default(),
            success: false,
            error: Some(json!({"message": "X", "code": "E1"})),
        };
        let err = check_completion(Some(status)).unwrap_err();
        let e = err.client_error().unwrap();
        assert_eq!(e.message, "X");
        assert_eq!(e.code.as_deref(), Some("E1"));
    }

    #[test]
    fn successful_completion_passes() {
        let status = Status::Completed {
            logs: None,
            metrics: Default::default(),
            success: true,
            error: None,
        };
        assert!(check_completion(Some(status)).is_ok());
        assert!(check_completion(None).is_err());
    }

    #[test]
    fn sse_values_stop_after_terminal_event() {
        let chunks: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"status\":\"IN_QUEUE\"}\n\n")),
            Ok(Bytes::from_static(
                b"data: {\"status\":\"COMPLETED\"}\n\ndata: {\"status\":\"IN_QUEUE\"}\n\n",
            )),
        ];
        let events: Vec<Value> = tokio_test::block_on(
            sse_values(futures::stream::iter(chunks).boxed(), Duration::from_secs(5))
                .map(|e| e.unwrap())
                .collect(),
        );
        assert_eq!(
            events,
            vec![json!({"status": "IN_QUEUE"}), json!({"status": "COMPLETED"})]
        );
    }

    #[test]
    fn sse_values_fail_when_a_read_stalls() {
        let first: Vec<reqwest::Result<Bytes>> = vec![Ok(Bytes::from_static(
            b"data: {\"status\":\"IN_QUEUE\"}\n\n",
        ))];
        let chunks = futures::stream::iter(first).chain(futures::stream::pending());
        let events: Vec<Result<Value>> = tokio_test::block_on(
            sse_values(chunks.boxed(), Duration::from_millis(50)).collect(),
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap(), &json!({"status": "IN_QUEUE"}));
        assert!(events[1].as_ref().unwrap_err().is_timeout());
    }

    #[test]
    fn sse_values_flush_unterminated_frame() {
        let chunks: Vec<reqwest::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"data: {\"n\":1}"))];
        let events: Vec<Result<Value>> = tokio_test::block_on(
            sse_values(futures::stream::iter(chunks).boxed(), Duration::from_secs(5)).collect(),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &json!({"n": 1}));
    }
}
