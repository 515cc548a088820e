use crate::config::Endpoints;
use crate::error::{ClientError, ErrorContext};
use crate::types::Status;
use crate::{Error, Result};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Pause between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for a queue submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Sub-path appended to the application URL.
    pub path: Option<String>,
    /// Endpoint the server notifies on completion.
    pub webhook_url: Option<String>,
    /// Ask the server to collect logs (`logs=1`). Defaults to true.
    pub with_logs: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            path: None,
            webhook_url: None,
            with_logs: true,
        }
    }
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_logs(mut self, enable: bool) -> Self {
        self.with_logs = enable;
        self
    }
}

type EnqueueCallback<'a> = Box<dyn FnMut(&str) + Send + 'a>;
type QueueUpdateCallback<'a> = Box<dyn FnMut(&Status) + Send + 'a>;
type ErrorCallback<'a> = Box<dyn FnMut(ClientError) + Send + 'a>;

/// Options and callbacks for `subscribe`.
///
/// When `on_error` is set, an API error ([`Error::Api`]) is handed to it and the
/// call resolves to `None` instead of failing. Other errors still propagate.
pub struct SubscribeOptions<'a> {
    pub path: Option<String>,
    pub with_logs: bool,
    pub poll_interval: Duration,
    pub(crate) on_enqueue: Option<EnqueueCallback<'a>>,
    pub(crate) on_queue_update: Option<QueueUpdateCallback<'a>>,
    pub(crate) on_error: Option<ErrorCallback<'a>>,
}

impl Default for SubscribeOptions<'_> {
    fn default() -> Self {
        Self {
            path: None,
            with_logs: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            on_enqueue: None,
            on_queue_update: None,
            on_error: None,
        }
    }
}

impl<'a> SubscribeOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_logs(mut self, enable: bool) -> Self {
        self.with_logs = enable;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Called once with the request id right after submission.
    pub fn on_enqueue(mut self, f: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_enqueue = Some(Box::new(f));
        self
    }

    /// Called for every polled status, including the final `Completed`.
    pub fn on_queue_update(mut self, f: impl FnMut(&Status) + Send + 'a) -> Self {
        self.on_queue_update = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(ClientError) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            path: self.path.clone(),
            webhook_url: None,
            with_logs: self.with_logs,
        }
    }
}

impl fmt::Debug for SubscribeOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeOptions")
            .field("path", &self.path)
            .field("with_logs", &self.with_logs)
            .field("poll_interval", &self.poll_interval)
            .field("on_enqueue", &self.on_enqueue.is_some())
            .field("on_queue_update", &self.on_queue_update.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Options for `stream`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    pub path: Option<String>,
    /// Limit on opening the event stream and on each read from it; the stream as a
    /// whole has no deadline. The client default applies when unset.
    pub timeout: Option<Duration>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// `<queue>/<application>[/<path>]?logs=0|1[&webhook=<url>]`
pub(crate) fn submit_url(
    endpoints: &Endpoints,
    application: &str,
    options: &SubmitOptions,
) -> Result<Url> {
    let base = endpoints.application_url(application, options.path.as_deref());
    let mut url = Url::parse(&base).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid submission URL: {}", base),
            ErrorContext::new()
                .with_field_path("application")
                .with_details(e.to_string())
                .with_source("submit"),
        )
    })?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("logs", if options.with_logs { "1" } else { "0" });
        if let Some(webhook) = options.webhook_url.as_deref().filter(|w| !w.is_empty()) {
            query.append_pair("webhook", webhook);
        }
    }
    Ok(url)
}
