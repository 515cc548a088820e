//! Job status as reported by the queue.

use crate::{Error, Result};
use serde_json::{Map, Value};

/// Status of a submitted request.
///
/// Transitions are linear: `Queued -> InProgress -> Completed`. `InProgress` may be
/// skipped when a job finishes between two polls. `Completed` is terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Waiting in the queue. `position` is 0-indexed.
    Queued { position: u64 },
    /// Running. Logs are only present when the request was submitted with logs enabled.
    InProgress { logs: Option<String> },
    /// Finished. `success == false` means `error` describes the failure.
    Completed {
        logs: Option<String>,
        metrics: Map<String, Value>,
        success: bool,
        error: Option<Value>,
    },
}

pub const STATUS_IN_QUEUE: &str = "IN_QUEUE";
pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const STATUS_COMPLETED: &str = "COMPLETED";

impl Status {
    /// Parse a status response body using its `status` discriminator.
    pub fn from_json(data: &Value) -> Result<Self> {
        let logs = || data.get("logs").and_then(Value::as_str).map(str::to_string);
        match data.get("status").and_then(Value::as_str) {
            Some(STATUS_IN_QUEUE) => Ok(Status::Queued {
                position: data
                    .get("queue_position")
                    .and_then(Value::as_u64)
                    .unwrap_or(0),
            }),
            Some(STATUS_IN_PROGRESS) => Ok(Status::InProgress { logs: logs() }),
            Some(STATUS_COMPLETED) => Ok(Status::Completed {
                logs: logs(),
                metrics: data
                    .get("metrics")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
                success: data.get("success").and_then(Value::as_bool).unwrap_or(true),
                error: data.get("error").filter(|e| !e.is_null()).cloned(),
            }),
            Some(other) => Err(Error::UnknownStatus(other.to_string())),
            None => Err(Error::UnknownStatus(
                data.get("status")
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "<missing>".to_string()),
            )),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Status::Completed { .. })
    }

    pub fn logs(&self) -> Option<&str> {
        match self {
            Status::Queued { .. } => None,
            Status::InProgress { logs } | Status::Completed { logs, .. } => logs.as_deref(),
        }
    }
}

/// Terminal `status` values on the push-based status stream.
pub const TERMINAL_STREAM_STATUSES: [&str; 3] = ["COMPLETED", "FAILED", "CANCELLED"];

pub(crate) fn is_terminal_stream_event(event: &Value) -> bool {
    event
        .get("status")
        .and_then(Value::as_str)
        .map(|s| TERMINAL_STREAM_STATUSES.contains(&s))
        .unwrap_or(false)
}
