//! Which failed responses are worth another attempt.

use reqwest::StatusCode;

/// Internal decision for how to proceed after a non-2xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry,
    Fail,
}

pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Status-keyed retry policy shared by the async and blocking transports.
///
/// Retries are immediate: the only pacing is the caller's own poll interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Timeouts, conflicts, rate limiting and server errors are worth another try.
    pub fn is_retryable(status: StatusCode) -> bool {
        matches!(status.as_u16(), 408 | 409 | 429) || status.is_server_error()
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed with `status`.
    pub fn decide(&self, status: StatusCode, attempt: u32) -> Decision {
        if Self::is_retryable(status) && attempt < self.max_attempts {
            Decision::Retry
        } else {
            Decision::Fail
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}
