//! Normalization of non-2xx responses into [`ClientError`].

use crate::error::{ClientError, RateLimit};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::{json, Value};

const REQUEST_ID_HEADER: &str = "x-request-id";
const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// All three rate-limit headers must be present and integer-parseable.
pub(crate) fn rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimit> {
    let parse = |name| header_str(headers, name)?.parse::<i64>().ok();
    Some(RateLimit {
        limit: parse(RATE_LIMIT_LIMIT)?,
        remaining: parse(RATE_LIMIT_REMAINING)?,
        reset: parse(RATE_LIMIT_RESET)?,
    })
}

/// Strings pass through, other JSON scalars are rendered.
fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn present(v: Option<&Value>) -> Option<Value> {
    v.filter(|v| !v.is_null()).cloned()
}

/// Build a [`ClientError`] from a failed response.
///
/// Understands the nested `{"error": {...}}` envelope, the legacy flat body
/// (`detail`/`code`/...) and non-JSON bodies. Never fails.
pub(crate) fn normalize(status: StatusCode, headers: &HeaderMap, body: &str) -> ClientError {
    let status_code = status.as_u16().to_string();

    let mut err = match serde_json::from_str::<Value>(body) {
        Ok(data) => match data.get("error").and_then(Value::as_object) {
            Some(error) => ClientError {
                message: error
                    .get("message")
                    .and_then(as_text)
                    .unwrap_or_else(|| "Request failed".to_string()),
                code: Some(error.get("code").and_then(as_text).unwrap_or(status_code)),
                error_type: error.get("type").and_then(as_text),
                details: present(error.get("details")),
                timestamp: data.get("timestamp").and_then(as_text),
                ..ClientError::default()
            },
            None => ClientError {
                message: data
                    .get("detail")
                    .and_then(as_text)
                    .unwrap_or_else(|| body.to_string()),
                code: Some(data.get("code").and_then(as_text).unwrap_or(status_code)),
                error_type: data.get("type").and_then(as_text),
                details: present(data.get("details")),
                timestamp: data.get("timestamp").and_then(as_text),
                ..ClientError::default()
            },
        },
        Err(_) => ClientError {
            message: if body.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                body.to_string()
            },
            code: Some(status_code),
            error_type: Some("network_error".to_string()),
            details: Some(json!({
                "status_code": status.as_u16(),
                "response_text": body,
            })),
            ..ClientError::default()
        },
    };

    err.request_id = header_str(headers, REQUEST_ID_HEADER).map(str::to_string);
    err.rate_limit = rate_limit_from_headers(headers);
    err
}

/// Turn the `error` payload of a `Completed { success: false }` status into a [`ClientError`].
pub(crate) fn job_failure(error: Option<&Value>) -> ClientError {
    let field = |name: &str| error.and_then(|e| e.get(name));
    ClientError {
        message: field("message")
            .and_then(as_text)
            .unwrap_or_else(|| "Request failed".to_string()),
        code: field("code").and_then(as_text),
        details: present(field("details")),
        timestamp: field("timestamp").and_then(as_text),
        ..ClientError::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn nested_error_envelope() {
        let body = r#"{"error":{"message":"Bad prompt","code":"INVALID_INPUT","type":"validation_error","details":{"field":"prompt"}},"timestamp":"2025-01-01T00:00:00Z"}"#;
        let e = normalize(StatusCode::BAD_REQUEST, &HeaderMap::new(), body);
        assert_eq!(e.message, "Bad prompt");
        assert_eq!(e.code.as_deref(), Some("INVALID_INPUT"));
        assert_eq!(e.error_type.as_deref(), Some("validation_error"));
        assert_eq!(e.details.unwrap()["field"], "prompt");
        assert_eq!(e.timestamp.as_deref(), Some("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn nested_error_defaults_code_to_status() {
        let e = normalize(
            StatusCode::UNPROCESSABLE_ENTITY,
            &HeaderMap::new(),
            r#"{"error":{"message":"nope"}}"#,
        );
        assert_eq!(e.code.as_deref(), Some("422"));
        assert!(e.error_type.is_none());
    }

    #[test]
    fn legacy_flat_body() {
        let e = normalize(
            StatusCode::NOT_FOUND,
            &HeaderMap::new(),
            r#"{"detail":"Application not found","type":"not_found"}"#,
        );
        assert_eq!(e.message, "Application not found");
        assert_eq!(e.code.as_deref(), Some("404"));
        assert_eq!(e.error_type.as_deref(), Some("not_found"));
    }

    #[test]
    fn flat_body_without_detail_uses_raw_text() {
        let body = r#"{"code":"QUOTA"}"#;
        let e = normalize(StatusCode::FORBIDDEN, &HeaderMap::new(), body);
        assert_eq!(e.message, body);
        assert_eq!(e.code.as_deref(), Some("QUOTA"));
    }

    #[test]
    fn non_json_body_is_network_error() {
        let e = normalize(StatusCode::BAD_GATEWAY, &HeaderMap::new(), "upstream down");
        assert_eq!(e.message, "upstream down");
        assert_eq!(e.code.as_deref(), Some("502"));
        assert_eq!(e.error_type.as_deref(), Some("network_error"));
        let details = e.details.unwrap();
        assert_eq!(details["status_code"], 502);
        assert_eq!(details["response_text"], "upstream down");
    }

    #[test]
    fn empty_body_reports_http_status() {
        let e = normalize(StatusCode::SERVICE_UNAVAILABLE, &HeaderMap::new(), "");
        assert_eq!(e.message, "HTTP 503");
    }

    #[test]
    fn request_id_and_rate_limit_headers() {
        let h = headers(&[
            ("x-request-id", "req-123"),
            ("x-ratelimit-limit", "100"),
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", "1700000000"),
        ]);
        let e = normalize(StatusCode::TOO_MANY_REQUESTS, &h, r#"{"detail":"slow down"}"#);
        assert_eq!(e.request_id.as_deref(), Some("req-123"));
        assert_eq!(
            e.rate_limit,
            Some(RateLimit {
                limit: 100,
                remaining: 0,
                reset: 1700000000
            })
        );
    }

    #[test]
    fn malformed_rate_limit_headers_are_ignored() {
        let h = headers(&[
            ("x-ratelimit-limit", "100"),
            ("x-ratelimit-remaining", "lots"),
            ("x-ratelimit-reset", "1700000000"),
        ]);
        let e = normalize(StatusCode::TOO_MANY_REQUESTS, &h, "");
        assert!(e.rate_limit.is_none());

        let partial = headers(&[("x-ratelimit-limit", "100")]);
        assert!(rate_limit_from_headers(&partial).is_none());
    }

    #[test]
    fn job_failure_passes_fields_through() {
        let payload = serde_json::json!({
            "message": "X",
            "code": "E1",
            "details": {"reason": "nsfw"},
            "timestamp": "t0"
        });
        let e = job_failure(Some(&payload));
        assert_eq!(e.message, "X");
        assert_eq!(e.code.as_deref(), Some("E1"));
        assert_eq!(e.details.unwrap()["reason"], "nsfw");
        assert_eq!(e.timestamp.as_deref(), Some("t0"));
    }

    #[test]
    fn job_failure_without_payload() {
        let e = job_failure(None);
        assert_eq!(e.message, "Request failed");
        assert!(e.code.is_none());
    }
}
