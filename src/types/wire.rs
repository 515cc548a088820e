//! Request/response bodies exchanged with the queue and storage APIs.

use serde::{Deserialize, Serialize};

/// Body returned by a queue submission.
///
/// Missing fields deserialize to empty strings; an empty URL is rejected when
/// the handle first uses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitResponse {
    pub request_id: String,
    pub response_url: String,
    pub status_url: String,
    pub cancel_url: String,
}

/// Body sent to the storage upload initiation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadInitiateRequest {
    pub content_type: String,
    pub file_name: String,
}

/// Signed upload target plus the public URL the file will be served from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadInitiateResponse {
    pub upload_url: String,
    pub file_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_response_fields_default_to_empty() {
        let r: SubmitResponse = serde_json::from_str(r#"{"request_id":"abc"}"#).unwrap();
        assert_eq!(r.request_id, "abc");
        assert!(r.status_url.is_empty());
        assert!(r.cancel_url.is_empty());
    }

    #[test]
    fn initiate_request_serializes_snake_case() {
        let body = serde_json::to_value(UploadInitiateRequest {
            content_type: "text/plain".into(),
            file_name: "a.txt".into(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"content_type": "text/plain", "file_name": "a.txt"})
        );
    }
}
