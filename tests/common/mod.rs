//! Mock HTTP server setup for integration tests.
#![allow(dead_code)]

use mockito::ServerGuard;
use serde_json::{json, Value};
use sunra_client::{AsyncClient, ClientBuilder, SyncClient};

pub const API_KEY: &str = "test-key";
pub const REQUEST_ID: &str = "req-123";

pub fn queue_url(server: &ServerGuard) -> String {
    format!("{}/v1/queue/", server.url())
}

pub fn storage_url(server: &ServerGuard) -> String {
    format!("{}/v1/storage", server.url())
}

/// Builder pointed at the mock server, with an explicit key.
pub fn builder(server: &ServerGuard) -> ClientBuilder {
    ClientBuilder::new()
        .credentials(API_KEY)
        .base_urls(queue_url(server), storage_url(server))
}

pub fn async_client(server: &ServerGuard) -> AsyncClient {
    builder(server).build()
}

pub fn blocking_client(server: &ServerGuard) -> SyncClient {
    builder(server).build_blocking()
}

pub fn request_path(id: &str) -> String {
    format!("/v1/queue/requests/{}", id)
}

pub fn status_path(id: &str) -> String {
    format!("{}/status", request_path(id))
}

pub fn cancel_path(id: &str) -> String {
    format!("{}/cancel", request_path(id))
}

pub fn stream_path(id: &str) -> String {
    format!("{}/status/stream", request_path(id))
}

/// Body the queue returns for a submission.
pub fn submit_response(server: &ServerGuard, id: &str) -> String {
    let base = server.url();
    json!({
        "request_id": id,
        "response_url": format!("{}{}", base, request_path(id)),
        "status_url": format!("{}{}", base, status_path(id)),
        "cancel_url": format!("{}{}", base, cancel_path(id)),
    })
    .to_string()
}

pub fn queued(position: u64) -> String {
    json!({"status": "IN_QUEUE", "queue_position": position}).to_string()
}

pub fn in_progress(logs: &str) -> String {
    json!({"status": "IN_PROGRESS", "logs": logs}).to_string()
}

pub fn completed() -> String {
    json!({"status": "COMPLETED", "metrics": {"inference_time": 1.5}, "success": true})
        .to_string()
}

pub fn failed(error: Value) -> String {
    json!({"status": "COMPLETED", "success": false, "error": error}).to_string()
}

/// SSE body from a list of JSON events.
pub fn sse_body(events: &[Value]) -> String {
    events
        .iter()
        .map(|e| format!("data: {}\n\n", e))
        .collect::<Vec<_>>()
        .join("")
}
