//! Process-wide credential configuration.
//!
//! Kept in its own test binary because it mutates global state.

mod common;

use common::*;
use mockito::Server;
use sunra_client::{configure, configured_credentials, reset_configuration, ClientBuilder};

#[tokio::test]
async fn configured_key_is_memoized_per_client() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", status_path(REQUEST_ID).as_str())
        .match_header("authorization", "Bearer first-key")
        .with_body(queued(0))
        .expect(2)
        .create_async()
        .await;
    let second = server
        .mock("GET", status_path(REQUEST_ID).as_str())
        .match_header("authorization", "Bearer second-key")
        .with_body(queued(0))
        .expect(1)
        .create_async()
        .await;

    configure("first-key");
    assert_eq!(configured_credentials().as_deref(), Some("first-key"));
    let client = ClientBuilder::new()
        .base_urls(queue_url(&server), storage_url(&server))
        .build();
    client.status(REQUEST_ID).await.unwrap();

    // Reconfiguring does not affect a client that already built its transport.
    configure("second-key");
    client.status(REQUEST_ID).await.unwrap();

    let fresh = ClientBuilder::new()
        .base_urls(queue_url(&server), storage_url(&server))
        .build();
    fresh.status(REQUEST_ID).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;

    // An explicit key still wins over the configured one.
    let explicit = async_client(&server);
    assert!(explicit.status(REQUEST_ID).await.is_err());

    reset_configuration();
    assert!(configured_credentials().is_none());
}
