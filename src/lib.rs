//! # sunra-client
//!
//! Client for the Sunra queue API: submit an application invocation, follow the
//! job through `Queued -> InProgress -> Completed`, and fetch its result.
//!
//! ## Overview
//!
//! - **Submission**: arguments go through the input transformer first, so local
//!   files, data URIs, readers and images are uploaded and replaced by URLs.
//! - **Polling**: a request handle polls the status URL until completion
//!   (`iter_events`), or follows the server-sent-events status stream (`stream`).
//! - **Retries**: statuses 408, 409, 429 and 5xx are retried immediately, up to
//!   three attempts in total.
//! - **Errors**: every failed HTTP call and every failed job surfaces as a
//!   normalized [`ClientError`] inside [`Error::Api`].
//!
//! Two flavours share the same semantics: [`AsyncClient`] (tokio) and
//! [`SyncClient`] (blocking).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use sunra_client::{AsyncClient, SubscribeOptions};
//!
//! #[tokio::main]
//! async fn main() -> sunra_client::Result<()> {
//!     let client = AsyncClient::with_credentials("your-api-key");
//!
//!     let result = client
//!         .subscribe(
//!             "black-forest-labs/flux-kontext-pro",
//!             json!({"prompt": "a cat"}),
//!             SubscribeOptions::new().on_queue_update(|status| println!("{:?}", status)),
//!         )
//!         .await?;
//!     println!("{:?}", result);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Clients, builder, request handles |
//! | [`transform`] | Input tree and upload-before-submit transformer |
//! | [`transport`] | Authenticated HTTP sessions with the retry wrapper |
//! | [`types`] | Job status and wire bodies |
//! | [`encoding`] | Data URI helpers and MIME guessing |
//! | [`auth`] | Credential resolution |
//! | [`config`] | Endpoints and process-wide configuration |

pub mod auth;
pub mod client;
pub mod config;
pub mod encoding;
pub mod transform;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use auth::{Credentials, CredentialsResolver, KeyEnv};
pub use client::{
    AsyncClient, AsyncRequestHandle, ClientBuilder, SseEvents, StatusEvents, StreamOptions,
    SubmitOptions, SubscribeOptions, SyncClient, SyncRequestHandle,
};
pub use config::{configure, configured_credentials, reset_configuration, Endpoints};
pub use encoding::{encode, encode_file, encode_image, DataUri};
pub use transform::{
    classify, EncodedImage, ImageLike, Input, InputKind, NamedReader, Readable,
};
pub use types::Status;

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{ClientError, Error, ErrorContext, RateLimit};
