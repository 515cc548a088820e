//! Queue clients.
//!
//! Keep the public surface small and predictable: [`ClientBuilder`] produces
//! either an [`AsyncClient`] (tokio + `reqwest::Client`) or a [`SyncClient`]
//! (`reqwest::blocking`). Both share the same request lifecycle, retry policy and
//! error normalization; only the I/O flavour differs.

pub mod blocking;
pub mod builder;
pub mod core;
pub(crate) mod error_classification;
pub mod handle;
pub(crate) mod policy;
pub mod types;

pub use blocking::SyncClient;
pub use builder::ClientBuilder;
pub use self::core::AsyncClient;
pub use handle::{AsyncRequestHandle, SseEvents, StatusEvents, SyncRequestHandle};
pub use types::{StreamOptions, SubmitOptions, SubscribeOptions, DEFAULT_POLL_INTERVAL};
