//! Core data types: job status and the wire bodies of the queue/storage APIs.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Status`] | Queued / InProgress / Completed job state |
//! | [`SubmitResponse`] | Identifiers and URLs returned by a submission |
//! | [`UploadInitiateRequest`] / [`UploadInitiateResponse`] | Two-phase upload handshake |

pub mod status;
pub mod wire;

pub use status::{Status, TERMINAL_STREAM_STATUSES};
pub use wire::{SubmitResponse, UploadInitiateRequest, UploadInitiateResponse};
