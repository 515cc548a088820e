//! The blocking client. Mirrors [`super::AsyncClient`] call for call.

use crate::auth::{Credentials, KeyEnv};
use crate::client::builder::ClientBuilder;
use crate::client::handle::{SseEvents, SyncRequestHandle};
use crate::client::types::{submit_url, StreamOptions, SubmitOptions, SubscribeOptions};
use crate::transform::{
    content_type_or_default, file_name_or_default, transform, ImageLike, Input, Uploader,
};
use crate::transport::{BlockingTransport, TransportSettings};
use crate::types::{Status, SubmitResponse, UploadInitiateRequest, UploadInitiateResponse};
use crate::{Error, ErrorContext, Result};
use once_cell::sync::OnceCell;
use reqwest::Method;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Blocking queue client.
///
/// Same semantics as [`crate::AsyncClient`] on `reqwest::blocking`. Do not use it
/// from inside an async runtime.
pub struct SyncClient {
    credentials: Credentials,
    key_env: KeyEnv,
    settings: TransportSettings,
    transport: OnceCell<Arc<BlockingTransport>>,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.settings.endpoints)
            .field("connected", &self.transport.get().is_some())
            .finish()
    }
}

impl SyncClient {
    pub fn new() -> Self {
        ClientBuilder::new().build_blocking()
    }

    pub fn with_credentials(key: impl Into<String>) -> Self {
        ClientBuilder::new().credentials(key.into()).build_blocking()
    }

    pub(crate) fn from_parts(
        credentials: Credentials,
        key_env: KeyEnv,
        settings: TransportSettings,
    ) -> Self {
        Self {
            credentials,
            key_env,
            settings,
            transport: OnceCell::new(),
        }
    }

    pub fn transport(&self) -> Result<Arc<BlockingTransport>> {
        self.transport
            .get_or_try_init(|| {
                let key = self.credentials.resolve_with(&self.key_env)?;
                debug!(
                    queue_url = self.settings.endpoints.queue_url(),
                    "initializing blocking HTTP transport"
                );
                BlockingTransport::new(&key, &self.settings).map(Arc::new)
            })
            .cloned()
    }

    pub fn transform_input(&self, input: &mut Input) -> Result<Value> {
        transform(self, input)
    }

    pub fn submit(
        &self,
        application: &str,
        arguments: impl Into<Input>,
        options: SubmitOptions,
    ) -> Result<SyncRequestHandle> {
        let transport = self.transport()?;
        let mut input = arguments.into();
        let payload = self.transform_input(&mut input)?;
        let url = submit_url(transport.endpoints(), application, &options)?;

        let body = transport.execute_json(Method::POST, url.as_str(), Some(&payload), None)?;
        let resp: SubmitResponse = serde_json::from_value(body)?;
        info!(
            application,
            request_id = resp.request_id.as_str(),
            "request submitted"
        );
        Ok(SyncRequestHandle::from_submit(resp, transport))
    }

    /// See [`crate::AsyncClient::subscribe`].
    pub fn subscribe(
        &self,
        application: &str,
        arguments: impl Into<Input>,
        mut options: SubscribeOptions<'_>,
    ) -> Result<Option<Value>> {
        let on_error = options.on_error.take();
        match (self.run_subscription(application, arguments.into(), &mut options), on_error) {
            (Err(Error::Api(e)), Some(mut handler)) => {
                debug!(error = %e, "subscription failed; passing error to on_error");
                handler(e);
                Ok(None)
            }
            (outcome, _) => outcome.map(Some),
        }
    }

    fn run_subscription(
        &self,
        application: &str,
        arguments: Input,
        options: &mut SubscribeOptions<'_>,
    ) -> Result<Value> {
        let handle = self.submit(application, arguments, options.submit_options())?;

        if let Some(on_enqueue) = options.on_enqueue.as_mut() {
            on_enqueue(handle.request_id());
        }

        if let Some(on_queue_update) = options.on_queue_update.as_mut() {
            for status in handle.iter_events(options.poll_interval) {
                on_queue_update(&status?);
            }
        }

        handle.get()
    }

    pub fn stream(
        &self,
        application: &str,
        arguments: impl Into<Input>,
        options: StreamOptions,
    ) -> Result<SseEvents> {
        let submit = SubmitOptions {
            path: options.path.clone(),
            ..SubmitOptions::default()
        };
        let handle = self.submit(application, arguments, submit)?;
        handle.stream_status(options.timeout)
    }

    pub fn get_handle(&self, request_id: &str) -> Result<SyncRequestHandle> {
        Ok(SyncRequestHandle::from_request_id(self.transport()?, request_id))
    }

    pub fn status(&self, request_id: &str) -> Result<Status> {
        self.get_handle(request_id)?.status()
    }

    pub fn result(&self, request_id: &str) -> Result<Value> {
        self.get_handle(request_id)?.get()
    }

    pub fn cancel(&self, request_id: &str) -> Result<()> {
        self.get_handle(request_id)?.cancel()
    }

    pub fn upload(
        &self,
        data: impl Into<Vec<u8>>,
        content_type: &str,
        file_name: Option<&str>,
    ) -> Result<String> {
        let transport = self.transport()?;
        let content_type = content_type_or_default(content_type);
        let request = UploadInitiateRequest {
            content_type: content_type.to_string(),
            file_name: file_name_or_default(file_name).to_string(),
        };

        let body = serde_json::to_value(&request)?;
        let url = transport.endpoints().upload_initiate_url();
        let initiated: UploadInitiateResponse =
            serde_json::from_value(transport.execute_json(Method::POST, &url, Some(&body), None)?)?;
        if initiated.upload_url.is_empty() {
            return Err(Error::validation_with_context(
                "upload initiation returned no upload URL",
                ErrorContext::new()
                    .with_field_path("upload.upload_url")
                    .with_source("upload"),
            ));
        }

        let data = data.into();
        debug!(
            bytes = data.len(),
            content_type,
            file_name = request.file_name.as_str(),
            "uploading payload"
        );
        transport.put_signed(&initiated.upload_url, data, content_type)?;
        Ok(initiated.file_url)
    }

    pub fn upload_image(&self, image: &dyn ImageLike, format: &str) -> Result<String> {
        Uploader::upload_image(self, image, format)
    }

    pub fn upload_file(&self, path: impl AsRef<Path>) -> Result<String> {
        Uploader::upload_file(self, path.as_ref())
    }
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Uploader for SyncClient {
    fn upload(&self, data: Vec<u8>, content_type: &str, file_name: Option<&str>) -> Result<String> {
        SyncClient::upload(self, data, content_type, file_name)
    }
}
