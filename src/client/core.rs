//! The async client: submission, subscription, streaming and uploads.

use crate::auth::{Credentials, KeyEnv};
use crate::client::builder::ClientBuilder;
use crate::client::handle::AsyncRequestHandle;
use crate::client::types::{submit_url, StreamOptions, SubmitOptions, SubscribeOptions};
use crate::transform::{
    content_type_or_default, file_name_or_default, transform_async, AsyncUploader, ImageLike,
    Input,
};
use crate::transport::{HttpTransport, TransportSettings};
use crate::types::{Status, SubmitResponse, UploadInitiateRequest, UploadInitiateResponse};
use crate::{BoxStream, Error, ErrorContext, Result};
use futures::StreamExt;
use once_cell::sync::OnceCell;
use reqwest::Method;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Async queue client.
///
/// The transport (and with it the resolved credential) is created on first use
/// and reused for the lifetime of the client. Cloning the client is not supported;
/// share it behind an `Arc` instead.
pub struct AsyncClient {
    credentials: Credentials,
    key_env: KeyEnv,
    settings: TransportSettings,
    transport: OnceCell<Arc<HttpTransport>>,
}

impl std::fmt::Debug for AsyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncClient")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.settings.endpoints)
            .field("connected", &self.transport.get().is_some())
            .finish()
    }
}

impl AsyncClient {
    /// Client configured from the environment.
    pub fn new() -> Self {
        ClientBuilder::new().build()
    }

    pub fn with_credentials(key: impl Into<String>) -> Self {
        ClientBuilder::new().credentials(key.into()).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
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

    /// The memoized transport, built on first call.
    pub fn transport(&self) -> Result<Arc<HttpTransport>> {
        self.transport
            .get_or_try_init(|| {
                let key = self.credentials.resolve_with(&self.key_env)?;
                debug!(
                    queue_url = self.settings.endpoints.queue_url(),
                    "initializing HTTP transport"
                );
                HttpTransport::new(&key, &self.settings).map(Arc::new)
            })
            .cloned()
    }

    /// Upload every binary payload in `input` and return the rewritten tree.
    pub async fn transform_input(&self, input: &mut Input) -> Result<Value> {
        transform_async(self, input).await
    }

    /// Transform `arguments`, submit them to `application` and return the handle.
    pub async fn submit(
        &self,
        application: &str,
        arguments: impl Into<Input>,
        options: SubmitOptions,
    ) -> Result<AsyncRequestHandle> {
        let transport = self.transport()?;
        let mut input = arguments.into();
        let payload = self.transform_input(&mut input).await?;
        let url = submit_url(transport.endpoints(), application, &options)?;

        let body = transport
            .execute_json(Method::POST, url.as_str(), Some(&payload), None)
            .await?;
        let resp: SubmitResponse = serde_json::from_value(body)?;
        info!(
            application,
            request_id = resp.request_id.as_str(),
            "request submitted"
        );
        Ok(AsyncRequestHandle::from_submit(resp, transport))
    }

    /// Submit, wait for completion and return the result.
    ///
    /// Resolves to `Ok(None)` only when an `on_error` callback consumed an API error.
    pub async fn subscribe(
        &self,
        application: &str,
        arguments: impl Into<Input>,
        mut options: SubscribeOptions<'_>,
    ) -> Result<Option<Value>> {
        let on_error = options.on_error.take();
        let outcome = self
            .run_subscription(application, arguments.into(), &mut options)
            .await;
        match (outcome, on_error) {
            (Err(Error::Api(e)), Some(mut handler)) => {
                debug!(error = %e, "subscription failed; passing error to on_error");
                handler(e);
                Ok(None)
            }
            (outcome, _) => outcome.map(Some),
        }
    }

    async fn run_subscription(
        &self,
        application: &str,
        arguments: Input,
        options: &mut SubscribeOptions<'_>,
    ) -> Result<Value> {
        let handle = self
            .submit(application, arguments, options.submit_options())
            .await?;

        if let Some(on_enqueue) = options.on_enqueue.as_mut() {
            on_enqueue(handle.request_id());
        }

        if let Some(on_queue_update) = options.on_queue_update.as_mut() {
            let mut events = handle.iter_events(options.poll_interval);
            while let Some(status) = events.next().await {
                on_queue_update(&status?);
            }
        }

        handle.get().await
    }

    /// Submit and follow the push-based status stream.
    pub async fn stream(
        &self,
        application: &str,
        arguments: impl Into<Input>,
        options: StreamOptions,
    ) -> Result<BoxStream<'static, Value>> {
        let submit = SubmitOptions {
            path: options.path.clone(),
            ..SubmitOptions::default()
        };
        let handle = self.submit(application, arguments, submit).await?;
        handle.stream_status(options.timeout).await
    }

    /// Handle for a request submitted earlier.
    pub fn get_handle(&self, request_id: &str) -> Result<AsyncRequestHandle> {
        Ok(AsyncRequestHandle::from_request_id(
            self.transport()?,
            request_id,
        ))
    }

    pub async fn status(&self, request_id: &str) -> Result<Status> {
        self.get_handle(request_id)?.status().await
    }

    pub async fn result(&self, request_id: &str) -> Result<Value> {
        self.get_handle(request_id)?.get().await
    }

    pub async fn cancel(&self, request_id: &str) -> Result<()> {
        self.get_handle(request_id)?.cancel().await
    }

    /// Two-phase upload: obtain a signed URL, PUT the bytes there, return the public URL.
    pub async fn upload(
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
        let initiated: UploadInitiateResponse = serde_json::from_value(
            transport
                .execute_json(Method::POST, &url, Some(&body), None)
                .await?,
        )?;
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
        transport
            .put_signed(&initiated.upload_url, data, content_type)
            .await?;
        Ok(initiated.file_url)
    }

    /// Encode `image` as `format` and upload it as `image/<format>`.
    pub async fn upload_image(&self, image: &dyn ImageLike, format: &str) -> Result<String> {
        AsyncUploader::upload_image(self, image, format).await
    }

    /// Upload a local file; the MIME type is guessed from its extension.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<String> {
        AsyncUploader::upload_file(self, path.as_ref()).await
    }
}

impl Default for AsyncClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AsyncUploader for AsyncClient {
    async fn upload(
        &self,
        data: Vec<u8>,
        content_type: &str,
        file_name: Option<&str>,
    ) -> Result<String> {
        AsyncClient::upload(self, data, content_type, file_name).await
    }
}
