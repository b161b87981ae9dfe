//! HTTP client for the Data Service.
//!
//! This module provides the reqwest-backed [`DataService`] with:
//! - Connection pooling and TCP keepalive
//! - Optional HTTP Basic credentials
//! - Retry with exponential backoff on 429, for catalog reads only
//! - No retry for submissions; the caller decides whether to resubmit

use crate::service::{BboxRequest, ProcessingStatus, SubmissionRequest, SubmissionResponse};
use crate::{
    BoundingBox, CatalogSource, DataService, ServiceConfig, ServiceError, SessionRef, WeatherReport,
};
use base64::Engine;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Keys whose presence marks a response body as a catalog payload.
const CATALOG_KEYS: &[&str] = &["trails", "roads", "trailheads", "pois"];

/// Backoff before retry `attempt` (1-based): 500ms, 1s, 2s, 4s max.
fn backoff_for(attempt: u32) -> Duration {
    Duration::from_millis(500 * (1 << attempt.saturating_sub(1).min(3)))
}

fn is_catalog(body: &Value) -> bool {
    body.as_object()
        .map_or(false, |o| CATALOG_KEYS.iter().any(|k| o.contains_key(*k)))
}

/// Data Service reached over HTTP.
pub struct HttpDataService {
    client: Client,
    config: ServiceConfig,
    auth_header: Option<String>,
}

impl HttpDataService {
    /// Create a client for the configured Data Service.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let auth_header = config.api_key.as_deref().map(|key| {
            let encoded = base64::engine::general_purpose::STANDARD.encode(format!("API_KEY:{}", key));
            format!("Basic {}", encoded)
        });

        Ok(Self { client, config, auth_header })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_header {
            Some(auth) => request.header("Authorization", auth),
            None => request,
        }
    }

    /// Read a JSON body, turning `{error}` bodies and failed statuses into errors.
    async fn read_json(response: reqwest::Response) -> Result<Value, ServiceError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(format!("Body download error: {}", e)))?;

        let body: Option<Value> = serde_json::from_slice(&bytes).ok();
        let backend_error = body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(message) = backend_error {
            return Err(ServiceError::Backend(message));
        }
        if !status.is_success() {
            return Err(ServiceError::Status { status: status.as_u16() });
        }
        body.ok_or_else(|| ServiceError::Decode(format!("{} byte body is not JSON", bytes.len())))
    }

    /// Send a read request, retrying on 429 up to `max_retries` times.
    async fn send_with_retry<F>(&self, label: &str, build: F) -> Result<Value, ServiceError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let req_start = Instant::now();

        loop {
            let response = self
                .authorized(build())
                .send()
                .await
                .map_err(|e| ServiceError::Transport(format!("Request error: {}", e)))?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > self.config.max_retries {
                    return Err(ServiceError::Status { status: StatusCode::TOO_MANY_REQUESTS.as_u16() });
                }
                let wait = backoff_for(retries);
                warn!("[HttpDataService] {} got 429, retry {} after {:?}", label, retries, wait);
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = Self::read_json(response).await;
            debug!("[HttpDataService] {} finished in {:?}", label, req_start.elapsed());
            return body;
        }
    }

    async fn fetch_saved(&self, session: &SessionRef) -> Result<Value, ServiceError> {
        let url = self.config.url(&self.config.saved_catalog_path);
        self.send_with_retry("saved catalog", || {
            let request = self.client.get(&url);
            match &session.0 {
                Some(id) => request.query(&[("session", id.as_str())]),
                None => request,
            }
        })
        .await
    }

    async fn fetch_for_bbox(&self, bbox: &BoundingBox) -> Result<Value, ServiceError> {
        let url = self.config.url(&self.config.fetch_catalog_path);
        let body = BboxRequest::from(bbox);
        info!("[HttpDataService] Fetching catalog for bbox {:?}", body.bbox);

        let response = self
            .send_with_retry("bbox catalog", || self.client.post(&url).json(&body))
            .await?;

        if is_catalog(&response) {
            return Ok(response);
        }
        // The server stored the fetch and points at the saved-session page
        if let Some(redirect) = response.get("redirect").and_then(Value::as_str) {
            debug!("[HttpDataService] Catalog stored server-side ({}), reading saved session", redirect);
            return self.fetch_saved(&SessionRef::latest()).await;
        }
        Ok(response)
    }
}

impl DataService for HttpDataService {
    fn fetch_catalog<'a>(
        &'a self,
        source: &'a CatalogSource,
    ) -> BoxFuture<'a, Result<Value, ServiceError>> {
        async move {
            match source {
                CatalogSource::BoundingBox(bbox) => self.fetch_for_bbox(bbox).await,
                CatalogSource::SavedSession(session) => self.fetch_saved(session).await,
            }
        }
        .boxed()
    }

    fn submit_selection<'a>(
        &'a self,
        request: &'a SubmissionRequest,
    ) -> BoxFuture<'a, Result<SubmissionResponse, ServiceError>> {
        async move {
            let url = self.config.url(&self.config.submit_path);
            let response = self
                .authorized(self.client.post(&url).json(request))
                .send()
                .await
                .map_err(|e| ServiceError::Transport(format!("Request error: {}", e)))?;

            let body = Self::read_json(response).await?;
            serde_json::from_value(body).map_err(|e| ServiceError::Decode(e.to_string()))
        }
        .boxed()
    }

    fn fetch_weather<'a>(
        &'a self,
        bbox: &'a BoundingBox,
    ) -> BoxFuture<'a, Result<WeatherReport, ServiceError>> {
        async move {
            let url = self.config.url(&self.config.weather_path);
            let body = BboxRequest::from(bbox);
            let response = self
                .send_with_retry("weather", || self.client.post(&url).json(&body))
                .await?;
            serde_json::from_value(response).map_err(|e| ServiceError::Decode(e.to_string()))
        }
        .boxed()
    }

    fn processing_status<'a>(
        &'a self,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<ProcessingStatus, ServiceError>> {
        async move {
            let url = self.config.url(&format!(
                "{}/{}",
                self.config.status_path.trim_end_matches('/'),
                session_id
            ));
            let response = self.send_with_retry("status", || self.client.get(&url)).await?;
            serde_json::from_value(response).map_err(|e| ServiceError::Decode(e.to_string()))
        }
        .boxed()
    }
}
