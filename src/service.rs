//! The Data Service seam and its wire types.
//!
//! Endpoints (see [`ServiceConfig`](crate::ServiceConfig) for paths):
//! - catalog retrieval for a bounding box or a saved session, answering an
//!   object with `trails`, `roads`, `trailheads` and/or `pois` collections
//! - route submission: `{"selected_segments": [...]}` → `{"redirect": ...}`
//! - weather lookup: `{"bbox": [minLon, minLat, maxLon, maxLat]}`
//! - processing status: `{"done": bool}`

use crate::{BoundingBox, DomainId, ServiceError, WeatherReport};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a catalog comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    /// Fetch geometry intersecting a drawn area of interest.
    BoundingBox(BoundingBox),
    /// Re-read a previously fetched and saved catalog.
    SavedSession(SessionRef),
}

/// Reference to a saved catalog; `None` means the most recent one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionRef(pub Option<String>);

impl SessionRef {
    pub fn latest() -> Self {
        SessionRef(None)
    }

    pub fn named(id: impl Into<String>) -> Self {
        SessionRef(Some(id.into()))
    }
}

/// Body of a bounding-box catalog request (and of a weather request).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BboxRequest {
    pub bbox: [f64; 4],
}

impl From<&BoundingBox> for BboxRequest {
    fn from(bbox: &BoundingBox) -> Self {
        Self { bbox: bbox.as_array() }
    }
}

/// Body of a route submission.
///
/// Only `selected_segments` is emitted; the legacy `selected_trails` key is
/// not supported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionRequest {
    pub selected_segments: Vec<DomainId>,
}

/// Response to a route submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of the processing status endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingStatus {
    #[serde(default)]
    pub done: bool,
}

/// Backend reached by the loader, the submission gateway and the weather client.
///
/// Implementations report transport and protocol failures as [`ServiceError`];
/// interpreting payloads is left to the callers.
pub trait DataService: Send + Sync {
    /// Retrieve the raw catalog payload for a source.
    fn fetch_catalog<'a>(
        &'a self,
        source: &'a CatalogSource,
    ) -> BoxFuture<'a, Result<serde_json::Value, ServiceError>>;

    /// Submit the committed selection for route processing.
    fn submit_selection<'a>(
        &'a self,
        request: &'a SubmissionRequest,
    ) -> BoxFuture<'a, Result<SubmissionResponse, ServiceError>>;

    /// Current weather for an area.
    fn fetch_weather<'a>(
        &'a self,
        bbox: &'a BoundingBox,
    ) -> BoxFuture<'a, Result<WeatherReport, ServiceError>>;

    /// Whether route processing for a session has finished.
    fn processing_status<'a>(
        &'a self,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<ProcessingStatus, ServiceError>>;
}

impl<T: DataService + ?Sized> DataService for Arc<T> {
    fn fetch_catalog<'a>(
        &'a self,
        source: &'a CatalogSource,
    ) -> BoxFuture<'a, Result<serde_json::Value, ServiceError>> {
        (**self).fetch_catalog(source)
    }

    fn submit_selection<'a>(
        &'a self,
        request: &'a SubmissionRequest,
    ) -> BoxFuture<'a, Result<SubmissionResponse, ServiceError>> {
        (**self).submit_selection(request)
    }

    fn fetch_weather<'a>(
        &'a self,
        bbox: &'a BoundingBox,
    ) -> BoxFuture<'a, Result<WeatherReport, ServiceError>> {
        (**self).fetch_weather(bbox)
    }

    fn processing_status<'a>(
        &'a self,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<ProcessingStatus, ServiceError>> {
        (**self).processing_status(session_id)
    }
}

/// In-memory Data Service used by the unit tests of the other modules.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct FakeService {
        pub catalog: Mutex<Option<Result<serde_json::Value, ServiceError>>>,
        pub submission: Mutex<Option<Result<SubmissionResponse, ServiceError>>>,
        pub weather: Mutex<Option<Result<WeatherReport, ServiceError>>>,
        pub status: Mutex<Option<Result<ProcessingStatus, ServiceError>>>,
        pub catalog_calls: Mutex<Vec<CatalogSource>>,
        pub submitted: Mutex<Vec<SubmissionRequest>>,
    }

    impl FakeService {
        pub fn with_catalog(payload: serde_json::Value) -> Self {
            let service = Self::default();
            service.set_catalog(Ok(payload));
            service
        }

        pub fn set_catalog(&self, result: Result<serde_json::Value, ServiceError>) {
            *self.catalog.lock().unwrap() = Some(result);
        }

        pub fn set_submission(&self, result: Result<SubmissionResponse, ServiceError>) {
            *self.submission.lock().unwrap() = Some(result);
        }

        pub fn submission_count(&self) -> usize {
            self.submitted.lock().unwrap().len()
        }
    }

    fn unconfigured() -> ServiceError {
        ServiceError::Transport("no response configured".into())
    }

    impl DataService for FakeService {
        fn fetch_catalog<'a>(
            &'a self,
            source: &'a CatalogSource,
        ) -> BoxFuture<'a, Result<serde_json::Value, ServiceError>> {
            self.catalog_calls.lock().unwrap().push(source.clone());
            let result = self.catalog.lock().unwrap().clone().unwrap_or_else(|| Err(unconfigured()));
            async move { result }.boxed()
        }

        fn submit_selection<'a>(
            &'a self,
            request: &'a SubmissionRequest,
        ) -> BoxFuture<'a, Result<SubmissionResponse, ServiceError>> {
            self.submitted.lock().unwrap().push(request.clone());
            let result = self.submission.lock().unwrap().clone().unwrap_or_else(|| Err(unconfigured()));
            async move { result }.boxed()
        }

        fn fetch_weather<'a>(
            &'a self,
            _bbox: &'a BoundingBox,
        ) -> BoxFuture<'a, Result<WeatherReport, ServiceError>> {
            let result = self.weather.lock().unwrap().clone().unwrap_or_else(|| Err(unconfigured()));
            async move { result }.boxed()
        }

        fn processing_status<'a>(
            &'a self,
            _session_id: &'a str,
        ) -> BoxFuture<'a, Result<ProcessingStatus, ServiceError>> {
            let result = self.status.lock().unwrap().clone().unwrap_or_else(|| Err(unconfigured()));
            async move { result }.boxed()
        }
    }
}
