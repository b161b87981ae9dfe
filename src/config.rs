//! Configuration for attribute extraction and the Data Service client.

use crate::{DomainId, SegmentKind};
use serde_json::{Map, Value};
use std::time::Duration;

/// Ordered attribute-name fallbacks used to normalize feature properties.
///
/// Each list is searched front to back; the first attribute holding a usable
/// value wins.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    /// Attributes holding the stable object identifier.
    /// Default: `OBJECTID`, `objectid`, `ID`, `id`
    pub id_fields: Vec<String>,

    /// Attributes holding a human label.
    /// Default: `TRAIL_NAME`, `NAME`, `name`, `PUBLIC_SITE_NAME`
    pub name_fields: Vec<String>,

    /// Attributes holding the measured length in miles.
    /// Default: `GIS_MILES`, `miles`, `distance`
    pub distance_fields: Vec<String>,

    /// Attribute keying the trail paint table. Default: `Difficulty`
    pub difficulty_field: String,

    /// Attribute keying the POI paint table. Default: `SITE_SUBTYPE`
    pub subtype_field: String,
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self {
            id_fields: vec!["OBJECTID".into(), "objectid".into(), "ID".into(), "id".into()],
            name_fields: vec![
                "TRAIL_NAME".into(),
                "NAME".into(),
                "name".into(),
                "PUBLIC_SITE_NAME".into(),
            ],
            distance_fields: vec!["GIS_MILES".into(), "miles".into(), "distance".into()],
            difficulty_field: "Difficulty".into(),
            subtype_field: "SITE_SUBTYPE".into(),
        }
    }
}

impl AttributeSchema {
    /// Resolve the domain id, or `None` if no id attribute holds a usable value.
    pub fn domain_id(&self, attributes: &Map<String, Value>) -> Option<DomainId> {
        self.id_fields
            .iter()
            .filter_map(|field| attributes.get(field))
            .find_map(DomainId::from_json)
    }

    /// First non-blank name attribute, if any.
    pub fn name(&self, attributes: &Map<String, Value>) -> Option<String> {
        self.name_fields
            .iter()
            .filter_map(|field| attributes.get(field))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(str::to_string)
    }

    /// Resolve the display name, falling back to "Unnamed <kind>".
    pub fn display_name(&self, attributes: &Map<String, Value>, kind: SegmentKind) -> String {
        self.name(attributes).unwrap_or_else(|| kind.unnamed())
    }

    /// Resolve the distance in miles.
    ///
    /// Missing, non-numeric, negative and non-finite values all count as 0.
    /// Numeric strings (as some feature services emit) are accepted.
    pub fn distance(&self, attributes: &Map<String, Value>) -> f64 {
        self.distance_fields
            .iter()
            .filter_map(|field| attributes.get(field))
            .find_map(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0)
    }

    /// Attribute value keying the paint table for this kind, if any.
    pub fn paint_key<'a>(&self, attributes: &'a Map<String, Value>, kind: SegmentKind) -> Option<&'a str> {
        let field = match kind {
            SegmentKind::Trail => &self.difficulty_field,
            SegmentKind::Poi => &self.subtype_field,
            SegmentKind::Road => return None,
        };
        attributes.get(field).and_then(Value::as_str)
    }
}

/// Configuration for the Data Service endpoints.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Scheme, host and port of the Data Service. Default: `http://127.0.0.1:5000`
    pub base_url: String,

    /// Bounding-box catalog retrieval (POST). Default: `/api/fetch_trails`
    pub fetch_catalog_path: String,

    /// Saved-session catalog retrieval (GET). Default: `/api/get_saved_trails`
    pub saved_catalog_path: String,

    /// Route submission (POST). Default: `/api/process_route`
    pub submit_path: String,

    /// Weather lookup (POST). Default: `/api/weather`
    pub weather_path: String,

    /// Processing status prefix (GET `<path>/<session_id>`). Default: `/check-status`
    pub status_path: String,

    /// Optional API key, sent as HTTP Basic credentials.
    pub api_key: Option<String>,

    /// Per-request timeout. Default: none, geo queries may take arbitrarily long.
    pub request_timeout: Option<Duration>,

    /// Idle connections kept per host. Default: 8
    pub pool_max_idle_per_host: usize,

    /// Retries on HTTP 429 for catalog reads. Submissions are never retried.
    /// Default: 3
    pub max_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            fetch_catalog_path: "/api/fetch_trails".into(),
            saved_catalog_path: "/api/get_saved_trails".into(),
            submit_path: "/api/process_route".into(),
            weather_path: "/api/weather".into(),
            status_path: "/check-status".into(),
            api_key: None,
            request_timeout: None,
            pool_max_idle_per_host: 8,
            max_retries: 3,
        }
    }
}

impl ServiceConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Join the base URL and an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
