//! # Trail Selector
//!
//! Interactive selection of trail and road segments for route planning.
//!
//! This library provides:
//! - Normalization of trail/road/trailhead geometry collections into [`Segment`] records
//! - A selection coordinator that keeps map highlight state and the sidebar summary in sync
//! - Submission of the committed selection to the route-processing backend
//!
//! ## Features
//!
//! - **`http`** - Enable the reqwest-backed Data Service client (default)
//!
//! ## Quick Start
//!
//! ```rust
//! use trail_selector::{
//!     AttributeSchema, Catalog, CatalogEpoch, SelectionCoordinator,
//!     NullFeatureState, NullSidebar,
//! };
//! use serde_json::json;
//!
//! let payload = json!({
//!     "trails": {
//!         "type": "FeatureCollection",
//!         "features": [{
//!             "type": "Feature",
//!             "geometry": null,
//!             "properties": { "OBJECTID": 101, "TRAIL_NAME": "Ridge", "GIS_MILES": 3.2 }
//!         }]
//!     }
//! });
//!
//! let catalog = Catalog::from_payload(&payload, &AttributeSchema::default()).unwrap();
//! let mut coordinator = SelectionCoordinator::new(NullFeatureState, NullSidebar);
//! coordinator.reset(CatalogEpoch::FIRST);
//!
//! let trail = &catalog.trails[0];
//! coordinator.toggle(trail.render_id, &trail.attributes).unwrap();
//! assert_eq!(coordinator.committed_ids().len(), 1);
//! ```

use geo::{BoundingRect, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub use config::{AttributeSchema, ServiceConfig};

pub mod error;
pub use error::{LoadFailure, SelectionError, ServiceError, SubmitError};

pub mod service;
pub use service::{CatalogSource, DataService, ProcessingStatus, SessionRef, SubmissionResponse};

pub mod catalog;
pub use catalog::{Catalog, CatalogLoader, LoadOutcome};

pub mod selection;
pub use selection::{SelectionEntry, SelectionSet};

pub mod coordinator;
pub use coordinator::{
    FeatureStateSink, NullFeatureState, NullSidebar, SelectionCoordinator, SidebarEntry,
    SidebarProjection, SidebarSink, ToggleOutcome,
};

pub mod gateway;
pub use gateway::{NavigationTarget, SubmissionGateway};

pub mod presentation;
pub use presentation::{Color, PaintRule, PaintTable};

pub mod weather;
pub use weather::{WeatherClient, WeatherReport};

pub mod session;
pub use session::{MapSession, PointerEvent, PointerKind, PointerResponse};

// HTTP module for the Data Service
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpDataService;

// ============================================================================
// Identifiers
// ============================================================================

/// Backend-stable identifier for a segment (e.g. an `OBJECTID`).
///
/// Used as the selection key and as the value sent to the route-processing
/// backend. Numeric identifiers are stored in their canonical integer text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Normalize a JSON attribute value into a domain id.
    ///
    /// Strings are trimmed, integers and integral floats are rendered without
    /// a fractional part. Empty strings, nulls, booleans and containers have no
    /// identity and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self(trimmed.to_string()))
                }
            }
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Some(Self(u.to_string()))
                } else {
                    let f = n.as_f64()?;
                    if !f.is_finite() {
                        None
                    } else if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                        Some(Self((f as i64).to_string()))
                    } else {
                        Some(Self(f.to_string()))
                    }
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rendering-engine-local feature identifier.
///
/// Only meaningful within one catalog epoch; the same domain id may receive a
/// different render id after a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenderId(pub u64);

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Generation counter distinguishing one catalog load from the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CatalogEpoch(pub u64);

impl CatalogEpoch {
    /// Epoch of a coordinator that has never seen a catalog.
    pub const NONE: CatalogEpoch = CatalogEpoch(0);
    /// Epoch of the first catalog load.
    pub const FIRST: CatalogEpoch = CatalogEpoch(1);

    pub fn next(self) -> Self {
        CatalogEpoch(self.0 + 1)
    }
}

impl fmt::Display for CatalogEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch {}", self.0)
    }
}

// ============================================================================
// Segments
// ============================================================================

/// Kind of a catalog feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Trail,
    Road,
    /// Trailheads and other points of interest. Display-only.
    Poi,
}

impl SegmentKind {
    /// Trails and roads can be selected; POIs cannot.
    pub fn is_selectable(self) -> bool {
        matches!(self, SegmentKind::Trail | SegmentKind::Road)
    }

    pub fn label(self) -> &'static str {
        match self {
            SegmentKind::Trail => "Trail",
            SegmentKind::Road => "Road",
            SegmentKind::Poi => "Trailhead",
        }
    }

    /// Generic display name used when no name attribute is present.
    pub fn unnamed(self) -> String {
        format!("Unnamed {}", self.label())
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A catalog feature normalized for selection and display.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Stable identifier, `None` when the feature carries no id attribute.
    /// Such segments are displayed but cannot be selected.
    pub domain_id: Option<DomainId>,
    /// Engine-local id assigned by the loader for this catalog epoch
    pub render_id: RenderId,
    pub kind: SegmentKind,
    pub display_name: String,
    /// Measured length in miles (never negative, 0 when absent)
    pub distance: f64,
    /// Raw attribute bag as received from the Data Service
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Segment {
    /// Build a segment from a feature's attribute bag.
    pub fn from_attributes(
        render_id: RenderId,
        kind: SegmentKind,
        attributes: serde_json::Map<String, serde_json::Value>,
        schema: &AttributeSchema,
    ) -> Self {
        Self {
            domain_id: schema.domain_id(&attributes),
            render_id,
            kind,
            display_name: schema.display_name(&attributes, kind),
            distance: schema.distance(&attributes),
            attributes,
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.kind.is_selectable() && self.domain_id.is_some()
    }
}

// ============================================================================
// Bounding box
// ============================================================================

/// Area of interest drawn by the user, in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a bounding box, normalizing swapped corners.
    ///
    /// Returns `None` for non-finite coordinates.
    pub fn new(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Option<Self> {
        if ![lon1, lat1, lon2, lat2].iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self {
            min_lon: lon1.min(lon2),
            min_lat: lat1.min(lat2),
            max_lon: lon1.max(lon2),
            max_lat: lat1.max(lat2),
        })
    }

    /// Bounding box of the polygon produced by the drawing tool.
    ///
    /// Returns `None` for an empty polygon.
    pub fn from_polygon(polygon: &Polygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Bounding box of a `[lon, lat]` coordinate ring.
    pub fn from_ring(ring: &[[f64; 2]]) -> Option<Self> {
        if ring.is_empty() {
            return None;
        }
        let exterior: LineString<f64> = ring.iter().map(|c| Coord { x: c[0], y: c[1] }).collect();
        let polygon = Polygon::new(exterior, vec![]);
        Self::from_polygon(&polygon)
    }

    /// `[minLon, minLat, maxLon, maxLat]`, the wire order of the Data Service.
    pub fn as_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Check that the box encloses a non-zero area.
    pub fn has_area(&self) -> bool {
        self.max_lon > self.min_lon && self.max_lat > self.min_lat
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use serde_json::json;

    #[test]
    fn test_domain_id_normalization() {
        assert_eq!(DomainId::from_json(&json!(101)), Some(DomainId::new("101")));
        assert_eq!(DomainId::from_json(&json!(101.0)), Some(DomainId::new("101")));
        assert_eq!(DomainId::from_json(&json!(" T-17 ")), Some(DomainId::new("T-17")));
        assert_eq!(DomainId::from_json(&json!(2.5)), Some(DomainId::new("2.5")));
        assert_eq!(DomainId::from_json(&json!("")), None);
        assert_eq!(DomainId::from_json(&json!(null)), None);
        assert_eq!(DomainId::from_json(&json!(true)), None);
    }

    #[test]
    fn test_kind_selectability() {
        assert!(SegmentKind::Trail.is_selectable());
        assert!(SegmentKind::Road.is_selectable());
        assert!(!SegmentKind::Poi.is_selectable());
        assert_eq!(SegmentKind::Road.unnamed(), "Unnamed Road");
    }

    #[test]
    fn test_bbox_from_polygon() {
        let poly = polygon![
            (x: -105.2, y: 37.1),
            (x: -104.8, y: 37.1),
            (x: -104.8, y: 37.5),
            (x: -105.2, y: 37.5),
        ];
        let bbox = BoundingBox::from_polygon(&poly).unwrap();
        assert_eq!(bbox.as_array(), [-105.2, 37.1, -104.8, 37.5]);
        assert!(bbox.has_area());
    }

    #[test]
    fn test_bbox_from_ring_and_swapped_corners() {
        let bbox = BoundingBox::from_ring(&[[-104.0, 38.0], [-105.0, 37.0], [-104.5, 37.5]]).unwrap();
        assert_eq!(bbox.as_array(), [-105.0, 37.0, -104.0, 38.0]);

        let swapped = BoundingBox::new(-104.0, 38.0, -105.0, 37.0).unwrap();
        assert_eq!(swapped, bbox);

        assert!(BoundingBox::from_ring(&[]).is_none());
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_segment_without_identifier_is_not_selectable() {
        let attrs = json!({ "TRAIL_NAME": "Ghost" }).as_object().cloned().unwrap();
        let seg = Segment::from_attributes(RenderId(0), SegmentKind::Trail, attrs, &AttributeSchema::default());
        assert!(seg.domain_id.is_none());
        assert!(!seg.is_selectable());
        assert_eq!(seg.display_name, "Ghost");
        assert_eq!(seg.distance, 0.0);
    }
}
