//! Segment catalog loading.
//!
//! A catalog is the set of trails, roads and points of interest returned for
//! one area of interest. Render ids are assigned here, sequentially across
//! the whole catalog, so they are scoped to a single load. Each load gets a
//! new [`CatalogEpoch`]; a response whose epoch is no longer the latest is
//! reported as [`LoadOutcome::Stale`] and must not be applied.

use crate::{
    AttributeSchema, CatalogEpoch, CatalogSource, DataService, LoadFailure, RenderId, Segment,
    SegmentKind,
};
use geojson::FeatureCollection;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Payload keys and the kind of segment each one holds, in render-id order.
const COLLECTIONS: &[(&str, SegmentKind)] = &[
    ("trails", SegmentKind::Trail),
    ("roads", SegmentKind::Road),
    ("trailheads", SegmentKind::Poi),
    ("pois", SegmentKind::Poi),
];

/// Normalized geometry for one area of interest.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub trails: Vec<Segment>,
    pub roads: Vec<Segment>,
    /// Trailheads and points of interest (display-only)
    pub poi: Vec<Segment>,
    index: HashMap<RenderId, (SegmentKind, usize)>,
}

impl Catalog {
    /// An empty catalog, presented after a failed load.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from already normalized segments.
    pub fn new(trails: Vec<Segment>, roads: Vec<Segment>, poi: Vec<Segment>) -> Self {
        let mut index = HashMap::new();
        for (kind, list) in [
            (SegmentKind::Trail, &trails),
            (SegmentKind::Road, &roads),
            (SegmentKind::Poi, &poi),
        ] {
            for (i, seg) in list.iter().enumerate() {
                index.insert(seg.render_id, (kind, i));
            }
        }
        Self { trails, roads, poi, index }
    }

    /// Normalize a Data Service catalog payload.
    ///
    /// Missing or null collections are treated as empty. A payload that is not
    /// an object, carries an `error` message, or holds a collection that is not
    /// a valid feature collection is a [`LoadFailure`].
    pub fn from_payload(payload: &Value, schema: &AttributeSchema) -> Result<Self, LoadFailure> {
        let object = payload
            .as_object()
            .ok_or_else(|| LoadFailure::new("catalog payload is not an object"))?;

        if let Some(message) = object.get("error") {
            let reason = message.as_str().map(str::to_string).unwrap_or_else(|| message.to_string());
            return Err(LoadFailure::new(reason));
        }

        let mut next_render_id = 0u64;
        let mut trails = Vec::new();
        let mut roads = Vec::new();
        let mut poi = Vec::new();

        for &(key, kind) in COLLECTIONS {
            let raw = match object.get(key) {
                None | Some(Value::Null) => {
                    debug!("[CatalogLoader] No '{}' collection in payload, treating as empty", key);
                    continue;
                }
                Some(raw) => raw,
            };

            let collection = FeatureCollection::try_from(raw.clone())
                .map_err(|e| LoadFailure::new(format!("invalid '{}' collection: {}", key, e)))?;

            let target = match kind {
                SegmentKind::Trail => &mut trails,
                SegmentKind::Road => &mut roads,
                SegmentKind::Poi => &mut poi,
            };

            let mut unidentified = 0usize;
            for feature in collection.features {
                let render_id = RenderId(next_render_id);
                next_render_id += 1;

                let segment = Segment::from_attributes(
                    render_id,
                    kind,
                    feature.properties.unwrap_or_default(),
                    schema,
                );
                if kind.is_selectable() && segment.domain_id.is_none() {
                    unidentified += 1;
                }
                target.push(segment);
            }

            if unidentified > 0 {
                warn!(
                    "[CatalogLoader] {} features in '{}' have no identifier and cannot be selected",
                    unidentified, key
                );
            }
        }

        Ok(Self::new(trails, roads, poi))
    }

    /// Look up a segment by its render id.
    pub fn segment(&self, render_id: RenderId) -> Option<&Segment> {
        let &(kind, i) = self.index.get(&render_id)?;
        self.list(kind).get(i)
    }

    pub fn list(&self, kind: SegmentKind) -> &[Segment] {
        match kind {
            SegmentKind::Trail => &self.trails,
            SegmentKind::Road => &self.roads,
            SegmentKind::Poi => &self.poi,
        }
    }

    /// All segments in render-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.trails.iter().chain(self.roads.iter()).chain(self.poi.iter())
    }

    pub fn len(&self) -> usize {
        self.trails.len() + self.roads.len() + self.poi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of one catalog load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The newest load succeeded.
    Loaded { epoch: CatalogEpoch, catalog: Catalog },
    /// The newest load failed; present an empty catalog and this diagnostic.
    Failed { epoch: CatalogEpoch, failure: LoadFailure },
    /// A newer load was started before this one completed; discard.
    Stale { epoch: CatalogEpoch },
}

impl LoadOutcome {
    pub fn epoch(&self) -> CatalogEpoch {
        match self {
            LoadOutcome::Loaded { epoch, .. }
            | LoadOutcome::Failed { epoch, .. }
            | LoadOutcome::Stale { epoch } => *epoch,
        }
    }
}

/// Loads catalogs from the Data Service, one epoch per call.
pub struct CatalogLoader<D> {
    service: D,
    schema: AttributeSchema,
    latest: AtomicU64,
}

impl<D: DataService> CatalogLoader<D> {
    pub fn new(service: D, schema: AttributeSchema) -> Self {
        Self {
            service,
            schema,
            latest: AtomicU64::new(CatalogEpoch::NONE.0),
        }
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// Epoch of the most recently started load.
    pub fn latest_epoch(&self) -> CatalogEpoch {
        CatalogEpoch(self.latest.load(Ordering::SeqCst))
    }

    /// Whether `epoch` belongs to the most recently started load.
    pub fn is_current(&self, epoch: CatalogEpoch) -> bool {
        self.latest_epoch() == epoch
    }

    /// Start a load.
    ///
    /// The epoch is claimed when this is called, not when the future is first
    /// polled, so starting a second load immediately supersedes the first.
    pub fn load(&self, source: CatalogSource) -> impl Future<Output = LoadOutcome> + '_ {
        let epoch = CatalogEpoch(self.latest.fetch_add(1, Ordering::SeqCst)).next();
        info!("[CatalogLoader] Starting {} from {:?}", epoch, source);

        async move {
            let result = self.service.fetch_catalog(&source).await;

            if !self.is_current(epoch) {
                debug!(
                    "[CatalogLoader] Discarding response for {} (latest is {})",
                    epoch,
                    self.latest_epoch()
                );
                return LoadOutcome::Stale { epoch };
            }

            let catalog = result
                .map_err(LoadFailure::from)
                .and_then(|payload| Catalog::from_payload(&payload, &self.schema));

            match catalog {
                Ok(catalog) => {
                    info!(
                        "[CatalogLoader] {} loaded: {} trails, {} roads, {} points of interest",
                        epoch,
                        catalog.trails.len(),
                        catalog.roads.len(),
                        catalog.poi.len()
                    );
                    LoadOutcome::Loaded { epoch, catalog }
                }
                Err(failure) => {
                    warn!("[CatalogLoader] {} failed: {}", epoch, failure);
                    LoadOutcome::Failed { epoch, failure }
                }
            }
        }
    }
}
