//! One map session: catalog loading, pointer dispatch and submission.
//!
//! Events are handled to completion one at a time; every mutating method
//! takes `&mut self`. Network calls run outside the session and their results
//! are applied afterwards, so a stale catalog is detected by epoch before it
//! can touch the selection.

use crate::presentation::{self, PaintRule};
use crate::{
    AttributeSchema, BoundingBox, Catalog, CatalogLoader, CatalogSource, DataService,
    FeatureStateSink, LoadFailure, LoadOutcome, NavigationTarget, RenderId, SegmentKind,
    SelectionCoordinator, SelectionError, ServiceError, SidebarSink, SubmissionGateway, SubmitError,
    ToggleOutcome, WeatherClient, WeatherReport,
};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Enter,
    Leave,
    Click,
}

/// Pointer event emitted by the rendering engine for a struck feature.
#[derive(Debug, Clone)]
pub struct PointerEvent {
    pub kind: PointerKind,
    /// Layer the feature belongs to
    pub layer: SegmentKind,
    pub render_id: RenderId,
    pub attributes: Map<String, Value>,
}

/// What the host should do in response to a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerResponse {
    Ignored,
    ShowPopup(String),
    HidePopup,
    Toggled(ToggleOutcome),
    Rejected(SelectionError),
}

pub struct MapSession<D, E, S> {
    loader: CatalogLoader<Arc<D>>,
    gateway: SubmissionGateway<Arc<D>>,
    weather: WeatherClient<Arc<D>>,
    coordinator: SelectionCoordinator<E, S>,
    catalog: Catalog,
}

impl<D, E, S> MapSession<D, E, S>
where
    D: DataService,
    E: FeatureStateSink,
    S: SidebarSink,
{
    pub fn new(service: Arc<D>, engine: E, sidebar: S, schema: AttributeSchema) -> Self {
        Self {
            loader: CatalogLoader::new(Arc::clone(&service), schema.clone()),
            gateway: SubmissionGateway::new(Arc::clone(&service)),
            weather: WeatherClient::new(service),
            coordinator: SelectionCoordinator::with_schema(engine, sidebar, schema),
            catalog: Catalog::empty(),
        }
    }

    /// Loader, for starting loads whose results are applied with [`apply`](Self::apply).
    pub fn loader(&self) -> &CatalogLoader<Arc<D>> {
        &self.loader
    }

    /// Apply a completed load.
    ///
    /// Returns `Ok(true)` when a new catalog was installed and `Ok(false)` when
    /// the outcome was stale. A failure installs an empty catalog and returns
    /// the diagnostic. Either way a current outcome resets the selection.
    pub fn apply(&mut self, outcome: LoadOutcome) -> Result<bool, LoadFailure> {
        let epoch = outcome.epoch();
        if !self.loader.is_current(epoch) {
            debug!("[MapSession] Ignoring outcome for superseded {}", epoch);
            return Ok(false);
        }

        match outcome {
            LoadOutcome::Stale { .. } => Ok(false),
            LoadOutcome::Loaded { epoch, catalog } => {
                self.coordinator.reset(epoch);
                self.catalog = catalog;
                info!("[MapSession] Installed catalog for {} ({} features)", epoch, self.catalog.len());
                Ok(true)
            }
            LoadOutcome::Failed { epoch, failure } => {
                self.coordinator.reset(epoch);
                self.catalog = Catalog::empty();
                warn!("[MapSession] Presenting empty catalog for {}: {}", epoch, failure);
                Err(failure)
            }
        }
    }

    /// Load a catalog and apply it.
    pub async fn load(&mut self, source: CatalogSource) -> Result<bool, LoadFailure> {
        let outcome = self.loader.load(source).await;
        self.apply(outcome)
    }

    /// Route a pointer event.
    ///
    /// Clicks reach the coordinator only for selectable layers and only for
    /// features of the active catalog. The catalog segment, not the event's
    /// attributes, is what gets selected.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> PointerResponse {
        match event.kind {
            PointerKind::Leave => PointerResponse::HidePopup,
            PointerKind::Enter => match self.catalog.segment(event.render_id) {
                Some(segment) => PointerResponse::ShowPopup(presentation::popup_text(segment)),
                None => PointerResponse::Ignored,
            },
            PointerKind::Click => {
                if !event.layer.is_selectable() {
                    debug!("[MapSession] Click on {} layer is display-only", event.layer);
                    return PointerResponse::Ignored;
                }
                let Some(segment) = self.catalog.segment(event.render_id) else {
                    debug!("[MapSession] Click on {} outside the active catalog", event.render_id);
                    return PointerResponse::Ignored;
                };
                // Render ids restart with every load; the struck feature must
                // be the one the active catalog holds under that id
                let struck = self.loader.schema().domain_id(&event.attributes);
                if segment.kind != event.layer || struck != segment.domain_id {
                    warn!(
                        "[MapSession] Click on {} does not match {} '{}' in the active catalog",
                        event.render_id, segment.kind, segment.display_name
                    );
                    return PointerResponse::Ignored;
                }
                match self.coordinator.toggle_segment(segment) {
                    Ok(outcome) => PointerResponse::Toggled(outcome),
                    Err(e) => PointerResponse::Rejected(e),
                }
            }
        }
    }

    /// Submit the committed selection. The selection is kept on failure.
    pub async fn confirm(&self) -> Result<NavigationTarget, SubmitError> {
        let ids = self.coordinator.committed_ids();
        self.gateway.submit(&ids).await
    }

    /// Whether backend processing for `session_id` has finished.
    pub async fn processing_done(&self, session_id: &str) -> Result<bool, SubmitError> {
        self.gateway.processing_done(session_id).await
    }

    pub async fn weather(&self, bbox: &BoundingBox) -> Result<WeatherReport, ServiceError> {
        self.weather.lookup(bbox).await
    }

    /// Paint rules for every feature of the active catalog.
    pub fn paint_rules(&self) -> Vec<(RenderId, PaintRule)> {
        let schema = self.loader.schema();
        self.catalog
            .iter()
            .map(|segment| (segment.render_id, presentation::paint_rule(segment, schema)))
            .collect()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn coordinator(&self) -> &SelectionCoordinator<E, S> {
        &self.coordinator
    }
}
