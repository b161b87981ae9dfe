//! Selection coordinator.
//!
//! The coordinator owns the [`SelectionSet`] and is the only writer of the
//! rendering engine's per-feature `selected` state. After every mutation it
//! publishes a fresh [`SidebarProjection`] built from the mutated set, so the
//! sidebar never sees a list and total that disagree.
//!
//! Invariant: a domain id is in the selection iff the render id it was
//! selected through is flagged `selected = true` in the engine.

use crate::{
    AttributeSchema, CatalogEpoch, DomainId, RenderId, Segment, SelectionEntry, SelectionError,
    SelectionSet,
};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;

const UNNAMED_SEGMENT: &str = "Unnamed Segment";

/// Write-only mirror of the selection in the rendering engine.
pub trait FeatureStateSink {
    /// Set the `selected` feature-state of one rendered feature.
    fn set_selected(&mut self, render_id: RenderId, selected: bool);
}

/// Receiver of sidebar updates.
pub trait SidebarSink {
    fn publish(&mut self, projection: &SidebarProjection);
}

/// Engine that ignores feature-state updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeatureState;

impl FeatureStateSink for NullFeatureState {
    fn set_selected(&mut self, _render_id: RenderId, _selected: bool) {}
}

/// Sidebar that ignores updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSidebar;

impl SidebarSink for NullSidebar {
    fn publish(&mut self, _projection: &SidebarProjection) {}
}

/// One line of the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarEntry {
    pub domain_id: DomainId,
    pub display_name: String,
    pub distance: f64,
}

/// Ordered selection summary plus the matching total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidebarProjection {
    pub entries: Vec<SidebarEntry>,
    pub total_distance: f64,
}

impl SidebarProjection {
    pub fn from_selection(selection: &SelectionSet) -> Self {
        Self {
            entries: selection
                .iter()
                .map(|(id, entry)| SidebarEntry {
                    domain_id: id.clone(),
                    display_name: entry.display_name.clone(),
                    distance: entry.distance,
                })
                .collect(),
            total_distance: selection.total_distance(),
        }
    }
}

/// Result of a successful toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
}

/// Tracks selected segments and keeps the engine highlight and sidebar in sync.
pub struct SelectionCoordinator<E, S> {
    engine: E,
    sidebar: S,
    schema: AttributeSchema,
    epoch: CatalogEpoch,
    selection: SelectionSet,
    // Translation between the two id spaces, scoped to the current epoch
    render_by_domain: HashMap<DomainId, RenderId>,
    domain_by_render: HashMap<RenderId, DomainId>,
}

impl<E: FeatureStateSink, S: SidebarSink> SelectionCoordinator<E, S> {
    pub fn new(engine: E, sidebar: S) -> Self {
        Self::with_schema(engine, sidebar, AttributeSchema::default())
    }

    pub fn with_schema(engine: E, sidebar: S, schema: AttributeSchema) -> Self {
        Self {
            engine,
            sidebar,
            schema,
            epoch: CatalogEpoch::NONE,
            selection: SelectionSet::new(),
            render_by_domain: HashMap::new(),
            domain_by_render: HashMap::new(),
        }
    }

    /// Toggle the selection state of the feature identified by `render_id`.
    ///
    /// The domain id is resolved from `attributes`; without one the click is a
    /// no-op and [`SelectionError::MissingIdentifier`] is returned.
    pub fn toggle(
        &mut self,
        render_id: RenderId,
        attributes: &Map<String, Value>,
    ) -> Result<ToggleOutcome, SelectionError> {
        let Some(domain_id) = self.schema.domain_id(attributes) else {
            warn!("[Coordinator] Feature {} has no identifier, ignoring click", render_id);
            return Err(SelectionError::MissingIdentifier { render_id });
        };

        let entry = if self.selection.contains(&domain_id) {
            None
        } else {
            Some(SelectionEntry::new(
                self.schema.name(attributes).unwrap_or_else(|| UNNAMED_SEGMENT.to_string()),
                self.schema.distance(attributes),
            ))
        };

        Ok(self.apply_toggle(render_id, domain_id, entry))
    }

    /// Toggle a normalized catalog segment.
    pub fn toggle_segment(&mut self, segment: &Segment) -> Result<ToggleOutcome, SelectionError> {
        let Some(domain_id) = segment.domain_id.clone() else {
            warn!(
                "[Coordinator] {} '{}' ({}) has no identifier, ignoring click",
                segment.kind, segment.display_name, segment.render_id
            );
            return Err(SelectionError::MissingIdentifier { render_id: segment.render_id });
        };

        let entry = if self.selection.contains(&domain_id) {
            None
        } else {
            Some(SelectionEntry::new(segment.display_name.clone(), segment.distance))
        };

        Ok(self.apply_toggle(segment.render_id, domain_id, entry))
    }

    /// `entry` is `Some` exactly when `domain_id` is not yet selected.
    fn apply_toggle(
        &mut self,
        render_id: RenderId,
        domain_id: DomainId,
        entry: Option<SelectionEntry>,
    ) -> ToggleOutcome {
        let outcome = match entry {
            None => {
                let removed = self.selection.remove(&domain_id);

                if let Some(previous) = self.render_by_domain.remove(&domain_id) {
                    self.domain_by_render.remove(&previous);
                    if previous != render_id {
                        self.engine.set_selected(previous, false);
                    }
                }
                self.engine.set_selected(render_id, false);

                debug!(
                    "[Coordinator] Deselected '{}' ({}, render {})",
                    removed.map(|e| e.display_name).unwrap_or_default(),
                    domain_id,
                    render_id
                );
                ToggleOutcome::Deselected
            }
            Some(entry) => {
                debug!(
                    "[Coordinator] Selected '{}' ({}, render {}, {:.2} mi)",
                    entry.display_name, domain_id, render_id, entry.distance
                );
                self.selection.insert(domain_id.clone(), entry);
                self.domain_by_render.insert(render_id, domain_id.clone());
                self.render_by_domain.insert(domain_id, render_id);
                self.engine.set_selected(render_id, true);
                ToggleOutcome::Selected
            }
        };

        self.publish();
        outcome
    }

    /// Drop the selection when a new catalog replaces the active one.
    ///
    /// Clears the engine state of every feature selected in the previous epoch.
    pub fn reset(&mut self, epoch: CatalogEpoch) {
        let mut stale: Vec<RenderId> = self.domain_by_render.keys().copied().collect();
        stale.sort();
        for render_id in stale {
            self.engine.set_selected(render_id, false);
        }

        info!(
            "[Coordinator] Reset from {} to {} ({} segments dropped)",
            self.epoch,
            epoch,
            self.selection.len()
        );

        self.selection.clear();
        self.render_by_domain.clear();
        self.domain_by_render.clear();
        self.epoch = epoch;
        self.publish();
    }

    /// Selected domain ids, first-selected first.
    pub fn committed_ids(&self) -> Vec<DomainId> {
        self.selection.ids()
    }

    pub fn projection(&self) -> SidebarProjection {
        SidebarProjection::from_selection(&self.selection)
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn total_distance(&self) -> f64 {
        self.selection.total_distance()
    }

    pub fn epoch(&self) -> CatalogEpoch {
        self.epoch
    }

    pub fn is_selected(&self, domain_id: &DomainId) -> bool {
        self.selection.contains(domain_id)
    }

    /// Domain id selected through this render id, if any.
    pub fn domain_for(&self, render_id: RenderId) -> Option<&DomainId> {
        self.domain_by_render.get(&render_id)
    }

    /// Render id through which this domain id was selected, if any.
    pub fn render_for(&self, domain_id: &DomainId) -> Option<RenderId> {
        self.render_by_domain.get(domain_id).copied()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sidebar(&self) -> &S {
        &self.sidebar
    }

    fn publish(&mut self) {
        let projection = SidebarProjection::from_selection(&self.selection);
        self.sidebar.publish(&projection);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    /// Engine stand-in recording the last state per feature.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingEngine {
        pub state: HashMap<RenderId, bool>,
    }

    impl RecordingEngine {
        pub fn flagged(&self) -> Vec<RenderId> {
            let mut ids: Vec<RenderId> = self.state.iter().filter(|&(_, &s)| s).map(|(&id, _)| id).collect();
            ids.sort();
            ids
        }
    }

    impl FeatureStateSink for RecordingEngine {
        fn set_selected(&mut self, render_id: RenderId, selected: bool) {
            self.state.insert(render_id, selected);
        }
    }

    #[derive(Debug, Default)]
    pub(crate) struct RecordingSidebar {
        pub published: Vec<SidebarProjection>,
    }

    impl RecordingSidebar {
        pub fn last(&self) -> Option<&SidebarProjection> {
            self.published.last()
        }
    }

    impl SidebarSink for RecordingSidebar {
        fn publish(&mut self, projection: &SidebarProjection) {
            self.published.push(projection.clone());
        }
    }

    type TestCoordinator = SelectionCoordinator<RecordingEngine, RecordingSidebar>;

    fn coordinator() -> TestCoordinator {
        let mut c = SelectionCoordinator::new(RecordingEngine::default(), RecordingSidebar::default());
        c.reset(CatalogEpoch::FIRST);
        c
    }

    fn attrs(id: u32, name: &str, miles: f64) -> Map<String, Value> {
        json!({ "OBJECTID": id, "TRAIL_NAME": name, "GIS_MILES": miles })
            .as_object()
            .cloned()
            .unwrap()
    }

    fn sidebar_pairs(c: &TestCoordinator) -> Vec<(String, f64)> {
        c.sidebar()
            .last()
            .unwrap()
            .entries
            .iter()
            .map(|e| (e.display_name.clone(), e.distance))
            .collect()
    }

    #[test]
    fn test_select_then_deselect_scenario() {
        let mut c = coordinator();

        assert_eq!(c.toggle(RenderId(0), &attrs(101, "A", 3.2)), Ok(ToggleOutcome::Selected));
        let road = json!({ "OBJECTID": 202, "NAME": "B", "GIS_MILES": 1.5 }).as_object().cloned().unwrap();
        assert_eq!(c.toggle(RenderId(5), &road), Ok(ToggleOutcome::Selected));

        assert_eq!(sidebar_pairs(&c), vec![("A".to_string(), 3.2), ("B".to_string(), 1.5)]);
        assert!((c.sidebar().last().unwrap().total_distance - 4.7).abs() < 1e-9);
        assert_eq!(c.engine().flagged(), vec![RenderId(0), RenderId(5)]);

        assert_eq!(c.toggle(RenderId(0), &attrs(101, "A", 3.2)), Ok(ToggleOutcome::Deselected));
        assert_eq!(sidebar_pairs(&c), vec![("B".to_string(), 1.5)]);
        assert!((c.total_distance() - 1.5).abs() < 1e-9);
        assert_eq!(c.engine().flagged(), vec![RenderId(5)]);
        assert_eq!(c.committed_ids(), vec![DomainId::new("202")]);
    }

    #[test]
    fn test_missing_identifier_is_noop() {
        let mut c = coordinator();
        let published_before = c.sidebar().published.len();

        let no_id = json!({ "TRAIL_NAME": "Ghost", "GIS_MILES": 2.0 }).as_object().cloned().unwrap();
        assert_eq!(
            c.toggle(RenderId(3), &no_id),
            Err(SelectionError::MissingIdentifier { render_id: RenderId(3) })
        );
        assert!(c.selection().is_empty());
        assert!(c.engine().state.is_empty());
        assert_eq!(c.sidebar().published.len(), published_before);
    }

    #[test]
    fn test_missing_distance_contributes_zero() {
        let mut c = coordinator();
        let no_miles = json!({ "OBJECTID": 7 }).as_object().cloned().unwrap();
        assert_eq!(c.toggle(RenderId(1), &no_miles), Ok(ToggleOutcome::Selected));
        assert_eq!(c.total_distance(), 0.0);
        assert_eq!(sidebar_pairs(&c), vec![("Unnamed Segment".to_string(), 0.0)]);

        c.toggle(RenderId(2), &attrs(8, "X", 2.5)).unwrap();
        assert!((c.total_distance() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut c = coordinator();
        c.toggle(RenderId(0), &attrs(101, "A", 3.2)).unwrap();
        c.toggle(RenderId(1), &attrs(102, "B", 1.0)).unwrap();

        c.reset(CatalogEpoch(2));

        assert!(c.selection().is_empty());
        assert_eq!(c.total_distance(), 0.0);
        assert!(c.committed_ids().is_empty());
        assert!(c.engine().flagged().is_empty());
        assert_eq!(c.epoch(), CatalogEpoch(2));
        assert!(c.domain_for(RenderId(0)).is_none());
        assert_eq!(c.sidebar().last(), Some(&SidebarProjection::default()));
    }

    #[test]
    fn test_reload_starts_fresh_entry() {
        let mut c = coordinator();
        c.toggle(RenderId(0), &attrs(101, "A", 3.2)).unwrap();

        c.reset(CatalogEpoch(2));

        // Same domain id, new render id and a different measured length
        assert_eq!(c.toggle(RenderId(40), &attrs(101, "A", 2.9)), Ok(ToggleOutcome::Selected));
        assert!((c.total_distance() - 2.9).abs() < 1e-9);
        assert_eq!(c.render_for(&DomainId::new("101")), Some(RenderId(40)));
        assert_eq!(c.engine().flagged(), vec![RenderId(40)]);
    }

    #[test]
    fn test_deselect_through_other_render_id_clears_both() {
        let mut c = coordinator();
        c.toggle(RenderId(1), &attrs(101, "A", 3.2)).unwrap();

        // A second rendered feature carrying the same domain id
        assert_eq!(c.toggle(RenderId(9), &attrs(101, "A", 3.2)), Ok(ToggleOutcome::Deselected));
        assert!(c.engine().flagged().is_empty());
        assert_eq!(c.engine().state.get(&RenderId(1)), Some(&false));
        assert_eq!(c.engine().state.get(&RenderId(9)), Some(&false));
    }

    #[test]
    fn test_poi_routed_to_toggle_is_treated_as_segment() {
        let mut c = coordinator();
        let site = json!({ "OBJECTID": 9, "PUBLIC_SITE_NAME": "North Trailhead" }).as_object().cloned().unwrap();
        assert_eq!(c.toggle(RenderId(12), &site), Ok(ToggleOutcome::Selected));
        assert_eq!(sidebar_pairs(&c), vec![("North Trailhead".to_string(), 0.0)]);
    }

    #[test]
    fn test_toggle_segment() {
        let mut c = coordinator();
        let seg = Segment::from_attributes(
            RenderId(4),
            crate::SegmentKind::Road,
            json!({ "OBJECTID": 55, "GIS_MILES": 0.8 }).as_object().cloned().unwrap(),
            &AttributeSchema::default(),
        );
        assert_eq!(c.toggle_segment(&seg), Ok(ToggleOutcome::Selected));
        assert_eq!(sidebar_pairs(&c), vec![("Unnamed Road".to_string(), 0.8)]);
        assert_eq!(c.toggle_segment(&seg), Ok(ToggleOutcome::Deselected));
        assert!(c.selection().is_empty());
    }

    #[test]
    fn test_every_publish_is_consistent() {
        let mut c = coordinator();
        for (i, miles) in [1.1, 2.2, 3.3].iter().enumerate() {
            c.toggle(RenderId(i as u64), &attrs(i as u32, "s", *miles)).unwrap();
        }
        c.toggle(RenderId(1), &attrs(1, "s", 2.2)).unwrap();

        for projection in &c.sidebar().published {
            let sum: f64 = projection.entries.iter().map(|e| e.distance).sum();
            assert!((projection.total_distance - sum).abs() < 1e-9);
        }
    }

    proptest! {
        #[test]
        fn toggle_twice_restores_state(
            initial in proptest::collection::vec((0u32..20, 0.0f64..25.0), 0..10),
            target in 20u32..40,
            miles in 0.0f64..25.0,
        ) {
            let mut c = coordinator();
            for (id, d) in &initial {
                if !c.is_selected(&DomainId::new(id.to_string())) {
                    c.toggle(RenderId(*id as u64), &attrs(*id, "s", *d)).unwrap();
                }
            }
            let ids_before = c.committed_ids();
            let total_before = c.total_distance();
            let flagged_before = c.engine().flagged();

            c.toggle(RenderId(target as u64), &attrs(target, "t", miles)).unwrap();
            c.toggle(RenderId(target as u64), &attrs(target, "t", miles)).unwrap();

            prop_assert_eq!(c.committed_ids(), ids_before);
            prop_assert!((c.total_distance() - total_before).abs() < 1e-9);
            prop_assert_eq!(c.engine().flagged(), flagged_before);
        }

        #[test]
        fn selection_mirrors_engine_and_sum(
            clicks in proptest::collection::vec(0u32..10, 0..60),
        ) {
            let mut c = coordinator();
            for id in clicks {
                c.toggle(RenderId(id as u64), &attrs(id, "s", id as f64 * 0.7)).unwrap();

                let expected: f64 = c.selection().iter().map(|(_, e)| e.distance).sum();
                prop_assert!((c.total_distance() - expected).abs() < 1e-6);

                let mut selected_renders: Vec<RenderId> = c
                    .committed_ids()
                    .iter()
                    .filter_map(|d| c.render_for(d))
                    .collect();
                selected_renders.sort();
                prop_assert_eq!(selected_renders, c.engine().flagged());
            }
        }

        #[test]
        fn unrelated_cycles_keep_order(
            base in proptest::collection::vec(0u32..10, 1..8),
            cycles in 1usize..6,
        ) {
            let mut c = coordinator();
            for id in &base {
                if !c.is_selected(&DomainId::new(id.to_string())) {
                    c.toggle(RenderId(*id as u64), &attrs(*id, "s", 1.0)).unwrap();
                }
            }
            let order = c.committed_ids();

            for _ in 0..cycles {
                c.toggle(RenderId(99), &attrs(99, "other", 4.0)).unwrap();
                c.toggle(RenderId(99), &attrs(99, "other", 4.0)).unwrap();
            }
            prop_assert_eq!(c.committed_ids(), order);
        }
    }
}
