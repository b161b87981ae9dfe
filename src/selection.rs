//! The set of currently selected segments.

use crate::DomainId;
use std::collections::{BTreeMap, HashMap};

/// What the sidebar needs to know about one selected segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEntry {
    pub display_name: String,
    /// Miles, never negative
    pub distance: f64,
}

impl SelectionEntry {
    pub fn new(display_name: impl Into<String>, distance: f64) -> Self {
        Self {
            display_name: display_name.into(),
            distance: if distance.is_finite() && distance > 0.0 { distance } else { 0.0 },
        }
    }
}

/// Selected segments keyed by domain id, in insertion order, with a running
/// total distance.
///
/// The total is maintained incrementally on every insert and remove; it is
/// only clamped at 0 and snapped to exactly 0 when the set empties, to drop
/// floating-point rounding drift. Entries are ordered by when they were
/// (most recently) inserted; deselecting and reselecting an id moves it to
/// the end.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    entries: HashMap<DomainId, (u64, SelectionEntry)>,
    order: BTreeMap<u64, DomainId>,
    next_seq: u64,
    total_distance: f64,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &DomainId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &DomainId) -> Option<&SelectionEntry> {
        self.entries.get(id).map(|(_, entry)| entry)
    }

    /// Insert an entry. Returns `false` and leaves the set unchanged if the id
    /// is already present.
    pub fn insert(&mut self, id: DomainId, entry: SelectionEntry) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;

        self.total_distance += entry.distance;
        self.order.insert(seq, id.clone());
        self.entries.insert(id, (seq, entry));
        true
    }

    /// Remove an entry, returning it if it was present.
    pub fn remove(&mut self, id: &DomainId) -> Option<SelectionEntry> {
        let (seq, entry) = self.entries.remove(id)?;
        self.order.remove(&seq);

        if self.entries.is_empty() {
            // Drop accumulated rounding error once nothing is selected
            self.total_distance = 0.0;
        } else {
            self.total_distance = (self.total_distance - entry.distance).max(0.0);
        }
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.total_distance = 0.0;
    }

    /// Sum of the distances of all entries, in miles.
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&DomainId, &SelectionEntry)> {
        self.order.values().filter_map(move |id| {
            self.entries.get(id).map(|(_, entry)| (id, entry))
        })
    }

    /// Domain ids in insertion order.
    pub fn ids(&self) -> Vec<DomainId> {
        self.order.values().cloned().collect()
    }
}
