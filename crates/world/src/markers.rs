//! Arena of cross-border features waiting for chunks to materialize.

use std::collections::{BTreeMap, HashMap};

use worldgen_core::ChunkPos;

use crate::decoration::{FeatureMarker, MarkerKey};

/// Pending markers indexed by every chunk they still wait for.
#[derive(Debug, Default)]
pub struct MarkerArena {
    waiting: HashMap<ChunkPos, BTreeMap<MarkerKey, FeatureMarker>>,
}

impl MarkerArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `marker` under each chunk in `missing`.
    pub fn defer(&mut self, marker: &FeatureMarker, missing: &[ChunkPos]) {
        for pos in missing {
            self.waiting
                .entry(*pos)
                .or_default()
                .insert(marker.key, marker.clone());
        }
    }

    /// Remove and return the markers waiting on `pos`, in key order.
    pub fn take(&mut self, pos: ChunkPos) -> Vec<FeatureMarker> {
        self.waiting
            .remove(&pos)
            .map(|markers| markers.into_values().collect())
            .unwrap_or_default()
    }

    /// Drop a resolved marker from every chunk it was queued under.
    pub fn forget(&mut self, marker: &FeatureMarker) {
        for pos in &marker.touched {
            if let Some(markers) = self.waiting.get_mut(pos) {
                markers.remove(&marker.key);
                if markers.is_empty() {
                    self.waiting.remove(pos);
                }
            }
        }
    }

    /// Drop every marker planned by `origin`, returning how many distinct
    /// markers went away. Called when `origin` leaves the cache; regenerating
    /// it plans the same markers again.
    pub fn forget_origin(&mut self, origin: ChunkPos) -> usize {
        let mut removed: Vec<MarkerKey> = Vec::new();
        self.waiting.retain(|_, markers| {
            markers.retain(|key, marker| {
                let keep = marker.origin != origin;
                if !keep {
                    removed.push(*key);
                }
                keep
            });
            !markers.is_empty()
        });
        removed.sort();
        removed.dedup();
        removed.len()
    }

    /// Markers waiting on `pos`.
    pub fn waiting_on(&self, pos: ChunkPos) -> usize {
        self.waiting.get(&pos).map_or(0, BTreeMap::len)
    }

    /// Distinct markers still pending.
    pub fn len(&self) -> usize {
        let mut keys: Vec<&MarkerKey> = self.waiting.values().flat_map(BTreeMap::keys).collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
