use std::collections::HashMap;
use std::sync::Arc;

use bitflags::bitflags;
use lru::LruCache;
use worldgen_core::{ChunkPos, GenerationError};

use crate::chunk::ChunkData;

bitflags! {
    /// Flags that keep a cached chunk from being evicted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntryFlags: u8 {
        /// Held by an external collaborator.
        const PINNED = 0b0000_0001;
        /// Carries edits that are not persisted yet.
        const DIRTY = 0b0000_0010;
    }
}

struct CacheEntry {
    chunk: Arc<ChunkData>,
    flags: EntryFlags,
}

/// In-memory chunk cache with an LRU eviction policy.
///
/// Flagged entries are skipped by eviction. While only flagged entries
/// remain the cache may exceed its capacity; it shrinks again as flags clear.
pub struct ChunkCache {
    entries: HashMap<ChunkPos, CacheEntry>,
    lru: LruCache<ChunkPos, ()>,
    capacity: usize,
}

impl ChunkCache {
    /// Create a cache holding up to `capacity` unflagged chunks.
    pub fn new(capacity: usize) -> Result<Self, GenerationError> {
        if capacity == 0 {
            return Err(GenerationError::CacheCapacity { capacity });
        }
        Ok(Self {
            entries: HashMap::new(),
            lru: LruCache::unbounded(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no chunks are currently stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.entries.contains_key(&pos)
    }

    /// Fetch a chunk and mark it most recently used.
    pub fn get(&mut self, pos: ChunkPos) -> Option<Arc<ChunkData>> {
        let chunk = self.entries.get(&pos).map(|entry| Arc::clone(&entry.chunk))?;
        self.touch(pos);
        Some(chunk)
    }

    /// Fetch a chunk without affecting recency.
    pub fn peek(&self, pos: ChunkPos) -> Option<&Arc<ChunkData>> {
        self.entries.get(&pos).map(|entry| &entry.chunk)
    }

    /// Insert or refresh a chunk; returns the positions evicted to make room.
    pub fn insert(&mut self, chunk: Arc<ChunkData>) -> Vec<ChunkPos> {
        let pos = chunk.pos();
        let flags = self.flags(pos).unwrap_or_default();
        self.entries.insert(pos, CacheEntry { chunk, flags });
        self.touch(pos);
        self.evict_if_needed(Some(pos))
    }

    /// Swap the data of a resident chunk, keeping its flags and recency.
    pub fn replace(&mut self, chunk: Arc<ChunkData>) -> bool {
        match self.entries.get_mut(&chunk.pos()) {
            Some(entry) => {
                entry.chunk = chunk;
                true
            }
            None => false,
        }
    }

    pub fn flags(&self, pos: ChunkPos) -> Option<EntryFlags> {
        self.entries.get(&pos).map(|entry| entry.flags)
    }

    /// Set `flag` on a resident chunk. Returns false when the chunk is absent.
    pub fn set_flag(&mut self, pos: ChunkPos, flag: EntryFlags) -> bool {
        match self.entries.get_mut(&pos) {
            Some(entry) => {
                entry.flags.insert(flag);
                true
            }
            None => false,
        }
    }

    /// Clear `flag` and evict anything the cache was holding over capacity.
    pub fn clear_flag(&mut self, pos: ChunkPos, flag: EntryFlags) -> Vec<ChunkPos> {
        match self.entries.get_mut(&pos) {
            Some(entry) => entry.flags.remove(flag),
            None => return Vec::new(),
        }
        self.evict_if_needed(None)
    }

    /// Resident positions, sorted.
    pub fn positions(&self) -> Vec<ChunkPos> {
        let mut positions: Vec<ChunkPos> = self.entries.keys().copied().collect();
        positions.sort();
        positions
    }

    fn touch(&mut self, pos: ChunkPos) {
        self.lru.put(pos, ());
    }

    fn evict_if_needed(&mut self, keep: Option<ChunkPos>) -> Vec<ChunkPos> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            // Least recently used first.
            let victim = self.lru.iter().rev().map(|(pos, _)| *pos).find(|pos| {
                Some(*pos) != keep
                    && self
                        .entries
                        .get(pos)
                        .map_or(true, |entry| entry.flags.is_empty())
            });
            let Some(victim) = victim else {
                break;
            };
            self.lru.pop(&victim);
            self.entries.remove(&victim);
            evicted.push(victim);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeId;
    use crate::chunk::ChunkDims;
    use std::collections::BTreeSet;

    fn chunk(x: i32, z: i32) -> Arc<ChunkData> {
        let dims = ChunkDims::new(4, 16);
        Arc::new(ChunkData {
            pos: ChunkPos::new(x, z),
            dims,
            blocks: vec![0; dims.volume()],
            biomes: vec![BiomeId(0); dims.columns()],
            heights: vec![0; dims.columns()],
            boundary_features: Vec::new(),
            applied: BTreeSet::new(),
            generated: blake3::Hash::from([0; 32]),
        })
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            ChunkCache::new(0),
            Err(GenerationError::CacheCapacity { capacity: 0 })
        ));
    }

    #[test]
    fn cache_evicts_old_chunks() {
        let mut cache = ChunkCache::new(2).unwrap();
        let a = ChunkPos::new(0, 0);
        let b = ChunkPos::new(1, 0);
        let c = ChunkPos::new(2, 0);
        cache.insert(chunk(0, 0));
        cache.insert(chunk(1, 0));
        assert_eq!(cache.len(), 2);
        let evicted = cache.insert(chunk(2, 0));
        assert_eq!(evicted, vec![a]);
        assert_eq!(cache.len(), 2);
        // `a` should have been evicted (least recently used).
        assert!(cache.peek(a).is_none());
        assert!(cache.peek(b).is_some());
        assert!(cache.peek(c).is_some());
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache = ChunkCache::new(2).unwrap();
        cache.insert(chunk(0, 0));
        cache.insert(chunk(1, 0));
        assert!(cache.get(ChunkPos::new(0, 0)).is_some());
        let evicted = cache.insert(chunk(2, 0));
        assert_eq!(evicted, vec![ChunkPos::new(1, 0)]);
    }

    #[test]
    fn peek_does_not_refresh_recency() {
        let mut cache = ChunkCache::new(2).unwrap();
        cache.insert(chunk(0, 0));
        cache.insert(chunk(1, 0));
        assert!(cache.peek(ChunkPos::new(0, 0)).is_some());
        let evicted = cache.insert(chunk(2, 0));
        assert_eq!(evicted, vec![ChunkPos::new(0, 0)]);
    }

    #[test]
    fn pinned_chunks_survive_until_unpinned() {
        let mut cache = ChunkCache::new(1).unwrap();
        let a = ChunkPos::new(0, 0);
        cache.insert(chunk(0, 0));
        assert!(cache.set_flag(a, EntryFlags::PINNED));
        assert!(cache.insert(chunk(1, 0)).is_empty());
        assert_eq!(cache.len(), 2, "pinned chunk forces overflow");
        assert!(cache.contains(a));

        let evicted = cache.clear_flag(a, EntryFlags::PINNED);
        assert_eq!(evicted, vec![a]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn dirty_and_pinned_are_independent() {
        let mut cache = ChunkCache::new(1).unwrap();
        let a = ChunkPos::new(0, 0);
        cache.insert(chunk(0, 0));
        cache.set_flag(a, EntryFlags::PINNED);
        cache.set_flag(a, EntryFlags::DIRTY);
        cache.insert(chunk(1, 0));
        assert!(cache.clear_flag(a, EntryFlags::PINNED).is_empty());
        assert_eq!(cache.flags(a), Some(EntryFlags::DIRTY));
        assert_eq!(cache.clear_flag(a, EntryFlags::DIRTY), vec![a]);
    }

    #[test]
    fn replace_keeps_flags_and_order() {
        let mut cache = ChunkCache::new(2).unwrap();
        cache.insert(chunk(0, 0));
        cache.insert(chunk(1, 0));
        cache.set_flag(ChunkPos::new(1, 0), EntryFlags::DIRTY);
        assert!(cache.replace(chunk(0, 0)));
        assert!(!cache.replace(chunk(5, 5)));
        let evicted = cache.insert(chunk(2, 0));
        assert_eq!(evicted, vec![ChunkPos::new(0, 0)]);
        assert_eq!(cache.flags(ChunkPos::new(1, 0)), Some(EntryFlags::DIRTY));
    }

    #[test]
    fn flags_on_missing_chunks_are_ignored() {
        let mut cache = ChunkCache::new(2).unwrap();
        assert!(!cache.set_flag(ChunkPos::new(9, 9), EntryFlags::PINNED));
        assert!(cache.clear_flag(ChunkPos::new(9, 9), EntryFlags::PINNED).is_empty());
        assert_eq!(cache.positions(), Vec::<ChunkPos>::new());
    }
}
