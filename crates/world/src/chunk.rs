use std::collections::BTreeSet;

use worldgen_core::{ChunkPos, MaterialId};

use crate::biome::BiomeId;
use crate::decoration::{FeatureMarker, MarkerKey};
use crate::palette::Palette;

/// Horizontal side length and vertical extent of every chunk in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkDims {
    /// Side length in blocks (power of two).
    pub size: u32,
    /// World height in blocks.
    pub height: u32,
}

impl ChunkDims {
    pub fn new(size: u32, height: u32) -> Self {
        Self { size, height }
    }

    /// Columns per chunk.
    pub fn columns(self) -> usize {
        (self.size * self.size) as usize
    }

    /// Voxels per chunk.
    pub fn volume(self) -> usize {
        self.columns() * self.height as usize
    }

    /// Linear voxel index; Y-major, then Z, then X.
    pub fn index(self, x: usize, y: usize, z: usize) -> usize {
        let size = self.size as usize;
        debug_assert!(x < size && z < size && y < self.height as usize);
        (y * size + z) * size + x
    }

    /// Linear column index; Z-major.
    pub fn column(self, x: usize, z: usize) -> usize {
        z * self.size as usize + x
    }
}

/// A finished chunk.
///
/// Cached chunks are shared behind `Arc` and never mutated; resolving a
/// deferred feature produces a new `ChunkData`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData {
    pub(crate) pos: ChunkPos,
    pub(crate) dims: ChunkDims,
    pub(crate) blocks: Vec<MaterialId>,
    pub(crate) biomes: Vec<BiomeId>,
    pub(crate) heights: Vec<i32>,
    pub(crate) boundary_features: Vec<FeatureMarker>,
    pub(crate) applied: BTreeSet<MarkerKey>,
    /// Content hash as the pipeline produced it, before any deferred feature.
    pub(crate) generated: blake3::Hash,
}

impl ChunkData {
    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Material at chunk-local coordinates.
    pub fn block(&self, x: usize, y: usize, z: usize) -> Option<MaterialId> {
        let size = self.dims.size as usize;
        if x >= size || z >= size || y >= self.dims.height as usize {
            return None;
        }
        self.blocks.get(self.dims.index(x, y, z)).copied()
    }

    /// Material at world coordinates, if they fall inside this chunk.
    pub fn block_at_world(&self, x: i64, y: i32, z: i64) -> Option<MaterialId> {
        let (ox, oz) = self.pos.origin(self.dims.size);
        let (lx, lz) = (x - ox, z - oz);
        if lx < 0 || lz < 0 || y < 0 {
            return None;
        }
        self.block(lx as usize, y as usize, lz as usize)
    }

    /// Voxel materials in [`ChunkDims::index`] order.
    pub fn blocks(&self) -> &[MaterialId] {
        &self.blocks
    }

    /// Biome assigned to a column.
    pub fn biome(&self, x: usize, z: usize) -> Option<BiomeId> {
        if x >= self.dims.size as usize || z >= self.dims.size as usize {
            return None;
        }
        self.biomes.get(self.dims.column(x, z)).copied()
    }

    /// Per-column biomes in [`ChunkDims::column`] order.
    pub fn biomes(&self) -> &[BiomeId] {
        &self.biomes
    }

    /// Terrain surface height of a column, before carving and decoration.
    pub fn height(&self, x: usize, z: usize) -> Option<i32> {
        if x >= self.dims.size as usize || z >= self.dims.size as usize {
            return None;
        }
        self.heights.get(self.dims.column(x, z)).copied()
    }

    /// Per-column heights in [`ChunkDims::column`] order.
    pub fn heights(&self) -> &[i32] {
        &self.heights
    }

    /// Cross-border features that originate in this chunk.
    pub fn boundary_features(&self) -> &[FeatureMarker] {
        &self.boundary_features
    }

    /// Own boundary features not yet carved into this chunk.
    pub fn deferred_markers(&self) -> impl Iterator<Item = &FeatureMarker> + '_ {
        self.boundary_features
            .iter()
            .filter(|marker| !self.applied.contains(&marker.key))
    }

    /// Keys of cross-border features already carved into this chunk.
    pub fn applied_markers(&self) -> &BTreeSet<MarkerKey> {
        &self.applied
    }

    pub fn has_applied(&self, key: &MarkerKey) -> bool {
        self.applied.contains(key)
    }

    /// True once every own boundary feature has been carved.
    pub fn is_fully_decorated(&self) -> bool {
        self.deferred_markers().next().is_none()
    }

    /// Number of voxels holding `material`.
    pub fn count_material(&self, material: MaterialId) -> usize {
        self.blocks.iter().filter(|&&id| id == material).count()
    }

    /// Carve a resolved cross-border feature into this chunk.
    pub(crate) fn apply_feature(&mut self, marker: &FeatureMarker, palette: &Palette) {
        if !self.applied.insert(marker.key) {
            return;
        }
        crate::decoration::write_feature(&mut self.blocks, self.dims, self.pos, marker, palette);
    }

    /// Stable little-endian encoding of every field.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + self.blocks.len() * 2 + self.heights.len() * 6);
        out.extend_from_slice(b"WGCHUNK1");
        out.extend_from_slice(&self.pos.x.to_le_bytes());
        out.extend_from_slice(&self.pos.z.to_le_bytes());
        out.extend_from_slice(&self.dims.size.to_le_bytes());
        out.extend_from_slice(&self.dims.height.to_le_bytes());
        for block in &self.blocks {
            out.extend_from_slice(&block.to_le_bytes());
        }
        for biome in &self.biomes {
            out.extend_from_slice(&biome.0.to_le_bytes());
        }
        for height in &self.heights {
            out.extend_from_slice(&height.to_le_bytes());
        }
        out.extend_from_slice(&(self.boundary_features.len() as u32).to_le_bytes());
        for marker in &self.boundary_features {
            marker.key.write_bytes(&mut out);
            out.extend_from_slice(&(marker.touched.len() as u32).to_le_bytes());
            for pos in &marker.touched {
                out.extend_from_slice(&pos.x.to_le_bytes());
                out.extend_from_slice(&pos.z.to_le_bytes());
            }
        }
        out.extend_from_slice(&(self.applied.len() as u32).to_le_bytes());
        for key in &self.applied {
            key.write_bytes(&mut out);
        }
        out
    }

    /// Record the current content as the pipeline output.
    pub(crate) fn sealed(mut self) -> Self {
        self.generated = self.content_hash();
        self
    }

    /// Hash of the pipeline output for this chunk. Carving deferred features
    /// never changes it, so it is the same on every call for a seed.
    pub fn generation_hash(&self) -> blake3::Hash {
        self.generated
    }

    /// blake3 digest of [`ChunkData::canonical_bytes`].
    pub fn content_hash(&self) -> blake3::Hash {
        blake3::hash(&self.canonical_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_chunk(size: u32, height: u32) -> ChunkData {
        let dims = ChunkDims::new(size, height);
        ChunkData {
            pos: ChunkPos::new(1, -1),
            dims,
            blocks: vec![0; dims.volume()],
            biomes: vec![BiomeId(0); dims.columns()],
            heights: vec![0; dims.columns()],
            boundary_features: Vec::new(),
            applied: BTreeSet::new(),
            generated: blake3::Hash::from([0; 32]),
        }
    }

    #[test]
    fn index_is_y_major() {
        let dims = ChunkDims::new(16, 256);
        assert_eq!(dims.index(0, 0, 0), 0);
        assert_eq!(dims.index(1, 0, 0), 1);
        assert_eq!(dims.index(0, 0, 1), 16);
        assert_eq!(dims.index(0, 1, 0), 256);
        assert_eq!(dims.index(15, 255, 15), dims.volume() - 1);
    }

    #[test]
    fn out_of_bounds_reads_are_none() {
        let chunk = empty_chunk(16, 64);
        assert_eq!(chunk.block(0, 0, 0), Some(0));
        assert_eq!(chunk.block(16, 0, 0), None);
        assert_eq!(chunk.block(0, 64, 0), None);
        assert_eq!(chunk.height(0, 16), None);
    }

    #[test]
    fn world_lookup_respects_origin() {
        let mut chunk = empty_chunk(16, 64);
        let idx = chunk.dims.index(3, 10, 4);
        chunk.blocks[idx] = 7;
        // Chunk (1, -1) starts at block (16, -16).
        assert_eq!(chunk.block_at_world(19, 10, -12), Some(7));
        assert_eq!(chunk.block_at_world(15, 10, -12), None);
        assert_eq!(chunk.block_at_world(19, -1, -12), None);
    }

    #[test]
    fn content_hash_tracks_block_changes() {
        let a = empty_chunk(8, 32);
        let mut b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());
        b.blocks[5] = 1;
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn generation_hash_ignores_carved_features() {
        use crate::decoration::{FeatureBlock, FeatureKind};
        use worldgen_core::BuiltinMaterials;

        let palette = Palette::resolve(&BuiltinMaterials::default()).unwrap();
        let chunk = empty_chunk(16, 64).sealed();
        assert_eq!(chunk.generation_hash(), chunk.content_hash());

        let key = MarkerKey {
            x: 16,
            y: 10,
            z: -16,
            kind: FeatureKind::Boulder,
        };
        let marker = FeatureMarker::new(
            key,
            vec![
                FeatureBlock { x: 16, y: 10, z: -16, material: palette.boulder },
                FeatureBlock { x: 15, y: 10, z: -16, material: palette.boulder },
            ],
            16,
        );
        let mut carved = chunk.clone();
        carved.apply_feature(&marker, &palette);
        assert!(carved.has_applied(&key));
        assert_ne!(carved.content_hash(), chunk.content_hash());
        assert_eq!(carved.generation_hash(), chunk.generation_hash());
    }
}
