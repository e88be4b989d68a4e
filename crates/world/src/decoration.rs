//! Ore veins and surface features.
//!
//! Ores never leave their chunk. Surface features (trees, cacti, boulders)
//! are planned per column and ruins per structure region; a feature whose
//! blocks stay inside the chunk is written immediately, anything else becomes
//! a [`FeatureMarker`] that is carved only once every chunk it touches exists.

use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use worldgen_core::{ChunkPos, GenerationError, MaterialId, WorldSeed};

use crate::biome::{BiomeTable, TreeStyle};
use crate::chunk::ChunkDims;
use crate::noise::{NoiseKernel, NoiseLayer};
use crate::palette::Palette;
use crate::structures::{ruin_blocks, StructurePlacement, RUIN_RADIUS, RUIN_WALL_HEIGHT};

const ORE_SALT: u64 = 0x6f72_655f_7665_696e;
const FEATURE_SALT: u64 = 0x6665_6174_7572_6573;
const RUIN_SALT: u64 = 0x7275_696e_5f73_6974;

/// Largest horizontal distance from a feature's key column to any of its blocks.
pub const MAX_FEATURE_RADIUS: i64 = RUIN_RADIUS;

/// How many chunks away a feature planned in one chunk can reach.
pub fn feature_reach(chunk_size: u32) -> u32 {
    let size = i64::from(chunk_size.max(1));
    ((MAX_FEATURE_RADIUS + size - 1) / size) as u32
}

/// Kinds of surface feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Tree(TreeStyle),
    Cactus,
    Boulder,
    Ruin,
}

impl FeatureKind {
    fn tag(self) -> u8 {
        match self {
            FeatureKind::Tree(TreeStyle::Oak) => 0,
            FeatureKind::Tree(TreeStyle::Spruce) => 1,
            FeatureKind::Tree(TreeStyle::Jungle) => 2,
            FeatureKind::Cactus => 3,
            FeatureKind::Boulder => 4,
            FeatureKind::Ruin => 5,
        }
    }
}

/// Identity of a placed feature: its origin block and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerKey {
    pub x: i64,
    pub y: i32,
    pub z: i64,
    pub kind: FeatureKind,
}

impl MarkerKey {
    pub(crate) fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.extend_from_slice(&self.z.to_le_bytes());
        out.push(self.kind.tag());
    }
}

/// One block of a feature, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureBlock {
    pub x: i64,
    pub y: i32,
    pub z: i64,
    pub material: MaterialId,
}

/// A planned feature and the chunks its blocks land in.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMarker {
    pub key: MarkerKey,
    /// Chunk holding the key column; the chunk that plans the feature.
    pub origin: ChunkPos,
    pub blocks: Arc<[FeatureBlock]>,
    /// Sorted, without duplicates.
    pub touched: Vec<ChunkPos>,
}

impl FeatureMarker {
    pub fn new(key: MarkerKey, blocks: Vec<FeatureBlock>, chunk_size: u32) -> Self {
        let size = i64::from(chunk_size);
        let origin = ChunkPos::new(key.x.div_euclid(size) as i32, key.z.div_euclid(size) as i32);
        let mut touched: Vec<ChunkPos> = blocks
            .iter()
            .map(|b| ChunkPos::new(b.x.div_euclid(size) as i32, b.z.div_euclid(size) as i32))
            .collect();
        touched.sort();
        touched.dedup();
        Self {
            key,
            origin,
            blocks: blocks.into(),
            touched,
        }
    }

    pub fn touches(&self, pos: ChunkPos) -> bool {
        self.touched.binary_search(&pos).is_ok()
    }

    /// Whether every block lands in a single chunk.
    pub fn is_local(&self) -> bool {
        self.touched.len() <= 1
    }
}

/// Write the part of `marker` that falls inside the chunk at `pos`.
pub(crate) fn write_feature(
    blocks: &mut [MaterialId],
    dims: ChunkDims,
    pos: ChunkPos,
    marker: &FeatureMarker,
    palette: &Palette,
) {
    let (ox, oz) = pos.origin(dims.size);
    let size = i64::from(dims.size);
    for block in marker.blocks.iter() {
        let (lx, lz) = (block.x - ox, block.z - oz);
        if lx < 0 || lz < 0 || lx >= size || lz >= size {
            continue;
        }
        if block.y < 0 || block.y >= dims.height as i32 {
            continue;
        }
        let idx = dims.index(lx as usize, block.y as usize, lz as usize);
        if palette.feature_wins(blocks[idx], block.material) {
            blocks[idx] = block.material;
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Ore {
    Coal,
    Iron,
    Gold,
    Diamond,
}

/// (ore, veins per 16x16 chunk, min y, max y, blocks per vein)
const ORE_TABLE: [(Ore, u32, i32, i32, u32); 4] = [
    (Ore::Coal, 20, 5, 128, 8),
    (Ore::Iron, 12, 5, 64, 6),
    (Ore::Gold, 3, 5, 32, 5),
    (Ore::Diamond, 1, 5, 16, 4),
];

impl Ore {
    fn material(self, palette: &Palette) -> MaterialId {
        match self {
            Ore::Coal => palette.coal_ore,
            Ore::Iron => palette.iron_ore,
            Ore::Gold => palette.gold_ore,
            Ore::Diamond => palette.diamond_ore,
        }
    }
}

/// Places ores and plans surface features for one chunk at a time.
#[derive(Clone)]
pub struct Decorator {
    seed: WorldSeed,
    kernel: Arc<NoiseKernel>,
    palette: Arc<Palette>,
    dims: ChunkDims,
    sea_level: i32,
    ruins: StructurePlacement,
}

impl Decorator {
    pub fn new(
        seed: WorldSeed,
        kernel: Arc<NoiseKernel>,
        palette: Arc<Palette>,
        dims: ChunkDims,
        sea_level: i32,
    ) -> Self {
        Self {
            seed,
            kernel,
            palette,
            dims,
            sea_level,
            ruins: StructurePlacement::default(),
        }
    }

    /// Use `placement` for ruin starts.
    pub fn with_ruins(mut self, placement: StructurePlacement) -> Self {
        self.ruins = placement;
        self
    }

    /// Grow ore veins through stone. Veins stay inside the chunk.
    pub fn place_ores(&self, pos: ChunkPos, blocks: &mut [MaterialId]) -> Result<(), GenerationError> {
        let size = self.dims.size as i32;
        let height = self.dims.height as i32;
        let (ox, oz) = pos.origin(self.dims.size);
        let center = f64::from(size) / 2.0;
        let richness = self.kernel.sample_2d(
            NoiseLayer::Ores,
            ox as f64 + center,
            oz as f64 + center,
        )?;
        let area_scale = f64::from(size * size) / 256.0;
        let mut rng = self
            .seed
            .rng_at(ORE_SALT, i64::from(pos.x), 0, i64::from(pos.z));

        for (ore, veins, min_y, max_y, vein_size) in ORE_TABLE {
            let max_y = max_y.min(height - 1);
            if max_y < min_y {
                continue;
            }
            let count = (f64::from(veins) * area_scale * (0.75 + 0.25 * (richness + 1.0)))
                .round()
                .max(1.0) as u32;
            let material = ore.material(&self.palette);
            for _ in 0..count {
                let mut x = rng.gen_range(0..size);
                let mut y = rng.gen_range(min_y..=max_y);
                let mut z = rng.gen_range(0..size);
                for _ in 0..vein_size {
                    let idx = self.dims.index(x as usize, y as usize, z as usize);
                    if blocks[idx] == self.palette.stone {
                        blocks[idx] = material;
                    }
                    match rng.gen_range(0..3) {
                        0 => x = (x + rng.gen_range(-1..=1)).clamp(0, size - 1),
                        1 => y = (y + rng.gen_range(-1..=1)).clamp(min_y, max_y),
                        _ => z = (z + rng.gen_range(-1..=1)).clamp(0, size - 1),
                    }
                }
            }
        }
        Ok(())
    }

    /// Plan surface features for every eligible column.
    pub fn plan_features(
        &self,
        pos: ChunkPos,
        table: &BiomeTable,
        biomes: &[crate::biome::BiomeId],
        heights: &[i32],
        blocks: &[MaterialId],
    ) -> Result<Vec<FeatureMarker>, GenerationError> {
        let size = self.dims.size as usize;
        let (ox, oz) = pos.origin(self.dims.size);
        let mut features = Vec::new();
        for lz in 0..size {
            for lx in 0..size {
                let column = self.dims.column(lx, lz);
                let biome = table.get(biomes[column]).ok_or_else(|| {
                    GenerationError::pipeline(format!("unknown biome id {:?}", biomes[column]))
                })?;
                let rules = &biome.decoration;
                if rules.tree_chance + rules.cactus_chance + rules.boulder_chance <= 0.0 {
                    continue;
                }
                let h = heights[column];
                if h < self.sea_level || h + 1 >= self.dims.height as i32 {
                    continue;
                }
                let top = blocks[self.dims.index(lx, h as usize, lz)];
                let above = blocks[self.dims.index(lx, h as usize + 1, lz)];
                if top != biome.surface || above != self.palette.air {
                    continue;
                }

                let (wx, wz) = (ox + lx as i64, oz + lz as i64);
                let vegetation = self
                    .kernel
                    .sample_2d(NoiseLayer::Vegetation, wx as f64, wz as f64)?;
                let tree_chance = match rules.tree {
                    Some(_) => rules.tree_chance * (1.0 + 0.6 * vegetation),
                    None => 0.0,
                };
                let mut rng = self.seed.rng_at(FEATURE_SALT, wx, 0, wz);
                let roll: f64 = rng.gen();
                let kind = match rules.tree {
                    Some(style) if roll < tree_chance => FeatureKind::Tree(style),
                    _ if roll < tree_chance + rules.cactus_chance => FeatureKind::Cactus,
                    _ if roll < tree_chance + rules.cactus_chance + rules.boulder_chance => {
                        FeatureKind::Boulder
                    }
                    _ => continue,
                };
                let key = MarkerKey {
                    x: wx,
                    y: h + 1,
                    z: wz,
                    kind,
                };
                let shape = self.shape(key, &mut rng);
                features.push(FeatureMarker::new(key, shape, self.dims.size));
            }
        }
        Ok(features)
    }

    /// Plan the ruin of this chunk's structure region if the chunk is the
    /// region's start and its chosen column is dry land.
    pub fn plan_ruin(&self, pos: ChunkPos, heights: &[i32]) -> Option<FeatureMarker> {
        if !self.ruins.is_start_chunk(self.seed, pos) {
            return None;
        }
        let size = self.dims.size as usize;
        let mut rng = self
            .seed
            .rng_at(RUIN_SALT ^ self.ruins.salt, i64::from(pos.x), 0, i64::from(pos.z));
        let lx = rng.gen_range(0..size);
        let lz = rng.gen_range(0..size);
        let h = heights[self.dims.column(lx, lz)];
        if h < self.sea_level || h + 1 + RUIN_WALL_HEIGHT >= self.dims.height as i32 {
            return None;
        }
        let (ox, oz) = pos.origin(self.dims.size);
        let key = MarkerKey {
            x: ox + lx as i64,
            y: h + 1,
            z: oz + lz as i64,
            kind: FeatureKind::Ruin,
        };
        let shape = self.shape(key, &mut rng);
        Some(FeatureMarker::new(key, shape, self.dims.size))
    }

    fn shape(&self, key: MarkerKey, rng: &mut ChaCha8Rng) -> Vec<FeatureBlock> {
        let mut out = Vec::new();
        let mut put = |dx: i64, y: i32, dz: i64, material: MaterialId| {
            out.push(FeatureBlock {
                x: key.x + dx,
                y,
                z: key.z + dz,
                material,
            });
        };
        let base = key.y;
        match key.kind {
            FeatureKind::Tree(style) => {
                let (log, leaves) = self.palette.tree_materials(style);
                let trunk = match style {
                    TreeStyle::Oak => rng.gen_range(4..=6),
                    TreeStyle::Spruce => rng.gen_range(6..=9),
                    TreeStyle::Jungle => rng.gen_range(8..=12),
                };
                let top = base + trunk - 1;
                for y in base..=top {
                    put(0, y, 0, log);
                }
                match style {
                    TreeStyle::Oak => {
                        for y in top - 2..=top + 1 {
                            let radius: i64 = if y >= top { 1 } else { 2 };
                            for dz in -radius..=radius {
                                for dx in -radius..=radius {
                                    let corner = dx.abs() == radius && dz.abs() == radius;
                                    if corner && (radius == 2 || y == top + 1) {
                                        continue;
                                    }
                                    put(dx, y, dz, leaves);
                                }
                            }
                        }
                    }
                    TreeStyle::Spruce => {
                        for y in base + 2..=top {
                            let radius = i64::from(((top - y) / 2 + 1).min(2) - (top - y) % 2);
                            for dz in -radius..=radius {
                                for dx in -radius..=radius {
                                    if dx.abs() + dz.abs() <= radius + 1 {
                                        put(dx, y, dz, leaves);
                                    }
                                }
                            }
                        }
                        put(0, top + 1, 0, leaves);
                    }
                    TreeStyle::Jungle => {
                        for y in top - 1..=top + 1 {
                            let radius: i64 = if y > top { 2 } else { 3 };
                            for dz in -radius..=radius {
                                for dx in -radius..=radius {
                                    if dx * dx + dz * dz <= radius * radius {
                                        put(dx, y, dz, leaves);
                                    }
                                }
                            }
                        }
                    }
                }
            }
            FeatureKind::Cactus => {
                let height = rng.gen_range(1..=3);
                for y in base..base + height {
                    put(0, y, 0, self.palette.cactus);
                }
            }
            FeatureKind::Ruin => out.extend(ruin_blocks(key, &self.palette, rng)),
            FeatureKind::Boulder => {
                let radius: i64 = rng.gen_range(1..=2);
                for dy in -radius..=radius {
                    for dz in -radius..=radius {
                        for dx in -radius..=radius {
                            if dx * dx + dy * dy + dz * dz <= radius * radius + 1 {
                                put(dx, base + dy as i32, dz, self.palette.boulder);
                            }
                        }
                    }
                }
            }
        }
        let height = self.dims.height as i32;
        out.retain(|block| block.y >= 0 && block.y < height);
        out
    }
}
