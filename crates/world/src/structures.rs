//! Region-grid structure placement and the ruin template.
//!
//! The world is split into square regions of `spacing` chunks. Each region
//! holds exactly one candidate start chunk, offset from the region corner by
//! less than `spacing - separation` chunks, so starts in adjacent regions are
//! at least `separation` chunks apart. A structure is planned by its start
//! chunk like any other surface feature and reaches its neighbors through
//! the deferred marker path.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use worldgen_core::{ChunkPos, GenerationError, WorldSeed};

use crate::decoration::{FeatureBlock, MarkerKey};
use crate::palette::Palette;

/// Half-width of the ruin footprint in blocks.
pub const RUIN_RADIUS: i64 = 5;
/// Wall courses above the ruin floor.
pub const RUIN_WALL_HEIGHT: i32 = 3;

/// Distribution of a start chunk's offset inside its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadType {
    Linear,
    /// Mean of two linear draws; favors the region centre.
    Triangular,
}

impl SpreadType {
    fn sample(self, rng: &mut ChaCha8Rng, bound: i32) -> i32 {
        if bound <= 0 {
            return 0;
        }
        match self {
            SpreadType::Linear => rng.gen_range(0..bound),
            SpreadType::Triangular => (rng.gen_range(0..bound) + rng.gen_range(0..bound)) / 2,
        }
    }
}

/// Where one structure type may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructurePlacement {
    pub enabled: bool,
    /// Region side in chunks.
    pub spacing: u32,
    /// Minimum chunk gap between starts in adjacent regions.
    pub separation: u32,
    /// Distinguishes structure types sharing a grid.
    pub salt: u64,
    pub spread: SpreadType,
}

impl Default for StructurePlacement {
    fn default() -> Self {
        Self {
            enabled: true,
            spacing: 12,
            separation: 4,
            salt: 0x5255_494E,
            spread: SpreadType::Linear,
        }
    }
}

impl StructurePlacement {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(1..=4096).contains(&self.spacing) {
            return Err(GenerationError::invalid(format!(
                "structure spacing must be in 1..=4096 chunks, got {}",
                self.spacing
            )));
        }
        if self.separation >= self.spacing {
            return Err(GenerationError::invalid(format!(
                "structure separation {} must be smaller than spacing {}",
                self.separation, self.spacing
            )));
        }
        Ok(())
    }

    fn spacing(&self) -> i32 {
        self.spacing.max(1) as i32
    }

    /// Region containing `pos`.
    pub fn region_of(&self, pos: ChunkPos) -> (i32, i32) {
        let spacing = self.spacing();
        (pos.x.div_euclid(spacing), pos.z.div_euclid(spacing))
    }

    /// The single candidate start chunk of `region`.
    pub fn start_chunk(&self, seed: WorldSeed, region: (i32, i32)) -> ChunkPos {
        let spacing = self.spacing();
        let bound = spacing - self.separation.min(self.spacing) as i32;
        let mut rng = seed.rng_at(self.salt, i64::from(region.0), 0, i64::from(region.1));
        let dx = self.spread.sample(&mut rng, bound);
        let dz = self.spread.sample(&mut rng, bound);
        ChunkPos::new(
            region.0.wrapping_mul(spacing).wrapping_add(dx),
            region.1.wrapping_mul(spacing).wrapping_add(dz),
        )
    }

    /// Whether a structure of this type starts in `pos`.
    pub fn is_start_chunk(&self, seed: WorldSeed, pos: ChunkPos) -> bool {
        self.enabled
            && self.separation < self.spacing
            && self.start_chunk(seed, self.region_of(pos)) == pos
    }
}

/// Floor and broken walls of a ruin whose floor sits at `key.y`, centred on
/// the key column.
pub(crate) fn ruin_blocks(key: MarkerKey, palette: &Palette, rng: &mut ChaCha8Rng) -> Vec<FeatureBlock> {
    let mut out = Vec::new();
    let mut put = |dx: i64, y: i32, dz: i64, material| {
        out.push(FeatureBlock {
            x: key.x + dx,
            y,
            z: key.z + dz,
            material,
        });
    };
    for dz in -RUIN_RADIUS..=RUIN_RADIUS {
        for dx in -RUIN_RADIUS..=RUIN_RADIUS {
            let material = if rng.gen_ratio(1, 5) {
                palette.cobblestone
            } else {
                palette.stone_bricks
            };
            put(dx, key.y, dz, material);
        }
    }
    for course in 1..=RUIN_WALL_HEIGHT {
        for dz in -RUIN_RADIUS..=RUIN_RADIUS {
            for dx in -RUIN_RADIUS..=RUIN_RADIUS {
                let wall = dx.abs() == RUIN_RADIUS || dz.abs() == RUIN_RADIUS;
                // Ruined look: gaps in the walls.
                if !wall || rng.gen_ratio(1, 4) {
                    continue;
                }
                let material = if rng.gen_ratio(1, 6) {
                    palette.moss_block
                } else {
                    palette.stone_bricks
                };
                put(dx, key.y + course, dz, material);
            }
        }
    }
    out
}
