use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use worldgen_core::{GenerationError, WorldSeed};

use crate::biome::{default_biome_table, validate_biome_table, BiomeSpec, ClimateWeights};
use crate::chunk::ChunkDims;
use crate::density::{TerrainShape, DEFAULT_OCTAVES, SEA_LEVEL, WORLD_HEIGHT};
use crate::structures::StructurePlacement;

/// Engine configuration, immutable once an engine is built from it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: i64,
    /// Horizontal chunk side in blocks; a power of two in 4..=64.
    pub chunk_size: u32,
    pub sea_level: i32,
    /// Vertical extent in blocks; a multiple of 16 in 16..=1024.
    pub world_height: u32,
    pub noise_octaves: u32,
    /// Unpinned chunks kept resident.
    pub cache_capacity: usize,
    /// Per-chunk pipeline budget.
    pub generation_timeout_ms: u64,
    pub worker_threads: usize,
    /// Blend radius in columns; 0 disables blending.
    pub blend_radius: u32,
    pub climate_weights: ClimateWeights,
    pub biome_table: Vec<BiomeSpec>,
    /// Region grid for ruin starts.
    pub ruins: StructurePlacement,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_size: 16,
            sea_level: SEA_LEVEL,
            world_height: WORLD_HEIGHT,
            noise_octaves: DEFAULT_OCTAVES,
            cache_capacity: 256,
            generation_timeout_ms: 5_000,
            worker_threads: 4,
            blend_radius: 2,
            climate_weights: ClimateWeights::default(),
            biome_table: default_biome_table(),
            ruins: StructurePlacement::default(),
        }
    }
}

impl EngineConfig {
    /// Default configuration for `seed`.
    pub fn new(seed: i64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(contents).context("failed to parse engine config")?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every option against its allowed range.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !self.chunk_size.is_power_of_two() || !(4..=64).contains(&self.chunk_size) {
            return Err(GenerationError::invalid(format!(
                "chunk_size must be a power of two in 4..=64, got {}",
                self.chunk_size
            )));
        }
        if !(16..=1024).contains(&self.world_height) || self.world_height % 16 != 0 {
            return Err(GenerationError::invalid(format!(
                "world_height must be a multiple of 16 in 16..=1024, got {}",
                self.world_height
            )));
        }
        if self.sea_level < 1 || self.sea_level >= self.world_height as i32 {
            return Err(GenerationError::invalid(format!(
                "sea_level {} must lie inside the world height {}",
                self.sea_level, self.world_height
            )));
        }
        if !(1..=8).contains(&self.noise_octaves) {
            return Err(GenerationError::invalid(format!(
                "noise_octaves must be in 1..=8, got {}",
                self.noise_octaves
            )));
        }
        if self.cache_capacity == 0 {
            return Err(GenerationError::CacheCapacity {
                capacity: self.cache_capacity,
            });
        }
        if self.generation_timeout_ms == 0 {
            return Err(GenerationError::invalid(
                "generation_timeout_ms must be positive",
            ));
        }
        if !(1..=64).contains(&self.worker_threads) {
            return Err(GenerationError::invalid(format!(
                "worker_threads must be in 1..=64, got {}",
                self.worker_threads
            )));
        }
        if self.blend_radius > 8 {
            return Err(GenerationError::invalid(format!(
                "blend_radius must be at most 8, got {}",
                self.blend_radius
            )));
        }
        self.climate_weights.validate()?;
        self.ruins.validate()?;
        validate_biome_table(&self.biome_table)
    }

    pub fn world_seed(&self) -> WorldSeed {
        WorldSeed::from_i64(self.seed)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn dims(&self) -> ChunkDims {
        ChunkDims::new(self.chunk_size, self.world_height)
    }

    pub fn shape(&self) -> TerrainShape {
        TerrainShape::new(self.sea_level, self.world_height)
    }
}
