//! Procedural chunk generation: noise, climate, biomes, terrain and the
//! concurrent chunk scheduler.

mod biome;
mod caves;
mod chunk;
mod climate;
mod config;
mod decoration;
mod density;
mod engine;
mod markers;
mod noise;
mod palette;
mod scheduler;
mod stage;
mod storage;
mod structures;
mod terrain;

pub use crate::biome::{
    blend_column, default_biome_table, validate_biome_table, Biome, BiomeBlend, BiomeId,
    BiomeSpec, BiomeTable, ClimateSpan, ClimateTarget, ClimateWeights, DecorationRules, TreeStyle,
};
pub use crate::caves::{CaveCarver, CaveParams};
pub use crate::chunk::{ChunkData, ChunkDims};
pub use crate::climate::{
    quantize, ClimateGrid, ClimateParameter, ClimateSample, ClimateSampler, QuantizedClimate,
    QUANTIZATION,
};
pub use crate::config::EngineConfig;
pub use crate::decoration::{
    feature_reach, Decorator, FeatureBlock, FeatureKind, FeatureMarker, MarkerKey,
    MAX_FEATURE_RADIUS,
};
pub use crate::density::{
    density_at, height_at, peaks_and_valleys, DensityField, TerrainShape, DEFAULT_OCTAVES,
    SEA_LEVEL, WORLD_HEIGHT,
};
pub use crate::engine::WorldgenEngine;
pub use crate::markers::MarkerArena;
pub use crate::noise::{LayerSeeds, NoiseKernel, NoiseLayer, NoiseSettings};
pub use crate::palette::{resolve_material, Palette, PRIORITY_LEAVES, PRIORITY_SOLID};
pub use crate::scheduler::{
    ChunkCallback, ChunkResult, ChunkSource, PendingChunk, Scheduler, SchedulerConfig,
    StatsSnapshot,
};
pub use crate::stage::{ChunkStage, Deadline, ProtoChunk};
pub use crate::storage::{ChunkCache, EntryFlags};
pub use crate::structures::{SpreadType, StructurePlacement, RUIN_RADIUS, RUIN_WALL_HEIGHT};
pub use crate::terrain::Pipeline;
