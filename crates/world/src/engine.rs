//! Engine facade handed to the host.

use std::sync::Arc;

use tracing::info;
use worldgen_core::{
    BiomeDescriptor, BiomeRegistry, BuiltinBiomes, BuiltinMaterials, ChunkPos, GenerationError,
    MaterialDescriptor, MaterialId, MaterialRegistry, MAX_BLOCK_COORD,
};

use crate::biome::{Biome, BiomeId};
use crate::chunk::ChunkData;
use crate::climate::ClimateSample;
use crate::config::EngineConfig;
use crate::noise::LayerSeeds;
use crate::scheduler::{ChunkCallback, PendingChunk, Scheduler, SchedulerConfig, StatsSnapshot};
use crate::terrain::Pipeline;

/// Seeded world generator with a shared chunk cache.
///
/// All methods take `&self`; the engine can be shared across threads.
pub struct WorldgenEngine {
    config: EngineConfig,
    scheduler: Scheduler<Pipeline>,
    materials: Arc<dyn MaterialRegistry>,
    biomes: Arc<dyn BiomeRegistry>,
}

impl WorldgenEngine {
    /// Validate `config` against the host registries and start the workers.
    pub fn new(
        config: EngineConfig,
        materials: Arc<dyn MaterialRegistry>,
        biomes: Arc<dyn BiomeRegistry>,
    ) -> Result<Self, GenerationError> {
        let seeds = LayerSeeds::derive(config.world_seed());
        Self::with_seeds(config, materials, biomes, seeds)
    }

    /// Engine over an explicit noise layer seed table.
    pub fn with_seeds(
        config: EngineConfig,
        materials: Arc<dyn MaterialRegistry>,
        biomes: Arc<dyn BiomeRegistry>,
        seeds: LayerSeeds,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        if let Some(spec) = config
            .biome_table
            .iter()
            .find(|spec| biomes.lookup(&spec.name).is_none())
        {
            return Err(GenerationError::invalid(format!(
                "biome '{}' is not registered with the host",
                spec.name
            )));
        }
        let pipeline = Pipeline::with_seeds(&config, materials.as_ref(), seeds)?;
        let scheduler = Scheduler::new(
            pipeline,
            SchedulerConfig {
                workers: config.worker_threads,
                cache_capacity: config.cache_capacity,
                budget: config.timeout(),
            },
        )?;
        info!(
            seed = config.seed,
            chunk_size = config.chunk_size,
            world_height = config.world_height,
            workers = config.worker_threads,
            biomes = config.biome_table.len(),
            "worldgen engine ready"
        );
        Ok(Self {
            config,
            scheduler,
            materials,
            biomes,
        })
    }

    /// Engine backed by the built-in material and biome registries.
    pub fn with_builtin_registries(config: EngineConfig) -> Result<Self, GenerationError> {
        Self::new(
            config,
            Arc::new(BuiltinMaterials::default()),
            Arc::new(BuiltinBiomes::standard()),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate (or fetch) a chunk, blocking until it is available.
    ///
    /// `seed` must be the seed the engine was configured with.
    pub fn generate(&self, seed: i64, pos: ChunkPos) -> Result<Arc<ChunkData>, GenerationError> {
        if seed != self.config.seed {
            return Err(GenerationError::invalid(format!(
                "engine was configured with seed {}, not {seed}",
                self.config.seed
            )));
        }
        self.request(pos).wait()
    }

    /// Non-blocking request; the handle yields the chunk once published.
    pub fn request(&self, pos: ChunkPos) -> PendingChunk {
        match pos.validate(self.config.chunk_size) {
            Ok(()) => self.scheduler.request(pos),
            Err(err) => PendingChunk::failed(pos, err),
        }
    }

    /// Request a chunk and receive the result through `callback`.
    pub fn request_with(&self, pos: ChunkPos, callback: ChunkCallback) {
        self.request(pos).on_ready(callback);
    }

    /// Resident chunk, if any.
    pub fn cached(&self, pos: ChunkPos) -> Option<Arc<ChunkData>> {
        self.scheduler.cached(pos)
    }

    pub fn resident(&self) -> Vec<ChunkPos> {
        self.scheduler.resident()
    }

    pub fn height_at(&self, x: i64, z: i64) -> Result<i32, GenerationError> {
        check_column(x, z)?;
        self.pipeline().density().height_at(x, z)
    }

    pub fn density_at(&self, x: i64, y: i32, z: i64) -> Result<f64, GenerationError> {
        check_column(x, z)?;
        self.pipeline().density().density_at(x, y, z)
    }

    pub fn climate_at(&self, x: i64, z: i64) -> Result<ClimateSample, GenerationError> {
        check_column(x, z)?;
        self.pipeline().density().climate().sample(x, z)
    }

    /// Biome for an arbitrary climate vector.
    pub fn classify(&self, climate: &ClimateSample) -> Result<&Biome, GenerationError> {
        self.pipeline().biomes().classify(climate)
    }

    /// Classified biome of the column at `(x, z)`.
    pub fn biome_at(&self, x: i64, z: i64) -> Result<&Biome, GenerationError> {
        let climate = self.climate_at(x, z)?;
        self.classify(&climate)
    }

    pub fn biome(&self, id: BiomeId) -> Option<&Biome> {
        self.pipeline().biomes().get(id)
    }

    /// Host-side descriptor of a biome.
    pub fn host_biome(&self, id: BiomeId) -> Option<&BiomeDescriptor> {
        let biome = self.biome(id)?;
        self.biomes.lookup(&biome.name)
    }

    pub fn material(&self, id: MaterialId) -> Option<&MaterialDescriptor> {
        self.materials.descriptor(id)
    }

    /// Keep a resident chunk in memory. Returns false if it is not resident.
    pub fn pin(&self, pos: ChunkPos) -> bool {
        self.scheduler.pin(pos)
    }

    pub fn unpin(&self, pos: ChunkPos) {
        self.scheduler.unpin(pos);
    }

    /// Flag a resident chunk as edited by the host. Returns false if it is not resident.
    pub fn mark_dirty(&self, pos: ChunkPos) -> bool {
        self.scheduler.mark_dirty(pos)
    }

    pub fn clear_dirty(&self, pos: ChunkPos) {
        self.scheduler.clear_dirty(pos);
    }

    pub fn pending_markers(&self) -> usize {
        self.scheduler.pending_markers()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.scheduler.stats()
    }

    fn pipeline(&self) -> &Pipeline {
        self.scheduler.source()
    }
}

fn check_column(x: i64, z: i64) -> Result<(), GenerationError> {
    if x.abs() > MAX_BLOCK_COORD || z.abs() > MAX_BLOCK_COORD {
        return Err(GenerationError::invalid(format!(
            "column ({x}, {z}) lies outside the generatable world"
        )));
    }
    Ok(())
}
