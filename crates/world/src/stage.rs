//! Per-chunk generation state machine.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use worldgen_core::{ChunkPos, GenerationError, MaterialId};

use crate::biome::BiomeId;
use crate::chunk::{ChunkData, ChunkDims};
use crate::climate::ClimateGrid;
use crate::decoration::{FeatureMarker, MarkerKey};

/// Generation stages, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChunkStage {
    Requested,
    ClimateComputed,
    BiomeAssigned,
    TerrainFilled,
    Carved,
    Decorated,
    Finalized,
}

impl ChunkStage {
    /// The stage that must follow this one.
    pub fn next(self) -> Option<ChunkStage> {
        match self {
            ChunkStage::Requested => Some(ChunkStage::ClimateComputed),
            ChunkStage::ClimateComputed => Some(ChunkStage::BiomeAssigned),
            ChunkStage::BiomeAssigned => Some(ChunkStage::TerrainFilled),
            ChunkStage::TerrainFilled => Some(ChunkStage::Carved),
            ChunkStage::Carved => Some(ChunkStage::Decorated),
            ChunkStage::Decorated => Some(ChunkStage::Finalized),
            ChunkStage::Finalized => None,
        }
    }
}

/// Time budget for one chunk's pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pos: ChunkPos,
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start a budget of `budget` for `pos` now.
    pub fn new(pos: ChunkPos, budget: Duration) -> Self {
        Self {
            pos,
            started: Instant::now(),
            budget,
        }
    }

    /// A deadline that has already passed.
    pub fn expired(pos: ChunkPos) -> Self {
        Self::new(pos, Duration::ZERO)
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    /// Fail with [`GenerationError::Timeout`] once the budget is spent.
    pub fn check(&self) -> Result<(), GenerationError> {
        if self.is_expired() {
            Err(GenerationError::Timeout {
                pos: self.pos,
                budget_ms: self.budget.as_millis() as u64,
            })
        } else {
            Ok(())
        }
    }
}

/// A chunk part-way through the pipeline. Never visible outside it.
#[derive(Debug)]
pub struct ProtoChunk {
    pos: ChunkPos,
    dims: ChunkDims,
    stage: ChunkStage,
    pub(crate) climate: Option<ClimateGrid>,
    /// Classified biome per column.
    pub(crate) biomes: Vec<BiomeId>,
    /// Blended biome supplying each column's surface materials.
    pub(crate) surface_biomes: Vec<BiomeId>,
    pub(crate) heights: Vec<i32>,
    pub(crate) blocks: Vec<MaterialId>,
    pub(crate) boundary: Vec<FeatureMarker>,
    pub(crate) applied: BTreeSet<MarkerKey>,
}

impl ProtoChunk {
    pub fn new(pos: ChunkPos, dims: ChunkDims) -> Self {
        Self {
            pos,
            dims,
            stage: ChunkStage::Requested,
            climate: None,
            biomes: Vec::new(),
            surface_biomes: Vec::new(),
            heights: Vec::new(),
            blocks: Vec::new(),
            boundary: Vec::new(),
            applied: BTreeSet::new(),
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn stage(&self) -> ChunkStage {
        self.stage
    }

    /// Move to `next`, which must directly follow the current stage.
    pub fn advance(&mut self, next: ChunkStage) -> Result<(), GenerationError> {
        if self.stage.next() != Some(next) {
            return Err(GenerationError::pipeline(format!(
                "chunk {} cannot move from {:?} to {:?}",
                self.pos, self.stage, next
            )));
        }
        self.stage = next;
        Ok(())
    }

    /// Seal the chunk. Only a fully decorated chunk can be finalized.
    pub fn finalize(mut self) -> Result<ChunkData, GenerationError> {
        self.advance(ChunkStage::Finalized)?;
        if self.blocks.len() != self.dims.volume()
            || self.biomes.len() != self.dims.columns()
            || self.heights.len() != self.dims.columns()
        {
            return Err(GenerationError::pipeline(format!(
                "chunk {} finalized with incomplete data",
                self.pos
            )));
        }
        self.boundary.sort_by_key(|marker| marker.key);
        Ok(ChunkData {
            pos: self.pos,
            dims: self.dims,
            blocks: self.blocks,
            biomes: self.biomes,
            heights: self.heights,
            boundary_features: self.boundary,
            applied: self.applied,
            generated: blake3::Hash::from([0; 32]),
        }
        .sealed())
    }
}
