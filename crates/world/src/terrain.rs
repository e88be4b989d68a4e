//! Chunk generation pipeline.
//!
//! Runs the stages of [`ChunkStage`] in order over a [`ProtoChunk`]: climate,
//! biomes, terrain fill, cave carving and decoration, then seals the result
//! into an immutable [`ChunkData`].

use std::sync::Arc;

use tracing::{debug, instrument};
use worldgen_core::{ChunkPos, GenerationError, MaterialRegistry, WorldSeed};

use crate::biome::{blend_column, Biome, BiomeId, BiomeTable};
use crate::caves::CaveCarver;
use crate::chunk::{ChunkData, ChunkDims};
use crate::climate::ClimateGrid;
use crate::config::EngineConfig;
use crate::decoration::{feature_reach, write_feature, Decorator, FeatureMarker};
use crate::density::DensityField;
use crate::noise::{LayerSeeds, NoiseKernel};
use crate::palette::Palette;
use crate::scheduler::ChunkSource;
use crate::stage::{ChunkStage, Deadline, ProtoChunk};

const DITHER_SALT: u64 = 0x6469_7468_6572;
const BEDROCK_SALT: u64 = 0x6265_6472_6f63_6b;

/// Generates chunks for one world seed and configuration.
pub struct Pipeline {
    seed: WorldSeed,
    dims: ChunkDims,
    sea_level: i32,
    blend_radius: u32,
    density: DensityField,
    table: Arc<BiomeTable>,
    carver: CaveCarver,
    decorator: Decorator,
    palette: Arc<Palette>,
}

impl Pipeline {
    /// Build a pipeline, resolving materials through the host registry.
    pub fn new(config: &EngineConfig, materials: &dyn MaterialRegistry) -> Result<Self, GenerationError> {
        Self::with_seeds(config, materials, LayerSeeds::derive(config.world_seed()))
    }

    /// Build a pipeline over an explicit layer seed table.
    pub fn with_seeds(
        config: &EngineConfig,
        materials: &dyn MaterialRegistry,
        seeds: LayerSeeds,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        let seed = config.world_seed();
        let dims = config.dims();
        let kernel = Arc::new(NoiseKernel::new(seeds, config.noise_octaves));
        let palette = Arc::new(Palette::resolve(materials)?);
        let table = Arc::new(BiomeTable::resolve(
            &config.biome_table,
            config.climate_weights,
            materials,
        )?);
        Ok(Self {
            seed,
            dims,
            sea_level: config.sea_level,
            blend_radius: config.blend_radius,
            density: DensityField::new(Arc::clone(&kernel), config.shape()),
            table,
            carver: CaveCarver::new(Arc::clone(&kernel)),
            decorator: Decorator::new(seed, kernel, Arc::clone(&palette), dims, config.sea_level)
                .with_ruins(config.ruins),
            palette,
        })
    }

    pub fn seed(&self) -> WorldSeed {
        self.seed
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn density(&self) -> &DensityField {
        &self.density
    }

    pub fn biomes(&self) -> &BiomeTable {
        &self.table
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Run every stage for `pos`.
    #[instrument(skip(self, deadline), fields(chunk = %pos))]
    pub fn generate_chunk(&self, pos: ChunkPos, deadline: &Deadline) -> Result<ChunkData, GenerationError> {
        debug!("starting chunk pipeline");
        pos.validate(self.dims.size)?;
        let mut proto = ProtoChunk::new(pos, self.dims);

        self.compute_climate(&mut proto, deadline)?;
        deadline.check()?;
        self.assign_biomes(&mut proto, deadline)?;
        deadline.check()?;
        self.fill_terrain(&mut proto, deadline)?;
        deadline.check()?;
        self.carve_caves(&mut proto, deadline)?;
        deadline.check()?;
        self.decorate(&mut proto, deadline)?;

        let chunk = proto.finalize()?;
        debug!(
            boundary_features = chunk.boundary_features().len(),
            "chunk pipeline finished"
        );
        Ok(chunk)
    }

    fn biome(&self, id: BiomeId) -> Result<&Biome, GenerationError> {
        self.table
            .get(id)
            .ok_or_else(|| GenerationError::pipeline(format!("unknown biome id {}", id.0)))
    }

    fn compute_climate(&self, proto: &mut ProtoChunk, deadline: &Deadline) -> Result<(), GenerationError> {
        let grid = ClimateGrid::sample(
            self.density.climate(),
            proto.pos(),
            self.dims.size,
            self.blend_radius,
            deadline,
        )?;
        proto.climate = Some(grid);
        proto.advance(ChunkStage::ClimateComputed)
    }

    fn assign_biomes(&self, proto: &mut ProtoChunk, deadline: &Deadline) -> Result<(), GenerationError> {
        let grid = proto
            .climate
            .as_ref()
            .ok_or_else(|| GenerationError::pipeline("biome stage ran without climate"))?;
        let size = self.dims.size as i32;
        let pad = grid.pad();
        let side = size + 2 * pad;

        // Classify the padded grid once; blending reads neighbors from it.
        let mut classified = Vec::with_capacity((side * side) as usize);
        for gz in -pad..size + pad {
            deadline.check()?;
            for gx in -pad..size + pad {
                let sample = grid.get(gx, gz).ok_or_else(|| {
                    GenerationError::pipeline(format!("climate grid has no column ({gx}, {gz})"))
                })?;
                classified.push(self.table.classify(sample)?.id);
            }
        }
        let at = |lx: i32, lz: i32| classified[((lz + pad) * side + lx + pad) as usize];

        let (ox, oz) = proto.pos().origin(self.dims.size);
        let mut biomes = Vec::with_capacity(self.dims.columns());
        let mut surface_biomes = Vec::with_capacity(self.dims.columns());
        for lz in 0..size {
            for lx in 0..size {
                biomes.push(at(lx, lz));
                let blend = blend_column(self.blend_radius, |dx, dz| at(lx + dx, lz + dz));
                let dither = self.seed.unit_at(
                    DITHER_SALT,
                    ox + i64::from(lx),
                    0,
                    oz + i64::from(lz),
                );
                surface_biomes.push(blend.pick(dither));
            }
        }
        proto.biomes = biomes;
        proto.surface_biomes = surface_biomes;
        proto.advance(ChunkStage::BiomeAssigned)
    }

    fn fill_terrain(&self, proto: &mut ProtoChunk, deadline: &Deadline) -> Result<(), GenerationError> {
        let grid = proto
            .climate
            .as_ref()
            .ok_or_else(|| GenerationError::pipeline("terrain stage ran without climate"))?;
        let size = self.dims.size as usize;
        let height = self.dims.height as i32;
        let (ox, oz) = proto.pos().origin(self.dims.size);
        let palette = &self.palette;

        let mut blocks = vec![palette.air; self.dims.volume()];
        let mut heights = Vec::with_capacity(self.dims.columns());
        let mut solid = vec![false; height as usize];

        for lz in 0..size {
            deadline.check()?;
            for lx in 0..size {
                let (wx, wz) = (ox + lx as i64, oz + lz as i64);
                let climate = grid.get(lx as i32, lz as i32).ok_or_else(|| {
                    GenerationError::pipeline(format!("climate grid has no column ({lx}, {lz})"))
                })?;
                let base = self.density.base_height(climate);
                let biome = self.biome(proto.surface_biomes[self.dims.column(lx, lz)])?;

                let mut top = 0;
                for y in 0..height {
                    let is_solid = self.density.is_solid(wx, y, wz, base)?;
                    solid[y as usize] = is_solid;
                    if is_solid {
                        top = y;
                    }
                }

                let bedrock_top = (self.seed.unit_at(BEDROCK_SALT, wx, 0, wz) * 3.0) as i32;
                let submerged = top < self.sea_level;
                for y in 0..height {
                    let material = if y <= bedrock_top {
                        palette.bedrock
                    } else if solid[y as usize] {
                        let depth = (top - y) as u32;
                        if depth == 0 && submerged {
                            biome.underwater
                        } else if depth == 0 {
                            biome.surface
                        } else if depth <= biome.surface_depth {
                            biome.subsurface
                        } else {
                            palette.stone
                        }
                    } else if y > top && y < self.sea_level {
                        if y == self.sea_level - 1 && biome.frozen_water {
                            palette.ice
                        } else {
                            palette.water
                        }
                    } else {
                        continue;
                    };
                    blocks[self.dims.index(lx, y as usize, lz)] = material;
                }
                heights.push(top);
            }
        }

        proto.blocks = blocks;
        proto.heights = heights;
        proto.advance(ChunkStage::TerrainFilled)
    }

    fn carve_caves(&self, proto: &mut ProtoChunk, deadline: &Deadline) -> Result<(), GenerationError> {
        let size = self.dims.size as usize;
        let height = self.dims.height as i32;
        let (ox, oz) = proto.pos().origin(self.dims.size);
        let palette = &self.palette;
        let min_y = self.carver.params().min_y;

        for lz in 0..size {
            deadline.check()?;
            for lx in 0..size {
                let column = self.dims.column(lx, lz);
                let biome = self.biome(proto.surface_biomes[column])?;
                let limit = self
                    .carver
                    .carve_limit(proto.heights[column], biome.allow_cave_mouths)
                    .min(height - 1);
                let (wx, wz) = (ox + lx as i64, oz + lz as i64);
                for y in min_y..=limit {
                    let idx = self.dims.index(lx, y as usize, lz);
                    let current = proto.blocks[idx];
                    if current == palette.air
                        || current == palette.water
                        || current == palette.ice
                        || current == palette.bedrock
                    {
                        continue;
                    }
                    // Keep a floor under standing water.
                    if y + 1 < height {
                        let above = proto.blocks[self.dims.index(lx, y as usize + 1, lz)];
                        if above == palette.water || above == palette.ice {
                            continue;
                        }
                    }
                    if self.carver.should_carve(wx, y, wz)? {
                        proto.blocks[idx] = palette.air;
                    }
                }
            }
        }
        proto.advance(ChunkStage::Carved)
    }

    fn decorate(&self, proto: &mut ProtoChunk, deadline: &Deadline) -> Result<(), GenerationError> {
        let pos = proto.pos();
        self.decorator.place_ores(pos, &mut proto.blocks)?;
        deadline.check()?;
        let features = self.decorator.plan_features(
            pos,
            &self.table,
            &proto.surface_biomes,
            &proto.heights,
            &proto.blocks,
        )?;
        let ruin = self.decorator.plan_ruin(pos, &proto.heights);
        for marker in features.into_iter().chain(ruin) {
            if marker.is_local() {
                write_feature(&mut proto.blocks, self.dims, pos, &marker, &self.palette);
            } else {
                proto.boundary.push(marker);
            }
        }
        proto.advance(ChunkStage::Decorated)
    }
}

impl ChunkSource for Pipeline {
    fn feature_reach(&self) -> u32 {
        feature_reach(self.dims.size)
    }

    fn generate(&self, pos: ChunkPos, deadline: &Deadline) -> Result<ChunkData, GenerationError> {
        self.generate_chunk(pos, deadline)
    }

    fn redecorate(&self, chunk: &ChunkData, markers: &[FeatureMarker]) -> ChunkData {
        let mut updated = chunk.clone();
        for marker in markers {
            updated.apply_feature(marker, &self.palette);
        }
        updated
    }
}
