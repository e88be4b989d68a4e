//! Density field and height sampling.
//!
//! Density is a pure function of seed and position. Positive values are
//! solid. The surface is the highest solid voxel inside a refinement band
//! around a base height derived from continentalness, erosion and weirdness;
//! below the band is always solid and above it always air, so the band
//! bounds how far overhangs can reach.

use std::sync::Arc;

use worldgen_core::{GenerationError, WorldSeed};

use crate::climate::{ClimateSample, ClimateSampler};
use crate::noise::{NoiseKernel, NoiseLayer};

/// Default sea level.
pub const SEA_LEVEL: i32 = 64;
/// Default world height.
pub const WORLD_HEIGHT: u32 = 256;
/// Default octave count for terrain layers.
pub const DEFAULT_OCTAVES: u32 = 4;

/// Continentalness spline: (continentalness, height above sea level).
const CONTINENTAL_SPLINE: [(f64, f64); 7] = [
    (-1.0, -36.0),
    (-0.5, -24.0),
    (-0.15, -6.0),
    (-0.05, 1.0),
    (0.2, 6.0),
    (0.55, 18.0),
    (1.0, 34.0),
];

/// Vertical shaping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainShape {
    pub sea_level: i32,
    pub world_height: u32,
    /// Blocks of height per unit of density.
    pub squash: f64,
    /// Weight of 3D detail noise.
    pub detail_amplitude: f64,
    /// Half-height of the refinement band around the base height.
    pub band: i32,
    /// Density bias at the top and bottom of the world.
    pub bias_strength: f64,
}

impl Default for TerrainShape {
    fn default() -> Self {
        Self::new(SEA_LEVEL, WORLD_HEIGHT)
    }
}

impl TerrainShape {
    pub fn new(sea_level: i32, world_height: u32) -> Self {
        Self {
            sea_level,
            world_height,
            squash: 12.0,
            detail_amplitude: 0.35,
            band: 8,
            bias_strength: 0.5,
        }
    }

    /// Vertical bias: negative above sea level, positive below.
    pub fn vertical_bias(&self, y: i32) -> f64 {
        let sea = f64::from(self.sea_level);
        let y = f64::from(y);
        if y >= sea {
            let span = (f64::from(self.world_height) - sea).max(1.0);
            -self.bias_strength * (y - sea) / span
        } else {
            self.bias_strength * (sea - y) / sea.max(1.0)
        }
    }

    fn clamp_base(&self, base: f64) -> i32 {
        let low = self.band + 2;
        let high = self.world_height as i32 - self.band - 2;
        (base.round() as i32).clamp(low, high.max(low))
    }
}

fn spline(points: &[(f64, f64)], x: f64) -> f64 {
    let (first, last) = (points[0], points[points.len() - 1]);
    if x <= first.0 {
        return first.1;
    }
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if x <= x1 {
            let t = (x - x0) / (x1 - x0);
            return y0 + (y1 - y0) * t;
        }
    }
    last.1
}

fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Fold weirdness into peaks (1) and valleys (-1).
pub fn peaks_and_valleys(weirdness: f64) -> f64 {
    1.0 - (3.0 * weirdness.abs() - 2.0).abs()
}

/// Seeded density field.
///
/// Holds no mutable state; calls from any number of threads are independent.
#[derive(Clone)]
pub struct DensityField {
    kernel: Arc<NoiseKernel>,
    climate: ClimateSampler,
    shape: TerrainShape,
}

impl DensityField {
    pub fn new(kernel: Arc<NoiseKernel>, shape: TerrainShape) -> Self {
        Self {
            climate: ClimateSampler::new(Arc::clone(&kernel)),
            kernel,
            shape,
        }
    }

    /// Field with default shape and octaves.
    pub fn from_seed(seed: WorldSeed) -> Self {
        Self::new(
            Arc::new(NoiseKernel::from_seed(seed, DEFAULT_OCTAVES)),
            TerrainShape::default(),
        )
    }

    pub fn shape(&self) -> &TerrainShape {
        &self.shape
    }

    pub fn climate(&self) -> &ClimateSampler {
        &self.climate
    }

    /// Base surface height before 3D refinement.
    pub fn base_height(&self, climate: &ClimateSample) -> i32 {
        let continental = spline(&CONTINENTAL_SPLINE, climate.continentalness);
        let rugged = (1.0 - climate.erosion) * 0.5;
        let amplitude = 4.0 + 40.0 * rugged * rugged;
        // Peaks fade out over oceans.
        let land = smoothstep(-0.2, 0.1, climate.continentalness);
        let relief = peaks_and_valleys(climate.weirdness) * amplitude * (0.25 + 0.75 * land);
        self.shape
            .clamp_base(f64::from(self.shape.sea_level) + continental + relief)
    }

    /// Density at a voxel for a column whose base height is known.
    pub fn density(&self, x: i64, y: i32, z: i64, base: i32) -> Result<f64, GenerationError> {
        let detail = self
            .kernel
            .sample_3d(NoiseLayer::Density, x as f64, f64::from(y), z as f64)?;
        Ok(f64::from(base - y) / self.shape.squash
            + detail * self.shape.detail_amplitude
            + self.shape.vertical_bias(y))
    }

    /// Whether a voxel is solid, honoring the refinement band.
    pub fn is_solid(&self, x: i64, y: i32, z: i64, base: i32) -> Result<bool, GenerationError> {
        if y <= base - self.shape.band {
            Ok(true)
        } else if y > base + self.shape.band {
            Ok(false)
        } else {
            Ok(self.density(x, y, z, base)? > 0.0)
        }
    }

    /// Density at any world position.
    pub fn density_at(&self, x: i64, y: i32, z: i64) -> Result<f64, GenerationError> {
        let climate = self.climate.sample(x, z)?;
        self.density(x, y, z, self.base_height(&climate))
    }

    /// Surface height of the column at `(x, z)`.
    pub fn height_at(&self, x: i64, z: i64) -> Result<i32, GenerationError> {
        let climate = self.climate.sample(x, z)?;
        self.column_height(x, z, &climate)
    }

    /// Surface height for a column whose climate is already known.
    pub fn column_height(
        &self,
        x: i64,
        z: i64,
        climate: &ClimateSample,
    ) -> Result<i32, GenerationError> {
        let base = self.base_height(climate);
        for y in (base - self.shape.band + 1..=base + self.shape.band).rev() {
            if self.density(x, y, z, base)? > 0.0 {
                return Ok(y);
            }
        }
        Ok(base - self.shape.band)
    }
}

/// Surface height at `(x, z)` for `seed` with default terrain settings.
pub fn height_at(seed: i64, x: i64, z: i64) -> Result<i32, GenerationError> {
    DensityField::from_seed(WorldSeed::from_i64(seed)).height_at(x, z)
}

/// Density at `(x, y, z)` for `seed` with default terrain settings.
pub fn density_at(seed: i64, x: i64, y: i32, z: i64) -> Result<f64, GenerationError> {
    DensityField::from_seed(WorldSeed::from_i64(seed)).density_at(x, y, z)
}
