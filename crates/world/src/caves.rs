//! Cave generation using 3D noise carving.

use std::sync::Arc;

use worldgen_core::GenerationError;

use crate::noise::{NoiseKernel, NoiseLayer};

/// Cave generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaveParams {
    /// Openness above which a voxel is carved (0.0-1.0)
    pub threshold: f64,
    /// Lowest Y level caves may reach; bedrock lives below
    pub min_y: i32,
    /// Solid blocks kept between a cave and the surface
    pub surface_guard: i32,
    /// Vertical squash factor (makes caves more horizontal)
    pub vertical_squash: f64,
    /// Depth with the densest caves
    pub optimal_y: i32,
}

impl Default for CaveParams {
    fn default() -> Self {
        Self {
            threshold: 0.64,
            min_y: 4,
            surface_guard: 4,
            vertical_squash: 2.0,
            optimal_y: 30,
        }
    }
}

/// Cave carver over the [`NoiseLayer::Caves`] layer.
#[derive(Clone)]
pub struct CaveCarver {
    kernel: Arc<NoiseKernel>,
    params: CaveParams,
}

impl CaveCarver {
    pub fn new(kernel: Arc<NoiseKernel>) -> Self {
        Self::with_params(kernel, CaveParams::default())
    }

    pub fn with_params(kernel: Arc<NoiseKernel>, params: CaveParams) -> Self {
        Self { kernel, params }
    }

    pub fn params(&self) -> &CaveParams {
        &self.params
    }

    /// Highest Y that may be carved in a column whose surface is at `surface`.
    pub fn carve_limit(&self, surface: i32, allow_mouths: bool) -> i32 {
        if allow_mouths {
            surface
        } else {
            surface - self.params.surface_guard
        }
    }

    /// Check if a position should be carved out
    pub fn should_carve(&self, x: i64, y: i32, z: i64) -> Result<bool, GenerationError> {
        if y < self.params.min_y {
            return Ok(false);
        }
        // Apply vertical squash to make caves more horizontal
        let squashed_y = f64::from(y) * self.params.vertical_squash;
        let noise_val = self
            .kernel
            .sample_3d(NoiseLayer::Caves, x as f64, squashed_y, z as f64)?;

        // Normalize from [-1, 1] to [0, 1]
        let normalized = (noise_val + 1.0) / 2.0;

        Ok(normalized * self.depth_modifier(y) > self.params.threshold)
    }

    /// Peak cave density around the optimal depth, fewer near surface and bedrock.
    fn depth_modifier(&self, y: i32) -> f64 {
        let distance_from_optimal = f64::from((y - self.params.optimal_y).abs());
        1.0 - (distance_from_optimal / 80.0).min(0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldgen_core::WorldSeed;

    fn carver(seed: u64) -> CaveCarver {
        CaveCarver::new(Arc::new(NoiseKernel::from_seed(WorldSeed(seed), 4)))
    }

    #[test]
    fn carving_is_deterministic() {
        let a = carver(9);
        let b = carver(9);
        for i in 0..200 {
            let (x, y, z) = (i * 3, 10 + i % 50, -i * 7);
            assert_eq!(a.should_carve(x, y as i32, z).unwrap(), b.should_carve(x, y as i32, z).unwrap());
        }
    }

    #[test]
    fn nothing_is_carved_below_min_y() {
        let carver = carver(1);
        for x in 0..64 {
            for y in 0..carver.params().min_y {
                assert!(!carver.should_carve(x, y, x * 2).unwrap());
            }
        }
    }

    #[test]
    fn some_voxels_are_carved() {
        let carver = carver(42);
        let mut carved = 0;
        for x in 0..32 {
            for z in 0..32 {
                for y in (10..60).step_by(5) {
                    if carver.should_carve(x, y, z).unwrap() {
                        carved += 1;
                    }
                }
            }
        }
        let total = 32 * 32 * 10;
        assert!(carved > 0, "expected at least one carved voxel");
        assert!(carved < total / 2, "caves should not hollow out the world: {}/{}", carved, total);
    }

    #[test]
    fn mouths_lift_the_carve_limit() {
        let carver = carver(0);
        assert_eq!(carver.carve_limit(70, true), 70);
        assert_eq!(carver.carve_limit(70, false), 66);
    }
}
