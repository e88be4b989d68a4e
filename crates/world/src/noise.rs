//! Noise generation utilities for terrain generation.
//!
//! Provides deterministic, seeded, domain-warped multi-octave noise. Every
//! [`NoiseLayer`] owns its own gradient noise instance whose seed is mixed
//! from the world seed, so layers never share seed material.

use ::noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};
use worldgen_core::{mix_stafford13, GenerationError, WorldSeed};

/// Independent noise layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseLayer {
    /// Continental scale - large landmasses vs oceans
    Continentalness,
    /// Erosion - flattens or roughens terrain
    Erosion,
    /// Weirdness - folded into peaks and valleys
    Weirdness,
    /// Temperature for biome assignment
    Temperature,
    /// Humidity for biome assignment
    Humidity,
    /// 3D surface detail for the density field
    Density,
    /// 3D cave carving
    Caves,
    /// Domain warp offset along X
    WarpX,
    /// Domain warp offset along Y
    WarpY,
    /// Domain warp offset along Z
    WarpZ,
    /// Vegetation patchiness
    Vegetation,
    /// Ore distribution
    Ores,
}

impl NoiseLayer {
    /// Number of layers.
    pub const COUNT: usize = 12;

    /// All layers in declaration order.
    pub const ALL: [NoiseLayer; Self::COUNT] = [
        NoiseLayer::Continentalness,
        NoiseLayer::Erosion,
        NoiseLayer::Weirdness,
        NoiseLayer::Temperature,
        NoiseLayer::Humidity,
        NoiseLayer::Density,
        NoiseLayer::Caves,
        NoiseLayer::WarpX,
        NoiseLayer::WarpY,
        NoiseLayer::WarpZ,
        NoiseLayer::Vegetation,
        NoiseLayer::Ores,
    ];

    /// Position in [`NoiseLayer::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Fixed salt mixed into the world seed for this layer.
    pub fn salt(self) -> u64 {
        match self {
            NoiseLayer::Continentalness => 0x636f_6e74_696e_656e,
            NoiseLayer::Erosion => 0x6572_6f73_696f_6e00,
            NoiseLayer::Weirdness => 0x7765_6972_646e_6573,
            NoiseLayer::Temperature => 0x7465_6d70_6572_6174,
            NoiseLayer::Humidity => 0x6875_6d69_6469_7479,
            NoiseLayer::Density => 0x6465_6e73_6974_7900,
            NoiseLayer::Caves => 0x6361_7665_7300_0000,
            NoiseLayer::WarpX => 0x7761_7270_5f78_0000,
            NoiseLayer::WarpY => 0x7761_7270_5f79_0000,
            NoiseLayer::WarpZ => 0x7761_7270_5f7a_0000,
            NoiseLayer::Vegetation => 0x7665_6765_7461_7465,
            NoiseLayer::Ores => 0x6f72_6573_0000_0000,
        }
    }

    fn is_warp(self) -> bool {
        matches!(self, NoiseLayer::WarpX | NoiseLayer::WarpY | NoiseLayer::WarpZ)
    }
}

/// Per-layer seeds derived from one world seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSeeds {
    seeds: [u64; NoiseLayer::COUNT],
}

impl LayerSeeds {
    /// Mix a seed for every layer from `root`.
    pub fn derive(root: WorldSeed) -> Self {
        let mut seeds = [0; NoiseLayer::COUNT];
        for layer in NoiseLayer::ALL {
            seeds[layer.index()] = root.mix(layer.salt());
        }
        Self { seeds }
    }

    /// Replace a single layer's seed, leaving every other layer untouched.
    pub fn with_override(mut self, layer: NoiseLayer, seed: u64) -> Self {
        self.seeds[layer.index()] = seed;
        self
    }

    /// Seed of `layer`.
    pub fn get(&self, layer: NoiseLayer) -> u64 {
        self.seeds[layer.index()]
    }
}

/// Configuration for multi-octave noise generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSettings {
    /// Number of octaves (layers of detail)
    pub octaves: u32,
    /// Frequency multiplier between octaves
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves (persistence)
    pub persistence: f64,
    /// Base frequency (scale)
    pub frequency: f64,
    /// Domain warp displacement in blocks; zero disables warping
    pub warp: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            frequency: 1.0,
            warp: 0.0,
        }
    }
}

impl NoiseSettings {
    /// Default settings for `layer`; terrain-shaping layers use `octaves`.
    pub fn for_layer(layer: NoiseLayer, octaves: u32) -> Self {
        let octaves = octaves.max(1);
        match layer {
            NoiseLayer::Continentalness => Self {
                octaves,
                lacunarity: 2.2,
                persistence: 0.55,
                frequency: 0.0025, // Very large scale
                warp: 48.0,
            },
            NoiseLayer::Erosion => Self {
                octaves,
                frequency: 0.004,
                warp: 32.0,
                ..Self::default()
            },
            NoiseLayer::Weirdness => Self {
                octaves,
                lacunarity: 2.3,
                persistence: 0.45,
                frequency: 0.008,
                warp: 24.0,
            },
            NoiseLayer::Temperature | NoiseLayer::Humidity => Self {
                octaves: octaves.min(3),
                frequency: 0.0035,
                warp: 40.0,
                ..Self::default()
            },
            NoiseLayer::Density => Self {
                octaves,
                frequency: 0.03,
                warp: 6.0,
                ..Self::default()
            },
            NoiseLayer::Caves => Self {
                octaves: 2,
                frequency: 0.045,
                ..Self::default()
            },
            NoiseLayer::WarpX | NoiseLayer::WarpY | NoiseLayer::WarpZ => Self {
                octaves: 2,
                frequency: 0.01,
                ..Self::default()
            },
            NoiseLayer::Vegetation => Self {
                octaves: 2,
                frequency: 0.05,
                ..Self::default()
            },
            NoiseLayer::Ores => Self {
                octaves: 1,
                frequency: 0.1,
                ..Self::default()
            },
        }
    }
}

struct LayerNoise {
    perlin: Perlin,
    settings: NoiseSettings,
    // Per-layer lattice shift so no layer is pinned to zero at the origin.
    shift: [f64; 3],
}

impl LayerNoise {
    fn new(seed: u64, settings: NoiseSettings) -> Self {
        let folded = (seed ^ (seed >> 32)) as u32;
        let shift_bits = mix_stafford13(seed);
        let component = |i: u32| ((shift_bits >> (i * 16)) & 0xffff) as f64 / 64.0;
        Self {
            perlin: Perlin::new(folded),
            settings,
            shift: [component(0), component(1), component(2)],
        }
    }

    fn fbm_2d(&self, x: f64, z: f64) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.settings.frequency;
        let mut max_value = 0.0;

        for _ in 0..self.settings.octaves {
            value += self.perlin.get([
                x * frequency + self.shift[0],
                z * frequency + self.shift[2],
            ]) * amplitude;
            max_value += amplitude;

            amplitude *= self.settings.persistence;
            frequency *= self.settings.lacunarity;
        }

        // Normalize to [-1.0, 1.0]
        (value / max_value).clamp(-1.0, 1.0)
    }

    fn fbm_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.settings.frequency;
        let mut max_value = 0.0;

        for _ in 0..self.settings.octaves {
            value += self.perlin.get([
                x * frequency + self.shift[0],
                y * frequency + self.shift[1],
                z * frequency + self.shift[2],
            ]) * amplitude;
            max_value += amplitude;

            amplitude *= self.settings.persistence;
            frequency *= self.settings.lacunarity;
        }

        (value / max_value).clamp(-1.0, 1.0)
    }
}

/// Seeded sampler for every [`NoiseLayer`].
///
/// Immutable after construction and safe to share between worker threads.
pub struct NoiseKernel {
    seeds: LayerSeeds,
    layers: Vec<LayerNoise>,
}

impl NoiseKernel {
    /// Build a kernel from explicit layer seeds.
    pub fn new(seeds: LayerSeeds, octaves: u32) -> Self {
        let layers = NoiseLayer::ALL
            .iter()
            .map(|&layer| LayerNoise::new(seeds.get(layer), NoiseSettings::for_layer(layer, octaves)))
            .collect();
        Self { seeds, layers }
    }

    /// Build a kernel whose layer seeds are all derived from `seed`.
    pub fn from_seed(seed: WorldSeed, octaves: u32) -> Self {
        Self::new(LayerSeeds::derive(seed), octaves)
    }

    /// Seeds in use.
    pub fn seeds(&self) -> &LayerSeeds {
        &self.seeds
    }

    /// Settings in use for `layer`.
    pub fn settings(&self, layer: NoiseLayer) -> &NoiseSettings {
        &self.layers[layer.index()].settings
    }

    /// Sample a 2D layer at block coordinates. Returns value in range [-1.0, 1.0].
    pub fn sample_2d(&self, layer: NoiseLayer, x: f64, z: f64) -> Result<f64, GenerationError> {
        if !(x.is_finite() && z.is_finite()) {
            return Err(GenerationError::invalid(format!(
                "non-finite noise input ({x}, {z}) for layer {layer:?}"
            )));
        }
        let noise = &self.layers[layer.index()];
        let (x, z) = if noise.settings.warp > 0.0 && !layer.is_warp() {
            // Offset per layer so layers sharing the warp field do not warp in lockstep.
            let offset = layer.index() as f64 * 1031.0;
            let dx = self.layers[NoiseLayer::WarpX.index()].fbm_2d(x + offset, z);
            let dz = self.layers[NoiseLayer::WarpZ.index()].fbm_2d(x, z + offset);
            (x + dx * noise.settings.warp, z + dz * noise.settings.warp)
        } else {
            (x, z)
        };
        Ok(noise.fbm_2d(x, z))
    }

    /// Sample a 3D layer at block coordinates. Returns value in range [-1.0, 1.0].
    pub fn sample_3d(
        &self,
        layer: NoiseLayer,
        x: f64,
        y: f64,
        z: f64,
    ) -> Result<f64, GenerationError> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(GenerationError::invalid(format!(
                "non-finite noise input ({x}, {y}, {z}) for layer {layer:?}"
            )));
        }
        let noise = &self.layers[layer.index()];
        let (x, y, z) = if noise.settings.warp > 0.0 && !layer.is_warp() {
            let offset = layer.index() as f64 * 1031.0;
            let dx = self.layers[NoiseLayer::WarpX.index()].fbm_3d(x + offset, y, z);
            let dy = self.layers[NoiseLayer::WarpY.index()].fbm_3d(x, y + offset, z);
            let dz = self.layers[NoiseLayer::WarpZ.index()].fbm_3d(x, y, z + offset);
            let warp = noise.settings.warp;
            (x + dx * warp, y + dy * warp, z + dz * warp)
        } else {
            (x, y, z)
        };
        Ok(noise.fbm_3d(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_determinism() {
        let a = NoiseKernel::from_seed(WorldSeed(12345), 4);
        let b = NoiseKernel::from_seed(WorldSeed(12345), 4);

        for i in 0..50 {
            let x = i as f64 * 7.3;
            let z = i as f64 * -3.1;
            assert_eq!(
                a.sample_2d(NoiseLayer::Continentalness, x, z).unwrap(),
                b.sample_2d(NoiseLayer::Continentalness, x, z).unwrap(),
                "2D noise should be deterministic at ({}, {})",
                x,
                z
            );
            assert_eq!(
                a.sample_3d(NoiseLayer::Density, x, 40.0, z).unwrap(),
                b.sample_3d(NoiseLayer::Density, x, 40.0, z).unwrap(),
                "3D noise should be deterministic"
            );
        }
    }

    #[test]
    fn test_noise_range() {
        let kernel = NoiseKernel::from_seed(WorldSeed(42), 6);

        for layer in NoiseLayer::ALL {
            for i in 0..200 {
                let x = i as f64 * 13.7 - 1000.0;
                let z = i as f64 * 5.3 + 250.0;
                let v2 = kernel.sample_2d(layer, x, z).unwrap();
                let v3 = kernel.sample_3d(layer, x, i as f64, z).unwrap();
                assert!((-1.0..=1.0).contains(&v2), "{:?} 2D out of range: {}", layer, v2);
                assert!((-1.0..=1.0).contains(&v3), "{:?} 3D out of range: {}", layer, v3);
            }
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = NoiseKernel::from_seed(WorldSeed(1), 4);
        let b = NoiseKernel::from_seed(WorldSeed(2), 4);
        let differs = (0..100).any(|i| {
            let x = i as f64 * 17.0;
            a.sample_2d(NoiseLayer::Temperature, x, x).unwrap()
                != b.sample_2d(NoiseLayer::Temperature, x, x).unwrap()
        });
        assert!(differs, "different seeds should produce different noise");
    }

    #[test]
    fn layer_seeds_are_pairwise_distinct() {
        for root in [0u64, 1, 42, u64::MAX, 0xDEAD_BEEF] {
            let seeds = LayerSeeds::derive(WorldSeed(root));
            for (i, a) in NoiseLayer::ALL.iter().enumerate() {
                for b in &NoiseLayer::ALL[i + 1..] {
                    assert_ne!(seeds.get(*a), seeds.get(*b), "{:?} and {:?} share a seed", a, b);
                }
            }
        }
    }

    #[test]
    fn override_touches_only_one_layer() {
        let base = LayerSeeds::derive(WorldSeed(99));
        let changed = base.clone().with_override(NoiseLayer::Caves, 7);
        for layer in NoiseLayer::ALL {
            if layer == NoiseLayer::Caves {
                assert_eq!(changed.get(layer), 7);
            } else {
                assert_eq!(changed.get(layer), base.get(layer));
            }
        }
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let kernel = NoiseKernel::from_seed(WorldSeed(5), 4);
        let err = kernel
            .sample_2d(NoiseLayer::Humidity, f64::NAN, 0.0)
            .unwrap_err();
        assert!(matches!(err, GenerationError::InputValidation { .. }));
        assert!(kernel
            .sample_3d(NoiseLayer::Density, 0.0, f64::INFINITY, 0.0)
            .is_err());
    }

    #[test]
    fn origin_is_not_degenerate() {
        let kernel = NoiseKernel::from_seed(WorldSeed(42), 4);
        let values: Vec<f64> = [
            NoiseLayer::Continentalness,
            NoiseLayer::Temperature,
            NoiseLayer::Humidity,
        ]
        .iter()
        .map(|&layer| kernel.sample_2d(layer, 0.0, 0.0).unwrap())
        .collect();
        assert!(values.iter().any(|v| *v != 0.0));
    }
}
