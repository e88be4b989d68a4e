//! Property-based tests for the density field and noise layers.
//!
//! Validates, for arbitrary seeds and coordinates:
//! - height and density queries are pure functions of (seed, position)
//! - the reported height is the topmost solid voxel
//! - the cave and vegetation layers never move the terrain surface

use proptest::prelude::*;
use std::sync::Arc;
use worldgen_core::WorldSeed;
use worldgen_world::{
    density_at, height_at, DensityField, LayerSeeds, NoiseKernel, NoiseLayer, TerrainShape,
    DEFAULT_OCTAVES, WORLD_HEIGHT,
};

fn field(seeds: LayerSeeds) -> DensityField {
    DensityField::new(
        Arc::new(NoiseKernel::new(seeds, DEFAULT_OCTAVES)),
        TerrainShape::default(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn height_is_pure(seed in any::<i64>(), x in -1_000_000i64..1_000_000, z in -1_000_000i64..1_000_000) {
        let first = height_at(seed, x, z).unwrap();
        prop_assert_eq!(first, height_at(seed, x, z).unwrap());
        prop_assert!(first >= 1 && first < WORLD_HEIGHT as i32);
    }

    #[test]
    fn density_is_pure(seed in any::<i64>(), x in -100_000i64..100_000, y in 0i32..256, z in -100_000i64..100_000) {
        let a = density_at(seed, x, y, z).unwrap();
        let b = density_at(seed, x, y, z).unwrap();
        prop_assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn height_is_topmost_solid(seed in any::<u64>(), x in -10_000i64..10_000, z in -10_000i64..10_000) {
        let field = field(LayerSeeds::derive(WorldSeed(seed)));
        let climate = field.climate().sample(x, z).unwrap();
        let base = field.base_height(&climate);
        let band = field.shape().band;
        let height = field.height_at(x, z).unwrap();
        prop_assert!(height >= base - band && height <= base + band);
        if height > base - band {
            prop_assert!(field.density(x, height, z, base).unwrap() > 0.0);
        }
        for y in height + 1..=base + band {
            prop_assert!(field.density(x, y, z, base).unwrap() <= 0.0, "solid voxel above height at y={}", y);
        }
    }

    #[test]
    fn non_terrain_layers_do_not_move_the_surface(
        seed in any::<u64>(),
        other in any::<u64>(),
        x in -10_000i64..10_000,
        z in -10_000i64..10_000,
    ) {
        let base = LayerSeeds::derive(WorldSeed(seed));
        let reference = field(base.clone()).height_at(x, z).unwrap();
        for layer in [NoiseLayer::Caves, NoiseLayer::Vegetation, NoiseLayer::Ores] {
            let altered = field(base.clone().with_override(layer, other));
            prop_assert_eq!(altered.height_at(x, z).unwrap(), reference);
        }
    }
}
