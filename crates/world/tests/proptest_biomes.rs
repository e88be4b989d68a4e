//! Property-based tests for biome classification and blending.
//!
//! Critical invariants:
//! - Every climate vector in [-1, 1]^5 maps to exactly one table entry
//! - Classification is a pure function of the vector
//! - Blend weights are normalized and move smoothly across a boundary

use proptest::prelude::*;
use worldgen_core::{BuiltinMaterials, GenerationError, WorldSeed};
use worldgen_world::{
    blend_column, default_biome_table, BiomeId, BiomeTable, ClimateSample, ClimateWeights,
    LayerSeeds, NoiseLayer,
};

fn table() -> BiomeTable {
    BiomeTable::resolve(
        &default_biome_table(),
        ClimateWeights::default(),
        &BuiltinMaterials::default(),
    )
    .expect("default table resolves")
}

fn climate() -> impl Strategy<Value = ClimateSample> {
    (
        -1.0f64..=1.0,
        -1.0f64..=1.0,
        -1.0f64..=1.0,
        -1.0f64..=1.0,
        -1.0f64..=1.0,
    )
        .prop_map(|(t, h, c, e, w)| ClimateSample::new(t, h, c, e, w))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10_000))]

    /// Property: classification is total over climate space.
    #[test]
    fn classification_is_total(sample in climate()) {
        let table = table();
        let biome = table.classify(&sample);
        prop_assert!(biome.is_ok(), "no biome for {:?}: {:?}", sample, biome.as_ref().err());
        let biome = biome.unwrap();
        prop_assert!(usize::from(biome.id.0) < table.len());
        // Same vector, same answer.
        prop_assert_eq!(table.classify(&sample).unwrap().id, biome.id);
    }
}

proptest! {
    /// Property: blend weights sum to one for any neighborhood.
    #[test]
    fn blend_weights_are_normalized(
        radius in 0u32..=8,
        pattern in prop::collection::vec(0u16..4, 1..64),
    ) {
        let blend = blend_column(radius, |dx, dz| {
            let index = ((dx + 17) * 31 + (dz + 17)) as usize % pattern.len();
            BiomeId(pattern[index])
        });
        prop_assert!((blend.total() - 1.0).abs() < 1e-9);
        for (_, weight) in blend.weights() {
            prop_assert!(*weight > 0.0 && *weight <= 1.0);
        }
    }

    /// Property: out-of-space values are reported, never classified.
    #[test]
    fn out_of_space_values_are_rejected(excess in 1.0001f64..100.0, sign in prop::bool::ANY) {
        let value = if sign { excess } else { -excess };
        let sample = ClimateSample::new(0.0, value, 0.0, 0.0, 0.0);
        let err = table().classify(&sample).unwrap_err();
        prop_assert!(
            matches!(err, GenerationError::BiomeResolution { .. }),
            "unexpected error {err:?}"
        );
    }
}

#[test]
fn nan_climate_is_a_resolution_error() {
    let sample = ClimateSample::new(f64::NAN, 0.0, 0.0, 0.0, 0.0);
    assert!(matches!(
        table().classify(&sample),
        Err(GenerationError::BiomeResolution { .. })
    ));
}

/// Walking across a straight boundary, the far biome's weight rises
/// monotonically from 0 to 1 in steps no larger than one column slice.
#[test]
fn blend_is_monotonic_across_a_straight_boundary() {
    let near = BiomeId(0);
    let far = BiomeId(1);
    let radius = 2;
    let weights: Vec<f64> = (-4..=4)
        .map(|column: i32| {
            blend_column(radius, |dx, _| if column + dx >= 0 { far } else { near }).weight_of(far)
        })
        .collect();

    assert_eq!(weights[0], 0.0);
    assert!((weights[weights.len() - 1] - 1.0).abs() < 1e-12);
    let mut largest_step: f64 = 0.0;
    for pair in weights.windows(2) {
        assert!(pair[1] >= pair[0], "weights not monotonic: {weights:?}");
        largest_step = largest_step.max(pair[1] - pair[0]);
    }
    // The centre slice carries the most weight: about 0.347 at radius 2.
    assert!(largest_step > 0.34 && largest_step < 0.35, "step {largest_step}");
}

proptest! {
    /// Property: every layer gets its own seed from the root.
    #[test]
    fn layer_seeds_are_pairwise_distinct(root in any::<u64>()) {
        let seeds = LayerSeeds::derive(WorldSeed(root));
        let values: Vec<u64> = NoiseLayer::ALL.iter().map(|layer| seeds.get(*layer)).collect();
        for (i, a) in values.iter().enumerate() {
            for b in &values[i + 1..] {
                prop_assert_ne!(a, b);
            }
        }
    }
}
