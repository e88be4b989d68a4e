//! Biome classification and boundary blending.
//!
//! Each biome owns a region of climate space: an inclusive span per
//! [`ClimateParameter`] plus an offset that pushes it away from every point.
//! A sample is classified by the lowest fitness
//! `sum(weight * distance^2) + offset^2`, computed on quantized values so the
//! comparison is exact. Ties go to the earliest table entry.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use worldgen_core::{GenerationError, MaterialId, MaterialRegistry};

use crate::climate::{quantize, ClimateParameter, ClimateSample, QuantizedClimate};
use crate::palette::resolve_material;

/// Position of a biome in the configured table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BiomeId(pub u16);

/// Inclusive range of one climate parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ClimateSpan {
    pub min: f64,
    pub max: f64,
}

impl ClimateSpan {
    /// The whole parameter range.
    pub const FULL: ClimateSpan = ClimateSpan { min: -1.0, max: 1.0 };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_full(&self) -> bool {
        self.min <= -1.0 && self.max >= 1.0
    }
}

impl From<[f64; 2]> for ClimateSpan {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<ClimateSpan> for [f64; 2] {
    fn from(span: ClimateSpan) -> Self {
        [span.min, span.max]
    }
}

/// Climate region claimed by a biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateTarget {
    pub temperature: ClimateSpan,
    pub humidity: ClimateSpan,
    pub continentalness: ClimateSpan,
    pub erosion: ClimateSpan,
    pub weirdness: ClimateSpan,
    /// Penalty in [0, 1] added to every fitness; rarer biomes use larger offsets.
    pub offset: f64,
}

impl Default for ClimateTarget {
    fn default() -> Self {
        Self {
            temperature: ClimateSpan::FULL,
            humidity: ClimateSpan::FULL,
            continentalness: ClimateSpan::FULL,
            erosion: ClimateSpan::FULL,
            weirdness: ClimateSpan::FULL,
            offset: 0.0,
        }
    }
}

impl ClimateTarget {
    pub fn span(&self, parameter: ClimateParameter) -> ClimateSpan {
        match parameter {
            ClimateParameter::Temperature => self.temperature,
            ClimateParameter::Humidity => self.humidity,
            ClimateParameter::Continentalness => self.continentalness,
            ClimateParameter::Erosion => self.erosion,
            ClimateParameter::Weirdness => self.weirdness,
        }
    }

    /// Spans all of climate space.
    pub fn is_catch_all(&self) -> bool {
        ClimateParameter::ALL.iter().all(|&p| self.span(p).is_full())
    }

    fn quantized(&self) -> QuantizedTarget {
        QuantizedTarget {
            spans: ClimateParameter::ALL.map(|p| {
                let span = self.span(p);
                (quantize(span.min), quantize(span.max))
            }),
            offset: quantize(self.offset),
        }
    }
}

/// Tree shapes placed by decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeStyle {
    Oak,
    Spruce,
    Jungle,
}

/// Per-column chances of surface features.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationRules {
    pub tree: Option<TreeStyle>,
    pub tree_chance: f64,
    pub cactus_chance: f64,
    pub boulder_chance: f64,
}

impl DecorationRules {
    fn total_chance(&self) -> f64 {
        self.tree_chance + self.cactus_chance + self.boulder_chance
    }
}

fn default_subsurface() -> String {
    "dirt".to_string()
}

fn default_underwater() -> String {
    "gravel".to_string()
}

fn default_surface_depth() -> u32 {
    3
}

/// Biome table entry as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeSpec {
    pub name: String,
    #[serde(default)]
    pub climate: ClimateTarget,
    pub surface: String,
    #[serde(default = "default_subsurface")]
    pub subsurface: String,
    #[serde(default = "default_underwater")]
    pub underwater: String,
    #[serde(default = "default_surface_depth")]
    pub surface_depth: u32,
    pub color: [u8; 3],
    #[serde(default)]
    pub frozen_water: bool,
    #[serde(default)]
    pub allow_cave_mouths: bool,
    #[serde(default)]
    pub decoration: DecorationRules,
}

impl BiomeSpec {
    /// Entry with default subsurface, underwater material and depth.
    pub fn new(name: &str, climate: ClimateTarget, surface: &str, color: [u8; 3]) -> Self {
        Self {
            name: name.to_string(),
            climate,
            surface: surface.to_string(),
            subsurface: default_subsurface(),
            underwater: default_underwater(),
            surface_depth: default_surface_depth(),
            color,
            frozen_water: false,
            allow_cave_mouths: false,
            decoration: DecorationRules::default(),
        }
    }

    fn subsurface(mut self, material: &str) -> Self {
        self.subsurface = material.to_string();
        self
    }

    fn underwater(mut self, material: &str) -> Self {
        self.underwater = material.to_string();
        self
    }

    fn frozen(mut self) -> Self {
        self.frozen_water = true;
        self
    }

    fn trees(mut self, style: TreeStyle, chance: f64) -> Self {
        self.decoration.tree = Some(style);
        self.decoration.tree_chance = chance;
        self
    }
}

/// Per-parameter weights of the fitness function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateWeights {
    pub temperature: u32,
    pub humidity: u32,
    pub continentalness: u32,
    pub erosion: u32,
    pub weirdness: u32,
}

impl Default for ClimateWeights {
    fn default() -> Self {
        Self {
            temperature: 1,
            humidity: 1,
            continentalness: 1,
            erosion: 1,
            weirdness: 1,
        }
    }
}

impl ClimateWeights {
    pub fn get(&self, parameter: ClimateParameter) -> u32 {
        match parameter {
            ClimateParameter::Temperature => self.temperature,
            ClimateParameter::Humidity => self.humidity,
            ClimateParameter::Continentalness => self.continentalness,
            ClimateParameter::Erosion => self.erosion,
            ClimateParameter::Weirdness => self.weirdness,
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        for parameter in ClimateParameter::ALL {
            let weight = self.get(parameter);
            if !(1..=100).contains(&weight) {
                return Err(GenerationError::invalid(format!(
                    "climate weight for {parameter:?} must be in 1..=100, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// Check a biome table before it is resolved.
pub fn validate_biome_table(specs: &[BiomeSpec]) -> Result<(), GenerationError> {
    if specs.is_empty() {
        return Err(GenerationError::invalid("biome table is empty"));
    }
    if specs.len() > usize::from(u16::MAX) {
        return Err(GenerationError::invalid("biome table has too many entries"));
    }
    let mut names = HashSet::new();
    for spec in specs {
        if !names.insert(spec.name.as_str()) {
            return Err(GenerationError::invalid(format!(
                "biome '{}' appears twice in the table",
                spec.name
            )));
        }
        for parameter in ClimateParameter::ALL {
            let span = spec.climate.span(parameter);
            let valid = span.min.is_finite()
                && span.max.is_finite()
                && span.min <= span.max
                && span.min >= -1.0
                && span.max <= 1.0;
            if !valid {
                return Err(GenerationError::invalid(format!(
                    "biome '{}' has invalid {parameter:?} span [{}, {}]",
                    spec.name, span.min, span.max
                )));
            }
        }
        if !(0.0..=1.0).contains(&spec.climate.offset) {
            return Err(GenerationError::invalid(format!(
                "biome '{}' offset {} is outside [0, 1]",
                spec.name, spec.climate.offset
            )));
        }
        if spec.surface_depth > 16 {
            return Err(GenerationError::invalid(format!(
                "biome '{}' surface depth {} exceeds 16",
                spec.name, spec.surface_depth
            )));
        }
        let rules = &spec.decoration;
        let chances = [rules.tree_chance, rules.cactus_chance, rules.boulder_chance];
        if chances.iter().any(|c| !(0.0..=1.0).contains(c)) || rules.total_chance() > 1.0 {
            return Err(GenerationError::invalid(format!(
                "biome '{}' decoration chances must lie in [0, 1] and sum to at most 1",
                spec.name
            )));
        }
    }
    if !specs.iter().any(|spec| spec.climate.is_catch_all()) {
        return Err(GenerationError::invalid(
            "biome table needs a catch-all entry spanning all of climate space",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QuantizedTarget {
    spans: [(i64, i64); 5],
    offset: i64,
}

impl QuantizedTarget {
    fn fitness(&self, climate: &QuantizedClimate, weights: &[i64; 5]) -> i64 {
        let mut total = self.offset * self.offset;
        for (i, &(min, max)) in self.spans.iter().enumerate() {
            let value = climate.0[i];
            let distance = if value < min {
                min - value
            } else if value > max {
                value - max
            } else {
                0
            };
            total += weights[i] * distance * distance;
        }
        total
    }
}

/// A resolved biome: identifier plus policy bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Biome {
    pub id: BiomeId,
    pub name: String,
    pub surface: MaterialId,
    pub subsurface: MaterialId,
    pub underwater: MaterialId,
    pub surface_depth: u32,
    pub color: [u8; 3],
    pub frozen_water: bool,
    pub allow_cave_mouths: bool,
    pub decoration: DecorationRules,
    target: QuantizedTarget,
}

/// Ordered, resolved biome table.
#[derive(Debug, Clone)]
pub struct BiomeTable {
    biomes: Vec<Biome>,
    weights: [i64; 5],
}

impl BiomeTable {
    /// Validate `specs` and resolve their materials through the host registry.
    pub fn resolve(
        specs: &[BiomeSpec],
        weights: ClimateWeights,
        materials: &dyn MaterialRegistry,
    ) -> Result<Self, GenerationError> {
        validate_biome_table(specs)?;
        weights.validate()?;
        let biomes = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                Ok(Biome {
                    id: BiomeId(index as u16),
                    name: spec.name.clone(),
                    surface: resolve_material(materials, &spec.surface)?,
                    subsurface: resolve_material(materials, &spec.subsurface)?,
                    underwater: resolve_material(materials, &spec.underwater)?,
                    surface_depth: spec.surface_depth,
                    color: spec.color,
                    frozen_water: spec.frozen_water,
                    allow_cave_mouths: spec.allow_cave_mouths,
                    decoration: spec.decoration.clone(),
                    target: spec.climate.quantized(),
                })
            })
            .collect::<Result<Vec<_>, GenerationError>>()?;
        Ok(Self {
            biomes,
            weights: ClimateParameter::ALL.map(|p| i64::from(weights.get(p))),
        })
    }

    /// Nearest biome to `climate`.
    pub fn classify(&self, climate: &ClimateSample) -> Result<&Biome, GenerationError> {
        let quantized = climate.quantize()?;
        let mut best: Option<(&Biome, i64)> = None;
        for biome in &self.biomes {
            let fitness = biome.target.fitness(&quantized, &self.weights);
            // Strictly lower only: the earliest entry keeps ties.
            if best.map_or(true, |(_, current)| fitness < current) {
                best = Some((biome, fitness));
            }
        }
        best.map(|(biome, _)| biome)
            .ok_or_else(|| GenerationError::biome("biome table is empty"))
    }

    pub fn get(&self, id: BiomeId) -> Option<&Biome> {
        self.biomes.get(usize::from(id.0))
    }

    pub fn by_name(&self, name: &str) -> Option<&Biome> {
        self.biomes.iter().find(|biome| biome.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Biome> {
        self.biomes.iter()
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

/// Normalized biome weights around one column.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeBlend {
    weights: Vec<(BiomeId, f64)>,
}

impl BiomeBlend {
    /// A column fully inside one biome.
    pub fn single(id: BiomeId) -> Self {
        Self {
            weights: vec![(id, 1.0)],
        }
    }

    /// Weights sorted by biome id; they sum to one.
    pub fn weights(&self) -> &[(BiomeId, f64)] {
        &self.weights
    }

    pub fn weight_of(&self, id: BiomeId) -> f64 {
        self.weights
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map_or(0.0, |(_, weight)| *weight)
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().map(|(_, weight)| weight).sum()
    }

    /// Heaviest biome; ties go to the lower id.
    pub fn dominant(&self) -> BiomeId {
        let mut best = self.weights[0];
        for &(id, weight) in &self.weights[1..] {
            if weight > best.1 {
                best = (id, weight);
            }
        }
        best.0
    }

    /// Select a biome with probability equal to its weight, using `dither` in [0, 1).
    pub fn pick(&self, dither: f64) -> BiomeId {
        let mut cumulative = 0.0;
        for &(id, weight) in &self.weights {
            cumulative += weight;
            if dither < cumulative {
                return id;
            }
        }
        self.weights[self.weights.len() - 1].0
    }
}

/// Inverse-square blend over the `(2r + 1)^2` columns around a column.
///
/// Each column weighs `1 / (1 + d^2)`; the `+ 1` gives the centre column a
/// finite weight. `biome_at(dx, dz)` returns the classified biome of the
/// column at that offset.
pub fn blend_column<F>(radius: u32, mut biome_at: F) -> BiomeBlend
where
    F: FnMut(i32, i32) -> BiomeId,
{
    let r = radius as i32;
    if r == 0 {
        return BiomeBlend::single(biome_at(0, 0));
    }
    let mut sums: BTreeMap<BiomeId, f64> = BTreeMap::new();
    let mut total = 0.0;
    for dz in -r..=r {
        for dx in -r..=r {
            let dist_sq = f64::from(dx * dx + dz * dz);
            let weight = 1.0 / (1.0 + dist_sq);
            *sums.entry(biome_at(dx, dz)).or_insert(0.0) += weight;
            total += weight;
        }
    }
    BiomeBlend {
        weights: sums
            .into_iter()
            .map(|(id, weight)| (id, weight / total))
            .collect(),
    }
}

/// The built-in biome table, most specific entries first and plains last.
pub fn default_biome_table() -> Vec<BiomeSpec> {
    let target = |t: (f64, f64), h: (f64, f64), c: (f64, f64), e: (f64, f64)| ClimateTarget {
        temperature: ClimateSpan::new(t.0, t.1),
        humidity: ClimateSpan::new(h.0, h.1),
        continentalness: ClimateSpan::new(c.0, c.1),
        erosion: ClimateSpan::new(e.0, e.1),
        ..ClimateTarget::default()
    };
    let any = (-1.0, 1.0);
    let inland = (-0.05, 1.0);

    let mut desert = BiomeSpec::new(
        "desert",
        target((0.45, 1.0), (-1.0, -0.1), inland, any),
        "sand",
        [250, 148, 24],
    )
    .subsurface("sandstone")
    .underwater("sand");
    desert.decoration.cactus_chance = 0.012;

    let mut mountains = BiomeSpec::new(
        "mountains",
        target(any, any, (0.2, 1.0), (-1.0, -0.55)),
        "stone",
        [96, 96, 96],
    )
    .subsurface("stone");
    mountains.surface_depth = 1;
    mountains.allow_cave_mouths = true;
    mountains.decoration.boulder_chance = 0.01;

    let mut forest = BiomeSpec::new(
        "forest",
        target((-0.1, 0.45), (0.0, 0.4), inland, any),
        "grass",
        [5, 102, 33],
    )
    .trees(TreeStyle::Oak, 0.045);
    forest.decoration.boulder_chance = 0.002;

    vec![
        BiomeSpec::new(
            "deep_ocean",
            target(any, any, (-1.0, -0.5), any),
            "gravel",
            [0, 0, 48],
        )
        .subsurface("gravel"),
        BiomeSpec::new(
            "frozen_ocean",
            target((-1.0, -0.5), any, (-1.0, -0.15), any),
            "gravel",
            [112, 112, 214],
        )
        .frozen(),
        BiomeSpec::new(
            "ocean",
            target(any, any, (-0.5, -0.15), any),
            "sand",
            [0, 0, 112],
        )
        .subsurface("sand")
        .underwater("sand"),
        BiomeSpec::new(
            "beach",
            target((-0.5, 1.0), any, (-0.15, -0.05), any),
            "sand",
            [250, 222, 85],
        )
        .subsurface("sand")
        .underwater("sand"),
        desert,
        BiomeSpec::new(
            "savanna",
            target((0.45, 1.0), (-0.1, 0.3), inland, any),
            "grass",
            [189, 178, 95],
        )
        .trees(TreeStyle::Oak, 0.004),
        BiomeSpec::new(
            "jungle",
            target((0.3, 1.0), (0.3, 1.0), inland, any),
            "grass",
            [83, 123, 9],
        )
        .trees(TreeStyle::Jungle, 0.05),
        BiomeSpec::new(
            "swamp",
            target((-0.1, 0.45), (0.4, 1.0), inland, (0.3, 1.0)),
            "grass",
            [7, 249, 178],
        )
        .underwater("clay")
        .trees(TreeStyle::Oak, 0.01),
        mountains,
        BiomeSpec::new(
            "snowy_plains",
            target((-1.0, -0.45), any, inland, any),
            "snow",
            [255, 255, 255],
        )
        .frozen()
        .trees(TreeStyle::Spruce, 0.003),
        BiomeSpec::new(
            "taiga",
            target((-0.45, -0.1), (-0.1, 1.0), inland, any),
            "podzol",
            [11, 102, 89],
        )
        .trees(TreeStyle::Spruce, 0.04),
        forest,
        BiomeSpec::new("plains", ClimateTarget::default(), "grass", [141, 179, 96])
            .trees(TreeStyle::Oak, 0.002),
    ]
}
