//! Host registry capabilities.
//!
//! The engine never owns material or biome definitions. The host passes
//! lookups in at construction and the engine resolves names to ids once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque material identifier handed out by a [`MaterialRegistry`].
pub type MaterialId = u16;

/// Host-side data for one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    /// Stable name (e.g. "stone").
    pub name: String,
    /// Whether the material occupies its voxel.
    pub solid: bool,
    /// Whether the material is a fluid.
    #[serde(default)]
    pub fluid: bool,
}

impl MaterialDescriptor {
    /// Helper for registries that only need a name and solidity.
    pub fn simple(name: &str, solid: bool) -> Self {
        Self {
            name: name.to_string(),
            solid,
            fluid: false,
        }
    }

    /// Non-solid fluid material.
    pub fn fluid(name: &str) -> Self {
        Self {
            name: name.to_string(),
            solid: false,
            fluid: true,
        }
    }
}

/// Kind of precipitation a biome shows on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precipitation {
    /// No precipitation.
    None,
    /// Rain.
    Rain,
    /// Snow.
    Snow,
}

/// Host-side display and behavior data for one biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeDescriptor {
    /// Stable name matching the engine's biome table entry.
    pub name: String,
    /// Grass color tint (R, G, B).
    pub grass_color: (u8, u8, u8),
    /// Foliage color tint (R, G, B).
    pub foliage_color: (u8, u8, u8),
    /// Weather shown in the biome.
    pub precipitation: Precipitation,
}

/// Lookup capability for materials.
pub trait MaterialRegistry: Send + Sync {
    /// Resolve a material name.
    fn id_by_name(&self, name: &str) -> Option<MaterialId>;
    /// Host data for a resolved id.
    fn descriptor(&self, id: MaterialId) -> Option<&MaterialDescriptor>;
}

/// Lookup capability for biomes.
pub trait BiomeRegistry: Send + Sync {
    /// Host data for the biome called `name`.
    fn lookup(&self, name: &str) -> Option<&BiomeDescriptor>;
}

/// Names of the materials in [`BuiltinMaterials::default`], in id order.
pub const BUILTIN_MATERIALS: &[(&str, bool)] = &[
    ("air", false),
    ("stone", true),
    ("dirt", true),
    ("grass", true),
    ("sand", true),
    ("sandstone", true),
    ("gravel", true),
    ("water", false),
    ("ice", true),
    ("snow", true),
    ("clay", true),
    ("bedrock", true),
    ("coal_ore", true),
    ("iron_ore", true),
    ("gold_ore", true),
    ("diamond_ore", true),
    ("oak_log", true),
    ("oak_leaves", true),
    ("spruce_log", true),
    ("spruce_leaves", true),
    ("jungle_log", true),
    ("jungle_leaves", true),
    ("cactus", true),
    ("mossy_cobblestone", true),
    ("podzol", true),
    ("cobblestone", true),
    ("stone_bricks", true),
    ("moss_block", true),
];

/// Vector-backed material registry; ids are positions in the list.
#[derive(Debug, Clone)]
pub struct BuiltinMaterials {
    descriptors: Vec<MaterialDescriptor>,
    by_name: HashMap<String, MaterialId>,
}

impl BuiltinMaterials {
    /// Build a registry from descriptors; later duplicates shadow earlier names.
    pub fn new(descriptors: Vec<MaterialDescriptor>) -> Self {
        let by_name = descriptors
            .iter()
            .enumerate()
            .map(|(id, desc)| (desc.name.clone(), id as MaterialId))
            .collect();
        Self {
            descriptors,
            by_name,
        }
    }

    /// Number of registered materials.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for BuiltinMaterials {
    fn default() -> Self {
        Self::new(
            BUILTIN_MATERIALS
                .iter()
                .map(|&(name, solid)| match name {
                    "water" => MaterialDescriptor::fluid(name),
                    _ => MaterialDescriptor::simple(name, solid),
                })
                .collect(),
        )
    }
}

impl MaterialRegistry for BuiltinMaterials {
    fn id_by_name(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    fn descriptor(&self, id: MaterialId) -> Option<&MaterialDescriptor> {
        self.descriptors.get(id as usize)
    }
}

/// Map-backed biome registry.
#[derive(Debug, Clone, Default)]
pub struct BuiltinBiomes {
    biomes: HashMap<String, BiomeDescriptor>,
}

impl BuiltinBiomes {
    /// Build a registry from descriptors.
    pub fn new(descriptors: Vec<BiomeDescriptor>) -> Self {
        Self {
            biomes: descriptors
                .into_iter()
                .map(|desc| (desc.name.clone(), desc))
                .collect(),
        }
    }

    /// Descriptors for the engine's default biome table.
    pub fn standard() -> Self {
        use Precipitation::{None as Dry, Rain, Snow};
        let entry = |name: &str, grass: (u8, u8, u8), foliage: (u8, u8, u8), precipitation| {
            BiomeDescriptor {
                name: name.to_string(),
                grass_color: grass,
                foliage_color: foliage,
                precipitation,
            }
        };
        Self::new(vec![
            entry("deep_ocean", (142, 185, 113), (113, 167, 77), Rain),
            entry("frozen_ocean", (128, 180, 151), (96, 161, 123), Snow),
            entry("ocean", (142, 185, 113), (113, 167, 77), Rain),
            entry("beach", (145, 189, 89), (119, 171, 47), Rain),
            entry("desert", (191, 183, 85), (174, 164, 42), Dry),
            entry("savanna", (191, 183, 85), (174, 164, 42), Dry),
            entry("jungle", (89, 201, 60), (48, 187, 11), Rain),
            entry("swamp", (106, 112, 57), (106, 112, 57), Rain),
            entry("mountains", (138, 182, 137), (109, 163, 107), Snow),
            entry("snowy_plains", (128, 180, 151), (96, 161, 123), Snow),
            entry("taiga", (134, 183, 131), (104, 164, 100), Rain),
            entry("forest", (121, 192, 90), (89, 174, 48), Rain),
            entry("plains", (145, 189, 89), (119, 171, 47), Rain),
        ])
    }

    /// Number of registered biomes.
    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

impl BiomeRegistry for BuiltinBiomes {
    fn lookup(&self, name: &str) -> Option<&BiomeDescriptor> {
        self.biomes.get(name)
    }
}
