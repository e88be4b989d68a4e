//! Structural materials the generator places regardless of biome.

use worldgen_core::{GenerationError, MaterialId, MaterialRegistry};

use crate::biome::TreeStyle;

/// Feature priority of leaves.
pub const PRIORITY_LEAVES: u8 = 1;
/// Feature priority of trunks, cacti, boulders and ruin masonry.
pub const PRIORITY_SOLID: u8 = 2;

/// Material ids resolved once from the host registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub air: MaterialId,
    pub stone: MaterialId,
    pub water: MaterialId,
    pub ice: MaterialId,
    pub bedrock: MaterialId,
    pub coal_ore: MaterialId,
    pub iron_ore: MaterialId,
    pub gold_ore: MaterialId,
    pub diamond_ore: MaterialId,
    pub oak_log: MaterialId,
    pub oak_leaves: MaterialId,
    pub spruce_log: MaterialId,
    pub spruce_leaves: MaterialId,
    pub jungle_log: MaterialId,
    pub jungle_leaves: MaterialId,
    pub cactus: MaterialId,
    pub boulder: MaterialId,
    pub cobblestone: MaterialId,
    pub stone_bricks: MaterialId,
    pub moss_block: MaterialId,
}

impl Palette {
    /// Resolve every structural material by name.
    pub fn resolve(materials: &dyn MaterialRegistry) -> Result<Self, GenerationError> {
        let get = |name: &str| resolve_material(materials, name);
        Ok(Self {
            air: get("air")?,
            stone: get("stone")?,
            water: get("water")?,
            ice: get("ice")?,
            bedrock: get("bedrock")?,
            coal_ore: get("coal_ore")?,
            iron_ore: get("iron_ore")?,
            gold_ore: get("gold_ore")?,
            diamond_ore: get("diamond_ore")?,
            oak_log: get("oak_log")?,
            oak_leaves: get("oak_leaves")?,
            spruce_log: get("spruce_log")?,
            spruce_leaves: get("spruce_leaves")?,
            jungle_log: get("jungle_log")?,
            jungle_leaves: get("jungle_leaves")?,
            cactus: get("cactus")?,
            boulder: get("mossy_cobblestone")?,
            cobblestone: get("cobblestone")?,
            stone_bricks: get("stone_bricks")?,
            moss_block: get("moss_block")?,
        })
    }

    /// Trunk and leaf materials for a tree style.
    pub fn tree_materials(&self, style: TreeStyle) -> (MaterialId, MaterialId) {
        match style {
            TreeStyle::Oak => (self.oak_log, self.oak_leaves),
            TreeStyle::Spruce => (self.spruce_log, self.spruce_leaves),
            TreeStyle::Jungle => (self.jungle_log, self.jungle_leaves),
        }
    }

    /// Priority of a voxel that features may overwrite; `None` for terrain.
    pub fn feature_priority(&self, id: MaterialId) -> Option<u8> {
        if id == self.air {
            Some(0)
        } else if id == self.oak_leaves || id == self.spruce_leaves || id == self.jungle_leaves {
            Some(PRIORITY_LEAVES)
        } else if id == self.oak_log
            || id == self.spruce_log
            || id == self.jungle_log
            || id == self.cactus
            || id == self.boulder
            || id == self.cobblestone
            || id == self.stone_bricks
            || id == self.moss_block
        {
            Some(PRIORITY_SOLID)
        } else {
            None
        }
    }

    /// Whether a feature block of `material` wins over the voxel's `current` material.
    ///
    /// The ordering is total, so applying features in any order converges on
    /// the same blocks.
    pub fn feature_wins(&self, current: MaterialId, material: MaterialId) -> bool {
        match (self.feature_priority(current), self.feature_priority(material)) {
            (Some(held), Some(incoming)) => (incoming, material) > (held, current),
            _ => false,
        }
    }
}

/// Resolve one material name or fail with an input-validation error.
pub fn resolve_material(
    materials: &dyn MaterialRegistry,
    name: &str,
) -> Result<MaterialId, GenerationError> {
    materials
        .id_by_name(name)
        .ok_or_else(|| GenerationError::invalid(format!("material '{name}' is not registered")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldgen_core::{BuiltinMaterials, MaterialDescriptor};

    #[test]
    fn builtin_registry_covers_palette() {
        let palette = Palette::resolve(&BuiltinMaterials::default()).unwrap();
        assert_eq!(palette.air, 0);
        assert_ne!(palette.stone, palette.bedrock);
    }

    #[test]
    fn missing_material_is_reported() {
        let registry = BuiltinMaterials::new(vec![
            MaterialDescriptor::simple("air", false),
            MaterialDescriptor::simple("stone", true),
        ]);
        let err = Palette::resolve(&registry).unwrap_err();
        assert!(err.to_string().contains("water"), "unexpected error: {}", err);
    }

    #[test]
    fn logs_beat_leaves_and_terrain_is_never_replaced() {
        let palette = Palette::resolve(&BuiltinMaterials::default()).unwrap();
        assert!(palette.feature_wins(palette.air, palette.oak_leaves));
        assert!(palette.feature_wins(palette.oak_leaves, palette.oak_log));
        assert!(!palette.feature_wins(palette.oak_log, palette.oak_leaves));
        assert!(!palette.feature_wins(palette.stone, palette.oak_log));
        assert!(!palette.feature_wins(palette.water, palette.boulder));
    }

    #[test]
    fn equal_priority_resolves_by_material() {
        let palette = Palette::resolve(&BuiltinMaterials::default()).unwrap();
        let a = palette.feature_wins(palette.oak_log, palette.spruce_log);
        let b = palette.feature_wins(palette.spruce_log, palette.oak_log);
        assert_ne!(a, b, "exactly one of two colliding trunks must win");
    }
}
