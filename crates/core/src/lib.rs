#![warn(missing_docs)]
//! Core primitives shared across the worldgen workspace.

mod error;
mod pos;
pub mod registry;
mod seed;

pub use error::{GenResult, GenerationError};
pub use pos::{ChunkPos, MAX_BLOCK_COORD};
pub use registry::{
    BiomeDescriptor, BiomeRegistry, BuiltinBiomes, BuiltinMaterials, MaterialDescriptor,
    MaterialId, MaterialRegistry, Precipitation,
};
pub use seed::{mix_stafford13, WorldSeed, GOLDEN_RATIO_64};
