use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GenerationError;

/// Largest absolute block coordinate the generator accepts on either horizontal axis.
pub const MAX_BLOCK_COORD: i64 = 30_000_000;

/// Chunk coordinate in chunk units. Used as the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    /// Chunk X coordinate (east/west).
    pub x: i32,
    /// Chunk Z coordinate (north/south).
    pub z: i32,
}

impl ChunkPos {
    /// Construct a chunk coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the block column `(block_x, block_z)`.
    pub fn from_block(block_x: i64, block_z: i64, chunk_size: u32) -> Result<Self, GenerationError> {
        let size = i64::from(chunk_size);
        let cx = i32::try_from(block_x.div_euclid(size)).map_err(|_| {
            GenerationError::invalid(format!("block x {block_x} is outside the world"))
        })?;
        let cz = i32::try_from(block_z.div_euclid(size)).map_err(|_| {
            GenerationError::invalid(format!("block z {block_z} is outside the world"))
        })?;
        Ok(Self::new(cx, cz))
    }

    /// World-space block coordinates of the chunk's minimum corner.
    pub fn origin(self, chunk_size: u32) -> (i64, i64) {
        let size = i64::from(chunk_size);
        (i64::from(self.x) * size, i64::from(self.z) * size)
    }

    /// Reject chunks whose blocks would fall outside [`MAX_BLOCK_COORD`].
    pub fn validate(self, chunk_size: u32) -> Result<(), GenerationError> {
        let (min_x, min_z) = self.origin(chunk_size);
        let size = i64::from(chunk_size);
        let in_range = |min: i64| min >= -MAX_BLOCK_COORD && min + size - 1 <= MAX_BLOCK_COORD;
        if in_range(min_x) && in_range(min_z) {
            Ok(())
        } else {
            Err(GenerationError::invalid(format!(
                "chunk {self} lies outside the generatable world (|block| <= {MAX_BLOCK_COORD})"
            )))
        }
    }

    /// Chunk offset by `(dx, dz)`.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.z.wrapping_add(dz))
    }

    /// The eight surrounding chunks, in row-major order.
    pub fn neighbors(self) -> [ChunkPos; 8] {
        [
            self.offset(-1, -1),
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(-1, 1),
            self.offset(0, 1),
            self.offset(1, 1),
        ]
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
