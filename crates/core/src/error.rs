use thiserror::Error;

use crate::ChunkPos;

/// Failures surfaced by the generation engine.
///
/// Errors are cloned to every requester attached to the same coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Malformed coordinate, non-finite noise input or invalid configuration.
    #[error("invalid input: {reason}")]
    InputValidation {
        /// What was rejected.
        reason: String,
    },
    /// The pipeline for a coordinate exceeded its time budget.
    #[error("generation of chunk {pos} exceeded its {budget_ms} ms budget")]
    Timeout {
        /// Chunk whose generation was abandoned.
        pos: ChunkPos,
        /// Configured budget in milliseconds.
        budget_ms: u64,
    },
    /// A climate sample could not be mapped to a biome.
    #[error("biome resolution failed: {reason}")]
    BiomeResolution {
        /// Offending sample or table problem.
        reason: String,
    },
    /// Cache capacity cannot hold even one pinned chunk.
    #[error("cache capacity {capacity} cannot hold a pinned chunk")]
    CacheCapacity {
        /// Configured capacity.
        capacity: usize,
    },
    /// A pipeline stage ran out of order or panicked.
    #[error("pipeline failure: {reason}")]
    Pipeline {
        /// Description of the broken invariant.
        reason: String,
    },
    /// The scheduler's workers are no longer accepting jobs.
    #[error("chunk scheduler has shut down")]
    Shutdown,
}

impl GenerationError {
    /// Shorthand for [`GenerationError::InputValidation`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InputValidation {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`GenerationError::BiomeResolution`].
    pub fn biome(reason: impl Into<String>) -> Self {
        Self::BiomeResolution {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`GenerationError::Pipeline`].
    pub fn pipeline(reason: impl Into<String>) -> Self {
        Self::Pipeline {
            reason: reason.into(),
        }
    }

    /// Whether the host may expect a fresh attempt to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result alias used throughout the generator.
pub type GenResult<T> = Result<T, GenerationError>;
