//! Error types shared across Tessera crates.

use thiserror::Error;

use crate::ids::EntityId;

/// World lookup errors.
///
/// Missing chunks are not an error anywhere in the simulation (they are
/// generated on demand); these only surface from explicit requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// No loaded chunk owns the entity
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Chunk was asked for without generation and is not loaded
    #[error("Chunk not loaded at ({x}, {y})")]
    ChunkNotLoaded {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
    },
}

/// Result type alias for world lookups.
pub type WorldResult<T> = Result<T, WorldError>;
