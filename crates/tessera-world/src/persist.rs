//! World save files.
//!
//! Layout:
//!
//! ```text
//! [magic "TSWD"][u32 LE header length][bincode SaveHeader][lz4 bincode WorldState]
//! ```
//!
//! The header can be read on its own to inspect a save without
//! decompressing it. Only the persistent half of the world is written;
//! proxies and physics bodies are rebuilt on load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_common::{MagicBytes, SchemaVersion};
use thiserror::Error;
use tracing::{debug, info};

use crate::world::{World, WorldState};

/// Save/load errors.
#[derive(Debug, Error)]
pub enum PersistError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Not a world save
    #[error("Invalid save format")]
    InvalidFormat,
    /// Written by an incompatible version
    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build writes
        expected: String,
        /// Version found in the file
        actual: String,
    },
    /// Payload failed to decompress or disagrees with the header
    #[error("Corrupted save: {0}")]
    Corrupted(String),
}

/// Result type for persistence.
pub type PersistResult<T> = Result<T, PersistError>;

/// Summary stored in front of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    /// Format version
    pub version: SchemaVersion,
    /// World seed
    pub seed: u64,
    /// Ticks simulated
    pub tick_count: u64,
    /// Chunks in the payload
    pub chunk_count: u32,
    /// Entity records in the payload
    pub entity_count: u32,
}

impl SaveHeader {
    fn validate(&self) -> PersistResult<()> {
        if !SchemaVersion::WORLD_SAVE.can_read(&self.version) {
            return Err(PersistError::VersionMismatch {
                expected: SchemaVersion::WORLD_SAVE.to_string(),
                actual: self.version.to_string(),
            });
        }
        Ok(())
    }
}

const PREFIX_LEN: usize = 8;

/// Reads and validates the header of a save.
pub fn read_header(bytes: &[u8]) -> PersistResult<SaveHeader> {
    split(bytes).map(|(header, _)| header)
}

fn split(bytes: &[u8]) -> PersistResult<(SaveHeader, &[u8])> {
    if bytes.len() < PREFIX_LEN || bytes[..4] != MagicBytes::WORLD.0 {
        return Err(PersistError::InvalidFormat);
    }
    let header_len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| *end <= bytes.len())
        .ok_or(PersistError::InvalidFormat)?;

    let header: SaveHeader = bincode::deserialize(&bytes[PREFIX_LEN..header_end])
        .map_err(|e| PersistError::Serialization(e.to_string()))?;
    header.validate()?;
    Ok((header, &bytes[header_end..]))
}

impl World {
    /// Serializes the persistent half of the world.
    pub fn to_bytes(&self) -> PersistResult<Vec<u8>> {
        let state = self.state();
        let header = SaveHeader {
            version: SchemaVersion::WORLD_SAVE,
            seed: state.seed,
            tick_count: state.tick_count,
            chunk_count: u32::try_from(state.chunks.len()).unwrap_or(u32::MAX),
            entity_count: u32::try_from(self.entity_count()).unwrap_or(u32::MAX),
        };
        let header_bytes =
            bincode::serialize(&header).map_err(|e| PersistError::Serialization(e.to_string()))?;
        let payload = bincode::serialize(state).map_err(|e| PersistError::Serialization(e.to_string()))?;
        let compressed = lz4_flex::compress_prepend_size(&payload);

        let mut out = Vec::with_capacity(PREFIX_LEN + header_bytes.len() + compressed.len());
        out.extend_from_slice(&MagicBytes::WORLD.0);
        out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    /// Rebuilds a world from bytes produced by [`World::to_bytes`]. Every
    /// chunk comes back dormant and clean.
    pub fn from_bytes(bytes: &[u8]) -> PersistResult<Self> {
        let (header, compressed) = split(bytes)?;
        let payload = lz4_flex::decompress_size_prepended(compressed)
            .map_err(|e| PersistError::Corrupted(e.to_string()))?;
        let state: WorldState =
            bincode::deserialize(&payload).map_err(|e| PersistError::Serialization(e.to_string()))?;

        if state.seed != header.seed || state.chunks.len() != header.chunk_count as usize {
            return Err(PersistError::Corrupted("header does not match payload".into()));
        }

        let world = Self::from_state(state);
        info!(
            seed = header.seed,
            chunks = header.chunk_count,
            entities = header.entity_count,
            "Loaded world"
        );
        Ok(world)
    }

    /// Writes the world to `path`, replacing any previous save only once
    /// the new one is fully written. Marks every chunk clean on success.
    pub fn save_to(&mut self, path: &Path) -> PersistResult<()> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;

        let dirty = self.dirty_chunk_count();
        self.mark_all_clean();
        info!(path = %path.display(), bytes = bytes.len(), dirty, "Saved world");
        Ok(())
    }

    /// Loads a world saved with [`World::save_to`].
    pub fn load_from(path: &Path) -> PersistResult<Self> {
        debug!(path = %path.display(), "Loading world");
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
