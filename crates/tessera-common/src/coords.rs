//! Coordinate types for world, tile, and chunk positions.
//!
//! Tiles are the unit of terrain; chunks are square blocks of
//! `chunk_size × chunk_size` tiles. Tile→chunk division always floors
//! (`div_euclid`), so chunk `(-1, -1)` covers tiles `-chunk_size..=-1` on
//! both axes and no tile maps to two chunks.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Packs two signed 32-bit values into one `u64`: `x` in the high half,
/// `y` (reinterpreted as unsigned) in the low half.
#[must_use]
pub const fn pack_coords(x: i32, y: i32) -> u64 {
    ((x as u32 as u64) << 32) | (y as u32 as u64)
}

/// Inverse of [`pack_coords`].
#[must_use]
pub const fn unpack_coords(key: u64) -> (i32, i32) {
    ((key >> 32) as u32 as i32, key as u32 as i32)
}

/// Tile coordinate in the unbounded world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileCoord {
    /// X coordinate in tile space
    pub x: i32,
    /// Y coordinate in tile space
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the tile containing a world-space position.
    ///
    /// Non-finite positions collapse to tile `(0, 0)`; out-of-range values
    /// saturate at the `i32` bounds.
    #[must_use]
    pub fn from_world(pos: Vec2, tile_size: f32) -> Self {
        let to_tile = |v: f32| {
            let t = (v / tile_size).floor();
            if t.is_finite() { t as i32 } else { 0 }
        };
        Self::new(to_tile(pos.x), to_tile(pos.y))
    }

    /// Converts to the coordinate of the chunk containing this tile.
    #[must_use]
    pub const fn to_chunk_coord(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i32;
        ChunkCoord {
            x: self.x.div_euclid(size),
            y: self.y.div_euclid(size),
        }
    }

    /// Converts to the local position within its chunk (`0..chunk_size`).
    #[must_use]
    pub const fn to_local(self, chunk_size: u32) -> (u32, u32) {
        let size = chunk_size as i32;
        (
            self.x.rem_euclid(size) as u32,
            self.y.rem_euclid(size) as u32,
        )
    }

    /// World-space center of this tile.
    #[must_use]
    pub fn center(self, tile_size: f32) -> Vec2 {
        Vec2::new(
            (self.x as f32 + 0.5) * tile_size,
            (self.y as f32 + 0.5) * tile_size,
        )
    }

    /// Packed key used by per-chunk terrain caches.
    #[must_use]
    pub const fn key(self) -> u64 {
        pack_coords(self.x, self.y)
    }

    /// Rebuilds a tile coordinate from its packed key.
    #[must_use]
    pub const fn from_key(key: u64) -> Self {
        let (x, y) = unpack_coords(key);
        Self { x, y }
    }
}

/// Canonical chunk-map key: `cx` in the high 32 bits, `cy` in the low 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey(pub u64);

impl ChunkKey {
    /// Returns the chunk coordinate this key encodes.
    #[must_use]
    pub const fn coord(self) -> ChunkCoord {
        let (x, y) = unpack_coords(self.0);
        ChunkCoord { x, y }
    }
}

impl From<ChunkCoord> for ChunkKey {
    fn from(coord: ChunkCoord) -> Self {
        coord.key()
    }
}

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the canonical map key for this chunk.
    #[must_use]
    pub const fn key(self) -> ChunkKey {
        ChunkKey(pack_coords(self.x, self.y))
    }

    /// Tile at the minimum corner of this chunk.
    #[must_use]
    pub const fn origin_tile(self, chunk_size: u32) -> TileCoord {
        let size = chunk_size as i32;
        TileCoord {
            x: self.x.saturating_mul(size),
            y: self.y.saturating_mul(size),
        }
    }

    /// Checks whether a tile lies inside this chunk.
    #[must_use]
    pub const fn contains_tile(self, tile: TileCoord, chunk_size: u32) -> bool {
        let owner = tile.to_chunk_coord(chunk_size);
        owner.x == self.x && owner.y == self.y
    }

    /// Chebyshev (chessboard) distance to another chunk.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Squared Euclidean distance to another chunk.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dy = self.y.abs_diff(other.y) as u64;
        dx * dx + dy * dy
    }

    /// Returns the chunk offset by `(dx, dy)`, saturating at the grid edge.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}
