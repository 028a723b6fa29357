//! Chunk data: memoized terrain and the entity records it has
//! jurisdiction over.
//!
//! The serialized part of a chunk is its coordinate, terrain cache and
//! records. The runtime half (proxies, deferred lists, wake state) is
//! skipped and rebuilt after loading.

use std::collections::HashMap;

use ahash::RandomState;
use serde::{Deserialize, Serialize};
use tessera_common::{ChunkCoord, EntityId, TileCoord};
use tessera_gameplay::EntityRecord;

use crate::physics::PhysicsSpace;
use crate::runtime::{ChunkRuntime, ChunkTickReport, EntityProxy, TickContext};
use crate::terrain::{TerrainGenerator, TerrainLevel};

/// A square block of tiles and the entities inside it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk coordinate
    coord: ChunkCoord,
    /// Edge length in tiles
    size: u32,
    /// Terrain computed so far, keyed by packed tile coordinate
    terrain: HashMap<u64, TerrainLevel, RandomState>,
    /// Whether every tile has been computed
    generated: bool,
    /// Records this chunk has jurisdiction over
    records: Vec<EntityRecord>,
    /// Modified since last save
    #[serde(skip)]
    dirty: bool,
    #[serde(skip)]
    runtime: ChunkRuntime,
}

impl Chunk {
    /// Creates an empty chunk with no terrain computed.
    #[must_use]
    pub fn new(coord: ChunkCoord, size: u32) -> Self {
        Self {
            coord,
            size,
            terrain: HashMap::default(),
            generated: false,
            records: Vec::new(),
            dirty: true,
            runtime: ChunkRuntime::default(),
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the chunk size.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Returns whether the chunk is dirty.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the chunk as dirty.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Marks the chunk as clean.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Whether every tile's terrain has been computed.
    #[must_use]
    pub const fn is_fully_generated(&self) -> bool {
        self.generated
    }

    /// Number of tiles with known terrain.
    #[must_use]
    pub fn known_tile_count(&self) -> usize {
        self.terrain.len()
    }

    /// Cached terrain for a tile, without generating it.
    #[must_use]
    pub fn terrain_if_known(&self, tile: TileCoord) -> Option<TerrainLevel> {
        self.terrain.get(&tile.key()).copied()
    }

    /// Terrain for a tile, computing and caching it on first access.
    ///
    /// The first computation also rolls decorations; the placed record (ID
    /// still null) is returned for the world to adopt. Later calls return
    /// the cached level and never a decoration.
    pub fn terrain_at(
        &mut self,
        tile: TileCoord,
        generator: &TerrainGenerator,
        tile_size: f32,
        rng: &mut fastrand::Rng,
    ) -> (TerrainLevel, Option<EntityRecord>) {
        debug_assert!(self.coord.contains_tile(tile, self.size));
        if let Some(level) = self.terrain_if_known(tile) {
            return (level, None);
        }
        let level = generator.level_at(tile);
        self.terrain.insert(tile.key(), level);
        self.dirty = true;
        (level, generator.roll_decoration(tile, level, tile_size, rng))
    }

    /// Computes every remaining tile, row by row. Returns the decorations
    /// placed along the way.
    pub fn generate_all(
        &mut self,
        generator: &TerrainGenerator,
        tile_size: f32,
        rng: &mut fastrand::Rng,
    ) -> Vec<EntityRecord> {
        let mut placed = Vec::new();
        if self.generated {
            return placed;
        }
        let origin = self.coord.origin_tile(self.size);
        let size = self.size as i32;
        for dy in 0..size {
            for dx in 0..size {
                let tile = TileCoord::new(origin.x.saturating_add(dx), origin.y.saturating_add(dy));
                if let (_, Some(record)) = self.terrain_at(tile, generator, tile_size, rng) {
                    placed.push(record);
                }
            }
        }
        self.generated = true;
        placed
    }

    /// Records this chunk owns.
    #[must_use]
    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Finds a record by ID.
    #[must_use]
    pub fn record(&self, id: EntityId) -> Option<&EntityRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Finds a record by ID for modification. Marks the chunk dirty.
    pub fn record_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        let record = self.records.iter_mut().find(|r| r.id() == id)?;
        self.dirty = true;
        Some(record)
    }

    /// Runtime state.
    #[must_use]
    pub const fn runtime(&self) -> &ChunkRuntime {
        &self.runtime
    }

    /// Whether the chunk is in the active set.
    #[must_use]
    pub const fn is_awake(&self) -> bool {
        self.runtime.is_awake()
    }

    /// Takes a new record and creates its proxy. The record must already
    /// carry its world-assigned ID.
    pub fn adopt(&mut self, record: EntityRecord, physics: &mut PhysicsSpace) {
        if self.runtime.spawn_proxy(&record, physics) {
            self.records.push(record);
            self.dirty = true;
        }
    }

    /// Takes a record and its live proxy from another chunk.
    pub fn accept_transfer(&mut self, record: EntityRecord, proxy: EntityProxy, physics: &mut PhysicsSpace) {
        debug_assert_eq!(record.id(), proxy.id());
        self.runtime.accept(proxy, physics);
        self.records.push(record);
        self.dirty = true;
    }

    /// Removes a record and destroys its proxy immediately.
    pub fn remove_entity(&mut self, id: EntityId, physics: &mut PhysicsSpace) -> Option<EntityRecord> {
        let index = self.records.iter().position(|r| r.id() == id)?;
        self.runtime.destroy(id, physics);
        self.dirty = true;
        Some(self.records.swap_remove(index))
    }

    /// Enables every body.
    pub fn wake(&mut self, physics: &mut PhysicsSpace) {
        self.runtime.wake(physics);
    }

    /// Disables every body.
    pub fn sleep(&mut self, physics: &mut PhysicsSpace) {
        self.runtime.sleep(physics);
    }

    /// Creates proxies for records that lack one. Idempotent.
    pub fn rebuild_runtime(&mut self, physics: &mut PhysicsSpace) -> usize {
        self.runtime.rebuild(&self.records, physics)
    }

    /// Destroys every proxy. Records are kept.
    pub fn teardown_runtime(&mut self, physics: &mut PhysicsSpace) {
        self.runtime.teardown(physics);
    }

    /// Runs one simulation tick over this chunk's entities. The chunk is
    /// marked dirty only if a record moved, aged or left.
    pub fn tick(&mut self, physics: &mut PhysicsSpace, ctx: &mut TickContext<'_>) -> ChunkTickReport {
        let report = self.runtime.tick(self.coord, &mut self.records, physics, ctx);
        if report.changed {
            self.dirty = true;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use glam::Vec2;

    fn generator() -> TerrainGenerator {
        TerrainGenerator::new(77, GeneratorConfig::default())
    }

    #[test]
    fn test_terrain_memoized() {
        let generator = generator();
        let mut rng = fastrand::Rng::with_seed(0);
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0), 16);
        let tile = TileCoord::new(3, 9);

        assert!(chunk.terrain_if_known(tile).is_none());
        let (level, _) = chunk.terrain_at(tile, &generator, 1.0, &mut rng);
        assert_eq!(chunk.terrain_if_known(tile), Some(level));
        assert_eq!(level, generator.level_at(tile));

        let (again, decoration) = chunk.terrain_at(tile, &generator, 1.0, &mut rng);
        assert_eq!(again, level);
        assert!(decoration.is_none());
        assert_eq!(chunk.known_tile_count(), 1);
    }

    #[test]
    fn test_generate_all_covers_chunk() {
        let generator = generator();
        let mut rng = fastrand::Rng::with_seed(0);
        let mut chunk = Chunk::new(ChunkCoord::new(-1, 2), 8);
        chunk.generate_all(&generator, 1.0, &mut rng);

        assert!(chunk.is_fully_generated());
        assert_eq!(chunk.known_tile_count(), 64);
        assert!(chunk.generate_all(&generator, 1.0, &mut rng).is_empty());
    }

    #[test]
    fn test_adopt_and_remove() {
        let mut physics = PhysicsSpace::default();
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0), 16);
        chunk.mark_clean();
        let mut record = EntityRecord::decoration(Vec2::new(1.5, 1.5), 2, true);
        record.set_id(EntityId::from_raw(4));

        chunk.adopt(record, &mut physics);
        assert!(chunk.is_dirty());
        assert_eq!(chunk.record_count(), 1);
        assert_eq!(chunk.runtime().proxy_count(), 1);

        let removed = chunk.remove_entity(EntityId::from_raw(4), &mut physics);
        assert_eq!(removed.map(|r| r.id()), Some(EntityId::from_raw(4)));
        assert_eq!(physics.body_count(), 0);
        assert!(chunk.remove_entity(EntityId::from_raw(4), &mut physics).is_none());
    }

    #[test]
    fn test_serialization_skips_runtime() {
        let mut physics = PhysicsSpace::default();
        let mut chunk = Chunk::new(ChunkCoord::new(2, -3), 16);
        let mut record = EntityRecord::decoration(Vec2::new(40.0, -40.0), 2, true);
        record.set_id(EntityId::from_raw(1));
        chunk.adopt(record, &mut physics);
        chunk.terrain.insert(TileCoord::new(32, -48).key(), TerrainLevel::Sand);

        let bytes = bincode::serialize(&chunk).expect("serialize failed");
        let mut loaded: Chunk = bincode::deserialize(&bytes).expect("deserialize failed");

        assert_eq!(loaded.coord(), chunk.coord());
        assert_eq!(loaded.records(), chunk.records());
        assert_eq!(loaded.terrain_if_known(TileCoord::new(32, -48)), Some(TerrainLevel::Sand));
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.runtime().proxy_count(), 0);

        let mut fresh = PhysicsSpace::default();
        assert_eq!(loaded.rebuild_runtime(&mut fresh), 1);
        assert_eq!(loaded.rebuild_runtime(&mut fresh), 0);
    }
}
