//! The world: a sparse map of chunks, the shared physics space, and the
//! activity set that decides which chunks simulate.
//!
//! Chunks are created on demand whenever a tile or position inside them is
//! touched. Only chunks near the viewer are active; everything else stays
//! loaded but dormant, with its bodies disabled.

use std::collections::HashMap;

use ahash::RandomState;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tessera_common::{ChunkCoord, ChunkKey, EntityId, EntityIdAllocator, TileCoord, WorldError, WorldResult};
use tessera_gameplay::{EntityRecord, Intent};
use tracing::{debug, info};

use crate::activity::{ActivityDelta, ActivityTracker};
use crate::chunk::Chunk;
use crate::config::WorldConfig;
use crate::physics::PhysicsSpace;
use crate::runtime::{DeathHandler, TickContext};
use crate::terrain::{TerrainGenerator, TerrainLevel};

/// Result of a terrain lookup that must not generate anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainQuery {
    /// Terrain has been computed
    Known(TerrainLevel),
    /// The tile (or its chunk) has not been generated yet
    Unknown,
}

/// Counters for one or more ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks run
    pub ticks: u32,
    /// Active chunks ticked, summed over ticks
    pub chunks_ticked: usize,
    /// Proxies synchronized
    pub proxies_synced: usize,
    /// Entities that changed chunk
    pub transfers: usize,
    /// Entities that died
    pub deaths: usize,
    /// Entities whose lifespan ran out
    pub expired: usize,
    /// Entities spawned by death handlers
    pub spawned: usize,
}

impl TickStats {
    /// Adds another set of counters into this one.
    pub fn merge(&mut self, other: Self) {
        self.ticks += other.ticks;
        self.chunks_ticked += other.chunks_ticked;
        self.proxies_synced += other.proxies_synced;
        self.transfers += other.transfers;
        self.deaths += other.deaths;
        self.expired += other.expired;
        self.spawned += other.spawned;
    }
}

/// Persistent part of a world.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WorldState {
    pub(crate) seed: u64,
    pub(crate) config: WorldConfig,
    pub(crate) ids: EntityIdAllocator,
    pub(crate) tick_count: u64,
    pub(crate) chunks: HashMap<ChunkKey, Chunk, RandomState>,
}

/// A chunked, procedurally generated tile world.
#[derive(Debug)]
pub struct World {
    state: WorldState,
    generator: TerrainGenerator,
    physics: PhysicsSpace,
    activity: ActivityTracker,
    /// Decoration rolls. Not persisted: a reloaded world reseeds it.
    rng: fastrand::Rng,
    accumulator: f32,
}

fn chunk_entry(chunks: &mut HashMap<ChunkKey, Chunk, RandomState>, coord: ChunkCoord, size: u32) -> &mut Chunk {
    chunks.entry(coord.key()).or_insert_with(|| {
        debug!(x = coord.x, y = coord.y, "Created chunk");
        Chunk::new(coord, size)
    })
}

impl World {
    /// Creates an empty world. The config is validated first.
    #[must_use]
    pub fn new(seed: u64, config: WorldConfig) -> Self {
        let state = WorldState {
            seed,
            config: config.validated(),
            ids: EntityIdAllocator::new(),
            tick_count: 0,
            chunks: HashMap::default(),
        };
        info!(seed, chunk_size = state.config.chunk_size, "Created world");
        Self::from_state(state)
    }

    /// Builds the runtime half around persisted state. All chunks start
    /// dormant; proxies are created with their bodies disabled.
    pub(crate) fn from_state(mut state: WorldState) -> Self {
        state.config.validate();
        let generator = TerrainGenerator::new(state.seed, state.config.generator.clone());
        let physics = PhysicsSpace::new(state.config.linear_damping);
        let activity = ActivityTracker::new(state.config.activity_radius, state.config.activity_metric);
        let rng = fastrand::Rng::with_seed(state.seed);

        let mut world = Self {
            state,
            generator,
            physics,
            activity,
            rng,
            accumulator: 0.0,
        };
        world.rebuild_runtime();
        world
    }

    pub(crate) const fn state(&self) -> &WorldState {
        &self.state
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.state.seed
    }

    /// Validated configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.state.config
    }

    /// Terrain generator.
    #[must_use]
    pub const fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// Physics space.
    #[must_use]
    pub const fn physics(&self) -> &PhysicsSpace {
        &self.physics
    }

    /// Ticks run since the world was created (persisted).
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.state.tick_count
    }

    /// Number of loaded chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.state.chunks.len()
    }

    /// Iterates loaded chunks in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.state.chunks.values()
    }

    /// Chunk containing a tile, created if it does not exist yet.
    pub fn chunk_for_tile(&mut self, tile: TileCoord) -> &mut Chunk {
        let size = self.state.config.chunk_size;
        chunk_entry(&mut self.state.chunks, tile.to_chunk_coord(size), size)
    }

    /// Chunk containing a world-space position, created if needed.
    pub fn chunk_for_position(&mut self, position: Vec2) -> &mut Chunk {
        let tile = TileCoord::from_world(position, self.state.config.tile_size);
        self.chunk_for_tile(tile)
    }

    /// Chunk at `coord` if it is loaded. Never generates.
    #[must_use]
    pub fn chunk_if_loaded(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.state.chunks.get(&coord.key())
    }

    /// Chunk at `coord`, or [`WorldError::ChunkNotLoaded`].
    pub fn loaded_chunk(&self, coord: ChunkCoord) -> WorldResult<&Chunk> {
        self.chunk_if_loaded(coord).ok_or(WorldError::ChunkNotLoaded {
            x: coord.x,
            y: coord.y,
        })
    }

    /// Terrain at a tile, generating and caching it (and any decoration)
    /// on first access.
    pub fn terrain_at(&mut self, tile: TileCoord) -> TerrainLevel {
        let size = self.state.config.chunk_size;
        let tile_size = self.state.config.tile_size;
        let chunk = chunk_entry(&mut self.state.chunks, tile.to_chunk_coord(size), size);
        let (level, decoration) = chunk.terrain_at(tile, &self.generator, tile_size, &mut self.rng);
        if let Some(mut record) = decoration {
            record.set_id(self.state.ids.allocate());
            chunk.adopt(record, &mut self.physics);
        }
        level
    }

    /// Terrain at a tile if already computed.
    #[must_use]
    pub fn terrain_if_known(&self, tile: TileCoord) -> TerrainQuery {
        self.chunk_if_loaded(tile.to_chunk_coord(self.state.config.chunk_size))
            .and_then(|chunk| chunk.terrain_if_known(tile))
            .map_or(TerrainQuery::Unknown, TerrainQuery::Known)
    }

    /// Recomputes the active set around the viewer's tile.
    ///
    /// Newly active chunks are created if missing, fully generated on their
    /// first wake, and have their bodies enabled. Chunks that fell out of
    /// range have their bodies disabled.
    pub fn activity_pass(&mut self, viewer: TileCoord) -> ActivityDelta {
        let size = self.state.config.chunk_size;
        let tile_size = self.state.config.tile_size;
        let delta = self.activity.pass(viewer.to_chunk_coord(size));

        for coord in &delta.slept {
            if let Some(chunk) = self.state.chunks.get_mut(&coord.key()) {
                chunk.sleep(&mut self.physics);
            }
        }

        for coord in &delta.woken {
            let chunk = chunk_entry(&mut self.state.chunks, *coord, size);
            if !chunk.is_fully_generated() {
                for mut record in chunk.generate_all(&self.generator, tile_size, &mut self.rng) {
                    record.set_id(self.state.ids.allocate());
                    chunk.adopt(record, &mut self.physics);
                }
            }
            chunk.wake(&mut self.physics);
        }

        if !delta.is_empty() {
            debug!(
                woken = delta.woken.len(),
                slept = delta.slept.len(),
                active = self.activity.active_count(),
                "Activity pass"
            );
        }
        delta
    }

    /// Activity pass centred on a world-space position.
    pub fn activity_pass_at(&mut self, viewer: Vec2) -> ActivityDelta {
        self.activity_pass(TileCoord::from_world(viewer, self.state.config.tile_size))
    }

    /// Whether a chunk is in the active set.
    #[must_use]
    pub fn is_active(&self, coord: ChunkCoord) -> bool {
        self.activity.is_active(coord.key())
    }

    /// Active chunks in ascending key order.
    #[must_use]
    pub fn active_chunks(&self) -> Vec<ChunkCoord> {
        self.activity.active_keys().into_iter().map(ChunkKey::coord).collect()
    }

    /// Inserts a record, assigning it a fresh ID. The chunk containing its
    /// position takes jurisdiction and creates its proxy.
    pub fn add_entity(&mut self, mut record: EntityRecord) -> EntityId {
        let id = self.state.ids.allocate();
        record.set_id(id);
        let size = self.state.config.chunk_size;
        let coord = TileCoord::from_world(record.position(), self.state.config.tile_size).to_chunk_coord(size);
        chunk_entry(&mut self.state.chunks, coord, size).adopt(record, &mut self.physics);
        id
    }

    /// Removes an entity and destroys its body right away.
    pub fn despawn(&mut self, id: EntityId) -> WorldResult<EntityRecord> {
        self.state
            .chunks
            .values_mut()
            .find_map(|chunk| chunk.remove_entity(id, &mut self.physics))
            .ok_or(WorldError::EntityNotFound(id))
    }

    /// Chunk that has jurisdiction over an entity.
    #[must_use]
    pub fn owner_of(&self, id: EntityId) -> Option<ChunkCoord> {
        self.chunks().find(|c| c.record(id).is_some()).map(Chunk::coord)
    }

    /// Looks up a record.
    #[must_use]
    pub fn record(&self, id: EntityId) -> Option<&EntityRecord> {
        self.chunks().find_map(|c| c.record(id))
    }

    /// Looks up a record for modification.
    pub fn record_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.state.chunks.values_mut().find_map(|c| c.record_mut(id))
    }

    /// Sets the intent of a mobile entity.
    pub fn set_intent(&mut self, id: EntityId, intent: Intent) -> WorldResult<()> {
        let mob = self
            .record_mut(id)
            .and_then(EntityRecord::mob_mut)
            .ok_or(WorldError::EntityNotFound(id))?;
        mob.set_intent(intent);
        Ok(())
    }

    /// Linear velocity of an entity's body.
    #[must_use]
    pub fn velocity_of(&self, id: EntityId) -> Option<Vec2> {
        let proxy = self.chunks().find_map(|c| c.runtime().proxy_for(id))?;
        self.physics.velocity(proxy.body()).map(|(v, _)| v)
    }

    /// Applies an impulse to an entity's body.
    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec2) -> WorldResult<()> {
        let body = self
            .state
            .chunks
            .values()
            .find_map(|c| c.runtime().proxy_for(id))
            .map(|p| p.body())
            .ok_or(WorldError::EntityNotFound(id))?;
        self.physics.apply_impulse(body, impulse);
        Ok(())
    }

    /// Total number of records across loaded chunks.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.chunks().map(Chunk::record_count).sum()
    }

    /// Records in loaded chunks whose collision box overlaps `[min, max]`,
    /// sorted by ID. Dormant chunks are included.
    #[must_use]
    pub fn entities_in_aabb(&self, min: Vec2, max: Vec2) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .chunks()
            .flat_map(Chunk::records)
            .filter(|r| {
                let lo = r.position() - r.half_extents();
                let hi = r.position() + r.half_extents();
                lo.x <= max.x && hi.x >= min.x && lo.y <= max.y && hi.y >= min.y
            })
            .map(EntityRecord::id)
            .collect();
        found.sort_unstable();
        found
    }

    /// Entities in active chunks whose colliders overlap `[min, max]`,
    /// answered by the physics broad shapes.
    #[must_use]
    pub fn active_entities_in_aabb(&self, min: Vec2, max: Vec2) -> Vec<EntityId> {
        self.physics.entities_in_aabb(min, max)
    }

    /// Runs one simulation tick: steps physics, then ticks every active
    /// chunk. Entities that crossed a chunk boundary are handed over after
    /// all chunks have ticked, followed by anything the death handler
    /// spawned.
    pub fn tick(&mut self, dt: f32, handler: &mut dyn DeathHandler) -> TickStats {
        let mut stats = TickStats::default();
        if !(dt.is_finite() && dt > 0.0) {
            return stats;
        }

        self.physics.step(dt);

        let size = self.state.config.chunk_size;
        let mut ctx = TickContext {
            dt,
            chunk_size: size,
            tile_size: self.state.config.tile_size,
            handler,
        };
        let mut departures = Vec::new();
        let mut spawned = Vec::new();

        for key in self.activity.active_keys() {
            let Some(chunk) = self.state.chunks.get_mut(&key) else {
                continue;
            };
            let report = chunk.tick(&mut self.physics, &mut ctx);
            stats.chunks_ticked += 1;
            stats.proxies_synced += report.synced;
            stats.deaths += report.deaths;
            stats.expired += report.expired;
            departures.extend(report.departures);
            spawned.extend(report.spawned);
        }

        for departure in departures {
            chunk_entry(&mut self.state.chunks, departure.target, size).accept_transfer(
                departure.record,
                departure.proxy,
                &mut self.physics,
            );
            stats.transfers += 1;
        }

        for record in spawned {
            self.add_entity(record);
            stats.spawned += 1;
        }

        self.state.tick_count += 1;
        stats.ticks = 1;
        stats
    }

    /// Feeds frame time into the fixed-timestep accumulator and runs as
    /// many ticks as it covers, at most `max_substeps`. Backlog beyond the
    /// cap is dropped.
    pub fn advance(&mut self, frame_dt: f32, handler: &mut dyn DeathHandler) -> TickStats {
        let mut stats = TickStats::default();
        if !(frame_dt.is_finite() && frame_dt > 0.0) {
            return stats;
        }
        let step = self.state.config.fixed_timestep;
        self.accumulator += frame_dt;

        while self.accumulator >= step && stats.ticks < self.state.config.max_substeps {
            let tick = self.tick(step, handler);
            stats.merge(tick);
            self.accumulator -= step;
        }
        if self.accumulator >= step {
            debug!(backlog = self.accumulator, "Dropping simulation backlog");
            self.accumulator = 0.0;
        }
        stats
    }

    /// Creates proxies for every record that lacks one. Safe to call any
    /// number of times; returns how many were created.
    pub fn rebuild_runtime(&mut self) -> usize {
        let mut created = 0;
        for chunk in self.state.chunks.values_mut() {
            for record in chunk.records() {
                self.state.ids.observe(record.id());
            }
            created += chunk.rebuild_runtime(&mut self.physics);
        }
        if created > 0 {
            info!(proxies = created, chunks = self.state.chunks.len(), "Rebuilt entity proxies");
        }
        created
    }

    /// Number of chunks modified since the last save.
    #[must_use]
    pub fn dirty_chunk_count(&self) -> usize {
        self.chunks().filter(|c| c.is_dirty()).count()
    }

    /// Marks every chunk clean.
    pub fn mark_all_clean(&mut self) {
        for chunk in self.state.chunks.values_mut() {
            chunk.mark_clean();
        }
    }
}
