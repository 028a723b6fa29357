//! Per-chunk runtime state: entity proxies and deferred lists.
//!
//! Every live [`EntityRecord`] in a chunk is paired with exactly one
//! [`EntityProxy`] that owns its physics body. Nothing here is persisted;
//! after a load the proxies are rebuilt from the records.
//!
//! While a chunk ticks, deaths, expiries and jurisdiction changes are only
//! queued. The queues are applied once the proxy loop has finished, so the
//! list being iterated is never mutated.

use ahash::AHashMap;
use tessera_common::{ChunkCoord, EntityId, TileCoord};
use tessera_gameplay::{EntityKind, EntityRecord, Fate, MobController};
use tracing::{debug, warn};

use crate::physics::{BodyHandle, PhysicsSpace};

/// Hook invoked when a living record dies. Returns records to spawn in
/// its place (corpses, drops, particles).
pub trait DeathHandler {
    /// Called once per death, before the record is collected.
    fn on_death(&mut self, record: &EntityRecord) -> Vec<EntityRecord>;
}

/// Death handler that spawns nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeathEffects;

impl DeathHandler for NoDeathEffects {
    fn on_death(&mut self, _record: &EntityRecord) -> Vec<EntityRecord> {
        Vec::new()
    }
}

/// Runtime counterpart of a record: owns the physics body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityProxy {
    id: EntityId,
    body: BodyHandle,
}

impl EntityProxy {
    /// ID of the paired record.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Physics body handle.
    #[must_use]
    pub const fn body(&self) -> BodyHandle {
        self.body
    }
}

/// Per-tick parameters shared by every chunk.
pub struct TickContext<'a> {
    /// Tick length in seconds
    pub dt: f32,
    /// Chunk edge length in tiles
    pub chunk_size: u32,
    /// World units per tile
    pub tile_size: f32,
    /// Death hook
    pub handler: &'a mut dyn DeathHandler,
}

/// An entity leaving its chunk, carried with its live proxy.
#[derive(Debug)]
pub struct Departure {
    /// The record, already removed from the source chunk
    pub record: EntityRecord,
    /// The proxy, body untouched
    pub proxy: EntityProxy,
    /// Chunk that now has jurisdiction
    pub target: ChunkCoord,
}

/// What happened during one chunk tick.
#[derive(Debug, Default)]
pub struct ChunkTickReport {
    /// Proxies synchronized
    pub synced: usize,
    /// Records that died
    pub deaths: usize,
    /// Records whose lifespan ran out
    pub expired: usize,
    /// Records handed to other chunks
    pub departures: Vec<Departure>,
    /// Records produced by the death handler
    pub spawned: Vec<EntityRecord>,
    /// Whether any persisted record state changed
    pub changed: bool,
}

/// Runtime state of one chunk.
#[derive(Debug, Default)]
pub struct ChunkRuntime {
    proxies: Vec<EntityProxy>,
    awake: bool,
    garbage: Vec<EntityId>,
    transfers: Vec<(EntityId, ChunkCoord)>,
}

impl ChunkRuntime {
    /// Whether the chunk is in the active set.
    #[must_use]
    pub const fn is_awake(&self) -> bool {
        self.awake
    }

    /// Number of proxies.
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    /// All proxies.
    #[must_use]
    pub fn proxies(&self) -> &[EntityProxy] {
        &self.proxies
    }

    /// Proxy for a record, if any.
    #[must_use]
    pub fn proxy_for(&self, id: EntityId) -> Option<&EntityProxy> {
        self.proxies.iter().find(|p| p.id == id)
    }

    /// Creates the proxy and body for a record.
    ///
    /// Returns false without touching anything if the record already has a
    /// proxy; that is a pairing bug, so debug builds assert.
    pub fn spawn_proxy(&mut self, record: &EntityRecord, physics: &mut PhysicsSpace) -> bool {
        let id = record.id();
        let duplicate = self.proxy_for(id).is_some();
        debug_assert!(!duplicate, "duplicate proxy for {id}");
        if duplicate {
            warn!(%id, "Ignoring duplicate proxy spawn");
            return false;
        }
        let body = physics.create_body(record, self.awake);
        self.proxies.push(EntityProxy { id, body });
        true
    }

    /// Takes ownership of a proxy arriving from another chunk. The body is
    /// kept as-is apart from matching this chunk's enabled state.
    pub fn accept(&mut self, proxy: EntityProxy, physics: &mut PhysicsSpace) {
        let duplicate = self.proxy_for(proxy.id).is_some();
        debug_assert!(!duplicate, "duplicate proxy for {}", proxy.id);
        if duplicate {
            warn!(id = %proxy.id, "Dropping duplicate incoming proxy");
            physics.destroy_body(proxy.body);
            return;
        }
        physics.set_enabled(proxy.body, self.awake);
        self.proxies.push(proxy);
    }

    /// Removes a proxy without destroying its body.
    pub fn detach(&mut self, id: EntityId) -> Option<EntityProxy> {
        let index = self.proxies.iter().position(|p| p.id == id)?;
        Some(self.proxies.swap_remove(index))
    }

    /// Removes a proxy and destroys its body. Returns false if there was
    /// no proxy, so a second destroy is a no-op.
    pub fn destroy(&mut self, id: EntityId, physics: &mut PhysicsSpace) -> bool {
        match self.detach(id) {
            Some(proxy) => {
                physics.destroy_body(proxy.body);
                true
            },
            None => false,
        }
    }

    /// Enables every body.
    pub fn wake(&mut self, physics: &mut PhysicsSpace) {
        self.set_awake(true, physics);
    }

    /// Disables every body.
    pub fn sleep(&mut self, physics: &mut PhysicsSpace) {
        self.set_awake(false, physics);
    }

    fn set_awake(&mut self, awake: bool, physics: &mut PhysicsSpace) {
        self.awake = awake;
        for proxy in &self.proxies {
            physics.set_enabled(proxy.body, awake);
        }
    }

    /// Creates proxies for records that lack one. Idempotent; returns the
    /// number created.
    pub fn rebuild(&mut self, records: &[EntityRecord], physics: &mut PhysicsSpace) -> usize {
        let mut created = 0;
        for record in records {
            if self.proxy_for(record.id()).is_none() && self.spawn_proxy(record, physics) {
                created += 1;
            }
        }
        created
    }

    /// Destroys every body and forgets all proxies.
    pub fn teardown(&mut self, physics: &mut PhysicsSpace) {
        for proxy in self.proxies.drain(..) {
            physics.destroy_body(proxy.body);
        }
        self.garbage.clear();
        self.transfers.clear();
    }

    /// Runs one tick over every proxy of the chunk at `owner`.
    ///
    /// Per proxy: records that follow physics read their body transform,
    /// then the record advances, then records that define their own
    /// physics push their transform back (mobs push their desired
    /// velocity instead). Deaths, expiries and departures are queued and
    /// applied after the loop.
    pub fn tick(
        &mut self,
        owner: ChunkCoord,
        records: &mut Vec<EntityRecord>,
        physics: &mut PhysicsSpace,
        ctx: &mut TickContext<'_>,
    ) -> ChunkTickReport {
        let mut report = ChunkTickReport::default();
        let index: AHashMap<EntityId, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id(), i))
            .collect();

        for proxy in &self.proxies {
            let Some(&slot) = index.get(&proxy.id) else {
                warn!(id = %proxy.id, "Proxy has no record, collecting");
                self.garbage.push(proxy.id);
                continue;
            };
            let record = &mut records[slot];

            if !record.defines_own_physics() {
                if let Some((position, rotation)) = physics.transform(proxy.body) {
                    record.set_position(position);
                    record.set_rotation(rotation);
                }
            }

            let fate = record.advance(ctx.dt);

            if record.defines_own_physics() {
                physics.set_transform(proxy.body, record.position(), record.rotation());
            } else if let Some(velocity) = record.mob().and_then(MobController::desired_velocity) {
                physics.set_linear_velocity(proxy.body, velocity);
            }
            report.synced += 1;
            if !matches!(record.kind(), EntityKind::Static(_)) {
                report.changed = true;
            }

            match fate {
                Fate::Died => {
                    report.deaths += 1;
                    report.spawned.extend(ctx.handler.on_death(record));
                    self.garbage.push(proxy.id);
                },
                Fate::Expired => {
                    report.expired += 1;
                    self.garbage.push(proxy.id);
                },
                Fate::Alive => {
                    let target = TileCoord::from_world(record.position(), ctx.tile_size)
                        .to_chunk_coord(ctx.chunk_size);
                    if target != owner {
                        self.transfers.push((proxy.id, target));
                    }
                },
            }
        }

        self.apply_deferred(records, physics, &mut report);
        if report.deaths + report.expired > 0 || !report.departures.is_empty() {
            report.changed = true;
        }
        report
    }

    fn apply_deferred(
        &mut self,
        records: &mut Vec<EntityRecord>,
        physics: &mut PhysicsSpace,
        report: &mut ChunkTickReport,
    ) {
        let mut garbage = std::mem::take(&mut self.garbage);
        for id in garbage.drain(..) {
            self.destroy(id, physics);
            if let Some(pos) = records.iter().position(|r| r.id() == id) {
                records.swap_remove(pos);
            }
        }
        self.garbage = garbage;

        let mut transfers = std::mem::take(&mut self.transfers);
        for (id, target) in transfers.drain(..) {
            let Some(proxy) = self.detach(id) else {
                continue;
            };
            let Some(pos) = records.iter().position(|r| r.id() == id) else {
                physics.destroy_body(proxy.body);
                continue;
            };
            debug!(%id, to_x = target.x, to_y = target.y, "Entity leaving chunk");
            report.departures.push(Departure {
                record: records.swap_remove(pos),
                proxy,
                target,
            });
        }
        self.transfers = transfers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tessera_gameplay::{Intent, MobConfig};

    struct CountingDeaths {
        seen: Vec<EntityId>,
    }

    impl DeathHandler for CountingDeaths {
        fn on_death(&mut self, record: &EntityRecord) -> Vec<EntityRecord> {
            self.seen.push(record.id());
            vec![EntityRecord::particle(record.position(), Vec2::Y, 1.0)]
        }
    }

    fn record(mut r: EntityRecord, id: u64) -> EntityRecord {
        r.set_id(EntityId::from_raw(id));
        r
    }

    fn setup(records: &[EntityRecord]) -> (ChunkRuntime, PhysicsSpace) {
        let mut physics = PhysicsSpace::new(0.0);
        let mut runtime = ChunkRuntime::default();
        runtime.wake(&mut physics);
        runtime.rebuild(records, &mut physics);
        (runtime, physics)
    }

    fn ctx(handler: &mut dyn DeathHandler) -> TickContext<'_> {
        TickContext {
            dt: 0.1,
            chunk_size: 16,
            tile_size: 1.0,
            handler,
        }
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let records = vec![
            record(EntityRecord::decoration(Vec2::new(1.0, 1.0), 0, false), 1),
            record(EntityRecord::decoration(Vec2::new(2.0, 1.0), 0, false), 2),
        ];
        let (mut runtime, mut physics) = setup(&records);
        assert_eq!(runtime.proxy_count(), 2);
        assert_eq!(runtime.rebuild(&records, &mut physics), 0);
        assert_eq!(physics.body_count(), 2);
    }

    #[test]
    fn test_expired_record_collected_once() {
        let mut records = vec![record(EntityRecord::particle(Vec2::new(4.0, 4.0), Vec2::ZERO, 0.05), 1)];
        let (mut runtime, mut physics) = setup(&records);
        let mut handler = NoDeathEffects;

        let report = runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        assert_eq!(report.expired, 1);
        assert!(records.is_empty());
        assert_eq!(runtime.proxy_count(), 0);
        assert_eq!(physics.body_count(), 0);

        let report = runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        assert_eq!(report.synced, 0);
    }

    #[test]
    fn test_death_invokes_handler() {
        let mut creature = record(EntityRecord::creature(Vec2::new(3.0, 3.0), 4, MobConfig::default()), 7);
        if let Some(health) = creature.health_mut() {
            health.hurt(10);
        }
        let mut records = vec![creature];
        let (mut runtime, mut physics) = setup(&records);
        let mut handler = CountingDeaths { seen: Vec::new() };

        let report = runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        assert_eq!(report.deaths, 1);
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(handler.seen, vec![EntityId::from_raw(7)]);
        assert!(records.is_empty());
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_crossing_boundary_departs_with_body() {
        let mut records = vec![record(EntityRecord::particle(Vec2::new(15.9, 8.0), Vec2::new(10.0, 0.0), 5.0), 3)];
        let (mut runtime, mut physics) = setup(&records);
        let body = runtime.proxies()[0].body();
        let mut handler = NoDeathEffects;

        let mut report = runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        assert_eq!(report.departures.len(), 1);
        let departure = report.departures.remove(0);
        assert_eq!(departure.target, ChunkCoord::new(1, 0));
        assert_eq!(departure.proxy.body(), body);
        assert!(records.is_empty());
        assert_eq!(runtime.proxy_count(), 0);
        assert!(physics.contains(body));
    }

    #[test]
    fn test_own_physics_pushes_transform() {
        let mut records = vec![record(EntityRecord::particle(Vec2::new(2.0, 2.0), Vec2::new(1.0, 0.0), 5.0), 1)];
        let (mut runtime, mut physics) = setup(&records);
        let body = runtime.proxies()[0].body();
        let mut handler = NoDeathEffects;

        runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        let (position, _) = physics.transform(body).expect("body exists");
        assert_eq!(position, records[0].position());
        assert!(position.x > 2.0);
    }

    #[test]
    fn test_physics_driven_record_follows_body() {
        let mut records = vec![record(EntityRecord::creature(Vec2::new(5.0, 5.0), 10, MobConfig::default()), 1)];
        let (mut runtime, mut physics) = setup(&records);
        let body = runtime.proxies()[0].body();
        physics.set_transform(body, Vec2::new(6.0, 5.0), 0.0);
        let mut handler = NoDeathEffects;

        runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        assert_eq!(records[0].position(), Vec2::new(6.0, 5.0));
    }

    #[test]
    fn test_mob_intent_drives_body_velocity() {
        let mut creature = record(EntityRecord::creature(Vec2::new(5.0, 5.0), 10, MobConfig::default()), 1);
        if let Some(mob) = creature.mob_mut() {
            mob.set_intent(Intent::moving(Vec2::X));
        }
        let mut records = vec![creature];
        let (mut runtime, mut physics) = setup(&records);
        let body = runtime.proxies()[0].body();
        let mut handler = NoDeathEffects;

        runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        let (velocity, _) = physics.velocity(body).expect("body exists");
        assert!((velocity.x - MobConfig::default().speed).abs() < 1e-4);
    }

    #[test]
    fn test_static_records_report_no_change() {
        let mut records = vec![record(EntityRecord::decoration(Vec2::new(2.5, 2.5), 0, true), 1)];
        let (mut runtime, mut physics) = setup(&records);
        let mut handler = NoDeathEffects;

        let report = runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        assert_eq!(report.synced, 1);
        assert!(!report.changed);

        records.push(record(EntityRecord::creature(Vec2::new(4.0, 4.0), 10, MobConfig::default()), 2));
        runtime.rebuild(&records, &mut physics);
        let report = runtime.tick(ChunkCoord::new(0, 0), &mut records, &mut physics, &mut ctx(&mut handler));
        assert!(report.changed);
    }

    #[test]
    fn test_destroy_twice_is_noop() {
        let records = vec![record(EntityRecord::decoration(Vec2::ONE, 0, false), 1)];
        let (mut runtime, mut physics) = setup(&records);
        assert!(runtime.destroy(EntityId::from_raw(1), &mut physics));
        assert!(!runtime.destroy(EntityId::from_raw(1), &mut physics));
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_sleep_disables_bodies() {
        let records = vec![record(EntityRecord::decoration(Vec2::ONE, 0, false), 1)];
        let (mut runtime, mut physics) = setup(&records);
        let body = runtime.proxies()[0].body();
        runtime.sleep(&mut physics);
        assert_eq!(physics.is_enabled(body), Some(false));
        runtime.wake(&mut physics);
        assert_eq!(physics.is_enabled(body), Some(true));
    }
}
