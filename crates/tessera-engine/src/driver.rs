//! Headless simulation driver.
//!
//! Opens (or creates) a world, walks a viewer across it so chunks wake and
//! sleep, gives the spawned creatures something to do, and saves.

use anyhow::{Context, Result};
use glam::Vec2;
use tessera_common::EntityId;
use tessera_gameplay::{EntityRecord, Intent, MobConfig};
use tessera_world::{DeathHandler, TickStats, World};
use tracing::{debug, info};

use crate::config::EngineConfig;

/// Max health of driver-spawned creatures.
const CREATURE_HEALTH: i32 = 20;

/// Death effects for the headless run: a small burst of particles.
#[derive(Debug)]
pub struct ParticleBurst {
    particles: u32,
    rng: fastrand::Rng,
}

impl ParticleBurst {
    /// Creates a burst handler with its own RNG.
    #[must_use]
    pub fn new(particles: u32, seed: u64) -> Self {
        Self {
            particles,
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl DeathHandler for ParticleBurst {
    fn on_death(&mut self, record: &EntityRecord) -> Vec<EntityRecord> {
        debug!(id = %record.id(), "Creature died");
        (0..self.particles)
            .map(|_| {
                let angle = self.rng.f32() * std::f32::consts::TAU;
                let velocity = Vec2::from_angle(angle) * (1.0 + self.rng.f32() * 2.0);
                EntityRecord::particle(record.position(), velocity, 0.5 + self.rng.f32())
                    .with_tint([255, 80, 80, 255])
            })
            .collect()
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Frames simulated
    pub frames: u32,
    /// Accumulated tick statistics
    pub stats: TickStats,
    /// Entities alive at the end
    pub entities: usize,
    /// Chunks loaded at the end
    pub chunks: usize,
    /// Final viewer position
    pub viewer: Vec2,
}

/// Drives a world from the command line.
#[derive(Debug)]
pub struct Driver {
    config: EngineConfig,
    world: World,
    viewer: Vec2,
    creatures: Vec<EntityId>,
    effects: ParticleBurst,
    rng: fastrand::Rng,
}

impl Driver {
    /// Loads the world at `config.save_path`, or creates a new one.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let path = config.save_path.clone();
        let world = if path.exists() {
            World::load_from(&path).with_context(|| format!("Failed to load world from {}", path.display()))?
        } else {
            let seed = config.world_seed.unwrap_or_else(|| fastrand::u64(..));
            info!(seed, "No save found, creating new world");
            World::new(seed, config.world.clone())
        };
        Ok(Self::with_world(config, world))
    }

    /// Wraps an existing world. Mobile entities already in it are steered
    /// like freshly spawned ones.
    #[must_use]
    pub fn with_world(config: EngineConfig, world: World) -> Self {
        let seed = world.seed();
        let mut creatures: Vec<EntityId> = world
            .chunks()
            .flat_map(|chunk| chunk.records())
            .filter(|record| record.mob().is_some())
            .map(EntityRecord::id)
            .collect();
        creatures.sort_unstable();
        let mut driver = Self {
            config,
            world,
            viewer: Vec2::ZERO,
            creatures,
            effects: ParticleBurst::new(6, seed ^ 0x5EED),
            rng: fastrand::Rng::with_seed(seed),
        };
        driver.world.activity_pass_at(driver.viewer);
        driver
    }

    /// The simulated world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Spawns the configured number of creatures around the viewer.
    pub fn populate(&mut self) {
        let spread = self.world.config().chunk_size as f32 * self.world.config().tile_size;
        for _ in 0..self.config.creatures {
            let offset = Vec2::new(self.rng.f32() - 0.5, self.rng.f32() - 0.5) * spread * 2.0;
            let record = EntityRecord::creature(self.viewer + offset, CREATURE_HEALTH, MobConfig::default())
                .with_sprite(64);
            self.creatures.push(self.world.add_entity(record));
        }
        info!(count = self.creatures.len(), "Spawned creatures");
    }

    /// Simulates `frames` frames.
    pub fn run(&mut self, frames: u32) -> Result<RunSummary> {
        let mut stats = TickStats::default();
        let dt = self.config.frame_dt;
        let step = self.config.viewer_speed * self.world.config().tile_size * dt;

        for frame in 1..=frames {
            self.viewer.x += step;
            self.world.activity_pass_at(self.viewer);
            self.steer_creatures();

            stats.merge(self.world.advance(dt, &mut self.effects));

            let interval = self.config.autosave_interval;
            if interval > 0 && frame % interval == 0 {
                self.save()?;
            }
        }

        let summary = RunSummary {
            frames,
            stats,
            entities: self.world.entity_count(),
            chunks: self.world.chunk_count(),
            viewer: self.viewer,
        };
        info!(
            frames,
            ticks = stats.ticks,
            transfers = stats.transfers,
            deaths = stats.deaths,
            entities = summary.entities,
            chunks = summary.chunks,
            "Run complete"
        );
        Ok(summary)
    }

    /// Saves the world to the configured path.
    pub fn save(&mut self) -> Result<()> {
        let path = self.config.save_path.clone();
        self.world
            .save_to(&path)
            .with_context(|| format!("Failed to save world to {}", path.display()))
    }

    /// Random walking, occasional attacks, and the odd injury.
    fn steer_creatures(&mut self) {
        self.creatures.retain(|id| self.world.record(*id).is_some());

        for &id in &self.creatures {
            let roll = self.rng.f32();
            let intent = if roll < 0.02 {
                Intent::moving(Vec2::from_angle(self.rng.f32() * std::f32::consts::TAU))
            } else if roll < 0.03 {
                Intent::NONE
            } else if roll < 0.035 {
                Intent::acting()
            } else {
                continue;
            };
            if self.world.set_intent(id, intent).is_err() {
                continue;
            }

            if self.rng.f32() < 0.05 {
                if let Some(health) = self.world.record_mut(id).and_then(EntityRecord::health_mut) {
                    health.hurt(self.rng.i32(1..=6));
                }
            }
        }
    }
}
