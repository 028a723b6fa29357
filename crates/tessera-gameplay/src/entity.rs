//! Serializable entity records.
//!
//! An [`EntityRecord`] is the persistent half of an entity: plain data that
//! saves and loads with its chunk. It never holds a physics handle; the
//! world pairs each live record with a runtime proxy through its
//! [`EntityId`].

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tessera_common::EntityId;

use crate::health::Health;
use crate::mob::{MobConfig, MobController};

/// RGBA tint applied by the renderer.
pub type Tint = [u8; 4];

/// No tint.
pub const WHITE: Tint = [255, 255, 255, 255];

/// How the physics body behind a record is simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves (decorations, harvestables)
    Fixed,
    /// Moved by forces and collisions; physics is authoritative
    Dynamic,
    /// Moved by the record itself; physics mirrors it for queries
    Kinematic,
}

/// Outcome of advancing a record by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fate {
    /// Keeps living
    Alive,
    /// Health reached zero
    Died,
    /// Lifespan ran out
    Expired,
}

/// Static decoration or harvestable placed by terrain generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticState {
    /// Whether gameplay may harvest it
    pub harvestable: bool,
}

/// Entity with hit points, optionally driven by a mob controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivingState {
    /// Hit points
    pub health: Health,
    /// State machine for entities that walk and act
    pub mob: Option<MobController>,
}

/// Short-lived entity (particles, projectiles, effects).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientState {
    /// Seconds left before expiry
    pub lifespan: f32,
    /// Velocity for hand-rolled motion, world units per second
    pub velocity: Vec2,
    /// Angular velocity for hand-rolled motion, radians per second
    pub spin: f32,
    /// Fraction of velocity kept per second (1.0 = no decay)
    pub decay: f32,
}

impl TransientState {
    /// Integrates one step of decaying-velocity motion.
    fn integrate(&mut self, position: &mut Vec2, rotation: &mut f32, dt: f32) {
        *position += self.velocity * dt;
        *rotation += self.spin * dt;
        let keep = self.decay.clamp(0.0, 1.0).powf(dt);
        self.velocity *= keep;
        self.spin *= keep;
    }
}

/// Behaviour variant of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Decoration / harvestable
    Static(StaticState),
    /// Has health
    Living(LivingState),
    /// Has a lifespan
    Transient(TransientState),
}

/// Persistent entity state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Stable identifier, assigned by the world on insertion
    id: EntityId,
    /// World-space position
    position: Vec2,
    /// Rotation in radians
    rotation: f32,
    /// Collider half extents
    half_extents: Vec2,
    /// Sprite index
    sprite: u16,
    /// Render tint
    tint: Tint,
    /// When true the record drives its physics body instead of following it
    defines_own_physics: bool,
    /// Behaviour variant
    kind: EntityKind,
}

impl EntityRecord {
    /// Creates a record of the given kind. The ID stays null until the
    /// world adopts it.
    #[must_use]
    pub fn new(kind: EntityKind, position: Vec2) -> Self {
        Self {
            id: EntityId::NULL,
            position,
            rotation: 0.0,
            half_extents: Vec2::splat(0.4),
            sprite: 0,
            tint: WHITE,
            defines_own_physics: false,
            kind,
        }
    }

    /// Static decoration occupying one tile.
    #[must_use]
    pub fn decoration(position: Vec2, sprite: u16, harvestable: bool) -> Self {
        Self::new(EntityKind::Static(StaticState { harvestable }), position).with_sprite(sprite)
    }

    /// Physics-driven creature with a mob controller.
    #[must_use]
    pub fn creature(position: Vec2, max_health: i32, mob: MobConfig) -> Self {
        Self::new(
            EntityKind::Living(LivingState {
                health: Health::new(max_health),
                mob: Some(MobController::new(mob)),
            }),
            position,
        )
    }

    /// Scripted particle with decaying velocity.
    #[must_use]
    pub fn particle(position: Vec2, velocity: Vec2, lifespan: f32) -> Self {
        let mut record = Self::new(
            EntityKind::Transient(TransientState {
                lifespan,
                velocity,
                spin: 0.0,
                decay: 0.1,
            }),
            position,
        )
        .with_half_extents(Vec2::splat(0.1));
        record.defines_own_physics = true;
        record
    }

    /// Sets the sprite index.
    #[must_use]
    pub fn with_sprite(mut self, sprite: u16) -> Self {
        self.sprite = sprite;
        self
    }

    /// Sets the tint.
    #[must_use]
    pub fn with_tint(mut self, tint: Tint) -> Self {
        self.tint = tint;
        self
    }

    /// Sets the collider half extents.
    #[must_use]
    pub fn with_half_extents(mut self, half_extents: Vec2) -> Self {
        self.half_extents = half_extents.max(Vec2::splat(0.01));
        self
    }

    /// Sets the rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets whether the record drives its own physics.
    #[must_use]
    pub fn with_own_physics(mut self, defines_own_physics: bool) -> Self {
        self.defines_own_physics = defines_own_physics;
        self
    }

    /// Returns the entity ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Assigns the entity ID. Only the owning world calls this.
    pub fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// Returns the world-space position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Sets the world-space position.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Returns the rotation in radians.
    #[must_use]
    pub const fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Sets the rotation in radians.
    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    /// Returns the collider half extents.
    #[must_use]
    pub const fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    /// Returns the sprite index, offset by animation state for mobs.
    #[must_use]
    pub fn sprite(&self) -> u16 {
        match &self.kind {
            EntityKind::Living(LivingState { mob: Some(mob), .. }) => {
                let frame = mob.action_frame().map_or(0, |f| f.saturating_add(1));
                self.sprite
                    .saturating_add(mob.facing().sprite_row() * 8)
                    .saturating_add(frame)
            },
            _ => self.sprite,
        }
    }

    /// Returns the render tint.
    #[must_use]
    pub const fn tint(&self) -> Tint {
        self.tint
    }

    /// Returns whether the record drives its own physics.
    #[must_use]
    pub const fn defines_own_physics(&self) -> bool {
        self.defines_own_physics
    }

    /// Returns the behaviour variant.
    #[must_use]
    pub const fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Returns the behaviour variant mutably.
    pub fn kind_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }

    /// Returns health for living records.
    #[must_use]
    pub fn health(&self) -> Option<&Health> {
        match &self.kind {
            EntityKind::Living(living) => Some(&living.health),
            _ => None,
        }
    }

    /// Returns health mutably for living records.
    pub fn health_mut(&mut self) -> Option<&mut Health> {
        match &mut self.kind {
            EntityKind::Living(living) => Some(&mut living.health),
            _ => None,
        }
    }

    /// Returns the mob controller, if any.
    #[must_use]
    pub fn mob(&self) -> Option<&MobController> {
        match &self.kind {
            EntityKind::Living(living) => living.mob.as_ref(),
            _ => None,
        }
    }

    /// Returns the mob controller mutably, if any.
    pub fn mob_mut(&mut self) -> Option<&mut MobController> {
        match &mut self.kind {
            EntityKind::Living(living) => living.mob.as_mut(),
            _ => None,
        }
    }

    /// Physics body type this record needs.
    #[must_use]
    pub fn body_kind(&self) -> BodyKind {
        if self.defines_own_physics {
            return BodyKind::Kinematic;
        }
        match self.kind {
            EntityKind::Static(_) => BodyKind::Fixed,
            EntityKind::Living(_) | EntityKind::Transient(_) => BodyKind::Dynamic,
        }
    }

    /// Advances gameplay state by one tick: timers, the mob state machine
    /// and, for records that define their own physics, hand-rolled motion.
    pub fn advance(&mut self, dt: f32) -> Fate {
        let own_physics = self.defines_own_physics;
        match &mut self.kind {
            EntityKind::Static(_) => Fate::Alive,
            EntityKind::Living(living) => {
                living.health.tick(dt);
                if let Some(mob) = living.mob.as_mut() {
                    mob.update(dt);
                }
                if living.health.is_dead() {
                    Fate::Died
                } else {
                    Fate::Alive
                }
            },
            EntityKind::Transient(transient) => {
                if own_physics {
                    transient.integrate(&mut self.position, &mut self.rotation, dt);
                }
                transient.lifespan -= dt;
                if transient.lifespan <= 0.0 {
                    Fate::Expired
                } else {
                    Fate::Alive
                }
            },
        }
    }
}
