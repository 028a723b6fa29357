//! Physics space shared by every chunk.
//!
//! A thin wrapper over the rapier2d pipeline. Bodies carry their
//! [`EntityId`] in `user_data`, so spatial queries can be answered in
//! terms of entities without a side table.

use glam::Vec2;
use rapier2d::prelude::*;
use tessera_common::EntityId;
use tessera_gameplay::{BodyKind, EntityRecord};

/// Handle to a body in the [`PhysicsSpace`].
pub type BodyHandle = RigidBodyHandle;

/// Rigid-body simulation for the whole world. Top-down, so no gravity.
pub struct PhysicsSpace {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    linear_damping: f32,
}

impl PhysicsSpace {
    /// Creates an empty space. `linear_damping` applies to dynamic bodies.
    #[must_use]
    pub fn new(linear_damping: f32) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_parameters: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            linear_damping,
        }
    }

    /// Advances the simulation by `dt` seconds. Disabled bodies do not move.
    pub fn step(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    /// Creates a body and box collider mirroring `record`.
    pub fn create_body(&mut self, record: &EntityRecord, enabled: bool) -> BodyHandle {
        let position = record.position();
        let builder = match record.body_kind() {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic().linear_damping(self.linear_damping),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
        };
        let mut builder = builder
            .translation(vector![position.x, position.y])
            .rotation(record.rotation())
            .user_data(u128::from(record.id().raw()));
        if record.mob().is_some() {
            builder = builder.lock_rotations();
        }

        let handle = self.bodies.insert(builder.build());
        let half = record.half_extents();
        let collider = ColliderBuilder::cuboid(half.x, half.y)
            .user_data(u128::from(record.id().raw()))
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        if !enabled {
            self.set_enabled(handle, false);
        }
        handle
    }

    /// Destroys a body and its colliders. Returns false if it was already gone.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Whether the handle refers to a live body.
    #[must_use]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    /// Number of live bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Enables or disables a body. Disabled bodies keep their state but
    /// neither move nor collide.
    pub fn set_enabled(&mut self, handle: BodyHandle, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_enabled(enabled);
        }
    }

    /// Whether a body is enabled.
    #[must_use]
    pub fn is_enabled(&self, handle: BodyHandle) -> Option<bool> {
        self.bodies.get(handle).map(RigidBody::is_enabled)
    }

    /// Position and rotation of a body.
    #[must_use]
    pub fn transform(&self, handle: BodyHandle) -> Option<(Vec2, f32)> {
        self.bodies.get(handle).map(|body| {
            let t = body.translation();
            (Vec2::new(t.x, t.y), body.rotation().angle())
        })
    }

    /// Moves a body to the given position and rotation.
    pub fn set_transform(&mut self, handle: BodyHandle, position: Vec2, rotation: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let translation = vector![position.x, position.y];
            if body.is_kinematic() {
                body.set_next_kinematic_position(Isometry::new(translation, rotation));
            }
            body.set_translation(translation, true);
            body.set_rotation(Rotation::new(rotation), true);
        }
    }

    /// Linear and angular velocity of a body.
    #[must_use]
    pub fn velocity(&self, handle: BodyHandle) -> Option<(Vec2, f32)> {
        self.bodies.get(handle).map(|body| {
            let v = body.linvel();
            (Vec2::new(v.x, v.y), body.angvel())
        })
    }

    /// Sets the linear velocity of a body.
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    /// Applies an impulse to a dynamic body.
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    /// Entities whose enabled colliders overlap the box `[min, max]`.
    /// Results are sorted by ID.
    #[must_use]
    pub fn entities_in_aabb(&self, min: Vec2, max: Vec2) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .colliders
            .iter()
            .filter(|(_, collider)| {
                collider
                    .parent()
                    .and_then(|parent| self.bodies.get(parent))
                    .is_some_and(RigidBody::is_enabled)
            })
            .filter(|(_, collider)| {
                let aabb = collider.compute_aabb();
                aabb.mins.x <= max.x && aabb.maxs.x >= min.x && aabb.mins.y <= max.y && aabb.maxs.y >= min.y
            })
            .map(|(_, collider)| EntityId::from_raw(collider.user_data as u64))
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}

impl Default for PhysicsSpace {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl std::fmt::Debug for PhysicsSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsSpace")
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("linear_damping", &self.linear_damping)
            .finish_non_exhaustive()
    }
}
