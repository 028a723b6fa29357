//! Movement and action requests pushed in by the input layer.
//!
//! The simulation never reads devices. Whatever drives an entity (keyboard,
//! AI, replay) writes an [`Intent`] and the mob state machine consumes it on
//! the next tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Requests for one mobile entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intent {
    /// Requested movement direction; components in -1..=1
    pub movement: Vec2,
    /// Whether an action (attack, harvest, ...) is requested
    pub action: bool,
}

impl Intent {
    /// No movement, no action.
    pub const NONE: Self = Self {
        movement: Vec2::ZERO,
        action: false,
    };

    /// Movement only.
    #[must_use]
    pub const fn moving(movement: Vec2) -> Self {
        Self {
            movement,
            action: false,
        }
    }

    /// Action only.
    #[must_use]
    pub const fn acting() -> Self {
        Self {
            movement: Vec2::ZERO,
            action: true,
        }
    }

    /// Checks if the net requested movement is non-zero.
    #[must_use]
    pub fn has_movement(&self) -> bool {
        self.movement.length_squared() > MOVEMENT_EPSILON * MOVEMENT_EPSILON
    }

    /// Movement direction, clamped to unit length.
    #[must_use]
    pub fn direction(&self) -> Vec2 {
        if self.has_movement() {
            self.movement.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        }
    }
}

/// Movement below this magnitude counts as no movement.
const MOVEMENT_EPSILON: f32 = 0.01;

/// Cardinal facing direction for sprite selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Facing up
    Up,
    /// Facing down
    #[default]
    Down,
    /// Facing left
    Left,
    /// Facing right
    Right,
}

impl Direction {
    /// Dominant-axis direction of a vector, or `None` for zero.
    #[must_use]
    pub fn from_vec2(v: Vec2) -> Option<Self> {
        if v.x.abs() < MOVEMENT_EPSILON && v.y.abs() < MOVEMENT_EPSILON {
            return None;
        }

        if v.x.abs() > v.y.abs() {
            if v.x > 0.0 {
                Some(Direction::Right)
            } else {
                Some(Direction::Left)
            }
        } else if v.y > 0.0 {
            Some(Direction::Down)
        } else {
            Some(Direction::Up)
        }
    }

    /// Sprite row offset for this direction.
    #[must_use]
    pub const fn sprite_row(self) -> u16 {
        match self {
            Direction::Down => 0,
            Direction::Left => 1,
            Direction::Right => 2,
            Direction::Up => 3,
        }
    }
}
