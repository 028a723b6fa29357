//! Mobile-entity state machine.
//!
//! `Idle ↔ Moving` follows the requested movement every tick.
//! `* → Action` needs the cooldown to have elapsed; once started, the action
//! plays all of its frames before the entity returns to `Idle`, even while
//! movement is requested.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::input::{Direction, Intent};

/// State of a mobile entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MobState {
    /// Standing still
    #[default]
    Idle,
    /// Walking in the requested direction
    Moving,
    /// Playing the fixed-length action sequence
    Action,
}

/// Tuning for a mobile entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobConfig {
    /// Movement speed in world units per second
    pub speed: f32,
    /// Minimum time between action starts, in seconds
    pub action_cooldown: f32,
    /// Number of frames in the action animation
    pub action_frames: u16,
    /// Duration of one action frame, in seconds
    pub frame_duration: f32,
}

impl Default for MobConfig {
    fn default() -> Self {
        Self {
            speed: 4.0,
            action_cooldown: 0.6,
            action_frames: 4,
            frame_duration: 0.08,
        }
    }
}

impl MobConfig {
    /// Total length of the action sequence.
    #[must_use]
    pub fn action_duration(&self) -> f32 {
        f32::from(self.action_frames) * self.frame_duration
    }
}

/// Drives one mobile entity from its [`Intent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobController {
    config: MobConfig,
    state: MobState,
    intent: Intent,
    facing: Direction,
    /// Time left before another action may start
    cooldown: f32,
    /// Time spent in the current action
    action_elapsed: f32,
}

impl MobController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(config: MobConfig) -> Self {
        Self {
            config,
            state: MobState::Idle,
            intent: Intent::NONE,
            facing: Direction::default(),
            cooldown: 0.0,
            action_elapsed: 0.0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> MobState {
        self.state
    }

    /// Returns the facing direction.
    #[must_use]
    pub const fn facing(&self) -> Direction {
        self.facing
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &MobConfig {
        &self.config
    }

    /// Returns the pending intent.
    #[must_use]
    pub const fn intent(&self) -> Intent {
        self.intent
    }

    /// Replaces the intent consumed on the next update.
    pub fn set_intent(&mut self, intent: Intent) {
        self.intent = intent;
    }

    /// Remaining cooldown before the next action may start.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> f32 {
        self.cooldown
    }

    /// Current frame of the action sequence, if acting.
    #[must_use]
    pub fn action_frame(&self) -> Option<u16> {
        if self.state != MobState::Action || self.config.frame_duration <= 0.0 {
            return None;
        }
        let frame = (self.action_elapsed / self.config.frame_duration) as u16;
        Some(frame.min(self.config.action_frames.saturating_sub(1)))
    }

    /// Advances timers and applies the state transitions.
    ///
    /// Returns the new state.
    pub fn update(&mut self, dt: f32) -> MobState {
        let previous = self.state;
        self.cooldown = (self.cooldown - dt).max(0.0);

        if self.state == MobState::Action {
            self.action_elapsed += dt;
            if self.action_elapsed < self.config.action_duration() {
                return self.state;
            }
            self.action_elapsed = 0.0;
            self.state = MobState::Idle;
        }

        if self.intent.action && self.cooldown <= 0.0 {
            self.state = MobState::Action;
            self.cooldown = self.config.action_cooldown;
            self.action_elapsed = 0.0;
        } else if self.intent.has_movement() {
            self.state = MobState::Moving;
        } else {
            self.state = MobState::Idle;
        }

        if let Some(dir) = Direction::from_vec2(self.intent.movement) {
            if self.state == MobState::Moving {
                self.facing = dir;
            }
        }

        if previous != self.state {
            trace!("Mob state {:?} -> {:?}", previous, self.state);
        }
        self.state
    }

    /// Velocity the physics body should be driven at, or `None` when the
    /// body should be left to coast.
    #[must_use]
    pub fn desired_velocity(&self) -> Option<Vec2> {
        match self.state {
            MobState::Moving => Some(self.intent.direction() * self.config.speed),
            MobState::Action => Some(Vec2::ZERO),
            MobState::Idle => None,
        }
    }
}

impl Default for MobController {
    fn default() -> Self {
        Self::new(MobConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn controller() -> MobController {
        MobController::new(MobConfig {
            speed: 2.0,
            action_cooldown: 1.0,
            action_frames: 3,
            frame_duration: 0.1,
        })
    }

    #[test]
    fn test_idle_moving_level_triggered() {
        let mut mob = controller();
        assert_eq!(mob.update(DT), MobState::Idle);

        mob.set_intent(Intent::moving(Vec2::new(1.0, 0.0)));
        assert_eq!(mob.update(DT), MobState::Moving);
        assert_eq!(mob.facing(), Direction::Right);
        assert_eq!(mob.desired_velocity(), Some(Vec2::new(2.0, 0.0)));

        mob.set_intent(Intent::NONE);
        assert_eq!(mob.update(DT), MobState::Idle);
        assert_eq!(mob.desired_velocity(), None);
    }

    #[test]
    fn test_action_preempts_movement_until_finished() {
        let mut mob = controller();
        mob.set_intent(Intent {
            movement: Vec2::new(0.0, 1.0),
            action: true,
        });
        assert_eq!(mob.update(DT), MobState::Action);
        assert_eq!(mob.desired_velocity(), Some(Vec2::ZERO));

        // Still acting while movement is held and the action is unfinished.
        mob.set_intent(Intent::moving(Vec2::new(0.0, 1.0)));
        assert_eq!(mob.update(0.1), MobState::Action);
        assert_eq!(mob.action_frame(), Some(1));
        assert_eq!(mob.update(0.1), MobState::Action);
        assert_eq!(mob.action_frame(), Some(2));

        // 0.3s sequence complete: back through Idle, then level-triggered Moving.
        assert_eq!(mob.update(0.11), MobState::Moving);
    }

    #[test]
    fn test_action_gated_by_cooldown() {
        let mut mob = controller();
        mob.set_intent(Intent::acting());
        assert_eq!(mob.update(DT), MobState::Action);

        for _ in 0..4 {
            mob.update(0.1);
        }
        // Action finished (0.4s) but cooldown (1.0s) still running.
        assert_eq!(mob.state(), MobState::Idle);
        assert!(mob.cooldown_remaining() > 0.0);

        for _ in 0..7 {
            mob.update(0.1);
        }
        assert_eq!(mob.state(), MobState::Action);
    }

    #[test]
    fn test_action_frame_none_when_not_acting() {
        let mob = controller();
        assert_eq!(mob.action_frame(), None);
    }
}
