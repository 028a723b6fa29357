//! Health component for living entities.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// How long the "just hurt" / "just healed" flash lasts, in seconds.
pub const FLASH_DURATION: f32 = 0.25;

/// Hit points plus the short visual timers renderers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Current health
    current: i32,
    /// Maximum health
    max: i32,
    /// Remaining "just hurt" flash time
    hurt_timer: f32,
    /// Remaining "just healed" flash time
    heal_timer: f32,
}

impl Health {
    /// Creates a full health component. A negative max is treated as zero.
    #[must_use]
    pub const fn new(max: i32) -> Self {
        let max = if max < 0 { 0 } else { max };
        Self {
            current: max,
            max,
            hurt_timer: 0.0,
            heal_timer: 0.0,
        }
    }

    /// Creates a health component with a specific current value.
    #[must_use]
    pub fn with_current(max: i32, current: i32) -> Self {
        let full = Self::new(max);
        Self {
            current: current.clamp(0, full.max),
            ..full
        }
    }

    /// Returns current health.
    #[must_use]
    pub const fn current(&self) -> i32 {
        self.current
    }

    /// Returns maximum health.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Checks if at maximum health.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Applies damage. Health never drops below zero.
    pub fn hurt(&mut self, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.current = self.current.saturating_sub(amount).max(0);
        self.hurt_timer = FLASH_DURATION;
        trace!("Hurt by {}, now {}/{}", amount, self.current, self.max);
    }

    /// Applies healing, capped at max. Does nothing at full health.
    pub fn heal(&mut self, amount: i32) {
        if amount <= 0 || self.is_full() {
            return;
        }
        self.current = self.current.saturating_add(amount).min(self.max);
        self.heal_timer = FLASH_DURATION;
        trace!("Healed by {}, now {}/{}", amount, self.current, self.max);
    }

    /// Counts down the flash timers.
    pub fn tick(&mut self, dt: f32) {
        self.hurt_timer = (self.hurt_timer - dt).max(0.0);
        self.heal_timer = (self.heal_timer - dt).max(0.0);
    }

    /// Whether the hurt flash is showing.
    #[must_use]
    pub fn just_hurt(&self) -> bool {
        self.hurt_timer > 0.0
    }

    /// Whether the heal flash is showing.
    #[must_use]
    pub fn just_healed(&self) -> bool {
        self.heal_timer > 0.0
    }

    /// Checks if dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current <= 0
    }
}
