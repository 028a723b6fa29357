//! # Tessera Gameplay
//!
//! The physics-free half of every simulated entity:
//! - Entity records (decorations, living creatures, transient effects)
//! - Health with hurt/heal feedback timers
//! - The mobile-entity state machine (`Idle`, `Moving`, `Action`)
//! - Intents pushed in by the input layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod entity;
pub mod health;
pub mod input;
pub mod mob;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::entity::*;
    pub use crate::health::*;
    pub use crate::input::*;
    pub use crate::mob::*;
}

pub use prelude::*;
