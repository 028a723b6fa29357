//! # Tessera World
//!
//! A chunked, procedurally generated tile world:
//! - Seeded noise and frequency-modulated fractal terrain
//! - Chunks with lazily memoized terrain and entity jurisdiction
//! - A viewer-centred activity set that wakes and sleeps chunks
//! - Record/proxy entity pairing over a shared rapier2d physics space
//! - Compressed save files with proxy rebuild on load

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod activity;
pub mod chunk;
pub mod config;
pub mod noise;
pub mod persist;
pub mod physics;
pub mod runtime;
pub mod terrain;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::activity::*;
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::noise::NoiseField;
    pub use crate::persist::*;
    pub use crate::physics::*;
    pub use crate::runtime::*;
    pub use crate::terrain::*;
    pub use crate::world::*;
}

pub use prelude::*;
