//! # Tessera Common
//!
//! Common types shared by every Tessera subsystem:
//! - Coordinate types (tile, chunk) and the packed chunk key
//! - Entity IDs and the per-world ID allocator
//! - Version information for save schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
