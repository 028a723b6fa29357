//! Seeded continuous noise sampling.

use noise::{NoiseFn, Perlin};

/// Noise layer identifiers, mixed into the world seed so every layer
/// samples an independent field.
pub mod layers {
    /// Frequency modulator layer.
    pub const MODULATOR: u32 = 0;
    /// Height layer.
    pub const HEIGHT: u32 = 1;
    /// Decoration placement layer.
    pub const DECORATION: u32 = 2;
}

/// Derives the 32-bit noise seed for one layer of a world seed.
#[must_use]
pub fn layer_seed(world_seed: u64, layer: u32) -> u32 {
    let folded = (world_seed ^ (world_seed >> 32)) as u32;
    folded.wrapping_add(layer.wrapping_mul(0x9E37_79B9))
}

/// A seeded noise field: a pure function of `(seed, x, y)` into `[-1, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct NoiseField {
    seed: u32,
    perlin: Perlin,
}

impl NoiseField {
    /// Creates a field for the given seed.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            perlin: Perlin::new(seed),
        }
    }

    /// Returns the seed.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Samples the field. Output is always finite and inside `[-1, 1]`.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        clamp_signed(self.perlin.get([x, y]))
    }

    /// Samples the field remapped into `[0, 1]`.
    #[must_use]
    pub fn sample_unit(&self, x: f64, y: f64) -> f64 {
        to_unit(self.sample(x, y))
    }
}

/// Clamps a raw noise value into `[-1, 1]`; NaN becomes 0.
#[must_use]
pub fn clamp_signed(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
}

/// Remaps `[-1, 1]` to `[0, 1]`, clamping anything outside.
#[must_use]
pub fn to_unit(v: f64) -> f64 {
    ((clamp_signed(v) + 1.0) * 0.5).clamp(0.0, 1.0)
}
