//! World and generator configuration.
//!
//! Both structs deserialize with `#[serde(default)]`, so a partial TOML
//! table only overrides the fields it names. Call `validate()` after
//! loading to clamp everything into a usable range.

use serde::{Deserialize, Serialize};

use crate::activity::ActivityMetric;
use crate::terrain::TerrainLevel;

/// Default chunk edge length in tiles.
pub const DEFAULT_CHUNK_SIZE: u32 = 16;

/// Default activity radius in chunks.
pub const DEFAULT_ACTIVITY_RADIUS: u32 = 2;

/// One decoration that terrain generation may place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecorationRule {
    /// Terrain level the decoration grows on
    pub level: TerrainLevel,
    /// Minimum decoration-noise value (0..1) where it may appear
    pub noise_threshold: f64,
    /// Chance (0..1) of placing it where the noise allows
    pub chance: f64,
    /// Sprite index of the spawned entity
    pub sprite: u16,
    /// Whether the spawned entity can be harvested
    pub harvestable: bool,
}

/// Terrain generator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of noise octaves summed per tile
    pub octaves: u32,
    /// Frequency of the modulator layer that picks the base frequency
    pub modulator_frequency: f64,
    /// Base frequency where the modulator reads 0
    pub min_frequency: f64,
    /// Base frequency where the modulator reads 1
    pub max_frequency: f64,
    /// Fraction of the 0..1 height range given to each terrain level, in
    /// `TerrainLevel` order. Empty means equal-width bins.
    pub level_thresholds: Vec<f64>,
    /// Frequency of the decoration noise layer
    pub decoration_frequency: f64,
    /// Decorations to seed, tried in order
    pub decorations: Vec<DecorationRule>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            modulator_frequency: 0.004,
            min_frequency: 0.015,
            max_frequency: 0.06,
            level_thresholds: vec![0.25, 0.15, 0.08, 0.37, 0.15],
            decoration_frequency: 0.2,
            decorations: vec![
                DecorationRule {
                    level: TerrainLevel::Grass,
                    noise_threshold: 0.55,
                    chance: 0.3,
                    sprite: 40,
                    harvestable: true,
                },
                DecorationRule {
                    level: TerrainLevel::Sand,
                    noise_threshold: 0.6,
                    chance: 0.1,
                    sprite: 48,
                    harvestable: false,
                },
                DecorationRule {
                    level: TerrainLevel::Rock,
                    noise_threshold: 0.5,
                    chance: 0.15,
                    sprite: 56,
                    harvestable: true,
                },
            ],
        }
    }
}

impl GeneratorConfig {
    /// Validate and clamp generator values to sensible ranges.
    pub fn validate(&mut self) {
        self.octaves = self.octaves.clamp(1, 12);
        self.modulator_frequency = sane_frequency(self.modulator_frequency);
        self.min_frequency = sane_frequency(self.min_frequency);
        self.max_frequency = sane_frequency(self.max_frequency);
        if self.min_frequency > self.max_frequency {
            std::mem::swap(&mut self.min_frequency, &mut self.max_frequency);
        }
        self.decoration_frequency = sane_frequency(self.decoration_frequency);

        self.level_thresholds.truncate(TerrainLevel::COUNT);
        for t in &mut self.level_thresholds {
            *t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        }
        let total: f64 = self.level_thresholds.iter().sum();
        if total > 1.0 {
            for t in &mut self.level_thresholds {
                *t /= total;
            }
        }

        for rule in &mut self.decorations {
            rule.noise_threshold = clamp_unit(rule.noise_threshold);
            rule.chance = clamp_unit(rule.chance);
        }
    }
}

/// World-level simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk edge length in tiles
    pub chunk_size: u32,
    /// World units per tile
    pub tile_size: f32,
    /// Chunks within this distance of the viewer are active
    pub activity_radius: u32,
    /// Distance metric for the activity radius
    pub activity_metric: ActivityMetric,
    /// Length of one simulation tick in seconds
    pub fixed_timestep: f32,
    /// Maximum ticks run per `advance` call
    pub max_substeps: u32,
    /// Linear damping for physics-driven bodies (top-down friction)
    pub linear_damping: f32,
    /// Terrain generation parameters
    pub generator: GeneratorConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            tile_size: 1.0,
            activity_radius: DEFAULT_ACTIVITY_RADIUS,
            activity_metric: ActivityMetric::Chebyshev,
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 5,
            linear_damping: 4.0,
            generator: GeneratorConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.chunk_size = self.chunk_size.clamp(4, 256);
        self.tile_size = if self.tile_size.is_finite() {
            self.tile_size.clamp(0.01, 1024.0)
        } else {
            1.0
        };
        self.activity_radius = self.activity_radius.min(32);
        self.fixed_timestep = if self.fixed_timestep.is_finite() {
            self.fixed_timestep.clamp(1.0 / 480.0, 0.25)
        } else {
            1.0 / 60.0
        };
        self.max_substeps = self.max_substeps.clamp(1, 16);
        self.linear_damping = if self.linear_damping.is_finite() {
            self.linear_damping.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.generator.validate();
    }

    /// Returns a validated copy.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }
}

fn sane_frequency(f: f64) -> f64 {
    if f.is_finite() { f.clamp(1e-6, 10.0) } else { 0.01 }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorldConfig::default();
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.activity_radius, 2);
        let total: f64 = config.generator.level_thresholds.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_validation() {
        let mut config = WorldConfig {
            chunk_size: 1,
            tile_size: f32::NAN,
            activity_radius: 1000,
            max_substeps: 0,
            ..WorldConfig::default()
        };
        config.generator.octaves = 0;
        config.generator.min_frequency = 0.5;
        config.generator.max_frequency = 0.1;
        config.generator.level_thresholds = vec![2.0, 2.0];

        config.validate();

        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.tile_size, 1.0);
        assert_eq!(config.activity_radius, 32);
        assert_eq!(config.max_substeps, 1);
        assert_eq!(config.generator.octaves, 1);
        assert!(config.generator.min_frequency < config.generator.max_frequency);
        assert_eq!(config.generator.level_thresholds, vec![0.5, 0.5]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: WorldConfig = toml::from_str("chunk_size = 32\n[generator]\noctaves = 6\n")
            .expect("parse failed");
        assert_eq!(config.chunk_size, 32);
        assert_eq!(config.generator.octaves, 6);
        assert_eq!(config.activity_radius, DEFAULT_ACTIVITY_RADIUS);
        assert_eq!(config.generator.decorations.len(), 3);
    }
}
