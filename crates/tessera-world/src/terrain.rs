//! Procedural terrain generation.
//!
//! Height is a fractal sum of seeded noise whose base frequency is itself
//! picked by a slow modulator layer, so flat plains and rugged patches
//! alternate across the world. The normalized height is then partitioned
//! into discrete [`TerrainLevel`]s.

use serde::{Deserialize, Serialize};
use tessera_common::TileCoord;
use tessera_gameplay::EntityRecord;

use crate::config::GeneratorConfig;
use crate::noise::{layer_seed, layers, NoiseField};

/// Discrete terrain classification of a tile, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TerrainLevel {
    /// Open water
    DeepWater = 0,
    /// Shallows
    Water = 1,
    /// Beach
    Sand = 2,
    /// Plains
    Grass = 3,
    /// Highlands
    Rock = 4,
}

impl TerrainLevel {
    /// Number of levels.
    pub const COUNT: usize = 5;

    /// All levels in ascending order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::DeepWater,
        Self::Water,
        Self::Sand,
        Self::Grass,
        Self::Rock,
    ];

    /// Level for a partition index; out-of-range indices clamp to the top.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::COUNT - 1)]
    }

    /// Whether the level is water of any depth.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::DeepWater | Self::Water)
    }
}

/// Maps `value` in `[0, 1]` to a bin index using cumulative fractions.
///
/// Returns the first `i` where `value < fractions[0] + ... + fractions[i]`.
/// Values at or past the last boundary (including exactly 1.0) land in the
/// last bin, as does NaN. Empty `fractions` yields 0.
#[must_use]
pub fn partition(value: f64, fractions: &[f64]) -> usize {
    let Some(last) = fractions.len().checked_sub(1) else {
        return 0;
    };
    let mut cumulative = 0.0;
    for (i, fraction) in fractions.iter().enumerate() {
        cumulative += fraction;
        if value < cumulative {
            return i;
        }
    }
    last
}

/// Maps `value` in `[0, 1]` into one of `bins` equal-width bins.
#[must_use]
pub fn partition_even(value: f64, bins: usize) -> usize {
    if bins == 0 {
        return 0;
    }
    let scaled = (value.clamp(0.0, 1.0) * bins as f64).floor();
    if scaled.is_finite() {
        (scaled as usize).min(bins - 1)
    } else {
        0
    }
}

/// Deterministic terrain generator for one world seed.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    seed: u64,
    config: GeneratorConfig,
    modulator: NoiseField,
    height: NoiseField,
    decoration: NoiseField,
}

impl TerrainGenerator {
    /// Creates a generator. `config` should already be validated.
    #[must_use]
    pub fn new(seed: u64, config: GeneratorConfig) -> Self {
        Self {
            seed,
            modulator: NoiseField::new(layer_seed(seed, layers::MODULATOR)),
            height: NoiseField::new(layer_seed(seed, layers::HEIGHT)),
            decoration: NoiseField::new(layer_seed(seed, layers::DECORATION)),
            config,
        }
    }

    /// Returns the world seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the generator configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Normalized height of a tile in `[0, 1]`. Pure in `(seed, tile)`.
    #[must_use]
    pub fn height_at(&self, tile: TileCoord) -> f64 {
        let x = f64::from(tile.x);
        let y = f64::from(tile.y);

        let m = self.config.modulator_frequency;
        let blend = self.modulator.sample_unit(x * m, y * m);
        let mut frequency =
            self.config.min_frequency + (self.config.max_frequency - self.config.min_frequency) * blend;

        let mut amplitude = 1.0;
        let mut total = 0.0;
        let mut weight = 0.0;
        for _ in 0..self.config.octaves.max(1) {
            total += amplitude * self.height.sample(x * frequency, y * frequency);
            weight += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        let normalized = if weight > 0.0 { total / weight } else { 0.0 };
        let unit = (normalized + 1.0) * 0.5;
        if unit.is_finite() { unit.clamp(0.0, 1.0) } else { 0.5 }
    }

    /// Terrain level of a tile.
    #[must_use]
    pub fn level_at(&self, tile: TileCoord) -> TerrainLevel {
        let height = self.height_at(tile);
        let index = if self.config.level_thresholds.is_empty() {
            partition_even(height, TerrainLevel::COUNT)
        } else {
            partition(height, &self.config.level_thresholds)
        };
        TerrainLevel::from_index(index)
    }

    /// Rolls decoration rules for a freshly generated tile.
    ///
    /// Rules for `level` are tried in order; the first one whose noise
    /// gate passes and whose chance roll succeeds places its entity at the
    /// tile center. Each gated rule consumes one draw from `rng`.
    pub fn roll_decoration(
        &self,
        tile: TileCoord,
        level: TerrainLevel,
        tile_size: f32,
        rng: &mut fastrand::Rng,
    ) -> Option<EntityRecord> {
        let f = self.config.decoration_frequency;
        let density = self
            .decoration
            .sample_unit(f64::from(tile.x) * f, f64::from(tile.y) * f);

        self.config
            .decorations
            .iter()
            .filter(|rule| rule.level == level && density >= rule.noise_threshold)
            .find(|rule| rng.f64() < rule.chance)
            .map(|rule| EntityRecord::decoration(tile.center(tile_size), rule.sprite, rule.harvestable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecorationRule;
    use proptest::prelude::*;

    #[test]
    fn test_partition_boundaries() {
        let fractions = [0.25, 0.25, 0.5];
        assert_eq!(partition(0.0, &fractions), 0);
        assert_eq!(partition(0.2499, &fractions), 0);
        assert_eq!(partition(0.25, &fractions), 1);
        assert_eq!(partition(0.75, &fractions), 2);
        assert_eq!(partition(1.0, &fractions), 2);
        assert_eq!(partition(f64::NAN, &fractions), 2);
        assert_eq!(partition(0.5, &[]), 0);
    }

    #[test]
    fn test_partition_short_fractions() {
        // Fractions summing below 1 give the remainder to the last bin.
        assert_eq!(partition(0.9, &[0.3, 0.3]), 1);
    }

    #[test]
    fn test_partition_even() {
        assert_eq!(partition_even(0.0, 5), 0);
        assert_eq!(partition_even(0.19, 5), 0);
        assert_eq!(partition_even(0.2, 5), 1);
        assert_eq!(partition_even(1.0, 5), 4);
        assert_eq!(partition_even(0.5, 0), 0);
    }

    #[test]
    fn test_level_from_index_clamps() {
        assert_eq!(TerrainLevel::from_index(0), TerrainLevel::DeepWater);
        assert_eq!(TerrainLevel::from_index(99), TerrainLevel::Rock);
        assert!(TerrainLevel::Water.is_water());
        assert!(!TerrainLevel::Sand.is_water());
    }

    #[test]
    fn test_generator_deterministic() {
        let a = TerrainGenerator::new(42, GeneratorConfig::default());
        let b = TerrainGenerator::new(42, GeneratorConfig::default());
        for i in -20..20 {
            let tile = TileCoord::new(i * 7, -i * 3);
            assert_eq!(a.height_at(tile), b.height_at(tile));
            assert_eq!(a.level_at(tile), b.level_at(tile));
        }
    }

    #[test]
    fn test_seeds_differ() {
        let a = TerrainGenerator::new(1, GeneratorConfig::default());
        let b = TerrainGenerator::new(2, GeneratorConfig::default());
        let differs = (0..64).any(|i| {
            let tile = TileCoord::new(i * 5 + 1, i * 3 + 2);
            a.height_at(tile) != b.height_at(tile)
        });
        assert!(differs);
    }

    #[test]
    fn test_decoration_respects_level_and_chance() {
        let config = GeneratorConfig {
            decorations: vec![DecorationRule {
                level: TerrainLevel::Grass,
                noise_threshold: 0.0,
                chance: 1.0,
                sprite: 7,
                harvestable: true,
            }],
            ..GeneratorConfig::default()
        };
        let generator = TerrainGenerator::new(5, config);
        let mut rng = fastrand::Rng::with_seed(1);
        let tile = TileCoord::new(3, 4);

        let placed = generator
            .roll_decoration(tile, TerrainLevel::Grass, 2.0, &mut rng)
            .expect("certain rule should place");
        assert_eq!(placed.sprite(), 7);
        assert_eq!(placed.position(), tile.center(2.0));

        assert!(generator
            .roll_decoration(tile, TerrainLevel::Water, 2.0, &mut rng)
            .is_none());
    }

    #[test]
    fn test_decoration_zero_chance_never_places() {
        let config = GeneratorConfig {
            decorations: vec![DecorationRule {
                level: TerrainLevel::Rock,
                noise_threshold: 0.0,
                chance: 0.0,
                sprite: 1,
                harvestable: false,
            }],
            ..GeneratorConfig::default()
        };
        let generator = TerrainGenerator::new(5, config);
        let mut rng = fastrand::Rng::with_seed(3);
        for i in 0..50 {
            let tile = TileCoord::new(i, i);
            assert!(generator
                .roll_decoration(tile, TerrainLevel::Rock, 1.0, &mut rng)
                .is_none());
        }
    }

    proptest! {
        #[test]
        fn prop_height_in_unit_range(seed in any::<u64>(), x in -100_000i32..100_000, y in -100_000i32..100_000) {
            let generator = TerrainGenerator::new(seed, GeneratorConfig::default());
            let h = generator.height_at(TileCoord::new(x, y));
            prop_assert!((0.0..=1.0).contains(&h));
        }

        #[test]
        fn prop_height_is_pure(seed in any::<u64>(), x in -100_000i32..100_000, y in -100_000i32..100_000) {
            let tile = TileCoord::new(x, y);
            let generator = TerrainGenerator::new(seed, GeneratorConfig::default());
            let rebuilt = TerrainGenerator::new(seed, GeneratorConfig::default());
            let h = generator.height_at(tile);
            prop_assert_eq!(h, generator.height_at(tile));
            prop_assert_eq!(h, rebuilt.height_at(tile));
            prop_assert_eq!(generator.level_at(tile), rebuilt.level_at(tile));
        }

        #[test]
        fn prop_partition_in_bounds(value in -1.0f64..2.0) {
            let fractions = GeneratorConfig::default().level_thresholds;
            prop_assert!(partition(value, &fractions) < fractions.len());
            prop_assert!(partition_even(value, 7) < 7);
        }

        #[test]
        fn prop_partition_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let fractions = [0.1, 0.2, 0.3, 0.4];
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(partition(lo, &fractions) <= partition(hi, &fractions));
        }
    }
}
