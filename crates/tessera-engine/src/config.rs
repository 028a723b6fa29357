//! Engine configuration.
//!
//! Driver settings plus the embedded [`WorldConfig`]. Loaded from and saved
//! to TOML; missing or broken files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tessera_world::WorldConfig;
use tracing::{info, warn};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "tessera.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === World Settings ===
    /// World seed for new worlds (None = random). Stored in TOML as the
    /// same 64 bits read as a signed integer.
    #[serde(with = "seed_repr")]
    pub world_seed: Option<u64>,
    /// Where the world is loaded from and saved to
    pub save_path: PathBuf,

    // === Run Settings ===
    /// Frames to simulate per run
    pub frames: u32,
    /// Simulated frame length in seconds
    pub frame_dt: f32,
    /// Viewer walking speed in tiles per second
    pub viewer_speed: f32,
    /// Creatures spawned around the viewer in a new world
    pub creatures: u32,
    /// Save every this many frames (0 = only at exit)
    pub autosave_interval: u32,

    /// World simulation settings
    pub world: WorldConfig,
}

/// TOML integers are `i64`, so seeds round-trip through their bit pattern.
mod seed_repr {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(seed: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        seed.map(|s| s as i64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Ok(Option::<i64>::deserialize(deserializer)?.map(|s| s as u64))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_seed: None,
            save_path: PathBuf::from("saves/world.tsw"),

            frames: 600,
            frame_dt: 1.0 / 60.0,
            viewer_speed: 6.0,
            creatures: 8,
            autosave_interval: 0,

            world: WorldConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.frames = self.frames.min(1_000_000);
        self.frame_dt = if self.frame_dt.is_finite() {
            self.frame_dt.clamp(1.0 / 1000.0, 0.5)
        } else {
            1.0 / 60.0
        };
        self.viewer_speed = if self.viewer_speed.is_finite() {
            self.viewer_speed.clamp(0.0, 500.0)
        } else {
            0.0
        };
        self.creatures = self.creatures.min(10_000);
        self.world.validate();
    }
}
