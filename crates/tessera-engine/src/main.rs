//! # Tessera Engine
//!
//! Headless driver for the Tessera tile world. Loads configuration, opens
//! or creates a world save, walks a viewer across the world for a number
//! of frames, and saves the result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod driver;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};
use crate::driver::Driver;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "tessera", version, about = "Headless driver for the Tessera tile world")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// World save file (overrides the config)
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Frames to simulate (overrides the config)
    #[arg(short, long)]
    ticks: Option<u32>,

    /// Seed for a new world (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    write_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "tessera=debug" } else { "tessera=info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    info!("Tessera starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::load_from(&cli.config);
    if let Some(save) = cli.save {
        config.save_path = save;
    }
    if let Some(frames) = cli.ticks {
        config.frames = frames;
    }
    if let Some(seed) = cli.seed {
        config.world_seed = Some(seed);
    }
    config.validate();

    if cli.write_config {
        config
            .save_to(&cli.config)
            .with_context(|| format!("Failed to write config to {}", cli.config.display()))?;
    }

    let fresh = !config.save_path.exists();
    let frames = config.frames;
    let mut driver = Driver::open(config)?;
    if fresh {
        driver.populate();
    }

    let summary = driver.run(frames)?;
    driver.save()?;

    println!(
        "seed={} frames={} ticks={} chunks={} entities={} transfers={} deaths={} viewer=({:.1}, {:.1})",
        driver.world().seed(),
        summary.frames,
        summary.stats.ticks,
        summary.chunks,
        summary.entities,
        summary.stats.transfers,
        summary.stats.deaths,
        summary.viewer.x,
        summary.viewer.y,
    );

    info!("Tessera shutdown complete");
    Ok(())
}
