//! Command-line argument parsing for Strata.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "strata", about = "Strata voxel terrain")]
pub struct CliArgs {
    /// Visible radius in chunks.
    #[arg(long)]
    pub radius: Option<u32>,

    /// Procedural terrain seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Chunks generated per tick while streaming.
    #[arg(long)]
    pub chunks_per_tick: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of ticks the demo runs for.
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,

    /// Observer speed in world units per tick.
    #[arg(long, default_value_t = 0.5)]
    pub speed: f32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(radius) = args.radius {
            self.terrain.visible_chunks_radius = radius;
        }
        if let Some(seed) = args.seed {
            self.terrain.seed = seed;
        }
        if let Some(budget) = args.chunks_per_tick {
            self.streaming.chunks_per_tick = budget;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
