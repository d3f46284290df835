//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Relief command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "relief", about = "Adaptive quadtree terrain LOD")]
pub struct CliArgs {
    /// Maximum quadtree depth.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Terrain edge length in world units.
    #[arg(long)]
    pub terrain_size: Option<f32>,

    /// Path to a square grayscale heightmap (PNG).
    #[arg(long)]
    pub heightmap: Option<PathBuf>,

    /// Patch resolution multiplier.
    #[arg(long)]
    pub resolution_multiplier: Option<u32>,

    /// Seed for the procedural height source.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of frames the demo runs.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(depth) = args.max_depth {
            self.lod.max_depth = depth;
        }
        if let Some(size) = args.terrain_size {
            self.terrain.terrain_size = size;
        }
        if let Some(ref path) = args.heightmap {
            self.terrain.heightmap_path = Some(path.clone());
        }
        if let Some(multiplier) = args.resolution_multiplier {
            self.terrain.resolution_multiplier = multiplier;
        }
        if let Some(seed) = args.seed {
            self.terrain.seed = seed;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
