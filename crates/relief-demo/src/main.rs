//! Headless demo: flies a camera over the terrain and reports LOD activity.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags. Run with `cargo run -p relief-demo` for a procedural terrain, or
//! `cargo run -p relief-demo -- --heightmap maps/alps.png` for a file-backed
//! one.

use clap::Parser;
use glam::Vec3;
use relief_config::{CliArgs, Config, default_config_dir};
use relief_heightmap::{FbmHeightmap, FbmParams, HeightSource, ImageHeightmap};
use relief_lod::{TerrainLod, Viewer};
use relief_mesh::PATCH_BASE_VERTS;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(&args);

    relief_log::init_logging(None, cfg!(debug_assertions), Some(&config));

    let frames = args.frames.unwrap_or(240);
    match &config.terrain.heightmap_path {
        Some(path) => {
            info!(path = %path.display(), "loading heightmap");
            let source = ImageHeightmap::load(path)?;
            fly_over(&config, source, frames)?;
        }
        None => {
            // size the procedural map so every max-depth patch has a full
            // set of unique samples
            let width =
                (1u32 << config.lod.max_depth) * config.terrain.resolution_multiplier.max(1)
                    * PATCH_BASE_VERTS;
            info!(width, seed = config.terrain.seed, "generating procedural heightmap");
            let source = FbmHeightmap::new(
                width,
                FbmParams {
                    seed: config.terrain.seed,
                    ..Default::default()
                },
            );
            fly_over(&config, source, frames)?;
        }
    }
    Ok(())
}

/// Descend from high above one corner toward the far corner, updating the
/// LOD every frame and logging the transition counters.
fn fly_over<S: HeightSource>(
    config: &Config,
    source: S,
    frames: u64,
) -> Result<(), relief_lod::LodError> {
    let start = camera_at(config, 0.0);
    let mut terrain = TerrainLod::new(config, source, &start)?;

    let mut built_total = 0;
    for frame in 0..frames {
        let t = frame as f32 / frames.max(2) as f32;
        let viewer = camera_at(config, t);
        let stats = terrain.update(&viewer);
        built_total += stats.meshes_built;

        if config.debug.log_frame_stats {
            info!(
                frame,
                active = stats.active_nodes,
                visible = stats.visible_meshes,
                built = stats.meshes_built,
                nodes = stats.tree_nodes,
                "frame"
            );
        }
    }

    info!(
        frames,
        built_total,
        pooled = terrain.cache().len(),
        pooled_bytes = terrain.cache().byte_size(),
        tree_nodes = terrain.tree().len(),
        "fly-over complete"
    );
    Ok(())
}

/// Camera position along the fly-over path at `t` in `[0, 1]`.
fn camera_at(config: &Config, t: f32) -> Viewer {
    let half = config.terrain.terrain_size * 0.5;
    let position = Vec3::new(
        -half + t * config.terrain.terrain_size,
        600.0 - t * 560.0,
        half - t * config.terrain.terrain_size,
    );
    Viewer::new(
        position,
        config.viewer.fov_y_degrees,
        config.viewer.screen_height_px,
    )
}
