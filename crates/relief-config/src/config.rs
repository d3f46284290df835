//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Terrain shape and sampling settings.
    pub terrain: TerrainConfig,
    /// Split/merge criteria settings.
    pub lod: LodConfig,
    /// Viewer projection settings.
    pub viewer: ViewerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Terrain shape and sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Terrain edge length in world units.
    pub terrain_size: f32,
    /// Vertical scaling applied to normalized height samples.
    pub height_multiplier: f32,
    /// Patch resolution multiplier; a patch has `8 * resolution_multiplier`
    /// vertices per edge.
    pub resolution_multiplier: u32,
    /// Path to a square grayscale heightmap image. When unset, a procedural
    /// fBm source seeded with `seed` is used instead.
    pub heightmap_path: Option<PathBuf>,
    /// Seed for the procedural height source.
    pub seed: u64,
}

/// Split/merge criteria configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Maximum quadtree depth.
    pub max_depth: u8,
    /// Enable the distance criterion.
    pub use_distance_metric: bool,
    /// Nodes closer than this distance render at full resolution.
    pub max_resolution_at: f32,
    /// Base of the per-depth breakpoint scaling.
    pub breakpoint_exponent: f32,
    /// Enable the bump/variance criterion.
    pub use_bump_metric: bool,
    /// Weight of the variance criterion.
    pub variance_scaler: f32,
    /// Enable the screen-space error criterion.
    pub use_error_metric: bool,
    /// Tolerated screen-space error in pixels.
    pub pixel_error_tolerance: f32,
}

/// Viewer projection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Output resolution height in pixels.
    pub screen_height_px: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Emit per-frame LOD statistics at info level.
    pub log_frame_stats: bool,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            terrain_size: 1024.0,
            height_multiplier: 10.0,
            resolution_multiplier: 4,
            heightmap_path: None,
            seed: 0,
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            use_distance_metric: true,
            max_resolution_at: 50.0,
            breakpoint_exponent: 2.0,
            use_bump_metric: true,
            variance_scaler: 0.1,
            use_error_metric: false,
            pixel_error_tolerance: 4.0,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            screen_height_px: 1080,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_frame_stats: false,
        }
    }
}

/// Default configuration directory (`~/.config/relief` on Linux).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("relief"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
