//! LOD pipeline error types.

use relief_heightmap::HeightmapError;

/// Largest supported quadtree depth; node ids are 32-bit arena indices.
pub(crate) const MAX_SUPPORTED_DEPTH: u8 = 12;

/// Errors raised while building the terrain LOD pipeline.
///
/// All variants are fatal configuration errors reported before any
/// per-frame work begins.
#[derive(Debug, thiserror::Error)]
pub enum LodError {
    /// The height sample source failed to load or reduce.
    #[error(transparent)]
    Heightmap(#[from] HeightmapError),

    /// The configured resolution multiplier must be at least 1.
    #[error("resolution multiplier must be at least 1")]
    ZeroResolution,

    /// Eager precomputation materializes `4^depth` nodes; deeper trees are
    /// not representable.
    #[error("max depth {0} exceeds the supported maximum of {MAX_SUPPORTED_DEPTH}")]
    MaxDepthTooLarge(u8),
}
