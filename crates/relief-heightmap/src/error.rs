//! Heightmap error types.

/// Errors raised while loading or reducing a height sample source.
///
/// All of these are fatal configuration errors: precomputation cannot
/// proceed without a usable source, so they surface before any tree work.
#[derive(Debug, thiserror::Error)]
pub enum HeightmapError {
    /// Failed to read the heightmap file from disk.
    #[error("failed to read heightmap: {0}")]
    Read(#[source] std::io::Error),

    /// Failed to decode the image data.
    #[error("failed to decode heightmap: {0}")]
    Decode(#[source] image::ImageError),

    /// Height sources must be square.
    #[error("heightmap must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },

    /// The source has fewer samples per edge than the roughness grid cells.
    #[error("heightmap width {width} is below the {cells} roughness cells per edge")]
    TooCoarse { width: u32, cells: u32 },
}
