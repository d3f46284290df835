//! Height sample sources and roughness reduction for terrain LOD.
//!
//! A [`HeightSource`] is a square grid of normalized height samples; the
//! [`RoughnessGrid`] compresses one into per-block height ranges, one cell
//! per quadtree node at the tree's maximum depth.

mod error;
mod roughness;
mod source;

pub use error::HeightmapError;
pub use roughness::RoughnessGrid;
pub use source::{FbmHeightmap, FbmParams, HeightSource, ImageHeightmap};
