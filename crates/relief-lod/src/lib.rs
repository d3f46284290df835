//! View-dependent terrain LOD: metric precomputation over a quadtree,
//! per-frame split/merge decisions, and the patch mesh pool.
//!
//! The per-frame entry point is [`TerrainLod`]; the pieces it wires together
//! ([`LodEngine`], [`MeshCache`], the precomputation passes) are exposed for
//! callers that need finer control.

mod decision;
mod error;
mod mesh_cache;
mod metrics;
mod terrain;
mod viewer;

pub use decision::{LodEngine, SplitParams};
pub use error::LodError;
pub use mesh_cache::MeshCache;
pub use metrics::{MetricParams, error_metric_split, variance_split};
pub use terrain::{FrameStats, TerrainLod};
pub use viewer::Viewer;
