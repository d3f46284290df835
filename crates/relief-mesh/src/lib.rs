//! Patch mesh generation for terrain quadtree nodes.

mod patch;

pub use patch::{
    CpuPatchBuilder, PATCH_BASE_VERTS, PatchBuildError, PatchBuilder, PatchMesh, PatchRect,
    PatchVertex,
};
