//! Patch building: a displaced vertex grid over a node's world rectangle.

use glam::{Vec2, Vec3};
use relief_heightmap::HeightSource;

/// Vertices per patch edge at resolution multiplier 1.
///
/// The GPU dispatch this interface mirrors ran 8x8 thread groups, so every
/// patch resolution is a multiple of 8.
pub const PATCH_BASE_VERTS: u32 = 8;

/// A single patch vertex, laid out for direct GPU upload.
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct PatchVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Surface normal.
    pub normal: [f32; 3],
    /// Texture coordinates over the patch, `[0, 1]` on both axes.
    pub uv: [f32; 2],
}

/// Geometry buffers for one terrain patch.
#[derive(Clone, Debug)]
pub struct PatchMesh {
    /// Vertex buffer.
    pub vertices: Vec<PatchVertex>,
    /// Index buffer, 3 indices per triangle.
    pub indices: Vec<u32>,
}

impl PatchMesh {
    /// Number of triangles in the index buffer.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Approximate size of the vertex and index buffers in bytes.
    pub fn byte_size(&self) -> usize {
        self.vertices.len() * std::mem::size_of::<PatchVertex>()
            + self.indices.len() * std::mem::size_of::<u32>()
    }
}

/// World-space corners of a node's square region on the y = 0 plane.
///
/// "Top" is the north (+z) edge.
#[derive(Clone, Copy, Debug)]
pub struct PatchRect {
    pub top_left: Vec3,
    pub top_right: Vec3,
    pub bottom_left: Vec3,
    pub bottom_right: Vec3,
}

impl PatchRect {
    /// Rectangle for a node given its center (x, z) and edge length.
    pub fn from_center_size(center: Vec2, size: f32) -> Self {
        let half = size * 0.5;
        Self {
            top_left: Vec3::new(center.x - half, 0.0, center.y + half),
            top_right: Vec3::new(center.x + half, 0.0, center.y + half),
            bottom_left: Vec3::new(center.x - half, 0.0, center.y - half),
            bottom_right: Vec3::new(center.x + half, 0.0, center.y - half),
        }
    }
}

/// Errors from patch geometry generation.
#[derive(Debug, thiserror::Error)]
pub enum PatchBuildError {
    /// A resolution multiplier of zero produces no geometry.
    #[error("resolution multiplier must be at least 1")]
    ZeroResolution,
}

/// Builds patch geometry for a node's world rectangle.
///
/// Whether generation runs on the CPU or a GPU is an implementation detail
/// behind this interface; implementations must be pure functions of their
/// inputs.
pub trait PatchBuilder {
    /// Generate buffers for a `(resolution_multiplier * PATCH_BASE_VERTS)^2`
    /// vertex grid covering `rect`, triangulated as two triangles per cell.
    fn build(
        &self,
        rect: &PatchRect,
        resolution_multiplier: u32,
    ) -> Result<PatchMesh, PatchBuildError>;
}

/// CPU patch builder sampling a height source bilinearly.
pub struct CpuPatchBuilder<S> {
    source: S,
    terrain_size: f32,
    height_multiplier: f32,
}

impl<S: HeightSource> CpuPatchBuilder<S> {
    /// Build patches over `source`, which covers a `terrain_size` square
    /// centered on the origin, with heights scaled by `height_multiplier`.
    ///
    /// # Panics
    ///
    /// Panics if the source has fewer than 2 samples per edge.
    pub fn new(source: S, terrain_size: f32, height_multiplier: f32) -> Self {
        assert!(
            source.width() >= 2,
            "height source needs at least 2 samples per edge"
        );
        Self {
            source,
            terrain_size,
            height_multiplier,
        }
    }

    /// The wrapped height source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Map a world-plane position to fractional sample coordinates.
    fn to_sample_coords(&self, x: f32, z: f32) -> (f32, f32) {
        let scale = (self.source.width() - 1) as f32 / self.terrain_size;
        let half = self.terrain_size * 0.5;
        // +z is north; sample row 0 is the north edge
        ((x + half) * scale, (half - z) * scale)
    }

    /// Displaced height at a world-plane position.
    fn height_at(&self, x: f32, z: f32) -> f32 {
        let (sx, sy) = self.to_sample_coords(x, z);
        self.source.sample_bilinear(sx, sy) * self.height_multiplier
    }

    /// Central-difference normal, stepping one source sample in world units.
    fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let step = self.terrain_size / (self.source.width() - 1) as f32;
        let dx = self.height_at(x + step, z) - self.height_at(x - step, z);
        let dz = self.height_at(x, z + step) - self.height_at(x, z - step);
        Vec3::new(-dx / (2.0 * step), 1.0, -dz / (2.0 * step)).normalize()
    }
}

impl<S: HeightSource> PatchBuilder for CpuPatchBuilder<S> {
    fn build(
        &self,
        rect: &PatchRect,
        resolution_multiplier: u32,
    ) -> Result<PatchMesh, PatchBuildError> {
        if resolution_multiplier == 0 {
            return Err(PatchBuildError::ZeroResolution);
        }
        let resolution = resolution_multiplier * PATCH_BASE_VERTS;
        let last = (resolution - 1) as f32;

        let mut vertices = Vec::with_capacity((resolution * resolution) as usize);
        for row in 0..resolution {
            let v = row as f32 / last;
            let left = rect.top_left.lerp(rect.bottom_left, v);
            let right = rect.top_right.lerp(rect.bottom_right, v);
            for col in 0..resolution {
                let u = col as f32 / last;
                let p = left.lerp(right, u);
                vertices.push(PatchVertex {
                    position: [p.x, self.height_at(p.x, p.z), p.z],
                    normal: self.normal_at(p.x, p.z).to_array(),
                    uv: [u, v],
                });
            }
        }

        let mut indices = Vec::with_capacity(((resolution - 1) * (resolution - 1) * 6) as usize);
        for row in 0..resolution - 1 {
            for col in 0..resolution - 1 {
                let a = row * resolution + col;
                let b = a + 1;
                let c = a + resolution;
                let d = c + 1;
                // counter-clockwise seen from above (+y)
                indices.extend_from_slice(&[a, b, c, b, d, c]);
            }
        }

        Ok(PatchMesh { vertices, indices })
    }
}
