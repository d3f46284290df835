//! Terrain LOD facade wiring the tree, metric passes, decision engine, and
//! mesh pool together.

use glam::Vec2;
use relief_config::Config;
use relief_heightmap::{HeightSource, RoughnessGrid};
use relief_mesh::{CpuPatchBuilder, PATCH_BASE_VERTS};
use relief_quadtree::{NodeId, QuadTree};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::decision::{LodEngine, SplitParams};
use crate::error::{LodError, MAX_SUPPORTED_DEPTH};
use crate::mesh_cache::MeshCache;
use crate::metrics::{MetricParams, error_metric_split, variance_split};
use crate::viewer::Viewer;

/// Per-frame counters reported by [`TerrainLod::update`].
#[derive(Clone, Copy, Debug)]
pub struct FrameStats {
    /// Nodes selected for rendering this frame.
    pub active_nodes: usize,
    /// Meshes currently visible (equals `active_nodes` unless a build failed).
    pub visible_meshes: usize,
    /// Meshes built this frame (cache misses).
    pub meshes_built: usize,
    /// Total nodes in the tree.
    pub tree_nodes: usize,
}

/// The complete terrain LOD pipeline.
///
/// Construction runs the one-time precomputation; [`TerrainLod::update`]
/// then runs one synchronous decision-plus-cache pass per frame. The whole
/// pass completes before rendering consumes the active set; nothing here
/// suspends or blocks indefinitely.
pub struct TerrainLod<S> {
    tree: QuadTree,
    engine: LodEngine,
    cache: MeshCache,
    builder: CpuPatchBuilder<S>,
}

impl<S: HeightSource> TerrainLod<S> {
    /// Build the tree, reduce roughness, and run the enabled precomputation
    /// passes. Fails fast on a malformed source or configuration; nothing
    /// is mutated on error.
    pub fn new(config: &Config, source: S, viewer: &Viewer) -> Result<Self, LodError> {
        let lod = &config.lod;
        let terrain = &config.terrain;
        if lod.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(LodError::MaxDepthTooLarge(lod.max_depth));
        }
        if terrain.resolution_multiplier == 0 {
            return Err(LodError::ZeroResolution);
        }

        let nodes_per_edge = 1u32 << lod.max_depth;
        let verts_per_patch_edge = terrain.resolution_multiplier * PATCH_BASE_VERTS;
        info!(
            max_depth = lod.max_depth,
            resolution_multiplier = terrain.resolution_multiplier,
            nodes_per_edge,
            verts_per_patch_edge,
            max_heightmap_size = nodes_per_edge * verts_per_patch_edge,
            "initializing terrain quadtree"
        );

        let boer_constant = viewer.boer_constant(lod.pixel_error_tolerance);
        info!(
            boer_constant,
            pixel_error = lod.pixel_error_tolerance,
            "screen-space error scaling"
        );

        let mut tree = QuadTree::new(Vec2::ZERO, terrain.terrain_size);
        let split = SplitParams::from(lod);
        let engine = LodEngine::new(&mut tree, split);
        let metric = MetricParams {
            max_depth: lod.max_depth,
            height_multiplier: terrain.height_multiplier,
            boer_constant,
            verts_per_patch_edge,
        };

        if lod.use_bump_metric {
            let grid = RoughnessGrid::reduce(&source, lod.max_depth)?;
            variance_split(&mut tree, &grid, &metric, &split);
            info!(nodes = tree.len(), "variance pass complete");
        }
        if lod.use_error_metric {
            error_metric_split(&mut tree, &source, &metric, &split);
            info!(nodes = tree.len(), "error-metric pass complete");
        }

        let builder =
            CpuPatchBuilder::new(source, terrain.terrain_size, terrain.height_multiplier);
        let cache = MeshCache::new(terrain.resolution_multiplier);

        Ok(Self {
            tree,
            engine,
            cache,
            builder,
        })
    }

    /// One frame: decide the active set for `viewer`, then reconcile the
    /// mesh pool against it.
    pub fn update(&mut self, viewer: &Viewer) -> FrameStats {
        let active = self.engine.update(&mut self.tree, viewer.position);
        let meshes_built = self.cache.sync(&self.tree, active, &self.builder);
        let stats = FrameStats {
            active_nodes: active.len(),
            visible_meshes: self.cache.visible_count(),
            meshes_built,
            tree_nodes: self.tree.len(),
        };
        debug!(
            active = stats.active_nodes,
            built = stats.meshes_built,
            nodes = stats.tree_nodes,
            "lod update"
        );
        stats
    }

    /// The quadtree, read-only.
    pub fn tree(&self) -> &QuadTree {
        &self.tree
    }

    /// The nodes selected by the last update.
    pub fn active(&self) -> &FxHashSet<NodeId> {
        self.engine.active()
    }

    /// The mesh pool, read-only.
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use relief_heightmap::{FbmHeightmap, FbmParams, ImageHeightmap};

    fn test_config() -> Config {
        let mut config = Config::default();
        config.lod.max_depth = 3;
        config.terrain.resolution_multiplier = 1;
        config
    }

    fn test_source(seed: u64) -> FbmHeightmap {
        FbmHeightmap::new(
            256,
            FbmParams {
                seed,
                ..Default::default()
            },
        )
    }

    fn viewer_at(position: Vec3) -> Viewer {
        Viewer::new(position, 60.0, 1080)
    }

    #[test]
    fn test_zero_resolution_multiplier_is_fatal() {
        let mut config = test_config();
        config.terrain.resolution_multiplier = 0;
        let result = TerrainLod::new(&config, test_source(0), &viewer_at(Vec3::ZERO));
        assert!(matches!(result, Err(LodError::ZeroResolution)));
    }

    #[test]
    fn test_excessive_max_depth_is_fatal() {
        let mut config = test_config();
        config.lod.max_depth = 13;
        let result = TerrainLod::new(&config, test_source(0), &viewer_at(Vec3::ZERO));
        assert!(matches!(result, Err(LodError::MaxDepthTooLarge(13))));
    }

    #[test]
    fn test_too_coarse_source_is_fatal() {
        let mut config = test_config();
        config.lod.max_depth = 4;
        let source = ImageHeightmap::from_samples(vec![0.5; 8 * 8], 8);
        let result = TerrainLod::new(&config, source, &viewer_at(Vec3::ZERO));
        assert!(matches!(result, Err(LodError::Heightmap(_))));
    }

    #[test]
    fn test_precomputation_materializes_tree() {
        let config = test_config();
        let terrain = TerrainLod::new(&config, test_source(3), &viewer_at(Vec3::ZERO)).unwrap();
        // variance pass is on by default: full tree to depth 3
        assert_eq!(terrain.tree().len(), 1 + 4 + 16 + 64);
    }

    #[test]
    fn test_visibility_matches_active_set_every_frame() {
        let config = test_config();
        let mut terrain =
            TerrainLod::new(&config, test_source(5), &viewer_at(Vec3::ZERO)).unwrap();

        for frame in 0..40 {
            let t = frame as f32 / 39.0;
            let viewer = viewer_at(Vec3::new(-512.0 + t * 1024.0, 500.0 - t * 480.0, 0.0));
            let stats = terrain.update(&viewer);

            assert!(stats.active_nodes > 0);
            assert_eq!(stats.visible_meshes, stats.active_nodes);
            for id in terrain.tree().ids() {
                assert_eq!(
                    terrain.cache().is_visible(id),
                    terrain.active().contains(&id),
                    "visibility invariant broken at frame {frame}"
                );
            }
        }
    }

    #[test]
    fn test_approach_then_retreat_reuses_pooled_meshes() {
        let config = test_config();
        let mut terrain =
            TerrainLod::new(&config, test_source(9), &viewer_at(Vec3::ZERO)).unwrap();

        let far = viewer_at(Vec3::new(0.0, 60_000.0, 0.0));
        let near = viewer_at(Vec3::new(0.0, 20.0, 0.0));

        terrain.update(&far);
        assert_eq!(terrain.active().len(), 1);

        // approach until the set stabilizes
        let mut last = 0;
        for _ in 0..6 {
            last = terrain.update(&near).active_nodes;
        }
        assert!(last > 1, "near camera should split the terrain");
        let pooled = terrain.cache().len();

        // retreat: the set shrinks back, nothing new is built
        let mut built = 0;
        for _ in 0..6 {
            let stats = terrain.update(&far);
            built += stats.meshes_built;
        }
        assert_eq!(terrain.active().len(), 1);
        assert_eq!(built, 0, "merging must reuse pooled meshes");
        assert_eq!(terrain.cache().len(), pooled);
    }
}
