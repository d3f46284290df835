//! Node-keyed mesh pool: hide on release, destroy only on explicit evict.

use relief_mesh::{PatchBuilder, PatchMesh, PatchRect};
use relief_quadtree::{NodeId, QuadTree};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

struct CacheEntry {
    mesh: PatchMesh,
    visible: bool,
}

/// Maps nodes to previously built patch geometry.
///
/// Geometry survives deselection: split/merge oscillation near a threshold
/// boundary toggles visibility instead of rebuilding, which is what keeps
/// those flicker-prone transitions cheap. Entries are destroyed only by
/// [`MeshCache::evict`].
pub struct MeshCache {
    entries: FxHashMap<NodeId, CacheEntry>,
    resolution_multiplier: u32,
}

impl MeshCache {
    pub fn new(resolution_multiplier: u32) -> Self {
        Self {
            entries: FxHashMap::default(),
            resolution_multiplier,
        }
    }

    /// Make `id`'s mesh visible, building it on first use.
    ///
    /// A builder failure is not an error path for the frame loop: the node
    /// simply has no geometry this frame, and the next acquire retries.
    pub fn acquire(&mut self, tree: &QuadTree, id: NodeId, builder: &dyn PatchBuilder) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.visible = true;
            return;
        }
        let node = tree.node(id);
        let rect = PatchRect::from_center_size(node.center, node.size);
        match builder.build(&rect, self.resolution_multiplier) {
            Ok(mesh) => {
                self.entries.insert(
                    id,
                    CacheEntry {
                        mesh,
                        visible: true,
                    },
                );
            }
            Err(error) => {
                warn!(?id, %error, "patch build failed; node has no geometry this frame");
            }
        }
    }

    /// Hide `id`'s mesh without destroying it.
    pub fn release(&mut self, id: NodeId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.visible = false;
        }
    }

    /// Destroy `id`'s cached geometry entirely.
    pub fn evict(&mut self, id: NodeId) {
        self.entries.remove(&id);
    }

    /// Reconcile visibility with the active set: acquire every member,
    /// release every visible non-member. Returns how many meshes were built.
    ///
    /// After this returns, a node's mesh is visible iff the node is in
    /// `active`.
    pub fn sync(
        &mut self,
        tree: &QuadTree,
        active: &FxHashSet<NodeId>,
        builder: &dyn PatchBuilder,
    ) -> usize {
        for (id, entry) in self.entries.iter_mut() {
            if entry.visible && !active.contains(id) {
                entry.visible = false;
            }
        }
        let before = self.entries.len();
        for &id in active {
            self.acquire(tree, id, builder);
        }
        self.entries.len() - before
    }

    /// The cached mesh for `id`, whether visible or hidden.
    pub fn mesh(&self, id: NodeId) -> Option<&PatchMesh> {
        self.entries.get(&id).map(|entry| &entry.mesh)
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.visible)
    }

    /// Currently visible meshes, in no particular order.
    pub fn visible(&self) -> impl Iterator<Item = (NodeId, &PatchMesh)> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.visible)
            .map(|(id, entry)| (*id, &entry.mesh))
    }

    pub fn visible_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.visible).count()
    }

    /// Number of pooled entries, visible or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held by pooled geometry.
    pub fn byte_size(&self) -> usize {
        self.entries.values().map(|entry| entry.mesh.byte_size()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use relief_heightmap::ImageHeightmap;
    use relief_mesh::{CpuPatchBuilder, PatchBuildError};

    struct FailingBuilder;

    impl PatchBuilder for FailingBuilder {
        fn build(
            &self,
            _rect: &PatchRect,
            _resolution_multiplier: u32,
        ) -> Result<PatchMesh, PatchBuildError> {
            Err(PatchBuildError::ZeroResolution)
        }
    }

    fn test_builder() -> CpuPatchBuilder<ImageHeightmap> {
        let source = ImageHeightmap::from_samples(vec![0.5; 16 * 16], 16);
        CpuPatchBuilder::new(source, 1024.0, 10.0)
    }

    #[test]
    fn test_acquire_builds_once_then_toggles() {
        let tree = QuadTree::new(Vec2::ZERO, 1024.0);
        let builder = test_builder();
        let mut cache = MeshCache::new(1);

        cache.acquire(&tree, NodeId::ROOT, &builder);
        assert!(cache.is_visible(NodeId::ROOT));
        assert_eq!(cache.len(), 1);

        cache.release(NodeId::ROOT);
        assert!(!cache.is_visible(NodeId::ROOT));
        assert_eq!(cache.len(), 1, "release hides, never destroys");

        cache.acquire(&tree, NodeId::ROOT, &builder);
        assert!(cache.is_visible(NodeId::ROOT));
        assert_eq!(cache.len(), 1, "re-acquire reuses the pooled mesh");
    }

    #[test]
    fn test_evict_destroys_the_entry() {
        let tree = QuadTree::new(Vec2::ZERO, 1024.0);
        let builder = test_builder();
        let mut cache = MeshCache::new(1);

        cache.acquire(&tree, NodeId::ROOT, &builder);
        cache.evict(NodeId::ROOT);
        assert!(cache.is_empty());
        assert!(cache.mesh(NodeId::ROOT).is_none());
    }

    #[test]
    fn test_sync_matches_visibility_to_active_set() {
        let mut tree = QuadTree::new(Vec2::ZERO, 1024.0);
        let children = tree.subdivide(NodeId::ROOT);
        let builder = test_builder();
        let mut cache = MeshCache::new(1);

        let mut active = FxHashSet::default();
        active.insert(NodeId::ROOT);
        let built = cache.sync(&tree, &active, &builder);
        assert_eq!(built, 1);
        assert!(cache.is_visible(NodeId::ROOT));

        // root splits: children become active, root goes hidden but pooled
        active.clear();
        active.extend(children);
        let built = cache.sync(&tree, &active, &builder);
        assert_eq!(built, 4);
        assert!(!cache.is_visible(NodeId::ROOT));
        for child in children {
            assert!(cache.is_visible(child));
        }
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.visible_count(), 4);

        // merge back: only the root visible, nothing rebuilt
        active.clear();
        active.insert(NodeId::ROOT);
        let built = cache.sync(&tree, &active, &builder);
        assert_eq!(built, 0);
        assert_eq!(cache.visible_count(), 1);
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_builder_failure_leaves_node_without_geometry() {
        let tree = QuadTree::new(Vec2::ZERO, 1024.0);
        let mut cache = MeshCache::new(1);

        cache.acquire(&tree, NodeId::ROOT, &FailingBuilder);
        assert!(cache.is_empty());
        assert!(!cache.is_visible(NodeId::ROOT));
    }

    #[test]
    fn test_byte_size_sums_pooled_meshes() {
        let mut tree = QuadTree::new(Vec2::ZERO, 1024.0);
        let children = tree.subdivide(NodeId::ROOT);
        let builder = test_builder();
        let mut cache = MeshCache::new(1);

        cache.acquire(&tree, NodeId::ROOT, &builder);
        let one = cache.byte_size();
        cache.acquire(&tree, children[0], &builder);
        cache.release(children[0]);
        assert_eq!(cache.byte_size(), 2 * one, "hidden meshes still count");
    }
}
