//! Per-frame split/merge decisions over the active node set.
//!
//! Each frame the engine walks the nodes selected last frame and, for each
//! one, either splits into its 4 children, merges back into its parent, or
//! keeps it as-is. The outcome is the next active set: the nodes to render
//! this frame. The tree itself only ever grows; merging is purely a
//! selection change.

use glam::Vec3;
use relief_config::LodConfig;
use relief_quadtree::{NodeId, QuadTree};
use rustc_hash::FxHashSet;

/// Split criteria configuration, fixed at startup.
#[derive(Clone, Copy, Debug)]
pub struct SplitParams {
    /// Maximum quadtree depth.
    pub max_depth: u8,
    /// Enable the distance criterion.
    pub use_distance_metric: bool,
    /// Nodes closer than this render at full resolution.
    pub max_resolution_at: f32,
    /// Base of the per-depth breakpoint scaling.
    pub breakpoint_exponent: f32,
    /// Enable the bump/variance criterion.
    pub use_bump_metric: bool,
    /// Weight of the variance criterion.
    pub variance_scaler: f32,
    /// Enable the screen-space error criterion.
    pub use_error_metric: bool,
}

impl SplitParams {
    /// Distance threshold for a node at `depth`, assigned once at node
    /// creation: `max_resolution_at * exponent^(max_depth - depth)`.
    pub fn breakpoint_for_depth(&self, depth: u8) -> f32 {
        self.max_resolution_at
            * self
                .breakpoint_exponent
                .powi(i32::from(self.max_depth - depth))
    }
}

impl From<&LodConfig> for SplitParams {
    fn from(config: &LodConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            use_distance_metric: config.use_distance_metric,
            max_resolution_at: config.max_resolution_at,
            breakpoint_exponent: config.breakpoint_exponent,
            use_bump_metric: config.use_bump_metric,
            variance_scaler: config.variance_scaler,
            use_error_metric: config.use_error_metric,
        }
    }
}

/// Subdivide a leaf and stamp the children's breakpoints, mirroring
/// node-data generation at creation time.
pub(crate) fn subdivide_node(
    tree: &mut QuadTree,
    id: NodeId,
    params: &SplitParams,
) -> [NodeId; 4] {
    let children = tree.subdivide(id);
    for child in children {
        let depth = tree.node(child).depth;
        tree.node_mut(child).metrics.breakpoint = params.breakpoint_for_depth(depth);
    }
    children
}

/// Walks the active set each frame, splitting and merging nodes against the
/// camera to produce the next active set.
pub struct LodEngine {
    params: SplitParams,
    active: FxHashSet<NodeId>,
}

impl LodEngine {
    /// Engine with the root as the initial active set. Stamps the root's
    /// breakpoint; every other node is stamped when it is created.
    pub fn new(tree: &mut QuadTree, params: SplitParams) -> Self {
        tree.node_mut(NodeId::ROOT).metrics.breakpoint = params.breakpoint_for_depth(0);
        let mut active = FxHashSet::default();
        active.insert(NodeId::ROOT);
        Self { params, active }
    }

    /// The nodes selected for rendering by the last update.
    pub fn active(&self) -> &FxHashSet<NodeId> {
        &self.active
    }

    pub fn params(&self) -> &SplitParams {
        &self.params
    }

    /// True if any enabled criterion wants more detail under this node.
    ///
    /// The criteria are OR-ed: any single signal of "needs more detail" is
    /// sufficient. All compare `distance - size` against a threshold, so a
    /// large node starts splitting while the camera is still outside it.
    pub fn can_split(&self, tree: &QuadTree, id: NodeId, camera: Vec3) -> bool {
        let node = tree.node(id);
        let distance = camera.distance(Vec3::new(node.center.x, 0.0, node.center.y));
        let slack = distance - node.size;

        if self.params.use_distance_metric && slack < node.metrics.breakpoint {
            return true;
        }
        if self.params.use_bump_metric {
            // the 2^depth term relaxes the threshold for already-fine nodes
            let depth_coefficient = 1.0 / 2.0_f32.powi(i32::from(node.depth));
            if slack < node.metrics.variance * self.params.variance_scaler * depth_coefficient {
                return true;
            }
        }
        if self.params.use_error_metric && slack < node.metrics.error_metric {
            return true;
        }
        false
    }

    /// Run one decision pass against `camera`, replacing the active set.
    ///
    /// Leaves below max depth are subdivided as they are visited: branching
    /// the tree is independent of visibility, so a later frame can split
    /// into children that already exist. The returned set never contains a
    /// node together with one of its ancestors, and is never empty.
    pub fn update(&mut self, tree: &mut QuadTree, camera: Vec3) -> &FxHashSet<NodeId> {
        let current: Vec<NodeId> = self.active.iter().copied().collect();
        let mut next =
            FxHashSet::with_capacity_and_hasher(current.len(), rustc_hash::FxBuildHasher);

        for &id in &current {
            let node = tree.node(id);
            if node.is_leaf() && node.depth < self.params.max_depth {
                subdivide_node(tree, id, &self.params);
            }

            let node = tree.node(id);
            if !node.is_leaf() && self.can_split(tree, id, camera) {
                Self::select_split(tree, id, &mut next);
            } else if let Some(parent) = node.parent
                && !self.can_split(tree, parent, camera)
                && self.try_merge(tree, parent, &mut next)
            {
                // merged into the parent; siblings fold into the same entry
            } else {
                Self::select(tree, id, &mut next);
            }
        }

        self.active = next;
        &self.active
    }

    /// Split transition: select the node's 4 children.
    fn select_split(tree: &QuadTree, id: NodeId, next: &mut FxHashSet<NodeId>) {
        if Self::covered(tree, id, next) {
            // an ancestor merged over this region earlier in the pass
            return;
        }
        let children = tree
            .node(id)
            .children()
            .expect("split requires a subdivided node");
        for child in children {
            next.insert(child);
        }
    }

    /// Merge transition: select `parent` in place of its 4 children.
    ///
    /// A merge is strictly a 4-into-1 transition: it requires all of the
    /// parent's children to be active this frame and refuses when a sibling
    /// already split, so the selection can never cover a finer selection
    /// made earlier in the pass.
    fn try_merge(&self, tree: &QuadTree, parent: NodeId, next: &mut FxHashSet<NodeId>) -> bool {
        let Some(children) = tree.node(parent).children() else {
            return false;
        };
        if !children.iter().all(|child| self.active.contains(child)) {
            return false;
        }
        let sibling_split = children.iter().any(|child| {
            tree.node(*child)
                .children()
                .is_some_and(|grandchildren| grandchildren.iter().any(|g| next.contains(g)))
        });
        if sibling_split {
            return false;
        }
        if !next.contains(&parent) && !Self::covered(tree, parent, next) {
            next.insert(parent);
        }
        true
    }

    /// Render-as-is: keep the node selected. Steady state for most nodes.
    fn select(tree: &QuadTree, id: NodeId, next: &mut FxHashSet<NodeId>) {
        if !Self::covered(tree, id, next) {
            next.insert(id);
        }
    }

    /// True when an ancestor of `id` was already selected this frame.
    fn covered(tree: &QuadTree, id: NodeId, next: &FxHashSet<NodeId>) -> bool {
        let mut current = tree.node(id).parent;
        while let Some(parent) = current {
            if next.contains(&parent) {
                return true;
            }
            current = tree.node(parent).parent;
        }
        false
    }
}
