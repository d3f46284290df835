//! Quadtree node store: arena of nodes addressed by index, growing root-down.

use glam::Vec2;

/// Stable index of a node within a [`QuadTree`] arena.
///
/// Node identity is the index; nodes are never removed, so an id stays
/// valid for the lifetime of the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Quadrant index encoding: bit 1 selects the south half, bit 0 the east half.
///
/// Children are ordered NW = 0, NE = 1, SW = 2, SE = 3. North is +z on the
/// world plane and row 0 of the heightmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthWest = 2,
    SouthEast = 3,
}

impl Quadrant {
    /// All quadrants in child order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::SouthEast,
    ];

    fn east(self) -> bool {
        (self as usize) & 1 != 0
    }

    fn south(self) -> bool {
        (self as usize) & 2 != 0
    }

    /// Child center offset from the parent center, in multiples of the
    /// parent size.
    fn offset(self) -> Vec2 {
        Vec2::new(
            if self.east() { 0.25 } else { -0.25 },
            if self.south() { -0.25 } else { 0.25 },
        )
    }

    /// Map a parent grid coordinate to this quadrant's child coordinate.
    ///
    /// Each subdivision doubles the grid resolution: `(x, y)` maps to
    /// `(2x, 2y)`, `(2x+1, 2y)`, `(2x, 2y+1)`, `(2x+1, 2y+1)` for
    /// NW, NE, SW, SE. Grid y grows southward, like heightmap rows.
    pub fn child_grid_coord(self, coord: (u32, u32)) -> (u32, u32) {
        let (x, y) = coord;
        (2 * x + self.east() as u32, 2 * y + self.south() as u32)
    }
}

/// Per-node LOD metric payload.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeMetrics {
    /// Distance threshold for the split decision, set once at node creation.
    pub breakpoint: f32,
    /// Roughness score derived from the local heightmap height range.
    pub variance: f32,
    /// Projected screen-space interpolation error.
    pub error_metric: f32,
    /// Position in the roughness grid; meaningful only at max depth.
    pub grid_coord: (u32, u32),
}

/// A square region of the terrain.
#[derive(Clone, Debug)]
pub struct Node {
    /// Center of the region in world-plane coordinates (x, z).
    pub center: Vec2,
    /// Edge length of the region.
    pub size: f32,
    /// 0 at the root, +1 per subdivision level.
    pub depth: u8,
    /// Non-owning back-reference; `None` at the root.
    pub parent: Option<NodeId>,
    children: Option<[NodeId; 4]>,
    /// Attached metric payload.
    pub metrics: NodeMetrics,
}

impl Node {
    /// A node is a leaf iff it has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The node's 4 children, if it has been subdivided.
    pub fn children(&self) -> Option<[NodeId; 4]> {
        self.children
    }
}

/// The spatial quadtree. Owns all nodes; parent links are plain indices.
///
/// The root always exists and is never destroyed. There is no structural
/// merge or delete: once subdivided, a node keeps its children for the
/// lifetime of the tree, trading memory for never re-subdividing or
/// recomputing metrics. "Merging" is a rendering-visibility decision made
/// elsewhere.
#[derive(Clone, Debug)]
pub struct QuadTree {
    nodes: Vec<Node>,
}

impl QuadTree {
    /// Create a tree whose root covers a square of `size` centered at
    /// `center`.
    pub fn new(center: Vec2, size: f32) -> Self {
        Self {
            nodes: vec![Node {
                center,
                size,
                depth: 0,
                parent: None,
                children: None,
                metrics: NodeMetrics::default(),
            }],
        }
    }

    /// Shared access to a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Total number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction on.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All node ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Split a leaf into 4 children of half its size, one per quadrant
    /// center, at `depth + 1`. Returns the children in NW, NE, SW, SE order.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a leaf. Callers must check
    /// [`Node::is_leaf`] first; subdividing a branch is a programming error,
    /// not a recoverable condition.
    pub fn subdivide(&mut self, id: NodeId) -> [NodeId; 4] {
        let node = self.node(id);
        assert!(node.is_leaf(), "cannot subdivide a non-leaf node");
        let (center, size, depth) = (node.center, node.size, node.depth);

        let base = self.nodes.len() as u32;
        let children = [
            NodeId(base),
            NodeId(base + 1),
            NodeId(base + 2),
            NodeId(base + 3),
        ];
        for quadrant in Quadrant::ALL {
            self.nodes.push(Node {
                center: center + quadrant.offset() * size,
                size: size * 0.5,
                depth: depth + 1,
                parent: Some(id),
                children: None,
                metrics: NodeMetrics::default(),
            });
        }
        self.nodes[id.index()].children = Some(children);
        children
    }

    /// True if `ancestor` lies on `id`'s path to the root.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tree() -> QuadTree {
        QuadTree::new(Vec2::ZERO, 1024.0)
    }

    #[test]
    fn test_root_is_leaf_at_depth_0() {
        let tree = test_tree();
        let root = tree.node(NodeId::ROOT);
        assert!(root.is_leaf());
        assert_eq!(root.depth, 0);
        assert_eq!(root.parent, None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_subdivide_produces_4_half_size_children() {
        let mut tree = test_tree();
        let children = tree.subdivide(NodeId::ROOT);

        assert!(!tree.node(NodeId::ROOT).is_leaf());
        for child in children {
            let node = tree.node(child);
            assert!(node.is_leaf());
            assert_eq!(node.size, 512.0);
            assert_eq!(node.depth, 1);
            assert_eq!(node.parent, Some(NodeId::ROOT));
        }
    }

    #[test]
    fn test_quadrant_centers() {
        let mut tree = test_tree();
        let children = tree.subdivide(NodeId::ROOT);

        // bit 0 = east half, bit 1 = south half; north is +z (Vec2.y)
        assert_eq!(
            tree.node(children[Quadrant::NorthWest as usize]).center,
            Vec2::new(-256.0, 256.0)
        );
        assert_eq!(
            tree.node(children[Quadrant::NorthEast as usize]).center,
            Vec2::new(256.0, 256.0)
        );
        assert_eq!(
            tree.node(children[Quadrant::SouthWest as usize]).center,
            Vec2::new(-256.0, -256.0)
        );
        assert_eq!(
            tree.node(children[Quadrant::SouthEast as usize]).center,
            Vec2::new(256.0, -256.0)
        );
    }

    #[test]
    fn test_children_tile_parent_exactly() {
        let mut tree = QuadTree::new(Vec2::new(100.0, -50.0), 64.0);
        let parent = tree.node(NodeId::ROOT).clone();
        let parent_min = parent.center - Vec2::splat(parent.size * 0.5);
        let parent_max = parent.center + Vec2::splat(parent.size * 0.5);
        let children = tree.subdivide(NodeId::ROOT);

        let mut min = Vec2::MAX;
        let mut max = Vec2::MIN;
        let mut area = 0.0;
        for child in children {
            let node = tree.node(child);
            min = min.min(node.center - Vec2::splat(node.size * 0.5));
            max = max.max(node.center + Vec2::splat(node.size * 0.5));
            area += node.size * node.size;
        }
        // union bounds match the parent and summed area equals the parent's,
        // so the 4 squares tile with no gap or overlap
        assert!((min - parent_min).abs().max_element() < 1e-4);
        assert!((max - parent_max).abs().max_element() < 1e-4);
        assert!((area - parent.size * parent.size).abs() < 1e-2);
    }

    #[test]
    #[should_panic(expected = "non-leaf")]
    fn test_subdivide_branch_panics() {
        let mut tree = test_tree();
        tree.subdivide(NodeId::ROOT);
        tree.subdivide(NodeId::ROOT);
    }

    #[test]
    fn test_grid_coord_doubling() {
        // subdividing grid cell (3, 5) yields (6,5), (7,5), (6,6), (7,6)
        assert_eq!(Quadrant::NorthWest.child_grid_coord((3, 5)), (6, 5));
        assert_eq!(Quadrant::NorthEast.child_grid_coord((3, 5)), (7, 5));
        assert_eq!(Quadrant::SouthWest.child_grid_coord((3, 5)), (6, 6));
        assert_eq!(Quadrant::SouthEast.child_grid_coord((3, 5)), (7, 6));
    }

    #[test]
    fn test_is_ancestor() {
        let mut tree = test_tree();
        let children = tree.subdivide(NodeId::ROOT);
        let grandchildren = tree.subdivide(children[0]);

        assert!(tree.is_ancestor(NodeId::ROOT, children[0]));
        assert!(tree.is_ancestor(NodeId::ROOT, grandchildren[3]));
        assert!(tree.is_ancestor(children[0], grandchildren[2]));
        assert!(!tree.is_ancestor(children[1], grandchildren[2]));
        assert!(!tree.is_ancestor(children[0], NodeId::ROOT));
        assert!(!tree.is_ancestor(NodeId::ROOT, NodeId::ROOT));
    }

    #[test]
    fn test_deep_subdivision_depth_tracking() {
        let mut tree = test_tree();
        let mut id = NodeId::ROOT;
        for expected_depth in 1..=5u8 {
            id = tree.subdivide(id)[0];
            assert_eq!(tree.node(id).depth, expected_depth);
        }
        assert_eq!(tree.len(), 1 + 5 * 4);
    }
}
