//! Arena-backed quadtree over a square terrain region.

mod quadtree;

pub use quadtree::{Node, NodeId, NodeMetrics, QuadTree, Quadrant};
