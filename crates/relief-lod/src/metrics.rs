//! One-time metric precomputation: the variance and screen-space error
//! passes.
//!
//! Both passes run once after root creation, eagerly materializing the tree
//! to their target depths as a side effect of walking there. That
//! pre-provisioning amortizes tree-structure cost against later per-frame
//! traversal: the decision engine only ever toggles selection on nodes that
//! already exist and already carry their metrics.

use glam::Vec2;
use relief_heightmap::{HeightSource, RoughnessGrid};
use relief_quadtree::{NodeId, QuadTree, Quadrant};

use crate::decision::{SplitParams, subdivide_node};

/// Inputs shared by both precomputation passes.
#[derive(Clone, Copy, Debug)]
pub struct MetricParams {
    /// Maximum tree depth; the variance pass materializes the tree this far.
    pub max_depth: u8,
    /// Vertical scaling applied to normalized height samples.
    pub height_multiplier: f32,
    /// Boer screen-space error constant.
    pub boer_constant: f32,
    /// Vertices per patch edge (`resolution_multiplier * PATCH_BASE_VERTS`).
    pub verts_per_patch_edge: u32,
}

/// Variance pass: subdivide to max depth and assign each node a bump
/// variance, propagating child maxima back up the tree.
///
/// Leaves at max depth read their height range from the roughness grid at
/// their grid coordinate and scale it into screen-space units; every
/// internal node then takes the maximum of its 4 children, so variance
/// never increases toward the root.
pub fn variance_split(
    tree: &mut QuadTree,
    grid: &RoughnessGrid,
    metric: &MetricParams,
    split: &SplitParams,
) {
    variance_recurse(tree, NodeId::ROOT, (0, 0), grid, metric, split);
}

fn variance_recurse(
    tree: &mut QuadTree,
    id: NodeId,
    coord: (u32, u32),
    grid: &RoughnessGrid,
    metric: &MetricParams,
    split: &SplitParams,
) {
    if tree.node(id).depth == metric.max_depth {
        let scaled = grid.get(coord.0, coord.1) * metric.height_multiplier * metric.boer_constant
            / metric.verts_per_patch_edge as f32;
        let metrics = &mut tree.node_mut(id).metrics;
        metrics.grid_coord = coord;
        metrics.variance = scaled;
        return;
    }

    if tree.node(id).is_leaf() {
        subdivide_node(tree, id, split);
    }
    let children = tree.node(id).children().expect("just subdivided");

    let mut max = 0.0_f32;
    for quadrant in Quadrant::ALL {
        let child = children[quadrant as usize];
        variance_recurse(tree, child, quadrant.child_grid_coord(coord), grid, metric, split);
        max = max.max(tree.node(child).metrics.variance);
    }
    tree.node_mut(id).metrics.variance = max;
}

/// Error-metric pass: subdivide to `max_depth - 1` and assign each node the
/// maximum midpoint interpolation error over its sampled vertex grid,
/// scaled into screen-space units.
///
/// For every grid cell the pass compares the heightmap value at the
/// half-step position against the linear interpolation of its two
/// straddling full-step neighbors, along the south edge, the diagonal, and
/// the east edge; terms whose far neighbor falls outside the patch grid are
/// skipped. After recursion an internal node's final value is the maximum
/// of its own raw error and its children's, so a parent is never less
/// conservative than any child.
pub fn error_metric_split(
    tree: &mut QuadTree,
    source: &dyn HeightSource,
    metric: &MetricParams,
    split: &SplitParams,
) {
    let step = source.width() as f32 / metric.verts_per_patch_edge as f32;
    error_recurse(tree, NodeId::ROOT, Vec2::ZERO, step, source, metric, split);
}

fn error_recurse(
    tree: &mut QuadTree,
    id: NodeId,
    pos: Vec2,
    step: f32,
    source: &dyn HeightSource,
    metric: &MetricParams,
    split: &SplitParams,
) {
    let verts = metric.verts_per_patch_edge;
    let half_step = step * 0.5;
    let mut max_error = 0.0_f32;

    for y in 0..verts {
        for x in 0..verts {
            let v0 = pos + Vec2::new(x as f32 * step, y as f32 * step);
            let h0 = sample(source, v0);

            // south edge
            if y + 1 < verts {
                let far = sample(source, v0 + Vec2::new(0.0, step));
                let actual = sample(source, v0 + Vec2::new(0.0, half_step));
                max_error = max_error.max((actual - (h0 + far) * 0.5).abs());
            }
            // diagonal
            if x + 1 < verts && y + 1 < verts {
                let far = sample(source, v0 + Vec2::new(step, step));
                let actual = sample(source, v0 + Vec2::new(half_step, half_step));
                max_error = max_error.max((actual - (h0 + far) * 0.5).abs());
            }
            // east edge
            if x + 1 < verts {
                let far = sample(source, v0 + Vec2::new(step, 0.0));
                let actual = sample(source, v0 + Vec2::new(half_step, 0.0));
                max_error = max_error.max((actual - (h0 + far) * 0.5).abs());
            }
        }
    }

    tree.node_mut(id).metrics.error_metric =
        max_error * metric.height_multiplier * metric.boer_constant;

    if tree.node(id).depth + 1 < metric.max_depth {
        if tree.node(id).is_leaf() {
            subdivide_node(tree, id, split);
        }
        let children = tree.node(id).children().expect("just subdivided");

        let child_step = step * 0.5;
        // the subdivision halves the step, so a child spans half the pixels
        let half_span = child_step * verts as f32;
        let offsets = [
            Vec2::ZERO,
            Vec2::new(half_span, 0.0),
            Vec2::new(0.0, half_span),
            Vec2::new(half_span, half_span),
        ];

        let mut child_max = 0.0_f32;
        for (quadrant, offset) in Quadrant::ALL.into_iter().zip(offsets) {
            let child = children[quadrant as usize];
            error_recurse(tree, child, pos + offset, child_step, source, metric, split);
            child_max = child_max.max(tree.node(child).metrics.error_metric);
        }
        let metrics = &mut tree.node_mut(id).metrics;
        metrics.error_metric = metrics.error_metric.max(child_max);
    }
}

fn sample(source: &dyn HeightSource, position: Vec2) -> f32 {
    source.sample_clamped(position.x.round() as i64, position.y.round() as i64)
}
