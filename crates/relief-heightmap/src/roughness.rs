//! Roughness reduction: per-block height range over a coarse grid.

use crate::{HeightSource, HeightmapError};

/// A coarse grid of per-cell height ranges (`max - min`) over a source.
///
/// One cell per quadtree node at the tree's maximum depth: `2^depth` cells
/// per edge, cell `(x, y)` covering the matching source block. Row 0 is the
/// north edge, like the source itself, so cell coordinates line up directly
/// with max-depth node grid coordinates.
#[derive(Clone, Debug)]
pub struct RoughnessGrid {
    cells: Vec<f32>,
    cells_per_edge: u32,
}

impl RoughnessGrid {
    /// Reduce `source` into a grid sized for quadtree depth `depth`.
    ///
    /// When the source width is not an exact multiple of the cell count,
    /// the trailing remainder rows/columns are not sampled.
    pub fn reduce(source: &dyn HeightSource, depth: u8) -> Result<Self, HeightmapError> {
        let cells_per_edge = 1u32 << depth;
        let width = source.width();
        if width < cells_per_edge {
            return Err(HeightmapError::TooCoarse {
                width,
                cells: cells_per_edge,
            });
        }

        let step = width / cells_per_edge;
        let mut cells = Vec::with_capacity((cells_per_edge * cells_per_edge) as usize);
        for y in 0..cells_per_edge {
            for x in 0..cells_per_edge {
                let mut min = f32::MAX;
                let mut max = f32::MIN;
                for sy in 0..step {
                    for sx in 0..step {
                        let h = source.sample(x * step + sx, y * step + sy);
                        min = min.min(h);
                        max = max.max(h);
                    }
                }
                cells.push(max - min);
            }
        }
        Ok(Self {
            cells,
            cells_per_edge,
        })
    }

    /// Cells per grid edge (`2^depth`).
    pub fn cells_per_edge(&self) -> u32 {
        self.cells_per_edge
    }

    /// Height range of cell `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.cells[(y * self.cells_per_edge + x) as usize]
    }
}
