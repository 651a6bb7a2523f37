//! Spatial index over grid-cell bounds.
//!
//! Backs the multi-tile bookkeeping: given the bounding box of a
//! clipped boundary set, find every grid cell it touches.

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

use crate::cell::{Bounds, GridCell};

type IndexedRect = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R-tree over cell bounding boxes, keyed by cell position in the
/// run's input order.
#[derive(Debug)]
pub struct CellIndex {
    tree: RTree<IndexedRect>,
}

impl CellIndex {
    #[must_use]
    pub fn new(cells: &[GridCell]) -> Self {
        let rects = cells
            .iter()
            .enumerate()
            .map(|(position, cell)| {
                let b = cell.bounds;
                GeomWithData::new(
                    Rectangle::from_corners([b.left, b.bottom], [b.right, b.top]),
                    position,
                )
            })
            .collect();
        Self {
            tree: RTree::bulk_load(rects),
        }
    }

    /// Positions of all cells whose bounds intersect `bounds`, in
    /// ascending input order.
    #[must_use]
    pub fn intersecting(&self, bounds: &Bounds) -> Vec<usize> {
        let envelope = AABB::from_corners([bounds.left, bounds.bottom], [bounds.right, bounds.top]);
        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|rect| rect.data)
            .collect();
        positions.sort_unstable();
        positions
    }
}
