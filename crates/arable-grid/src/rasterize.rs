//! Pixel grids and pixel-center rasterization.

use geo::{Contains, MultiPolygon, Point};
use ndarray::Array2;

use crate::cell::{BoundaryPolygon, Bounds};

/// A raster window: projected bounds discretized at a resolution.
///
/// Row 0 is the top of the window; pixel `(i, j)` is sampled at its
/// center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterGrid {
    pub bounds: Bounds,
    /// Linear ground size of one pixel.
    pub resolution: f64,
    pub rows: usize,
    pub cols: usize,
}

impl RasterGrid {
    /// Grid covering `bounds`, dimensions rounded to whole pixels.
    #[must_use]
    pub fn from_bounds(bounds: Bounds, resolution: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rows = (bounds.height() / resolution).round().max(0.0) as usize;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cols = (bounds.width() / resolution).round().max(0.0) as usize;
        Self {
            bounds,
            resolution,
            rows,
            cols,
        }
    }

    /// Fixed-size grid anchored at a top-left corner.
    ///
    /// Used when a uniform output size is configured: the window is
    /// `rows x cols` pixels regardless of the natural polygon extent.
    #[must_use]
    pub fn anchored(left: f64, top: f64, rows: usize, cols: usize, resolution: f64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let bounds = Bounds::new(
            left,
            top - resolution * rows as f64,
            left + resolution * cols as f64,
            top,
        );
        Self {
            bounds,
            resolution,
            rows,
            cols,
        }
    }

    /// X coordinate of the center of column `col`.
    #[must_use]
    pub fn x(&self, col: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let offset = (col as f64 + 0.5) * self.resolution;
        self.bounds.left + offset
    }

    /// Y coordinate of the center of row `row`.
    #[must_use]
    pub fn y(&self, row: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let offset = (row as f64 + 0.5) * self.resolution;
        self.bounds.top - offset
    }
}

/// Burn boundary classes into a class raster by pixel-center
/// containment.
///
/// Class 0 polygons are background and never burned. Polygons are
/// processed in input order, so a later polygon overwrites an earlier
/// one where they overlap.
#[must_use]
pub fn rasterize_classes(polygons: &[BoundaryPolygon], grid: &RasterGrid) -> Array2<u32> {
    let mut raster = Array2::zeros((grid.rows, grid.cols));
    for boundary in polygons {
        if boundary.class == 0 {
            continue;
        }
        burn(&mut raster, &boundary.geometry, boundary.class, grid);
    }
    raster
}

fn burn(raster: &mut Array2<u32>, geometry: &MultiPolygon<f64>, class: u32, grid: &RasterGrid) {
    // Restrict the scan to the polygon's own pixel window.
    let Some(bounds) = Bounds::of_multi_polygon(geometry) else {
        return;
    };
    let (row_range, col_range) = pixel_window(&bounds, grid);
    for i in row_range {
        for j in col_range.clone() {
            if geometry.contains(&Point::new(grid.x(j), grid.y(i))) {
                raster[[i, j]] = class;
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_window(
    bounds: &Bounds,
    grid: &RasterGrid,
) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    let row_min = ((grid.bounds.top - bounds.top) / grid.resolution).floor().max(0.0) as usize;
    let row_max = ((grid.bounds.top - bounds.bottom) / grid.resolution).ceil().max(0.0) as usize;
    let col_min = ((bounds.left - grid.bounds.left) / grid.resolution).floor().max(0.0) as usize;
    let col_max = ((bounds.right - grid.bounds.left) / grid.resolution).ceil().max(0.0) as usize;
    (
        row_min.min(grid.rows)..row_max.min(grid.rows),
        col_min.min(grid.cols)..col_max.min(grid.cols),
    )
}
