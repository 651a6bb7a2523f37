//! Grid cells and boundary annotations.
//!
//! Both are supplied by an external loader in an already-compatible
//! CRS. Cells are iterated in input order; boundary polygons carry a
//! class attribute where `0` means background and any nonzero value a
//! field.

use geo::{BoundingRect, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

/// Axis-aligned projected bounds, `left <= right`, `bottom <= top`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Smallest bounds containing both inputs.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            left: self.left.min(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
        }
    }

    /// `[left, bottom, right, top]`, the order used in metadata.
    #[must_use]
    pub const fn to_array(&self) -> [f64; 4] {
        [self.left, self.bottom, self.right, self.top]
    }

    /// Bounding box of a polygon; `None` for empty geometry.
    #[must_use]
    pub fn of_polygon(polygon: &Polygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Some(Self::new(
            rect.min().x,
            rect.min().y,
            rect.max().x,
            rect.max().y,
        ))
    }

    /// Bounding box of a multipolygon; `None` when it has no rings.
    #[must_use]
    pub fn of_multi_polygon(geometry: &MultiPolygon<f64>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        Some(Self::new(
            rect.min().x,
            rect.min().y,
            rect.max().x,
            rect.max().y,
        ))
    }
}

/// One spatial tile over which a training sample is generated.
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Identifier within the run's group, used in the sample identity.
    pub id: String,
    pub geometry: Polygon<f64>,
    /// Projected bounds, computed once at construction.
    pub bounds: Bounds,
    /// Geographic (lon/lat) bounds from the loader, when available.
    pub geo_bounds: Option<[f64; 4]>,
}

impl GridCell {
    /// `None` when the geometry has no extent.
    #[must_use]
    pub fn new(id: String, geometry: Polygon<f64>, geo_bounds: Option<[f64; 4]>) -> Option<Self> {
        let bounds = Bounds::of_polygon(&geometry)?;
        Some(Self {
            id,
            geometry,
            bounds,
            geo_bounds,
        })
    }
}

/// One field annotation: geometry plus its class attribute.
#[derive(Debug, Clone)]
pub struct BoundaryPolygon {
    /// `0` = background, nonzero = field (renumbered per cell later).
    pub class: u32,
    pub geometry: MultiPolygon<f64>,
}

/// The run's full boundary annotation set.
///
/// Mutated in place on topology repair; the repaired set is what every
/// subsequent grid cell clips against.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    pub polygons: Vec<BoundaryPolygon>,
    /// `true` when annotations are filled field polygons, `false` when
    /// they trace boundaries (drives distance-mask complementing).
    pub polygon_geometry: bool,
}
