//! Boundary clipping with a one-shot topology-repair protocol.
//!
//! `clip_boundaries` refuses invalid geometry instead of producing
//! garbage intersections. Callers respond to [`TopologyError`] by
//! calling [`repair`] once and re-clipping; a second failure is fatal
//! for the run.

use geo::orient::Direction;
use geo::{Area, BooleanOps, LineString, MultiPolygon, Orient, Polygon, RemoveRepeatedPoints, Validation};

use crate::cell::{BoundaryLayer, BoundaryPolygon};

/// Invalid boundary topology encountered during clipping.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("boundary polygon {index} (class {class}) has invalid topology")]
    InvalidGeometry { index: usize, class: u32 },
}

/// Clip every boundary polygon to `target`, keeping nonempty pieces.
///
/// Pieces that intersect to zero area are dropped; classes pass
/// through untouched (renumbering happens later, per cell).
///
/// # Errors
///
/// [`TopologyError::InvalidGeometry`] for the first boundary polygon
/// that fails validity, before any intersection is attempted on it.
pub fn clip_boundaries(
    layer: &BoundaryLayer,
    target: &MultiPolygon<f64>,
) -> Result<Vec<BoundaryPolygon>, TopologyError> {
    let mut clipped = Vec::new();
    for (index, boundary) in layer.polygons.iter().enumerate() {
        if !boundary.geometry.is_valid() {
            return Err(TopologyError::InvalidGeometry {
                index,
                class: boundary.class,
            });
        }
        let piece = boundary.geometry.intersection(target);
        if piece.0.is_empty() || piece.unsigned_area() <= 0.0 {
            continue;
        }
        clipped.push(BoundaryPolygon {
            class: boundary.class,
            geometry: piece,
        });
    }
    Ok(clipped)
}

/// Repair the boundary layer in place.
///
/// Collapses consecutive repeated coordinates, drops degenerate rings
/// (fewer than four coordinates once closed), drops polygons whose
/// exterior degenerates entirely, and re-orients ring winding. The
/// repaired layer is what every subsequent cell clips against.
pub fn repair(layer: &mut BoundaryLayer) {
    for boundary in &mut layer.polygons {
        let polygons = boundary
            .geometry
            .0
            .iter()
            .filter_map(repair_polygon)
            .collect::<Vec<_>>();
        boundary.geometry = MultiPolygon::new(polygons).orient(Direction::Default);
    }
    layer.polygons.retain(|b| !b.geometry.0.is_empty());
}

fn repair_polygon(polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
    let exterior = repair_ring(polygon.exterior())?;
    let interiors = polygon
        .interiors()
        .iter()
        .filter_map(repair_ring)
        .collect::<Vec<_>>();
    Some(Polygon::new(exterior, interiors))
}

/// A closed ring needs at least 4 coordinates; anything thinner after
/// deduplication is dropped.
fn repair_ring(ring: &LineString<f64>) -> Option<LineString<f64>> {
    let mut cleaned = ring.remove_repeated_points();
    cleaned.close();
    (cleaned.0.len() >= 4).then_some(cleaned)
}
