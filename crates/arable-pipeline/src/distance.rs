//! Per-segment normalized boundary distance fields.
//!
//! Every field pixel gets its Euclidean distance to the nearest
//! non-field pixel, scaled to ground units, then normalized within its
//! own connected segment so the deepest interior pixel reads 1.0. The
//! normalization is per segment: a small field's center peaks at 1.0
//! just like a large one's.

use ndarray::Array2;

use crate::raster::{distance_to_background, label_components, region_descriptors};
use crate::types::PipelineError;

/// Distance assigned to segments too thin to normalize: a bounding box
/// of height or width <= 1 pixel has no meaningful interior maximum,
/// so a small fixed depth sidesteps division noise.
const SLIVER_DISTANCE: f32 = 0.1;

/// Build the normalized boundary-distance field for a crop mask.
///
/// `crop_mask` is binary (1 = crop pixel). When the boundary source
/// geometry is not polygonal the annotations trace boundaries rather
/// than fill fields, so the complement of the mask is measured instead
/// (`polygon_geometry = false`).
///
/// `resolution` is the linear ground size of one pixel; distances are
/// scaled by it before normalization.
///
/// The result is clipped to `[0, 1]`; NaN or infinite ratios from
/// degenerate maxima collapse to 1.0 (fully interior).
///
/// # Errors
///
/// [`PipelineError::ArrayTooLarge`] when a dimension exceeds `u32`.
pub fn normalize_boundary_distances(
    crop_mask: &Array2<u8>,
    polygon_geometry: bool,
    resolution: f64,
) -> Result<Array2<f32>, PipelineError> {
    let mask = if polygon_geometry {
        crop_mask.mapv(|v| u8::from(v != 0))
    } else {
        crop_mask.mapv(|v| u8::from(v == 0))
    };

    let segments = label_components(&mask)?;
    #[allow(clippy::cast_possible_truncation)]
    let scale = resolution as f32;
    let mut distance = distance_to_background(&mask)?.mapv(|d| d * scale);

    // Normalize each segment by its own interior maximum.
    for descriptor in region_descriptors(&segments, &distance) {
        let bbox = descriptor.bbox;
        for i in bbox.min_row..bbox.max_row {
            for j in bbox.min_col..bbox.max_col {
                if segments[[i, j]] != descriptor.label {
                    continue;
                }
                distance[[i, j]] = if bbox.is_sliver() {
                    SLIVER_DISTANCE
                } else {
                    distance[[i, j]] / descriptor.max_intensity
                };
            }
        }
    }

    // Degenerate divisions (0/0, inf/inf) read as fully interior.
    Ok(distance.mapv(|d| {
        if d.is_finite() {
            d.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }))
}
