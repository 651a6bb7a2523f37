//! Field-edge detection: binary field mask to 3-class label array.
//!
//! Turns a rasterized field mask (pixel value = field id, 0 elsewhere)
//! into labels in `{0 = background, 1 = crop, 2 = edge}`:
//!
//! 1. Focal comparison scores every field pixel by neighborhood
//!    agreement; a heterogeneous neighborhood marks a likely boundary.
//! 2. Candidate boundary pixels are thinned to a 1-pixel skeleton
//!    (with a replicated 1-pixel border so thinning does not truncate
//!    skeletons that touch the image edge).
//! 3. Field pixels become crop, skeleton pixels become edge, and two
//!    cleanup passes remove thinning spill-over and tiny fragments.

use ndarray::{Array2, s};

use crate::focal::{FocalStat, focal_compare, focal_stat};
use crate::thin::thin;
use crate::types::{BACKGROUND, CROP, EDGE};

/// Thinning iteration cap for boundary skeletons.
const THIN_ITERATIONS: usize = 2;

/// Pad a binary mask by one pixel on every side, replicating edges.
fn pad_edge1(mask: &Array2<u8>) -> Array2<u8> {
    let (rows, cols) = mask.dim();
    Array2::from_shape_fn((rows + 2, cols + 2), |(i, j)| {
        let r = i.saturating_sub(1).min(rows - 1);
        let c = j.saturating_sub(1).min(cols - 1);
        mask[[r, c]]
    })
}

/// Label a rasterized field mask into background / crop / edge.
///
/// `field_mask` holds per-field ids (touching fields must carry
/// distinct ids so their shared boundary registers as heterogeneous);
/// 0 is background. Returns the 3-class label array.
#[must_use = "returns the 3-class label array"]
pub fn detect_edges(field_mask: &Array2<u32>) -> Array2<u8> {
    let (rows, cols) = field_mask.dim();
    if rows == 0 || cols == 0 {
        return Array2::zeros((rows, cols));
    }

    // 1. Neighborhood agreement per field pixel; background scores 0.
    let scores = focal_compare(field_mask);

    // 2. Boundary candidates: field pixels with a mixed neighborhood.
    let candidates = scores.mapv(|s| u8::from(s > 0 && s < 8));

    // 3. Thin to a skeleton, padding first so border candidates keep
    //    their full neighborhood.
    let padded = pad_edge1(&candidates);
    let thinned = thin(&padded, THIN_ITERATIONS);
    let skeleton = thinned.slice(s![1..=rows, 1..=cols]);

    // 4. Binarize fields to crop, overwrite the skeleton as edge.
    let mut labels = Array2::from_shape_fn((rows, cols), |(i, j)| {
        if skeleton[[i, j]] != 0 {
            EDGE
        } else if field_mask[[i, j]] != 0 {
            CROP
        } else {
            BACKGROUND
        }
    });

    // 5. Edges only exist adjacent to real field pixels: anything the
    //    thinning marked on original background reverts.
    for ((i, j), label) in labels.indexed_iter_mut() {
        if *label == EDGE && field_mask[[i, j]] == 0 {
            *label = BACKGROUND;
        }
    }

    // 6. Fragment cleanup on the crop indicator: isolated pixels are
    //    noise, thin slivers become edge, everything else keeps its
    //    label.
    let crop_indicator = labels.mapv(|l| f32::from(u8::from(l == CROP)));
    let crop_sum = focal_stat(&crop_indicator, FocalStat::Sum);
    for ((i, j), label) in labels.indexed_iter_mut() {
        let s = crop_sum[[i, j]];
        if s < 2.0 {
            *label = BACKGROUND;
        } else if s < 4.0 {
            *label = EDGE;
        }
    }

    labels
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 10x10 mask with a single 6x6 field covering rows/cols 2..8.
    fn centered_square() -> Array2<u32> {
        let mut mask = Array2::zeros((10, 10));
        for i in 2..8 {
            for j in 2..8 {
                mask[[i, j]] = 1;
            }
        }
        mask
    }

    #[test]
    fn empty_mask_is_all_background() {
        let mask = Array2::zeros((10, 10));
        let labels = detect_edges(&mask);
        assert!(labels.iter().all(|&l| l == BACKGROUND));
    }

    #[test]
    fn labels_are_three_class() {
        let labels = detect_edges(&centered_square());
        assert!(labels.iter().all(|&l| l <= EDGE));
    }

    #[test]
    fn square_field_keeps_a_crop_interior() {
        let labels = detect_edges(&centered_square());
        // The 4x4 interior of the field survives as crop.
        for i in 3..7 {
            for j in 3..7 {
                assert_eq!(labels[[i, j]], CROP, "expected crop at ({i}, {j})");
            }
        }
    }

    #[test]
    fn square_field_grows_an_edge_ring() {
        let labels = detect_edges(&centered_square());
        // Non-corner perimeter pixels of the field end up as edge.
        for k in 3..7 {
            assert_eq!(labels[[2, k]], EDGE, "top ring at col {k}");
            assert_eq!(labels[[7, k]], EDGE, "bottom ring at col {k}");
            assert_eq!(labels[[k, 2]], EDGE, "left ring at row {k}");
            assert_eq!(labels[[k, 7]], EDGE, "right ring at row {k}");
        }
    }

    #[test]
    fn background_outside_field_is_untouched() {
        let labels = detect_edges(&centered_square());
        for j in 0..10 {
            assert_eq!(labels[[0, j]], BACKGROUND);
            assert_eq!(labels[[9, j]], BACKGROUND);
        }
    }

    #[test]
    fn no_edge_without_adjacent_field() {
        let labels = detect_edges(&centered_square());
        for ((i, j), &label) in labels.indexed_iter() {
            if label != EDGE {
                continue;
            }
            let mask = centered_square();
            assert_ne!(
                mask[[i, j]],
                0,
                "edge at ({i}, {j}) sits on original background"
            );
        }
    }

    #[test]
    fn touching_fields_separate_along_shared_boundary() {
        // Two fields with distinct ids sharing a vertical boundary.
        let mut mask = Array2::zeros((8, 10));
        for i in 1..7 {
            for j in 1..5 {
                mask[[i, j]] = 1;
            }
            for j in 5..9 {
                mask[[i, j]] = 2;
            }
        }
        let labels = detect_edges(&mask);
        // Somewhere along the shared columns an edge must appear.
        let boundary_edges = (1..7)
            .filter(|&i| labels[[i, 4]] == EDGE || labels[[i, 5]] == EDGE)
            .count();
        assert!(boundary_edges > 0, "no edge along the shared boundary");
    }

    #[test]
    fn isolated_field_pixel_is_removed_as_noise() {
        let mut mask = Array2::zeros((7, 7));
        mask[[3, 3]] = 1;
        let labels = detect_edges(&mask);
        assert!(labels.iter().all(|&l| l == BACKGROUND));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let mask = centered_square();
        assert_eq!(detect_edges(&mask), detect_edges(&mask));
    }
}
