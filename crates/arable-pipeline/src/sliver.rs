//! Sliver suppression: erase 1-pixel-thin segments.
//!
//! Rasterization and relabeling occasionally leave segments one pixel
//! tall or wide. Those carry no usable interior and confuse the
//! boundary-distance supervision, so they are cleared to background.
//! Edge pixels from the detection stage are reinstated afterwards so
//! legitimate thin boundaries survive the sweep.

use ndarray::Array2;

use crate::raster::region_descriptors;
use crate::types::{BACKGROUND, EDGE};

/// Erase segments whose bounding box is <= 1 pixel tall or wide, then
/// re-impose the reference edge pixels.
///
/// `segments` is the map the labels were uniformized against;
/// `reference` is the 3-class array whose edge pixels are protected.
pub fn filter_slivers(
    labels: &mut Array2<u8>,
    reference: &Array2<u8>,
    segments: &Array2<u32>,
) {
    let zero_intensity = Array2::zeros(segments.dim());
    for descriptor in region_descriptors(segments, &zero_intensity) {
        if !descriptor.bbox.is_sliver() {
            continue;
        }
        let bbox = descriptor.bbox;
        for i in bbox.min_row..bbox.max_row {
            for j in bbox.min_col..bbox.max_col {
                if segments[[i, j]] == descriptor.label {
                    labels[[i, j]] = BACKGROUND;
                }
            }
        }
    }

    for ((i, j), label) in labels.indexed_iter_mut() {
        if reference[[i, j]] == EDGE {
            *label = EDGE;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::CROP;
    use ndarray::Array2;

    #[test]
    fn one_pixel_wide_segment_is_erased() {
        let mut labels = Array2::zeros((6, 6));
        let mut segments = Array2::zeros((6, 6));
        for i in 1..5 {
            labels[[i, 2]] = CROP;
            segments[[i, 2]] = 1u32;
        }
        let reference = Array2::zeros((6, 6));
        filter_slivers(&mut labels, &reference, &segments);
        assert!(labels.iter().all(|&l| l == BACKGROUND));
    }

    #[test]
    fn wide_segment_survives() {
        let mut labels = Array2::zeros((6, 6));
        let mut segments = Array2::zeros((6, 6));
        for i in 1..4 {
            for j in 1..4 {
                labels[[i, j]] = CROP;
                segments[[i, j]] = 1u32;
            }
        }
        let reference = Array2::zeros((6, 6));
        filter_slivers(&mut labels, &reference, &segments);
        for i in 1..4 {
            for j in 1..4 {
                assert_eq!(labels[[i, j]], CROP);
            }
        }
    }

    #[test]
    fn edges_are_reimposed_over_erasures() {
        // A thin segment that coincides with detected edges: the sliver
        // sweep would erase it, but edge pixels win.
        let mut labels = Array2::zeros((5, 5));
        let mut segments = Array2::zeros((5, 5));
        let mut reference = Array2::zeros((5, 5));
        for j in 0..5 {
            labels[[2, j]] = CROP;
            segments[[2, j]] = 1u32;
            reference[[2, j]] = EDGE;
        }
        filter_slivers(&mut labels, &reference, &segments);
        for j in 0..5 {
            assert_eq!(labels[[2, j]], EDGE);
        }
    }

    #[test]
    fn only_the_sliver_segment_is_touched() {
        let mut labels = Array2::zeros((7, 7));
        let mut segments = Array2::zeros((7, 7));
        // Segment 1: healthy 3x3 block.
        for i in 0..3 {
            for j in 0..3 {
                labels[[i, j]] = CROP;
                segments[[i, j]] = 1u32;
            }
        }
        // Segment 2: single-row sliver.
        for j in 0..5 {
            labels[[5, j]] = CROP;
            segments[[5, j]] = 2u32;
        }
        let reference = Array2::zeros((7, 7));
        filter_slivers(&mut labels, &reference, &segments);
        assert_eq!(labels[[1, 1]], CROP);
        assert!((0..5).all(|j| labels[[5, j]] == BACKGROUND));
    }
}
