//! Focal neighborhood statistics over 2D rasters.
//!
//! All operators use a 3x3 window with edge-replicate padding:
//! out-of-bounds neighbors take the value of the nearest in-bounds
//! pixel, so border pixels see a full window.

use ndarray::Array2;

/// Offsets of the 8 neighbors around a center pixel.
const NEIGHBORS_8: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// Offsets of the 4 direct (edge-sharing) neighbors.
const NEIGHBORS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Statistic computed over the 3x3 focal window (center included).
///
/// A closed operation set dispatched by `match`; there is deliberately
/// no by-name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocalStat {
    Sum,
    Mean,
    /// Population variance of the nine window values.
    Var,
    Min,
    Max,
}

/// Edge-replicate lookup: indices are clamped into the array.
fn clamped<T: Copy>(arr: &Array2<T>, row: isize, col: isize) -> T {
    let (rows, cols) = arr.dim();
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    let r = row.clamp(0, rows as isize - 1) as usize;
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    let c = col.clamp(0, cols as isize - 1) as usize;
    arr[[r, c]]
}

/// Count, for every foreground (nonzero) pixel, how many of its 8
/// neighbors share its exact value. Background pixels score 0.
///
/// The score separates homogeneous field interiors (8) from boundary
/// pixels whose neighborhood mixes field ids or field and background.
#[must_use = "returns the per-pixel neighbor agreement counts"]
pub fn focal_compare(labels: &Array2<u32>) -> Array2<u8> {
    let (rows, cols) = labels.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        let center = labels[[i, j]];
        if center == 0 {
            return 0;
        }
        #[allow(clippy::cast_possible_wrap)]
        let (ri, ci) = (i as isize, j as isize);
        let mut matches = 0u8;
        for (dr, dc) in NEIGHBORS_8 {
            if clamped(labels, ri + dr, ci + dc) == center {
                matches += 1;
            }
        }
        matches
    })
}

/// Compute a 3x3 window statistic at every pixel (center included).
#[must_use = "returns the focal statistic raster"]
pub fn focal_stat(values: &Array2<f32>, stat: FocalStat) -> Array2<f32> {
    let (rows, cols) = values.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        #[allow(clippy::cast_possible_wrap)]
        let (ri, ci) = (i as isize, j as isize);
        let mut window = [0.0f32; 9];
        window[0] = values[[i, j]];
        for (k, (dr, dc)) in NEIGHBORS_8.iter().enumerate() {
            window[k + 1] = clamped(values, ri + dr, ci + dc);
        }
        apply_stat(&window, stat)
    })
}

/// Mean of the four direct neighbors, center excluded.
///
/// Used by non-crop masking: a pixel whose direct neighborhood carries
/// no boundary distance has no field context left.
#[must_use = "returns the 4-neighbor mean raster"]
pub fn neighbor4_mean(values: &Array2<f32>) -> Array2<f32> {
    let (rows, cols) = values.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        #[allow(clippy::cast_possible_wrap)]
        let (ri, ci) = (i as isize, j as isize);
        let sum: f32 = NEIGHBORS_4
            .iter()
            .map(|&(dr, dc)| clamped(values, ri + dr, ci + dc))
            .sum();
        sum / 4.0
    })
}

fn apply_stat(window: &[f32; 9], stat: FocalStat) -> f32 {
    match stat {
        FocalStat::Sum => window.iter().sum(),
        FocalStat::Mean => window.iter().sum::<f32>() / 9.0,
        FocalStat::Var => {
            let mean = window.iter().sum::<f32>() / 9.0;
            window.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / 9.0
        }
        FocalStat::Min => window.iter().copied().fold(f32::INFINITY, f32::min),
        FocalStat::Max => window.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn compare_scores_background_as_zero() {
        let labels = array![[0u32, 0, 0], [0, 0, 0], [0, 0, 0]];
        let scores = focal_compare(&labels);
        assert!(scores.iter().all(|&s| s == 0));
    }

    #[test]
    fn compare_homogeneous_interior_scores_eight() {
        let labels = Array2::from_elem((5, 5), 7u32);
        let scores = focal_compare(&labels);
        // Edge replication makes even border pixels fully homogeneous.
        assert!(scores.iter().all(|&s| s == 8));
    }

    #[test]
    fn compare_counts_matching_neighbors_at_field_corner() {
        // 2x2 field block in the lower-right of a 4x4 raster.
        let mut labels = Array2::zeros((4, 4));
        for i in 2..4 {
            for j in 2..4 {
                labels[[i, j]] = 1u32;
            }
        }
        let scores = focal_compare(&labels);
        // Interior corner (2,2) of the block sees the other three block
        // pixels only.
        assert_eq!(scores[[2, 2]], 3);
        // (3,3) touches the replicated border, so its clamped east,
        // south, and south-east neighbors are copies of field pixels.
        assert!(scores[[3, 3]] > 3);
    }

    #[test]
    fn compare_distinguishes_touching_field_ids() {
        // Two fields with different ids side by side: pixels on the
        // shared boundary must not score 8.
        let labels = array![[1u32, 1, 2, 2], [1, 1, 2, 2], [1, 1, 2, 2]];
        let scores = focal_compare(&labels);
        assert!(scores[[1, 1]] < 8);
        assert!(scores[[1, 2]] < 8);
    }

    #[test]
    fn stat_sum_counts_window() {
        let values = array![[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let sums = focal_stat(&values, FocalStat::Sum);
        // Center window covers the whole raster: all three ones.
        assert!((sums[[1, 1]] - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn stat_mean_of_uniform_is_identity() {
        let values = Array2::from_elem((4, 4), 0.5f32);
        let means = focal_stat(&values, FocalStat::Mean);
        assert!(means.iter().all(|&m| (m - 0.5).abs() < 1e-6));
    }

    #[test]
    fn stat_var_of_uniform_is_zero() {
        let values = Array2::from_elem((4, 4), 2.0f32);
        let vars = focal_stat(&values, FocalStat::Var);
        assert!(vars.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn stat_min_max_bracket_window() {
        let values = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let mins = focal_stat(&values, FocalStat::Min);
        let maxs = focal_stat(&values, FocalStat::Max);
        assert!((mins[[1, 1]] - 1.0).abs() < f32::EPSILON);
        assert!((maxs[[1, 1]] - 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn neighbor4_mean_excludes_center() {
        let mut values = Array2::zeros((3, 3));
        values[[1, 1]] = 4.0f32;
        let means = neighbor4_mean(&values);
        // Center's direct neighbors are all zero.
        assert!(means[[1, 1]].abs() < f32::EPSILON);
        // A direct neighbor of the center sees it once among four.
        assert!((means[[0, 1]] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn neighbor4_mean_replicates_edges() {
        let values = Array2::from_elem((3, 3), 2.0f32);
        let means = neighbor4_mean(&values);
        assert!(means.iter().all(|&m| (m - 2.0).abs() < 1e-6));
    }
}
