//! Land-cover-driven crop relabeling.
//!
//! When a land-cover raster accompanies the boundary annotations, the
//! single crop class from edge detection is replaced with crop-type
//! classes derived from the land-cover codes, and supervision is
//! restricted to pixels the land cover actually marks as cropland.

use ndarray::{Array2, s};

use crate::focal::neighbor4_mean;
use crate::types::{BACKGROUND, CROP, EDGE, LabelKind};

/// How land-cover values map to crop classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandCoverCoding {
    /// A code table: each listed land-cover code is a crop of interest.
    Codes(Vec<u16>),
    /// The raster is already binary: 1 = cropland, everything else not.
    Binary,
}

/// A land-cover raster with its interpretation.
#[derive(Debug, Clone)]
pub struct LandCover {
    pub raster: Array2<u16>,
    pub coding: LandCoverCoding,
}

/// Close 1-pixel boundary-continuity gaps at the four image borders.
///
/// Resampling can leave the outermost row or column just off a field
/// that continues past the image edge. Each border is rewritten from
/// its inner neighbor's crop pixels so boundaries meet the edge
/// cleanly.
pub fn close_border_gaps(labels: &mut Array2<u8>) {
    let (rows, cols) = labels.dim();
    if rows < 2 || cols < 2 {
        return;
    }
    for j in 0..cols {
        labels[[0, j]] = u8::from(labels[[1, j]] == CROP);
        labels[[rows - 1, j]] = u8::from(labels[[rows - 2, j]] == CROP);
    }
    for i in 0..rows {
        labels[[i, 0]] = u8::from(labels[[i, 1]] == CROP);
        labels[[i, cols - 1]] = u8::from(labels[[i, cols - 2]] == CROP);
    }
}

/// Align the land-cover raster to the label shape.
///
/// Oversized rasters are cropped to the label window; undersized ones
/// are edge-padded on the bottom/right (the shape-mismatch repair for
/// off-by-a-pixel resampling).
fn align_shape(land_cover: &Array2<u16>, rows: usize, cols: usize) -> Array2<u16> {
    let cropped = land_cover.slice(s![
        ..land_cover.nrows().min(rows),
        ..land_cover.ncols().min(cols)
    ]);
    let (have_rows, have_cols) = cropped.dim();
    if have_rows == rows && have_cols == cols {
        return cropped.to_owned();
    }
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        cropped[[i.min(have_rows - 1), j.min(have_cols - 1)]]
    })
}

/// Recode the 3-class label array against a land-cover raster.
///
/// Returns `(recoded, reference)` where `reference` is the untouched
/// 3-class input (needed later to exclude edge pixels from
/// connectivity and to protect them from sliver erasure).
///
/// With [`LandCoverCoding::Codes`]: pixels matching a listed code, and
/// not already edge, receive a class id. In [`LabelKind::CropTypes`]
/// mode ids auto-increment per code, advancing only when a code
/// actually assigned pixels, so class ids stay gapless. In
/// [`LabelKind::Boundaries`] mode every match becomes the single crop
/// class. With [`LandCoverCoding::Binary`], land-cover value 1 is crop
/// and everything else background.
#[must_use = "returns the recoded labels and the 3-class reference"]
pub fn recode_labels(
    labels: &Array2<u8>,
    land_cover: &LandCover,
    kind: LabelKind,
) -> (Array2<u8>, Array2<u8>) {
    let reference = labels.clone();
    let (rows, cols) = labels.dim();

    let recoded = match &land_cover.coding {
        LandCoverCoding::Codes(codes) => {
            let aligned = align_shape(&land_cover.raster, rows, cols);
            let mut recoded = Array2::zeros((rows, cols));
            let mut next_class: u8 = 1;
            for &code in codes {
                let mut assigned = false;
                for ((i, j), &lc) in aligned.indexed_iter() {
                    if lc == code && reference[[i, j]] != EDGE {
                        recoded[[i, j]] = match kind {
                            LabelKind::Boundaries => CROP,
                            LabelKind::CropTypes => next_class,
                        };
                        assigned = true;
                    }
                }
                if kind == LabelKind::CropTypes && assigned {
                    next_class = next_class.saturating_add(1);
                }
            }
            recoded
        }
        LandCoverCoding::Binary => {
            let aligned = align_shape(&land_cover.raster, rows, cols);
            aligned.mapv(|lc| u8::from(lc == 1))
        }
    };

    (recoded, reference)
}

/// Restrict supervision to cropland: zero the distance field outside
/// labeled pixels, then drop any pixel whose 4-neighborhood no longer
/// carries boundary distance (prevents orphaned edge fragments).
pub fn mask_noncrop(labels: &mut Array2<u8>, distance: &mut Array2<f32>) {
    for ((i, j), d) in distance.indexed_iter_mut() {
        if labels[[i, j]] == BACKGROUND {
            *d = 0.0;
        }
    }
    let support = neighbor4_mean(distance);
    for ((i, j), label) in labels.indexed_iter_mut() {
        if support[[i, j]] <= 0.0 {
            *label = BACKGROUND;
        }
    }
}
