//! Bridges between `ndarray` rasters and the `image`/`imageproc`
//! backends for connected-component labeling and distance transforms,
//! plus per-segment descriptor extraction.

use image::{GrayImage, Luma};
use imageproc::distance_transform::euclidean_squared_distance_transform;
use imageproc::region_labelling::{Connectivity, connected_components};
use ndarray::Array2;

use crate::types::{BoundingBox, PipelineError, SegmentDescriptor};

/// Render a mask as a grayscale image: 255 for nonzero, 0 elsewhere.
fn to_binary_image(mask: &Array2<u8>) -> Result<GrayImage, PipelineError> {
    let (rows, cols) = mask.dim();
    let (Ok(height), Ok(width)) = (u32::try_from(rows), u32::try_from(cols)) else {
        return Err(PipelineError::ArrayTooLarge { rows, cols });
    };
    Ok(GrayImage::from_fn(width, height, |x, y| {
        Luma([if mask[[y as usize, x as usize]] != 0 { 255 } else { 0 }])
    }))
}

/// Label 4-connected components of the nonzero pixels of `mask`.
///
/// Returns a segment map with ids `1..=n` and 0 for background. Any
/// nonzero input value counts as foreground; values are not
/// distinguished.
///
/// # Errors
///
/// [`PipelineError::ArrayTooLarge`] when a dimension exceeds `u32`.
pub fn label_components(mask: &Array2<u8>) -> Result<Array2<u32>, PipelineError> {
    let image = to_binary_image(mask)?;
    let labeled = connected_components(&image, Connectivity::Four, Luma([0u8]));
    let (rows, cols) = mask.dim();
    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| {
        #[allow(clippy::cast_possible_truncation)]
        let (x, y) = (j as u32, i as u32);
        labeled.get_pixel(x, y).0[0]
    }))
}

/// Euclidean distance of every nonzero mask pixel to the nearest zero
/// pixel, in pixel units. Zero pixels get distance 0.
///
/// When the mask has no zero pixel at all there is no boundary to
/// measure against; every pixel gets `f32::INFINITY`, which the
/// distance normalization later collapses to 1.0 (fully interior).
///
/// # Errors
///
/// [`PipelineError::ArrayTooLarge`] when a dimension exceeds `u32`.
pub fn distance_to_background(mask: &Array2<u8>) -> Result<Array2<f32>, PipelineError> {
    let (rows, cols) = mask.dim();
    if mask.iter().all(|&v| v != 0) {
        return Ok(Array2::from_elem((rows, cols), f32::INFINITY));
    }

    // The transform measures distance to the nearest *foreground*
    // pixel, so feed it the complement: background becomes foreground.
    let complement = mask.mapv(|v| u8::from(v == 0));
    let image = to_binary_image(&complement)?;
    let squared = euclidean_squared_distance_transform(&image);
    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| {
        #[allow(clippy::cast_possible_truncation)]
        let (x, y) = (j as u32, i as u32);
        #[allow(clippy::cast_possible_truncation)]
        let distance = squared.get_pixel(x, y).0[0].sqrt() as f32;
        distance
    }))
}

/// Extract per-segment descriptors: bounding box, pixel area, and the
/// maximum `intensity` value over each segment.
///
/// Descriptors are returned ordered by segment id. Segment id 0
/// (background) has no descriptor.
#[must_use = "returns the segment descriptors"]
pub fn region_descriptors(
    segments: &Array2<u32>,
    intensity: &Array2<f32>,
) -> Vec<SegmentDescriptor> {
    struct Acc {
        bbox: BoundingBox,
        area: usize,
        max_intensity: f32,
    }

    let mut accs: Vec<Option<Acc>> = Vec::new();
    for ((i, j), &label) in segments.indexed_iter() {
        if label == 0 {
            continue;
        }
        let idx = label as usize - 1;
        if accs.len() <= idx {
            accs.resize_with(idx + 1, || None);
        }
        let value = intensity[[i, j]];
        match &mut accs[idx] {
            Some(acc) => {
                acc.bbox.min_row = acc.bbox.min_row.min(i);
                acc.bbox.min_col = acc.bbox.min_col.min(j);
                acc.bbox.max_row = acc.bbox.max_row.max(i + 1);
                acc.bbox.max_col = acc.bbox.max_col.max(j + 1);
                acc.area += 1;
                acc.max_intensity = acc.max_intensity.max(value);
            }
            slot => {
                *slot = Some(Acc {
                    bbox: BoundingBox {
                        min_row: i,
                        min_col: j,
                        max_row: i + 1,
                        max_col: j + 1,
                    },
                    area: 1,
                    max_intensity: value,
                });
            }
        }
    }

    accs.into_iter()
        .enumerate()
        .filter_map(|(idx, acc)| {
            acc.map(|acc| {
                #[allow(clippy::cast_possible_truncation)]
                let label = idx as u32 + 1;
                SegmentDescriptor {
                    label,
                    bbox: acc.bbox,
                    area: acc.area,
                    max_intensity: acc.max_intensity,
                }
            })
        })
        .collect()
}
