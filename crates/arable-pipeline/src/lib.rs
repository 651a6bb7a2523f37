//! arable-pipeline: pure raster labeling for training samples (sans-IO).
//!
//! Converts a rasterized field mask into the label triple consumed by
//! field-boundary models:
//! edge detection -> boundary-distance normalization ->
//! [land-cover recoding -> segment uniformization -> sliver
//! suppression -> non-crop masking] -> segment descriptors.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! arrays. Vector clipping, raster sampling, and persistence live in
//! `arable-grid` and `arable-store`.

pub mod distance;
pub mod edge;
pub mod focal;
pub mod raster;
pub mod recode;
pub mod sliver;
pub mod thin;
pub mod types;
pub mod uniform;

use ndarray::Array2;

pub use recode::{LandCover, LandCoverCoding};
pub use types::{
    BACKGROUND, BoundingBox, CROP, CellLabels, EDGE, LabelKind, LabeledSample, PipelineError,
    SegmentDescriptor,
};

/// Parameters for labeling one grid cell.
#[derive(Debug, Clone)]
pub struct LabelParams {
    /// What the final label array encodes.
    pub kind: LabelKind,
    /// Linear ground size of one pixel, in the working CRS units.
    pub resolution: f64,
    /// Whether the boundary annotations are filled polygons (`true`)
    /// or boundary traces (`false`).
    pub polygon_geometry: bool,
    /// Optional land cover driving crop-type recoding.
    pub land_cover: Option<LandCover>,
}

impl LabelParams {
    /// Boundary-only labeling at the given resolution, no land cover.
    #[must_use]
    pub const fn boundaries(resolution: f64) -> Self {
        Self {
            kind: LabelKind::Boundaries,
            resolution,
            polygon_geometry: true,
            land_cover: None,
        }
    }
}

/// Run the full labeling pipeline over one cell's field mask.
///
/// `field_mask` holds unique per-field ids (0 = background), as
/// produced by rasterizing the renumbered boundary polygons. An
/// all-zero mask is a legitimate negative sample and yields all-zero
/// outputs.
///
/// # Pipeline steps
///
/// 1. Edge detection: background/crop/edge label array
/// 2. Per-segment normalized boundary distances
/// 3. With land cover: border-gap closing, crop recoding, majority-vote
///    segment uniformization, sliver suppression, non-crop masking
/// 4. Segment map and per-segment descriptors
///
/// # Errors
///
/// [`PipelineError::ArrayTooLarge`] when a raster dimension exceeds
/// what the imaging backend can address.
pub fn build_labels(
    field_mask: &Array2<u32>,
    params: &LabelParams,
) -> Result<CellLabels, PipelineError> {
    // 1. Three-class label array.
    let mut labels = edge::detect_edges(field_mask);

    // 2. Boundary distances, normalized within each crop segment.
    let crop_mask = labels.mapv(|l| u8::from(l == CROP));
    let mut dist =
        distance::normalize_boundary_distances(&crop_mask, params.polygon_geometry, params.resolution)?;

    // 3. Land-cover recoding path, or plain nonzero segmentation.
    let segments = if let Some(land_cover) = &params.land_cover {
        recode::close_border_gaps(&mut labels);
        let (mut recoded, reference) = recode::recode_labels(&labels, land_cover, params.kind);
        let segments = uniform::uniformize_segments(&mut recoded, &reference, params.kind)?;
        sliver::filter_slivers(&mut recoded, &reference, &segments);
        recode::mask_noncrop(&mut recoded, &mut dist);
        labels = recoded;
        segments
    } else {
        raster::label_components(&labels.mapv(|l| u8::from(l != BACKGROUND)))?
    };

    // 4. Descriptors over the final segments, depth from the distance
    //    field.
    let descriptors = raster::region_descriptors(&segments, &dist);

    Ok(CellLabels {
        labels,
        distance: dist,
        segments,
        descriptors,
    })
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
    fn all_background_cell_yields_zero_arrays() {
        let mask = Array2::zeros((10, 10));
        let cell = build_labels(&mask, &LabelParams::boundaries(10.0)).unwrap();
        assert!(cell.labels.iter().all(|&l| l == BACKGROUND));
        assert!(cell.distance.iter().all(|&d| d.abs() < f32::EPSILON));
        assert!(cell.segments.iter().all(|&s| s == 0));
        assert!(cell.descriptors.is_empty());
    }

    #[test]
    fn centered_square_scenario() {
        let cell = build_labels(&centered_square(), &LabelParams::boundaries(10.0)).unwrap();

        // Interior is crop, ring sides are edge.
        for i in 3..7 {
            for j in 3..7 {
                assert_eq!(cell.labels[[i, j]], CROP);
            }
        }
        for k in 3..7 {
            assert_eq!(cell.labels[[2, k]], EDGE);
            assert_eq!(cell.labels[[k, 2]], EDGE);
        }

        // Distance peaks at 1.0 in the field center, 0 outside.
        let peak = cell.distance.iter().copied().fold(0.0f32, f32::max);
        assert!((peak - 1.0).abs() < 1e-5);
        assert!((cell.distance[[4, 4]] - 1.0).abs() < 1e-5);
        assert!(cell.distance[[0, 0]].abs() < f32::EPSILON);

        // One segment covering the labeled pixels.
        assert!(cell.segments.iter().any(|&s| s != 0));
        assert_eq!(cell.descriptors.len(), 1);
    }

    #[test]
    fn label_values_stay_in_range() {
        let cell = build_labels(&centered_square(), &LabelParams::boundaries(10.0)).unwrap();
        assert!(cell.labels.iter().all(|&l| l <= EDGE));
        assert!(cell.distance.iter().all(|&d| (0.0..=1.0).contains(&d)));
    }

    #[test]
    fn outputs_are_deterministic() {
        let params = LabelParams::boundaries(10.0);
        let first = build_labels(&centered_square(), &params).unwrap();
        let second = build_labels(&centered_square(), &params).unwrap();
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.distance, second.distance);
        assert_eq!(first.segments, second.segments);
    }

    #[test]
    fn land_cover_path_recodes_and_masks() {
        // Land cover marks only the left half of the field as a known
        // crop code.
        let mut lc = Array2::zeros((10, 10));
        for i in 0..10 {
            for j in 0..5 {
                lc[[i, j]] = 42u16;
            }
        }
        let params = LabelParams {
            kind: LabelKind::CropTypes,
            resolution: 10.0,
            polygon_geometry: true,
            land_cover: Some(LandCover {
                raster: lc,
                coding: LandCoverCoding::Codes(vec![42]),
            }),
        };
        let cell = build_labels(&centered_square(), &params).unwrap();

        // Whatever survives carries gapless class ids and bounded
        // distances.
        let max_class = cell.labels.iter().copied().max().unwrap_or(0);
        assert!(max_class <= 2);
        assert!(cell.distance.iter().all(|&d| (0.0..=1.0).contains(&d)));

        // Segment uniformity: one class per segment id.
        let mut seen = std::collections::HashMap::new();
        for ((i, j), &segment) in cell.segments.indexed_iter() {
            if segment == 0 || cell.labels[[i, j]] == EDGE {
                continue;
            }
            let class = cell.labels[[i, j]];
            if let Some(&previous) = seen.get(&segment) {
                assert_eq!(previous, class);
            } else {
                seen.insert(segment, class);
            }
        }
    }
}
