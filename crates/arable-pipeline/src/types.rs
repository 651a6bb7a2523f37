//! Shared types for the arable labeling pipeline.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Background class value.
pub const BACKGROUND: u8 = 0;

/// Crop class value (pre-recoding; post-recoding crop classes are `1..=K`).
pub const CROP: u8 = 1;

/// Edge class value.
pub const EDGE: u8 = 2;

/// What the label array encodes once recoding is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelKind {
    /// Field boundaries only: every field is the single crop class.
    Boundaries,
    /// Distinct crop-type classes `1..=K`.
    CropTypes,
}

/// Pixel bounding box of a labeled segment.
///
/// Row/column ranges are half-open: `min` inclusive, `max` exclusive,
/// so `max_row - min_row` is the height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl BoundingBox {
    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.max_row - self.min_row
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.max_col - self.min_col
    }

    /// A segment too thin to carry meaningful interior structure.
    #[must_use]
    pub const fn is_sliver(&self) -> bool {
        self.height() <= 1 || self.width() <= 1
    }
}

/// Summary of one labeled segment, recorded alongside the arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    /// Segment id in the segment map (always nonzero).
    pub label: u32,
    /// Pixel bounding box.
    pub bbox: BoundingBox,
    /// Number of pixels in the segment.
    pub area: usize,
    /// Maximum intensity-image value over the segment (the boundary
    /// distance field, when descriptors are built for a sample).
    pub max_intensity: f32,
}

/// Label arrays produced for one grid cell.
#[derive(Debug, Clone)]
pub struct CellLabels {
    /// Categorical label array: `{0, 1, 2}` or `{0..=K}` after recoding.
    pub labels: Array2<u8>,
    /// Normalized boundary distance, always within `[0, 1]`.
    pub distance: Array2<f32>,
    /// Connected-component segment map; `0` is no-segment.
    pub segments: Array2<u32>,
    /// Per-segment summaries (intensity taken from `distance`).
    pub descriptors: Vec<SegmentDescriptor>,
}

/// The full bundle handed to augmentation: image stack plus labels.
#[derive(Debug, Clone)]
pub struct LabeledSample {
    /// Image time series, `(bands, rows, cols)`, scaled into `[0, 1]`.
    pub stack: Array3<f32>,
    pub labels: Array2<u8>,
    pub distance: Array2<f32>,
    pub segments: Array2<u32>,
    pub descriptors: Vec<SegmentDescriptor>,
}

/// Errors surfaced by the labeling pipeline.
///
/// Degenerate segments and land-cover shape mismatches are repaired
/// in place and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A raster dimension exceeds what the imaging backend can index.
    #[error("raster of {rows}x{cols} pixels exceeds addressable image size")]
    ArrayTooLarge { rows: usize, cols: usize },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_extents() {
        let bbox = BoundingBox {
            min_row: 2,
            min_col: 3,
            max_row: 7,
            max_col: 4,
        };
        assert_eq!(bbox.height(), 5);
        assert_eq!(bbox.width(), 1);
        assert!(bbox.is_sliver());
    }

    #[test]
    fn wide_box_is_not_sliver() {
        let bbox = BoundingBox {
            min_row: 0,
            min_col: 0,
            max_row: 4,
            max_col: 4,
        };
        assert!(!bbox.is_sliver());
    }

    #[test]
    fn descriptor_serde_round_trip() {
        let descriptor = SegmentDescriptor {
            label: 3,
            bbox: BoundingBox {
                min_row: 1,
                min_col: 1,
                max_row: 5,
                max_col: 6,
            },
            area: 17,
            max_intensity: 0.75,
        };
        let json = serde_json::to_string(&descriptor).expect("serializes");
        let back: SegmentDescriptor = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(descriptor, back);
    }

    #[test]
    fn error_display() {
        let err = PipelineError::ArrayTooLarge { rows: 8, cols: 9 };
        assert_eq!(
            err.to_string(),
            "raster of 8x9 pixels exceeds addressable image size"
        );
    }
}
