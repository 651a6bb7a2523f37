//! The persisted unit: one labeled time-series sample plus metadata.

use arable_pipeline::SegmentDescriptor;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::id::TrainId;

/// Sidecar metadata persisted as JSON next to the arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMeta {
    /// Region/year group the sample belongs to.
    pub group_id: String,
    /// Grid-cell id within the group.
    pub grid_id: String,
    /// First year covered by the time series, when the group id
    /// carries one.
    pub start_year: Option<i32>,
    /// Last year covered by the time series.
    pub end_year: Option<i32>,
    /// Projected bounds `[left, bottom, right, top]` of the sample
    /// window.
    pub bounds: [f64; 4],
    /// Geographic (lon/lat) bounds, when the grid supplied them.
    pub geo_bounds: Option<[f64; 4]>,
    /// Linear ground size of one pixel.
    pub resolution: f64,
    /// Number of acquisition dates in the stack.
    pub time_steps: usize,
    /// Number of spectral bands per acquisition date.
    pub bands_per_step: usize,
}

/// One fully prepared training sample, ready to persist.
#[derive(Debug, Clone)]
pub struct TrainingRecord {
    pub id: TrainId,
    /// Scaled predictor stack, shape `(time_steps * bands_per_step,
    /// rows, cols)`.
    pub stack: Array3<f32>,
    /// Class labels, shape `(rows, cols)`.
    pub labels: Array2<u8>,
    /// Normalized boundary distances, shape `(rows, cols)`.
    pub distance: Array2<f32>,
    /// Segment-id map, shape `(rows, cols)`.
    pub segments: Array2<u32>,
    /// Per-segment descriptors, persisted in the JSON sidecar.
    pub descriptors: Vec<SegmentDescriptor>,
    pub meta: SampleMeta,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn meta_survives_json_round_trip() {
        let meta = SampleMeta {
            group_id: "site_2020_2021".into(),
            grid_id: "cell3".into(),
            start_year: Some(2020),
            end_year: Some(2021),
            bounds: [500_000.0, 4_000_000.0, 501_000.0, 4_001_000.0],
            geo_bounds: None,
            resolution: 10.0,
            time_steps: 13,
            bands_per_step: 3,
        };
        let json = serde_json::to_string(&meta).unwrap();
        let back: SampleMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn optional_fields_deserialize_from_null() {
        let json = r#"{
            "group_id": "g", "grid_id": "c",
            "start_year": null, "end_year": null,
            "bounds": [0.0, 0.0, 1.0, 1.0],
            "geo_bounds": null,
            "resolution": 10.0, "time_steps": 2, "bands_per_step": 1
        }"#;
        let meta: SampleMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.start_year, None);
        assert_eq!(meta.geo_bounds, None);
    }
}
