//! Raster-source collaborators.
//!
//! Decoding, reprojection, and resampling live behind these traits;
//! the orchestration only sees blocking calls that hand back arrays
//! for a requested [`RasterGrid`].

use std::collections::BTreeSet;
use std::path::Path;

use ndarray::{Array2, Array3};

use crate::rasterize::RasterGrid;

/// Time-series geometry of an image source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesShape {
    /// Number of acquisition dates.
    pub time_steps: usize,
    /// Number of spectral bands per acquisition date.
    pub bands_per_step: usize,
}

impl TimeSeriesShape {
    /// Total band count of the stacked array.
    #[must_use]
    pub const fn total_bands(&self) -> usize {
        self.time_steps * self.bands_per_step
    }
}

/// Raster-sampling failures.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("raster I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("raster read {path}: {reason}")]
    Read { path: String, reason: String },

    /// The requested window does not fit inside the source extent.
    #[error("requested {rows}x{cols} window lies outside the raster extent")]
    Window { rows: usize, cols: usize },
}

/// Supplies the predictor image stack for a grid window.
pub trait RasterSource {
    fn shape(&self) -> TimeSeriesShape;

    /// Sample the stack for `grid`, shape `(total_bands, rows, cols)`.
    ///
    /// # Errors
    ///
    /// [`SourceError`] when the window cannot be read.
    fn sample(&self, grid: &RasterGrid) -> Result<Array3<f32>, SourceError>;
}

/// Supplies the land-cover codes for a grid window.
pub trait LandCoverSource {
    /// Sample land-cover codes for `grid`, shape `(rows, cols)`.
    ///
    /// # Errors
    ///
    /// [`SourceError`] when the window cannot be read.
    fn sample(&self, grid: &RasterGrid) -> Result<Array2<u16>, SourceError>;
}

/// Scale raw values into reflectance-like `[0, 1]` units:
/// `v * gain + offset`, clipped.
pub fn scale_stack(stack: &mut Array3<f32>, gain: f64, offset: f64) {
    #[allow(clippy::cast_possible_truncation)]
    let (gain, offset) = (gain as f32, offset as f32);
    stack.mapv_inplace(|v| v.mul_add(gain, offset).clamp(0.0, 1.0));
}

/// Infer the time-series split from an ordered raster path list.
///
/// Rasters are grouped by parent-directory name (one directory per
/// acquisition date); bands per step is the total divided by the group
/// count. Returns `None` when the paths do not divide evenly.
#[must_use]
pub fn infer_time_steps(paths: &[impl AsRef<Path>], total_bands: usize) -> Option<TimeSeriesShape> {
    let parents: BTreeSet<&Path> = paths.iter().filter_map(|p| p.as_ref().parent()).collect();
    let time_steps = parents.len();
    if time_steps == 0 || total_bands % time_steps != 0 {
        return None;
    }
    Some(TimeSeriesShape {
        time_steps,
        bands_per_step: total_bands / time_steps,
    })
}
