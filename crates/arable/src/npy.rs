//! `.npy`-backed raster sources.
//!
//! Each band file is a 2D `f32` array sharing one projected origin and
//! resolution; acquisition dates are grouped by parent directory. This
//! stands in for a full geospatial raster reader: sampling is pure
//! window slicing, with no reprojection or resampling.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use ndarray::{Array2, Array3, Axis, s};
use ndarray_npy::read_npy;

use arable_grid::{
    LandCoverSource, RasterGrid, RasterSource, SourceError, TimeSeriesShape, infer_time_steps,
};

/// Pixel window of `grid` within a source raster anchored at
/// `(left, top)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn window(
    grid: &RasterGrid,
    left: f64,
    top: f64,
    source_rows: usize,
    source_cols: usize,
) -> Result<(usize, usize), SourceError> {
    let row0 = ((top - grid.bounds.top) / grid.resolution).round() as i64;
    let col0 = ((grid.bounds.left - left) / grid.resolution).round() as i64;
    let fits = row0 >= 0
        && col0 >= 0
        && usize::try_from(row0).is_ok_and(|r| r + grid.rows <= source_rows)
        && usize::try_from(col0).is_ok_and(|c| c + grid.cols <= source_cols);
    if !fits {
        return Err(SourceError::Window {
            rows: grid.rows,
            cols: grid.cols,
        });
    }
    Ok((row0 as usize, col0 as usize))
}

/// Image time series loaded from a list of single-band `.npy` files.
pub struct NpyRasterSource {
    stack: Array3<f32>,
    shape: TimeSeriesShape,
    left: f64,
    top: f64,
}

impl NpyRasterSource {
    /// Load band files in input order; all must share one shape.
    pub fn load(paths: &[PathBuf], left: f64, top: f64) -> Result<Self> {
        if paths.is_empty() {
            bail!("no image bands supplied");
        }
        let mut bands: Vec<Array2<f32>> = Vec::with_capacity(paths.len());
        for path in paths {
            let band: Array2<f32> =
                read_npy(path).with_context(|| format!("reading band {}", path.display()))?;
            if let Some(first) = bands.first()
                && first.dim() != band.dim()
            {
                bail!(
                    "band {} has shape {:?}, expected {:?}",
                    path.display(),
                    band.dim(),
                    first.dim()
                );
            }
            bands.push(band);
        }
        let views: Vec<_> = bands.iter().map(Array2::view).collect();
        let stack = ndarray::stack(Axis(0), &views).context("stacking bands")?;
        let shape = infer_time_steps(paths, paths.len())
            .context("band count does not divide evenly into time steps")?;
        Ok(Self {
            stack,
            shape,
            left,
            top,
        })
    }
}

impl RasterSource for NpyRasterSource {
    fn shape(&self) -> TimeSeriesShape {
        self.shape
    }

    fn sample(&self, grid: &RasterGrid) -> Result<Array3<f32>, SourceError> {
        let (_, rows, cols) = self.stack.dim();
        let (row0, col0) = window(grid, self.left, self.top, rows, cols)?;
        Ok(self
            .stack
            .slice(s![.., row0..row0 + grid.rows, col0..col0 + grid.cols])
            .to_owned())
    }
}

/// Land-cover codes loaded from a single `.npy` file.
pub struct NpyLandCoverSource {
    raster: Array2<u16>,
    left: f64,
    top: f64,
}

impl NpyLandCoverSource {
    pub fn load(path: &Path, left: f64, top: f64) -> Result<Self> {
        let raster: Array2<u16> =
            read_npy(path).with_context(|| format!("reading land cover {}", path.display()))?;
        Ok(Self { raster, left, top })
    }
}

impl LandCoverSource for NpyLandCoverSource {
    fn sample(&self, grid: &RasterGrid) -> Result<Array2<u16>, SourceError> {
        let (rows, cols) = self.raster.dim();
        let (row0, col0) = window(grid, self.left, self.top, rows, cols)?;
        Ok(self
            .raster
            .slice(s![row0..row0 + grid.rows, col0..col0 + grid.cols])
            .to_owned())
    }
}
