//! Per-cell sample construction and fan-out.
//!
//! The orchestrator owns the run-scoped state (the boundary layer,
//! which topology repair mutates for the rest of the run, and the
//! merged-cell set for cross-tile boundaries) and drives each grid
//! cell through clip -> rasterize -> label -> augment -> persist.

use std::collections::{HashMap, HashSet};

use geo::MultiPolygon;
use log::{info, warn};

use arable_pipeline::{
    LabelKind, LabelParams, LabeledSample, LandCover, LandCoverCoding, PipelineError, build_labels,
};
use arable_store::{SampleMeta, SampleStore, StoreError, TrainId, TrainingRecord};

use crate::augment::{Augmentation, Augmenter, IdentityAugmenter};
use crate::cell::{BoundaryLayer, BoundaryPolygon, Bounds, GridCell};
use crate::clip::{self, TopologyError};
use crate::index::CellIndex;
use crate::rasterize::{RasterGrid, rasterize_classes};
use crate::source::{LandCoverSource, RasterSource, SourceError, scale_stack};

/// Minimum output extent; anything smaller is skipped as undersized.
pub const MIN_EXTENT: usize = 5;

static IDENTITY: IdentityAugmenter = IdentityAugmenter;

/// Run-level configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Group id tying samples to their provenance; when its last
    /// `_`-separated token is a year, the metadata year range derives
    /// from it.
    pub group_id: String,
    /// Linear scaling applied to raw raster values.
    pub gain: f64,
    pub offset: f64,
    /// Linear ground size of one output pixel.
    pub resolution: f64,
    /// Fixed output size `(rows, cols)`; `None` sizes windows from the
    /// natural bounds.
    pub fixed_size: Option<(usize, usize)>,
    /// Augmentation variants to produce per cell.
    pub augmentations: Vec<Augmentation>,
    pub kind: LabelKind,
    /// Land-cover interpretation; requires a land-cover source.
    pub land_cover_coding: Option<LandCoverCoding>,
}

/// What happened to one grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellOutcome {
    /// Boundaries present; `written` records persisted, `failed`
    /// variants absorbed.
    Processed { written: usize, failed: usize },
    /// No boundaries in the cell: persisted as an all-background
    /// negative sample.
    NegativeSample { written: usize },
    /// A co-intersecting cell already contributed this cross-tile
    /// boundary.
    SkippedMerged,
    /// Output extent below [`MIN_EXTENT`].
    SkippedUndersized { rows: usize, cols: usize },
    /// Every requested record id already exists in the store.
    SkippedStored,
}

/// Failures that halt the run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Topology still invalid after the one permitted repair.
    #[error("unrepairable boundary topology: {0}")]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Aggregated run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub negative: usize,
    pub skipped_merged: usize,
    pub skipped_undersized: usize,
    pub skipped_stored: usize,
    pub records_written: usize,
    pub variants_failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &CellOutcome) {
        match *outcome {
            CellOutcome::Processed { written, failed } => {
                self.processed += 1;
                self.records_written += written;
                self.variants_failed += failed;
            }
            CellOutcome::NegativeSample { written } => {
                self.negative += 1;
                self.records_written += written;
            }
            CellOutcome::SkippedMerged => self.skipped_merged += 1,
            CellOutcome::SkippedUndersized { .. } => self.skipped_undersized += 1,
            CellOutcome::SkippedStored => self.skipped_stored += 1,
        }
    }
}

/// Drives sample construction across a run's grid cells.
pub struct GridOrchestrator<'a, R, S> {
    config: OrchestratorConfig,
    cells: Vec<GridCell>,
    index: CellIndex,
    boundaries: BoundaryLayer,
    raster: &'a R,
    land_cover: Option<&'a dyn LandCoverSource>,
    store: &'a S,
    augmenters: HashMap<String, Box<dyn Augmenter>>,
    /// Cell ids already absorbed into a cross-tile sample.
    merged: HashSet<String>,
}

impl<'a, R: RasterSource, S: SampleStore> GridOrchestrator<'a, R, S> {
    #[must_use]
    pub fn new(
        config: OrchestratorConfig,
        cells: Vec<GridCell>,
        boundaries: BoundaryLayer,
        raster: &'a R,
        store: &'a S,
    ) -> Self {
        let index = CellIndex::new(&cells);
        Self {
            config,
            cells,
            index,
            boundaries,
            raster,
            land_cover: None,
            store,
            augmenters: HashMap::new(),
            merged: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_land_cover(mut self, source: &'a dyn LandCoverSource) -> Self {
        self.land_cover = Some(source);
        self
    }

    /// Register the transform for an augmentation name. Names without
    /// a registered transform fall back to the identity.
    #[must_use]
    pub fn with_augmenter(mut self, name: impl Into<String>, augmenter: Box<dyn Augmenter>) -> Self {
        self.augmenters.insert(name.into(), augmenter);
        self
    }

    /// Process every cell in input order, reporting each outcome to
    /// `observer`.
    ///
    /// # Errors
    ///
    /// [`RunError`] on unrepairable topology or upstream I/O failure;
    /// all other conditions are absorbed as skip outcomes.
    pub fn run(
        mut self,
        mut observer: impl FnMut(&GridCell, &CellOutcome),
    ) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();
        for position in 0..self.cells.len() {
            let cell = self.cells[position].clone();
            let outcome = self.process_cell(&cell)?;
            summary.record(&outcome);
            observer(&cell, &outcome);
        }
        info!(
            "run complete: {} processed, {} negative, {} records written",
            summary.processed, summary.negative, summary.records_written
        );
        Ok(summary)
    }

    fn process_cell(&mut self, cell: &GridCell) -> Result<CellOutcome, RunError> {
        let target = MultiPolygon::new(vec![cell.geometry.clone()]);
        let mut clipped = self.clip_with_repair(&target)?;
        clipped.retain(|b| b.class != 0);

        let mut bounds = cell.bounds;
        let mut geo_bounds = cell.geo_bounds;
        let negative = clipped.is_empty();

        if !negative {
            match self.resolve_tile_scope(&clipped)? {
                TileScope::SingleTile => {}
                TileScope::AlreadyMerged => return Ok(CellOutcome::SkippedMerged),
                TileScope::Merged {
                    clipped: merged_clip,
                    bounds: merged_bounds,
                    geo_bounds: merged_geo,
                } => {
                    clipped = merged_clip;
                    bounds = merged_bounds;
                    geo_bounds = merged_geo;
                }
            }
            renumber(&mut clipped);
        }

        let grid = match self.config.fixed_size {
            Some((rows, cols)) => {
                RasterGrid::anchored(bounds.left, bounds.top, rows, cols, self.config.resolution)
            }
            None => RasterGrid::from_bounds(bounds, self.config.resolution),
        };
        if grid.rows < MIN_EXTENT || grid.cols < MIN_EXTENT {
            return Ok(CellOutcome::SkippedUndersized {
                rows: grid.rows,
                cols: grid.cols,
            });
        }

        let ids = self.variant_ids(&cell.id);
        if ids.iter().all(|id| self.store.contains(id)) {
            return Ok(CellOutcome::SkippedStored);
        }

        let mut stack = self.raster.sample(&grid)?;
        scale_stack(&mut stack, self.config.gain, self.config.offset);

        let field_mask = rasterize_classes(&clipped, &grid);
        let land_cover = self.sample_land_cover(&grid)?;
        let params = LabelParams {
            kind: self.config.kind,
            resolution: self.config.resolution,
            polygon_geometry: self.boundaries.polygon_geometry,
            land_cover,
        };
        let labels = build_labels(&field_mask, &params)?;

        let base = LabeledSample {
            stack,
            labels: labels.labels,
            distance: labels.distance,
            segments: labels.segments,
            descriptors: labels.descriptors,
        };
        let meta = self.sample_meta(&cell.id, &grid, geo_bounds);
        let (written, failed) = self.persist_variants(&base, &meta);

        Ok(if negative {
            CellOutcome::NegativeSample { written }
        } else {
            CellOutcome::Processed { written, failed }
        })
    }

    fn clip_with_repair(
        &mut self,
        target: &MultiPolygon<f64>,
    ) -> Result<Vec<BoundaryPolygon>, TopologyError> {
        match clip::clip_boundaries(&self.boundaries, target) {
            Ok(clipped) => Ok(clipped),
            Err(err) => {
                warn!("{err}; repairing boundary layer and retrying");
                clip::repair(&mut self.boundaries);
                clip::clip_boundaries(&self.boundaries, target)
            }
        }
    }

    /// Resolve cross-tile scope for a clipped boundary set.
    ///
    /// A boundary touching several cells is re-clipped against their
    /// union and every intersecting id enters the merged set, so the
    /// boundary is persisted exactly once; later cells whose boundary
    /// co-intersects an already-merged id are skipped.
    fn resolve_tile_scope(
        &mut self,
        clipped: &[BoundaryPolygon],
    ) -> Result<TileScope, RunError> {
        let Some(clip_bounds) = layer_bounds(clipped) else {
            return Ok(TileScope::SingleTile);
        };
        let intersecting = self.index.intersecting(&clip_bounds);
        if intersecting.len() <= 1 {
            return Ok(TileScope::SingleTile);
        }

        if intersecting
            .iter()
            .any(|&i| self.merged.contains(&self.cells[i].id))
        {
            return Ok(TileScope::AlreadyMerged);
        }

        let union_target = MultiPolygon::new(
            intersecting
                .iter()
                .map(|&i| self.cells[i].geometry.clone())
                .collect(),
        );
        let mut reclipped = self.clip_with_repair(&union_target)?;
        reclipped.retain(|b| b.class != 0);

        let mut bounds = self.cells[intersecting[0]].bounds;
        let mut geo_bounds = self.cells[intersecting[0]].geo_bounds;
        for &i in &intersecting[1..] {
            bounds = bounds.union(&self.cells[i].bounds);
            geo_bounds = union_geo(geo_bounds, self.cells[i].geo_bounds);
        }
        for &i in &intersecting {
            self.merged.insert(self.cells[i].id.clone());
        }

        Ok(TileScope::Merged {
            clipped: reclipped,
            bounds,
            geo_bounds,
        })
    }

    fn sample_land_cover(&self, grid: &RasterGrid) -> Result<Option<LandCover>, RunError> {
        match (self.land_cover, &self.config.land_cover_coding) {
            (Some(source), Some(coding)) => Ok(Some(LandCover {
                raster: source.sample(grid)?,
                coding: coding.clone(),
            })),
            _ => Ok(None),
        }
    }

    fn variant_ids(&self, grid_id: &str) -> Vec<TrainId> {
        self.config
            .augmentations
            .iter()
            .flat_map(|aug| aug.variant_ids(&self.config.group_id, grid_id))
            .collect()
    }

    fn sample_meta(
        &self,
        grid_id: &str,
        grid: &RasterGrid,
        geo_bounds: Option<[f64; 4]>,
    ) -> SampleMeta {
        let end_year = self
            .config
            .group_id
            .rsplit('_')
            .next()
            .and_then(|token| token.parse::<i32>().ok());
        let shape = self.raster.shape();
        SampleMeta {
            group_id: self.config.group_id.clone(),
            grid_id: grid_id.to_owned(),
            start_year: end_year.map(|y| y - 1),
            end_year,
            bounds: grid.bounds.to_array(),
            geo_bounds,
            resolution: self.config.resolution,
            time_steps: shape.time_steps,
            bands_per_step: shape.bands_per_step,
        }
    }

    /// Produce and persist every augmentation variant independently:
    /// one variant's failure is logged and does not stop the others.
    fn persist_variants(&self, base: &LabeledSample, meta: &SampleMeta) -> (usize, usize) {
        let mut written = 0;
        let mut failed = 0;
        for aug in &self.config.augmentations {
            let augmenter = self
                .augmenters
                .get(&aug.name)
                .map_or(&IDENTITY as &dyn Augmenter, AsRef::as_ref);
            for id in aug.variant_ids(&self.config.group_id, &meta.grid_id) {
                if self.store.contains(&id) {
                    continue;
                }
                let variant = augmenter.apply(base, id.temporal_index);
                let record = TrainingRecord {
                    id: id.clone(),
                    stack: variant.stack,
                    labels: variant.labels,
                    distance: variant.distance,
                    segments: variant.segments,
                    descriptors: variant.descriptors,
                    meta: meta.clone(),
                };
                match self.store.write(&record) {
                    Ok(()) => written += 1,
                    Err(StoreError::DuplicateId { .. }) => {}
                    Err(err) => {
                        warn!("variant {id} failed: {err}");
                        failed += 1;
                    }
                }
            }
        }
        (written, failed)
    }
}

/// How a clipped boundary set relates to the cell grid.
enum TileScope {
    /// Only the current cell intersects: keep its clip and framing.
    SingleTile,
    /// Another cell already contributed this cross-tile boundary.
    AlreadyMerged,
    /// Cross-tile boundary claimed by the current cell: re-clipped
    /// set and the union framing of all intersecting cells.
    Merged {
        clipped: Vec<BoundaryPolygon>,
        bounds: Bounds,
        geo_bounds: Option<[f64; 4]>,
    },
}

/// Assign unique ids `1..=n` to the clipped polygons so touching
/// fields separate into distinct raster components.
fn renumber(polygons: &mut [BoundaryPolygon]) {
    for (position, boundary) in polygons.iter_mut().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let id = position as u32 + 1;
        boundary.class = id;
    }
}

/// Union bounding box of a clipped boundary set.
fn layer_bounds(polygons: &[BoundaryPolygon]) -> Option<Bounds> {
    polygons
        .iter()
        .filter_map(|b| Bounds::of_multi_polygon(&b.geometry))
        .reduce(|a, b| a.union(&b))
}

/// Component-wise union of `[min_lon, min_lat, max_lon, max_lat]`
/// boxes; `None` as soon as either side is missing.
fn union_geo(a: Option<[f64; 4]>, b: Option<[f64; 4]>) -> Option<[f64; 4]> {
    match (a, b) {
        (Some(a), Some(b)) => Some([
            a[0].min(b[0]),
            a[1].min(b[1]),
            a[2].max(b[2]),
            a[3].max(b[3]),
        ]),
        _ => None,
    }
}
