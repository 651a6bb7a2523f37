//! arable-grid: vector-side orchestration for training-sample runs.
//!
//! Owns everything between loaded inputs and the labeling pipeline:
//! grid cells and boundary annotations, clipping with a one-shot
//! topology-repair protocol, the spatial index behind cross-tile
//! boundary merging, pixel-center rasterization, raster-source
//! collaborator traits, and the per-cell orchestration that fans each
//! sample out into its augmentation variants and persists them.

pub mod augment;
pub mod cell;
pub mod clip;
pub mod index;
pub mod orchestrator;
pub mod rasterize;
pub mod source;

pub use augment::{Augmentation, Augmenter, IdentityAugmenter};
pub use cell::{BoundaryLayer, BoundaryPolygon, Bounds, GridCell};
pub use clip::{TopologyError, clip_boundaries, repair};
pub use index::CellIndex;
pub use orchestrator::{
    CellOutcome, GridOrchestrator, MIN_EXTENT, OrchestratorConfig, RunError, RunSummary,
};
pub use rasterize::{RasterGrid, rasterize_classes};
pub use source::{
    LandCoverSource, RasterSource, SourceError, TimeSeriesShape, infer_time_steps, scale_stack,
};
