//! Build field-boundary training samples from imagery and vector
//! annotations.
//!
//! Inputs: a JSON grid-cell list, a JSON boundary layer, and `.npy`
//! band rasters (one per band per acquisition date, grouped by parent
//! directory). Output: one `.npz` + `.json` record per grid cell and
//! augmentation variant, written append-only so interrupted runs
//! resume where they left off.

mod inputs;
mod npy;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use arable_grid::{Augmentation, CellOutcome, GridOrchestrator, OrchestratorConfig};
use arable_pipeline::{LabelKind, LandCoverCoding};
use arable_store::DirectoryStore;

use crate::npy::{NpyLandCoverSource, NpyRasterSource};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Grid-cell JSON file.
    #[arg(long)]
    grids: PathBuf,

    /// Boundary-annotation JSON file.
    #[arg(long)]
    boundaries: PathBuf,

    /// Image band `.npy` files, in band order, grouped by
    /// acquisition-date directory.
    #[arg(long, required = true, num_args = 1..)]
    images: Vec<PathBuf>,

    /// Projected "LEFT,TOP" origin shared by all image rasters.
    #[arg(long, value_name = "LEFT,TOP", value_parser = parse_f64_pair)]
    image_origin: (f64, f64),

    /// Output directory for training records.
    #[arg(short, long)]
    output: PathBuf,

    /// Group id tying records to their provenance; when its last
    /// `_`-separated token is a year, metadata derives the year range
    /// from it (e.g. "site_2021").
    #[arg(long)]
    group_id: String,

    /// Linear gain applied to raw image values.
    #[arg(long, default_value_t = 0.0001)]
    gain: f64,

    /// Offset added after the gain.
    #[arg(long, default_value_t = 0.0)]
    offset: f64,

    /// Ground resolution of one output pixel, in CRS units.
    #[arg(long, default_value_t = 10.0)]
    resolution: f64,

    /// Fixed output size "ROWS,COLS"; omitted, windows follow the
    /// natural cell extent.
    #[arg(long, value_name = "ROWS,COLS", value_parser = parse_usize_pair)]
    grid_size: Option<(usize, usize)>,

    /// Augmentation variants to produce; "ts-"-prefixed names are
    /// temporal and expand to indexed records.
    #[arg(long, value_delimiter = ',', default_value = "none")]
    augmentations: Vec<String>,

    /// Indexed records per temporal augmentation.
    #[arg(long, default_value_t = 2)]
    temporal_steps: usize,

    /// Land-cover `.npy` raster (same origin/resolution as images).
    #[arg(long)]
    land_cover: Option<PathBuf>,

    /// Land-cover codes treated as crops of interest; without any, a
    /// supplied land-cover raster is read as binary cropland.
    #[arg(long, value_delimiter = ',')]
    crop_codes: Vec<u16>,

    /// Label distinct crop-type classes instead of a single crop class.
    #[arg(long)]
    crop_types: bool,
}

fn parse_f64_pair(s: &str) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'A,B', got '{s}'"))?;
    let a: f64 = a.trim().parse().map_err(|e| format!("invalid '{a}': {e}"))?;
    let b: f64 = b.trim().parse().map_err(|e| format!("invalid '{b}': {e}"))?;
    Ok((a, b))
}

fn parse_usize_pair(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'ROWS,COLS', got '{s}'"))?;
    let a: usize = a.trim().parse().map_err(|e| format!("invalid '{a}': {e}"))?;
    let b: usize = b.trim().parse().map_err(|e| format!("invalid '{b}': {e}"))?;
    Ok((a, b))
}

fn outcome_message(outcome: &CellOutcome) -> String {
    match outcome {
        CellOutcome::Processed { written, failed: 0 } => format!("processed ({written} records)"),
        CellOutcome::Processed { written, failed } => {
            format!("processed ({written} records, {failed} variants failed)")
        }
        CellOutcome::NegativeSample { .. } => "negative sample".into(),
        CellOutcome::SkippedMerged => "skipped: merged into a neighboring cell".into(),
        CellOutcome::SkippedUndersized { rows, cols } => {
            format!("skipped: undersized ({rows}x{cols})")
        }
        CellOutcome::SkippedStored => "skipped: already stored".into(),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    let args = Args::parse();

    let cells = inputs::load_grid_cells(&args.grids)?;
    let boundaries = inputs::load_boundaries(&args.boundaries)?;
    info!(
        "loaded {} grid cells, {} boundary features",
        cells.len(),
        boundaries.polygons.len()
    );

    let (left, top) = args.image_origin;
    let raster = NpyRasterSource::load(&args.images, left, top)?;
    let land_cover = args
        .land_cover
        .as_deref()
        .map(|path| NpyLandCoverSource::load(path, left, top))
        .transpose()?;

    let store = DirectoryStore::open(&args.output)
        .with_context(|| format!("opening store {}", args.output.display()))?;

    let config = OrchestratorConfig {
        group_id: args.group_id.clone(),
        gain: args.gain,
        offset: args.offset,
        resolution: args.resolution,
        fixed_size: args.grid_size,
        augmentations: args
            .augmentations
            .iter()
            .map(|name| Augmentation::parse(name, args.temporal_steps))
            .collect(),
        kind: if args.crop_types {
            LabelKind::CropTypes
        } else {
            LabelKind::Boundaries
        },
        land_cover_coding: land_cover.as_ref().map(|_| {
            if args.crop_codes.is_empty() {
                LandCoverCoding::Binary
            } else {
                LandCoverCoding::Codes(args.crop_codes.clone())
            }
        }),
    };

    let mut orchestrator = GridOrchestrator::new(config, cells.clone(), boundaries, &raster, &store);
    if let Some(source) = &land_cover {
        orchestrator = orchestrator.with_land_cover(source);
    }

    let progress = ProgressBar::new(cells.len() as u64).with_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}",
        )?
        .progress_chars("##-"),
    );

    let summary = orchestrator.run(|cell, outcome| {
        progress.set_message(format!("{}: {}", cell.id, outcome_message(outcome)));
        progress.inc(1);
    })?;
    progress.finish_with_message("done");

    println!(
        "{} processed, {} negative, {} merged-skips, {} undersized, {} already stored; \
         {} records written, {} variants failed",
        summary.processed,
        summary.negative,
        summary.skipped_merged,
        summary.skipped_undersized,
        summary.skipped_stored,
        summary.records_written,
        summary.variants_failed,
    );
    Ok(())
}
