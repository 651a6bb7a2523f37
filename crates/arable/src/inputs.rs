//! JSON input loading for grids and boundary annotations.
//!
//! The loader expects pre-projected coordinates (CRS handling happens
//! upstream); geographic bounds ride along per grid cell when the
//! producer supplies them.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use geo::{LineString, MultiPolygon, Polygon};
use serde::Deserialize;

use arable_grid::{BoundaryLayer, BoundaryPolygon, GridCell};

/// One grid cell as serialized by the upstream tiler.
#[derive(Debug, Deserialize)]
struct GridCellJson {
    id: String,
    /// Rings of `[x, y]` pairs; first ring is the exterior.
    rings: Vec<Vec<[f64; 2]>>,
    /// `[min_lon, min_lat, max_lon, max_lat]`.
    geo_bounds: Option<[f64; 4]>,
}

/// One boundary annotation feature.
#[derive(Debug, Deserialize)]
struct BoundaryJson {
    /// `0` = background, nonzero = field.
    class: u32,
    /// One entry per polygon part, each a list of rings.
    polygons: Vec<Vec<Vec<[f64; 2]>>>,
}

#[derive(Debug, Deserialize)]
struct BoundaryFileJson {
    /// `true` for filled field polygons, `false` for boundary traces.
    #[serde(default = "default_polygon_geometry")]
    polygon_geometry: bool,
    features: Vec<BoundaryJson>,
}

const fn default_polygon_geometry() -> bool {
    true
}

fn ring(coords: &[[f64; 2]]) -> LineString<f64> {
    LineString::from(coords.iter().map(|&[x, y]| (x, y)).collect::<Vec<_>>())
}

fn polygon(rings: &[Vec<[f64; 2]>]) -> Result<Polygon<f64>> {
    let Some((exterior, interiors)) = rings.split_first() else {
        bail!("polygon with no rings");
    };
    Ok(Polygon::new(
        ring(exterior),
        interiors.iter().map(|r| ring(r)).collect(),
    ))
}

/// Load grid cells, preserving input order.
pub fn load_grid_cells(path: &Path) -> Result<Vec<GridCell>> {
    let file = File::open(path).with_context(|| format!("opening grid file {}", path.display()))?;
    let raw: Vec<GridCellJson> =
        serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;

    let mut cells = Vec::with_capacity(raw.len());
    for entry in raw {
        let id = entry.id.clone();
        let geometry = polygon(&entry.rings).with_context(|| format!("grid cell {id}"))?;
        let cell = GridCell::new(entry.id, geometry, entry.geo_bounds)
            .with_context(|| format!("grid cell {id} has no extent"))?;
        cells.push(cell);
    }
    Ok(cells)
}

/// Load the boundary annotation layer.
pub fn load_boundaries(path: &Path) -> Result<BoundaryLayer> {
    let file =
        File::open(path).with_context(|| format!("opening boundary file {}", path.display()))?;
    let raw: BoundaryFileJson =
        serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;

    let mut polygons = Vec::with_capacity(raw.features.len());
    for (index, feature) in raw.features.iter().enumerate() {
        let parts = feature
            .polygons
            .iter()
            .map(|rings| polygon(rings).with_context(|| format!("boundary feature {index}")))
            .collect::<Result<Vec<_>>>()?;
        polygons.push(BoundaryPolygon {
            class: feature.class,
            geometry: MultiPolygon::new(parts),
        });
    }
    Ok(BoundaryLayer {
        polygons,
        polygon_geometry: raw.polygon_geometry,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_grid_cells_in_order() {
        let json = r#"[
            {"id": "b", "rings": [[[0,0],[10,0],[10,10],[0,10],[0,0]]], "geo_bounds": null},
            {"id": "a", "rings": [[[10,0],[20,0],[20,10],[10,10],[10,0]]],
             "geo_bounds": [-1.0, 50.0, -0.9, 50.1]}
        ]"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let cells = load_grid_cells(file.path()).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].id, "b");
        assert_eq!(cells[1].geo_bounds, Some([-1.0, 50.0, -0.9, 50.1]));
        assert!((cells[1].bounds.left - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn loads_boundary_layer_with_default_geometry_kind() {
        let json = r#"{
            "features": [
                {"class": 1, "polygons": [[[[0,0],[5,0],[5,5],[0,5],[0,0]]]]},
                {"class": 0, "polygons": [[[[5,0],[9,0],[9,5],[5,5],[5,0]]]]}
            ]
        }"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let layer = load_boundaries(file.path()).unwrap();
        assert!(layer.polygon_geometry);
        assert_eq!(layer.polygons.len(), 2);
        assert_eq!(layer.polygons[0].class, 1);
        assert_eq!(layer.polygons[1].class, 0);
    }

    #[test]
    fn empty_ring_list_is_an_error() {
        let json = r#"[{"id": "x", "rings": [], "geo_bounds": null}]"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        assert!(load_grid_cells(file.path()).is_err());
    }
}
