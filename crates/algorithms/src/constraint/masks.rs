//! Exclusion mask builders
//!
//! Each builder is a pure function of already-fetched external data, one
//! parameter and the region grid. Masks are not clipped to the region; the
//! compositor intersects everything with the candidate mask.

use crate::rasterize::{burn_buffered, burn_polygons, sample_mask, RegionGrid};
use forestmgmt_core::{Mask, ProtectedArea, Raster, Result};
use forestmgmt_parallel::TiledProcessor;
use geo::{Geometry, Polygon};

/// Protection status whose roadless-area units are always excluded
pub const ROADLESS_GAP_STATUS: u8 = 3;
/// Protection status feeding the administrative stage
pub const ADMINISTRATIVE_GAP_STATUS: u8 = 2;

/// The five constraint masks of one region, with their native polarity
#[derive(Debug, Clone)]
pub struct ExclusionMasks {
    /// `true` = inside an excluded protected area
    pub protected: Mask,
    /// `true` = slope at or below the threshold
    pub slope: Mask,
    /// `true` = inside an administratively withdrawn area
    pub administrative: Mask,
    /// `true` = within the riparian buffer of a waterway
    pub riparian: Mask,
    /// `true` = within access distance of a road or trail
    pub roads: Mask,
}

/// Whether a protected area is excluded by the protected-land stage
pub fn is_protected_exclusion(area: &ProtectedArea, gap_status_codes: &[u8]) -> bool {
    gap_status_codes.contains(&area.gap_status) || (area.gap_status == ROADLESS_GAP_STATUS && area.is_roadless())
}

/// Cells inside protected areas whose status is in `gap_status_codes`, or
/// inside status-3 inventoried roadless areas.
pub fn protected_mask(
    areas: &[ProtectedArea],
    gap_status_codes: &[u8],
    grid: &RegionGrid,
    processor: &TiledProcessor,
) -> Result<Mask> {
    let polygons: Vec<Polygon<f64>> = areas
        .iter()
        .filter(|a| is_protected_exclusion(a, gap_status_codes))
        .flat_map(|a| polygons_of(&a.geometry))
        .collect();
    burn_polygons(&polygons, grid, processor)
}

/// Cells whose slope is at most `max_slope_percent`.
///
/// Cells without slope data are excluded. With no slope raster at all the
/// constraint cannot be evaluated and every cell is included.
pub fn slope_mask(slope: Option<&Raster<f64>>, max_slope_percent: f64, grid: &RegionGrid) -> Result<Mask> {
    match slope {
        Some(raster) => sample_mask(raster, grid, |v| v <= max_slope_percent),
        None => Ok(grid.full_mask()),
    }
}

/// Cells inside status-2 protected areas or critical habitat.
///
/// Only the status-2 rule applies here; the roadless carve-out of the
/// protected-land stage is not repeated.
pub fn administrative_mask(
    areas: &[ProtectedArea],
    habitat: &[Geometry<f64>],
    grid: &RegionGrid,
    processor: &TiledProcessor,
) -> Result<Mask> {
    let polygons: Vec<Polygon<f64>> = areas
        .iter()
        .filter(|a| a.gap_status == ADMINISTRATIVE_GAP_STATUS)
        .flat_map(|a| polygons_of(&a.geometry))
        .chain(habitat.iter().flat_map(polygons_of))
        .collect();
    burn_polygons(&polygons, grid, processor)
}

/// Cells within `buffer_m` metres of any waterway
pub fn riparian_mask(
    waterways: &[Geometry<f64>],
    buffer_m: f64,
    grid: &RegionGrid,
    processor: &TiledProcessor,
) -> Result<Mask> {
    burn_buffered(waterways, buffer_m, grid, processor)
}

/// Cells within `buffer_m` metres of any road or trail, over all sources
pub fn roads_mask(
    sources: &[Vec<Geometry<f64>>],
    buffer_m: f64,
    grid: &RegionGrid,
    processor: &TiledProcessor,
) -> Result<Mask> {
    let mut mask = grid.empty_mask();
    for roads in sources {
        mask.union_with(&burn_buffered(roads, buffer_m, grid, processor)?)?;
    }
    Ok(mask)
}

/// Polygonal parts of a geometry; points and lines have no interior
pub(crate) fn polygons_of(geometry: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}
