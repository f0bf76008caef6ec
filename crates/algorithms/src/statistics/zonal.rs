//! Zonal class tabulation
//!
//! Counts the region cells of every land-cover class, the categorical
//! counterpart of the stage areas reported by the accountant.

use crate::rasterize::{sample_values, RegionGrid};
use forestmgmt_core::raster::Raster;
use forestmgmt_core::{Error, Mask, Region, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Cells and area of one class inside a region
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassArea {
    pub cell_count: usize,
    pub area_m2: f64,
}

/// Class areas of one region, keyed by class code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAreas {
    pub region_id: String,
    pub region_name: String,
    pub classes: BTreeMap<u16, ClassArea>,
}

impl ClassAreas {
    /// Area of `class`, zero when the class does not occur
    pub fn area_m2(&self, class: u16) -> f64 {
        self.classes.get(&class).map_or(0.0, |c| c.area_m2)
    }

    /// Sum over all classes
    pub fn total_area_m2(&self) -> f64 {
        self.classes.values().map(|c| c.area_m2).sum()
    }
}

/// Tabulate land-cover class areas over the cells of `region_mask`.
///
/// No-data cells and cells outside the raster are skipped.
pub fn class_areas(
    region: &Region,
    landcover: &Raster<u16>,
    grid: &RegionGrid,
    region_mask: &Mask,
) -> Result<ClassAreas> {
    if region_mask.shape() != grid.shape() {
        let (er, ec) = grid.shape();
        let (ar, ac) = region_mask.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let values = sample_values(landcover, grid);
    let mut counts: BTreeMap<u16, usize> = BTreeMap::new();

    for ((row, col), value) in values.indexed_iter() {
        if !region_mask.get(row, col) {
            continue;
        }
        if let Some(class) = value {
            *counts.entry(*class).or_default() += 1;
        }
    }

    let cell_area = grid.cell_area();
    let classes = counts
        .into_iter()
        .map(|(class, cell_count)| {
            (
                class,
                ClassArea {
                    cell_count,
                    area_m2: cell_count as f64 * cell_area,
                },
            )
        })
        .collect();

    Ok(ClassAreas {
        region_id: region.id.clone(),
        region_name: region.name.clone(),
        classes,
    })
}
