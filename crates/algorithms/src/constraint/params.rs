//! Constraint parameters for one pipeline run

use forestmgmt_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Feet in one metre, the factor used for every buffer distance
pub const FEET_PER_METER: f64 = 3.2808;

/// Convert a distance in feet to metres
pub fn feet_to_meters(feet: f64) -> f64 {
    feet / FEET_PER_METER
}

/// Run configuration shared by every region.
///
/// Buffer distances are given in feet and converted with [`feet_to_meters`]
/// before any buffering. Missing JSON fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstraintParams {
    /// Land-cover class codes treated as candidate cover
    pub landcover_classes: Vec<u16>,
    /// Steepest slope (percent rise) still considered treatable
    pub max_slope_percent: f64,
    /// Road/trail access distance in feet
    pub road_buffer_distance: f64,
    /// Waterway exclusion distance in feet
    pub riparian_buffer_distance: f64,
    /// Protection status codes excluded by the protected-land stage
    pub gap_status_codes: Vec<u8>,
    /// Analysis grid resolution in metres
    pub cell_size_m: f64,
    /// Edge length, in cells, of the tiles used for rasterization
    pub tile_size: usize,
    /// Smallest share of a sub-region's area that must fall inside a
    /// region for the pair to be reported by the overlay
    pub min_subregion_overlap: f64,
}

impl Default for ConstraintParams {
    fn default() -> Self {
        Self {
            landcover_classes: vec![41, 42, 43],
            max_slope_percent: 35.0,
            road_buffer_distance: 2000.0,
            riparian_buffer_distance: 100.0,
            gap_status_codes: vec![1],
            cell_size_m: 30.0,
            tile_size: 512,
            min_subregion_overlap: 0.25,
        }
    }
}

impl ConstraintParams {
    /// Road buffer in metres
    pub fn road_buffer_m(&self) -> f64 {
        feet_to_meters(self.road_buffer_distance)
    }

    /// Riparian buffer in metres
    pub fn riparian_buffer_m(&self) -> f64 {
        feet_to_meters(self.riparian_buffer_distance)
    }

    /// Reject configurations no region could be processed with
    pub fn validate(&self) -> Result<()> {
        if self.landcover_classes.is_empty() {
            return Err(invalid("landcover_classes", "[]", "at least one class code is required"));
        }

        non_negative("max_slope_percent", self.max_slope_percent)?;
        non_negative("road_buffer_distance", self.road_buffer_distance)?;
        non_negative("riparian_buffer_distance", self.riparian_buffer_distance)?;

        if !(self.cell_size_m.is_finite() && self.cell_size_m > 0.0) {
            return Err(invalid(
                "cell_size_m",
                &self.cell_size_m.to_string(),
                "must be a positive number of metres",
            ));
        }
        if self.tile_size == 0 {
            return Err(invalid("tile_size", "0", "must be at least one cell"));
        }
        if !(0.0..=1.0).contains(&self.min_subregion_overlap) {
            return Err(invalid(
                "min_subregion_overlap",
                &self.min_subregion_overlap.to_string(),
                "must be a fraction between 0 and 1",
            ));
        }

        Ok(())
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, &value.to_string(), "must be a finite, non-negative number"))
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
