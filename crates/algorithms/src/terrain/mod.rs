//! Terrain derivatives used by the slope constraint
//!
//! - Slope: steepness from a DEM (Horn 1981), in percent rise by default

mod slope;

pub use slope::{slope, SlopeParams, SlopeUnits};
