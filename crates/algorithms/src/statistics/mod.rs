//! Statistics over region grids
//!
//! - **zonal**: land-cover class area tabulation per region

pub mod zonal;

pub use zonal::{class_areas, ClassArea, ClassAreas};
