//! Vector operations on region boundaries
//!
//! - **validate**: checks applied before rasterization
//! - **overlay**: sub-region intersection and overlap shares

mod overlay;
mod validate;

pub use overlay::{subregion_overlay, SubregionOverlap};
pub use validate::{validate_polygon, validate_region};
