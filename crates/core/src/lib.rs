//! # forestmgmt core
//!
//! Core types and I/O for forest management constraint analysis.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced raster grid
//! - `Mask`: binary raster of included / excluded cells
//! - `GeoTransform`: affine transformation for georeferencing
//! - `Region`, `ProtectedArea`, `TreatableFeature`: typed vector records
//! - I/O for GeoTIFF rasters and GeoJSON feature layers

pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Mask, Raster, RasterElement};
pub use vector::{AttributeValue, ProtectedArea, Region, TreatableFeature};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Mask, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, ProtectedArea, Region, TreatableFeature};
}
