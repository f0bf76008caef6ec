//! Rasterization onto per-region analysis grids
//!
//! - **grid**: snapped, north-up grid covering a region's envelope
//! - **scanline**: even-odd polygon fill by cell centre
//! - **burn**: tiled burning of polygons and distance buffers into masks
//! - **resample**: nearest-neighbour sampling of source rasters

mod burn;
mod grid;
mod resample;
mod scanline;

pub use burn::{burn_buffered, burn_polygons, expand_rect};
pub use grid::RegionGrid;
pub use resample::{sample_mask, sample_values};
