//! # forestmgmt algorithms
//!
//! Constraint masking of land-cover rasters for forest-management planning.
//!
//! ## Modules
//!
//! - **rasterize**: per-region grids, polygon fill and distance buffers
//! - **terrain**: slope from elevation
//! - **vector**: region boundary validation and sub-region overlay
//! - **constraint**: land-cover classifier, exclusion masks, sequential
//!   compositor and area accountant
//! - **statistics**: land-cover class area tabulation
//! - **polygonize**: 4-connected raster-to-polygon conversion
//! - **pipeline**: data-source seams, per-region and batch execution

pub mod constraint;
pub mod pipeline;
pub mod polygonize;
pub mod rasterize;
pub mod statistics;
pub mod terrain;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::constraint::{
        account, compose, feet_to_meters, AreaStatistics, ConstraintParams, ExclusionMasks, Stage, StageArea,
        StageResults,
    };
    pub use crate::pipeline::{
        BatchReport, ConstraintPipeline, DataSources, Dataset, DemSlope, Diagnostic, FeatureLayer, FeatureSource,
        LandCoverSource, RasterLayer, RegionEvaluation, RegionOutcome, RegionResult, RegionStatus, SlopeSource,
    };
    pub use crate::polygonize::{polygonize, treatable_features, Patch};
    pub use crate::rasterize::RegionGrid;
    pub use crate::statistics::{class_areas, ClassAreas};
    pub use crate::terrain::{slope, SlopeParams, SlopeUnits};
    pub use crate::vector::{subregion_overlay, SubregionOverlap};
    pub use forestmgmt_core::prelude::*;
}
