//! Per-region constraint pipeline and batch runner
//!
//! - **sources**: traits for the external datasets plus in-memory layers
//! - **diagnostics**: non-fatal conditions recorded on a region result
//! - **region**: one region from boundary to statistics and polygons
//! - **batch**: many regions, skipping the ones that fail

mod batch;
mod diagnostics;
mod region;
mod sources;

pub use batch::{BatchReport, RegionOutcome, RegionStatus};
pub use diagnostics::{Dataset, Diagnostic};
pub use region::{ConstraintPipeline, RegionEvaluation, RegionResult};
pub use sources::{
    DataSources, DemSlope, FeatureLayer, FeatureSource, HasEnvelope, LandCoverSource, RasterLayer, SlopeSource,
};
