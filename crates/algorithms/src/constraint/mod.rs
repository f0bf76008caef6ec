//! Constraint masking: classification, exclusion masks, composition and
//! area accounting
//!
//! - **params**: run configuration and unit conversion
//! - **landcover**: candidate cells by land-cover class
//! - **masks**: the protected, slope, administrative, riparian and roads builders
//! - **compositor**: fixed-order application of the masks
//! - **accounting**: area and retained fraction per stage

mod accounting;
mod compositor;
mod landcover;
mod masks;
mod params;

pub use accounting::{account, AreaStatistics, StageArea};
pub use compositor::{compose, Stage, StageResults};
pub use landcover::{classify_landcover, LandCoverMasks};
pub use masks::{
    administrative_mask, is_protected_exclusion, protected_mask, riparian_mask, roads_mask, slope_mask,
    ExclusionMasks, ADMINISTRATIVE_GAP_STATUS, ROADLESS_GAP_STATUS,
};
pub use params::{feet_to_meters, ConstraintParams, FEET_PER_METER};
