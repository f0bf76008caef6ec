//! Sequential compositor
//!
//! The five constraint masks are applied to the candidate mask in a fixed
//! order. Each stage keeps a snapshot of what survives so far, and every
//! snapshot is a subset of the one before it.

use super::masks::ExclusionMasks;
use forestmgmt_core::{Mask, Result};
use serde::Serialize;
use std::fmt;

/// Constraint stages in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Protected,
    Slope,
    Administrative,
    Riparian,
    Roads,
}

impl Stage {
    /// All stages, in the order they are applied
    pub const ALL: [Stage; 5] = [
        Stage::Protected,
        Stage::Slope,
        Stage::Administrative,
        Stage::Riparian,
        Stage::Roads,
    ];

    /// Position in the application order (0-based)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Protected => "protected",
            Stage::Slope => "slope",
            Stage::Administrative => "administrative",
            Stage::Riparian => "riparian",
            Stage::Roads => "roads",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Candidate mask and the surviving cells after each stage
#[derive(Debug, Clone)]
pub struct StageResults {
    pub candidate: Mask,
    stages: [Mask; 5],
}

impl StageResults {
    /// Snapshot taken right after `stage` was applied
    pub fn get(&self, stage: Stage) -> &Mask {
        &self.stages[stage.index()]
    }

    /// Snapshots in application order
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &Mask)> {
        Stage::ALL.into_iter().zip(self.stages.iter())
    }

    /// Final treatable cells
    pub fn treatable(&self) -> &Mask {
        self.get(Stage::Roads)
    }
}

/// Apply the constraint masks to `candidate` in stage order:
///
/// 1. protected = candidate AND NOT protected-excluded
/// 2. slope = protected AND slope-included
/// 3. administrative = slope AND NOT administrative-excluded
/// 4. riparian = administrative AND NOT riparian-excluded
/// 5. roads = riparian AND roads-included
pub fn compose(candidate: &Mask, masks: &ExclusionMasks) -> Result<StageResults> {
    let protected = candidate.and_not(&masks.protected)?;
    let slope = protected.and(&masks.slope)?;
    let administrative = slope.and_not(&masks.administrative)?;
    let riparian = administrative.and_not(&masks.riparian)?;
    let roads = riparian.and(&masks.roads)?;

    Ok(StageResults {
        candidate: candidate.clone(),
        stages: [protected, slope, administrative, riparian, roads],
    })
}
