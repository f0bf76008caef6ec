//! Area accountant: remaining area after every stage

use super::compositor::{Stage, StageResults};
use forestmgmt_core::{Mask, Region};
use serde::Serialize;

/// Area left after one stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageArea {
    pub stage: Stage,
    pub area_m2: f64,
    /// `area_m2 / candidate_area_m2`; `None` when the candidate area is zero
    pub retained_fraction: Option<f64>,
}

/// Per-region statistics record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaStatistics {
    pub region_id: String,
    pub region_name: String,
    /// Geometric area of the region boundary
    pub region_area_m2: f64,
    /// Region cells with any land-cover value
    pub landcover_area_m2: f64,
    pub candidate_area_m2: f64,
    pub stages: [StageArea; 5],
}

impl AreaStatistics {
    pub fn stage(&self, stage: Stage) -> &StageArea {
        &self.stages[stage.index()]
    }

    /// Final treatable area
    pub fn treatable_area_m2(&self) -> f64 {
        self.stage(Stage::Roads).area_m2
    }

    pub fn has_candidate_area(&self) -> bool {
        self.candidate_area_m2 > 0.0
    }
}

/// Tally stage areas for `region` from its stage snapshots
pub fn account(region: &Region, landcover_data: &Mask, results: &StageResults) -> AreaStatistics {
    let candidate_area_m2 = results.candidate.area();

    let stages = Stage::ALL.map(|stage| {
        let area_m2 = results.get(stage).area();
        let retained_fraction = (candidate_area_m2 > 0.0).then(|| (area_m2 / candidate_area_m2).clamp(0.0, 1.0));
        StageArea {
            stage,
            area_m2,
            retained_fraction,
        }
    });

    AreaStatistics {
        region_id: region.id.clone(),
        region_name: region.name.clone(),
        region_area_m2: region.area(),
        landcover_area_m2: landcover_data.area(),
        candidate_area_m2,
        stages,
    }
}
