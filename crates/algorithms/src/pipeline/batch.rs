//! Batch execution over many regions
//!
//! Regions are independent: each one runs to completion or is skipped with
//! the reason logged, and a failure never reaches the rest of the batch.

use super::region::{ConstraintPipeline, RegionResult};
use crate::statistics::ClassAreas;
use crate::vector::SubregionOverlap;
use forestmgmt_core::{Region, Result};
use forestmgmt_parallel::{ParallelStrategy, ProcessingMode};
use tracing::{info, warn};

/// What happened to one region
#[derive(Debug, Clone)]
pub enum RegionStatus<T> {
    Completed(T),
    Skipped { reason: String },
}

/// Outcome for one input region, in input order
#[derive(Debug, Clone)]
pub struct RegionOutcome<T = RegionResult> {
    pub region_id: String,
    pub region_name: String,
    pub status: RegionStatus<T>,
}

impl<T> RegionOutcome<T> {
    pub fn completed(&self) -> Option<&T> {
        match &self.status {
            RegionStatus::Completed(result) => Some(result),
            RegionStatus::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match &self.status {
            RegionStatus::Completed(_) => None,
            RegionStatus::Skipped { reason } => Some(reason),
        }
    }
}

/// Outcomes of a whole run
#[derive(Debug, Clone)]
pub struct BatchReport<T = RegionResult> {
    pub outcomes: Vec<RegionOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn completed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.completed().is_some()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.completed_count()
    }

    /// Results of the regions that completed
    pub fn results(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(|o| o.completed())
    }
}

impl ConstraintPipeline {
    /// Run every region, skipping those that fail
    pub fn run_batch(&self, regions: &[Region], mode: ProcessingMode) -> Result<BatchReport> {
        self.run_each(regions, mode, |region| self.run_region(region))
    }

    /// Tabulate land-cover classes for every region
    pub fn class_area_batch(&self, regions: &[Region], mode: ProcessingMode) -> Result<BatchReport<ClassAreas>> {
        self.run_each(regions, mode, |region| self.class_areas(region))
    }

    /// Overlay sub-regions on every region
    pub fn subregion_batch(
        &self,
        regions: &[Region],
        mode: ProcessingMode,
    ) -> Result<BatchReport<Vec<SubregionOverlap>>> {
        self.run_each(regions, mode, |region| self.subregion_overlay(region))
    }

    fn run_each<T, F>(&self, regions: &[Region], mode: ProcessingMode, f: F) -> Result<BatchReport<T>>
    where
        T: Send,
        F: Fn(&Region) -> Result<T> + Sync + Send,
    {
        let outcomes = mode.par_map(regions, |region| {
            let status = match f(region) {
                Ok(result) => RegionStatus::Completed(result),
                Err(e) => {
                    warn!(region = %region.id, error = %e, "skipping region");
                    RegionStatus::Skipped { reason: e.to_string() }
                }
            };
            RegionOutcome {
                region_id: region.id.clone(),
                region_name: region.name.clone(),
                status,
            }
        })?;

        let report = BatchReport { outcomes };
        info!(
            completed = report.completed_count(),
            skipped = report.skipped_count(),
            "batch finished"
        );
        Ok(report)
    }
}
