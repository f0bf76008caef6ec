//! Single-region pipeline
//!
//! Boundary validation, land-cover classification, the five mask builders
//! (run concurrently), composition, accounting and polygonization.

use super::diagnostics::{Dataset, Diagnostic};
use super::sources::DataSources;
use crate::constraint::{
    account, administrative_mask, classify_landcover, compose, protected_mask, riparian_mask, roads_mask,
    slope_mask, AreaStatistics, ConstraintParams, ExclusionMasks, LandCoverMasks, StageResults,
};
use crate::maybe_rayon::join;
use crate::polygonize::treatable_features;
use crate::rasterize::{burn_polygons, expand_rect, RegionGrid};
use crate::statistics::{class_areas, ClassAreas};
use crate::vector::{subregion_overlay, validate_region, SubregionOverlap};
use forestmgmt_core::{Error, Mask, ProtectedArea, Raster, Region, Result, TreatableFeature};
use forestmgmt_parallel::TiledProcessor;
use geo::{Coord, Geometry, Rect};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Everything computed for a region before accounting
#[derive(Debug, Clone)]
pub struct RegionEvaluation {
    pub grid: RegionGrid,
    /// Cells whose centre lies inside the region boundary
    pub region_mask: Mask,
    pub landcover: LandCoverMasks,
    pub masks: ExclusionMasks,
    pub stages: StageResults,
    pub diagnostics: Vec<Diagnostic>,
}

/// Final output for one region
#[derive(Debug, Clone)]
pub struct RegionResult {
    pub statistics: AreaStatistics,
    pub features: Vec<TreatableFeature>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A mask together with the dataset it lacked, if any
struct Built {
    mask: Mask,
    missing: Option<Dataset>,
}

impl Built {
    fn new(mask: Mask, empty: bool, dataset: Dataset) -> Self {
        Self {
            mask,
            missing: empty.then_some(dataset),
        }
    }
}

/// Region boundary prepared on its analysis grid
struct PreparedRegion {
    bounds: Rect<f64>,
    landcover: Option<Raster<u16>>,
    grid: RegionGrid,
    region_mask: Mask,
}

/// The constraint pipeline with its parameters and data sources bound
pub struct ConstraintPipeline {
    params: ConstraintParams,
    sources: DataSources,
    processor: TiledProcessor,
}

impl ConstraintPipeline {
    /// Validate `params` and bind the data sources.
    ///
    /// Fails with `InvalidParameter` before any region is touched.
    pub fn new(params: ConstraintParams, sources: DataSources) -> Result<Self> {
        params.validate()?;
        let processor = TiledProcessor::new(params.tile_size);
        Ok(Self {
            params,
            sources,
            processor,
        })
    }

    pub fn params(&self) -> &ConstraintParams {
        &self.params
    }

    /// Run all stages for one region, keeping every intermediate mask
    pub fn evaluate_region(&self, region: &Region) -> Result<RegionEvaluation> {
        let prepared = self.prepare(region)?;
        let grid = prepared.grid;
        debug!(region = %region.id, rows = grid.rows(), cols = grid.cols(), "region grid");

        let landcover = classify_landcover(
            prepared.landcover.as_ref(),
            &self.params.landcover_classes,
            &grid,
            &prepared.region_mask,
        )?;

        let mut diagnostics = Vec::new();
        if landcover.data.count() == 0 {
            diagnostics.push(Diagnostic::MissingExternalData {
                dataset: Dataset::LandCover,
            });
        }

        let (masks, missing) = self.build_masks(region, &prepared.bounds, &grid)?;
        diagnostics.extend(missing.into_iter().map(|dataset| Diagnostic::MissingExternalData { dataset }));

        let stages = compose(&landcover.candidate, &masks)?;
        if stages.candidate.count() == 0 {
            diagnostics.push(Diagnostic::ZeroCandidateArea);
        }

        for diagnostic in &diagnostics {
            warn!(region = %region.id, "{}", diagnostic);
        }

        Ok(RegionEvaluation {
            grid,
            region_mask: prepared.region_mask,
            landcover,
            masks,
            stages,
            diagnostics,
        })
    }

    /// Statistics and treatable polygons for one region
    pub fn run_region(&self, region: &Region) -> Result<RegionResult> {
        info!(region = %region.id, name = %region.name, "processing region");
        let evaluation = self.evaluate_region(region)?;

        let statistics = account(region, &evaluation.landcover.data, &evaluation.stages);
        debug!(region = %region.id, candidate_m2 = statistics.candidate_area_m2, "candidate area");
        for stage in &statistics.stages {
            debug!(
                region = %region.id,
                stage = %stage.stage,
                area_m2 = stage.area_m2,
                retained = ?stage.retained_fraction,
                "stage area"
            );
        }

        let features = treatable_features(&region.id, &evaluation.stages.candidate, evaluation.stages.treatable())?;

        info!(
            region = %region.id,
            treatable_m2 = statistics.treatable_area_m2(),
            features = features.len(),
            "region complete"
        );

        Ok(RegionResult {
            statistics,
            features,
            diagnostics: evaluation.diagnostics,
        })
    }

    /// Land-cover area per class code inside the region
    pub fn class_areas(&self, region: &Region) -> Result<ClassAreas> {
        let prepared = self.prepare(region)?;
        match prepared.landcover {
            Some(raster) => class_areas(region, &raster, &prepared.grid, &prepared.region_mask),
            None => {
                warn!(region = %region.id, "no land cover data for region");
                Ok(ClassAreas {
                    region_id: region.id.clone(),
                    region_name: region.name.clone(),
                    classes: BTreeMap::new(),
                })
            }
        }
    }

    /// Sub-regions lying mostly inside the region, by the configured
    /// minimum overlap share
    pub fn subregion_overlay(&self, region: &Region) -> Result<Vec<SubregionOverlap>> {
        validate_region(region)?;
        let (Some(source), Some(bounds)) = (&self.sources.subregions, region.bounding_rect()) else {
            warn!(region = %region.id, "no sub-region data for region");
            return Ok(Vec::new());
        };

        let candidates = source.query(&bounds)?;
        let overlaps = subregion_overlay(region, &candidates, self.params.min_subregion_overlap)?;
        debug!(
            region = %region.id,
            candidates = candidates.len(),
            kept = overlaps.len(),
            "sub-region overlay"
        );
        Ok(overlaps)
    }

    fn prepare(&self, region: &Region) -> Result<PreparedRegion> {
        validate_region(region)?;
        let bounds = region.bounding_rect().ok_or_else(|| Error::Geometry {
            region: region.id.clone(),
            reason: "boundary has no extent".into(),
        })?;

        let landcover = self.sources.landcover.classify(region)?;
        let anchor = landcover
            .as_ref()
            .map(|r| Coord {
                x: r.transform().origin_x,
                y: r.transform().origin_y,
            })
            .unwrap_or(Coord { x: 0.0, y: 0.0 });

        let grid = RegionGrid::covering(&bounds, self.params.cell_size_m, anchor)?;
        let region_mask = burn_polygons(&region.geometry.0, &grid, &self.processor)?;

        Ok(PreparedRegion {
            bounds,
            landcover,
            grid,
            region_mask,
        })
    }

    /// Build the five masks concurrently; returns the datasets that had
    /// nothing for this region.
    fn build_masks(
        &self,
        region: &Region,
        bounds: &Rect<f64>,
        grid: &RegionGrid,
    ) -> Result<(ExclusionMasks, Vec<Dataset>)> {
        let protected_areas = match &self.sources.protected {
            Some(source) => source.query(bounds)?,
            None => Vec::new(),
        };

        let ((protected, slope), (administrative, (riparian, roads))) = join(
            || {
                join(
                    || self.protected_constraint(&protected_areas, grid),
                    || self.slope_constraint(region, grid),
                )
            },
            || {
                join(
                    || self.administrative_constraint(&protected_areas, bounds, grid),
                    || {
                        join(
                            || self.riparian_constraint(bounds, grid),
                            || self.roads_constraint(bounds, grid),
                        )
                    },
                )
            },
        );

        let built = [protected?, slope?, administrative?, riparian?, roads?];
        let missing = built.iter().filter_map(|b| b.missing).collect();
        let [protected, slope, administrative, riparian, roads] = built.map(|b| b.mask);

        Ok((
            ExclusionMasks {
                protected,
                slope,
                administrative,
                riparian,
                roads,
            },
            missing,
        ))
    }

    fn protected_constraint(&self, areas: &[ProtectedArea], grid: &RegionGrid) -> Result<Built> {
        let mask = protected_mask(areas, &self.params.gap_status_codes, grid, &self.processor)?;
        Ok(Built::new(mask, areas.is_empty(), Dataset::ProtectedLands))
    }

    fn slope_constraint(&self, region: &Region, grid: &RegionGrid) -> Result<Built> {
        let raster = match &self.sources.slope {
            Some(source) => source.slope_percent(region)?,
            None => None,
        };
        let mask = slope_mask(raster.as_ref(), self.params.max_slope_percent, grid)?;
        Ok(Built::new(mask, raster.is_none(), Dataset::Slope))
    }

    fn administrative_constraint(
        &self,
        areas: &[ProtectedArea],
        bounds: &Rect<f64>,
        grid: &RegionGrid,
    ) -> Result<Built> {
        let habitat = match &self.sources.habitat {
            Some(source) => source.query(bounds)?,
            None => Vec::new(),
        };
        let mask = administrative_mask(areas, &habitat, grid, &self.processor)?;
        Ok(Built::new(mask, habitat.is_empty(), Dataset::CriticalHabitat))
    }

    fn riparian_constraint(&self, bounds: &Rect<f64>, grid: &RegionGrid) -> Result<Built> {
        let buffer_m = self.params.riparian_buffer_m();
        let search = expand_rect(bounds, 2.0 * buffer_m);
        let mut waterways: Vec<Geometry<f64>> = Vec::new();
        for source in &self.sources.hydrography {
            waterways.extend(source.query(&search)?);
        }
        let mask = riparian_mask(&waterways, buffer_m, grid, &self.processor)?;
        Ok(Built::new(mask, waterways.is_empty(), Dataset::Hydrography))
    }

    fn roads_constraint(&self, bounds: &Rect<f64>, grid: &RegionGrid) -> Result<Built> {
        let buffer_m = self.params.road_buffer_m();
        let search = expand_rect(bounds, 2.0 * buffer_m);
        let roads = self
            .sources
            .roads
            .iter()
            .map(|source| source.query(&search))
            .collect::<Result<Vec<_>>>()?;
        let empty = roads.iter().all(Vec::is_empty);
        let mask = roads_mask(&roads, buffer_m, grid, &self.processor)?;
        Ok(Built::new(mask, empty, Dataset::Roads))
    }
}
