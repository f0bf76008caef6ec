//! End-to-end runs of the constraint pipeline over small synthetic regions.
//!
//! Every dataset is an in-memory layer on a 10 m grid so expected areas can
//! be counted by hand: the 100 m x 100 m test region holds exactly 100 cells.

use approx::assert_relative_eq;
use forestmgmt_algorithms::constraint::{ConstraintParams, Stage, FEET_PER_METER};
use forestmgmt_algorithms::pipeline::{
    ConstraintPipeline, DataSources, Dataset, Diagnostic, FeatureLayer, FeatureSource, RasterLayer, RegionStatus,
};
use forestmgmt_core::{Error, GeoTransform, ProtectedArea, Raster, Region, Result};
use forestmgmt_parallel::ProcessingMode;
use geo::{line_string, polygon, Geometry, Rect};

const CELL: f64 = 10.0;

fn transform() -> GeoTransform {
    GeoTransform::new(-1000.0, 1100.0, CELL, -CELL)
}

fn landcover(class: u16) -> RasterLayer<u16> {
    RasterLayer::new(Raster::filled(210, 210, class).with_transform(transform()))
}

fn uniform_slope(percent: f64) -> RasterLayer<f64> {
    RasterLayer::new(Raster::filled(210, 210, percent).with_transform(transform()))
}

fn square(id: &str, x0: f64, y0: f64, size: f64) -> Region {
    Region::from_polygon(
        id,
        format!("Forest {id}"),
        polygon![(x: x0, y: y0), (x: x0 + size, y: y0), (x: x0 + size, y: y0 + size), (x: x0, y: y0 + size)],
    )
}

fn params() -> ConstraintParams {
    ConstraintParams {
        cell_size_m: CELL,
        tile_size: 4,
        ..Default::default()
    }
}

fn feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

/// Road along y = 50 running well past both sides of the test square
fn centre_road() -> FeatureLayer<Geometry<f64>> {
    FeatureLayer::new(vec![Geometry::LineString(
        line_string![(x: -500.0, y: 50.0), (x: 600.0, y: 50.0)],
    )])
}

fn open_sources(class: u16) -> DataSources {
    DataSources::new(landcover(class))
        .with_slope(uniform_slope(10.0))
        .with_protected(FeatureLayer::<ProtectedArea>::new(Vec::new()))
        .with_roads(centre_road())
}

struct FailingSource;

impl FeatureSource<Geometry<f64>> for FailingSource {
    fn query(&self, _bounds: &Rect<f64>) -> Result<Vec<Geometry<f64>>> {
        Err(Error::DataSource {
            dataset: "roads".into(),
            reason: "service unavailable".into(),
        })
    }
}

#[test]
fn wide_road_buffer_keeps_full_candidate_area() {
    let params = ConstraintParams {
        road_buffer_distance: feet(600.0),
        ..params()
    };
    let pipeline = ConstraintPipeline::new(params, open_sources(41)).unwrap();
    let result = pipeline.run_region(&square("R1", 0.0, 0.0, 100.0)).unwrap();
    let stats = &result.statistics;

    assert_relative_eq!(stats.region_area_m2, 10_000.0);
    assert_relative_eq!(stats.candidate_area_m2, 10_000.0);
    assert_relative_eq!(stats.stage(Stage::Roads).area_m2, 10_000.0);
    assert_relative_eq!(stats.stage(Stage::Roads).retained_fraction.unwrap(), 1.0);

    let treatable: Vec<_> = result.features.iter().filter(|f| f.treatable).collect();
    assert_eq!(treatable.len(), 1);
    assert_relative_eq!(treatable[0].area_m2, 10_000.0);
    assert!(result.features.iter().all(|f| f.region_id == "R1"));
}

#[test]
fn zero_slope_threshold_removes_everything_downstream() {
    let params = ConstraintParams {
        max_slope_percent: 0.0,
        road_buffer_distance: feet(600.0),
        ..params()
    };
    let pipeline = ConstraintPipeline::new(params, open_sources(41)).unwrap();
    let stats = pipeline.run_region(&square("R1", 0.0, 0.0, 100.0)).unwrap().statistics;

    assert_relative_eq!(stats.stage(Stage::Protected).area_m2, 10_000.0);
    for stage in [Stage::Slope, Stage::Administrative, Stage::Riparian, Stage::Roads] {
        assert_eq!(stats.stage(stage).area_m2, 0.0);
        assert_eq!(stats.stage(stage).retained_fraction, Some(0.0));
    }
}

#[test]
fn zero_candidate_area_reports_undefined_ratios() {
    // Open water everywhere
    let pipeline = ConstraintPipeline::new(params(), open_sources(11)).unwrap();
    let result = pipeline.run_region(&square("R1", 0.0, 0.0, 100.0)).unwrap();
    let stats = &result.statistics;

    assert_relative_eq!(stats.landcover_area_m2, 10_000.0);
    assert_eq!(stats.candidate_area_m2, 0.0);
    for stage in &stats.stages {
        assert_eq!(stage.area_m2, 0.0);
        assert!(stage.retained_fraction.is_none());
    }
    assert!(result.diagnostics.contains(&Diagnostic::ZeroCandidateArea));
    assert!(result.features.is_empty());
}

#[test]
fn waterway_outside_region_still_buffers_in() {
    // Stream 24 m west of the region edge with a 30 m riparian buffer: the
    // first column of cells (centres 29 m away) must be excluded.
    let stream = FeatureLayer::new(vec![Geometry::LineString(
        line_string![(x: -24.0, y: -200.0), (x: -24.0, y: 300.0)],
    )]);
    let params = ConstraintParams {
        riparian_buffer_distance: feet(30.0),
        road_buffer_distance: feet(600.0),
        ..params()
    };
    let sources = open_sources(41).with_hydrography(stream);
    let pipeline = ConstraintPipeline::new(params, sources).unwrap();

    let small = pipeline.evaluate_region(&square("S", 0.0, 0.0, 100.0)).unwrap();
    assert_eq!(small.masks.riparian.count(), 10);
    assert_eq!(small.stages.get(Stage::Riparian).count(), 90);

    // The same cells are excluded when the region extends further east
    let large = pipeline.evaluate_region(&square("L", 0.0, 0.0, 300.0)).unwrap();
    let large_riparian = &large.masks.riparian;
    assert_eq!(large_riparian.count(), 30);
    for row in 0..10 {
        for col in 0..10 {
            assert_eq!(small.masks.riparian.get(row, col), large_riparian.get(row + 20, col));
        }
    }
}

#[test]
fn road_outside_region_still_buffers_in() {
    // Road 24 m west of the region edge with a 30 m buffer: only the first
    // column of cells (centres 29 m away) stays near enough to treat.
    let road = FeatureLayer::new(vec![Geometry::LineString(
        line_string![(x: -24.0, y: -200.0), (x: -24.0, y: 300.0)],
    )]);
    let params = ConstraintParams {
        road_buffer_distance: feet(30.0),
        ..params()
    };
    let sources = DataSources::new(landcover(41))
        .with_slope(uniform_slope(10.0))
        .with_protected(FeatureLayer::<ProtectedArea>::new(Vec::new()))
        .with_roads(road);
    let pipeline = ConstraintPipeline::new(params, sources).unwrap();

    let small = pipeline.evaluate_region(&square("S", 0.0, 0.0, 100.0)).unwrap();
    assert_eq!(small.masks.roads.count(), 10);
    assert_eq!(small.stages.get(Stage::Roads).count(), 10);
    for row in 0..10 {
        assert!(small.masks.roads.get(row, 0));
        assert!(!small.masks.roads.get(row, 1));
    }

    let large = pipeline.evaluate_region(&square("L", 0.0, 0.0, 300.0)).unwrap();
    assert_eq!(large.masks.roads.count(), 30);
    for row in 0..10 {
        for col in 0..10 {
            assert_eq!(small.masks.roads.get(row, col), large.masks.roads.get(row + 20, col));
        }
    }
}

#[test]
fn mixed_constraints_shrink_monotonically() {
    let protected = FeatureLayer::new(vec![
        // Wilderness strip along the west edge
        ProtectedArea::new(
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 20.0, y: 0.0), (x: 20.0, y: 100.0), (x: 0.0, y: 100.0)]),
            1,
            "DES",
        ),
        // Status-2 area along the south edge feeds the administrative stage
        ProtectedArea::new(
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0), (x: 100.0, y: 20.0), (x: 0.0, y: 20.0)]),
            2,
            "DES",
        ),
    ]);
    let habitat = FeatureLayer::new(vec![Geometry::Polygon(
        polygon![(x: 80.0, y: 80.0), (x: 100.0, y: 80.0), (x: 100.0, y: 100.0), (x: 80.0, y: 100.0)],
    )]);
    let stream = FeatureLayer::new(vec![Geometry::LineString(
        line_string![(x: 50.0, y: -50.0), (x: 50.0, y: 150.0)],
    )]);
    let road = FeatureLayer::new(vec![Geometry::LineString(
        line_string![(x: -50.0, y: 95.0), (x: 150.0, y: 95.0)],
    )]);

    let mut slope = Raster::filled(210, 210, 10.0).with_transform(transform());
    // Steep cells just north of the region's centre line
    for col in 0..210 {
        slope.set(104, col, 60.0).unwrap();
    }

    let sources = DataSources::new(landcover(42))
        .with_slope(RasterLayer::new(slope))
        .with_protected(protected)
        .with_habitat(habitat)
        .with_hydrography(stream)
        .with_roads(road);
    let params = ConstraintParams {
        riparian_buffer_distance: feet(6.0),
        road_buffer_distance: feet(55.0),
        ..params()
    };
    let pipeline = ConstraintPipeline::new(params, sources).unwrap();
    let region = square("MIX", 0.0, 0.0, 100.0);

    let evaluation = pipeline.evaluate_region(&region).unwrap();
    let stages = &evaluation.stages;
    assert!(stages.get(Stage::Protected).is_subset_of(&stages.candidate));
    let snapshots: Vec<_> = stages.iter().map(|(_, m)| m).collect();
    for pair in snapshots.windows(2) {
        assert!(pair[1].is_subset_of(pair[0]));
    }

    let stats = pipeline.run_region(&region).unwrap().statistics;
    let cells: Vec<f64> = stats.stages.iter().map(|s| s.area_m2 / 100.0).collect();
    // Wilderness strip removes two columns, the steep row eight more cells,
    // the status-2 strip and habitat corner twenty, the stream corridor
    // fourteen, and the road reaches only the top six rows.
    assert_eq!(cells, vec![80.0, 72.0, 52.0, 38.0, 26.0]);
    for pair in stats.stages.windows(2) {
        assert!(pair[1].area_m2 <= pair[0].area_m2);
    }
    for stage in &stats.stages {
        let fraction = stage.retained_fraction.unwrap();
        assert!((0.0..=1.0).contains(&fraction));
    }
}

#[test]
fn missing_datasets_are_diagnostics_not_errors() {
    let pipeline = ConstraintPipeline::new(params(), DataSources::new(landcover(41))).unwrap();
    let result = pipeline.run_region(&square("R1", 0.0, 0.0, 100.0)).unwrap();

    for dataset in [
        Dataset::Slope,
        Dataset::ProtectedLands,
        Dataset::CriticalHabitat,
        Dataset::Hydrography,
        Dataset::Roads,
    ] {
        assert!(result
            .diagnostics
            .contains(&Diagnostic::MissingExternalData { dataset }));
    }
    // No road data means no cell is within access distance
    assert_relative_eq!(result.statistics.stage(Stage::Riparian).area_m2, 10_000.0);
    assert_eq!(result.statistics.treatable_area_m2(), 0.0);
}

#[test]
fn bad_regions_are_skipped_and_the_batch_continues() {
    let pipeline = ConstraintPipeline::new(params(), open_sources(41)).unwrap();
    let bowtie = Region::from_polygon(
        "BOW",
        "Bow tie",
        polygon![(x: 0.0, y: 0.0), (x: 100.0, y: 100.0), (x: 100.0, y: 0.0), (x: 0.0, y: 100.0)],
    );
    let regions = vec![
        square("A", 0.0, 0.0, 100.0),
        bowtie,
        square("B", 200.0, 200.0, 50.0),
    ];

    for mode in [ProcessingMode::Sequential, ProcessingMode::Parallel] {
        let report = pipeline.run_batch(&regions, mode).unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.completed_count(), 2);
        assert_eq!(report.skipped_count(), 1);

        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.region_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "BOW", "B"]);
        match &report.outcomes[1].status {
            RegionStatus::Skipped { reason } => assert!(reason.contains("BOW"), "{reason}"),
            RegionStatus::Completed(_) => panic!("bow tie region should be skipped"),
        }
        assert_relative_eq!(report.outcomes[2].completed().unwrap().statistics.candidate_area_m2, 2_500.0);
    }
}

#[test]
fn failed_fetch_skips_only_that_region() {
    let sources = DataSources::new(landcover(41)).with_roads(FailingSource);
    let pipeline = ConstraintPipeline::new(params(), sources).unwrap();
    let report = pipeline
        .run_batch(&[square("A", 0.0, 0.0, 100.0)], ProcessingMode::Sequential)
        .unwrap();
    assert_eq!(report.skipped_count(), 1);
    assert!(report.outcomes[0].skip_reason().unwrap().contains("service unavailable"));
}

#[test]
fn invalid_parameters_are_rejected_up_front() {
    let bad = ConstraintParams {
        road_buffer_distance: -10.0,
        ..params()
    };
    let result = ConstraintPipeline::new(bad, open_sources(41));
    assert!(matches!(result, Err(Error::InvalidParameter { name: "road_buffer_distance", .. })));

    let empty = ConstraintParams {
        landcover_classes: Vec::new(),
        ..params()
    };
    assert!(ConstraintPipeline::new(empty, open_sources(41)).is_err());
}

#[test]
fn road_buffer_feet_are_converted_to_meters() {
    let params = ConstraintParams::default();
    assert_relative_eq!(params.road_buffer_m(), 609.6, epsilon = 0.1);
}

#[test]
fn class_areas_tabulate_region_cells() {
    let pipeline = ConstraintPipeline::new(params(), open_sources(43)).unwrap();
    let report = pipeline
        .class_area_batch(&[square("A", 0.0, 0.0, 100.0)], ProcessingMode::Sequential)
        .unwrap();
    let areas = report.outcomes[0].completed().unwrap();
    assert_relative_eq!(areas.area_m2(43), 10_000.0);
    assert_eq!(areas.classes.len(), 1);
}

#[test]
fn subregion_overlay_keeps_units_mostly_inside() {
    let units = FeatureLayer::new(vec![
        square("HUC-A", 10.0, 10.0, 40.0),
        // x 70..130: half inside
        square("HUC-B", 70.0, 20.0, 60.0),
        // x 90..140: a fifth inside
        square("HUC-C", 90.0, 20.0, 50.0),
        square("HUC-D", 1000.0, 1000.0, 10.0),
    ]);
    let sources = DataSources::new(landcover(41)).with_subregions(units);
    let pipeline = ConstraintPipeline::new(params(), sources).unwrap();

    let regions = vec![square("R1", 0.0, 0.0, 100.0), square("R2", 2000.0, 2000.0, 100.0)];
    let report = pipeline.subregion_batch(&regions, ProcessingMode::Sequential).unwrap();
    assert_eq!(report.completed_count(), 2);

    let r1 = report.outcomes[0].completed().unwrap();
    let ids: Vec<&str> = r1.iter().map(|o| o.subregion_id.as_str()).collect();
    assert_eq!(ids, vec!["HUC-A", "HUC-B"]);
    assert_relative_eq!(r1[1].intersection_area_m2, 1_800.0, epsilon = 1e-6);
    assert_relative_eq!(r1[1].overlap_fraction, 0.5, epsilon = 1e-9);
    assert!(report.outcomes[1].completed().unwrap().is_empty());

    let looser = ConstraintPipeline::new(
        ConstraintParams {
            min_subregion_overlap: 0.1,
            ..params()
        },
        DataSources::new(landcover(41)).with_subregions(FeatureLayer::new(vec![square("HUC-C", 90.0, 20.0, 50.0)])),
    )
    .unwrap();
    let kept = looser.subregion_overlay(&square("R1", 0.0, 0.0, 100.0)).unwrap();
    assert_relative_eq!(kept[0].overlap_fraction, 0.2, epsilon = 1e-9);
}

#[test]
fn subregion_overlay_without_units_is_empty() {
    let pipeline = ConstraintPipeline::new(params(), DataSources::new(landcover(41))).unwrap();
    let overlaps = pipeline.subregion_overlay(&square("R1", 0.0, 0.0, 100.0)).unwrap();
    assert!(overlaps.is_empty());
}
