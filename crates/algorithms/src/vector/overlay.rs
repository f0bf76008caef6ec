//! Sub-region overlay
//!
//! Intersects smaller reporting units (HUC-12 sub-watersheds, for example)
//! with a region and keeps the units that lie mostly inside it.

use super::validate_region;
use forestmgmt_core::{AttributeValue, Error, Region, Result};
use geo::{Area, BooleanOps, Intersects};
use std::collections::BTreeMap;
use tracing::warn;

/// The part of one sub-region that falls inside a region
#[derive(Debug, Clone)]
pub struct SubregionOverlap {
    pub region_id: String,
    pub subregion_id: String,
    pub subregion_name: String,
    /// Planar area of the whole sub-region
    pub subregion_area_m2: f64,
    /// Area of the sub-region inside the region
    pub intersection_area_m2: f64,
    /// `intersection_area_m2 / subregion_area_m2`, in `[0, 1]`
    pub overlap_fraction: f64,
    /// Attributes of the sub-region, carried to the export
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// Sub-regions whose share inside `region` is at least `min_fraction`.
///
/// Results follow the order of `subregions`. Pairs that only touch along
/// the boundary have no shared area and are never reported. Sub-regions
/// with invalid boundaries are logged and left out.
pub fn subregion_overlay(region: &Region, subregions: &[Region], min_fraction: f64) -> Result<Vec<SubregionOverlap>> {
    if !(0.0..=1.0).contains(&min_fraction) {
        return Err(Error::InvalidParameter {
            name: "min_subregion_overlap",
            value: min_fraction.to_string(),
            reason: "must be a fraction between 0 and 1".into(),
        });
    }

    let Some(bounds) = region.bounding_rect() else {
        return Ok(Vec::new());
    };

    let mut overlaps = Vec::new();
    for sub in subregions {
        if !sub.bounding_rect().is_some_and(|b| b.intersects(&bounds)) {
            continue;
        }
        if let Err(e) = validate_region(sub) {
            warn!(region = %region.id, subregion = %sub.id, error = %e, "skipping sub-region");
            continue;
        }

        let subregion_area = sub.area();
        let inside = region.geometry.intersection(&sub.geometry).unsigned_area();
        if inside <= 0.0 {
            continue;
        }

        let fraction = (inside / subregion_area).min(1.0);
        if fraction < min_fraction {
            continue;
        }

        overlaps.push(SubregionOverlap {
            region_id: region.id.clone(),
            subregion_id: sub.id.clone(),
            subregion_name: sub.name.clone(),
            subregion_area_m2: subregion_area,
            intersection_area_m2: inside,
            overlap_fraction: fraction,
            attributes: sub.attributes.clone(),
        });
    }

    Ok(overlaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::polygon;

    fn rect(id: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Region {
        Region::from_polygon(
            id,
            format!("Unit {id}"),
            polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)],
        )
    }

    #[test]
    fn test_overlap_fractions() {
        let forest = rect("F", 0.0, 0.0, 100.0, 100.0);
        let units = vec![
            // Entirely inside
            rect("inside", 10.0, 10.0, 30.0, 30.0),
            // Half inside
            rect("half", 80.0, 20.0, 120.0, 70.0),
            // A fifth inside
            rect("fifth", 90.0, 50.0, 140.0, 60.0),
            // Disjoint
            rect("far", 500.0, 500.0, 600.0, 600.0),
        ];

        let overlaps = subregion_overlay(&forest, &units, 0.25).unwrap();
        let ids: Vec<&str> = overlaps.iter().map(|o| o.subregion_id.as_str()).collect();
        assert_eq!(ids, vec!["inside", "half"]);

        assert_relative_eq!(overlaps[0].overlap_fraction, 1.0);
        assert_relative_eq!(overlaps[0].intersection_area_m2, 400.0, epsilon = 1e-6);
        assert_relative_eq!(overlaps[1].subregion_area_m2, 2000.0);
        assert_relative_eq!(overlaps[1].intersection_area_m2, 1000.0, epsilon = 1e-6);
        assert_relative_eq!(overlaps[1].overlap_fraction, 0.5, epsilon = 1e-9);
        assert_eq!(overlaps[1].region_id, "F");

        let all = subregion_overlay(&forest, &units, 0.0).unwrap();
        assert_eq!(all.len(), 3);
        assert_relative_eq!(all[2].overlap_fraction, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_boundary_touch_is_not_an_overlap() {
        let forest = rect("F", 0.0, 0.0, 100.0, 100.0);
        let neighbour = rect("N", 100.0, 100.0, 200.0, 200.0);
        assert!(subregion_overlay(&forest, &[neighbour], 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_attributes_are_carried() {
        let forest = rect("F", 0.0, 0.0, 100.0, 100.0);
        let unit = rect("101900050101", 10.0, 10.0, 60.0, 60.0)
            .with_attribute("states", AttributeValue::String("CO".into()));
        let overlaps = subregion_overlay(&forest, &[unit], 0.25).unwrap();
        assert_eq!(overlaps[0].attributes["states"].to_string(), "CO");
        assert_eq!(overlaps[0].subregion_name, "Unit 101900050101");
    }

    #[test]
    fn test_invalid_subregion_is_left_out() {
        let forest = rect("F", 0.0, 0.0, 100.0, 100.0);
        let bowtie = Region::from_polygon(
            "X",
            "Bowtie",
            polygon![(x: 0.0, y: 0.0), (x: 50.0, y: 50.0), (x: 50.0, y: 0.0), (x: 0.0, y: 50.0)],
        );
        let good = rect("G", 20.0, 20.0, 30.0, 30.0);
        let overlaps = subregion_overlay(&forest, &[bowtie, good], 0.25).unwrap();
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].subregion_id, "G");
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let forest = rect("F", 0.0, 0.0, 100.0, 100.0);
        assert!(matches!(
            subregion_overlay(&forest, &[], 1.5),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
