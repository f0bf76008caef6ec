//! Land-cover classifier: candidate cells by class membership

use crate::rasterize::{sample_mask, RegionGrid};
use forestmgmt_core::{Mask, Raster, Result};

/// Land-cover masks for one region
#[derive(Debug, Clone)]
pub struct LandCoverMasks {
    /// Region cells whose class is in the configured set
    pub candidate: Mask,
    /// Region cells with any land-cover value
    pub data: Mask,
}

/// Classify the region's cells against `classes`.
///
/// Cells outside the region, outside the raster or on no-data are
/// excluded from both masks. Without a raster both masks are empty.
pub fn classify_landcover(
    landcover: Option<&Raster<u16>>,
    classes: &[u16],
    grid: &RegionGrid,
    region_mask: &Mask,
) -> Result<LandCoverMasks> {
    let Some(raster) = landcover else {
        return Ok(LandCoverMasks {
            candidate: grid.empty_mask(),
            data: grid.empty_mask(),
        });
    };

    let data = sample_mask(raster, grid, |_| true)?.and(region_mask)?;
    let candidate = sample_mask(raster, grid, |v| classes.contains(&v))?.and(region_mask)?;

    Ok(LandCoverMasks { candidate, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forestmgmt_core::GeoTransform;
    use geo::{Coord, Rect};

    fn setup() -> (Raster<u16>, RegionGrid) {
        // 4x4 at 10 m: forest classes in the left half, water (11) on the
        // right, one no-data cell
        let mut values = Vec::new();
        for _row in 0..4 {
            values.extend_from_slice(&[41u16, 42, 11, 11]);
        }
        values[3] = 0;
        let raster = Raster::from_vec(values, 4, 4)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0))
            .with_nodata(Some(0));
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 40.0, y: 40.0 });
        let grid = RegionGrid::covering(&rect, 10.0, Coord { x: 0.0, y: 40.0 }).unwrap();
        (raster, grid)
    }

    #[test]
    fn test_class_membership() {
        let (raster, grid) = setup();
        let region = grid.full_mask();
        let masks = classify_landcover(Some(&raster), &[41, 42, 43], &grid, &region).unwrap();
        assert_eq!(masks.candidate.count(), 8);
        assert_eq!(masks.data.count(), 15);
        assert!(masks.candidate.is_subset_of(&masks.data));
    }

    #[test]
    fn test_clipped_to_region() {
        let (raster, grid) = setup();
        let region = Mask::from_fn(4, 4, *grid.transform(), |(r, _)| r < 2);
        let masks = classify_landcover(Some(&raster), &[41], &grid, &region).unwrap();
        assert_eq!(masks.candidate.count(), 2);
        assert!(masks.candidate.is_subset_of(&region));
    }

    #[test]
    fn test_missing_raster_gives_empty_masks() {
        let (_, grid) = setup();
        let masks = classify_landcover(None, &[41], &grid, &grid.full_mask()).unwrap();
        assert_eq!(masks.candidate.count(), 0);
        assert_eq!(masks.data.count(), 0);
        assert_eq!(masks.candidate.shape(), (4, 4));
    }
}
