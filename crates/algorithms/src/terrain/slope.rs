//! Slope calculation from DEMs
//!
//! Calculates the rate of change of elevation using the Horn (1981) method,
//! which uses a 3x3 neighborhood to compute partial derivatives. The slope
//! constraint compares against percent rise, so that is the default unit.

use crate::maybe_rayon::*;
use forestmgmt_core::raster::Raster;
use forestmgmt_core::{Error, Result};
use ndarray::Array2;

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Percent rise (100 * tan of the angle)
    #[default]
    Percent,
    /// Degrees (0-90)
    Degrees,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    pub units: SlopeUnits,
    /// Multiplier applied to the horizontal cell size, for DEMs whose
    /// elevation unit differs from the ground unit
    pub z_factor: f64,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Percent,
            z_factor: 1.0,
        }
    }
}

/// Calculate slope from a DEM
///
/// Uses Horn's (1981) method with a 3x3 neighborhood:
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize)
///
/// Border cells and cells touching no-data get NaN (no-data) in the output.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    if !(params.z_factor.is_finite() && params.z_factor > 0.0) {
        return Err(Error::InvalidParameter {
            name: "z_factor",
            value: params.z_factor.to_string(),
            reason: "must be positive".into(),
        });
    }

    let (rows, cols) = dem.shape();
    let eight_cell_size = 8.0 * dem.cell_size() * params.z_factor;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            if row == 0 || row + 1 >= rows {
                return row_data;
            }

            for col in 1..cols.saturating_sub(1) {
                // SAFETY: row and col are at least one cell inside the raster
                let window = unsafe {
                    [
                        dem.get_unchecked(row - 1, col - 1),
                        dem.get_unchecked(row - 1, col),
                        dem.get_unchecked(row - 1, col + 1),
                        dem.get_unchecked(row, col - 1),
                        dem.get_unchecked(row, col),
                        dem.get_unchecked(row, col + 1),
                        dem.get_unchecked(row + 1, col - 1),
                        dem.get_unchecked(row + 1, col),
                        dem.get_unchecked(row + 1, col + 1),
                    ]
                };
                if window.iter().any(|&v| dem.is_nodata(v)) {
                    continue;
                }
                let [a, b, c, d, _, f, g, h, i] = window;

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cell_size;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_cell_size;
                let gradient = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();

                row_data[col] = match params.units {
                    SlopeUnits::Percent => gradient * 100.0,
                    SlopeUnits::Degrees => gradient.atan().to_degrees(),
                };
            }

            row_data
        })
        .collect();

    let data = Array2::from_shape_vec((rows, cols), output_data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(Raster::from_array(data)
        .with_transform(*dem.transform())
        .with_nodata(Some(f64::NAN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use forestmgmt_core::GeoTransform;

    /// Plane rising `rise` metres per 10 m cell eastward
    fn ramp(rise: f64) -> Raster<f64> {
        let mut dem = Raster::new(7, 7).with_transform(GeoTransform::new(0.0, 70.0, 10.0, -10.0));
        for row in 0..7 {
            for col in 0..7 {
                dem.set(row, col, col as f64 * rise).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_flat_is_zero() {
        let dem = Raster::filled(5, 5, 100.0).with_transform(GeoTransform::new(0.0, 50.0, 10.0, -10.0));
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert_relative_eq!(result.get(2, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_percent_rise() {
        // 3.5 m per 10 m is 35 %
        let result = slope(&ramp(3.5), SlopeParams::default()).unwrap();
        assert_relative_eq!(result.get(3, 3).unwrap(), 35.0, epsilon = 1e-9);
        assert_relative_eq!(result.get(1, 5).unwrap(), 35.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degrees() {
        let params = SlopeParams {
            units: SlopeUnits::Degrees,
            ..Default::default()
        };
        let result = slope(&ramp(10.0), params).unwrap();
        assert_relative_eq!(result.get(3, 3).unwrap(), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_border_and_nodata_are_nan() {
        let mut dem = ramp(1.0).with_nodata(Some(-9999.0));
        dem.set(3, 3, -9999.0).unwrap();
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert!(result.get(0, 3).unwrap().is_nan());
        assert!(result.get(3, 6).unwrap().is_nan());
        assert!(result.get(2, 2).unwrap().is_nan());
        assert!(result.get(5, 5).unwrap().is_finite());
        assert_eq!(result.data().iter().filter(|v| v.is_finite()).count(), 25 - 9);
    }

    #[test]
    fn test_rejects_bad_z_factor() {
        let params = SlopeParams {
            z_factor: 0.0,
            ..Default::default()
        };
        assert!(matches!(slope(&ramp(1.0), params), Err(Error::InvalidParameter { .. })));
    }
}
