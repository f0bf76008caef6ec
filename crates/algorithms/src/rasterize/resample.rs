//! Nearest-neighbour sampling of source rasters onto a region grid

use super::RegionGrid;
use crate::maybe_rayon::*;
use forestmgmt_core::{Error, Mask, Raster, RasterElement, Result};
use ndarray::Array2;

/// Mask of cells where `raster` has data at the cell centre and the value
/// satisfies `predicate`.
///
/// Cells outside the raster or on no-data are excluded.
pub fn sample_mask<T, F>(raster: &Raster<T>, grid: &RegionGrid, predicate: F) -> Result<Mask>
where
    T: RasterElement,
    F: Fn(T) -> bool + Sync + Send,
{
    let (rows, cols) = grid.shape();

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let c = grid.cell_center(row, col);
                *cell = raster.sample(c.x, c.y).is_some_and(&predicate);
            }
            row_data
        })
        .collect();

    let data = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Mask::from_array(data, *grid.transform()))
}

/// Source values at every cell centre, `None` where there is no data
pub fn sample_values<T: RasterElement>(raster: &Raster<T>, grid: &RegionGrid) -> Array2<Option<T>> {
    Array2::from_shape_fn(grid.shape(), |(row, col)| {
        let c = grid.cell_center(row, col);
        raster.sample(c.x, c.y)
    })
}
