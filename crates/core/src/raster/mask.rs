//! Binary masks over a georeferenced grid

use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use ndarray::{Array2, ArrayView2, Zip};

/// A binary raster: `true` cells are included, `false` cells are excluded
/// (failing the constraint, outside the region, or without data).
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<bool>,
    transform: GeoTransform,
}

impl Mask {
    /// All-excluded mask
    pub fn empty(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self::filled(rows, cols, transform, false)
    }

    /// Mask with every cell set to `value`
    pub fn filled(rows: usize, cols: usize, transform: GeoTransform, value: bool) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform,
        }
    }

    /// Wrap an existing boolean array
    pub fn from_array(data: Array2<bool>, transform: GeoTransform) -> Self {
        Self { data, transform }
    }

    /// Build a mask by evaluating `f(row, col)` for every cell
    pub fn from_fn<F>(rows: usize, cols: usize, transform: GeoTransform, f: F) -> Self
    where
        F: FnMut((usize, usize)) -> bool,
    {
        Self {
            data: Array2::from_shape_fn((rows, cols), f),
            transform,
        }
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Whether the cell is included; out-of-range cells are excluded
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data.get((row, col)).copied().unwrap_or(false)
    }

    /// Set a cell
    pub fn set(&mut self, row: usize, col: usize, value: bool) -> Result<()> {
        let (rows, cols) = self.shape();
        let cell = self.data.get_mut((row, col)).ok_or(Error::IndexOutOfBounds {
            row,
            col,
            rows,
            cols,
        })?;
        *cell = value;
        Ok(())
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<bool> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Number of included cells
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Ground area of included cells
    pub fn area(&self) -> f64 {
        self.count() as f64 * self.transform.cell_area()
    }

    fn check_same_shape(&self, other: &Mask) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    /// Cells included in both masks
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.check_same_shape(other)?;
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| a && b);
        Ok(Mask::from_array(data, self.transform))
    }

    /// Cells included here but not in `other`
    pub fn and_not(&self, other: &Mask) -> Result<Mask> {
        self.check_same_shape(other)?;
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| a && !b);
        Ok(Mask::from_array(data, self.transform))
    }

    /// In-place union with another mask of the same shape
    pub fn union_with(&mut self, other: &Mask) -> Result<()> {
        self.check_same_shape(other)?;
        Zip::from(&mut self.data)
            .and(&other.data)
            .for_each(|a, &b| *a = *a || b);
        Ok(())
    }

    /// Mask with every cell flipped
    pub fn inverted(&self) -> Mask {
        Mask::from_array(self.data.mapv(|v| !v), self.transform)
    }

    /// True when every included cell here is also included in `other`
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.shape() == other.shape()
            && Zip::from(&self.data)
                .and(&other.data)
                .all(|&a, &b| !a || b)
    }
}
