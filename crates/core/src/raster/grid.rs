//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{s, Array2, ArrayView2};

/// A georeferenced 2D raster grid.
///
/// Used for land-cover class codes (`Raster<u16>`), slope percent and
/// elevation (`Raster<f64>`). Rasters are treated as value-immutable by
/// the pipeline: every transformation produces a new raster.
///
/// # Example
///
/// ```ignore
/// use forestmgmt_core::{GeoTransform, Raster};
///
/// let mut landcover: Raster<u16> = Raster::filled(100, 100, 42);
/// landcover.set_transform(GeoTransform::new(500_000.0, 4_200_000.0, 30.0, -30.0));
/// assert_eq!(landcover.sample(500_015.0, 4_199_985.0), Some(42));
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Cell values stored row-major (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Builder-style transform setter
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder-style no-data setter
    pub fn with_nodata(mut self, nodata: Option<T>) -> Self {
        self.nodata = nodata;
        self
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Map bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Nearest-neighbour value at a map coordinate.
    ///
    /// Returns `None` outside the raster or on no-data cells.
    pub fn sample(&self, x: f64, y: f64) -> Option<T> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
            return None;
        }
        let value = self.data.get((row.floor() as usize, col.floor() as usize)).copied()?;
        (!self.is_nodata(value)).then_some(value)
    }

    /// Copy a rectangular window into a new raster with adjusted georeferencing.
    ///
    /// The window is clamped to the raster; `None` when nothing overlaps.
    pub fn window(&self, row: usize, col: usize, rows: usize, cols: usize) -> Option<Self> {
        let row_end = row.saturating_add(rows).min(self.rows());
        let col_end = col.saturating_add(cols).min(self.cols());
        if row >= row_end || col >= col_end {
            return None;
        }

        let (origin_x, origin_y) = self.transform.pixel_to_geo_corner(col, row);
        let transform = GeoTransform {
            origin_x,
            origin_y,
            ..self.transform
        };

        Some(Self {
            data: self.data.slice(s![row..row_end, col..col_end]).to_owned(),
            transform,
            nodata: self.nodata,
        })
    }

    /// Window covering a map-space bounding box, if any part overlaps.
    pub fn window_for_bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<Self> {
        let corners = [
            self.transform.geo_to_pixel(min_x, min_y),
            self.transform.geo_to_pixel(max_x, max_y),
            self.transform.geo_to_pixel(min_x, max_y),
            self.transform.geo_to_pixel(max_x, min_y),
        ];
        if corners.iter().any(|(c, r)| !(c.is_finite() && r.is_finite())) {
            return None;
        }

        let col0 = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min).floor();
        let col1 = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max).ceil();
        let row0 = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min).floor();
        let row1 = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max).ceil();

        if col1 <= 0.0 || row1 <= 0.0 || col0 >= self.cols() as f64 || row0 >= self.rows() as f64 {
            return None;
        }

        let col0 = col0.max(0.0) as usize;
        let row0 = row0.max(0.0) as usize;
        self.window(row0, col0, row1 as usize - row0, col1 as usize - col0)
    }
}
