//! Per-region analysis grid

use forestmgmt_core::{Error, GeoTransform, Mask, Result};
use geo::{Coord, Rect};

/// A north-up grid of square cells covering one region.
///
/// The envelope is snapped outward to multiples of the cell size measured
/// from an anchor point (the land-cover raster origin), so cells of every
/// region line up with the source classification grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionGrid {
    transform: GeoTransform,
    rows: usize,
    cols: usize,
}

impl RegionGrid {
    /// Grid covering `rect` with `cell_size` cells aligned on `anchor`
    pub fn covering(rect: &Rect<f64>, cell_size: f64, anchor: Coord<f64>) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(Error::InvalidParameter {
                name: "cell_size_m",
                value: cell_size.to_string(),
                reason: "must be a positive number of metres".into(),
            });
        }

        let snap_down = |v: f64, a: f64| a + ((v - a) / cell_size).floor() * cell_size;
        let snap_up = |v: f64, a: f64| a + ((v - a) / cell_size).ceil() * cell_size;

        let min_x = snap_down(rect.min().x, anchor.x);
        let max_x = snap_up(rect.max().x, anchor.x);
        let min_y = snap_down(rect.min().y, anchor.y);
        let max_y = snap_up(rect.max().y, anchor.y);

        let cols = (((max_x - min_x) / cell_size).round() as usize).max(1);
        let rows = (((max_y - min_y) / cell_size).round() as usize).max(1);

        Ok(Self {
            transform: GeoTransform::new(min_x, max_y, cell_size, -cell_size),
            rows,
            cols,
        })
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    pub fn cell_area(&self) -> f64 {
        self.transform.cell_area()
    }

    /// Map coordinates of a cell centre
    pub fn cell_center(&self, row: usize, col: usize) -> Coord<f64> {
        let (x, y) = self.transform.pixel_to_geo(col, row);
        Coord { x, y }
    }

    /// Envelope of the whole grid
    pub fn extent(&self) -> Rect<f64> {
        let (min_x, min_y, max_x, max_y) = self.transform.bounds(self.cols, self.rows);
        Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })
    }

    /// Row and column ranges (end exclusive) of cells whose centres may fall
    /// inside `rect`, clamped to the grid.
    pub fn cell_window(&self, rect: &Rect<f64>) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let cs = self.cell_size();
        let ox = self.transform.origin_x;
        let oy = self.transform.origin_y;

        let clamp = |v: f64, hi: usize| -> usize { v.max(0.0).min(hi as f64) as usize };

        let col0 = clamp(((rect.min().x - ox) / cs - 0.5).ceil(), self.cols);
        let col1 = clamp(((rect.max().x - ox) / cs - 0.5).floor() + 1.0, self.cols);
        let row0 = clamp(((oy - rect.max().y) / cs - 0.5).ceil(), self.rows);
        let row1 = clamp(((oy - rect.min().y) / cs - 0.5).floor() + 1.0, self.rows);

        (row0..row1.max(row0), col0..col1.max(col0))
    }

    /// All-excluded mask on this grid
    pub fn empty_mask(&self) -> Mask {
        Mask::empty(self.rows, self.cols, self.transform)
    }

    /// All-included mask on this grid
    pub fn full_mask(&self) -> Mask {
        Mask::filled(self.rows, self.cols, self.transform, true)
    }
}
