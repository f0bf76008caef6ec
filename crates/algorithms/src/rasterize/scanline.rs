//! Even-odd scanline fill of polygons sampled at cell centres

use super::RegionGrid;
use geo::{LineString, Polygon};
use ndarray::ArrayViewMut2;
use std::ops::Range;

#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Edge {
    fn y_min(&self) -> f64 {
        self.y0.min(self.y1)
    }

    fn y_max(&self) -> f64 {
        self.y0.max(self.y1)
    }

    /// Half-open crossing test: the lower endpoint counts, the upper does not
    fn crossing(&self, y: f64) -> Option<f64> {
        if y < self.y_min() || y >= self.y_max() {
            return None;
        }
        let t = (y - self.y0) / (self.y1 - self.y0);
        Some(self.x0 + t * (self.x1 - self.x0))
    }
}

/// One polygon (exterior plus holes) prepared for filling on a grid.
///
/// Edges are bucketed by the grid rows whose centre line they cross, so a
/// row only visits the edges that can contribute a crossing.
#[derive(Debug, Clone)]
pub(crate) struct ScanPolygon {
    edges: Vec<Edge>,
    buckets: Vec<Vec<usize>>,
    rows: Range<usize>,
}

impl ScanPolygon {
    pub(crate) fn new(polygon: &Polygon<f64>, grid: &RegionGrid) -> Self {
        let mut edges = Vec::new();
        push_ring(polygon.exterior(), &mut edges);
        for hole in polygon.interiors() {
            push_ring(hole, &mut edges);
        }

        let t = grid.transform();
        let cs = grid.cell_size();
        let mut buckets: Vec<Vec<usize>> = Vec::new();
        let mut first = grid.rows();
        let mut last = 0usize;

        let mut spans = Vec::with_capacity(edges.len());
        for edge in &edges {
            let lo = ((t.origin_y - edge.y_max()) / cs - 0.5).floor();
            let hi = ((t.origin_y - edge.y_min()) / cs - 0.5).floor() + 1.0;
            let lo = lo.max(0.0).min(grid.rows() as f64) as usize;
            let hi = hi.max(0.0).min(grid.rows() as f64) as usize;
            if lo < hi {
                first = first.min(lo);
                last = last.max(hi);
            }
            spans.push(lo..hi);
        }

        if first < last {
            buckets.resize(last - first, Vec::new());
            for (i, span) in spans.into_iter().enumerate() {
                for row in span {
                    buckets[row - first].push(i);
                }
            }
        } else {
            first = 0;
            last = 0;
        }

        Self {
            edges,
            buckets,
            rows: first..last,
        }
    }

    /// Grid rows that may contain filled cells
    pub(crate) fn row_span(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// OR the polygon interior into `out`, a block whose top-left cell sits
    /// at grid (`row_offset`, `col_offset`).
    pub(crate) fn fill_block(
        &self,
        grid: &RegionGrid,
        row_offset: usize,
        col_offset: usize,
        out: &mut ArrayViewMut2<'_, bool>,
    ) {
        let (block_rows, block_cols) = out.dim();
        let row_end = (row_offset + block_rows).min(self.rows.end);
        let row_start = row_offset.max(self.rows.start);

        let t = grid.transform();
        let cs = grid.cell_size();
        let mut xs: Vec<f64> = Vec::new();

        for row in row_start..row_end {
            let y = t.origin_y - (row as f64 + 0.5) * cs;
            xs.clear();
            xs.extend(
                self.buckets[row - self.rows.start]
                    .iter()
                    .filter_map(|&i| self.edges[i].crossing(y)),
            );
            if xs.len() < 2 {
                continue;
            }
            xs.sort_by(|a, b| a.total_cmp(b));

            for pair in xs.chunks_exact(2) {
                let cols = centre_span(pair[0], pair[1], t.origin_x, cs);
                let c0 = cols.start.max(col_offset);
                let c1 = cols.end.min(col_offset + block_cols);
                for col in c0..c1 {
                    out[(row - row_offset, col - col_offset)] = true;
                }
            }
        }
    }
}

fn push_ring(ring: &LineString<f64>, edges: &mut Vec<Edge>) {
    for line in ring.lines() {
        if line.start.y == line.end.y {
            continue;
        }
        edges.push(Edge {
            x0: line.start.x,
            y0: line.start.y,
            x1: line.end.x,
            y1: line.end.y,
        });
    }
}

/// Columns whose centre x lies in `[xa, xb)`
fn centre_span(xa: f64, xb: f64, origin_x: f64, cs: f64) -> Range<usize> {
    let c0 = ((xa - origin_x) / cs - 0.5).ceil().max(0.0);
    let c1 = ((xb - origin_x) / cs - 0.5).ceil().max(0.0);
    (c0 as usize)..(c1 as usize).max(c0 as usize)
}
