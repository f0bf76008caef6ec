//! Burning vector features into region masks
//!
//! Both entry points run tile by tile through [`TiledProcessor`], so large
//! regions never need more than one block of candidate work per thread.

use super::scanline::ScanPolygon;
use super::RegionGrid;
use forestmgmt_core::{Mask, Result};
use forestmgmt_parallel::{Tile, TiledProcessor};
use geo::{BoundingRect, Coord, EuclideanDistance, Geometry, Intersects, Line, Point, Polygon, Rect};
use ndarray::{s, Array2};

/// Expand a rectangle by `d` on every side
pub fn expand_rect(rect: &Rect<f64>, d: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - d,
            y: rect.min().y - d,
        },
        Coord {
            x: rect.max().x + d,
            y: rect.max().y + d,
        },
    )
}

/// Mask of cells whose centre lies inside any of `polygons`.
///
/// Each polygon is filled with the even-odd rule on its own and the results
/// are OR'ed, so overlapping polygons never cancel each other out.
pub fn burn_polygons(polygons: &[Polygon<f64>], grid: &RegionGrid, processor: &TiledProcessor) -> Result<Mask> {
    let extent = grid.extent();
    let scans: Vec<ScanPolygon> = polygons
        .iter()
        .filter(|p| p.bounding_rect().is_some_and(|b| b.intersects(&extent)))
        .map(|p| ScanPolygon::new(p, grid))
        .filter(|s| !s.row_span().is_empty())
        .collect();

    let (rows, cols) = grid.shape();
    if scans.is_empty() {
        return Ok(grid.empty_mask());
    }

    let data = processor.assemble(rows, cols, false, |tile| {
        let mut block = Array2::from_elem((tile.rows, tile.cols), false);
        for scan in &scans {
            let span = scan.row_span();
            if span.end <= tile.row_offset || span.start >= tile.row_offset + tile.rows {
                continue;
            }
            scan.fill_block(grid, tile.row_offset, tile.col_offset, &mut block.view_mut());
        }
        block
    })?;

    Ok(Mask::from_array(data, *grid.transform()))
}

/// Vector features split into the primitives a distance buffer works on
#[derive(Debug, Default)]
struct BufferSource {
    segments: Vec<(Line<f64>, Rect<f64>)>,
    points: Vec<Point<f64>>,
    areas: Vec<Polygon<f64>>,
}

impl BufferSource {
    fn push_geometry(&mut self, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(p) => self.points.push(*p),
            Geometry::MultiPoint(mp) => self.points.extend(mp.iter().copied()),
            Geometry::Line(l) => self.push_line(*l),
            Geometry::LineString(ls) => ls.lines().for_each(|l| self.push_line(l)),
            Geometry::MultiLineString(mls) => mls.iter().flat_map(|ls| ls.lines()).for_each(|l| self.push_line(l)),
            Geometry::Polygon(p) => self.push_polygon(p),
            Geometry::MultiPolygon(mp) => mp.iter().for_each(|p| self.push_polygon(p)),
            Geometry::Rect(r) => self.push_polygon(&r.to_polygon()),
            Geometry::Triangle(t) => self.push_polygon(&t.to_polygon()),
            Geometry::GeometryCollection(gc) => gc.iter().for_each(|g| self.push_geometry(g)),
        }
    }

    fn push_line(&mut self, line: Line<f64>) {
        if line.start == line.end {
            self.points.push(Point(line.start));
        } else {
            self.segments.push((line, line.bounding_rect()));
        }
    }

    fn push_polygon(&mut self, polygon: &Polygon<f64>) {
        polygon.exterior().lines().for_each(|l| self.push_line(l));
        for hole in polygon.interiors() {
            hole.lines().for_each(|l| self.push_line(l));
        }
        self.areas.push(polygon.clone());
    }

    fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.points.is_empty() && self.areas.is_empty()
    }
}

/// Mask of cells whose centre lies within `distance` of any feature.
///
/// Lines contribute a corridor around every segment, points a disc, and
/// polygons their filled interior plus a band around the boundary. A cell is
/// included when the distance from its centre is at most `distance`.
pub fn burn_buffered(
    geometries: &[Geometry<f64>],
    distance: f64,
    grid: &RegionGrid,
    processor: &TiledProcessor,
) -> Result<Mask> {
    let distance = distance.max(0.0);
    let reach = expand_rect(&grid.extent(), distance);

    let mut source = BufferSource::default();
    for geometry in geometries {
        if geometry.bounding_rect().is_some_and(|b| b.intersects(&reach)) {
            source.push_geometry(geometry);
        }
    }
    if source.is_empty() {
        return Ok(grid.empty_mask());
    }

    let mut mask = burn_polygons(&source.areas, grid, processor)?;
    if source.segments.is_empty() && source.points.is_empty() {
        return Ok(mask);
    }

    let (rows, cols) = grid.shape();
    let corridors = processor.assemble(rows, cols, false, |tile| {
        buffer_tile(&source, distance, grid, tile)
    })?;
    mask.union_with(&Mask::from_array(corridors, *grid.transform()))?;

    Ok(mask)
}

fn buffer_tile(source: &BufferSource, distance: f64, grid: &RegionGrid, tile: &Tile) -> Array2<bool> {
    let mut block = Array2::from_elem((tile.rows, tile.cols), false);

    let (x0, y_top) = grid.transform().pixel_to_geo_corner(tile.col_offset, tile.row_offset);
    let (x1, y_bottom) = grid
        .transform()
        .pixel_to_geo_corner(tile.col_offset + tile.cols, tile.row_offset + tile.rows);
    let tile_rect = Rect::new(Coord { x: x0, y: y_bottom }, Coord { x: x1, y: y_top });
    let tile_reach = expand_rect(&tile_rect, distance);

    let mut mark = |rect: &Rect<f64>, within: &dyn Fn(Point<f64>) -> bool| {
        let (rows, cols) = grid.cell_window(&expand_rect(rect, distance));
        let rows = rows.start.max(tile.row_offset)..rows.end.min(tile.row_offset + tile.rows);
        let cols = cols.start.max(tile.col_offset)..cols.end.min(tile.col_offset + tile.cols);
        if rows.is_empty() || cols.is_empty() {
            return;
        }
        let mut view = block.slice_mut(s![
            rows.start - tile.row_offset..rows.end - tile.row_offset,
            cols.start - tile.col_offset..cols.end - tile.col_offset
        ]);
        for ((r, c), cell) in view.indexed_iter_mut() {
            if *cell {
                continue;
            }
            let centre = grid.cell_center(rows.start + r, cols.start + c);
            if within(Point(centre)) {
                *cell = true;
            }
        }
    };

    for (line, bbox) in &source.segments {
        if !bbox.intersects(&tile_reach) {
            continue;
        }
        mark(bbox, &|p: Point<f64>| p.euclidean_distance(line) <= distance);
    }
    for point in &source.points {
        let bbox = Rect::new(point.0, point.0);
        if !bbox.intersects(&tile_reach) {
            continue;
        }
        mark(&bbox, &|p: Point<f64>| p.euclidean_distance(point) <= distance);
    }

    block
}
