//! Region geometry validation
//!
//! A region boundary must be rasterizable: finite coordinates, closed rings
//! with at least three distinct vertices, non-zero area and no ring that
//! crosses itself or another ring of the same polygon. Different rings may
//! touch at single points, as holes in surveyed boundaries often do.

use forestmgmt_core::{Error, Region, Result};
use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Coord, Line, LineString, Polygon};

/// Check a region's boundary, reporting the first problem found
pub fn validate_region(region: &Region) -> Result<()> {
    let fail = |reason: String| Error::Geometry {
        region: region.id.clone(),
        reason,
    };

    if region.geometry.0.is_empty() {
        return Err(fail("boundary has no polygons".into()));
    }

    for (i, polygon) in region.geometry.iter().enumerate() {
        validate_polygon(polygon).map_err(|reason| fail(format!("polygon {}: {}", i, reason)))?;
    }

    if region.area() <= 0.0 {
        return Err(fail("boundary has zero area".into()));
    }

    Ok(())
}

/// Check one polygon; the error is a human-readable reason
pub fn validate_polygon(polygon: &Polygon<f64>) -> std::result::Result<(), String> {
    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
    for (r, ring) in rings.enumerate() {
        if ring.coords().any(|c| !(c.x.is_finite() && c.y.is_finite())) {
            return Err(format!("ring {} has non-finite coordinates", r));
        }
        if !ring.is_closed() || distinct_vertices(ring).len() < 4 {
            return Err(format!("ring {} has fewer than 3 distinct vertices", r));
        }
    }

    if let Some((a, b)) = first_crossing(polygon) {
        return Err(format!(
            "ring edges cross or overlap near ({:.3}, {:.3}) and ({:.3}, {:.3})",
            a.start.x, a.start.y, b.start.x, b.start.y
        ));
    }

    if polygon.unsigned_area() <= 0.0 {
        return Err("polygon has zero area".into());
    }

    Ok(())
}

/// Ring coordinates with consecutive repeats removed (still closed)
fn distinct_vertices(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = ring.coords().copied().collect();
    coords.dedup();
    coords
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    ring: usize,
    index: usize,
    ring_len: usize,
    line: Line<f64>,
    min_x: f64,
    max_x: f64,
}

impl Segment {
    fn adjacent(&self, other: &Segment) -> bool {
        if self.ring != other.ring {
            return false;
        }
        let (i, j) = (self.index.min(other.index), self.index.max(other.index));
        j - i == 1 || (i == 0 && j + 1 == self.ring_len)
    }

    /// Proper crossings and shared stretches always conflict. A touch at a
    /// single point is only a conflict within one ring.
    fn conflicts_with(&self, other: &Segment) -> bool {
        match line_intersection(self.line, other.line) {
            None => false,
            Some(LineIntersection::Collinear { .. }) => true,
            Some(LineIntersection::SinglePoint { is_proper, .. }) => is_proper || self.ring == other.ring,
        }
    }
}

/// Sweep segments by x extent and return the first pair of non-adjacent
/// edges in conflict.
fn first_crossing(polygon: &Polygon<f64>) -> Option<(Line<f64>, Line<f64>)> {
    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
    let mut segments: Vec<Segment> = Vec::new();
    for (r, ring) in rings.enumerate() {
        let coords = distinct_vertices(ring);
        let ring_len = coords.len().saturating_sub(1);
        for (index, pair) in coords.windows(2).enumerate() {
            let line = Line::new(pair[0], pair[1]);
            segments.push(Segment {
                ring: r,
                index,
                ring_len,
                line,
                min_x: pair[0].x.min(pair[1].x),
                max_x: pair[0].x.max(pair[1].x),
            });
        }
    }

    segments.sort_by(|a, b| a.min_x.total_cmp(&b.min_x));

    for (k, a) in segments.iter().enumerate() {
        for b in &segments[k + 1..] {
            if b.min_x > a.max_x {
                break;
            }
            if a.adjacent(b) {
                continue;
            }
            if a.conflicts_with(b) {
                return Some((a.line, b.line));
            }
        }
    }

    None
}
