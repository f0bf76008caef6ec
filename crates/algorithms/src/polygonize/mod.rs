//! Raster-to-polygon conversion of binary masks
//!
//! Included cells are grouped into 4-connected components: cells that touch
//! only at a corner end up in different polygons. Each component is traced
//! along its cell edges, so polygon areas equal cell counts times cell area
//! exactly.

use crate::maybe_rayon::*;
use forestmgmt_core::{GeoTransform, Mask, Result, TreatableFeature};
use geo::orient::{Direction, Orient};
use geo::{Contains, Coord, LineString, Point, Polygon};
use ndarray::Array2;
use std::collections::{HashMap, VecDeque};

/// One connected patch of included cells
#[derive(Debug, Clone)]
pub struct Patch {
    pub polygon: Polygon<f64>,
    pub cell_count: usize,
    pub area_m2: f64,
}

/// Vertex in pixel-corner space: (col, row)
type Vertex = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> (i64, i64) {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Label 4-connected components of `true` cells.
///
/// Returns the cells of each component, in discovery order.
pub fn connected_components(mask: &Mask) -> Vec<Vec<(usize, usize)>> {
    let (rows, cols) = mask.shape();
    let mut seen = Array2::from_elem((rows, cols), false);
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for ((row, col), &included) in mask.data().indexed_iter() {
        if !included || seen[(row, col)] {
            continue;
        }

        let mut cells = Vec::new();
        seen[(row, col)] = true;
        queue.push_back((row, col));

        while let Some((r, c)) = queue.pop_front() {
            cells.push((r, c));
            let neighbours = [
                (r.wrapping_sub(1), c),
                (r + 1, c),
                (r, c.wrapping_sub(1)),
                (r, c + 1),
            ];
            for (nr, nc) in neighbours {
                if nr < rows && nc < cols && mask.get(nr, nc) && !seen[(nr, nc)] {
                    seen[(nr, nc)] = true;
                    queue.push_back((nr, nc));
                }
            }
        }

        components.push(cells);
    }

    components
}

/// Convert the included cells of `mask` into polygons, one per
/// 4-connected component (holes included).
pub fn polygonize(mask: &Mask) -> Vec<Patch> {
    let transform = *mask.transform();
    let cell_area = transform.cell_area();

    connected_components(mask)
        .into_par_iter()
        .flat_map(|cells| trace_component(mask, &cells, &transform, cell_area))
        .collect()
}

/// Treatable-area features for one region.
///
/// Treatable cells form the `treatable = true` polygons; candidate cells
/// removed by any stage form the `treatable = false` polygons. Cells that
/// were never candidates produce no feature.
pub fn treatable_features(region_id: &str, candidate: &Mask, treatable: &Mask) -> Result<Vec<TreatableFeature>> {
    let excluded = candidate.and_not(treatable)?;

    let mut features = Vec::new();
    for (cells, is_treatable) in [(treatable, true), (&excluded, false)] {
        features.extend(polygonize(cells).into_iter().map(|p| TreatableFeature {
            region_id: region_id.to_string(),
            treatable: is_treatable,
            geometry: p.polygon,
            cell_count: p.cell_count,
            area_m2: p.area_m2,
        }));
    }

    Ok(features)
}

fn trace_component(mask: &Mask, cells: &[(usize, usize)], transform: &GeoTransform, cell_area: f64) -> Vec<Patch> {
    let edges = boundary_edges(mask, cells);
    let rings = chain_rings(&edges);

    let mut exteriors: Vec<(Vec<Vertex>, f64, Vec<Vec<Vertex>>)> = Vec::new();
    let mut holes: Vec<(Vec<Vertex>, f64)> = Vec::new();
    for ring in rings {
        let ring = drop_collinear(ring);
        let area = shoelace(&ring);
        if area > 0.0 {
            exteriors.push((ring, area, Vec::new()));
        } else if area < 0.0 {
            holes.push((ring, area));
        }
    }

    if exteriors.len() == 1 {
        exteriors[0].2.extend(holes.into_iter().map(|(h, _)| h));
    } else {
        let outlines: Vec<Polygon<f64>> = exteriors
            .iter()
            .map(|(ring, _, _)| Polygon::new(pixel_ring(ring), Vec::new()))
            .collect();
        for (hole, _) in holes {
            let midpoint = Point::from(edge_midpoint(hole[0], hole[1 % hole.len()]));
            if let Some(i) = outlines.iter().position(|o| o.contains(&midpoint)) {
                exteriors[i].2.push(hole);
            }
        }
    }

    exteriors
        .into_iter()
        .map(|(ring, area, holes)| {
            let hole_area: f64 = holes.iter().map(|h| -shoelace(h)).sum();
            let cell_count = (area - hole_area).round().max(0.0) as usize;
            let polygon = Polygon::new(
                geo_ring(&ring, transform),
                holes.iter().map(|h| geo_ring(h, transform)).collect(),
            )
            .orient(Direction::Default);
            Patch {
                polygon,
                cell_count,
                area_m2: cell_count as f64 * cell_area,
            }
        })
        .collect()
}

/// Directed cell sides separating the component from everything else,
/// oriented so the component lies on the positive-cross side.
fn boundary_edges(mask: &Mask, cells: &[(usize, usize)]) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(cells.len() * 2);
    for &(row, col) in cells {
        let (r, c) = (row as i64, col as i64);
        if row == 0 || !mask.get(row - 1, col) {
            edges.push(Edge { from: (c, r), to: (c + 1, r) });
        }
        if !mask.get(row, col + 1) {
            edges.push(Edge { from: (c + 1, r), to: (c + 1, r + 1) });
        }
        if !mask.get(row + 1, col) {
            edges.push(Edge { from: (c + 1, r + 1), to: (c, r + 1) });
        }
        if col == 0 || !mask.get(row, col - 1) {
            edges.push(Edge { from: (c, r + 1), to: (c, r) });
        }
    }
    edges
}

/// Link boundary edges into closed rings.
///
/// Where two diagonal cells meet at a vertex there are two ways on; the
/// ring turns towards its own cell so diagonal neighbours are never joined.
fn chain_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut ring = vec![edges[start].from];
        let mut current = start;

        loop {
            let here = edges[current].to;
            let candidates: Vec<usize> = outgoing
                .get(&here)
                .map(|out| out.iter().copied().filter(|&i| !used[i] || i == start).collect())
                .unwrap_or_default();

            let next = match candidates.as_slice() {
                [] => None,
                [only] => Some(*only),
                many => {
                    let (dx, dy) = edges[current].direction();
                    many.iter()
                        .copied()
                        .find(|&i| {
                            let (ox, oy) = edges[i].direction();
                            dx * oy - dy * ox > 0
                        })
                        .or_else(|| many.first().copied())
                }
            };

            match next {
                Some(i) if i == start => break,
                Some(i) => {
                    used[i] = true;
                    ring.push(edges[i].from);
                    current = i;
                }
                None => break,
            }
        }

        if ring.len() >= 4 {
            rings.push(ring);
        }
    }

    rings
}

/// Remove vertices in the middle of straight runs; the ring stays open
fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 4 {
        return ring;
    }
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let d_in = (cur.0 - prev.0, cur.1 - prev.1);
            let d_out = (next.0 - cur.0, next.1 - cur.1);
            d_in.0 * d_out.1 - d_in.1 * d_out.0 != 0
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice-signed area halved, in pixel units (open ring)
fn shoelace(ring: &[Vertex]) -> f64 {
    let n = ring.len();
    let twice: i64 = (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum();
    twice as f64 / 2.0
}

fn edge_midpoint(a: Vertex, b: Vertex) -> Coord<f64> {
    Coord {
        x: (a.0 + b.0) as f64 / 2.0,
        y: (a.1 + b.1) as f64 / 2.0,
    }
}

fn pixel_ring(ring: &[Vertex]) -> LineString<f64> {
    ring.iter()
        .map(|&(x, y)| Coord {
            x: x as f64,
            y: y as f64,
        })
        .collect()
}

fn geo_ring(ring: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    ring.iter()
        .map(|&(col, row)| {
            let (x, y) = transform.pixel_to_geo_corner(col as usize, row as usize);
            Coord { x, y }
        })
        .collect()
}
