//! Mask vectorization
//!
//! Traces 4-connected components of set pixels into grid-aligned polygons
//! (exterior ring plus hole rings), recording the source pixel count of
//! each component. Components below the minimum count are discarded here,
//! before any geometry post-processing.

use std::collections::{HashMap, HashSet, VecDeque};

use geo::orient::{Direction, Orient};
use geo_types::{Coord, Geometry, LineString, Polygon};

use urbdiff_core::raster::Raster;
use urbdiff_core::vector::{AttributeValue, Feature, FeatureCollection, COUNT_ATTRIBUTE};
use urbdiff_core::Result;

/// Parameters for mask vectorization
#[derive(Debug, Clone, Copy)]
pub struct VectorizeParams {
    /// Minimum pixels per polygon; smaller components are treated as
    /// spurious detections and dropped (inclusive bound)
    pub min_pixel_count: usize,
}

impl Default for VectorizeParams {
    fn default() -> Self {
        Self { min_pixel_count: 15 }
    }
}

/// Convert a partial mask into polygon features.
///
/// Set pixels (non-NaN) are grouped into 4-connected components; each
/// surviving component becomes one polygon feature whose `count` property
/// is the number of source pixels. An empty mask yields an empty
/// collection, not an error. Feature order follows the row-major position
/// of each component's first pixel, so output is deterministic.
pub fn vectorize_mask(mask: &Raster<f64>, params: &VectorizeParams) -> Result<FeatureCollection> {
    let (rows, cols) = mask.shape();
    let mut visited = vec![false; rows * cols];
    let mut collection = FeatureCollection::new();

    for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;
            if visited[idx] {
                continue;
            }
            let v = unsafe { mask.get_unchecked(row, col) };
            if v.is_nan() {
                visited[idx] = true;
                continue;
            }

            let cells = flood_fill(mask, row, col, &mut visited);
            if cells.len() < params.min_pixel_count {
                continue;
            }

            let polygon = trace_component(&cells, mask);
            let feature = Feature::new(Geometry::Polygon(polygon))
                .with_property(COUNT_ATTRIBUTE, AttributeValue::Int(cells.len() as i64));
            collection.push(feature);
        }
    }

    Ok(collection)
}

/// Collect one 4-connected component via breadth-first search
fn flood_fill(
    mask: &Raster<f64>,
    start_row: usize,
    start_col: usize,
    visited: &mut [bool],
) -> Vec<(usize, usize)> {
    let (rows, cols) = mask.shape();
    let mut cells = Vec::new();
    let mut queue = VecDeque::new();

    visited[start_row * cols + start_col] = true;
    queue.push_back((start_row, start_col));

    while let Some((row, col)) = queue.pop_front() {
        cells.push((row, col));

        let neighbors = [
            (row.wrapping_sub(1), col),
            (row + 1, col),
            (row, col.wrapping_sub(1)),
            (row, col + 1),
        ];
        for (nr, nc) in neighbors {
            if nr >= rows || nc >= cols {
                continue;
            }
            let idx = nr * cols + nc;
            if visited[idx] {
                continue;
            }
            let v = unsafe { mask.get_unchecked(nr, nc) };
            if v.is_nan() {
                continue;
            }
            visited[idx] = true;
            queue.push_back((nr, nc));
        }
    }

    cells
}

/// Trace the boundary of a component into a polygon with holes.
///
/// Every cell side facing a non-component cell contributes one directed
/// edge, oriented so the component interior lies to the right (in raster
/// row-down coordinates). Chaining edges end to start yields the exterior
/// ring and any hole rings; at pinch vertices the sharpest left turn is
/// taken so rings never cross.
fn trace_component(cells: &[(usize, usize)], mask: &Raster<f64>) -> Polygon<f64> {
    let members: HashSet<(isize, isize)> = cells
        .iter()
        .map(|&(r, c)| (r as isize, c as isize))
        .collect();

    // Directed boundary edges in vertex grid coordinates (x=col, y=row)
    let mut edges: Vec<((i64, i64), (i64, i64))> = Vec::new();
    let mut sorted: Vec<(usize, usize)> = cells.to_vec();
    sorted.sort_unstable();

    for &(r, c) in &sorted {
        let (ri, ci) = (r as isize, c as isize);
        let (x, y) = (c as i64, r as i64);

        if !members.contains(&(ri - 1, ci)) {
            edges.push(((x, y), (x + 1, y))); // top
        }
        if !members.contains(&(ri, ci + 1)) {
            edges.push(((x + 1, y), (x + 1, y + 1))); // right
        }
        if !members.contains(&(ri + 1, ci)) {
            edges.push(((x + 1, y + 1), (x, y + 1))); // bottom
        }
        if !members.contains(&(ri, ci - 1)) {
            edges.push(((x, y + 1), (x, y))); // left
        }
    }

    let mut by_start: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        by_start.entry(edge.0).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings: Vec<Vec<(i64, i64)>> = Vec::new();

    for start_idx in 0..edges.len() {
        if used[start_idx] {
            continue;
        }

        let start_vertex = edges[start_idx].0;
        let mut ring = vec![start_vertex];
        let mut current = start_idx;

        loop {
            used[current] = true;
            let (from, to) = edges[current];
            ring.push(to);

            if to == start_vertex {
                break;
            }

            let dir_in = (to.0 - from.0, to.1 - from.1);
            let candidates = by_start.get(&to).map(Vec::as_slice).unwrap_or(&[]);
            let next = candidates
                .iter()
                .copied()
                .filter(|&i| !used[i])
                .min_by_key(|&i| {
                    let (f, t) = edges[i];
                    turn_rank(dir_in, (t.0 - f.0, t.1 - f.1))
                });

            match next {
                Some(i) => current = i,
                None => break, // degenerate; ring left as traced
            }
        }

        collapse_collinear(&mut ring);
        if ring.len() >= 4 {
            rings.push(ring);
        }
    }

    rings_to_polygon(rings, mask)
}

/// Rank a turn for boundary walking: left turn first, straight second,
/// right turn last (row-down coordinates, positive cross = right turn).
/// Preferring the left turn at a pinch vertex keeps each ring simple
/// instead of merging two rings into a self-touching one.
fn turn_rank(dir_in: (i64, i64), dir_out: (i64, i64)) -> u8 {
    let cross = dir_in.0 * dir_out.1 - dir_in.1 * dir_out.0;
    if cross < 0 {
        0
    } else if cross == 0 {
        1
    } else {
        2
    }
}

/// Drop intermediate vertices along straight runs; the ring stays closed
fn collapse_collinear(ring: &mut Vec<(i64, i64)>) {
    if ring.len() < 4 {
        return;
    }
    // Ring is closed: first == last. Work on the open form.
    ring.pop();

    let n = ring.len();
    let mut kept = Vec::with_capacity(n);
    for i in 0..n {
        let prev = ring[(i + n - 1) % n];
        let here = ring[i];
        let next = ring[(i + 1) % n];
        let d1 = (here.0 - prev.0, here.1 - prev.1);
        let d2 = (next.0 - here.0, next.1 - here.1);
        if d1.0 * d2.1 - d1.1 * d2.0 != 0 {
            kept.push(here);
        }
    }

    if let Some(&first) = kept.first() {
        kept.push(first);
    }
    *ring = kept;
}

/// Classify rings by signed area (exterior positive in row-down
/// coordinates), convert to geographic coordinates and assemble the
/// polygon in OGC winding
fn rings_to_polygon(rings: Vec<Vec<(i64, i64)>>, mask: &Raster<f64>) -> Polygon<f64> {
    let mut exterior: Option<(f64, Vec<(i64, i64)>)> = None;
    let mut holes: Vec<Vec<(i64, i64)>> = Vec::new();

    for ring in rings {
        let area = signed_area(&ring);
        if area > 0.0 {
            match &exterior {
                Some((best, _)) if *best >= area => holes.push(ring),
                _ => {
                    if let Some((_, prev)) = exterior.take() {
                        holes.push(prev);
                    }
                    exterior = Some((area, ring));
                }
            }
        } else {
            holes.push(ring);
        }
    }

    let to_geo = |ring: &[(i64, i64)]| -> LineString<f64> {
        LineString::new(
            ring.iter()
                .map(|&(x, y)| {
                    let (gx, gy) = mask.transform().pixel_to_geo_corner(x as usize, y as usize);
                    Coord { x: gx, y: gy }
                })
                .collect(),
        )
    };

    let exterior_ring = exterior
        .map(|(_, ring)| to_geo(&ring))
        .unwrap_or_else(|| LineString::new(vec![]));
    let hole_rings: Vec<LineString<f64>> = holes.iter().map(|r| to_geo(r)).collect();

    Polygon::new(exterior_ring, hole_rings).orient(Direction::Default)
}

/// Shoelace signed area of a closed ring in vertex grid coordinates
fn signed_area(ring: &[(i64, i64)]) -> f64 {
    let mut sum = 0i64;
    for w in ring.windows(2) {
        sum += w[0].0 * w[1].1 - w[1].0 * w[0].1;
    }
    sum as f64 / 2.0
}
