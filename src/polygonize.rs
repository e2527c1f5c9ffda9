use crate::sieve::{label_regions, sieve, Connectivity};
use geo_types::{Coord, LineString, Polygon};
use log::debug;
use ndarray::Array2;
use std::collections::HashMap;

/// Geometries traced from one raster, with the CRS they are expressed in.
#[derive(Debug, Clone)]
pub struct VectorLayer {
    pub geometries: Vec<Polygon<f64>>,
    pub projection: String,
}

/// Vertex on the pixel-corner lattice, as (x = column, y = row).
type GridPoint = (usize, usize);
type Edge = (GridPoint, GridPoint);

/// Sieve the raster, trace its regions and keep only the foreground
/// (value == 1) polygons, tagged with the raster's CRS.
pub fn polygonize(
    data: &Array2<i32>,
    projection: &str,
    transform: &[f64; 6],
    threshold: usize,
) -> VectorLayer {
    let sieved = sieve(data, threshold, Connectivity::Four);

    debug!("Converting raster to vector shapes");
    let geometries: Vec<Polygon<f64>> = shapes(&sieved, transform)
        .into_iter()
        .filter(|(_, value)| *value == 1)
        .map(|(geometry, _)| geometry)
        .collect();
    debug!("Traced {} foreground polygons", geometries.len());

    VectorLayer {
        geometries,
        projection: projection.to_string(),
    }
}

/// Trace every maximal 4-connected region of uniform value into one polygon
/// (exterior ring plus interior holes) and pair it with the region's value.
/// Vertices lie on pixel corners mapped through the affine geotransform;
/// polygons are emitted in raster scan order of each region's first pixel.
pub fn shapes(data: &Array2<i32>, transform: &[f64; 6]) -> Vec<(Polygon<f64>, i32)> {
    let regions = label_regions(data, Connectivity::Four);
    let count = regions.values.len();
    let (rows, cols) = data.dim();

    // One directed boundary edge per pixel side facing out of its region,
    // oriented so the region lies on the mathematical left.
    let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); count];
    for ((r, c), &label) in regions.labels.indexed_iter() {
        let differs = |nr: isize, nc: isize| {
            nr < 0
                || nc < 0
                || nr >= rows as isize
                || nc >= cols as isize
                || regions.labels[[nr as usize, nc as usize]] != label
        };
        let (ri, ci) = (r as isize, c as isize);
        if differs(ri - 1, ci) {
            edges[label].push(((c, r), (c + 1, r)));
        }
        if differs(ri + 1, ci) {
            edges[label].push(((c + 1, r + 1), (c, r + 1)));
        }
        if differs(ri, ci - 1) {
            edges[label].push(((c, r + 1), (c, r)));
        }
        if differs(ri, ci + 1) {
            edges[label].push(((c + 1, r), (c + 1, r + 1)));
        }
    }

    let mut out = Vec::with_capacity(count);
    for label in 0..count {
        let rings = stitch_rings(&edges[label]);
        if let Some(polygon) = assemble_polygon(rings, transform) {
            out.push((polygon, regions.values[label]));
        }
    }
    out
}

/// Walk directed boundary edges into closed rings. Where two boundary
/// strands cross at a pixel corner, the most-clockwise outgoing edge is
/// taken, which keeps the region on the left and pairs the strands into a
/// single ring.
fn stitch_rings(edges: &[Edge]) -> Vec<Vec<GridPoint>> {
    let mut by_start: HashMap<GridPoint, Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        by_start.entry(edge.0).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut ring = vec![edges[start].0];
        let mut current = start;
        loop {
            used[current] = true;
            let (from, to) = edges[current];
            ring.push(to);
            if to == ring[0] {
                break;
            }

            let incoming = direction(from, to);
            let mut next: Option<usize> = None;
            for &candidate in &by_start[&to] {
                if used[candidate] {
                    continue;
                }
                let outgoing = direction(edges[candidate].0, edges[candidate].1);
                let better = match next {
                    None => true,
                    Some(best) => {
                        let best_dir = direction(edges[best].0, edges[best].1);
                        cross(incoming, outgoing) < cross(incoming, best_dir)
                    }
                };
                if better {
                    next = Some(candidate);
                }
            }
            // Boundary edges pair in and out at every vertex, so a
            // successor exists until the ring closes on its start.
            current = next.expect("boundary edges form closed rings");
        }
        rings.push(compress_ring(ring));
    }
    rings
}

fn direction(from: GridPoint, to: GridPoint) -> (i64, i64) {
    (to.0 as i64 - from.0 as i64, to.1 as i64 - from.1 as i64)
}

fn cross(a: (i64, i64), b: (i64, i64)) -> i64 {
    a.0 * b.1 - a.1 * b.0
}

/// Drop collinear lattice vertices, keeping only the corners. The ring
/// arrives and leaves closed (first point repeated at the end).
fn compress_ring(ring: Vec<GridPoint>) -> Vec<GridPoint> {
    let points = &ring[..ring.len() - 1];
    let n = points.len();
    let mut kept = Vec::new();
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let collinear = (prev.0 == cur.0 && cur.0 == next.0) || (prev.1 == cur.1 && cur.1 == next.1);
        if !collinear {
            kept.push(cur);
        }
    }
    kept.push(kept[0]);
    kept
}

/// With the region kept on the left during tracing, the exterior ring has
/// positive signed area on the pixel lattice and holes come out negative.
fn assemble_polygon(rings: Vec<Vec<GridPoint>>, transform: &[f64; 6]) -> Option<Polygon<f64>> {
    let mut exterior: Option<(i64, Vec<GridPoint>)> = None;
    let mut holes: Vec<Vec<GridPoint>> = Vec::new();

    for ring in rings {
        let area = signed_area(&ring);
        if area > 0 {
            let larger = exterior.as_ref().map_or(true, |(best, _)| area > *best);
            if larger {
                exterior = Some((area, ring));
            }
        } else {
            holes.push(ring);
        }
    }

    let (_, exterior) = exterior?;
    let to_line_string = |ring: Vec<GridPoint>| -> LineString<f64> {
        ring.into_iter()
            .map(|(x, y)| apply_transform(transform, x as f64, y as f64))
            .collect()
    };
    Some(Polygon::new(
        to_line_string(exterior),
        holes.into_iter().map(to_line_string).collect(),
    ))
}

/// Doubled shoelace sum; exact on the integer lattice.
fn signed_area(ring: &[GridPoint]) -> i64 {
    let mut sum = 0i64;
    for pair in ring.windows(2) {
        let (x0, y0) = (pair[0].0 as i64, pair[0].1 as i64);
        let (x1, y1) = (pair[1].0 as i64, pair[1].1 as i64);
        sum += x0 * y1 - x1 * y0;
    }
    sum
}

fn apply_transform(t: &[f64; 6], x: f64, y: f64) -> Coord<f64> {
    Coord {
        x: t[0] + x * t[1] + y * t[2],
        y: t[3] + x * t[4] + y * t[5],
    }
}
