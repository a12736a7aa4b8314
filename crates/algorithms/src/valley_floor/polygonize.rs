//! Mask to polygon conversion by tracing cell edges

use std::collections::HashMap;

use geo::{Contains, Coord, LineString, Point, Polygon};
use ndarray::Array2;
use openres_core::GeoTransform;

type Vertex = (i64, i64);

/// Trace the boundaries of the foreground of `mask` into polygons in map
/// coordinates.
///
/// Boundaries run along cell edges. Cells touching only at a corner belong
/// to separate rings. Collinear vertices are dropped before the rings are
/// transformed.
pub(crate) fn polygonize(mask: &Array2<u8>, transform: &GeoTransform) -> Vec<Polygon<f64>> {
    let rings = trace_rings(mask);

    let mut exteriors: Vec<(Vec<Vertex>, f64)> = Vec::new();
    let mut holes: Vec<Vec<Vertex>> = Vec::new();
    for ring in rings {
        let area = signed_area(&ring);
        if area > 0.0 {
            exteriors.push((ring, area));
        } else if area < 0.0 {
            holes.push(ring);
        }
    }

    let pixel_polygons: Vec<Polygon<f64>> = exteriors
        .iter()
        .map(|(ring, _)| Polygon::new(to_line_string(ring, to_pixel), vec![]))
        .collect();
    let mut interiors: Vec<Vec<&Vec<Vertex>>> = vec![Vec::new(); exteriors.len()];
    for hole in &holes {
        let Some(inside) = interior_point(hole, mask) else {
            continue;
        };
        let owner = pixel_polygons
            .iter()
            .enumerate()
            .filter(|(_, p)| p.contains(&inside))
            .min_by(|a, b| exteriors[a.0].1.total_cmp(&exteriors[b.0].1))
            .map(|(i, _)| i);
        if let Some(i) = owner {
            interiors[i].push(hole);
        }
    }

    let to_map = |v: Vertex| {
        let (x, y) = transform.corner_to_geo(v.0 as usize, v.1 as usize);
        Coord { x, y }
    };
    exteriors
        .iter()
        .zip(interiors)
        .map(|((ring, _), holes)| {
            Polygon::new(
                to_line_string(ring, to_map),
                holes.into_iter().map(|h| to_line_string(h, to_map)).collect(),
            )
        })
        .collect()
}

/// Closed rings of directed cell edges with the foreground on the right
/// (screen orientation, rows growing downwards). Exterior rings come out
/// with positive shoelace area in (col, row) space, holes negative.
fn trace_rings(mask: &Array2<u8>) -> Vec<Vec<Vertex>> {
    let (rows, cols) = mask.dim();
    let fg = |r: i64, c: i64| -> bool {
        r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols && mask[[r as usize, c as usize]] != 0
    };

    let mut edges: Vec<(Vertex, Vertex)> = Vec::new();
    for r in 0..rows as i64 {
        for c in 0..cols as i64 {
            if !fg(r, c) {
                continue;
            }
            if !fg(r - 1, c) {
                edges.push(((c, r), (c + 1, r)));
            }
            if !fg(r, c + 1) {
                edges.push(((c + 1, r), (c + 1, r + 1)));
            }
            if !fg(r + 1, c) {
                edges.push(((c + 1, r + 1), (c, r + 1)));
            }
            if !fg(r, c - 1) {
                edges.push(((c, r + 1), (c, r)));
            }
        }
    }

    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, (start, _)) in edges.iter().enumerate() {
        outgoing.entry(*start).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let origin = edges[first].0;
        let mut ring = vec![origin];
        let mut current = first;
        loop {
            used[current] = true;
            let (from, to) = edges[current];
            ring.push(to);
            if to == origin {
                break;
            }
            let heading = (to.0 - from.0, to.1 - from.1);
            let candidates = outgoing.get(&to).map(Vec::as_slice).unwrap_or(&[]);
            let next = candidates
                .iter()
                .copied()
                .filter(|&e| !used[e])
                .max_by_key(|&e| {
                    let (a, b) = edges[e];
                    let turn = (b.0 - a.0, b.1 - a.1);
                    // Positive cross keeps to the same cell at a saddle
                    heading.0 * turn.1 - heading.1 * turn.0
                });
            match next {
                Some(e) => current = e,
                None => break,
            }
        }
        if ring.len() >= 4 && ring.first() == ring.last() {
            rings.push(simplify(ring));
        }
    }
    rings
}

/// Drop vertices lying on a straight run; keeps the ring closed
fn simplify(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len() - 1;
    let mut out: Vec<Vertex> = (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            (cur.0 - prev.0) * (next.1 - cur.1) - (cur.1 - prev.1) * (next.0 - cur.0) != 0
        })
        .map(|i| ring[i])
        .collect();
    if let Some(&first) = out.first() {
        out.push(first);
    }
    out
}

fn signed_area(ring: &[Vertex]) -> f64 {
    ring.windows(2)
        .map(|w| (w[0].0 * w[1].1 - w[1].0 * w[0].1) as f64)
        .sum::<f64>()
        / 2.0
}

/// Center of a background cell enclosed by the hole ring
fn interior_point(hole: &[Vertex], mask: &Array2<u8>) -> Option<Point<f64>> {
    let (rows, cols) = mask.dim();
    let (a, b) = (hole.first()?, hole.get(1)?);
    let (dx, dy) = ((b.0 - a.0).signum() as f64, (b.1 - a.1).signum() as f64);
    // Middle of the first cell edge along the ring
    let mid = (a.0 as f64 + 0.5 * dx, a.1 as f64 + 0.5 * dy);
    [(-dy, dx), (dy, -dx)].into_iter().find_map(|(nx, ny)| {
        let (x, y) = (mid.0 + 0.5 * nx, mid.1 + 0.5 * ny);
        let (c, r) = (x.floor() as i64, y.floor() as i64);
        let inside = r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols;
        (inside && mask[[r as usize, c as usize]] == 0).then(|| Point::new(x, y))
    })
}

fn to_line_string(ring: &[Vertex], f: impl Fn(Vertex) -> Coord<f64>) -> LineString<f64> {
    ring.iter().map(|&v| f(v)).collect()
}

fn to_pixel(v: Vertex) -> Coord<f64> {
    Coord {
        x: v.0 as f64,
        y: v.1 as f64,
    }
}

/// Chaikin corner cutting on every ring of the polygons.
///
/// Each iteration replaces every edge `p -> q` by the two points at
/// `offset` and `1 - offset` along it.
pub(crate) fn chaikin(polygons: Vec<Polygon<f64>>, iterations: usize, offset: f64) -> Vec<Polygon<f64>> {
    if iterations == 0 {
        return polygons;
    }
    polygons
        .into_iter()
        .map(|p| {
            let (exterior, interiors) = p.into_inner();
            Polygon::new(
                smooth_ring(exterior, iterations, offset),
                interiors
                    .into_iter()
                    .map(|r| smooth_ring(r, iterations, offset))
                    .collect(),
            )
        })
        .collect()
}

fn smooth_ring(ring: LineString<f64>, iterations: usize, offset: f64) -> LineString<f64> {
    let mut pts = ring.0;
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 {
        return LineString::new(pts);
    }
    for _ in 0..iterations {
        let n = pts.len();
        let mut next = Vec::with_capacity(n * 2);
        for i in 0..n {
            let p = pts[i];
            let q = pts[(i + 1) % n];
            next.push(p + (q - p) * offset);
            next.push(p + (q - p) * (1.0 - offset));
        }
        pts = next;
    }
    let mut ring = LineString::new(pts);
    ring.close();
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use ndarray::array;

    fn identity() -> GeoTransform {
        // Map y grows upwards, one unit per cell, top edge at y = 10
        GeoTransform::new(0.0, 10.0, 1.0, -1.0)
    }

    #[test]
    fn test_single_block() {
        let mask = array![[0u8, 0, 0, 0], [0, 1, 1, 0], [0, 1, 1, 0], [0, 0, 0, 0]];
        let polys = polygonize(&mask, &identity());
        assert_eq!(polys.len(), 1);
        // 4 corners plus the closing vertex
        assert_eq!(polys[0].exterior().0.len(), 5);
        assert!((polys[0].unsigned_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_ring_with_hole() {
        let mask = array![
            [1u8, 1, 1, 1],
            [1, 0, 0, 1],
            [1, 1, 1, 1],
        ];
        let polys = polygonize(&mask, &identity());
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].interiors().len(), 1);
        assert!((polys[0].unsigned_area() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_diagonal_cells_are_separate() {
        let mask = array![[1u8, 0], [0, 1]];
        let polys = polygonize(&mask, &identity());
        assert_eq!(polys.len(), 2);
        assert!(polys.iter().all(|p| (p.unsigned_area() - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_island_inside_hole_is_its_own_polygon() {
        let mask = array![
            [1u8, 1, 1, 1, 1],
            [1, 0, 0, 0, 1],
            [1, 0, 1, 0, 1],
            [1, 0, 0, 0, 1],
            [1, 1, 1, 1, 1],
        ];
        let polys = polygonize(&mask, &identity());
        assert_eq!(polys.len(), 2);
        let total: f64 = polys.iter().map(|p| p.unsigned_area()).sum();
        assert!((total - 17.0).abs() < 1e-12, "got {total}");
    }

    #[test]
    fn test_empty_mask() {
        let mask = Array2::<u8>::zeros((3, 3));
        assert!(polygonize(&mask, &identity()).is_empty());
    }

    #[test]
    fn test_chaikin_doubles_vertices_and_stays_inside() {
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![],
        );
        let smoothed = chaikin(vec![square.clone()], 2, 0.25);
        assert_eq!(smoothed[0].exterior().0.len(), 16 + 1);
        assert!(smoothed[0].unsigned_area() < square.unsigned_area());
        assert!(smoothed[0].exterior().0.iter().all(|c| c.x >= 0.0 && c.x <= 4.0));
        assert_eq!(chaikin(vec![square.clone()], 0, 0.25), vec![square]);
    }
}
