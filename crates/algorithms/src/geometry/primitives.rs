//! Point and segment algebra on planar coordinates

use super::GeometryError;
use geo::{Coord, Distance, Euclidean, Length, LineString, Point};

/// Relative tolerance under which two segments are treated as parallel
pub const PARALLEL_EPSILON: f64 = 1e-12;

/// Slack on the segment parameters so that hits exactly on an endpoint
/// survive floating-point noise
const PARAM_EPSILON: f64 = 1e-9;

#[inline]
pub fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

/// z-component of the 2D cross product; positive when `b` turns left of `a`
#[inline]
pub fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

#[inline]
pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Euclidean::distance(Point::from(a), Point::from(b))
}

/// Unit vector pointing from `a` to `b`
pub fn unit_direction(a: Coord<f64>, b: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
    let len = distance(a, b);
    if len == 0.0 || !len.is_finite() {
        return Err(GeometryError::ZeroLength);
    }
    Ok(Coord {
        x: (b.x - a.x) / len,
        y: (b.y - a.y) / len,
    })
}

/// Unit normal on the left of the direction `a -> b`.
///
/// Left is the counter-clockwise rotation of the travel direction, so for a
/// line heading east the normal points north.
pub fn left_normal(a: Coord<f64>, b: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
    let d = unit_direction(a, b)?;
    Ok(Coord { x: -d.y, y: d.x })
}

/// Sum of the edge lengths of a polyline
pub fn curvilinear_length(line: &LineString<f64>) -> f64 {
    line.length::<Euclidean>()
}

/// Straight-line distance between the first and last vertex
pub fn chord_length(line: &LineString<f64>) -> Result<f64, GeometryError> {
    match (line.0.first(), line.0.last()) {
        (Some(first), Some(last)) if line.0.len() >= 2 => Ok(distance(*first, *last)),
        _ => Err(GeometryError::TooFewVertices(line.0.len())),
    }
}

/// Point at curvilinear distance `at` from the start, with the index of the
/// edge it falls on. `at` is clamped to the polyline extent.
pub fn point_at_distance(
    line: &LineString<f64>,
    at: f64,
) -> Result<(Coord<f64>, usize), GeometryError> {
    let coords = &line.0;
    if coords.len() < 2 {
        return Err(GeometryError::TooFewVertices(coords.len()));
    }
    let mut remaining = at.max(0.0);
    let mut last_nonzero = None;
    for (i, w) in coords.windows(2).enumerate() {
        let len = distance(w[0], w[1]);
        if len == 0.0 {
            continue;
        }
        last_nonzero = Some(i);
        if remaining <= len {
            let t = remaining / len;
            return Ok((
                Coord {
                    x: w[0].x + t * (w[1].x - w[0].x),
                    y: w[0].y + t * (w[1].y - w[0].y),
                },
                i,
            ));
        }
        remaining -= len;
    }
    match last_nonzero {
        Some(i) => Ok((coords[i + 1], i)),
        None => Err(GeometryError::ZeroLength),
    }
}

/// Unit tangent of the polyline at curvilinear distance `at`.
///
/// On an edge interior this is the edge direction. When `at` lands on an
/// interior vertex, the chord between the neighbouring vertices is used so
/// the tangent bisects the corner.
pub fn local_direction(line: &LineString<f64>, at: f64) -> Result<Coord<f64>, GeometryError> {
    let (point, edge) = point_at_distance(line, at)?;
    let coords = &line.0;
    let (a, b) = (coords[edge], coords[edge + 1]);
    let on_start = distance(point, a) <= PARAM_EPSILON * distance(a, b).max(1.0);
    let on_end = distance(point, b) <= PARAM_EPSILON * distance(a, b).max(1.0);
    if on_start && edge > 0 {
        if let Ok(d) = unit_direction(coords[edge - 1], b) {
            return Ok(d);
        }
    }
    if on_end && edge + 2 < coords.len() {
        if let Ok(d) = unit_direction(a, coords[edge + 2]) {
            return Ok(d);
        }
    }
    unit_direction(a, b)
}

/// Orthogonal projection of `p` onto segment `a-b`.
///
/// Returns the projected point and its parameter in `[0, 1]`.
pub fn project_onto(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> (Coord<f64>, f64) {
    let ab = b - a;
    let len2 = dot(ab, ab);
    if len2 == 0.0 {
        return (a, 0.0);
    }
    let t = (dot(p - a, ab) / len2).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// A single crossing between two segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub point: Coord<f64>,
    /// Parameter along the first segment, 0 at its start
    pub t: f64,
    /// Parameter along the second segment
    pub u: f64,
}

/// Intersection of segments `p1-p2` and `q1-q2`.
///
/// Near-parallel pairs are handled explicitly: disjoint parallels yield
/// `None`, overlapping collinear segments yield the overlap point nearest to
/// `p1`. Hits within a small parameter slack of an endpoint are kept and
/// clamped onto the segment.
pub fn segment_intersection(
    p1: Coord<f64>,
    p2: Coord<f64>,
    q1: Coord<f64>,
    q2: Coord<f64>,
) -> Option<SegmentHit> {
    let r = p2 - p1;
    let s = q2 - q1;
    let rr = dot(r, r);
    let ss = dot(s, s);
    if rr == 0.0 || ss == 0.0 {
        return None;
    }
    let denom = cross(r, s);
    let qp = q1 - p1;

    if denom.abs() <= PARALLEL_EPSILON * rr.sqrt() * ss.sqrt() {
        // Parallel: only collinear overlaps intersect
        if cross(qp, r).abs() > PARALLEL_EPSILON.sqrt() * rr.sqrt() * qp.x.hypot(qp.y).max(1.0) {
            return None;
        }
        let t0 = dot(qp, r) / rr;
        let t1 = dot(q2 - p1, r) / rr;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        if hi < -PARAM_EPSILON || lo > 1.0 + PARAM_EPSILON {
            return None;
        }
        let t = lo.max(0.0);
        let point = p1 + r * t;
        let u = (dot(point - q1, s) / ss).clamp(0.0, 1.0);
        return Some(SegmentHit { point, t, u });
    }

    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    let range = -PARAM_EPSILON..=1.0 + PARAM_EPSILON;
    if !range.contains(&t) || !range.contains(&u) {
        return None;
    }
    let t = t.clamp(0.0, 1.0);
    Some(SegmentHit {
        point: p1 + r * t,
        t,
        u: u.clamp(0.0, 1.0),
    })
}

/// Split a polyline at the point of it closest to `at`.
///
/// Both halves contain the split point. A half that collapses to a single
/// point is still returned with two identical vertices so callers can treat
/// it as degenerate.
pub fn split_at_point(
    line: &LineString<f64>,
    at: Coord<f64>,
) -> Result<(LineString<f64>, LineString<f64>), GeometryError> {
    let coords = &line.0;
    if coords.len() < 2 {
        return Err(GeometryError::TooFewVertices(coords.len()));
    }
    let mut best: Option<(f64, usize, Coord<f64>)> = None;
    for (i, w) in coords.windows(2).enumerate() {
        let (proj, _) = project_onto(at, w[0], w[1]);
        let d = distance(proj, at);
        if best.map_or(true, |(bd, _, _)| d < bd) {
            best = Some((d, i, proj));
        }
    }
    let Some((_, edge, split)) = best else {
        return Err(GeometryError::TooFewVertices(coords.len()));
    };

    let mut head: Vec<Coord<f64>> = coords[..=edge].to_vec();
    if head.last() != Some(&split) {
        head.push(split);
    }
    if head.len() == 1 {
        head.push(split);
    }
    let mut tail = vec![split];
    tail.extend(coords[edge + 1..].iter().copied().filter(|c| *c != split));
    if tail.len() == 1 {
        tail.push(split);
    }
    Ok((LineString::new(head), LineString::new(tail)))
}
