//! Signed parallel offset of polylines

use super::primitives::{cross, distance, dot, left_normal};
use super::GeometryError;
use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

/// Corner treatment on the convex side of an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStyle {
    /// Circular arc around the original vertex
    #[default]
    Round,
    /// Extend both offset edges until they meet
    Miter,
    /// Straight cut between the two offset edge ends
    Bevel,
}

/// Parameters for [`offset_polyline`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetParams {
    pub join: JoinStyle,
    /// Arc vertices per quarter circle for round joins
    pub segments: usize,
    /// Ratio of miter length to offset distance above which a miter
    /// join falls back to a bevel
    pub miter_limit: f64,
}

impl Default for OffsetParams {
    fn default() -> Self {
        Self {
            join: JoinStyle::Round,
            segments: 8,
            miter_limit: 2.0,
        }
    }
}

/// Offset a polyline by a signed distance.
///
/// Positive distances offset to the left of the travel direction, negative
/// ones to the right. Concave corners are joined at the intersection of
/// the two offset edges; convex corners follow `params.join`.
pub fn offset_polyline(
    line: &LineString<f64>,
    offset: f64,
    params: &OffsetParams,
) -> Result<LineString<f64>, GeometryError> {
    let mut pts: Vec<Coord<f64>> = Vec::with_capacity(line.0.len());
    for c in &line.0 {
        if pts.last().map_or(true, |last| last != c) {
            pts.push(*c);
        }
    }
    if pts.len() < 2 {
        return Err(GeometryError::TooFewVertices(pts.len()));
    }
    if offset == 0.0 {
        return Ok(LineString::new(pts));
    }

    let normals = pts
        .windows(2)
        .map(|w| left_normal(w[0], w[1]))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(pts.len() * 2);
    out.push(pts[0] + normals[0] * offset);

    for i in 1..pts.len() - 1 {
        let vertex = pts[i];
        let n0 = normals[i - 1];
        let n1 = normals[i];
        let d0 = pts[i] - pts[i - 1];
        let d1 = pts[i + 1] - pts[i];
        let turn = cross(d0, d1);
        let cos = dot(n0, n1);

        if turn.abs() <= 1e-12 * d0.x.hypot(d0.y) * d1.x.hypot(d1.y) && cos > 0.0 {
            // Straight continuation
            out.push(vertex + n0 * offset);
            continue;
        }

        let concave = turn * offset > 0.0;
        if concave && cos > -1.0 + 1e-9 {
            out.push(vertex + (n0 + n1) * (offset / (1.0 + cos)));
            continue;
        }

        match params.join {
            JoinStyle::Miter => {
                let ratio = (2.0 / (1.0 + cos)).sqrt();
                if cos > -1.0 + 1e-9 && ratio <= params.miter_limit {
                    out.push(vertex + (n0 + n1) * (offset / (1.0 + cos)));
                } else {
                    out.push(vertex + n0 * offset);
                    out.push(vertex + n1 * offset);
                }
            }
            JoinStyle::Bevel => {
                out.push(vertex + n0 * offset);
                out.push(vertex + n1 * offset);
            }
            JoinStyle::Round => {
                push_arc(&mut out, vertex, n0 * offset, n1 * offset, params.segments.max(1));
            }
        }
    }

    let last = pts.len() - 1;
    out.push(pts[last] + normals[last - 1] * offset);
    out.dedup_by(|a, b| distance(*a, *b) == 0.0);
    Ok(LineString::new(out))
}

/// Arc around `center` from `center + from` to `center + to`, taking the
/// shorter sweep. Both endpoints are emitted.
fn push_arc(
    out: &mut Vec<Coord<f64>>,
    center: Coord<f64>,
    from: Coord<f64>,
    to: Coord<f64>,
    segments_per_quarter: usize,
) {
    use std::f64::consts::{FRAC_PI_2, PI};

    let radius = from.x.hypot(from.y);
    let start = from.y.atan2(from.x);
    let mut sweep = to.y.atan2(to.x) - start;
    if sweep > PI {
        sweep -= 2.0 * PI;
    } else if sweep < -PI {
        sweep += 2.0 * PI;
    }
    let steps = ((sweep.abs() / FRAC_PI_2) * segments_per_quarter as f64).ceil().max(1.0) as usize;
    out.push(center + from);
    for k in 1..steps {
        let a = start + sweep * k as f64 / steps as f64;
        out.push(Coord {
            x: center.x + radius * a.cos(),
            y: center.y + radius * a.sin(),
        });
    }
    out.push(center + to);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::curvilinear_length;
    use approx::assert_relative_eq;

    fn elbow() -> LineString<f64> {
        // East then north: a left turn
        LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)])
    }

    #[test]
    fn test_straight_line_offsets_both_ways() {
        let line = LineString::from(vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let left = offset_polyline(&line, 2.0, &OffsetParams::default()).unwrap();
        let right = offset_polyline(&line, -2.0, &OffsetParams::default()).unwrap();
        assert!(left.0.iter().all(|c| (c.y - 2.0).abs() < 1e-12));
        assert!(right.0.iter().all(|c| (c.y + 2.0).abs() < 1e-12));
        assert_relative_eq!(curvilinear_length(&left), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_concave_corner_uses_edge_intersection() {
        // Left offset of a left turn sits on the inside of the corner
        let out = offset_polyline(&elbow(), 1.0, &OffsetParams::default()).unwrap();
        assert_eq!(out.0.len(), 3);
        assert_relative_eq!(out.0[1].x, 9.0, epsilon = 1e-12);
        assert_relative_eq!(out.0[1].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_convex_miter_corner() {
        let params = OffsetParams {
            join: JoinStyle::Miter,
            ..Default::default()
        };
        let out = offset_polyline(&elbow(), -1.0, &params).unwrap();
        assert_eq!(out.0.len(), 3);
        assert_relative_eq!(out.0[1].x, 11.0, epsilon = 1e-12);
        assert_relative_eq!(out.0[1].y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_miter_limit_falls_back_to_bevel() {
        let params = OffsetParams {
            join: JoinStyle::Miter,
            miter_limit: 1.2,
            ..Default::default()
        };
        // A right angle needs a miter ratio of sqrt(2)
        let out = offset_polyline(&elbow(), -1.0, &params).unwrap();
        assert_eq!(out.0.len(), 4);
        assert_relative_eq!(out.0[1].x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(out.0[1].y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(out.0[2].x, 11.0, epsilon = 1e-12);
        assert_relative_eq!(out.0[2].y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_round_corner_stays_at_offset_distance() {
        let vertex = Coord { x: 10.0, y: 0.0 };
        let out = offset_polyline(&elbow(), -2.0, &OffsetParams::default()).unwrap();
        // 2 ends + a quarter arc of 8 steps (9 points)
        assert_eq!(out.0.len(), 11);
        for c in &out.0[1..out.0.len() - 1] {
            assert_relative_eq!(distance(*c, vertex), 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_single_vertex_is_rejected() {
        let line = LineString::from(vec![(1.0, 1.0), (1.0, 1.0)]);
        assert_eq!(
            offset_polyline(&line, 1.0, &OffsetParams::default()),
            Err(GeometryError::TooFewVertices(1))
        );
    }
}
