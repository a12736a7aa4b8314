//! Channel-belt sinuosity (LCS, RCS, CBS)
//!
//! Two ways to obtain the left and right belt halves:
//! - split one belt polyline where the segment's transect crosses it
//!   ([`trace_belt_sinuosity`]);
//! - take belt lines already tagged with a segment id and a side
//!   ([`side_sinuosity`]).

use super::longitudinal::sinuosity;
use super::{mean, Metric, Unresolved};
use crate::geometry::{
    clip_line_by_rect, cross, curvilinear_length, distance, dot, project_onto, split_at_point,
    unit_direction, ClipRect,
};
use crate::segments::StreamSegment;
use crate::transect::{BoundaryLayer, IntersectionPoint, ResolvedTransect, Side};
use geo::{Coord, LineString};

/// Belt sinuosity on each side and their mean
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeltSinuosity {
    pub lcs: Metric,
    pub rcs: Metric,
    pub cbs: Metric,
}

impl BeltSinuosity {
    pub fn unresolved(reason: Unresolved) -> Self {
        Self {
            lcs: Err(reason),
            rcs: Err(reason),
            cbs: Err(reason),
        }
    }

    fn from_sides(lcs: Metric, rcs: Metric) -> Self {
        Self {
            lcs,
            rcs,
            cbs: mean(lcs, rcs),
        }
    }
}

/// Split `belt` at the point closest to `crossing`. The part from the belt
/// start to the crossing gives LCS, the rest gives RCS.
pub fn split_sinuosity(belt: &LineString<f64>, crossing: Coord<f64>) -> BeltSinuosity {
    match split_at_point(belt, crossing) {
        Ok((head, tail)) => BeltSinuosity::from_sides(sinuosity(&head), sinuosity(&tail)),
        Err(e) => BeltSinuosity::unresolved(e.into()),
    }
}

/// Belt sinuosity around one segment.
///
/// The split point is the rank-1 belt crossing nearest to the transect
/// origin (left wins a tie). The crossed belt line is clipped to the reach
/// of the segment, i.e. the band between the perpendiculars through the
/// segment's first and last vertex, and the clipped run containing the
/// crossing is split there. Without any rank-1 crossing all three values
/// are unresolved.
pub fn trace_belt_sinuosity(
    segment: &StreamSegment,
    belt: &ResolvedTransect,
    layer: &BoundaryLayer,
) -> BeltSinuosity {
    let Some(crossing) = nearest_first_crossing(belt) else {
        return BeltSinuosity::unresolved(Unresolved::NoBeltCrossing);
    };
    let Some(line) = layer.line(crossing.feature) else {
        return BeltSinuosity::unresolved(Unresolved::NoBeltCrossing);
    };
    let pieces = match clip_to_reach(line, &segment.geometry) {
        Ok(pieces) => pieces,
        Err(reason) => return BeltSinuosity::unresolved(reason),
    };
    let piece = pieces
        .iter()
        .min_by(|a, b| {
            distance_to_line(a, crossing.position).total_cmp(&distance_to_line(b, crossing.position))
        })
        .unwrap_or(line);

    split_sinuosity(piece, crossing.position)
}

/// Runs of `line` lying between the perpendiculars through the ends of
/// `reach`, computed in a frame whose x axis is the reach chord.
fn clip_to_reach(
    line: &LineString<f64>,
    reach: &LineString<f64>,
) -> Result<Vec<LineString<f64>>, Unresolved> {
    let (Some(&start), Some(&end)) = (reach.0.first(), reach.0.last()) else {
        return Err(Unresolved::TooFewVertices);
    };
    let axis = unit_direction(start, end)?;
    let normal = Coord { x: -axis.y, y: axis.x };
    let local = line
        .0
        .iter()
        .map(|&c| Coord {
            x: dot(c - start, axis),
            y: cross(axis, c - start),
        })
        .collect::<LineString<f64>>();
    let band = ClipRect::new(0.0, f64::NEG_INFINITY, distance(start, end), f64::INFINITY);
    Ok(clip_line_by_rect(&local, band)
        .into_iter()
        .map(|piece| {
            piece
                .0
                .into_iter()
                .map(|c| start + axis * c.x + normal * c.y)
                .collect()
        })
        .collect())
}

fn nearest_first_crossing(belt: &ResolvedTransect) -> Option<&IntersectionPoint> {
    match (belt.point(Side::Left, 1).ok(), belt.point(Side::Right, 1).ok()) {
        (Some(l), Some(r)) => Some(if r.distance < l.distance { r } else { l }),
        (l, r) => l.or(r),
    }
}

fn distance_to_line(line: &LineString<f64>, p: Coord<f64>) -> f64 {
    line.0
        .windows(2)
        .map(|w| distance(project_onto(p, w[0], w[1]).0, p))
        .fold(f64::INFINITY, f64::min)
}

/// Sinuosity of side-tagged belt lines.
///
/// When several lines exist for a side the longest one is used. A line of
/// zero length reports 1.0; a line whose ends coincide is unresolved.
pub fn side_sinuosity(left: &[&LineString<f64>], right: &[&LineString<f64>]) -> BeltSinuosity {
    let one_side = |lines: &[&LineString<f64>]| -> Metric {
        let longest = lines
            .iter()
            .max_by(|a, b| curvilinear_length(a).total_cmp(&curvilinear_length(b)))
            .ok_or(Unresolved::NotSupplied)?;
        if curvilinear_length(longest) == 0.0 {
            return Ok(1.0);
        }
        sinuosity(longest)
    };
    BeltSinuosity::from_sides(one_side(left), one_side(right))
}
