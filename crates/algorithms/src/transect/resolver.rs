//! Ranking of transect/boundary crossings per side

use super::{BoundaryLayer, Side, Transect, TIE_TOLERANCE};
use crate::metrics::Unresolved;
use geo::Coord;

/// A boundary crossing on one side of a transect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionPoint {
    pub position: Coord<f64>,
    /// Distance from the transect origin
    pub distance: f64,
    pub side: Side,
    /// 1 for the nearest crossing, 2 for the next, ...
    pub rank: usize,
    /// Index of the crossed line in the boundary layer
    pub feature: usize,
}

/// Crossings on one side, nearest first
#[derive(Debug, Clone, PartialEq)]
pub struct SideIntersections {
    pub side: Side,
    pub points: Vec<IntersectionPoint>,
    /// Number of crossings that fell within tolerance of their predecessor
    pub ties: usize,
}

impl SideIntersections {
    /// Crossing of the given 1-based rank
    pub fn rank(&self, rank: usize) -> Result<&IntersectionPoint, Unresolved> {
        rank.checked_sub(1)
            .and_then(|i| self.points.get(i))
            .ok_or(Unresolved::RankNotPresent {
                side: self.side,
                rank,
            })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Both sides of a resolved transect
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTransect {
    pub left: SideIntersections,
    pub right: SideIntersections,
}

impl ResolvedTransect {
    pub fn side(&self, side: Side) -> &SideIntersections {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn point(&self, side: Side, rank: usize) -> Result<&IntersectionPoint, Unresolved> {
        self.side(side).rank(rank)
    }

    pub fn ties(&self) -> usize {
        self.left.ties + self.right.ties
    }
}

/// Intersect a transect with a boundary layer and rank the crossings on
/// each side by distance from the origin.
///
/// Crossings at the origin itself belong to neither side and are dropped.
pub fn resolve_intersections(transect: &Transect, layer: &BoundaryLayer) -> ResolvedTransect {
    let resolve = |side: Side| {
        let crossings = layer.crossings(transect.origin, transect.end(side));
        let mut points = Vec::with_capacity(crossings.len());
        let mut ties = 0;
        let mut previous: Option<f64> = None;
        for c in crossings.into_iter().filter(|c| c.distance > TIE_TOLERANCE) {
            if previous.is_some_and(|p| c.distance - p <= TIE_TOLERANCE) {
                ties += 1;
            }
            previous = Some(c.distance);
            points.push(IntersectionPoint {
                position: c.point,
                distance: c.distance,
                side,
                rank: points.len() + 1,
                feature: c.feature,
            });
        }
        if ties > 0 {
            tracing::warn!(
                t_id = transect.t_id,
                %side,
                ties,
                "near-coincident boundary crossings"
            );
        }
        SideIntersections { side, points, ties }
    };

    ResolvedTransect {
        left: resolve(Side::Left),
        right: resolve(Side::Right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::LineString;

    fn transect(len: f64) -> Transect {
        Transect {
            t_id: 1,
            origin: Coord { x: 0.0, y: 0.0 },
            normal: Coord { x: 0.0, y: 1.0 },
            left_length: len,
            right_length: len,
            left_insufficient: false,
            right_insufficient: false,
        }
    }

    fn layer(ys: &[f64]) -> BoundaryLayer {
        BoundaryLayer::new(
            ys.iter()
                .map(|&y| LineString::from(vec![(-50.0, y), (50.0, y)]))
                .collect(),
        )
    }

    #[test]
    fn test_ranks_follow_distance_not_input_order() {
        let resolved = resolve_intersections(&transect(100.0), &layer(&[80.0, 20.0, -10.0, -60.0]));
        let l1 = resolved.point(Side::Left, 1).unwrap();
        let l2 = resolved.point(Side::Left, 2).unwrap();
        assert_relative_eq!(l1.distance, 20.0);
        assert_eq!(l1.feature, 1);
        assert_relative_eq!(l2.distance, 80.0);
        assert_eq!(l2.rank, 2);
        let r1 = resolved.point(Side::Right, 1).unwrap();
        assert_relative_eq!(r1.position.y, -10.0);
        assert_eq!(r1.side, Side::Right);
        assert_eq!(resolved.ties(), 0);
    }

    #[test]
    fn test_missing_rank_is_unresolved() {
        let resolved = resolve_intersections(&transect(100.0), &layer(&[30.0]));
        assert!(resolved.right.is_empty());
        assert_eq!(
            resolved.point(Side::Right, 1),
            Err(Unresolved::RankNotPresent {
                side: Side::Right,
                rank: 1
            })
        );
        assert_eq!(
            resolved.point(Side::Left, 2),
            Err(Unresolved::RankNotPresent {
                side: Side::Left,
                rank: 2
            })
        );
        assert!(resolved.point(Side::Left, 0).is_err());
    }

    #[test]
    fn test_coincident_lines_are_flagged_as_ties() {
        let resolved = resolve_intersections(&transect(100.0), &layer(&[40.0, 40.0]));
        assert_eq!(resolved.left.len(), 2);
        assert_eq!(resolved.left.ties, 1);
        assert_eq!(resolved.left.points[0].feature, 0);
        assert_eq!(resolved.left.points[1].feature, 1);
    }

    #[test]
    fn test_crossing_at_origin_is_dropped() {
        let resolved = resolve_intersections(&transect(100.0), &layer(&[0.0, 10.0]));
        assert_eq!(resolved.left.len(), 1);
        assert!(resolved.right.is_empty());
    }
}
