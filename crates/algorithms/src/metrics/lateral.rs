//! Lateral metrics: widths across the valley and valley-side slopes

use super::{mean, ratio, Metric, Unresolved};
use crate::geometry::distance;
use crate::transect::{ResolvedTransect, Side};
use openres_core::PointSampler;

/// Widths and slopes measured along one valley transect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateralMetrics {
    /// Valley floor width, between the rank-1 crossings
    pub vfw: Metric,
    /// Valley width, between the rank-2 crossings
    pub vw: Metric,
    /// VW / VFW
    pub rat: Metric,
    /// Left valley-side slope, percent
    pub lvs: Metric,
    /// Right valley-side slope, percent
    pub rvs: Metric,
    /// Mean of LVS and RVS
    pub mvs: Metric,
}

impl LateralMetrics {
    /// All six metrics unresolved for the same reason
    pub fn unresolved(reason: Unresolved) -> Self {
        Self {
            vfw: Err(reason),
            vw: Err(reason),
            rat: Err(reason),
            lvs: Err(reason),
            rvs: Err(reason),
            mvs: Err(reason),
        }
    }
}

/// Straight-line distance between the left and right crossings of `rank`
pub fn width_between(resolved: &ResolvedTransect, rank: usize) -> Metric {
    let left = resolved.point(Side::Left, rank)?;
    let right = resolved.point(Side::Right, rank)?;
    Ok(distance(left.position, right.position))
}

/// Slope between the rank-1 and rank-2 crossings on one side, as percent
/// rise over horizontal run.
///
/// Positive when the outer crossing is higher, i.e. the valley side climbs
/// away from the channel.
pub fn side_slope<S: PointSampler + ?Sized>(
    resolved: &ResolvedTransect,
    side: Side,
    elevation: &S,
) -> Metric {
    let inner = resolved.point(side, 1)?;
    let outer = resolved.point(side, 2)?;
    let z1 = elevation
        .sample(inner.position.x, inner.position.y)
        .ok_or(Unresolved::NoData)?;
    let z2 = elevation
        .sample(outer.position.x, outer.position.y)
        .ok_or(Unresolved::NoData)?;
    ratio(Ok((z2 - z1) * 100.0), Ok(distance(inner.position, outer.position)))
}

/// VFW, VW, RAT, LVS, RVS and MVS for a resolved valley transect
pub fn lateral_metrics<S: PointSampler + ?Sized>(
    valley: &ResolvedTransect,
    elevation: &S,
) -> LateralMetrics {
    let vfw = width_between(valley, 1);
    let vw = width_between(valley, 2);
    let lvs = side_slope(valley, Side::Left, elevation);
    let rvs = side_slope(valley, Side::Right, elevation);
    LateralMetrics {
        vfw,
        vw,
        rat: ratio(vw, vfw),
        lvs,
        rvs,
        mvs: mean(lvs, rvs),
    }
}

/// Channel-belt width: distance between the rank-1 belt crossings
pub fn channel_belt_width(belt: &ResolvedTransect) -> Metric {
    width_between(belt, 1)
}
