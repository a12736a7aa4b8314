//! Per-segment hydrogeomorphic metrics
//!
//! Every metric is a [`Metric`]: either a finite value or the reason it
//! could not be computed. Metrics derived from other metrics propagate the
//! first [`Unresolved`] reason with `?`, so a missing intersection never
//! turns into a silently wrong number.

mod belt;
mod lateral;
mod longitudinal;

pub use belt::{side_sinuosity, split_sinuosity, trace_belt_sinuosity, BeltSinuosity};
pub use lateral::{channel_belt_width, lateral_metrics, side_slope, width_between, LateralMetrics};
pub use longitudinal::{down_valley_slope, longitudinal_metrics, sinuosity, LongitudinalMetrics};

use crate::geometry::GeometryError;
use crate::transect::Side;
use thiserror::Error;

/// Value written to numeric export fields for unresolved metrics
pub const UNRESOLVED_SENTINEL: f64 = -9999.0;

/// Why a metric has no value
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    #[error("no rank-{rank} intersection on the {side} side")]
    RankNotPresent { side: Side, rank: usize },

    #[error("degenerate geometry")]
    Degenerate,

    #[error("polyline has fewer than 2 vertices")]
    TooFewVertices,

    #[error("no data at sample location")]
    NoData,

    #[error("zero denominator")]
    ZeroDenominator,

    #[error("no transect for this segment")]
    NoTransect,

    #[error("no channel-belt line crosses this segment's transect")]
    NoBeltCrossing,

    #[error("input layer not supplied")]
    NotSupplied,
}

impl From<GeometryError> for Unresolved {
    fn from(e: GeometryError) -> Self {
        match e {
            GeometryError::TooFewVertices(_) => Unresolved::TooFewVertices,
            GeometryError::ZeroLength => Unresolved::Degenerate,
        }
    }
}

/// A metric value or the reason it is missing
pub type Metric = Result<f64, Unresolved>;

/// Numeric value for export, [`UNRESOLVED_SENTINEL`] when unresolved
pub fn to_sentinel(metric: &Metric) -> f64 {
    match metric {
        Ok(v) if v.is_finite() => *v,
        _ => UNRESOLVED_SENTINEL,
    }
}

/// Mean of two metrics; unresolved if either is
pub fn mean(a: Metric, b: Metric) -> Metric {
    Ok((a? + b?) / 2.0)
}

/// `numerator / denominator`, unresolved on a zero denominator
pub fn ratio(numerator: Metric, denominator: Metric) -> Metric {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return Err(Unresolved::ZeroDenominator);
    }
    Ok(n / d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_requires_both_sides() {
        assert_eq!(mean(Ok(2.0), Ok(4.0)), Ok(3.0));
        let missing = Err(Unresolved::RankNotPresent {
            side: Side::Right,
            rank: 2,
        });
        assert_eq!(mean(Ok(2.0), missing), missing);
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(Ok(3.0), Ok(0.0)), Err(Unresolved::ZeroDenominator));
        assert_eq!(ratio(Ok(3.0), Ok(2.0)), Ok(1.5));
        assert_eq!(ratio(Err(Unresolved::NoData), Ok(0.0)), Err(Unresolved::NoData));
    }

    #[test]
    fn test_sentinel() {
        assert_eq!(to_sentinel(&Ok(1.25)), 1.25);
        assert_eq!(to_sentinel(&Err(Unresolved::Degenerate)), UNRESOLVED_SENTINEL);
        assert_eq!(to_sentinel(&Ok(f64::NAN)), UNRESOLVED_SENTINEL);
    }

    #[test]
    fn test_unresolved_messages() {
        let e = Unresolved::RankNotPresent {
            side: Side::Left,
            rank: 2,
        };
        assert_eq!(e.to_string(), "no rank-2 intersection on the left side");
    }
}
