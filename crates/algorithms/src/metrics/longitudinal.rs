//! Longitudinal metrics: down-valley slope and channel sinuosity

use super::{Metric, Unresolved};
use crate::geometry::{chord_length, curvilinear_length};
use geo::LineString;
use openres_core::PointSampler;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongitudinalMetrics {
    /// Down-valley slope, percent
    pub dvs: Metric,
    /// Sinuosity
    pub sin: Metric,
}

/// Length over chord of a polyline, never below 1. A closed line has no
/// chord and is unresolved.
pub fn sinuosity(line: &LineString<f64>) -> Metric {
    let chord = chord_length(line)?;
    if chord == 0.0 {
        return Err(Unresolved::Degenerate);
    }
    // summing edges of a straight line can land an ulp under the chord
    Ok((curvilinear_length(line) / chord).max(1.0))
}

/// Elevation drop from the first to the last vertex over the curvilinear
/// length, as percent.
pub fn down_valley_slope<S: PointSampler + ?Sized>(line: &LineString<f64>, elevation: &S) -> Metric {
    let (Some(start), Some(end)) = (line.0.first(), line.0.last()) else {
        return Err(Unresolved::TooFewVertices);
    };
    if line.0.len() < 2 {
        return Err(Unresolved::TooFewVertices);
    }
    let length = curvilinear_length(line);
    if length == 0.0 {
        return Err(Unresolved::Degenerate);
    }
    let z_start = elevation.sample(start.x, start.y).ok_or(Unresolved::NoData)?;
    let z_end = elevation.sample(end.x, end.y).ok_or(Unresolved::NoData)?;
    Ok((z_start - z_end) / length * 100.0)
}

pub fn longitudinal_metrics<S: PointSampler + ?Sized>(
    line: &LineString<f64>,
    elevation: &S,
) -> LongitudinalMetrics {
    LongitudinalMetrics {
        dvs: down_valley_slope(line, elevation),
        sin: sinuosity(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Plane dropping 0.02 per unit eastwards
    struct Ramp;

    impl PointSampler for Ramp {
        fn sample(&self, x: f64, _y: f64) -> Option<f64> {
            Some(50.0 - 0.02 * x)
        }
    }

    #[test]
    fn test_straight_segment_has_unit_sinuosity() {
        let line = LineString::from(vec![(0.0, 0.0), (100.0, 0.0)]);
        assert_relative_eq!(sinuosity(&line).unwrap(), 1.0);
    }

    #[test]
    fn test_straight_multivertex_line_never_below_one() {
        let dir = (0.631_915_2, -0.775_038_1);
        for steps in [
            vec![0.0, 21.43, 97.1, 350.2, 700.9],
            vec![0.0, 0.1, 0.3, 0.7, 1.3, 2.9, 7.7, 13.1],
            vec![0.0, 1e-3, 3.3e5, 7.1e5],
        ] {
            let line: LineString<f64> = steps
                .iter()
                .map(|&t| (dir.0 * t, dir.1 * t))
                .collect::<Vec<_>>()
                .into();
            let sin = sinuosity(&line).unwrap();
            assert!(sin >= 1.0, "SIN {} below 1", sin);
            assert_relative_eq!(sin, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_meander_sinuosity() {
        let line = LineString::from(vec![(0.0, 0.0), (3.0, 4.0), (6.0, 0.0)]);
        assert_relative_eq!(sinuosity(&line).unwrap(), 10.0 / 6.0);
    }

    #[test]
    fn test_closed_line_is_unresolved() {
        let line = LineString::from(vec![(0.0, 0.0), (5.0, 5.0), (0.0, 0.0)]);
        assert_eq!(sinuosity(&line), Err(Unresolved::Degenerate));
        let single = LineString::from(vec![(0.0, 0.0)]);
        assert_eq!(sinuosity(&single), Err(Unresolved::TooFewVertices));
    }

    #[test]
    fn test_down_valley_slope() {
        let line = LineString::from(vec![(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)]);
        let m = longitudinal_metrics(&line, &Ramp);
        assert_relative_eq!(m.dvs.unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(m.sin.unwrap(), 1.0);
    }

    #[test]
    fn test_down_valley_slope_uses_curvilinear_length() {
        let line = LineString::from(vec![(0.0, 0.0), (50.0, 50.0), (100.0, 0.0)]);
        let expected = 2.0 / (100.0 * std::f64::consts::SQRT_2) * 100.0;
        assert_relative_eq!(down_valley_slope(&line, &Ramp).unwrap(), expected, epsilon = 1e-9);
    }
}
