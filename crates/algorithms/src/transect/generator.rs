//! Transect generation by incremental extension

use super::{BoundaryLayer, Side, Transect, TIE_TOLERANCE};
use crate::geometry::{curvilinear_length, local_direction, point_at_distance, GeometryError};
use crate::segments::StreamSegment;
use geo::Coord;
use openres_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Crossings needed on each side before it stops growing
pub const REQUIRED_INTERSECTIONS: usize = 2;

/// Parameters for transect generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransectParams {
    /// Length added per growth step on every unsatisfied side
    pub extension_increment: f64,
    /// Cap on the extension of each side
    pub max_length: f64,
}

impl Default for TransectParams {
    fn default() -> Self {
        Self {
            extension_increment: 250.0,
            max_length: 50_000.0,
        }
    }
}

impl TransectParams {
    /// Reject non-positive or non-finite distances
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("extension_increment", self.extension_increment),
            ("max_length", self.max_length),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "must be a positive distance".into(),
                });
            }
        }
        if self.extension_increment > self.max_length {
            return Err(Error::InvalidParameter {
                name: "extension_increment",
                value: self.extension_increment.to_string(),
                reason: format!("exceeds max_length ({})", self.max_length),
            });
        }
        Ok(())
    }
}

/// Grow a transect through the midpoint of `segment` until each side
/// crosses `layer` at least [`REQUIRED_INTERSECTIONS`] times.
///
/// Unsatisfied sides grow together by `extension_increment`, capped at
/// `max_length`. Growth stops when both sides are satisfied or an
/// unsatisfied side reaches the cap; such sides are flagged as
/// insufficient. Fails only on degenerate segment geometry.
pub fn generate_transect(
    segment: &StreamSegment,
    layer: &BoundaryLayer,
    params: &TransectParams,
) -> std::result::Result<Transect, GeometryError> {
    let length = curvilinear_length(&segment.geometry);
    if length == 0.0 {
        return Err(if segment.geometry.0.len() < 2 {
            GeometryError::TooFewVertices(segment.geometry.0.len())
        } else {
            GeometryError::ZeroLength
        });
    }
    let (origin, _) = point_at_distance(&segment.geometry, length / 2.0)?;
    let direction = local_direction(&segment.geometry, length / 2.0)?;
    let normal = Coord {
        x: -direction.y,
        y: direction.x,
    };

    let count = |side: Side, len: f64| -> usize {
        let end = origin + normal * (side.sign() * len);
        layer
            .crossings(origin, end)
            .iter()
            .filter(|c| c.distance > TIE_TOLERANCE)
            .count()
    };

    let mut lengths = [0.0_f64; 2];
    let mut satisfied = [false; 2];
    loop {
        let mut capped = false;
        for (i, side) in Side::BOTH.into_iter().enumerate() {
            if satisfied[i] {
                continue;
            }
            lengths[i] = (lengths[i] + params.extension_increment).min(params.max_length);
            satisfied[i] = count(side, lengths[i]) >= REQUIRED_INTERSECTIONS;
            if !satisfied[i] && lengths[i] >= params.max_length {
                capped = true;
            }
        }
        if (satisfied[0] && satisfied[1]) || capped {
            break;
        }
    }

    let transect = Transect {
        t_id: segment.t_id,
        origin,
        normal,
        left_length: lengths[0],
        right_length: lengths[1],
        left_insufficient: !satisfied[0],
        right_insufficient: !satisfied[1],
    };
    if !satisfied[0] || !satisfied[1] {
        tracing::warn!(
            t_id = segment.t_id,
            left = satisfied[0],
            right = satisfied[1],
            "transect reached max_length with insufficient intersections"
        );
    }
    Ok(transect)
}
