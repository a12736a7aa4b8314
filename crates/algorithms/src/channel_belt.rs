//! Channel-belt line generation by offsetting stream segments

use crate::geometry::{offset_polyline, JoinStyle, OffsetParams};
use crate::segments::{StreamSegment, T_ID_FIELD};
use crate::transect::Side;
use geo::LineString;
use openres_core::vector::{Feature, FeatureCollection};
use openres_core::{Algorithm, Error, Result, CRS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute name of the side tag on belt lines
pub const SIDE_FIELD: &str = "side";

/// Parameters for channel-belt generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelBeltParams {
    /// Distance of each belt line from the stream
    pub offset: f64,
    pub join: JoinStyle,
    /// Arc vertices per quarter circle for round joins
    pub segments: usize,
    /// Miter length / offset ratio beyond which miters become bevels
    pub miter_limit: f64,
}

impl Default for ChannelBeltParams {
    fn default() -> Self {
        let offset = OffsetParams::default();
        Self {
            offset: 10.0,
            join: offset.join,
            segments: offset.segments,
            miter_limit: offset.miter_limit,
        }
    }
}

impl ChannelBeltParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.offset.is_finite() && self.offset > 0.0) {
            return Err(Error::InvalidParameter {
                name: "offset",
                value: self.offset.to_string(),
                reason: "must be a positive distance".into(),
            });
        }
        if self.segments == 0 {
            return Err(Error::InvalidParameter {
                name: "segments",
                value: "0".into(),
                reason: "round joins need at least one arc step".into(),
            });
        }
        if !(self.miter_limit >= 1.0) {
            return Err(Error::InvalidParameter {
                name: "miter_limit",
                value: self.miter_limit.to_string(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    fn offset_params(&self) -> OffsetParams {
        OffsetParams {
            join: self.join,
            segments: self.segments,
            miter_limit: self.miter_limit,
        }
    }
}

/// One side of the channel belt of a segment
#[derive(Debug, Clone, PartialEq)]
pub struct BeltLine {
    pub t_id: u32,
    pub side: Side,
    /// Signed offset used, positive on the left
    pub offset: f64,
    pub geometry: LineString<f64>,
}

/// Offset every segment to both sides.
///
/// Segments whose geometry cannot be offset are logged and skipped.
pub fn generate_channel_belt(
    segments: &[StreamSegment],
    params: &ChannelBeltParams,
) -> Result<Vec<BeltLine>> {
    params.validate()?;
    let offset_params = params.offset_params();
    let mut lines = Vec::with_capacity(segments.len() * 2);
    for segment in segments {
        for side in Side::BOTH {
            let offset = side.sign() * params.offset;
            match offset_polyline(&segment.geometry, offset, &offset_params) {
                Ok(geometry) => lines.push(BeltLine {
                    t_id: segment.t_id,
                    side,
                    offset,
                    geometry,
                }),
                Err(e) => {
                    tracing::warn!(t_id = segment.t_id, %side, error = %e, "offset failed, segment skipped");
                }
            }
        }
    }
    tracing::info!(segments = segments.len(), lines = lines.len(), "channel belt generated");
    Ok(lines)
}

/// Belt lines as features tagged with `t_ID` and `side`
pub fn belt_lines_to_features(lines: &[BeltLine], crs: Option<CRS>) -> FeatureCollection {
    let mut out = FeatureCollection::with_crs(crs);
    for line in lines {
        out.push(
            Feature::new(line.geometry.clone())
                .with_property(T_ID_FIELD, line.t_id)
                .with_property(SIDE_FIELD, line.side.label())
                .with_property("offset", line.offset),
        );
    }
    out
}

/// Belt lines grouped by segment id and side, for side-tagged sinuosity
#[derive(Debug, Clone, Default)]
pub struct TaggedBelt {
    lines: BTreeMap<(u32, Side), Vec<LineString<f64>>>,
}

impl TaggedBelt {
    pub fn from_lines(lines: &[BeltLine]) -> Self {
        let mut tagged = Self::default();
        for l in lines {
            tagged.insert(l.t_id, l.side, l.geometry.clone());
        }
        tagged
    }

    /// Group a belt layer by its `t_ID` and `side` attributes. Features
    /// missing either tag are ignored.
    pub fn from_features(collection: &FeatureCollection) -> Self {
        let mut tagged = Self::default();
        for f in collection.iter() {
            let t_id = f
                .get_property(T_ID_FIELD)
                .and_then(|v| v.as_i64())
                .and_then(|v| u32::try_from(v).ok());
            let side = match f.get_property(SIDE_FIELD) {
                Some(openres_core::AttributeValue::String(s)) => Side::from_label(s),
                _ => None,
            };
            if let (Some(t_id), Some(side)) = (t_id, side) {
                for part in f.line_strings() {
                    tagged.insert(t_id, side, part.clone());
                }
            }
        }
        tagged
    }

    fn insert(&mut self, t_id: u32, side: Side, line: LineString<f64>) {
        self.lines.entry((t_id, side)).or_default().push(line);
    }

    pub fn side(&self, t_id: u32, side: Side) -> Vec<&LineString<f64>> {
        self.lines
            .get(&(t_id, side))
            .map(|v| v.iter().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// [`Algorithm`] wrapper around [`generate_channel_belt`]
#[derive(Debug, Clone, Default)]
pub struct ChannelBeltGenerator;

impl Algorithm for ChannelBeltGenerator {
    type Input = Vec<StreamSegment>;
    type Output = Vec<BeltLine>;
    type Params = ChannelBeltParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ChannelBelt"
    }

    fn description(&self) -> &'static str {
        "Offset stream segments to the left and right into tagged channel-belt lines"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        generate_channel_belt(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::side_sinuosity;

    fn segments() -> Vec<StreamSegment> {
        vec![
            StreamSegment::new(1, LineString::from(vec![(0.0, 0.0), (100.0, 0.0)])),
            StreamSegment::new(2, LineString::from(vec![(5.0, 5.0), (5.0, 5.0)])),
            StreamSegment::new(3, LineString::from(vec![(0.0, 0.0), (50.0, 50.0), (100.0, 0.0)])),
        ]
    }

    #[test]
    fn test_left_is_positive_right_is_negative() {
        let lines = generate_channel_belt(&segments(), &ChannelBeltParams::default()).unwrap();
        let left = lines.iter().find(|l| l.t_id == 1 && l.side == Side::Left).unwrap();
        let right = lines.iter().find(|l| l.t_id == 1 && l.side == Side::Right).unwrap();
        assert_eq!(left.offset, 10.0);
        assert!(left.geometry.0.iter().all(|c| (c.y - 10.0).abs() < 1e-12));
        assert!(right.geometry.0.iter().all(|c| (c.y + 10.0).abs() < 1e-12));
    }

    #[test]
    fn test_degenerate_segment_is_skipped() {
        let lines = ChannelBeltGenerator.execute_default(segments()).unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.t_id != 2));
    }

    #[test]
    fn test_invalid_params() {
        let params = ChannelBeltParams {
            offset: 0.0,
            ..Default::default()
        };
        assert!(generate_channel_belt(&segments(), &params).is_err());
        let params = ChannelBeltParams {
            miter_limit: 0.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_features_round_trip_into_tagged_sides() {
        let lines = generate_channel_belt(&segments(), &ChannelBeltParams::default()).unwrap();
        let fc = belt_lines_to_features(&lines, None);
        assert_eq!(fc.len(), 4);
        let tagged = TaggedBelt::from_features(&fc);
        assert_eq!(tagged.side(3, Side::Left).len(), 1);
        assert!(tagged.side(2, Side::Left).is_empty());

        let s = side_sinuosity(&tagged.side(1, Side::Left), &tagged.side(1, Side::Right));
        assert_eq!(s.cbs, Ok(1.0));
        let s = side_sinuosity(&tagged.side(3, Side::Left), &tagged.side(3, Side::Right));
        assert!(s.lcs.unwrap() > 1.0);
    }
}
