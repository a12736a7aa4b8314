//! Stream segments and their `t_ID` identity
//!
//! Every per-segment output record is keyed by `t_ID`. Segments read from a
//! stream network keep any id they already carry; the rest receive fresh
//! sequential ids after the largest existing one.

use geo::{Coord, LineString};
use openres_core::vector::{Feature, FeatureCollection};
use openres_core::{Error, Result};
use std::collections::BTreeSet;

/// Attribute name of the segment identifier
pub const T_ID_FIELD: &str = "t_ID";

/// One polyline of the stream network
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSegment {
    pub t_id: u32,
    /// Vertices in digitized (flow) direction
    pub geometry: LineString<f64>,
}

impl StreamSegment {
    pub fn new(t_id: u32, geometry: LineString<f64>) -> Self {
        Self { t_id, geometry }
    }
}

/// Read the stream network and give every segment a unique `t_ID`.
///
/// A feature with several line parts becomes one segment whose parts are
/// chained in order, dropping the repeated vertex where parts touch. A
/// feature without line geometry becomes an empty segment, so it still gets
/// an output row.
///
/// Existing ids are kept (integral numeric values >= 1); missing or
/// unusable ones are replaced by `max(existing) + 1, + 2, ...` in input
/// order. Two features with the same id are an error.
pub fn assign_segment_ids(network: &FeatureCollection) -> Result<Vec<StreamSegment>> {
    let existing: Vec<Option<u32>> = network
        .iter()
        .map(|f| {
            f.get_property(T_ID_FIELD)
                .and_then(|v| v.as_i64())
                .and_then(|id| u32::try_from(id).ok())
                .filter(|id| *id >= 1)
        })
        .collect();

    let mut seen = BTreeSet::new();
    for id in existing.iter().flatten() {
        if !seen.insert(*id) {
            return Err(Error::DuplicateSegmentId(*id));
        }
    }

    let mut next = seen.last().copied().unwrap_or(0);
    let mut assigned = 0usize;
    let segments = network
        .iter()
        .zip(existing)
        .map(|(feature, id)| {
            let t_id = id.unwrap_or_else(|| {
                next += 1;
                assigned += 1;
                next
            });
            StreamSegment::new(t_id, chain_parts(feature))
        })
        .collect();

    tracing::debug!(assigned, kept = seen.len(), "segment ids assigned");
    Ok(segments)
}

fn chain_parts(feature: &Feature) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for part in feature.line_strings() {
        for c in &part.0 {
            if coords.last() != Some(c) {
                coords.push(*c);
            }
        }
    }
    LineString::new(coords)
}

/// The augmented stream network: one feature per segment with its `t_ID`
pub fn segments_to_features(
    segments: &[StreamSegment],
    crs: Option<openres_core::CRS>,
) -> FeatureCollection {
    let mut out = FeatureCollection::with_crs(crs);
    for s in segments {
        out.push(Feature::new(s.geometry.clone()).with_property(T_ID_FIELD, s.t_id));
    }
    out
}
