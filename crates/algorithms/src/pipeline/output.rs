//! Per-segment output records and their export as feature layers

use crate::metrics::{
    to_sentinel, BeltSinuosity, LateralMetrics, LongitudinalMetrics, Metric, Unresolved,
};
use crate::segments::T_ID_FIELD;
use crate::transect::{Side, Transect};
use geo::{Coord, Point};
use openres_core::vector::{AttributeValue, Feature, FeatureCollection};
use openres_core::CRS;

/// Attribute fields of a segment center, in export order after `t_ID`
pub const ATTRIBUTE_FIELDS: [&str; 15] = [
    "ELE", "PRE", "GEO", "VFW", "VW", "RAT", "LVS", "RVS", "MVS", "DVS", "SIN", "CBW", "LCS",
    "RCS", "CBS",
];

/// The fifteen attributes of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAttributes {
    /// Elevation at the segment center
    pub ele: Metric,
    /// Precipitation at the segment center
    pub pre: Metric,
    /// Geology class at the segment center
    pub geo: Result<AttributeValue, Unresolved>,
    pub lateral: LateralMetrics,
    pub longitudinal: LongitudinalMetrics,
    /// Channel-belt width
    pub cbw: Metric,
    pub belt: BeltSinuosity,
}

impl SegmentAttributes {
    /// Every attribute unresolved for the same reason
    pub fn unresolved(reason: Unresolved) -> Self {
        Self {
            ele: Err(reason),
            pre: Err(reason),
            geo: Err(reason),
            lateral: LateralMetrics::unresolved(reason),
            longitudinal: LongitudinalMetrics {
                dvs: Err(reason),
                sin: Err(reason),
            },
            cbw: Err(reason),
            belt: BeltSinuosity::unresolved(reason),
        }
    }

    /// The numeric attributes by field name, GEO excluded
    pub fn numeric(&self) -> [(&'static str, Metric); 14] {
        let l = &self.lateral;
        [
            ("ELE", self.ele),
            ("PRE", self.pre),
            ("VFW", l.vfw),
            ("VW", l.vw),
            ("RAT", l.rat),
            ("LVS", l.lvs),
            ("RVS", l.rvs),
            ("MVS", l.mvs),
            ("DVS", self.longitudinal.dvs),
            ("SIN", self.longitudinal.sin),
            ("CBW", self.cbw),
            ("LCS", self.belt.lcs),
            ("RCS", self.belt.rcs),
            ("CBS", self.belt.cbs),
        ]
    }

    /// Names of the attributes without a value
    pub fn unresolved_fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = self
            .numeric()
            .into_iter()
            .filter(|(_, m)| m.is_err())
            .map(|(name, _)| name)
            .collect();
        if self.geo.is_err() {
            fields.push("GEO");
        }
        fields
    }

    pub fn is_complete(&self) -> bool {
        self.geo.is_ok() && self.numeric().iter().all(|(_, m)| m.is_ok())
    }
}

/// The output row of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCenter {
    pub t_id: u32,
    /// Transect origin, or the first vertex when no transect could be built
    pub position: Option<Coord<f64>>,
    pub attributes: SegmentAttributes,
    pub left_insufficient: bool,
    pub right_insufficient: bool,
}

/// Boundary layer a reference point was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceLayer {
    Valley,
    Belt,
}

impl ReferenceLayer {
    pub fn label(self) -> &'static str {
        match self {
            ReferenceLayer::Valley => "valley",
            ReferenceLayer::Belt => "belt",
        }
    }
}

/// Intersection used by a width metric, kept for inspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    pub t_id: u32,
    pub layer: ReferenceLayer,
    pub side: Side,
    pub rank: usize,
    pub distance: f64,
    pub position: Coord<f64>,
}

/// Everything a run produces, each list sorted by `t_ID`
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub centers: Vec<SegmentCenter>,
    pub transects: Vec<Transect>,
    pub references: Vec<ReferencePoint>,
}

impl PipelineOutput {
    pub fn center(&self, t_id: u32) -> Option<&SegmentCenter> {
        self.centers
            .binary_search_by_key(&t_id, |c| c.t_id)
            .ok()
            .map(|i| &self.centers[i])
    }
}

/// Segment centers as points carrying `t_ID` and the fifteen attributes.
///
/// Unresolved numbers are written as the `-9999` sentinel, an unresolved
/// GEO as null. `L_INSUF` / `R_INSUF` flag sides whose transect ran out of
/// intersections.
pub fn centers_to_features(centers: &[SegmentCenter], crs: Option<CRS>) -> FeatureCollection {
    let mut out = FeatureCollection::with_crs(crs);
    for center in centers {
        let mut feature = Feature {
            geometry: center.position.map(|c| Point::from(c).into()),
            properties: Default::default(),
        };
        feature.set_property(T_ID_FIELD, center.t_id);
        let numeric = center.attributes.numeric();
        for field in ATTRIBUTE_FIELDS {
            let value = match field {
                "GEO" => center.attributes.geo.clone().unwrap_or(AttributeValue::Null),
                _ => numeric
                    .iter()
                    .find(|(name, _)| *name == field)
                    .map(|(_, m)| AttributeValue::from(to_sentinel(m)))
                    .unwrap_or(AttributeValue::Null),
            };
            feature.set_property(field, value);
        }
        feature.set_property("L_INSUF", AttributeValue::Bool(center.left_insufficient));
        feature.set_property("R_INSUF", AttributeValue::Bool(center.right_insufficient));
        out.push(feature);
    }
    out
}

/// Transect lines with their per-side extents and flags
pub fn transects_to_features(transects: &[Transect], crs: Option<CRS>) -> FeatureCollection {
    let mut out = FeatureCollection::with_crs(crs);
    for t in transects {
        out.push(
            Feature::new(t.geometry())
                .with_property(T_ID_FIELD, t.t_id)
                .with_property("L_LEN", t.left_length)
                .with_property("R_LEN", t.right_length)
                .with_property("L_INSUF", AttributeValue::Bool(t.left_insufficient))
                .with_property("R_INSUF", AttributeValue::Bool(t.right_insufficient)),
        );
    }
    out
}

/// Reference points tagged with layer, side and rank
pub fn references_to_features(points: &[ReferencePoint], crs: Option<CRS>) -> FeatureCollection {
    let mut out = FeatureCollection::with_crs(crs);
    for p in points {
        out.push(
            Feature::new(Point::from(p.position))
                .with_property(T_ID_FIELD, p.t_id)
                .with_property("layer", p.layer.label())
                .with_property("side", p.side.label())
                .with_property("rank", p.rank as u32)
                .with_property("distance", p.distance),
        );
    }
    out
}
