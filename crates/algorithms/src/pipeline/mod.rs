//! End-to-end extraction over a stream network
//!
//! For every segment: transect generation against the valley lines, then
//! the lateral, longitudinal and channel-belt metrics and the point samples
//! at the segment center. Segments are independent and run as a parallel
//! map; results are sorted by `t_ID`.

mod config;
mod output;

pub use config::{BeltMode, PipelineConfig};
pub use output::{
    centers_to_features, references_to_features, transects_to_features, PipelineOutput,
    ReferenceLayer, ReferencePoint, SegmentAttributes, SegmentCenter, ATTRIBUTE_FIELDS,
};

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::channel_belt::TaggedBelt;
use crate::metrics::{
    channel_belt_width, lateral_metrics, longitudinal_metrics, side_sinuosity,
    trace_belt_sinuosity, BeltSinuosity, Metric, Unresolved,
};
use crate::segments::StreamSegment;
use crate::transect::{
    generate_transect, resolve_intersections, BoundaryLayer, ResolvedTransect, Side, Transect,
};
use geo::Coord;
use openres_core::crs::ensure_same_crs;
use openres_core::{AttributeLookup, Error, PointSampler, Result, CRS};
use openres_parallel::{CancelToken, ParallelStrategy};

/// Layers bound once for a whole run
pub struct PipelineInputs<'a> {
    pub segments: &'a [StreamSegment],
    /// Valley lines: rank 1 is the valley floor, rank 2 the valley top
    pub valley_lines: &'a BoundaryLayer,
    /// Channel-belt lines for CBW and the split-at-transect tracer
    pub channel_belt: Option<&'a BoundaryLayer>,
    /// Channel-belt lines tagged by segment and side, for [`BeltMode::TaggedSides`]
    pub tagged_belt: Option<&'a TaggedBelt>,
    pub elevation: &'a dyn PointSampler,
    pub precipitation: Option<&'a dyn PointSampler>,
    pub geology: Option<&'a dyn AttributeLookup>,
    /// Declared CRS of each input layer by name, checked for agreement
    /// before any segment is processed
    pub layer_crs: Vec<(&'a str, Option<&'a CRS>)>,
}

impl<'a> PipelineInputs<'a> {
    /// Inputs with only the required layers; optional ones are unset
    pub fn new(
        segments: &'a [StreamSegment],
        valley_lines: &'a BoundaryLayer,
        elevation: &'a dyn PointSampler,
    ) -> Self {
        Self {
            segments,
            valley_lines,
            channel_belt: None,
            tagged_belt: None,
            elevation,
            precipitation: None,
            geology: None,
            layer_crs: Vec::new(),
        }
    }

    fn check(&self, config: &PipelineConfig) -> Result<()> {
        ensure_same_crs(self.layer_crs.iter().copied())?;
        if self.segments.is_empty() {
            return Err(Error::MissingInput("stream network has no segments".into()));
        }
        if self.valley_lines.is_empty() {
            return Err(Error::MissingInput("valley lines layer is empty".into()));
        }
        let mut seen = HashSet::with_capacity(self.segments.len());
        if let Some(dup) = self.segments.iter().find(|s| !seen.insert(s.t_id)) {
            return Err(Error::DuplicateSegmentId(dup.t_id));
        }
        if config.belt_mode == BeltMode::TaggedSides && self.tagged_belt.is_none() {
            return Err(Error::MissingInput(
                "belt_mode tagged_sides needs side-tagged channel-belt lines".into(),
            ));
        }
        Ok(())
    }
}

/// Everything computed for one segment before sorting
struct SegmentRun {
    center: SegmentCenter,
    transect: Option<Transect>,
    references: Vec<ReferencePoint>,
}

/// Run the full extraction.
///
/// Fails before touching any segment when the configuration is invalid,
/// layers disagree on CRS, a required input is missing or two segments
/// share a `t_ID`. Per-segment
/// problems never fail the run; they leave unresolved attributes in that
/// segment's row. Cancelling `cancel` stops dispatching segments and the
/// run returns [`Error::Cancelled`].
pub fn run_pipeline(
    inputs: &PipelineInputs<'_>,
    config: &PipelineConfig,
    cancel: &CancelToken,
) -> Result<PipelineOutput> {
    config.validate()?;
    inputs.check(config)?;

    let total = inputs.segments.len();
    tracing::info!(
        segments = total,
        belt = inputs.channel_belt.is_some() || inputs.tagged_belt.is_some(),
        belt_mode = ?config.belt_mode,
        "extraction started"
    );

    let completed = AtomicUsize::new(0);
    let runs = config
        .processing
        .par_map_cancellable(inputs.segments, cancel, |segment| {
            let run = process_segment(segment, inputs, config);
            completed.fetch_add(1, Ordering::Relaxed);
            run
        })
        .ok_or_else(|| Error::Cancelled {
            completed: completed.load(Ordering::Relaxed),
            total,
        })?;

    let mut output = PipelineOutput::default();
    for run in runs {
        output.centers.push(run.center);
        output.transects.extend(run.transect);
        output.references.extend(run.references);
    }
    output.centers.sort_by_key(|c| c.t_id);
    output.transects.sort_by_key(|t| t.t_id);
    output.references.sort_by_key(|r| r.t_id);

    let incomplete = output
        .centers
        .iter()
        .filter(|c| !c.attributes.is_complete())
        .count();
    let insufficient = output
        .centers
        .iter()
        .filter(|c| c.left_insufficient || c.right_insufficient)
        .count();
    tracing::info!(
        segments = total,
        incomplete,
        insufficient,
        "extraction finished"
    );
    Ok(output)
}

fn process_segment(
    segment: &StreamSegment,
    inputs: &PipelineInputs<'_>,
    config: &PipelineConfig,
) -> SegmentRun {
    let longitudinal = longitudinal_metrics(&segment.geometry, inputs.elevation);
    let tagged = |reason: Unresolved| match (config.belt_mode, inputs.tagged_belt) {
        (BeltMode::TaggedSides, Some(tagged)) => side_sinuosity(
            &tagged.side(segment.t_id, Side::Left),
            &tagged.side(segment.t_id, Side::Right),
        ),
        _ => BeltSinuosity::unresolved(reason),
    };

    let transect = match generate_transect(segment, inputs.valley_lines, &config.transect) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(t_id = segment.t_id, error = %e, "no transect for segment");
            let reason = Unresolved::from(e);
            let position = segment.geometry.0.first().copied();
            let mut attributes = SegmentAttributes::unresolved(reason);
            attributes.longitudinal = longitudinal;
            if let Some(p) = position {
                sample_center(&mut attributes, p, inputs);
            }
            attributes.belt = tagged(reason);
            return SegmentRun {
                center: SegmentCenter {
                    t_id: segment.t_id,
                    position,
                    attributes,
                    left_insufficient: false,
                    right_insufficient: false,
                },
                transect: None,
                references: Vec::new(),
            };
        }
    };

    let valley = resolve_intersections(&transect, inputs.valley_lines);
    let lateral = lateral_metrics(&valley, inputs.elevation);
    let mut references = reference_points(&valley, ReferenceLayer::Valley, transect.t_id, 2);

    let (cbw, belt): (Metric, BeltSinuosity) = match inputs.channel_belt {
        Some(layer) => {
            let crossed = resolve_intersections(&transect, layer);
            references.extend(reference_points(&crossed, ReferenceLayer::Belt, transect.t_id, 1));
            let belt = match config.belt_mode {
                BeltMode::SplitAtTransect => trace_belt_sinuosity(segment, &crossed, layer),
                BeltMode::TaggedSides => tagged(Unresolved::NotSupplied),
            };
            (channel_belt_width(&crossed), belt)
        }
        None => (Err(Unresolved::NotSupplied), tagged(Unresolved::NotSupplied)),
    };

    let mut attributes = SegmentAttributes {
        ele: Err(Unresolved::NoData),
        pre: Err(Unresolved::NotSupplied),
        geo: Err(Unresolved::NotSupplied),
        lateral,
        longitudinal,
        cbw,
        belt,
    };
    sample_center(&mut attributes, transect.origin, inputs);

    let center = SegmentCenter {
        t_id: segment.t_id,
        position: Some(transect.origin),
        attributes,
        left_insufficient: transect.left_insufficient,
        right_insufficient: transect.right_insufficient,
    };
    SegmentRun {
        center,
        transect: Some(transect),
        references,
    }
}

/// ELE, PRE and GEO at the segment center
fn sample_center(attributes: &mut SegmentAttributes, at: Coord<f64>, inputs: &PipelineInputs<'_>) {
    attributes.ele = inputs
        .elevation
        .sample(at.x, at.y)
        .ok_or(Unresolved::NoData);
    attributes.pre = match inputs.precipitation {
        Some(p) => p.sample(at.x, at.y).ok_or(Unresolved::NoData),
        None => Err(Unresolved::NotSupplied),
    };
    attributes.geo = match inputs.geology {
        Some(g) => g.lookup(at.x, at.y).ok_or(Unresolved::NoData),
        None => Err(Unresolved::NotSupplied),
    };
}

fn reference_points(
    resolved: &ResolvedTransect,
    layer: ReferenceLayer,
    t_id: u32,
    max_rank: usize,
) -> Vec<ReferencePoint> {
    let mut out = Vec::new();
    for side in Side::BOTH {
        for rank in 1..=max_rank {
            if let Ok(p) = resolved.point(side, rank) {
                out.push(ReferencePoint {
                    t_id,
                    layer,
                    side,
                    rank,
                    distance: p.distance,
                    position: p.position,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::LineString;
    use openres_core::raster::{GeoTransform, Raster};

    fn flat_dem() -> Raster<f64> {
        let mut dem = Raster::filled(40, 40, 100.0);
        dem.set_transform(GeoTransform::new(-2000.0, 2000.0, 100.0, -100.0));
        dem
    }

    fn valley_lines() -> BoundaryLayer {
        BoundaryLayer::new(
            [50.0, -50.0, 200.0, -200.0]
                .iter()
                .map(|&y| LineString::from(vec![(-2000.0, y), (2000.0, y)]))
                .collect(),
        )
    }

    fn segment(t_id: u32, x0: f64) -> StreamSegment {
        StreamSegment::new(t_id, LineString::from(vec![(x0, 0.0), (x0 + 1000.0, 0.0)]))
    }

    #[test]
    fn test_sequential_run_resolves_widths() {
        let dem = flat_dem();
        let lines = valley_lines();
        let segments = vec![segment(2, 0.0), segment(1, -1000.0)];
        let inputs = PipelineInputs::new(&segments, &lines, &dem);
        let config = PipelineConfig {
            processing: openres_parallel::ProcessingMode::Sequential,
            ..Default::default()
        };
        let out = run_pipeline(&inputs, &config, &CancelToken::new()).unwrap();

        assert_eq!(out.centers.iter().map(|c| c.t_id).collect::<Vec<_>>(), vec![1, 2]);
        let a = &out.centers[0].attributes;
        assert_relative_eq!(a.lateral.vfw.unwrap(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(a.lateral.vw.unwrap(), 400.0, epsilon = 1e-9);
        assert_relative_eq!(a.lateral.rat.unwrap(), 4.0, epsilon = 1e-9);
        assert_relative_eq!(a.ele.unwrap(), 100.0);
        assert_eq!(a.pre, Err(Unresolved::NotSupplied));
        assert_eq!(a.cbw, Err(Unresolved::NotSupplied));
        assert_eq!(out.references.len(), 8);
        assert_eq!(out.transects.len(), 2);
    }

    #[test]
    fn test_degenerate_segment_keeps_its_row() {
        let dem = flat_dem();
        let lines = valley_lines();
        let segments = vec![
            segment(1, 0.0),
            StreamSegment::new(2, LineString::from(vec![(5.0, 5.0), (5.0, 5.0)])),
        ];
        let inputs = PipelineInputs::new(&segments, &lines, &dem);
        let out = run_pipeline(&inputs, &PipelineConfig::default(), &CancelToken::new()).unwrap();
        assert_eq!(out.centers.len(), 2);
        assert_eq!(out.transects.len(), 1);
        let broken = &out.centers[1].attributes;
        assert_eq!(broken.lateral.vfw, Err(Unresolved::Degenerate));
        assert_eq!(broken.longitudinal.sin, Err(Unresolved::Degenerate));
        assert_relative_eq!(broken.ele.unwrap(), 100.0);
        assert!(out.centers[0].attributes.lateral.vfw.is_ok());
    }

    #[test]
    fn test_empty_inputs_are_fatal() {
        let dem = flat_dem();
        let lines = valley_lines();
        let none: Vec<StreamSegment> = Vec::new();
        let inputs = PipelineInputs::new(&none, &lines, &dem);
        assert!(matches!(
            run_pipeline(&inputs, &PipelineConfig::default(), &CancelToken::new()),
            Err(Error::MissingInput(_))
        ));

        let empty = BoundaryLayer::new(Vec::new());
        let segments = vec![segment(1, 0.0)];
        let inputs = PipelineInputs::new(&segments, &empty, &dem);
        assert!(matches!(
            run_pipeline(&inputs, &PipelineConfig::default(), &CancelToken::new()),
            Err(Error::MissingInput(_))
        ));
    }

    #[test]
    fn test_duplicate_t_id_is_fatal() {
        let dem = flat_dem();
        let lines = valley_lines();
        let segments = vec![segment(1, 0.0), segment(2, 1000.0), segment(1, -1000.0)];
        let inputs = PipelineInputs::new(&segments, &lines, &dem);
        assert!(matches!(
            run_pipeline(&inputs, &PipelineConfig::default(), &CancelToken::new()),
            Err(Error::DuplicateSegmentId(1))
        ));
    }

    #[test]
    fn test_tagged_mode_requires_tagged_belt() {
        let dem = flat_dem();
        let lines = valley_lines();
        let segments = vec![segment(1, 0.0)];
        let inputs = PipelineInputs::new(&segments, &lines, &dem);
        let config = PipelineConfig {
            belt_mode: BeltMode::TaggedSides,
            ..Default::default()
        };
        assert!(matches!(
            run_pipeline(&inputs, &config, &CancelToken::new()),
            Err(Error::MissingInput(_))
        ));
    }

    #[test]
    fn test_cancelled_before_start() {
        let dem = flat_dem();
        let lines = valley_lines();
        let segments = vec![segment(1, 0.0), segment(2, 1000.0)];
        let inputs = PipelineInputs::new(&segments, &lines, &dem);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            run_pipeline(&inputs, &PipelineConfig::default(), &cancel),
            Err(Error::Cancelled { total: 2, .. })
        ));
    }
}
