//! # OpenRES Algorithms
//!
//! Hydrogeomorphic feature extraction for river Functional Process Zones.
//!
//! ## Components
//!
//! - **geometry**: Polyline primitives, offsetting and clipping
//! - **segments**: Stream segments and `t_ID` assignment
//! - **transect**: Perpendicular transect growth and ranked boundary crossings
//! - **metrics**: VFW, VW, RAT, LVS, RVS, MVS, DVS, SIN, CBW, LCS, RCS, CBS
//! - **channel_belt**: Channel-belt lines offset from the stream
//! - **lookup**: Polygon attribute lookup (geology)
//! - **valley_floor**: Slope-limited cost delineation of the valley floor
//! - **pipeline**: The per-segment extraction run

pub mod channel_belt;
pub mod geometry;
pub mod lookup;
pub mod metrics;
pub mod pipeline;
pub mod segments;
pub mod transect;
pub mod valley_floor;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::channel_belt::{
        belt_lines_to_features, generate_channel_belt, BeltLine, ChannelBeltGenerator,
        ChannelBeltParams, TaggedBelt,
    };
    pub use crate::lookup::PolygonAttributeLayer;
    pub use crate::metrics::{Metric, Unresolved, UNRESOLVED_SENTINEL};
    pub use crate::pipeline::{
        centers_to_features, references_to_features, run_pipeline, transects_to_features,
        BeltMode, PipelineConfig, PipelineInputs, PipelineOutput, SegmentCenter,
    };
    pub use crate::segments::{assign_segment_ids, segments_to_features, StreamSegment};
    pub use crate::transect::{
        generate_transect, resolve_intersections, BoundaryLayer, Side, Transect, TransectParams,
    };
    pub use crate::valley_floor::{
        delineate_valley_floor, rasterize_lines, Connectivity, ValleyFloor,
        ValleyFloorDelineation, ValleyFloorParams,
    };
    pub use openres_core::prelude::*;
    pub use openres_parallel::{CancelToken, ProcessingMode};
}
