//! Geometry primitives
//!
//! Pure, deterministic line/point algebra used by every other component:
//! - Directions and perpendiculars of 2-point lines
//! - Tolerant segment/segment intersection
//! - Curvilinear length, straight-line distance, positions along a polyline
//! - Signed polyline offset with miter/bevel/round joins
//! - Rectangle clipping and splitting of polylines
//!
//! Degenerate input (zero-length lines, coincident points) is reported as a
//! [`GeometryError`] instead of producing NaN or infinities.

mod clip;
mod offset;
mod primitives;

pub use clip::{clip_line_by_rect, ClipRect};
pub use offset::{offset_polyline, JoinStyle, OffsetParams};
pub use primitives::{
    chord_length, cross, curvilinear_length, distance, dot, left_normal, local_direction,
    point_at_distance, project_onto, segment_intersection, split_at_point, unit_direction,
    SegmentHit, PARALLEL_EPSILON,
};

use thiserror::Error;

/// Failures of the geometry primitives on degenerate input
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("zero-length line")]
    ZeroLength,
    #[error("polyline needs at least 2 distinct vertices, got {0}")]
    TooFewVertices(usize),
}
