//! Transects: perpendicular lines through stream segment midpoints
//!
//! A [`Transect`] is grown from the midpoint of a segment until it crosses
//! the boundary layer at least twice on each side (see [`generate_transect`]).
//! The crossings are then ranked per side by distance from the origin
//! (see [`resolve_intersections`]).

mod boundary;
mod generator;
mod resolver;

pub use boundary::{BoundaryLayer, Crossing, TIE_TOLERANCE};
pub use generator::{generate_transect, TransectParams, REQUIRED_INTERSECTIONS};
pub use resolver::{resolve_intersections, IntersectionPoint, ResolvedTransect, SideIntersections};

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a stream segment, relative to its digitized direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// +1 for left, -1 for right
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }

    /// Label used in exported attribute tables
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
        }
    }

    /// Parse a side tag, case-insensitively
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEFT" | "L" => Some(Side::Left),
            "RIGHT" | "R" => Some(Side::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// A straight line through a segment midpoint, perpendicular to the local
/// flow direction, with an independent extent on each side.
#[derive(Debug, Clone, PartialEq)]
pub struct Transect {
    pub t_id: u32,
    /// Midpoint of the parent segment
    pub origin: Coord<f64>,
    /// Unit normal pointing to the left of the flow direction
    pub normal: Coord<f64>,
    pub left_length: f64,
    pub right_length: f64,
    /// Set when `max_length` was reached with fewer than
    /// [`REQUIRED_INTERSECTIONS`] crossings on the side
    pub left_insufficient: bool,
    pub right_insufficient: bool,
}

impl Transect {
    pub fn length(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_length,
            Side::Right => self.right_length,
        }
    }

    pub fn insufficient(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left_insufficient,
            Side::Right => self.right_insufficient,
        }
    }

    /// Far end of the transect on `side`
    pub fn end(&self, side: Side) -> Coord<f64> {
        self.origin + self.normal * (side.sign() * self.length(side))
    }

    pub fn total_length(&self) -> f64 {
        self.left_length + self.right_length
    }

    /// Geometry running from the right end through the origin to the left end
    pub fn geometry(&self) -> LineString<f64> {
        LineString::new(vec![self.end(Side::Right), self.origin, self.end(Side::Left)])
    }
}
