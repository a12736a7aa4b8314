//! Valley-floor delineation by slope-limited cost accumulation
//!
//! Cost spreads outward from the channel cells over the DEM, accumulating
//! elevation gain along the cheapest path. A move between two cells is
//! refused once the local slope exceeds `slope_threshold`, so propagation
//! stops at the valley walls. The reached region is optionally
//! re-thresholded at its mean cost, cleaned up (gap closing, hole filling)
//! and traced into smoothed polygons.
//!
//! The resulting polygons are meant to be checked and edited by hand before
//! they are fed back as valley lines to a later extraction run.

mod cost;
mod mask;
mod polygonize;
mod rasterize;

pub use rasterize::rasterize_lines;

use geo::Polygon;
use openres_core::raster::{Neighborhood, Raster};
use openres_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};

/// Cell adjacency used while propagating cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Edge neighbours only
    Four,
    /// Edge and corner neighbours
    #[default]
    Eight,
}

impl Connectivity {
    pub fn neighborhood(self) -> Neighborhood {
        match self {
            Connectivity::Four => Neighborhood::Rook,
            Connectivity::Eight => Neighborhood::Queen,
        }
    }
}

/// Coarse cost cap applied unless overridden
pub const DEFAULT_MAX_COST: f64 = 1500.0;

/// Parameters for valley-floor delineation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValleyFloorParams {
    /// Maximum slope (percent) between adjacent cells that propagation may
    /// cross. Default: 20.0
    pub slope_threshold: f64,
    pub connectivity: Connectivity,
    /// Coarse cap: cells whose accumulated cost exceeds this are excluded.
    /// Default: 1500.0
    pub max_cost: Option<f64>,
    /// Keep only cells at or below the mean cost of the coarse region.
    /// Default: true
    pub refine_with_mean: bool,
    /// Radius in cells of the closing disk; 0 disables gap closing
    pub gap_cells: usize,
    pub smooth_iterations: usize,
    /// Chaikin cut position along each edge, in (0, 0.5)
    pub smooth_offset: f64,
}

impl Default for ValleyFloorParams {
    fn default() -> Self {
        Self {
            slope_threshold: 20.0,
            connectivity: Connectivity::Eight,
            max_cost: Some(DEFAULT_MAX_COST),
            refine_with_mean: true,
            gap_cells: 2,
            smooth_iterations: 3,
            smooth_offset: 0.25,
        }
    }
}

impl ValleyFloorParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.slope_threshold.is_finite() && self.slope_threshold > 0.0) {
            return Err(Error::InvalidParameter {
                name: "slope_threshold",
                value: self.slope_threshold.to_string(),
                reason: "must be a positive percentage".into(),
            });
        }
        if let Some(m) = self.max_cost {
            if !(m.is_finite() && m > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "max_cost",
                    value: m.to_string(),
                    reason: "must be positive when set".into(),
                });
            }
        }
        if !(self.smooth_offset > 0.0 && self.smooth_offset < 0.5) {
            return Err(Error::InvalidParameter {
                name: "smooth_offset",
                value: self.smooth_offset.to_string(),
                reason: "must lie strictly between 0 and 0.5".into(),
            });
        }
        Ok(())
    }
}

/// Result of a delineation run
#[derive(Debug, Clone)]
pub struct ValleyFloor {
    /// 1 inside the valley floor, 0 outside; same grid as the DEM
    pub mask: Raster<u8>,
    /// Smoothed outline polygons in map coordinates
    pub polygons: Vec<Polygon<f64>>,
    /// Cells reached by propagation before any refinement
    pub reached_cells: usize,
    /// Mean cost used for refinement, if requested
    pub mean_cost: Option<f64>,
}

/// Delineate the valley floor around `channel` cells on `dem`.
///
/// `channel` must share the DEM grid; any non-zero cell is a source (see
/// [`rasterize_lines`] to build one from a stream network). Fails when the
/// parameters are invalid, the grids differ, no channel cell has valid
/// elevation, or mean refinement is asked for an empty coarse region.
pub fn delineate_valley_floor(
    dem: &Raster<f64>,
    channel: &Raster<u8>,
    params: &ValleyFloorParams,
) -> Result<ValleyFloor> {
    params.validate()?;
    let (rows, cols) = dem.shape();
    tracing::info!(rows, cols, slope_threshold = params.slope_threshold, "valley-floor delineation started");

    let surface = cost::propagate(
        dem,
        channel,
        params.connectivity.neighborhood(),
        params.slope_threshold,
        params.max_cost,
    )?;
    let reached_cells = surface.reached().count();
    let max_reached = surface.reached().fold(0.0_f64, f64::max);
    tracing::debug!(
        sources = surface.sources,
        reached = reached_cells,
        max_cost = max_reached,
        "coarse cost surface"
    );

    let (coarse, mean_cost) = mask::threshold(&surface, params.refine_with_mean)?;
    if let Some(mean) = mean_cost {
        let kept = coarse.iter().filter(|&&v| v != 0).count();
        tracing::debug!(mean_cost = mean, kept, "refined at mean cost");
    }

    let mut cells = mask::close(&coarse, params.gap_cells);
    let filled = mask::fill_holes(&mut cells);
    for ((r, c), v) in cells.indexed_iter_mut() {
        if dem.valid(r, c).is_none() {
            *v = 0;
        }
    }

    let polygons = polygonize::polygonize(&cells, dem.transform());
    let polygons = polygonize::chaikin(polygons, params.smooth_iterations, params.smooth_offset);

    let mut mask: Raster<u8> = dem.with_same_meta();
    *mask.data_mut() = cells;
    let floor_cells = mask.data().iter().filter(|&&v| v != 0).count();
    tracing::info!(
        floor_cells,
        holes_filled = filled,
        polygons = polygons.len(),
        "valley-floor delineation finished"
    );

    Ok(ValleyFloor {
        mask,
        polygons,
        reached_cells,
        mean_cost,
    })
}

/// Input of [`ValleyFloorDelineation`]: DEM and channel mask on the same grid
#[derive(Debug, Clone)]
pub struct ValleyFloorInput {
    pub dem: Raster<f64>,
    pub channel: Raster<u8>,
}

/// [`Algorithm`] wrapper around [`delineate_valley_floor`]
#[derive(Debug, Clone, Default)]
pub struct ValleyFloorDelineation;

impl Algorithm for ValleyFloorDelineation {
    type Input = ValleyFloorInput;
    type Output = ValleyFloor;
    type Params = ValleyFloorParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ValleyFloor"
    }

    fn description(&self) -> &'static str {
        "Slope-limited cost accumulation from the channel, traced into valley-floor polygons"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        delineate_valley_floor(&input.dem, &input.channel, &params)
    }
}
