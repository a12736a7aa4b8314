//! Slope-limited least-cost propagation from channel cells

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use openres_core::raster::{Neighborhood, Raster};
use openres_core::{Error, Result};

/// Conditioning added per unit of horizontal travel so that flat floors
/// still order cells by distance from the channel
pub(crate) const DISTANCE_CONDITIONING: f64 = 1e-5;

/// State in the priority queue (min-heap via reversed ordering)
#[derive(Debug, Clone, PartialEq)]
struct State {
    cost: f64,
    row: usize,
    col: usize,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost)
    }
}

/// Accumulated cost on the DEM grid, `INFINITY` where propagation never
/// arrived
#[derive(Debug, Clone)]
pub(crate) struct CostSurface {
    pub cost: Raster<f64>,
    pub sources: usize,
}

impl CostSurface {
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.cost.data()[[row, col]]
    }

    pub fn reached(&self) -> impl Iterator<Item = f64> + '_ {
        self.cost.data().iter().copied().filter(|c| c.is_finite())
    }
}

/// Dijkstra from every channel cell over valid DEM cells.
///
/// Moving to a neighbour costs its elevation gain plus a distance
/// conditioning term. A move is refused when the slope between the two
/// cells (percent) exceeds `slope_threshold`, or when the accumulated cost
/// would exceed `max_cost`. No-data cells are never entered.
pub(crate) fn propagate(
    dem: &Raster<f64>,
    channel: &Raster<u8>,
    neighborhood: Neighborhood,
    slope_threshold: f64,
    max_cost: Option<f64>,
) -> Result<CostSurface> {
    dem.ensure_same_shape(channel)?;
    let (rows, cols) = dem.shape();
    let cell_size = dem.cell_size();
    let steps = neighborhood.steps();

    let mut surface: Raster<f64> = dem.with_same_meta();
    let dist = surface.data_mut();
    dist.fill(f64::INFINITY);
    let mut heap = BinaryHeap::new();
    let mut sources = 0usize;

    for row in 0..rows {
        for col in 0..cols {
            let is_channel = channel.valid(row, col).is_some_and(|v| v != 0);
            if is_channel && dem.valid(row, col).is_some() {
                dist[[row, col]] = 0.0;
                heap.push(State { cost: 0.0, row, col });
                sources += 1;
            }
        }
    }
    if sources == 0 {
        return Err(Error::Algorithm(
            "no channel cell overlaps valid elevation data".into(),
        ));
    }

    while let Some(State { cost, row, col }) = heap.pop() {
        if cost > dist[[row, col]] {
            continue;
        }
        // Every cell on the heap was checked against no-data before pushing
        let z = unsafe { dem.get_unchecked(row, col) };

        for step in &steps {
            let nr = row as isize + step.dr;
            let nc = col as isize + step.dc;
            if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            let Some(zn) = dem.valid(nr, nc) else {
                continue;
            };

            let run = step.distance * cell_size;
            let rise = zn - z;
            if rise.abs() / run * 100.0 > slope_threshold {
                continue;
            }
            let new_cost = cost + rise.max(0.0) + DISTANCE_CONDITIONING * run;
            if max_cost.is_some_and(|m| new_cost > m) {
                continue;
            }
            if new_cost < dist[[nr, nc]] {
                dist[[nr, nc]] = new_cost;
                heap.push(State { cost: new_cost, row: nr, col: nc });
            }
        }
    }

    Ok(CostSurface {
        cost: surface,
        sources,
    })
}
