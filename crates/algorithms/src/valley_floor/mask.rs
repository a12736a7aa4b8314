//! Binary mask cleanup: threshold, closing, hole filling

use super::cost::CostSurface;
use ndarray::{s, Array2};
use openres_core::raster::Neighborhood;
use openres_core::{Error, Result};
use std::collections::VecDeque;

/// Cells reached by propagation, optionally re-thresholded at the mean
/// accumulated cost of the reached non-source cells.
///
/// Returns the mask and the mean used, if any.
pub(crate) fn threshold(surface: &CostSurface, refine_with_mean: bool) -> Result<(Array2<u8>, Option<f64>)> {
    let coarse: Vec<f64> = surface.reached().filter(|c| *c > 0.0).collect();
    let limit = if refine_with_mean {
        if coarse.is_empty() {
            return Err(Error::Algorithm(
                "coarse valley-floor region is empty; raise max_cost or slope_threshold".into(),
            ));
        }
        Some(coarse.iter().sum::<f64>() / coarse.len() as f64)
    } else {
        None
    };

    let mask = Array2::from_shape_fn(surface.cost.shape(), |(r, c)| {
        let cost = surface.at(r, c);
        u8::from(cost.is_finite() && limit.map_or(true, |l| cost <= l))
    });
    Ok((mask, limit))
}

/// Binary dilation with a disk; cells outside the grid count as background
pub(crate) fn dilate(mask: &Array2<u8>, radius: usize) -> Array2<u8> {
    let steps = Neighborhood::Disk(radius).steps();
    let (rows, cols) = mask.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        if mask[[r, c]] != 0 {
            return 1;
        }
        let hit = steps.iter().any(|s| {
            let (nr, nc) = (r as isize + s.dr, c as isize + s.dc);
            nr >= 0
                && nc >= 0
                && (nr as usize) < rows
                && (nc as usize) < cols
                && mask[[nr as usize, nc as usize]] != 0
        });
        u8::from(hit)
    })
}

/// Binary erosion with a disk; cells outside the grid count as background
pub(crate) fn erode(mask: &Array2<u8>, radius: usize) -> Array2<u8> {
    let steps = Neighborhood::Disk(radius).steps();
    let (rows, cols) = mask.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        if mask[[r, c]] == 0 {
            return 0;
        }
        let keep = steps.iter().all(|s| {
            let (nr, nc) = (r as isize + s.dr, c as isize + s.dc);
            nr >= 0
                && nc >= 0
                && (nr as usize) < rows
                && (nc as usize) < cols
                && mask[[nr as usize, nc as usize]] != 0
        });
        u8::from(keep)
    })
}

/// Morphological closing (dilate then erode); radius 0 is a no-op.
///
/// The mask is padded with `radius` background cells and cropped back, so
/// the grid edge behaves like open background: foreground touching the edge
/// survives and background strips along the edge are not filled.
pub(crate) fn close(mask: &Array2<u8>, radius: usize) -> Array2<u8> {
    if radius == 0 {
        return mask.clone();
    }
    let (rows, cols) = mask.dim();
    let mut padded = Array2::<u8>::zeros((rows + 2 * radius, cols + 2 * radius));
    padded
        .slice_mut(s![radius..radius + rows, radius..radius + cols])
        .assign(mask);
    let closed = erode(&dilate(&padded, radius), radius);
    closed
        .slice(s![radius..radius + rows, radius..radius + cols])
        .to_owned()
}

/// Set every background region not 4-connected to the grid border
pub(crate) fn fill_holes(mask: &mut Array2<u8>) -> usize {
    let (rows, cols) = mask.dim();
    let mut outside = Array2::<bool>::from_elem((rows, cols), false);
    let mut queue = VecDeque::new();

    let seed = |r: usize, c: usize, outside: &mut Array2<bool>, queue: &mut VecDeque<(usize, usize)>| {
        if mask[[r, c]] == 0 && !outside[[r, c]] {
            outside[[r, c]] = true;
            queue.push_back((r, c));
        }
    };
    for r in 0..rows {
        seed(r, 0, &mut outside, &mut queue);
        seed(r, cols.saturating_sub(1), &mut outside, &mut queue);
    }
    for c in 0..cols {
        seed(0, c, &mut outside, &mut queue);
        seed(rows.saturating_sub(1), c, &mut outside, &mut queue);
    }

    while let Some((r, c)) = queue.pop_front() {
        for (dr, dc) in [(-1isize, 0isize), (1, 0), (0, -1), (0, 1)] {
            let (nr, nc) = (r as isize + dr, c as isize + dc);
            if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if mask[[nr, nc]] == 0 && !outside[[nr, nc]] {
                outside[[nr, nc]] = true;
                queue.push_back((nr, nc));
            }
        }
    }

    let mut filled = 0;
    for ((r, c), v) in mask.indexed_iter_mut() {
        if *v == 0 && !outside[[r, c]] {
            *v = 1;
            filled += 1;
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use openres_core::Raster;

    #[test]
    fn test_closing_bridges_a_one_cell_gap() {
        let mask = array![
            [0u8, 0, 0, 0, 0, 0, 0],
            [0, 1, 1, 0, 1, 1, 0],
            [0, 1, 1, 0, 1, 1, 0],
            [0, 1, 1, 0, 1, 1, 0],
            [0, 0, 0, 0, 0, 0, 0],
        ];
        let closed = close(&mask, 1);
        assert_eq!(closed[[2, 3]], 1);
        assert_eq!(closed[[0, 0]], 0);
        assert_eq!(closed[[2, 0]], 0);
    }

    #[test]
    fn test_closing_leaves_strip_along_grid_edge() {
        let mut mask = Array2::<u8>::from_elem((6, 7), 1);
        mask.column_mut(0).fill(0);
        mask.row_mut(5).fill(0);
        for radius in 1..=2 {
            let closed = close(&mask, radius);
            assert_eq!(closed, mask, "radius {}", radius);
        }
    }

    #[test]
    fn test_closing_keeps_border_cells() {
        let mask = Array2::<u8>::from_elem((4, 4), 1);
        assert_eq!(close(&mask, 2), mask);
        assert_eq!(close(&mask, 0), mask);
    }

    #[test]
    fn test_fill_holes() {
        let mut mask = array![
            [1u8, 1, 1, 0],
            [1, 0, 1, 0],
            [1, 1, 1, 0],
            [0, 0, 0, 0],
        ];
        assert_eq!(fill_holes(&mut mask), 1);
        assert_eq!(mask[[1, 1]], 1);
        assert_eq!(mask[[3, 3]], 0);
    }

    #[test]
    fn test_refine_with_mean() {
        let surface = CostSurface {
            cost: Raster::from_vec(vec![0.0, 1.0, 2.0, 6.0, f64::INFINITY], 1, 5).unwrap(),
            sources: 1,
        };
        let (coarse, limit) = threshold(&surface, false).unwrap();
        assert_eq!(coarse.iter().sum::<u8>(), 4);
        assert!(limit.is_none());

        let (refined, limit) = threshold(&surface, true).unwrap();
        assert_eq!(limit, Some(3.0));
        assert_eq!(refined.iter().copied().collect::<Vec<u8>>(), vec![1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_refine_on_empty_region_fails() {
        let surface = CostSurface {
            cost: Raster::from_vec(vec![0.0, f64::INFINITY], 1, 2).unwrap(),
            sources: 1,
        };
        assert!(threshold(&surface, true).is_err());
    }
}
