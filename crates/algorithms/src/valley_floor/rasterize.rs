//! Burning polylines into a channel mask

use geo::LineString;
use openres_core::raster::{Raster, RasterElement};

/// Mark every cell of `template`'s grid touched by `lines` with 1.
///
/// Edges are walked in steps of at most half a cell, so no crossed cell is
/// skipped along the way. Parts outside the grid are ignored.
pub fn rasterize_lines<T: RasterElement>(lines: &[LineString<f64>], template: &Raster<T>) -> Raster<u8> {
    let mut mask: Raster<u8> = template.with_same_meta();
    let step = (template.cell_size() / 2.0).max(f64::MIN_POSITIVE);
    let mut burned = 0usize;

    let mut burn = |x: f64, y: f64, mask: &mut Raster<u8>| {
        if let Some((r, c)) = template.cell_at(x, y) {
            if mask.set(r, c, 1).is_ok() {
                burned += 1;
            }
        }
    };

    for line in lines {
        if let Some(first) = line.0.first() {
            burn(first.x, first.y, &mut mask);
        }
        for w in line.0.windows(2) {
            let (a, b) = (w[0], w[1]);
            let len = (b.x - a.x).hypot(b.y - a.y);
            let n = (len / step).ceil().max(1.0) as usize;
            for k in 1..=n {
                let t = k as f64 / n as f64;
                burn(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y), &mut mask);
            }
        }
    }
    tracing::debug!(lines = lines.len(), burned, "lines rasterized");
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use openres_core::GeoTransform;

    fn template() -> Raster<f64> {
        let mut r = Raster::filled(10, 10, 0.0);
        r.set_transform(GeoTransform::new(0.0, 100.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_horizontal_line_marks_one_row() {
        let line = LineString::from(vec![(5.0, 55.0), (95.0, 55.0)]);
        let mask = rasterize_lines(&[line], &template());
        let row: Vec<u8> = (0..10).map(|c| mask.get(4, c).unwrap()).collect();
        assert_eq!(row, vec![1; 10]);
        assert_eq!(mask.data().iter().map(|&v| v as usize).sum::<usize>(), 10);
    }

    #[test]
    fn test_diagonal_line_is_connected() {
        let line = LineString::from(vec![(5.0, 95.0), (95.0, 5.0)]);
        let mask = rasterize_lines(&[line], &template());
        for i in 0..10 {
            assert_eq!(mask.get(i, i).unwrap(), 1, "cell ({i}, {i})");
        }
    }

    #[test]
    fn test_outside_parts_are_ignored() {
        let line = LineString::from(vec![(-50.0, 55.0), (15.0, 55.0)]);
        let mask = rasterize_lines(&[line], &template());
        assert_eq!(mask.get(4, 0).unwrap(), 1);
        assert_eq!(mask.get(4, 1).unwrap(), 1);
        assert_eq!(mask.data().iter().map(|&v| v as usize).sum::<usize>(), 2);
    }
}
