//! Rectangle clipping of polylines (Cohen-Sutherland per edge)

use geo::{Coord, LineString};

/// An axis-aligned clipping rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ClipRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn contains(&self, p: Coord<f64>) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// Clip a polyline by a rectangle.
///
/// Every run of the line inside the rectangle becomes its own piece, in
/// travel order. Returns an empty vector when nothing is inside.
pub fn clip_line_by_rect(line: &LineString<f64>, rect: ClipRect) -> Vec<LineString<f64>> {
    let mut pieces = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();

    for w in line.0.windows(2) {
        match clip_segment(w[0], w[1], &rect) {
            Some((c0, c1)) => {
                if current.last() != Some(&c0) {
                    flush(&mut pieces, &mut current);
                    current.push(c0);
                }
                if current.last() != Some(&c1) {
                    current.push(c1);
                }
                // Leaving the rectangle ends the piece
                if c1 != w[1] {
                    flush(&mut pieces, &mut current);
                }
            }
            None => flush(&mut pieces, &mut current),
        }
    }
    flush(&mut pieces, &mut current);
    pieces
}

fn flush(pieces: &mut Vec<LineString<f64>>, current: &mut Vec<Coord<f64>>) {
    if current.len() >= 2 {
        pieces.push(LineString::new(std::mem::take(current)));
    } else {
        current.clear();
    }
}

const INSIDE: u8 = 0b0000;
const LEFT: u8 = 0b0001;
const RIGHT: u8 = 0b0010;
const BOTTOM: u8 = 0b0100;
const TOP: u8 = 0b1000;

fn outcode(p: Coord<f64>, rect: &ClipRect) -> u8 {
    let mut code = INSIDE;
    if p.x < rect.min_x {
        code |= LEFT;
    }
    if p.x > rect.max_x {
        code |= RIGHT;
    }
    if p.y < rect.min_y {
        code |= BOTTOM;
    }
    if p.y > rect.max_y {
        code |= TOP;
    }
    code
}

fn clip_segment(
    mut p0: Coord<f64>,
    mut p1: Coord<f64>,
    rect: &ClipRect,
) -> Option<(Coord<f64>, Coord<f64>)> {
    let mut code0 = outcode(p0, rect);
    let mut code1 = outcode(p1, rect);

    loop {
        if (code0 | code1) == 0 {
            return Some((p0, p1));
        }
        if (code0 & code1) != 0 {
            return None;
        }

        let code_out = if code0 != 0 { code0 } else { code1 };
        let dx = p1.x - p0.x;
        let dy = p1.y - p0.y;

        let new_point = if code_out & TOP != 0 {
            let t = (rect.max_y - p0.y) / dy;
            Coord { x: p0.x + t * dx, y: rect.max_y }
        } else if code_out & BOTTOM != 0 {
            let t = (rect.min_y - p0.y) / dy;
            Coord { x: p0.x + t * dx, y: rect.min_y }
        } else if code_out & RIGHT != 0 {
            let t = (rect.max_x - p0.x) / dx;
            Coord { x: rect.max_x, y: p0.y + t * dy }
        } else {
            let t = (rect.min_x - p0.x) / dx;
            Coord { x: rect.min_x, y: p0.y + t * dy }
        };

        if code_out == code0 {
            p0 = new_point;
            code0 = outcode(p0, rect);
        } else {
            p1 = new_point;
            code1 = outcode(p1, rect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_rect() -> ClipRect {
        ClipRect::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_clip_line_partial() {
        let line = LineString::from(vec![(-5.0, 5.0), (15.0, 5.0)]);
        let pieces = clip_line_by_rect(&line, unit_rect());
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].0, vec![Coord { x: 0.0, y: 5.0 }, Coord { x: 10.0, y: 5.0 }]);
    }

    #[test]
    fn test_unbounded_band() {
        let band = ClipRect::new(0.0, f64::NEG_INFINITY, 10.0, f64::INFINITY);
        let line = LineString::from(vec![(-5.0, 1e9), (15.0, -1e9)]);
        let pieces = clip_line_by_rect(&line, band);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].0[0].x, 0.0);
        assert_eq!(pieces[0].0[1].x, 10.0);
    }

    #[test]
    fn test_clip_line_fully_outside() {
        let line = LineString::from(vec![(20.0, 20.0), (30.0, 30.0)]);
        assert!(clip_line_by_rect(&line, unit_rect()).is_empty());
    }

    #[test]
    fn test_reentering_line_gives_separate_pieces() {
        // In, out over the top, back in
        let line = LineString::from(vec![(2.0, 5.0), (4.0, 15.0), (6.0, 5.0)]);
        let pieces = clip_line_by_rect(&line, unit_rect());
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].0[0], Coord { x: 2.0, y: 5.0 });
        assert_eq!(*pieces[1].0.last().unwrap(), Coord { x: 6.0, y: 5.0 });
    }

    #[test]
    fn test_inside_polyline_is_unchanged() {
        let line = LineString::from(vec![(1.0, 1.0), (2.0, 3.0), (5.0, 4.0)]);
        let pieces = clip_line_by_rect(&line, unit_rect());
        assert_eq!(pieces, vec![line]);
    }
}
