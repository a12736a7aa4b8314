//! Cell adjacency used by propagation and morphology

/// Defines a neighborhood pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// 4-connected (N, E, S, W)
    Rook,
    /// 8-connected (cardinal + diagonal)
    Queen,
    /// All cells within a Euclidean radius (in cells), used as a
    /// structuring element
    Disk(usize),
}

/// A relative move to a neighbor cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub dr: isize,
    pub dc: isize,
    /// Horizontal distance in cell units (1 for cardinal, sqrt(2) for diagonal)
    pub distance: f64,
}

impl Neighborhood {
    /// Radius of the neighborhood in cells
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Rook | Neighborhood::Queen => 1,
            Neighborhood::Disk(r) => *r,
        }
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Rook => dr.abs() + dc.abs() <= 1,
            Neighborhood::Queen => dr.abs() <= 1 && dc.abs() <= 1,
            Neighborhood::Disk(r) => {
                let r = *r as f64;
                ((dr * dr + dc * dc) as f64).sqrt() <= r
            }
        }
    }

    /// Relative moves to every neighbor, center excluded
    pub fn steps(&self) -> Vec<Step> {
        let r = self.radius() as isize;
        let mut steps = Vec::new();
        for dr in -r..=r {
            for dc in -r..=r {
                if (dr != 0 || dc != 0) && self.contains(dr, dc) {
                    steps.push(Step {
                        dr,
                        dc,
                        distance: ((dr * dr + dc * dc) as f64).sqrt(),
                    });
                }
            }
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_counts() {
        assert_eq!(Neighborhood::Rook.steps().len(), 4);
        assert_eq!(Neighborhood::Queen.steps().len(), 8);
        // radius-2 disk: 13 cells with dr^2 + dc^2 <= 4, minus the center
        assert_eq!(Neighborhood::Disk(2).steps().len(), 12);
    }

    #[test]
    fn test_diagonal_step_distance() {
        let diag = Neighborhood::Queen
            .steps()
            .into_iter()
            .find(|s| s.dr == 1 && s.dc == 1)
            .unwrap();
        assert!((diag.distance - std::f64::consts::SQRT_2).abs() < 1e-12);
    }
}
