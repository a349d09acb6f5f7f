//! The periodic cell that the neighbour list wraps displacements against.
use na::{Matrix3, Vector3};

use crate::{
    errors::{NequipError, Result},
    math::{first_off_diagonal, ApproxEqual},
};

/// An orthogonal simulation cell with per-axis periodicity.
///
/// `h` holds the lattice vectors. Only diagonal cells are accepted for periodic axes, so the
/// row or column convention of `h` does not matter for the wrapping done here.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBox {
    pub h: Matrix3<f64>,
    pub pbc: [bool; 3],
}

impl SimulationBox {
    pub fn new(h: Matrix3<f64>, pbc: [bool; 3]) -> Result<Self> {
        if pbc.iter().any(|&p| p) {
            if let Some((row, col, value)) = first_off_diagonal(&h, f64::default_epsilon()) {
                return Err(NequipError::NonOrthogonalCell { row, col, value });
            }
            for axis in 0..3 {
                if pbc[axis] && h[(axis, axis)] <= 0.0 {
                    return Err(NequipError::SingularCell);
                }
            }
        }
        Ok(Self { h, pbc })
    }

    /// The open-boundary box: identity cell, no wrapping along any axis.
    pub fn non_periodic() -> Self {
        Self {
            h: Matrix3::identity(),
            pbc: [false; 3],
        }
    }

    /// A cubic periodic box of side `length`.
    pub fn cubic(length: f64) -> Result<Self> {
        Self::new(Matrix3::from_diagonal_element(length), [true; 3])
    }

    pub fn is_periodic(&self) -> bool {
        self.pbc.iter().any(|&p| p)
    }

    /// Shortest edge among the periodic axes, `None` for an open box.
    pub fn min_periodic_edge(&self) -> Option<f64> {
        (0..3)
            .filter(|&axis| self.pbc[axis])
            .map(|axis| self.h[(axis, axis)])
            .reduce(f64::min)
    }

    /// Fails unless `cutoff` is strictly below half of every periodic edge, the condition under
    /// which each pair has a unique minimum image.
    pub fn check_cutoff(&self, cutoff: f64) -> Result<()> {
        match self.min_periodic_edge() {
            Some(min_edge) if cutoff >= 0.5 * min_edge => {
                Err(NequipError::CutoffTooLarge { cutoff, min_edge })
            }
            _ => Ok(()),
        }
    }

    /// Maps a raw displacement to its minimum image.
    ///
    /// Returns the wrapped displacement and the integer shift (stored as `f64`) such that
    /// `wrapped = rij - shift * edge` along every periodic axis.
    pub fn minimum_image(&self, rij: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let mut wrapped = *rij;
        let mut shift = Vector3::zeros();

        for axis in 0..3 {
            if self.pbc[axis] {
                let edge = self.h[(axis, axis)];
                shift[axis] = (rij[axis] / edge).round();
                wrapped[axis] -= shift[axis] * edge;
            }
        }

        (wrapped, shift)
    }

    /// Displacement produced by a periodic shift, `shift · h`.
    pub fn shift_displacement(&self, shift: &Vector3<f64>) -> Vector3<f64> {
        (shift.transpose() * self.h).transpose()
    }
}

impl Default for SimulationBox {
    fn default() -> Self {
        Self::non_periodic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_triclinic_periodic_cell() {
        let mut h = Matrix3::from_diagonal_element(3.0);
        h[(1, 0)] = 0.5;
        let err = SimulationBox::new(h, [true; 3]).unwrap_err();
        assert!(matches!(err, NequipError::NonOrthogonalCell { row: 1, col: 0, .. }));
    }

    #[test]
    fn open_box_accepts_any_cell() {
        let mut h = Matrix3::from_diagonal_element(3.0);
        h[(1, 0)] = 0.5;
        assert!(SimulationBox::new(h, [false; 3]).is_ok());
    }

    #[test]
    fn rejects_zero_edge() {
        let h = Matrix3::from_diagonal(&Vector3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            SimulationBox::new(h, [true; 3]),
            Err(NequipError::SingularCell)
        ));
    }

    #[test]
    fn cutoff_at_half_edge_is_rejected() {
        let sim_box = SimulationBox::cubic(1.0).unwrap();
        assert!(matches!(
            sim_box.check_cutoff(0.5),
            Err(NequipError::CutoffTooLarge { .. })
        ));
        assert!(sim_box.check_cutoff(0.49).is_ok());
    }

    #[test]
    fn min_edge_only_counts_periodic_axes() {
        let h = Matrix3::from_diagonal(&Vector3::new(4.0, 1.0, 3.0));
        let sim_box = SimulationBox::new(h, [true, false, true]).unwrap();
        assert_eq!(sim_box.min_periodic_edge(), Some(3.0));
        assert_eq!(SimulationBox::non_periodic().min_periodic_edge(), None);
    }

    #[test]
    fn minimum_image_wraps_across_the_boundary() {
        let sim_box = SimulationBox::cubic(1.0).unwrap();
        let (wrapped, shift) = sim_box.minimum_image(&Vector3::new(0.0, 0.0, -0.9));
        assert_relative_eq!(wrapped.z, 0.1, epsilon = 1e-12);
        assert_eq!(shift, Vector3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(
            (Vector3::new(0.0, 0.0, -0.9) - sim_box.shift_displacement(&shift)).z,
            0.1,
            epsilon = 1e-12
        );
    }
}
