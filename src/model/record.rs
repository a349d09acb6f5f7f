use na::{Matrix3, Matrix3xX, Vector3};

/// The record a deployed model is invoked with. Lengths are in the model's unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub atom_types: Vec<usize>,
    pub atomic_numbers: Vec<usize>,
    /// One column per atom.
    pub pos: Matrix3xX<f64>,
    /// Lattice vectors as rows, the identity for open boundaries.
    pub cell: Matrix3<f64>,
    pub pbc: [bool; 3],
    /// Directed `(source, target)` edges.
    pub edge_index: Vec<[usize; 2]>,
    pub edge_cell_shift: Vec<Vector3<f64>>,
}

impl ModelInput {
    pub fn n_atoms(&self) -> usize {
        self.pos.ncols()
    }

    /// `pos[i] - pos[j] - shift · cell` for every edge `(i, j)`.
    pub fn edge_vectors(&self) -> Vec<Vector3<f64>> {
        self.edge_index
            .iter()
            .zip(&self.edge_cell_shift)
            .map(|(&[i, j], shift)| {
                self.pos.column(i) - self.pos.column(j) - (shift.transpose() * self.cell).transpose()
            })
            .collect()
    }
}

/// What a deployed model returns, in the model's units.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub total_energy: f64,
    /// One column per atom, same order as the input positions.
    pub forces: Matrix3xX<f64>,
}
