//! All-pairs neighbour list in the edge/shift layout graph potentials consume.
//!
//! Every unordered pair `i < j` is visited once, wrapped to its minimum image and, when within
//! the cutoff, emitted as the two directed edges `(i, j, s)` and `(j, i, -s)`. The shift `s`
//! satisfies `wrapped = pos[i] - pos[j] - s · cell`. The search is O(N²) with no spatial
//! binning and only handles orthogonal cells.
use na::{Matrix3xX, Vector3};
use tracing::{debug, debug_span};

use crate::{errors::Result, simulation_box::SimulationBox};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighbourListOptions {
    /// Also emit `(i, i, s)` edges to an atom's own periodic images. Zero shifts never are.
    pub self_interaction: bool,
    /// Stable-sort the edges by source atom.
    pub sort_by_source: bool,
}

impl Default for NeighbourListOptions {
    fn default() -> Self {
        Self {
            self_interaction: false,
            sort_by_source: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighbourList {
    /// Directed `(source, target)` pairs.
    pub edge_index: Vec<[usize; 2]>,
    /// One periodic shift per edge, integer valued.
    pub shifts: Vec<Vector3<f64>>,
}

impl NeighbourList {
    pub fn n_edges(&self) -> usize {
        self.edge_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_index.is_empty()
    }

    fn push(&mut self, i: usize, j: usize, shift: Vector3<f64>) {
        self.edge_index.push([i, j]);
        self.shifts.push(shift);
    }

    fn sort_by_source(&mut self) {
        let mut order: Vec<usize> = (0..self.n_edges()).collect();
        order.sort_by_key(|&e| self.edge_index[e][0]);
        self.edge_index = order.iter().map(|&e| self.edge_index[e]).collect();
        self.shifts = order.iter().map(|&e| self.shifts[e]).collect();
    }

    /// Wrapped displacement `pos[i] - pos[j] - s · cell` of edge `e`.
    pub fn edge_vector(
        &self,
        e: usize,
        positions: &Matrix3xX<f64>,
        sim_box: &SimulationBox,
    ) -> Vector3<f64> {
        let [i, j] = self.edge_index[e];
        positions.column(i) - positions.column(j) - sim_box.shift_displacement(&self.shifts[e])
    }
}

/// Builds the neighbour list of `positions` (one column per atom) within `cutoff`.
///
/// Fails when a periodic axis is too short for an unambiguous minimum image.
pub fn build_neighbour_list(
    positions: &Matrix3xX<f64>,
    sim_box: &SimulationBox,
    cutoff: f64,
    options: &NeighbourListOptions,
) -> Result<NeighbourList> {
    let n_atoms = positions.ncols();
    let _span = debug_span!("build_neighbour_list", n_atoms, cutoff).entered();

    sim_box.check_cutoff(cutoff)?;

    let mut list = NeighbourList::default();

    for i in 0..n_atoms {
        for j in (i + 1)..n_atoms {
            let rij: Vector3<f64> = positions.column(i) - positions.column(j);
            let (wrapped, shift) = sim_box.minimum_image(&rij);

            if wrapped.norm() > cutoff {
                continue;
            }
            list.push(i, j, shift);
            list.push(j, i, -shift);
        }
    }

    if options.self_interaction && sim_box.is_periodic() {
        let image_shifts = self_image_shifts(sim_box, cutoff);
        for i in 0..n_atoms {
            for shift in &image_shifts {
                list.push(i, i, *shift);
            }
        }
    }

    if options.sort_by_source {
        list.sort_by_source();
    }

    debug!(n_edges = list.n_edges(), "neighbour list built");
    Ok(list)
}

/// Nonzero shifts whose image of an atom lies within `cutoff` of the atom itself.
fn self_image_shifts(sim_box: &SimulationBox, cutoff: f64) -> Vec<Vector3<f64>> {
    let range = |axis: usize| -> i64 {
        if sim_box.pbc[axis] {
            (cutoff / sim_box.h[(axis, axis)]).floor() as i64
        } else {
            0
        }
    };
    let (nx, ny, nz) = (range(0), range(1), range(2));

    let mut shifts = Vec::new();
    for sx in -nx..=nx {
        for sy in -ny..=ny {
            for sz in -nz..=nz {
                if sx == 0 && sy == 0 && sz == 0 {
                    continue;
                }
                let shift = Vector3::new(sx as f64, sy as f64, sz as f64);
                if sim_box.shift_displacement(&shift).norm() <= cutoff {
                    shifts.push(shift);
                }
            }
        }
    }
    shifts
}
