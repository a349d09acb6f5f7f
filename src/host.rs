//! A minimal simulation host: a system of particles and the forces acting on them.
//!
//! [`ModelForce`] is what an ML potential registers. Like a scripted-model force in a full MD
//! engine, it points at the deployed artifact on disk and evaluates what it loads from there.
use std::path::Path;

use na::{Matrix3, Matrix3xX};

use crate::{
    errors::{NequipError, Result},
    model::deployed::ModelLoaders,
    potentials::nequip_force::NequipForce,
};

/// Mask selecting every force group.
pub const ALL_GROUPS: u32 = u32::MAX;

pub trait Force: Send + Sync {
    fn force_group(&self) -> u32;
    fn uses_periodic_boundary_conditions(&self) -> bool;

    /// Energy and per-particle forces for the whole system.
    fn compute(
        &self,
        positions: &Matrix3xX<f64>,
        box_vectors: Option<&Matrix3<f64>>,
    ) -> Result<(f64, Matrix3xX<f64>)>;
}

pub struct ModelForce {
    force_group: u32,
    uses_pbc: bool,
    outputs_forces: bool,
    force: NequipForce,
}

impl ModelForce {
    pub fn from_file(filename: impl AsRef<Path>, loaders: &ModelLoaders) -> Result<Self> {
        let force = NequipForce::load(&filename, loaders)?;
        Ok(Self {
            force_group: 0,
            uses_pbc: force.is_periodic(),
            outputs_forces: true,
            force,
        })
    }

    pub fn set_force_group(&mut self, group: u32) -> Result<()> {
        if group > 31 {
            return Err(NequipError::InvalidForceGroup { group });
        }
        self.force_group = group;
        Ok(())
    }

    pub fn set_uses_periodic_boundary_conditions(&mut self, periodic: bool) {
        self.uses_pbc = periodic;
    }

    pub fn set_outputs_forces(&mut self, outputs_forces: bool) {
        self.outputs_forces = outputs_forces;
    }

    pub fn nequip_force(&self) -> &NequipForce {
        &self.force
    }
}

impl Force for ModelForce {
    fn force_group(&self) -> u32 {
        self.force_group
    }

    fn uses_periodic_boundary_conditions(&self) -> bool {
        self.uses_pbc
    }

    fn compute(
        &self,
        positions: &Matrix3xX<f64>,
        box_vectors: Option<&Matrix3<f64>>,
    ) -> Result<(f64, Matrix3xX<f64>)> {
        let (energy, ml_forces) = self.force.compute(positions, box_vectors)?;

        let mut forces = Matrix3xX::zeros(positions.ncols());
        if self.outputs_forces {
            match self.force.indices() {
                Some(indices) => {
                    for (k, &i) in indices.iter().enumerate() {
                        let mut fi = forces.column_mut(i);
                        fi += ml_forces.column(k);
                    }
                }
                None => forces = ml_forces,
            }
        }
        Ok((energy, forces))
    }
}

/// Whether `group` is selected by the bit mask `groups`. Groups past bit 31 never are.
fn in_groups(groups: u32, group: u32) -> bool {
    1u32.checked_shl(group).is_some_and(|bit| groups & bit != 0)
}

#[derive(Default)]
pub struct System {
    n_particles: usize,
    forces: Vec<Box<dyn Force>>,
    default_periodic_box_vectors: Option<Matrix3<f64>>,
}

impl System {
    pub fn new(n_particles: usize) -> Self {
        Self {
            n_particles,
            ..Default::default()
        }
    }

    pub fn n_particles(&self) -> usize {
        self.n_particles
    }

    pub fn add_force<F>(&mut self, force: F) -> usize
    where
        F: Force + 'static,
    {
        self.forces.push(Box::new(force));
        self.forces.len() - 1
    }

    pub fn forces(&self) -> &[Box<dyn Force>] {
        &self.forces
    }

    pub fn uses_periodic_boundary_conditions(&self) -> bool {
        self.forces
            .iter()
            .any(|force| force.uses_periodic_boundary_conditions())
    }

    pub fn default_periodic_box_vectors(&self) -> Option<&Matrix3<f64>> {
        self.default_periodic_box_vectors.as_ref()
    }

    pub fn set_default_periodic_box_vectors(&mut self, box_vectors: Option<Matrix3<f64>>) {
        self.default_periodic_box_vectors = box_vectors;
    }

    /// Sums the forces whose group bit is set in `groups`.
    ///
    /// Without explicit box vectors the system's default box is used.
    pub fn calc_energy_and_forces(
        &self,
        positions: &Matrix3xX<f64>,
        box_vectors: Option<&Matrix3<f64>>,
        groups: u32,
    ) -> Result<(f64, Matrix3xX<f64>)> {
        if positions.ncols() != self.n_particles {
            return Err(NequipError::PositionCountMismatch {
                expected: self.n_particles,
                found: positions.ncols(),
            });
        }
        let box_vectors = box_vectors.or(self.default_periodic_box_vectors.as_ref());

        let mut energy = 0.0;
        let mut forces = Matrix3xX::zeros(self.n_particles);
        for force in self
            .forces
            .iter()
            .filter(|force| in_groups(groups, force.force_group()))
        {
            let (e, f) = force.compute(positions, box_vectors)?;
            energy += e;
            forces += f;
        }
        Ok((energy, forces))
    }
}
