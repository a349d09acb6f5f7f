//! A Lennard-Jones model that consumes the same edge record a deployed graph potential does.
//!
//! It is the crate's built-in [`DeployedModel`]: artifacts of kind `lennard_jones` carry the
//! per-type-pair parameters, which makes complete deployments testable without an external
//! model runtime.
use na::{Matrix3xX, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    device::Device,
    errors::{NequipError, Result},
    model::{
        deployed::{DeployedModel, ModelLoader, ModelSpec},
        metadata::Precision,
        record::{ModelInput, ModelOutput},
    },
    potentials::potential::{PairPotential, PairPotentialManager, Table},
};

pub const LENNARD_JONES_KIND: &str = "lennard_jones";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LennardJones {
    epsilon: f64,
    sigma: f64,
    rcut: f64,
    #[serde(default)]
    shift: bool,
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64, rcut: f64, shift: bool) -> Self {
        Self {
            epsilon,
            sigma,
            rcut,
            shift,
        }
    }

    fn validate(&self) -> Result<()> {
        let valid = self.epsilon.is_finite()
            && self.epsilon >= 0.0
            && self.sigma.is_finite()
            && self.sigma > 0.0
            && self.rcut.is_finite()
            && self.rcut > 0.0;
        if valid {
            Ok(())
        } else {
            Err(NequipError::InvalidModelParameters {
                reason: format!("invalid Lennard-Jones parameters {self:?}"),
            })
        }
    }
}

impl PairPotential for LennardJones {
    fn compute_potential(&self, rij: &Vector3<f64>) -> (f64, Vector3<f64>) {
        let rij2 = rij.norm_squared();
        let inv_rij2 = 1.0 / rij2;
        let vanderwaals_attraction = (self.sigma.powi(2) * inv_rij2).powi(3);
        let lj_repulsion = vanderwaals_attraction.powi(2);

        let mut potential_energy = 4.0 * self.epsilon * (lj_repulsion - vanderwaals_attraction);

        let force =
            24.0 * self.epsilon * (2.0 * lj_repulsion - vanderwaals_attraction) * inv_rij2 * rij;

        if self.shift {
            let cutoff_inv2 = (self.sigma / self.rcut).powi(2);
            let cutoff_attraction = cutoff_inv2.powi(3);
            let cutoff_repulsion = cutoff_attraction.powi(2);

            potential_energy -= 4.0 * self.epsilon * (cutoff_repulsion - cutoff_attraction);
        }

        (potential_energy, force)
    }

    fn get_rcut(&self) -> f64 {
        self.rcut
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairParameters {
    pub types: [usize; 2],
    #[serde(flatten)]
    pub potential: LennardJones,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LennardJonesParameters {
    pub pairs: Vec<PairParameters>,
}

pub struct LennardJonesModel {
    table: Table,
    precision: Precision,
}

impl LennardJonesModel {
    pub fn from_parameters(parameters: &LennardJonesParameters, precision: Precision) -> Result<Self> {
        if parameters.pairs.is_empty() {
            return Err(NequipError::InvalidModelParameters {
                reason: "no Lennard-Jones pairs given".to_string(),
            });
        }
        let mut model = Self::new();
        model.precision = precision;
        for pair in &parameters.pairs {
            pair.potential.validate()?;
            model.insert(pair.types[0], pair.types[1], pair.potential);
        }
        Ok(model)
    }
}

impl PairPotentialManager for LennardJonesModel {
    fn with_table(table: Table) -> Self {
        Self {
            table,
            precision: Precision::Float64,
        }
    }

    fn table(&self) -> &Table {
        &self.table
    }

    fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }
}

impl DeployedModel for LennardJonesModel {
    fn forward(&self, input: &ModelInput) -> Result<ModelOutput> {
        let mut forces = Matrix3xX::zeros(input.n_atoms());
        let mut total_energy = 0.0;

        for (&[i, j], rij) in input.edge_index.iter().zip(input.edge_vectors()) {
            let (type_i, type_j) = (input.atom_types[i], input.atom_types[j]);
            let potential = self
                .get(type_i, type_j)
                .ok_or(NequipError::MissingPotential {
                    i: type_i,
                    j: type_j,
                })?;

            if rij.norm() > potential.get_rcut() {
                continue;
            }
            let (uij, force_ij) = potential.compute_potential(&rij);

            // Each pair arrives once per direction.
            total_energy += 0.5 * uij;
            let mut fi = forces.column_mut(i);
            fi += force_ij;
        }

        Ok(ModelOutput {
            total_energy: self.precision.apply(total_energy),
            forces: forces.map(|f| self.precision.apply(f)),
        })
    }
}

pub struct LennardJonesLoader;

impl ModelLoader for LennardJonesLoader {
    fn kind(&self) -> &str {
        LENNARD_JONES_KIND
    }

    fn available_devices(&self) -> Vec<Device> {
        vec![Device::Cpu]
    }

    fn load(
        &self,
        spec: &ModelSpec,
        _device: Device,
        precision: Precision,
    ) -> Result<Box<dyn DeployedModel>> {
        let parameters: LennardJonesParameters = serde_json::from_value(spec.parameters.clone())?;
        Ok(Box::new(LennardJonesModel::from_parameters(
            &parameters,
            precision,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use na::Matrix3;

    fn argon() -> LennardJones {
        LennardJones::new(0.0104, 3.4, 8.5, false)
    }

    fn two_atom_input(r: f64) -> ModelInput {
        ModelInput {
            atom_types: vec![0, 0],
            atomic_numbers: vec![18, 18],
            pos: Matrix3xX::from_columns(&[Vector3::zeros(), Vector3::new(r, 0.0, 0.0)]),
            cell: Matrix3::identity(),
            pbc: [false; 3],
            edge_index: vec![[0, 1], [1, 0]],
            edge_cell_shift: vec![Vector3::zeros(), Vector3::zeros()],
        }
    }

    fn argon_model() -> LennardJonesModel {
        let mut model = LennardJonesModel::new();
        model.insert(0, 0, argon());
        model
    }

    #[test]
    fn energy_is_minus_epsilon_at_the_minimum() {
        let lj = argon();
        let r_min = 2.0_f64.powf(1.0 / 6.0) * 3.4;
        let (u, f) = lj.compute_potential(&Vector3::new(r_min, 0.0, 0.0));
        assert_relative_eq!(u, -0.0104, epsilon = 1e-12);
        assert!(f.norm() < 1e-12);
    }

    #[test]
    fn shifted_energy_vanishes_at_the_cutoff() {
        let lj = LennardJones::new(0.0104, 3.4, 8.5, true);
        let (u, _) = lj.compute_potential(&Vector3::new(8.5, 0.0, 0.0));
        assert_relative_eq!(u, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn pair_energy_is_counted_once() {
        let output = argon_model().forward(&two_atom_input(3.4)).unwrap();
        assert_relative_eq!(output.total_energy, 0.0, epsilon = 1e-12);

        let output = argon_model().forward(&two_atom_input(4.0)).unwrap();
        let (u, _) = argon().compute_potential(&Vector3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(output.total_energy, u, epsilon = 1e-15);
    }

    #[test]
    fn forces_obey_newtons_third_law() {
        let output = argon_model().forward(&two_atom_input(3.2)).unwrap();
        let f0 = output.forces.column(0);
        let f1 = output.forces.column(1);
        assert_relative_eq!((f0 + f1).norm(), 0.0, epsilon = 1e-15);
        // Repulsive inside sigma: atom 0 is pushed towards -x.
        assert!(f0[0] < 0.0);
    }

    #[test]
    fn missing_type_pair_is_an_error() {
        let mut input = two_atom_input(3.4);
        input.atom_types = vec![0, 1];
        assert!(matches!(
            argon_model().forward(&input),
            Err(NequipError::MissingPotential { i: 0, j: 1 })
        ));
    }

    #[test]
    fn loader_reads_parameters() {
        let spec = ModelSpec {
            kind: LENNARD_JONES_KIND.to_string(),
            parameters: serde_json::json!({
                "pairs": [{"types": [0, 0], "epsilon": 0.0104, "sigma": 3.4, "rcut": 4.5}]
            }),
        };
        let model = LennardJonesLoader
            .load(&spec, Device::Cpu, Precision::Float64)
            .unwrap();
        assert!(model.forward(&two_atom_input(3.8)).is_ok());

        let bad = ModelSpec {
            kind: LENNARD_JONES_KIND.to_string(),
            parameters: serde_json::json!({
                "pairs": [{"types": [0, 0], "epsilon": 0.0104, "sigma": -1.0, "rcut": 4.5}]
            }),
        };
        assert!(matches!(
            LennardJonesLoader.load(&bad, Device::Cpu, Precision::Float64),
            Err(NequipError::InvalidModelParameters { .. })
        ));
    }
}
