//! The force adapter: host positions in, host-unit energy and forces out.
//!
//! [`NequipForce`] holds everything fixed at build time (species indices, atomic numbers, the
//! ML atom subset, periodicity, unit constants, device and precision) and, on every
//! [`NequipForce::compute`], converts units, builds the neighbour list and invokes the model.
//! It can be written to disk as a self-contained artifact and reloaded without the original
//! model file.
use std::{fs, path::Path};

use na::{Matrix3, Matrix3xX};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    constants::{ANGSTROM_TO_NM, EV_TO_KJPERMOLE},
    device::Device,
    errors::{NequipError, Result},
    model::{
        deployed::{load_deployed_model, DeployedModel, ModelArtifact, ModelLoaders},
        metadata::{ModelMetadata, Precision},
        record::ModelInput,
    },
    neighbour_list::{build_neighbour_list, NeighbourListOptions},
    simulation_box::SimulationBox,
    topology::TopologyAtom,
};

/// Conversion from the model's units to the host's (nm, kJ/mol).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    pub distance_to_nm: f64,
    pub energy_to_kj_per_mol: f64,
}

impl Default for UnitConversion {
    /// Å and eV, the units NequIP models are usually trained in.
    fn default() -> Self {
        Self {
            distance_to_nm: ANGSTROM_TO_NM,
            energy_to_kj_per_mol: EV_TO_KJPERMOLE,
        }
    }
}

impl UnitConversion {
    pub fn length_to_model(&self, length_nm: f64) -> f64 {
        length_nm / self.distance_to_nm
    }

    pub fn energy_to_host(&self, energy: f64) -> f64 {
        energy * self.energy_to_kj_per_mol
    }

    pub fn energy_to_model(&self, energy_kj_per_mol: f64) -> f64 {
        energy_kj_per_mol / self.energy_to_kj_per_mol
    }

    /// Force is energy over length.
    pub fn force_to_host(&self, force: f64) -> f64 {
        force * self.energy_to_kj_per_mol / self.distance_to_nm
    }

    pub fn force_to_model(&self, force_kj_per_mol_nm: f64) -> f64 {
        force_kj_per_mol_nm * self.distance_to_nm / self.energy_to_kj_per_mol
    }
}

/// Build-time inputs of a [`NequipForce`].
#[derive(Debug, Clone, Default)]
pub struct NequipForceConfig {
    /// Atoms handled by the model, in the order positions are handed to it.
    pub included_atoms: Vec<TopologyAtom>,
    /// Host indices of `included_atoms`, `None` when every host atom is an ML atom.
    pub indices: Option<Vec<usize>>,
    pub periodic: bool,
    /// Host box vectors known at build time, checked against the model's cutoff.
    pub box_vectors: Option<Matrix3<f64>>,
    pub units: UnitConversion,
    /// Explicit model type per included atom, bypassing the species vocabulary.
    pub atom_types: Option<Vec<usize>>,
    pub device: Option<String>,
}

/// The on-disk form of a [`NequipForce`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DeployedForce {
    model: ModelArtifact,
    device: Device,
    atom_types: Vec<usize>,
    atomic_numbers: Vec<usize>,
    indices: Option<Vec<usize>>,
    pbc: [bool; 3],
    units: UnitConversion,
}

pub struct NequipForce {
    artifact: ModelArtifact,
    model: Box<dyn DeployedModel>,
    device: Device,
    precision: Precision,
    r_max: f64,
    atom_types: Vec<usize>,
    atomic_numbers: Vec<usize>,
    indices: Option<Vec<usize>>,
    pbc: [bool; 3],
    units: UnitConversion,
}

impl NequipForce {
    pub fn new(
        artifact: ModelArtifact,
        config: NequipForceConfig,
        loaders: &ModelLoaders,
    ) -> Result<Self> {
        let loaded = load_deployed_model(&artifact, config.device.as_deref(), loaders)?;
        let metadata = loaded.metadata;

        let atom_types = resolve_atom_types(&metadata, &config.included_atoms, config.atom_types)?;
        let atomic_numbers = config
            .included_atoms
            .iter()
            .map(|atom| atom.element.atomic_number())
            .collect();

        if let Some(indices) = &config.indices {
            if indices.len() != config.included_atoms.len() {
                return Err(NequipError::AtomTypeCountMismatch {
                    expected: config.included_atoms.len(),
                    found: indices.len(),
                });
            }
        }

        let force = Self {
            artifact,
            model: loaded.model,
            device: loaded.device,
            precision: metadata.model_dtype,
            r_max: metadata.r_max,
            atom_types,
            atomic_numbers,
            indices: config.indices,
            pbc: [config.periodic; 3],
            units: config.units,
        };

        if config.periodic {
            if let Some(box_vectors) = &config.box_vectors {
                force.model_box(box_vectors)?.check_cutoff(force.r_max)?;
            }
        }

        info!(
            n_atoms = force.n_atoms(),
            periodic = config.periodic,
            device = %force.device,
            dtype = %force.precision,
            "built NequIP force"
        );
        Ok(force)
    }

    /// Reloads a force written by [`NequipForce::save`].
    pub fn load(path: impl AsRef<Path>, loaders: &ModelLoaders) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| NequipError::ArtifactReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let deployed: DeployedForce = serde_json::from_str(&text)?;

        let device = deployed.device.to_string();
        let loaded = load_deployed_model(&deployed.model, Some(device.as_str()), loaders)?;
        check_atom_types(&loaded.metadata, &deployed.atom_types)?;
        if deployed.atomic_numbers.len() != deployed.atom_types.len() {
            return Err(NequipError::AtomTypeCountMismatch {
                expected: deployed.atom_types.len(),
                found: deployed.atomic_numbers.len(),
            });
        }
        if let Some(indices) = &deployed.indices {
            if indices.len() != deployed.atom_types.len() {
                return Err(NequipError::AtomTypeCountMismatch {
                    expected: deployed.atom_types.len(),
                    found: indices.len(),
                });
            }
        }

        Ok(Self {
            artifact: deployed.model,
            model: loaded.model,
            device: loaded.device,
            precision: loaded.metadata.model_dtype,
            r_max: loaded.metadata.r_max,
            atom_types: deployed.atom_types,
            atomic_numbers: deployed.atomic_numbers,
            indices: deployed.indices,
            pbc: deployed.pbc,
            units: deployed.units,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let deployed = DeployedForce {
            model: self.artifact.clone(),
            device: self.device,
            atom_types: self.atom_types.clone(),
            atomic_numbers: self.atomic_numbers.clone(),
            indices: self.indices.clone(),
            pbc: self.pbc,
            units: self.units,
        };
        let text = serde_json::to_string_pretty(&deployed)?;
        fs::write(path, text).map_err(|e| NequipError::ArtifactWriteError {
            path: path.display().to_string(),
            source: e,
        })?;
        info!(path = %path.display(), "wrote deployed force");
        Ok(())
    }

    pub fn n_atoms(&self) -> usize {
        self.atom_types.len()
    }

    pub fn r_max(&self) -> f64 {
        self.r_max
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn atom_types(&self) -> &[usize] {
        &self.atom_types
    }

    pub fn atomic_numbers(&self) -> &[usize] {
        &self.atomic_numbers
    }

    pub fn indices(&self) -> Option<&[usize]> {
        self.indices.as_deref()
    }

    pub fn is_periodic(&self) -> bool {
        self.pbc.iter().any(|&p| p)
    }

    pub fn units(&self) -> &UnitConversion {
        &self.units
    }

    /// Energy (kJ/mol) and forces (kJ/mol/nm) for host positions in nm.
    ///
    /// `positions` holds one column per host atom; the returned forces have one column per ML
    /// atom, in subset order when a subset is configured.
    pub fn compute(
        &self,
        positions: &Matrix3xX<f64>,
        box_vectors: Option<&Matrix3<f64>>,
    ) -> Result<(f64, Matrix3xX<f64>)> {
        let selected = self.select(positions)?;
        let pos = selected.map(|x| self.precision.apply(self.units.length_to_model(x)));

        // Open boundaries always see the identity cell, whatever box the host passes.
        let (cell, sim_box) = match box_vectors {
            Some(box_vectors) if self.is_periodic() => {
                let sim_box = self.model_box(box_vectors)?;
                (sim_box.h, sim_box)
            }
            None if self.is_periodic() => return Err(NequipError::CellRequired),
            _ => (Matrix3::identity(), SimulationBox::non_periodic()),
        };

        let neighbours =
            build_neighbour_list(&pos, &sim_box, self.r_max, &NeighbourListOptions::default())?;
        debug!(
            n_atoms = pos.ncols(),
            n_edges = neighbours.n_edges(),
            "evaluating model"
        );

        let input = ModelInput {
            atom_types: self.atom_types.clone(),
            atomic_numbers: self.atomic_numbers.clone(),
            pos,
            cell,
            pbc: self.pbc,
            edge_index: neighbours.edge_index,
            edge_cell_shift: neighbours.shifts,
        };

        let output = self.model.forward(&input)?;
        if output.forces.ncols() != self.n_atoms() {
            return Err(NequipError::ModelOutputShape {
                expected: self.n_atoms(),
                found: output.forces.ncols(),
            });
        }

        let energy = self
            .precision
            .apply(self.units.energy_to_host(output.total_energy));
        let forces = output
            .forces
            .map(|f| self.precision.apply(self.units.force_to_host(f)));
        Ok((energy, forces))
    }

    fn select(&self, positions: &Matrix3xX<f64>) -> Result<Matrix3xX<f64>> {
        match &self.indices {
            Some(indices) => {
                let n_atoms = positions.ncols();
                if let Some(&index) = indices.iter().find(|&&index| index >= n_atoms) {
                    return Err(NequipError::InvalidAtomIndex { index, n_atoms });
                }
                Ok(positions.select_columns(indices))
            }
            None if positions.ncols() != self.n_atoms() => {
                Err(NequipError::PositionCountMismatch {
                    expected: self.n_atoms(),
                    found: positions.ncols(),
                })
            }
            None => Ok(positions.clone()),
        }
    }

    /// Host box vectors converted to the model's length unit.
    fn model_box(&self, box_vectors: &Matrix3<f64>) -> Result<SimulationBox> {
        let h = box_vectors.map(|x| self.precision.apply(self.units.length_to_model(x)));
        SimulationBox::new(h, self.pbc)
    }
}

fn resolve_atom_types(
    metadata: &ModelMetadata,
    included_atoms: &[TopologyAtom],
    explicit: Option<Vec<usize>>,
) -> Result<Vec<usize>> {
    match explicit {
        Some(atom_types) => {
            if atom_types.len() != included_atoms.len() {
                return Err(NequipError::AtomTypeCountMismatch {
                    expected: included_atoms.len(),
                    found: atom_types.len(),
                });
            }
            check_atom_types(metadata, &atom_types)?;
            warn!("using explicit atom types, species names are not checked against the model");
            Ok(atom_types)
        }
        None => included_atoms
            .iter()
            .map(|atom| metadata.species_index(atom.element.symbol()))
            .collect(),
    }
}

fn check_atom_types(metadata: &ModelMetadata, atom_types: &[usize]) -> Result<()> {
    match atom_types.iter().find(|&&t| t >= metadata.n_species()) {
        Some(&type_id) => Err(NequipError::InvalidAtomType {
            type_id,
            n_species: metadata.n_species(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        element::Element,
        model::{deployed::ModelLoader, deployed::ModelSpec, record::ModelOutput},
    };
    use approx::assert_relative_eq;
    use na::Vector3;
    use std::sync::{Arc, Mutex};

    #[test]
    fn unit_round_trip() {
        let units = UnitConversion::default();
        let force = 123.456;
        assert_relative_eq!(
            units.force_to_host(units.force_to_model(force)),
            force,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            units.energy_to_host(units.energy_to_model(-7.5)),
            -7.5,
            max_relative = 1e-12
        );
        assert_relative_eq!(units.length_to_model(0.15), 1.5, max_relative = 1e-12);
    }

    /// Records the cell of every input it is invoked with.
    struct CellRecorder(Arc<Mutex<Vec<Matrix3<f64>>>>);

    impl DeployedModel for CellRecorder {
        fn forward(&self, input: &ModelInput) -> Result<ModelOutput> {
            if let Ok(mut cells) = self.0.lock() {
                cells.push(input.cell);
            }
            Ok(ModelOutput {
                total_energy: 0.0,
                forces: Matrix3xX::zeros(input.n_atoms()),
            })
        }
    }

    struct CellRecorderLoader(Arc<Mutex<Vec<Matrix3<f64>>>>);

    impl ModelLoader for CellRecorderLoader {
        fn kind(&self) -> &str {
            "cell_recorder"
        }

        fn available_devices(&self) -> Vec<Device> {
            vec![Device::Cpu]
        }

        fn load(
            &self,
            _spec: &ModelSpec,
            _device: Device,
            _precision: Precision,
        ) -> Result<Box<dyn DeployedModel>> {
            Ok(Box::new(CellRecorder(Arc::clone(&self.0))))
        }
    }

    fn recorder_force(periodic: bool) -> (NequipForce, Arc<Mutex<Vec<Matrix3<f64>>>>) {
        let cells = Arc::new(Mutex::new(Vec::new()));
        let mut loaders = ModelLoaders::new();
        loaders.register(CellRecorderLoader(Arc::clone(&cells)));

        let artifact = ModelArtifact {
            metadata: ModelMetadata {
                r_max: 4.0,
                model_dtype: Precision::Float64,
                type_names: vec!["Ar".into()],
            }
            .to_map(),
            model: ModelSpec {
                kind: "cell_recorder".to_string(),
                parameters: serde_json::Value::Null,
            },
        };
        let argon = TopologyAtom {
            name: "AR1".into(),
            element: Element::from_symbol("Ar").unwrap(),
        };
        let config = NequipForceConfig {
            included_atoms: vec![argon.clone(), argon],
            periodic,
            ..Default::default()
        };
        (NequipForce::new(artifact, config, &loaders).unwrap(), cells)
    }

    #[test]
    fn open_boundaries_send_the_identity_cell() {
        let (force, cells) = recorder_force(false);
        let pos = Matrix3xX::from_columns(&[Vector3::zeros(), Vector3::new(0.3, 0.0, 0.0)]);

        force
            .compute(&pos, Some(&Matrix3::from_diagonal_element(2.0)))
            .unwrap();
        force.compute(&pos, None).unwrap();

        let cells = cells.lock().unwrap();
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|cell| *cell == Matrix3::identity()));
    }

    #[test]
    fn periodic_cell_is_converted_to_model_units() {
        let (force, cells) = recorder_force(true);
        let pos = Matrix3xX::from_columns(&[Vector3::zeros(), Vector3::new(0.3, 0.0, 0.0)]);

        force
            .compute(&pos, Some(&Matrix3::from_diagonal_element(2.0)))
            .unwrap();

        let cells = cells.lock().unwrap();
        assert_relative_eq!(cells[0], Matrix3::from_diagonal_element(20.0), epsilon = 1e-12);
    }

    #[test]
    fn explicit_types_must_fit_the_vocabulary() {
        let metadata = ModelMetadata {
            r_max: 4.0,
            model_dtype: Precision::Float64,
            type_names: vec!["H".into(), "O".into()],
        };
        let atoms = vec![
            TopologyAtom {
                name: "O1".into(),
                element: Element::from_symbol("O").unwrap(),
            },
            TopologyAtom {
                name: "X1".into(),
                element: Element::from_symbol("Xe").unwrap(),
            },
        ];

        assert!(matches!(
            resolve_atom_types(&metadata, &atoms, None),
            Err(NequipError::UnknownSpecies { .. })
        ));
        assert_eq!(
            resolve_atom_types(&metadata, &atoms, Some(vec![1, 0])).unwrap(),
            vec![1, 0]
        );
        assert!(matches!(
            resolve_atom_types(&metadata, &atoms, Some(vec![1, 2])),
            Err(NequipError::InvalidAtomType { type_id: 2, .. })
        ));
        assert!(matches!(
            resolve_atom_types(&metadata, &atoms, Some(vec![1])),
            Err(NequipError::AtomTypeCountMismatch { .. })
        ));
    }
}
