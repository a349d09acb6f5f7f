use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::info;

use crate::{
    errors::{NequipError, Result},
    host::{ModelForce, System},
    model::deployed::{ModelArtifact, ModelLoaders},
    potentials::{
        mlpotential::{AddForcesOptions, MLPotentialImpl, MLPotentialImplFactory},
        nequip_force::{NequipForce, NequipForceConfig, UnitConversion},
    },
    topology::Topology,
};

/// Creates [`NequipPotentialImpl`]s sharing one set of model loaders.
pub struct NequipPotentialImplFactory {
    loaders: Arc<ModelLoaders>,
}

impl NequipPotentialImplFactory {
    pub fn new(loaders: ModelLoaders) -> Self {
        Self {
            loaders: Arc::new(loaders),
        }
    }
}

impl Default for NequipPotentialImplFactory {
    fn default() -> Self {
        Self::new(ModelLoaders::with_defaults())
    }
}

impl MLPotentialImplFactory for NequipPotentialImplFactory {
    fn create_impl(
        &self,
        name: &str,
        model_path: &Path,
        units: UnitConversion,
        atom_types: Option<Vec<usize>>,
    ) -> Box<dyn MLPotentialImpl> {
        Box::new(NequipPotentialImpl {
            name: name.to_string(),
            model_path: model_path.to_path_buf(),
            units,
            atom_types,
            loaders: Arc::clone(&self.loaders),
        })
    }
}

/// Adds a deployed NequIP model to a host system.
///
/// The force is built, written to `options.filename` and then read back from that file; the
/// host only ever evaluates the persisted copy.
pub struct NequipPotentialImpl {
    name: String,
    model_path: PathBuf,
    units: UnitConversion,
    atom_types: Option<Vec<usize>>,
    loaders: Arc<ModelLoaders>,
}

impl MLPotentialImpl for NequipPotentialImpl {
    fn add_forces(
        &self,
        topology: &Topology,
        system: &mut System,
        atoms: Option<&[usize]>,
        force_group: u32,
        options: &AddForcesOptions,
    ) -> Result<()> {
        let all_atoms = topology.atoms();
        let included_atoms = match atoms {
            Some(indices) => indices
                .iter()
                .map(|&index| {
                    all_atoms
                        .get(index)
                        .cloned()
                        .ok_or(NequipError::InvalidAtomIndex {
                            index,
                            n_atoms: all_atoms.len(),
                        })
                })
                .collect::<Result<Vec<_>>>()?,
            None => all_atoms.to_vec(),
        };

        let periodic = topology.periodic_box_vectors().is_some()
            || system.uses_periodic_boundary_conditions();
        let box_vectors = topology
            .periodic_box_vectors()
            .or(system.default_periodic_box_vectors())
            .copied();

        let artifact = ModelArtifact::read(&self.model_path)?;
        let config = NequipForceConfig {
            included_atoms,
            indices: atoms.map(<[usize]>::to_vec),
            periodic,
            box_vectors,
            units: self.units,
            atom_types: options.atom_types.clone().or_else(|| self.atom_types.clone()),
            device: options.device.clone(),
        };
        let force = NequipForce::new(artifact, config, &self.loaders)?;
        force.save(&options.filename)?;

        let mut model_force = ModelForce::from_file(&options.filename, &self.loaders)?;
        model_force.set_force_group(force_group)?;
        model_force.set_uses_periodic_boundary_conditions(periodic);
        model_force.set_outputs_forces(true);
        system.add_force(model_force);

        info!(
            potential = %self.name,
            model = %self.model_path.display(),
            artifact = %options.filename.display(),
            force_group,
            "added ML force to system"
        );
        Ok(())
    }
}
