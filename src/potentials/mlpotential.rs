//! Registry of machine-learned potentials a host can instantiate by name.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    constants::{DEFAULT_ARTIFACT_FILENAME, NEQUIP_POTENTIAL_NAME},
    errors::{NequipError, Result},
    host::System,
    potentials::{nequip_force::UnitConversion, nequip_potential::NequipPotentialImplFactory},
    topology::Topology,
};

/// Options accepted when adding an ML force to a system.
#[derive(Debug, Clone, PartialEq)]
pub struct AddForcesOptions {
    /// Where the deployed force is written; the host evaluates what it reads back from here.
    pub filename: PathBuf,
    /// `cpu`, `cuda` or `cuda:N`; autodetected when `None`.
    pub device: Option<String>,
    /// Model type per ML atom, overriding the element-based lookup.
    pub atom_types: Option<Vec<usize>>,
}

impl Default for AddForcesOptions {
    fn default() -> Self {
        Self {
            filename: DEFAULT_ARTIFACT_FILENAME.into(),
            device: None,
            atom_types: None,
        }
    }
}

pub trait MLPotentialImpl {
    /// Builds the force for `atoms` (all topology atoms when `None`) and adds it to `system`.
    fn add_forces(
        &self,
        topology: &Topology,
        system: &mut System,
        atoms: Option<&[usize]>,
        force_group: u32,
        options: &AddForcesOptions,
    ) -> Result<()>;
}

pub trait MLPotentialImplFactory: Send + Sync {
    fn create_impl(
        &self,
        name: &str,
        model_path: &Path,
        units: UnitConversion,
        atom_types: Option<Vec<usize>>,
    ) -> Box<dyn MLPotentialImpl>;
}

#[derive(Default)]
pub struct PotentialRegistry {
    factories: HashMap<String, Box<dyn MLPotentialImplFactory>>,
}

impl PotentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `nequip` registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_impl_factory(NEQUIP_POTENTIAL_NAME, NequipPotentialImplFactory::default());
        registry
    }

    pub fn register_impl_factory<F>(&mut self, name: &str, factory: F)
    where
        F: MLPotentialImplFactory + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn create_impl(
        &self,
        name: &str,
        model_path: &Path,
        units: UnitConversion,
        atom_types: Option<Vec<usize>>,
    ) -> Result<Box<dyn MLPotentialImpl>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| NequipError::UnknownPotential {
                name: name.to_string(),
            })?;
        Ok(factory.create_impl(name, model_path, units, atom_types))
    }
}

/// A named ML potential bound to one model file.
pub struct MLPotential {
    implementation: Box<dyn MLPotentialImpl>,
}

impl MLPotential {
    pub fn new(
        registry: &PotentialRegistry,
        name: &str,
        model_path: impl AsRef<Path>,
        units: UnitConversion,
        atom_types: Option<Vec<usize>>,
    ) -> Result<Self> {
        let implementation = registry.create_impl(name, model_path.as_ref(), units, atom_types)?;
        Ok(Self { implementation })
    }

    /// A system with one particle per topology atom, all of them handled by this potential.
    pub fn create_system(&self, topology: &Topology, options: &AddForcesOptions) -> Result<System> {
        let mut system = System::new(topology.n_atoms());
        system.set_default_periodic_box_vectors(topology.periodic_box_vectors().copied());
        self.add_forces(topology, &mut system, None, 0, options)?;
        Ok(system)
    }

    pub fn add_forces(
        &self,
        topology: &Topology,
        system: &mut System,
        atoms: Option<&[usize]>,
        force_group: u32,
        options: &AddForcesOptions,
    ) -> Result<()> {
        self.implementation
            .add_forces(topology, system, atoms, force_group, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_is_rejected() {
        let registry = PotentialRegistry::with_defaults();
        let result = registry.create_impl(
            "ani2x",
            Path::new("model.json"),
            UnitConversion::default(),
            None,
        );
        assert!(matches!(result, Err(NequipError::UnknownPotential { name }) if name == "ani2x"));
        assert!(registry
            .create_impl(
                "nequip",
                Path::new("model.json"),
                UnitConversion::default(),
                None
            )
            .is_ok());
    }

    #[test]
    fn default_options() {
        let options = AddForcesOptions::default();
        assert_eq!(options.filename, PathBuf::from("nequipmodel.json"));
        assert!(options.device.is_none());
        assert!(options.atom_types.is_none());
    }
}
