mod args_parser;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nequip_force::{
    constants::{ANGSTROM_TO_NM, NEQUIP_POTENTIAL_NAME},
    host::{System, ALL_GROUPS},
    potentials::{
        mlpotential::{AddForcesOptions, MLPotential, PotentialRegistry},
        nequip_force::UnitConversion,
    },
    readers::xyz_reader::XyzReader,
};

use crate::args_parser::Args;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let structure = XyzReader::new(args.structure.clone(), ANGSTROM_TO_NM)
        .read()
        .with_context(|| format!("reading structure '{}'", args.structure))?;
    info!(
        n_atoms = structure.topology.n_atoms(),
        periodic = structure.topology.periodic_box_vectors().is_some(),
        "read structure"
    );

    let registry = PotentialRegistry::with_defaults();
    let units = UnitConversion {
        distance_to_nm: args.distance_to_nm,
        energy_to_kj_per_mol: args.energy_to_kj_per_mol,
    };
    let potential = MLPotential::new(&registry, NEQUIP_POTENTIAL_NAME, &args.model, units, None)?;

    let mut system = System::new(structure.topology.n_atoms());
    system.set_default_periodic_box_vectors(structure.topology.periodic_box_vectors().copied());

    let options = AddForcesOptions {
        filename: args.output.clone(),
        device: args.device.clone(),
        atom_types: args.atom_types.clone(),
    };
    potential
        .add_forces(
            &structure.topology,
            &mut system,
            args.atoms.as_deref(),
            args.force_group,
            &options,
        )
        .with_context(|| format!("deploying model '{}'", args.model.display()))?;

    let (energy, forces) = system
        .calc_energy_and_forces(&structure.positions, None, ALL_GROUPS)
        .context("evaluating the deployed force")?;

    println!("energy {energy:.6} kJ/mol");
    println!("atom fx fy fz (kJ/mol/nm)");
    for (i, force) in forces.column_iter().enumerate() {
        println!(
            "{} {:.6} {:.6} {:.6}",
            i + 1,
            force[0],
            force[1],
            force[2]
        );
    }
    Ok(())
}
