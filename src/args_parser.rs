use std::path::PathBuf;

use clap::Parser;

use nequip_force::constants::{ANGSTROM_TO_NM, DEFAULT_ARTIFACT_FILENAME, EV_TO_KJPERMOLE};

/// Deploys a NequIP model for a structure and evaluates its energy and forces.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Model artifact (JSON) with the metadata record
    #[arg(short, long)]
    pub model: PathBuf,

    /// Structure in (extended) XYZ format, lengths in Å
    #[arg(short, long)]
    pub structure: String,

    /// Where the deployed force is written
    #[arg(short, long, default_value = DEFAULT_ARTIFACT_FILENAME)]
    pub output: PathBuf,

    /// Execution device (cpu, cuda, cuda:N); autodetected when omitted
    #[arg(short, long)]
    pub device: Option<String>,

    /// Zero-based indices of the atoms handled by the model
    #[arg(long, value_delimiter = ',')]
    pub atoms: Option<Vec<usize>>,

    /// Explicit model type index for each ML atom
    #[arg(long, value_delimiter = ',')]
    pub atom_types: Option<Vec<usize>>,

    #[arg(long, default_value_t = ANGSTROM_TO_NM)]
    pub distance_to_nm: f64,

    #[arg(long, default_value_t = EV_TO_KJPERMOLE)]
    pub energy_to_kj_per_mol: f64,

    #[arg(long, default_value_t = 0)]
    pub force_group: u32,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}
