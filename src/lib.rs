//! Runs deployed NequIP interatomic potentials inside a molecular simulation host.
//!
//! The crate builds the edge list a graph potential consumes ([`neighbour_list`]), wraps a
//! deployed model in a force adapter that speaks the host's units ([`potentials::nequip_force`])
//! and registers that force with a host system ([`potentials::mlpotential`], [`host`]).
extern crate nalgebra as na;

pub mod constants;
pub mod device;
pub mod element;
pub mod errors;
pub mod extensions;
pub mod host;
pub mod math;
pub mod model;
pub mod neighbour_list;
pub mod potentials;
pub mod readers;
pub mod simulation_box;
pub mod topology;

pub use errors::{NequipError, Result};
