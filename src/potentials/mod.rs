//! Potentials: the pair-potential machinery, the built-in Lennard-Jones model, the NequIP force
//! adapter and the registry hosts create ML potentials from.
pub mod lennard_jones;
pub mod mlpotential;
pub mod nequip_force;
pub mod nequip_potential;
pub mod potential;
