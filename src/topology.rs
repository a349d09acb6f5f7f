//! The host's description of the atoms being simulated.
use na::Matrix3;

use crate::element::Element;

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyAtom {
    pub name: String,
    pub element: Element,
}

/// Ordered atom list plus the optional periodic box (lattice vectors in nm).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: Vec<TopologyAtom>,
    periodic_box_vectors: Option<Matrix3<f64>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, name: impl Into<String>, element: Element) -> usize {
        self.atoms.push(TopologyAtom {
            name: name.into(),
            element,
        });
        self.atoms.len() - 1
    }

    pub fn atoms(&self) -> &[TopologyAtom] {
        &self.atoms
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn periodic_box_vectors(&self) -> Option<&Matrix3<f64>> {
        self.periodic_box_vectors.as_ref()
    }

    pub fn set_periodic_box_vectors(&mut self, box_vectors: Option<Matrix3<f64>>) {
        self.periodic_box_vectors = box_vectors;
    }
}
