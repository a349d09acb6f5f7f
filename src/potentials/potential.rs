use na::Vector3;
use std::collections::HashMap;

/// A two-body interaction as a function of the displacement between the atoms.
pub trait PairPotential: Send + Sync {
    /// Returns the pair energy and the force on the atom `rij` points to.
    fn compute_potential(&self, rij: &Vector3<f64>) -> (f64, Vector3<f64>);
    fn get_rcut(&self) -> f64;
}

/// Unordered pair of model type indices; `(a, b)` and `(b, a)` are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypePair(usize, usize);

impl TypePair {
    pub fn new(type_i: usize, type_j: usize) -> Self {
        Self(type_i.min(type_j), type_i.max(type_j))
    }

    pub fn types(&self) -> (usize, usize) {
        (self.0, self.1)
    }
}

pub type Table = HashMap<TypePair, Box<dyn PairPotential>>;

/// Pair potentials looked up by the types of the two interacting atoms.
pub trait PairPotentialManager: Sized {
    fn with_table(table: Table) -> Self;
    fn table(&self) -> &Table;
    fn table_mut(&mut self) -> &mut Table;

    fn new() -> Self {
        Self::with_table(Table::new())
    }

    fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Sets the potential between `type_i` and `type_j`, replacing any earlier one.
    fn insert<P>(&mut self, type_i: usize, type_j: usize, potential: P)
    where
        P: PairPotential + 'static,
    {
        self.table_mut()
            .insert(TypePair::new(type_i, type_j), Box::new(potential));
    }

    fn get(&self, type_i: usize, type_j: usize) -> Option<&dyn PairPotential> {
        self.table()
            .get(&TypePair::new(type_i, type_j))
            .map(|b| b.as_ref())
    }
}
