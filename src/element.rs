//! Chemical elements, identified by symbol and atomic number.

const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    atomic_number: usize,
}

impl Element {
    pub fn from_atomic_number(atomic_number: usize) -> Option<Self> {
        (1..=SYMBOLS.len())
            .contains(&atomic_number)
            .then_some(Self { atomic_number })
    }

    /// Case-insensitive lookup, so `"CL"` and `"cl"` both resolve to chlorine.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOLS
            .iter()
            .position(|s| s.eq_ignore_ascii_case(symbol))
            .map(|index| Self {
                atomic_number: index + 1,
            })
    }

    pub fn symbol(&self) -> &'static str {
        SYMBOLS[self.atomic_number - 1]
    }

    pub fn atomic_number(&self) -> usize {
        self.atomic_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_and_number_agree() {
        let oxygen = Element::from_symbol("O").unwrap();
        assert_eq!(oxygen.atomic_number(), 8);
        assert_eq!(Element::from_atomic_number(8), Some(oxygen));
        assert_eq!(Element::from_symbol("cl").unwrap().symbol(), "Cl");
    }

    #[test]
    fn unknown_symbols() {
        assert!(Element::from_symbol("Xx").is_none());
        assert!(Element::from_atomic_number(0).is_none());
        assert!(Element::from_atomic_number(119).is_none());
    }
}
