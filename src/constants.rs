/// Nanometres per Ångström, the usual length conversion for models trained in Å.
pub const ANGSTROM_TO_NM: f64 = 0.1;

/// Kilojoule per mole per electronvolt.
pub const EV_TO_KJPERMOLE: f64 = 96.48533212331002;

/// The file the deployed force is written to when no filename is given.
pub const DEFAULT_ARTIFACT_FILENAME: &str = "nequipmodel.json";

/// The name the NequIP potential is registered under.
pub const NEQUIP_POTENTIAL_NAME: &str = "nequip";
