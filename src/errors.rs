use thiserror::Error;

#[derive(Error, Debug)]
pub enum NequipError {
    // File I/O Errors
    #[error("Failed to open input file '{path}': {source}")]
    InputFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read line {line} in file '{path}': {source}")]
    DataFileError {
        path: String,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read model artifact '{path}': {source}")]
    ArtifactReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write model artifact '{path}': {source}")]
    ArtifactWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    // Parsing Errors
    #[error("Missing argument on line {line}")]
    MissingArgument { line: usize },

    #[error("Error parsing floating number from string {string}: {source}")]
    FloatParseError {
        string: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("Error parsing integer number from string {string}: {source}")]
    IntParseError {
        string: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Unknown element symbol '{symbol}' on line {line}")]
    UnknownElement { symbol: String, line: usize },

    // Configuration errors
    #[error("Model metadata is missing required key '{key}'")]
    MissingMetadata { key: String },

    #[error("Model metadata key '{key}' has malformed value '{value}'")]
    MalformedMetadata { key: String, value: String },

    #[error("Species '{species}' is not in the model vocabulary {vocabulary:?}")]
    UnknownSpecies {
        species: String,
        vocabulary: Vec<String>,
    },

    #[error("Atom type {type_id} out of range for a model with {n_species} species")]
    InvalidAtomType { type_id: usize, n_species: usize },

    #[error("Atom type count mismatch: expected {expected}, found {found}")]
    AtomTypeCountMismatch { expected: usize, found: usize },

    #[error("Atom index {index} out of range (total atoms: {n_atoms})")]
    InvalidAtomIndex { index: usize, n_atoms: usize },

    #[error("Cutoff {cutoff} must be smaller than half the minimum periodic cell edge {min_edge}")]
    CutoffTooLarge { cutoff: f64, min_edge: f64 },

    #[error("Force group {group} out of range (0..=31)")]
    InvalidForceGroup { group: u32 },

    #[error("No potential registered under the name '{name}'")]
    UnknownPotential { name: String },

    #[error("Missing potential for atom type pair ({i}, {j})")]
    MissingPotential { i: usize, j: usize },

    #[error("Invalid model parameters: {reason}")]
    InvalidModelParameters { reason: String },

    #[error("No loader understands model kind '{kind}'")]
    UnknownModelKind { kind: String },

    // Geometry errors
    #[error("Only orthogonal cells are supported, found off-diagonal element {value} at ({row}, {col})")]
    NonOrthogonalCell { row: usize, col: usize, value: f64 },

    #[error("Cell matrix is singular or has a non-positive edge")]
    SingularCell,

    #[error("Periodic evaluation requires box vectors")]
    CellRequired,

    #[error("Position count mismatch: expected {expected}, found {found}")]
    PositionCountMismatch { expected: usize, found: usize },

    // Device errors
    #[error("Invalid device string '{device}'")]
    InvalidDevice { device: String },

    #[error("Requested device '{device}' is not available")]
    DeviceUnavailable { device: String },

    // Model errors
    #[error("Model returned forces for {found} atoms, expected {expected}")]
    ModelOutputShape { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, NequipError>;
