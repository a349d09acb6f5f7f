//! The metadata record embedded in a deployed model.
//!
//! Values are stored as strings, the way deployment tools attach them to a serialized graph:
//! `r_max` is a float, `model_dtype` is `float32` or `float64` and `type_names` is a
//! space-separated species vocabulary whose positions are the model's type indices.
use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::{NequipError, Result};

pub const R_MAX_KEY: &str = "r_max";
pub const MODEL_DTYPE_KEY: &str = "model_dtype";
pub const TYPE_NAMES_KEY: &str = "type_names";

/// Numeric precision every tensor handed to or received from the model is held at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float32,
    Float64,
}

impl Precision {
    /// Rounds `value` to what this precision can represent.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Precision::Float32 => crate::math::round_to_f32(value),
            Precision::Float64 => value,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Float32 => write!(f, "float32"),
            Precision::Float64 => write!(f, "float64"),
        }
    }
}

impl FromStr for Precision {
    type Err = NequipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "float32" => Ok(Precision::Float32),
            "float64" => Ok(Precision::Float64),
            other => Err(NequipError::MalformedMetadata {
                key: MODEL_DTYPE_KEY.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    pub r_max: f64,
    pub model_dtype: Precision,
    pub type_names: Vec<String>,
}

impl ModelMetadata {
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self> {
        let required = |key: &str| {
            map.get(key).ok_or_else(|| NequipError::MissingMetadata {
                key: key.to_string(),
            })
        };
        let malformed = |key: &str, value: &str| NequipError::MalformedMetadata {
            key: key.to_string(),
            value: value.to_string(),
        };

        let r_max_str = required(R_MAX_KEY)?;
        let r_max: f64 = r_max_str
            .trim()
            .parse()
            .map_err(|_| malformed(R_MAX_KEY, r_max_str))?;
        if !r_max.is_finite() || r_max <= 0.0 {
            return Err(malformed(R_MAX_KEY, r_max_str));
        }

        let model_dtype: Precision = required(MODEL_DTYPE_KEY)?.parse()?;

        let type_names_str = required(TYPE_NAMES_KEY)?;
        let type_names: Vec<String> = type_names_str
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if type_names.is_empty() {
            return Err(malformed(TYPE_NAMES_KEY, type_names_str));
        }

        Ok(Self {
            r_max,
            model_dtype,
            type_names,
        })
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (R_MAX_KEY.to_string(), self.r_max.to_string()),
            (MODEL_DTYPE_KEY.to_string(), self.model_dtype.to_string()),
            (TYPE_NAMES_KEY.to_string(), self.type_names.join(" ")),
        ])
    }

    pub fn n_species(&self) -> usize {
        self.type_names.len()
    }

    /// Model type index of a species name.
    pub fn species_index(&self, species: &str) -> Result<usize> {
        self.type_names
            .iter()
            .position(|name| name == species)
            .ok_or_else(|| NequipError::UnknownSpecies {
                species: species.to_string(),
                vocabulary: self.type_names.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_complete_metadata() {
        let metadata = ModelMetadata::from_map(&map(&[
            ("r_max", "4.5"),
            ("model_dtype", "float32"),
            ("type_names", "H C O"),
        ]))
        .unwrap();
        assert_eq!(metadata.r_max, 4.5);
        assert_eq!(metadata.model_dtype, Precision::Float32);
        assert_eq!(metadata.species_index("O").unwrap(), 2);
        assert_eq!(ModelMetadata::from_map(&metadata.to_map()).unwrap(), metadata);
    }

    #[test]
    fn missing_key_is_fatal() {
        let err = ModelMetadata::from_map(&map(&[("r_max", "4.5"), ("type_names", "H")]))
            .unwrap_err();
        assert!(matches!(err, NequipError::MissingMetadata { key } if key == "model_dtype"));
    }

    #[test]
    fn malformed_values_are_fatal() {
        for (key, value) in [
            ("r_max", "four"),
            ("r_max", "-1.0"),
            ("model_dtype", "float16"),
            ("type_names", "   "),
        ] {
            let mut entries = map(&[
                ("r_max", "4.5"),
                ("model_dtype", "float64"),
                ("type_names", "H"),
            ]);
            entries.insert(key.to_string(), value.to_string());
            assert!(
                matches!(
                    ModelMetadata::from_map(&entries),
                    Err(NequipError::MalformedMetadata { .. })
                ),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_species_reports_vocabulary() {
        let metadata = ModelMetadata {
            r_max: 5.0,
            model_dtype: Precision::Float64,
            type_names: vec!["H".into(), "O".into()],
        };
        let err = metadata.species_index("C").unwrap_err();
        assert!(matches!(err, NequipError::UnknownSpecies { species, .. } if species == "C"));
    }

    #[test]
    fn single_precision_rounds() {
        let value = 0.1_f64;
        assert_ne!(Precision::Float32.apply(value), value);
        assert_eq!(Precision::Float64.apply(value), value);
    }
}
