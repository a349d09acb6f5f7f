//! Reader for (extended) XYZ structure files.
//!
//! ```text
//! 2
//! Lattice="10.0 0.0 0.0 0.0 10.0 0.0 0.0 0.0 10.0" two argon atoms
//! Ar 0.0 0.0 0.0
//! Ar 3.8 0.0 0.0
//! ```
//!
//! The optional `Lattice` entry lists the three lattice vectors one after another.
use std::{
    fs::File,
    io::{BufRead, BufReader},
};

use na::{Matrix3, Matrix3xX, Vector3};

use crate::{
    element::Element,
    errors::{NequipError, Result},
    extensions::ArgsExt,
    math::matrix_from_columns,
    topology::Topology,
};

/// A topology with positions, lengths in nm.
pub struct Structure {
    pub topology: Topology,
    pub positions: Matrix3xX<f64>,
}

pub struct XyzReader {
    infile: String,
    /// Multiplies every length read from the file.
    length_to_nm: f64,
}

impl XyzReader {
    pub fn new(infile: String, length_to_nm: f64) -> Self {
        Self {
            infile,
            length_to_nm,
        }
    }

    pub fn read(&self) -> Result<Structure> {
        let file = File::open(&self.infile).map_err(|e| NequipError::InputFileError {
            path: self.infile.clone(),
            source: e,
        })?;
        self.parse(BufReader::new(file))
    }

    pub fn parse<R: BufRead>(&self, reader: R) -> Result<Structure> {
        let mut lines = reader.lines().enumerate().map(|(line_num, line)| {
            let line_num = line_num + 1;
            line.map(|l| (line_num, l))
                .map_err(|e| NequipError::DataFileError {
                    path: self.infile.clone(),
                    line: line_num,
                    source: e,
                })
        });

        let (count_line, count) = lines.next().ok_or(NequipError::MissingArgument { line: 1 })??;
        let count_fields: Vec<&str> = count.split_whitespace().collect();
        let n_atoms = count_fields.parse_usize_at(0, count_line)?;

        let mut topology = Topology::new();
        let comment = match lines.next() {
            Some(line) => line?.1,
            None => String::new(),
        };
        if let Some(lattice) = parse_lattice(&comment)? {
            topology.set_periodic_box_vectors(Some(lattice * self.length_to_nm));
        }

        let mut columns: Vec<Vector3<f64>> = Vec::with_capacity(n_atoms);
        for line in lines {
            if columns.len() == n_atoms {
                break;
            }
            let (line_num, line) = line?;
            let line_split: Vec<&str> = line.split_whitespace().collect();
            if line_split.is_empty() {
                continue;
            }

            let symbol = line_split.get_required(0, line_num)?;
            let element = Element::from_symbol(symbol).ok_or(NequipError::UnknownElement {
                symbol: symbol.to_string(),
                line: line_num,
            })?;
            let x = line_split.parse_float_at(1, line_num)?;
            let y = line_split.parse_float_at(2, line_num)?;
            let z = line_split.parse_float_at(3, line_num)?;

            topology.add_atom(format!("{}{}", element.symbol(), columns.len() + 1), element);
            columns.push(Vector3::new(x, y, z) * self.length_to_nm);
        }

        if columns.len() != n_atoms {
            return Err(NequipError::PositionCountMismatch {
                expected: n_atoms,
                found: columns.len(),
            });
        }

        Ok(Structure {
            topology,
            positions: matrix_from_columns(&columns),
        })
    }
}

/// Lattice vectors (as rows) from a `Lattice="..."` comment entry, if present.
fn parse_lattice(comment: &str) -> Result<Option<Matrix3<f64>>> {
    let Some((_, rest)) = comment.split_once("Lattice=\"") else {
        return Ok(None);
    };
    let values = rest.split('"').next().unwrap_or_default();
    let fields: Vec<&str> = values.split_whitespace().collect();

    let mut entries = [0.0; 9];
    for (k, entry) in entries.iter_mut().enumerate() {
        *entry = fields.parse_float_at(k, 2)?;
    }
    Ok(Some(Matrix3::from_row_slice(&entries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reader() -> XyzReader {
        XyzReader::new("inline.xyz".to_string(), 0.1)
    }

    #[test]
    fn reads_atoms_and_lattice() {
        let text = "2\nLattice=\"10.0 0.0 0.0 0.0 12.0 0.0 0.0 0.0 14.0\" argon\nAr 0.0 0.0 0.0\nAr 3.8 0.0 0.0\n";
        let structure = reader().parse(text.as_bytes()).unwrap();

        assert_eq!(structure.topology.n_atoms(), 2);
        assert_eq!(structure.topology.atoms()[1].element.atomic_number(), 18);
        assert_relative_eq!(structure.positions[(0, 1)], 0.38, epsilon = 1e-12);
        let lattice = structure.topology.periodic_box_vectors().unwrap();
        assert_relative_eq!(lattice[(1, 1)], 1.2, epsilon = 1e-12);
    }

    #[test]
    fn plain_comment_means_open_boundaries() {
        let text = "1\nwater oxygen\nO 1.0 2.0 3.0\n";
        let structure = reader().parse(text.as_bytes()).unwrap();
        assert!(structure.topology.periodic_box_vectors().is_none());
    }

    #[test]
    fn zero_atoms_is_an_empty_structure() {
        let structure = reader().parse("0\nempty\n".as_bytes()).unwrap();
        assert_eq!(structure.topology.n_atoms(), 0);
        assert_eq!(structure.positions.ncols(), 0);

        let structure = reader().parse("0\n\n".as_bytes()).unwrap();
        assert_eq!(structure.positions.ncols(), 0);
    }

    #[test]
    fn truncated_file_is_an_error() {
        let text = "3\n\nH 0 0 0\nH 0 0 1\n";
        assert!(matches!(
            reader().parse(text.as_bytes()),
            Err(NequipError::PositionCountMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn unknown_element_reports_line() {
        let text = "1\n\nQq 0 0 0\n";
        assert!(matches!(
            reader().parse(text.as_bytes()),
            Err(NequipError::UnknownElement { line: 3, .. })
        ));
    }
}
