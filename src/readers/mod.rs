//! Structure file readers.
pub mod xyz_reader;
