use crate::errors::{NequipError, Result};

pub trait ArgsExt {
    fn get_required(&self, index: usize, line: usize) -> Result<&str>;
    fn parse_usize_at(&self, index: usize, line: usize) -> Result<usize>;
    fn parse_float_at(&self, index: usize, line: usize) -> Result<f64>;
}

impl ArgsExt for [&str] {
    fn get_required(&self, index: usize, line: usize) -> Result<&str> {
        self.get(index)
            .copied()
            .ok_or(NequipError::MissingArgument { line })
    }

    fn parse_usize_at(&self, index: usize, line: usize) -> Result<usize> {
        let arg = self.get_required(index, line)?;
        arg.parse().map_err(|e| NequipError::IntParseError {
            string: arg.to_string(),
            source: e,
        })
    }

    fn parse_float_at(&self, index: usize, line: usize) -> Result<f64> {
        let arg = self.get_required(index, line)?;
        arg.parse().map_err(|e| NequipError::FloatParseError {
            string: arg.to_string(),
            source: e,
        })
    }
}
