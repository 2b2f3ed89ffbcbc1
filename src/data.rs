//! Tabular data.
//!
//! Training files are plain text: one sample per line, values separated by
//! whitespace. `Dataset` pairs an input table (X) with a target table (Y) and
//! validates that they describe the same samples.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use crate::{Error, Result};

/// Parse a whitespace-delimited numeric table.
///
/// Blank lines are skipped. Every other line must have the same number of values.
pub fn read_table<R: BufRead>(reader: R) -> Result<Array2<f64>> {
    let mut values = Vec::new();
    let mut cols: Option<usize> = None;
    let mut rows = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let before = values.len();
        for token in line.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| Error::Parse {
                line: line_no,
                message: format!("invalid number {token:?}"),
            })?;
            values.push(v);
        }

        let width = values.len() - before;
        match cols {
            None => cols = Some(width),
            Some(expected) if expected != width => {
                return Err(Error::Parse {
                    line: line_no,
                    message: format!("row has {width} values, expected {expected}"),
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let cols = cols.ok_or_else(|| Error::InvalidData("table has no rows".to_owned()))?;
    Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| Error::InvalidShape(format!("table shape: {e}")))
}

/// Parse a table from an in-memory string.
pub fn parse_table(text: &str) -> Result<Array2<f64>> {
    read_table(text.as_bytes())
}

/// Read a table from a file.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let file = File::open(path.as_ref())?;
    read_table(BufReader::new(file))
}

/// A supervised dataset: inputs (X) and targets (Y), one sample per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Array2<f64>,
    targets: Array2<f64>,
}

impl Dataset {
    /// Pair two tables, checking that they have the same, non-zero row count.
    pub fn new(inputs: Array2<f64>, targets: Array2<f64>) -> Result<Self> {
        if inputs.nrows() != targets.nrows() {
            return Err(Error::InvalidData(format!(
                "need equal numbers of inputs and outputs: {} vs {}",
                inputs.nrows(),
                targets.nrows()
            )));
        }
        if inputs.nrows() == 0 {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }
        if inputs.ncols() == 0 || targets.ncols() == 0 {
            return Err(Error::InvalidData(
                "inputs and targets must have at least one column".to_owned(),
            ));
        }
        Ok(Self { inputs, targets })
    }

    /// Build a dataset from per-sample rows.
    pub fn from_rows(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<Self> {
        Self::new(rows_to_table(inputs, "input")?, rows_to_table(targets, "target")?)
    }

    /// Load X and Y from two whitespace-delimited files.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(inputs: P, targets: Q) -> Result<Self> {
        Self::new(load_table(inputs)?, load_table(targets)?)
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.inputs.ncols()
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.targets.ncols()
    }

    #[inline]
    pub fn inputs(&self) -> &Array2<f64> {
        &self.inputs
    }

    #[inline]
    pub fn targets(&self) -> &Array2<f64> {
        &self.targets
    }
}

fn rows_to_table(rows: &[Vec<f64>], what: &str) -> Result<Array2<f64>> {
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != cols {
            return Err(Error::InvalidData(format!(
                "{what} row {i} has len {}, expected {cols}",
                row.len()
            )));
        }
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), cols), flat)
        .map_err(|e| Error::InvalidShape(format!("{what} table shape: {e}")))
}
