//! Plain-text weight dumps.
//!
//! A dump is two lines:
//!
//! ```text
//! 2 2 1
//! 0.5 -1.25 0.75 2 -0.5 1
//! ```
//!
//! The first line holds the layer sizes, the second the flat parameter vector
//! in [`Network::params`] order. Values are written with Rust's shortest
//! round-trip `f64` formatting, so reading a dump back reproduces the weights
//! bit for bit.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array1;

use crate::{Activation, Error, Network, Result};

/// Layer sizes and flat weights read from a dump.
///
/// `params.len()` always equals the weight count implied by `layer_sizes`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightDump {
    pub layer_sizes: Vec<usize>,
    pub params: Array1<f64>,
}

impl WeightDump {
    pub fn from_network(network: &Network) -> Self {
        Self {
            layer_sizes: network.layer_sizes().to_vec(),
            params: network.params(),
        }
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }

    /// Reject a dump whose outer widths do not match the training data.
    pub fn check_dims(&self, input_dim: usize, output_dim: usize) -> Result<()> {
        if self.input_dim() != input_dim || self.output_dim() != output_dim {
            return Err(Error::InvalidData(format!(
                "dump layers {} do not fit data with {input_dim} inputs and {output_dim} outputs",
                join_sizes(&self.layer_sizes)
            )));
        }
        Ok(())
    }

    /// Build a network with these sizes and weights.
    pub fn into_network(self, activation: Activation) -> Result<Network> {
        // Any RNG works here: every weight is overwritten below.
        let mut rng = rand::thread_rng();
        let mut network = Network::new_with_rng(&self.layer_sizes, activation, &mut rng)?;
        network.set_params(self.params.view())?;
        Ok(network)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", join_sizes(&self.layer_sizes))?;
        let mut first = true;
        for v in self.params.iter() {
            if !first {
                writer.write_all(b" ")?;
            }
            write!(writer, "{v}")?;
            first = false;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_to(BufWriter::new(file))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        read_dump(BufReader::new(file))
    }
}

/// Parse a dump. Nothing is constructed until both lines have been validated.
pub fn read_dump<R: BufRead>(reader: R) -> Result<WeightDump> {
    let mut lines = reader.lines();

    let sizes_line = lines.next().transpose()?.ok_or_else(|| Error::Parse {
        line: 1,
        message: "missing layer sizes".to_owned(),
    })?;
    let layer_sizes = sizes_line
        .split_whitespace()
        .map(|token| {
            token.parse::<usize>().map_err(|_| Error::Parse {
                line: 1,
                message: format!("invalid layer size {token:?}"),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if layer_sizes.len() < 2 || layer_sizes.contains(&0) {
        return Err(Error::Parse {
            line: 1,
            message: format!(
                "need at least two non-zero layer sizes, got {:?}",
                sizes_line.trim()
            ),
        });
    }

    let params_line = lines.next().transpose()?.ok_or_else(|| Error::Parse {
        line: 2,
        message: "missing weights".to_owned(),
    })?;
    let params = params_line
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| Error::Parse {
                line: 2,
                message: format!("invalid weight {token:?}"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let expected = weight_count(&layer_sizes).ok_or_else(|| Error::Parse {
        line: 1,
        message: format!("layer sizes {:?} overflow the weight count", sizes_line.trim()),
    })?;
    if params.len() != expected {
        return Err(Error::ParamShape {
            expected,
            actual: params.len(),
        });
    }

    Ok(WeightDump {
        layer_sizes,
        params: Array1::from(params),
    })
}

/// Write `network` as a dump.
pub fn write_dump<W: Write>(writer: W, network: &Network) -> Result<()> {
    WeightDump::from_network(network).write_to(writer)
}

/// `Weights-` followed by the space-separated layer sizes, e.g. `Weights-2 2 1`.
pub fn default_file_name(layer_sizes: &[usize]) -> String {
    format!("Weights-{}", join_sizes(layer_sizes))
}

fn weight_count(sizes: &[usize]) -> Option<usize> {
    sizes
        .windows(2)
        .try_fold(0usize, |acc, w| acc.checked_add(w[0].checked_mul(w[1])?))
}

fn join_sizes(sizes: &[usize]) -> String {
    sizes
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Network {
    /// Save the weights as a dump.
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        WeightDump::from_network(self).save(path)
    }

    /// Load a network from a dump.
    pub fn load_weights<P: AsRef<Path>>(path: P, activation: Activation) -> Result<Self> {
        WeightDump::load(path)?.into_network(activation)
    }
}
