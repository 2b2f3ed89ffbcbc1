//! Model serialization/deserialization (feature: `serde`).
//!
//! A versioned JSON format for [`Network`]. Internal structs are not
//! serialized directly; loading validates the topology, the weight count and
//! that every weight is finite before a network is built.

use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Loss, Network, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNetwork {
    pub format_version: u32,
    pub layer_sizes: Vec<usize>,
    pub activation: SerializedActivation,
    pub loss: SerializedLoss,
    /// Flat weights in [`Network::params`] order.
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializedActivation {
    Sigmoid,
    Tanh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializedLoss {
    SumOfSquares,
    CrossEntropy,
}

impl From<Activation> for SerializedActivation {
    fn from(value: Activation) -> Self {
        match value {
            Activation::Sigmoid => SerializedActivation::Sigmoid,
            Activation::Tanh => SerializedActivation::Tanh,
        }
    }
}

impl From<SerializedActivation> for Activation {
    fn from(value: SerializedActivation) -> Self {
        match value {
            SerializedActivation::Sigmoid => Activation::Sigmoid,
            SerializedActivation::Tanh => Activation::Tanh,
        }
    }
}

impl From<Loss> for SerializedLoss {
    fn from(value: Loss) -> Self {
        match value {
            Loss::SumOfSquares => SerializedLoss::SumOfSquares,
            Loss::CrossEntropy => SerializedLoss::CrossEntropy,
        }
    }
}

impl From<SerializedLoss> for Loss {
    fn from(value: SerializedLoss) -> Self {
        match value {
            SerializedLoss::SumOfSquares => Loss::SumOfSquares,
            SerializedLoss::CrossEntropy => Loss::CrossEntropy,
        }
    }
}

impl SerializedNetwork {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported model format_version {}; expected {}",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        if self.layer_sizes.len() < 2 || self.layer_sizes.contains(&0) {
            return Err(Error::InvalidData(format!(
                "layer_sizes must hold at least two non-zero entries, got {:?}",
                self.layer_sizes
            )));
        }

        let mut expected = 0usize;
        for w in self.layer_sizes.windows(2) {
            let n = w[0]
                .checked_mul(w[1])
                .ok_or_else(|| Error::InvalidData("layer weight shape overflow".to_owned()))?;
            expected = expected
                .checked_add(n)
                .ok_or_else(|| Error::InvalidData("weight count overflow".to_owned()))?;
        }
        if self.weights.len() != expected {
            return Err(Error::ParamShape {
                expected,
                actual: self.weights.len(),
            });
        }
        if self.weights.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "weights must contain only finite values".to_owned(),
            ));
        }
        Ok(())
    }
}

impl From<&Network> for SerializedNetwork {
    fn from(network: &Network) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            layer_sizes: network.layer_sizes().to_vec(),
            activation: network.activation().into(),
            loss: network.loss().into(),
            weights: network.params().to_vec(),
        }
    }
}

impl TryFrom<SerializedNetwork> for Network {
    type Error = Error;

    fn try_from(value: SerializedNetwork) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let mut network = Network::new_with_rng(
            &value.layer_sizes,
            value.activation.into(),
            &mut rand::thread_rng(),
        )?
        .with_loss(value.loss.into());
        network.set_params(Array1::from(value.weights).view())?;
        Ok(network)
    }
}

impl Network {
    /// Serialize the model to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&SerializedNetwork::from(self))?)
    }

    /// Serialize the model to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&SerializedNetwork::from(self))?)
    }

    /// Parse a model from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedNetwork = serde_json::from_str(s)?;
        ser.try_into()
    }

    /// Save the model to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        std::fs::write(path.as_ref(), s)?;
        Ok(())
    }

    /// Load a model from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&s)
    }
}
