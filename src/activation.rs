//! Activation functions.
//!
//! Every layer computes a pre-activation sum `z = a_prev · W` and then applies the
//! network's activation element-wise: `a = activation(z)`. The same activation is
//! used for hidden layers and for the output layer.
//!
//! Derivatives are expressed in terms of the pre-activation `z`, which the
//! forward trace keeps for backpropagation.

use ndarray::Array2;

/// Inputs to the logistic function are clamped to this range before `exp`.
pub const SIGMOID_CLIP: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Element-wise activation function.
pub enum Activation {
    /// Logistic sigmoid with clamped input.
    #[default]
    Sigmoid,
    Tanh,
}

impl Activation {
    /// Human-readable name, as printed by the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "Sigmoid",
            Activation::Tanh => "Tanh",
        }
    }

    #[inline]
    pub fn forward(self, z: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(z),
            Activation::Tanh => z.tanh(),
        }
    }

    /// Derivative with respect to the pre-activation input `z`.
    #[inline]
    pub fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Sigmoid => {
                let s = sigmoid(z);
                s * (1.0 - s)
            }
            Activation::Tanh => {
                let t = z.tanh();
                1.0 - t * t
            }
        }
    }

    /// Apply the activation to every element of `z`.
    pub fn apply(self, z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|v| self.forward(v))
    }

    /// Apply the derivative to every element of `z`.
    pub fn prime(self, z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|v| self.derivative(v))
    }
}

#[inline]
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z.clamp(-SIGMOID_CLIP, SIGMOID_CLIP)).exp())
}
