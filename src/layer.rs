use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{Error, Result};

/// One weight matrix between two consecutive layers of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Shape `(in_dim, out_dim)`, row-major.
    weights: Array2<f64>,
}

impl Layer {
    /// Draw every weight independently from the standard normal distribution.
    pub fn new_with_rng<R: Rng + ?Sized>(in_dim: usize, out_dim: usize, rng: &mut R) -> Self {
        let weights: Array2<f64> =
            Array2::from_shape_fn((in_dim, out_dim), |_| rng.sample(StandardNormal));
        Self { weights }
    }

    /// Build a layer from an explicit `(in_dim, out_dim)` matrix.
    pub fn from_weights(weights: Array2<f64>) -> Result<Self> {
        if weights.nrows() == 0 || weights.ncols() == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got {:?}",
                weights.dim()
            )));
        }
        Ok(Self { weights })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.weights.nrows()
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.weights.ncols()
    }

    #[inline]
    pub fn num_params(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Pre-activation sums for a batch: `inputs · W`.
    ///
    /// Shape contract: `inputs.ncols() == self.in_dim()`.
    #[inline]
    pub fn forward(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
        debug_assert_eq!(inputs.ncols(), self.in_dim());
        inputs.dot(&self.weights)
    }

    /// Weight gradient for this layer: `inputsᵀ · delta`.
    ///
    /// `delta` is `dC/dz` for this layer's pre-activation, shape `(n, out_dim)`.
    #[inline]
    pub fn weight_gradient(&self, inputs: ArrayView2<'_, f64>, delta: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(inputs.ncols(), self.in_dim());
        debug_assert_eq!(delta.ncols(), self.out_dim());
        inputs.t().dot(delta)
    }

    /// Push `delta` back through the weights: `delta · Wᵀ`, shape `(n, in_dim)`.
    #[inline]
    pub fn propagate(&self, delta: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(delta.ncols(), self.out_dim());
        delta.dot(&self.weights.t())
    }

    /// Overwrite the weights from a row-major slice of exactly `num_params()` values.
    pub(crate) fn assign_flat(&mut self, values: ArrayView1<'_, f64>) {
        debug_assert_eq!(values.len(), self.num_params());
        for (w, &v) in self.weights.iter_mut().zip(values.iter()) {
            *w = v;
        }
    }
}
