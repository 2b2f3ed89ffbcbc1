use ndarray::{s, Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Layer, Loss, Result};

/// A fully connected feedforward network without biases.
///
/// Layer `i` holds a `(sizes[i], sizes[i + 1])` weight matrix. Every layer,
/// including the output layer, is squashed through the same [`Activation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    sizes: Vec<usize>,
    layers: Vec<Layer>,
    activation: Activation,
    loss: Loss,
}

/// Values recorded for one layer during a forward pass.
#[derive(Debug, Clone)]
pub struct LayerTrace {
    input: Array2<f64>,
    pre_activation: Array2<f64>,
}

impl LayerTrace {
    /// The activations fed into this layer (`X` for the first layer).
    #[inline]
    pub fn input(&self) -> &Array2<f64> {
        &self.input
    }

    /// `input · W` for this layer.
    #[inline]
    pub fn pre_activation(&self) -> &Array2<f64> {
        &self.pre_activation
    }
}

/// Everything backpropagation needs from one forward pass.
///
/// Returned by [`Network::forward_trace`] and passed explicitly to
/// [`Network::gradients`], so independent forward/backward pairs never share state.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    layers: Vec<LayerTrace>,
    output: Array2<f64>,
}

impl ForwardTrace {
    /// Final activation, shape `(n, output_dim)`.
    #[inline]
    pub fn output(&self) -> &Array2<f64> {
        &self.output
    }

    #[inline]
    pub fn into_output(self) -> Array2<f64> {
        self.output
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.output.nrows()
    }

    #[inline]
    pub fn layers(&self) -> &[LayerTrace] {
        &self.layers
    }
}

/// Weight gradients in input-to-output layer order.
#[derive(Debug, Clone)]
pub struct Gradients {
    d_weights: Vec<Array2<f64>>,
}

impl Gradients {
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.d_weights.len()
    }

    #[inline]
    pub fn d_weights(&self, layer_idx: usize) -> &Array2<f64> {
        &self.d_weights[layer_idx]
    }

    /// Concatenate all weight gradients in parameter-vector order.
    pub fn flatten(&self) -> Array1<f64> {
        let total = self.d_weights.iter().map(|d| d.len()).sum();
        let mut flat = Vec::with_capacity(total);
        for d in &self.d_weights {
            flat.extend(d.iter().copied());
        }
        Array1::from(flat)
    }
}

fn validate_sizes(sizes: &[usize]) -> Result<()> {
    if sizes.len() < 2 {
        return Err(Error::InvalidConfig(
            "sizes must include input and output dims".to_owned(),
        ));
    }
    if sizes.contains(&0) {
        return Err(Error::InvalidConfig(
            "all layer sizes must be > 0".to_owned(),
        ));
    }
    Ok(())
}

impl Network {
    /// Random standard-normal weights from the thread-local RNG.
    pub fn new(sizes: &[usize], activation: Activation) -> Result<Self> {
        Self::new_with_rng(sizes, activation, &mut rand::thread_rng())
    }

    pub fn new_with_seed(sizes: &[usize], activation: Activation, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(sizes, activation, &mut rng)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        sizes: &[usize],
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        validate_sizes(sizes)?;

        let layers = sizes
            .windows(2)
            .map(|w| Layer::new_with_rng(w[0], w[1], &mut *rng))
            .collect();
        Ok(Self {
            sizes: sizes.to_vec(),
            layers,
            activation,
            loss: Loss::for_output_width(sizes[sizes.len() - 1]),
        })
    }

    /// Build a network from explicit layers.
    ///
    /// Each layer's `in_dim` must equal the previous layer's `out_dim`.
    pub fn from_layers(layers: Vec<Layer>, activation: Activation) -> Result<Self> {
        let first = layers.first().ok_or_else(|| {
            Error::InvalidConfig("network must have at least one layer".to_owned())
        })?;

        let mut sizes = Vec::with_capacity(layers.len() + 1);
        sizes.push(first.in_dim());
        for (i, layer) in layers.iter().enumerate() {
            let prev_out = sizes[sizes.len() - 1];
            if layer.in_dim() != prev_out {
                return Err(Error::InvalidConfig(format!(
                    "layer {i} in_dim {} does not match previous out_dim {prev_out}",
                    layer.in_dim()
                )));
            }
            sizes.push(layer.out_dim());
        }

        let loss = Loss::for_output_width(sizes[sizes.len() - 1]);
        Ok(Self {
            sizes,
            layers,
            activation,
            loss,
        })
    }

    /// Build a network from explicit weight matrices, layer 0 first.
    pub fn from_weights(weights: Vec<Array2<f64>>, activation: Activation) -> Result<Self> {
        let layers = weights
            .into_iter()
            .map(Layer::from_weights)
            .collect::<Result<Vec<_>>>()?;
        Self::from_layers(layers, activation)
    }

    /// Override the cost function chosen from the output width.
    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    /// A network of the same topology, activation and loss with fresh random weights.
    pub fn reinitialized<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let layers = self
            .sizes
            .windows(2)
            .map(|w| Layer::new_with_rng(w[0], w[1], &mut *rng))
            .collect();
        Self {
            sizes: self.sizes.clone(),
            layers,
            activation: self.activation,
            loss: self.loss,
        }
    }

    #[inline]
    pub fn layer_sizes(&self) -> &[usize] {
        &self.sizes
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.sizes[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Total number of weights, i.e. the length of [`Network::params`].
    #[inline]
    pub fn num_params(&self) -> usize {
        self.layers.iter().map(Layer::num_params).sum()
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn loss(&self) -> Loss {
        self.loss
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn weights(&self, idx: usize) -> Option<&Array2<f64>> {
        self.layers.get(idx).map(Layer::weights)
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.input_dim() {
            return Err(Error::InvalidShape(format!(
                "input has {} columns, network input_dim is {}",
                x.ncols(),
                self.input_dim()
            )));
        }
        Ok(())
    }

    /// Validate an `(X, Y)` pair against this network.
    pub fn check_data(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<()> {
        if x.nrows() != y.nrows() {
            return Err(Error::InvalidData(format!(
                "inputs/targets row mismatch: {} vs {}",
                x.nrows(),
                y.nrows()
            )));
        }
        if x.ncols() != self.input_dim() {
            return Err(Error::InvalidData(format!(
                "inputs have {} columns, network input_dim is {}",
                x.ncols(),
                self.input_dim()
            )));
        }
        if y.ncols() != self.output_dim() {
            return Err(Error::InvalidData(format!(
                "targets have {} columns, network output_dim is {}",
                y.ncols(),
                self.output_dim()
            )));
        }
        Ok(())
    }

    /// Forward pass over a batch, keeping every layer's input and pre-activation.
    pub fn forward_trace(&self, x: &Array2<f64>) -> Result<ForwardTrace> {
        self.check_input(x)?;

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut input = x.to_owned();
        for layer in &self.layers {
            let pre_activation = layer.forward(input.view());
            let output = self.activation.apply(&pre_activation);
            layers.push(LayerTrace {
                input,
                pre_activation,
            });
            input = output;
        }

        Ok(ForwardTrace {
            layers,
            output: input,
        })
    }

    /// Network output for a batch, shape `(x.nrows(), output_dim)`.
    pub fn forward(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.forward_trace(x).map(ForwardTrace::into_output)
    }

    /// Cost of the network on `(x, y)`.
    ///
    /// Returns `None` when the two tables are not comparable: different row
    /// counts, or widths that do not match the network.
    pub fn cost(&self, x: &Array2<f64>, y: &Array2<f64>) -> Option<f64> {
        self.check_data(x, y).ok()?;
        let output = self.forward(x).ok()?;
        Some(self.loss.forward(&output, y))
    }

    /// Backpropagate the cost for `y` through a recorded forward pass.
    pub fn gradients(&self, trace: &ForwardTrace, y: &Array2<f64>) -> Result<Gradients> {
        if trace.layers.len() != self.layers.len() {
            return Err(Error::InvalidShape(format!(
                "trace has {} layers, network has {}",
                trace.layers.len(),
                self.layers.len()
            )));
        }
        if y.dim() != trace.output.dim() {
            return Err(Error::InvalidShape(format!(
                "targets shape {:?} does not match output shape {:?}",
                y.dim(),
                trace.output.dim()
            )));
        }

        // dC/da for the layer currently being visited, starting at the output.
        let mut upstream = self.loss.derivative(&trace.output, y);
        let mut d_weights = Vec::with_capacity(self.layers.len());

        for (idx, (layer, record)) in self.layers.iter().zip(&trace.layers).enumerate().rev() {
            let delta = &upstream * &self.activation.prime(&record.pre_activation);
            d_weights.push(layer.weight_gradient(record.input.view(), &delta));
            // Nothing consumes dC/dX, so the input layer stops here.
            if idx > 0 {
                upstream = layer.propagate(&delta);
            }
        }
        d_weights.reverse();

        Ok(Gradients { d_weights })
    }

    /// Flat gradient of the cost, in parameter-vector order.
    pub fn compute_gradients(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<Array1<f64>> {
        self.cost_and_gradient(x, y).map(|(_, grad)| grad)
    }

    /// Cost and flat gradient from a single forward pass.
    pub fn cost_and_gradient(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<(f64, Array1<f64>)> {
        self.check_data(x, y)?;
        let trace = self.forward_trace(x)?;
        let cost = self.loss.forward(trace.output(), y);
        let grads = self.gradients(&trace, y)?;
        Ok((cost, grads.flatten()))
    }

    /// All weights flattened row-major, layer 0 first.
    pub fn params(&self) -> Array1<f64> {
        let mut params = Vec::with_capacity(self.num_params());
        for layer in &self.layers {
            params.extend(layer.weights().iter().copied());
        }
        Array1::from(params)
    }

    /// Overwrite all weights from a flat vector laid out like [`Network::params`].
    ///
    /// The length is checked before any weight is written.
    pub fn set_params(&mut self, params: ArrayView1<'_, f64>) -> Result<()> {
        let expected = self.num_params();
        if params.len() != expected {
            return Err(Error::ParamShape {
                expected,
                actual: params.len(),
            });
        }

        let mut offset = 0;
        for layer in &mut self.layers {
            let end = offset + layer.num_params();
            layer.assign_flat(params.slice(s![offset..end]));
            offset = end;
        }
        Ok(())
    }
}
