//! A feedforward neural network with hand-written backpropagation.
//!
//! `ffnn` implements a dense, bias-free multi-layer perceptron of arbitrary
//! depth and width. Forward propagation and backpropagation are written out by
//! hand over `ndarray` matrices, and the weights can be viewed as one flat
//! parameter vector so a generic quasi-Newton optimizer can train them.
//!
//! # Design goals
//!
//! - Readable core: one weight matrix per layer pair, one activation for every
//!   layer, one cost function per network.
//! - Explicit data flow: a forward pass returns a [`ForwardTrace`] that the
//!   caller hands to [`Network::gradients`]. No hidden per-call state.
//! - Clear contracts: shapes are validated at the API boundary and reported
//!   through [`Error`].
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - Samples are rows: inputs are `(n, input_dim)`, outputs `(n, output_dim)`.
//! - Weight matrix `i` has shape `(sizes[i], sizes[i + 1])`.
//! - [`Network::params`] concatenates every matrix in row-major order, layer 0 first.
//!
//! # Quick start
//!
//! ```rust
//! use ffnn::{Activation, Dataset, NetworkBuilder, RestartConfig, TrainConfig};
//! use ndarray::array;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn main() -> ffnn::Result<()> {
//! let data = Dataset::new(
//!     array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
//!     array![[0.0], [1.0], [1.0], [0.0]],
//! )?;
//!
//! let mut net = NetworkBuilder::from_dims(2, &[2], 1)?
//!     .activation(Activation::Sigmoid)
//!     .build_with_seed(0)?;
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let config = RestartConfig {
//!     cycles: 3,
//!     train: TrainConfig { max_iter: 50 },
//!     ..RestartConfig::default()
//! };
//! let report = ffnn::train_with_restarts(&mut net, &data, &config, &mut rng)?;
//!
//! let out = net.forward(data.inputs())?;
//! assert_eq!(out.dim(), (4, 1));
//! assert!(report.best_cost.is_finite());
//! # Ok(())
//! # }
//! ```
//!
//! # Manual training step
//!
//! ```rust
//! use ffnn::{Activation, Network};
//! use ndarray::array;
//!
//! # fn main() -> ffnn::Result<()> {
//! let mut net = Network::new_with_seed(&[3, 4, 2], Activation::Tanh, 0)?;
//! let x = array![[0.1, -0.2, 0.3]];
//! let y = array![[0.0, 1.0]];
//!
//! let trace = net.forward_trace(&x)?;
//! let grads = net.gradients(&trace, &y)?;
//! let step = net.params() - grads.flatten() * 0.1;
//! net.set_params(step.view())?;
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod data;
pub mod dump;
pub mod error;
pub mod layer;
pub mod loss;
pub mod network;
pub mod optim;
pub mod restart;
pub mod train;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::Activation;
pub use builder::NetworkBuilder;
pub use data::Dataset;
pub use dump::{default_file_name, read_dump, write_dump, WeightDump};
pub use error::{Error, Result};
pub use layer::Layer;
pub use loss::Loss;
pub use network::{ForwardTrace, Gradients, LayerTrace, Network};
pub use optim::{Bfgs, Minimizer, Minimum, Objective};
pub use restart::{train_with_restarts, RestartConfig, RestartReport, StopPolicy};
pub use train::{TrainConfig, TrainReport, Trainer};
