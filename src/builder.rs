//! Network builder.
//!
//! `NetworkBuilder` spells out a topology one layer at a time instead of as a
//! raw sizes slice. Every layer shares one activation; the cost function
//! defaults from the output width unless set explicitly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Loss, Network, Result};

#[derive(Debug, Clone)]
/// Builder for a [`Network`].
///
/// Example:
///
/// ```rust
/// use ffnn::{Activation, NetworkBuilder};
///
/// # fn main() -> ffnn::Result<()> {
/// let net = NetworkBuilder::new(2)?
///     .hidden(3)?
///     .output(1)?
///     .activation(Activation::Tanh)
///     .build_with_seed(0)?;
/// assert_eq!(net.layer_sizes(), &[2, 3, 1]);
/// # Ok(())
/// # }
/// ```
pub struct NetworkBuilder {
    sizes: Vec<usize>,
    output_set: bool,
    activation: Activation,
    loss: Option<Loss>,
}

impl NetworkBuilder {
    /// Start building a network that accepts rows of `input_dim` values.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            sizes: vec![input_dim],
            output_set: false,
            activation: Activation::default(),
            loss: None,
        })
    }

    /// Input width, hidden widths and output width in one call.
    pub fn from_dims(input_dim: usize, hidden: &[usize], output_dim: usize) -> Result<Self> {
        let mut b = Self::new(input_dim)?;
        for &width in hidden {
            b = b.hidden(width)?;
        }
        b.output(output_dim)
    }

    /// Append a hidden layer of `width` units.
    pub fn hidden(mut self, width: usize) -> Result<Self> {
        if self.output_set {
            return Err(Error::InvalidConfig(
                "hidden layers must be added before the output layer".to_owned(),
            ));
        }
        if width == 0 {
            return Err(Error::InvalidConfig("hidden width must be > 0".to_owned()));
        }
        self.sizes.push(width);
        Ok(self)
    }

    /// Set the output width. Must be called exactly once.
    pub fn output(mut self, width: usize) -> Result<Self> {
        if self.output_set {
            return Err(Error::InvalidConfig("output layer already set".to_owned()));
        }
        if width == 0 {
            return Err(Error::InvalidConfig("output width must be > 0".to_owned()));
        }
        self.sizes.push(width);
        self.output_set = true;
        Ok(self)
    }

    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Use `loss` instead of the width-based default.
    pub fn loss(mut self, loss: Loss) -> Self {
        self.loss = Some(loss);
        self
    }

    /// Layer sizes collected so far, input first.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Build with weights from the thread-local RNG.
    pub fn build(self) -> Result<Network> {
        self.build_with_rng(&mut rand::thread_rng())
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        if !self.output_set {
            return Err(Error::InvalidConfig(
                "network needs an output layer".to_owned(),
            ));
        }

        let network = Network::new_with_rng(&self.sizes, self.activation, rng)?;
        Ok(match self.loss {
            Some(loss) => network.with_loss(loss),
            None => network,
        })
    }
}
