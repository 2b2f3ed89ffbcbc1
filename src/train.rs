use ndarray::{Array1, ArrayView1};
use tracing::{debug, warn};

use crate::optim::{Bfgs, Minimizer, Objective};
use crate::{Dataset, Error, Network, Result};

/// Maximum optimizer iterations for one training run.
pub const DEFAULT_MAX_ITER: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainConfig {
    pub max_iter: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(Error::InvalidConfig("max_iter must be > 0".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Cost at the point the network was left at.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Exposes a network's cost and gradient as a function of its flat parameters.
///
/// Every evaluation writes the point into the network first, and every accepted
/// iterate is written back, so the network tracks the optimizer even when a run
/// stops at the iteration cap.
struct NetworkObjective<'a> {
    network: &'a mut Network,
    data: &'a Dataset,
}

impl Objective for NetworkObjective<'_> {
    fn cost_gradient(&mut self, point: ArrayView1<'_, f64>) -> Result<(f64, Array1<f64>)> {
        self.network.set_params(point)?;
        self.network
            .cost_and_gradient(self.data.inputs(), self.data.targets())
    }

    fn iteration(&mut self, point: ArrayView1<'_, f64>) {
        if let Err(err) = self.network.set_params(point) {
            warn!(%err, "optimizer iterate does not fit the network");
        }
    }
}

/// Drives one optimization run over a network.
pub struct Trainer<'a, M = Bfgs> {
    objective: NetworkObjective<'a>,
    minimizer: M,
    config: TrainConfig,
}

impl<'a> Trainer<'a, Bfgs> {
    /// Trainer using BFGS with default settings.
    pub fn new(network: &'a mut Network, data: &'a Dataset) -> Result<Self> {
        Self::with_minimizer(network, data, Bfgs::default())
    }
}

impl<'a, M: Minimizer> Trainer<'a, M> {
    pub fn with_minimizer(network: &'a mut Network, data: &'a Dataset, minimizer: M) -> Result<Self> {
        network.check_data(data.inputs(), data.targets())?;
        Ok(Self {
            objective: NetworkObjective { network, data },
            minimizer,
            config: TrainConfig::default(),
        })
    }

    pub fn config(mut self, config: TrainConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the minimizer once and leave the network at its final point.
    pub fn train(mut self) -> Result<TrainReport> {
        self.config.validate()?;

        let start = self.objective.network.params();
        let min = self
            .minimizer
            .minimize(&mut self.objective, start, self.config.max_iter)?;

        // Line-search trials may have left a rejected point in the network.
        self.objective.network.set_params(min.point.view())?;
        debug!(
            cost = min.cost,
            iterations = min.iterations,
            converged = min.converged,
            "training run finished"
        );

        Ok(TrainReport {
            cost: min.cost,
            iterations: min.iterations,
            converged: min.converged,
        })
    }
}

impl Network {
    /// Train this network on `data` with BFGS.
    pub fn fit(&mut self, data: &Dataset, config: TrainConfig) -> Result<TrainReport> {
        Trainer::new(self, data)?.config(config).train()
    }
}
