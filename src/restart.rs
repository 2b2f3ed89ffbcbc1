//! Random-restart training.
//!
//! BFGS only finds a local minimum. The driver trains the caller's network,
//! then a series of freshly initialized networks of the same shape, and keeps
//! whichever reached the lowest cost on the full training set.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::train::TrainConfig;
use crate::{Dataset, Error, Network, Result};

/// When the restart loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// Run every cycle of the budget, and keep going past it while the best
    /// cost is still NaN.
    #[default]
    FullBudget,
    /// Run at least one cycle, then stop as soon as the best cost is finite.
    FirstFinite,
}

impl StopPolicy {
    fn keep_going(self, done: usize, cycles: usize, best_cost: f64) -> bool {
        match self {
            StopPolicy::FullBudget => best_cost.is_nan() || done < cycles,
            StopPolicy::FirstFinite => done == 0 || (best_cost.is_nan() && done < cycles),
        }
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopPolicy::FullBudget => f.write_str("full-budget"),
            StopPolicy::FirstFinite => f.write_str("first-finite"),
        }
    }
}

impl FromStr for StopPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full-budget" => Ok(StopPolicy::FullBudget),
            "first-finite" => Ok(StopPolicy::FirstFinite),
            other => Err(Error::InvalidConfig(format!(
                "unknown stop policy {other:?}, expected full-budget or first-finite"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartConfig {
    /// Training cycles to run. Zero leaves the network untouched.
    pub cycles: usize,
    pub policy: StopPolicy,
    /// Extra cycles allowed past `cycles` while no finite cost has been seen.
    pub max_nan_cycles: usize,
    pub train: TrainConfig,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            cycles: 10,
            policy: StopPolicy::default(),
            max_nan_cycles: 100,
            train: TrainConfig::default(),
        }
    }
}

impl RestartConfig {
    pub fn validate(&self) -> Result<()> {
        self.train.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestartReport {
    /// Training cycles actually run.
    pub cycles: usize,
    pub best_cost: f64,
    /// How many cycles produced a new best network.
    pub improvements: usize,
}

/// `true` when `cost` should replace `best`. A NaN best loses to any finite cost.
fn is_better(cost: f64, best: f64) -> bool {
    if best.is_nan() {
        !cost.is_nan()
    } else {
        cost < best
    }
}

fn cost_on(network: &Network, data: &Dataset) -> Result<f64> {
    network
        .cost(data.inputs(), data.targets())
        .ok_or_else(|| Error::InvalidData("training data is not comparable with the network".to_owned()))
}

/// Train `network` with random restarts and leave the best weights in it.
///
/// The first cycle continues from the network's current weights; later cycles
/// start from fresh standard-normal weights drawn from `rng`.
pub fn train_with_restarts<R: Rng + ?Sized>(
    network: &mut Network,
    data: &Dataset,
    config: &RestartConfig,
    rng: &mut R,
) -> Result<RestartReport> {
    config.validate()?;
    network.check_data(data.inputs(), data.targets())?;

    let mut best = network.clone();
    let mut best_cost = cost_on(&best, data)?;
    if config.cycles == 0 {
        return Ok(RestartReport {
            cycles: 0,
            best_cost,
            improvements: 0,
        });
    }

    let limit = config.cycles.saturating_add(config.max_nan_cycles);
    let mut done = 0;
    let mut improvements = 0;

    while config.policy.keep_going(done, config.cycles, best_cost) {
        if done >= limit {
            break;
        }

        let mut candidate = if done == 0 {
            network.clone()
        } else {
            best.reinitialized(rng)
        };
        candidate.fit(data, config.train)?;
        let cost = cost_on(&candidate, data)?;
        done += 1;

        if cost.is_nan() {
            warn!(cycle = done, "training cycle produced a NaN cost");
        }
        if is_better(cost, best_cost) {
            info!(cycle = done, cost, "new best cost");
            best = candidate;
            best_cost = cost;
            improvements += 1;
        }
        debug!(cycle = done, best_cost, "training cycle finished");
    }

    if best_cost.is_nan() {
        return Err(Error::NoFiniteCost { cycles: done });
    }

    *network = best;
    Ok(RestartReport {
        cycles: done,
        best_cost,
        improvements,
    })
}

impl Network {
    /// Random-restart training with the thread-local RNG.
    pub fn fit_with_restarts(&mut self, data: &Dataset, config: &RestartConfig) -> Result<RestartReport> {
        train_with_restarts(self, data, config, &mut rand::thread_rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Activation;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn xor() -> Dataset {
        Dataset::new(
            array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
            array![[0.0], [1.0], [1.0], [0.0]],
        )
        .unwrap()
    }

    fn quick(cycles: usize, policy: StopPolicy) -> RestartConfig {
        RestartConfig {
            cycles,
            policy,
            max_nan_cycles: 3,
            train: TrainConfig { max_iter: 20 },
        }
    }

    #[test]
    fn zero_cycles_leaves_network_unchanged() {
        let data = xor();
        let mut net = Network::new_with_seed(&[2, 2, 1], Activation::Sigmoid, 0).unwrap();
        let before = net.clone();
        let mut rng = StdRng::seed_from_u64(0);

        let report =
            train_with_restarts(&mut net, &data, &quick(0, StopPolicy::FullBudget), &mut rng)
                .unwrap();

        assert_eq!(net, before);
        assert_eq!(report.cycles, 0);
        assert_eq!(report.improvements, 0);
        assert_eq!(Some(report.best_cost), before.cost(data.inputs(), data.targets()));
    }

    #[test]
    fn full_budget_runs_every_cycle_and_never_gets_worse() {
        let data = xor();
        let mut net = Network::new_with_seed(&[2, 2, 1], Activation::Sigmoid, 1).unwrap();
        let initial = net.cost(data.inputs(), data.targets()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let report =
            train_with_restarts(&mut net, &data, &quick(4, StopPolicy::FullBudget), &mut rng)
                .unwrap();

        assert_eq!(report.cycles, 4);
        assert!(report.improvements <= 4);
        assert!(report.best_cost <= initial);
        let final_cost = net.cost(data.inputs(), data.targets()).unwrap();
        assert!((final_cost - report.best_cost).abs() < 1e-12);
    }

    #[test]
    fn first_cycle_continues_from_current_weights() {
        let data = xor();
        let net = Network::new_with_seed(&[2, 3, 1], Activation::Tanh, 2).unwrap();
        let initial = net.cost(data.inputs(), data.targets()).unwrap();

        let mut trained = net.clone();
        trained.fit(&data, TrainConfig { max_iter: 20 }).unwrap();
        let trained_cost = trained.cost(data.inputs(), data.targets()).unwrap();
        assert!(trained_cost < initial);

        let mut driven = net.clone();
        let mut rng = StdRng::seed_from_u64(2);
        let report =
            train_with_restarts(&mut driven, &data, &quick(1, StopPolicy::FullBudget), &mut rng)
                .unwrap();

        assert_eq!(report.cycles, 1);
        assert_eq!(report.improvements, 1);
        assert_eq!(driven, trained);
    }

    #[test]
    fn first_finite_stops_after_one_cycle() {
        let data = xor();
        let mut net = Network::new_with_seed(&[2, 2, 1], Activation::Sigmoid, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let report =
            train_with_restarts(&mut net, &data, &quick(5, StopPolicy::FirstFinite), &mut rng)
                .unwrap();
        assert_eq!(report.cycles, 1);
    }

    #[test]
    fn nan_costs_are_bounded_and_reported() {
        let data = Dataset::new(array![[0.0, 1.0], [1.0, 0.0]], array![[f64::NAN], [1.0]]).unwrap();
        let mut net = Network::new_with_seed(&[2, 1], Activation::Sigmoid, 4).unwrap();
        let before = net.clone();
        let mut rng = StdRng::seed_from_u64(4);

        let err = train_with_restarts(&mut net, &data, &quick(2, StopPolicy::FullBudget), &mut rng)
            .unwrap_err();

        match err {
            Error::NoFiniteCost { cycles } => assert_eq!(cycles, 2 + 3),
            other => panic!("expected NoFiniteCost, got {other:?}"),
        }
        assert_eq!(net, before);
    }

    #[test]
    fn draws_fresh_weights_only_for_later_cycles() {
        let data = xor();
        let quick_net = || Network::new_with_seed(&[2, 2, 1], Activation::Sigmoid, 6).unwrap();

        let mut rng = StdRng::seed_from_u64(6);
        train_with_restarts(&mut quick_net(), &data, &quick(1, StopPolicy::FullBudget), &mut rng)
            .unwrap();
        assert_eq!(rng.gen::<u64>(), StdRng::seed_from_u64(6).gen::<u64>());

        let mut rng = StdRng::seed_from_u64(6);
        train_with_restarts(&mut quick_net(), &data, &quick(2, StopPolicy::FullBudget), &mut rng)
            .unwrap();
        let mut expected = StdRng::seed_from_u64(6);
        let _ = quick_net().reinitialized(&mut expected);
        assert_eq!(rng.gen::<u64>(), expected.gen::<u64>());
    }

    #[test]
    fn nan_best_loses_to_finite_cost() {
        assert!(is_better(1.0, f64::NAN));
        assert!(!is_better(f64::NAN, f64::NAN));
        assert!(!is_better(f64::NAN, 1.0));
        assert!(is_better(0.5, 1.0));
        assert!(!is_better(1.0, 1.0));
    }

    #[test]
    fn rejects_mismatched_data() {
        let data = xor();
        let mut net = Network::new_with_seed(&[2, 2], Activation::Sigmoid, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            train_with_restarts(&mut net, &data, &quick(1, StopPolicy::FullBudget), &mut rng),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn stop_policy_parses_and_displays() {
        for policy in [StopPolicy::FullBudget, StopPolicy::FirstFinite] {
            assert_eq!(policy.to_string().parse::<StopPolicy>().unwrap(), policy);
        }
        assert!("sometimes".parse::<StopPolicy>().is_err());
    }
}
