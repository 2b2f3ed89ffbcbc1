//! Optimizers.
//!
//! Training treats the network as a function of one flat parameter vector. This
//! module defines that boundary and backs it with `argmin`:
//!
//! - [`Objective`]: returns cost and gradient at a point and observes each iterate.
//! - [`Minimizer`]: drives an objective from a starting point to a local minimum
//!   or an iteration cap.
//! - [`Bfgs`]: `argmin`'s BFGS with a More-Thuente line search.

use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use argmin::core::observers::{Observe, ObserverMode};
use argmin::core::{
    CostFunction, Executor, Gradient, IterState, State, TerminationReason, TerminationStatus, KV,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::BFGS;
use ndarray::{Array1, Array2, ArrayView1};
use tracing::debug;

use crate::{Error, Result};

/// A differentiable scalar function of a flat parameter vector.
pub trait Objective {
    /// Cost and gradient at `point`. The gradient has the same length as `point`.
    fn cost_gradient(&mut self, point: ArrayView1<'_, f64>) -> Result<(f64, Array1<f64>)>;

    /// Called once per accepted iteration, in order, with that iteration's point.
    fn iteration(&mut self, _point: ArrayView1<'_, f64>) {}
}

/// Result of one minimization run.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Array1<f64>,
    pub cost: f64,
    pub iterations: usize,
    /// True when the solver reported convergence before the cap.
    pub converged: bool,
}

/// An unconstrained minimizer.
pub trait Minimizer {
    fn minimize(
        &self,
        objective: &mut dyn Objective,
        start: Array1<f64>,
        max_iter: usize,
    ) -> Result<Minimum>;
}

/// BFGS quasi-Newton minimizer backed by `argmin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bfgs {
    /// Stop once the gradient's L2 norm falls below this value.
    pub gtol: f64,
    /// Sufficient-decrease constant of the line search.
    pub c1: f64,
    /// Curvature constant of the line search.
    pub c2: f64,
}

impl Default for Bfgs {
    fn default() -> Self {
        Self {
            gtol: 1e-5,
            c1: 1e-4,
            c2: 0.9,
        }
    }
}

impl Bfgs {
    /// Validate hyperparameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.gtol.is_finite() && self.gtol > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "bfgs gtol must be finite and > 0, got {}",
                self.gtol
            )));
        }
        if !(self.c1 > 0.0 && self.c1 < self.c2 && self.c2 < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "bfgs line search needs 0 < c1 < c2 < 1, got c1={} c2={}",
                self.c1, self.c2
            )));
        }
        Ok(())
    }
}

type Param = Array1<f64>;
type BfgsState = IterState<Param, Param, (), Array2<f64>, (), f64>;

/// One cached evaluation. The solver asks for cost and gradient separately.
struct Evaluation {
    point: Param,
    cost: f64,
    grad: Param,
}

/// Exposes an [`Objective`] through `argmin`'s problem traits.
struct Problem<'a, O: Objective + ?Sized> {
    objective: RefCell<&'a mut O>,
    dim: usize,
    last: RefCell<Option<Evaluation>>,
}

impl<O: Objective + ?Sized> Problem<'_, O> {
    fn evaluate(&self, point: &Param) -> Result<(f64, Param)> {
        if let Some(hit) = self.last.borrow().as_ref() {
            if hit.point == *point {
                return Ok((hit.cost, hit.grad.clone()));
            }
        }

        let (cost, grad) = self.objective.borrow_mut().cost_gradient(point.view())?;
        check_gradient_len(self.dim, &grad)?;
        *self.last.borrow_mut() = Some(Evaluation {
            point: point.clone(),
            cost,
            grad: grad.clone(),
        });
        Ok((cost, grad))
    }
}

impl<O: Objective + ?Sized> CostFunction for Problem<'_, O> {
    type Param = Param;
    type Output = f64;

    fn cost(&self, param: &Param) -> std::result::Result<f64, argmin::core::Error> {
        Ok(self.evaluate(param)?.0)
    }
}

impl<O: Objective + ?Sized> Gradient for Problem<'_, O> {
    type Param = Param;
    type Gradient = Param;

    fn gradient(&self, param: &Param) -> std::result::Result<Param, argmin::core::Error> {
        Ok(self.evaluate(param)?.1)
    }
}

/// Records every accepted iterate and its cost.
#[derive(Clone, Default)]
struct IterateLog {
    iterates: Arc<Mutex<Vec<(Param, f64)>>>,
}

impl IterateLog {
    fn take(&self) -> Vec<(Param, f64)> {
        self.iterates
            .lock()
            .map(|mut v| std::mem::take(&mut *v))
            .unwrap_or_default()
    }
}

impl Observe<BfgsState> for IterateLog {
    fn observe_iter(
        &mut self,
        state: &BfgsState,
        _kv: &KV,
    ) -> std::result::Result<(), argmin::core::Error> {
        if let Some(param) = state.get_param() {
            self.iterates
                .lock()
                .map_err(|_| argmin::core::Error::msg("iterate log lock poisoned"))?
                .push((param.clone(), state.get_cost()));
        }
        Ok(())
    }
}

impl Minimizer for Bfgs {
    fn minimize(
        &self,
        objective: &mut dyn Objective,
        start: Array1<f64>,
        max_iter: usize,
    ) -> Result<Minimum> {
        self.validate()?;

        let n = start.len();
        let (cost, grad) = objective.cost_gradient(start.view())?;
        check_gradient_len(n, &grad)?;

        if !(cost.is_finite() && grad.iter().all(|g| g.is_finite())) {
            debug!(cost, "bfgs not started on a non-finite cost or gradient");
            return Ok(Minimum {
                point: start,
                cost,
                iterations: 0,
                converged: false,
            });
        }
        let at_minimum = grad.dot(&grad).sqrt() < self.gtol;
        if at_minimum || max_iter == 0 {
            return Ok(Minimum {
                point: start,
                cost,
                iterations: 0,
                converged: at_minimum,
            });
        }

        let linesearch = MoreThuenteLineSearch::new()
            .with_c(self.c1, self.c2)
            .map_err(|e| Error::InvalidConfig(format!("bfgs line search: {e}")))?;
        let solver = BFGS::new(linesearch)
            .with_tolerance_grad(self.gtol)
            .map_err(|e| Error::InvalidConfig(format!("bfgs: {e}")))?;

        let problem = Problem {
            objective: RefCell::new(&mut *objective),
            dim: n,
            last: RefCell::new(Some(Evaluation {
                point: start.clone(),
                cost,
                grad,
            })),
        };
        let log = IterateLog::default();
        let init = start.clone();
        let outcome = Executor::new(problem, solver)
            .configure(|state| {
                state
                    .param(init)
                    .inv_hessian(Array2::eye(n))
                    .max_iters(max_iter as u64)
            })
            .add_observer(log.clone(), ObserverMode::Always)
            .run();

        let converged = match outcome {
            Ok(res) => matches!(
                res.state().get_termination_status(),
                TerminationStatus::Terminated(TerminationReason::SolverConverged)
            ),
            // Objective failures are ours to report; anything else is the solver giving up.
            Err(err) => match err.downcast::<Error>() {
                Ok(own) => return Err(own),
                Err(other) => {
                    debug!(error = %other, "bfgs stopped early");
                    false
                }
            },
        };

        let mut iterates = log.take();
        for (point, _) in &iterates {
            objective.iteration(point.view());
        }
        let iterations = iterates.len();
        let (point, cost) = iterates.pop().unwrap_or((start, cost));

        debug!(iterations, cost, converged, "bfgs finished");
        Ok(Minimum {
            point,
            cost,
            iterations,
            converged,
        })
    }
}

fn check_gradient_len(expected: usize, grad: &Array1<f64>) -> Result<()> {
    if grad.len() != expected {
        return Err(Error::InvalidShape(format!(
            "objective returned a gradient of length {}, expected {expected}",
            grad.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// `Σ a_i (x_i - c_i)²`
    struct Quadratic {
        scale: Array1<f64>,
        center: Array1<f64>,
        seen: Vec<Array1<f64>>,
    }

    impl Objective for Quadratic {
        fn cost_gradient(&mut self, p: ArrayView1<'_, f64>) -> Result<(f64, Array1<f64>)> {
            let d = &p - &self.center;
            let cost = (&self.scale * &d * &d).sum();
            let grad = &self.scale * &d * 2.0;
            Ok((cost, grad))
        }

        fn iteration(&mut self, p: ArrayView1<'_, f64>) {
            self.seen.push(p.to_owned());
        }
    }

    struct Rosenbrock;

    impl Objective for Rosenbrock {
        fn cost_gradient(&mut self, p: ArrayView1<'_, f64>) -> Result<(f64, Array1<f64>)> {
            let (x, y) = (p[0], p[1]);
            let cost = (1.0 - x).powi(2) + 100.0 * (y - x * x).powi(2);
            let grad = array![
                -2.0 * (1.0 - x) - 400.0 * x * (y - x * x),
                200.0 * (y - x * x)
            ];
            Ok((cost, grad))
        }
    }

    struct WrongGradient;

    impl Objective for WrongGradient {
        fn cost_gradient(&mut self, _p: ArrayView1<'_, f64>) -> Result<(f64, Array1<f64>)> {
            Ok((1.0, array![1.0, 2.0, 3.0]))
        }
    }

    #[test]
    fn bfgs_minimizes_a_quadratic() {
        let mut obj = Quadratic {
            scale: array![1.0, 10.0, 0.5],
            center: array![1.0, -2.0, 3.0],
            seen: Vec::new(),
        };
        let min = Bfgs::default()
            .minimize(&mut obj, Array1::zeros(3), 200)
            .unwrap();

        assert!(min.cost < 1e-8, "cost={}", min.cost);
        for (x, c) in min.point.iter().zip(obj.center.iter()) {
            assert!((x - c).abs() < 1e-4);
        }
        assert!(min.iterations > 0);
        assert_eq!(obj.seen.len(), min.iterations);
        assert_eq!(obj.seen.last().unwrap(), &min.point);
    }

    #[test]
    fn bfgs_minimizes_rosenbrock() {
        let min = Bfgs::default()
            .minimize(&mut Rosenbrock, array![-1.2, 1.0], 200)
            .unwrap();
        assert!(min.cost < 1e-4, "cost={}", min.cost);
        assert!((min.point[0] - 1.0).abs() < 5e-2);
        assert!((min.point[1] - 1.0).abs() < 5e-2);
    }

    #[test]
    fn bfgs_respects_iteration_cap() {
        let min = Bfgs::default()
            .minimize(&mut Rosenbrock, array![-1.2, 1.0], 3)
            .unwrap();
        assert!(min.iterations <= 3);
        assert!(!min.converged);
    }

    #[test]
    fn zero_iterations_returns_start() {
        let min = Bfgs::default()
            .minimize(&mut Rosenbrock, array![-1.2, 1.0], 0)
            .unwrap();
        assert_eq!(min.iterations, 0);
        assert_eq!(min.point, array![-1.2, 1.0]);
    }

    #[test]
    fn starting_at_the_minimum_is_converged() {
        let min = Bfgs::default()
            .minimize(&mut Rosenbrock, array![1.0, 1.0], 50)
            .unwrap();
        assert!(min.converged);
        assert_eq!(min.iterations, 0);
        assert_eq!(min.cost, 0.0);
    }

    struct NotANumber;

    impl Objective for NotANumber {
        fn cost_gradient(&mut self, _p: ArrayView1<'_, f64>) -> Result<(f64, Array1<f64>)> {
            Ok((f64::NAN, array![f64::NAN, 0.0]))
        }
    }

    #[test]
    fn stops_on_non_finite_cost() {
        let min = Bfgs::default()
            .minimize(&mut NotANumber, array![0.0, 0.0], 50)
            .unwrap();
        assert_eq!(min.iterations, 0);
        assert!(!min.converged);
        assert!(min.cost.is_nan());
    }

    /// Fails every evaluation after the first.
    struct FailsLater {
        calls: usize,
    }

    impl Objective for FailsLater {
        fn cost_gradient(&mut self, p: ArrayView1<'_, f64>) -> Result<(f64, Array1<f64>)> {
            self.calls += 1;
            if self.calls > 1 {
                return Err(Error::ParamShape {
                    expected: 2,
                    actual: 3,
                });
            }
            Ok((p.dot(&p), &p * 2.0))
        }
    }

    #[test]
    fn objective_errors_surface_unchanged() {
        let err = Bfgs::default()
            .minimize(&mut FailsLater { calls: 0 }, array![1.0, 2.0], 10)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ParamShape {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn rejects_gradient_of_wrong_length() {
        let err = Bfgs::default()
            .minimize(&mut WrongGradient, array![0.0, 0.0], 10)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }

    #[test]
    fn validation_rejects_bad_hyperparams() {
        assert!(Bfgs { gtol: 0.0, ..Bfgs::default() }.validate().is_err());
        assert!(Bfgs { c1: 0.95, ..Bfgs::default() }.validate().is_err());
        assert!(Bfgs { c2: 1.0, ..Bfgs::default() }.validate().is_err());
        assert!(Bfgs::default().validate().is_ok());
    }
}
