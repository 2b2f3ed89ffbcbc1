//! Cost functions.
//!
//! Each cost is normalized by the sample count `n` (the number of rows), not by
//! the element count. A cost is used like:
//!
//! - run `network.forward_trace(...)`
//! - take `d_pred = dC/d(pred)` from [`Loss::derivative`]
//! - push `d_pred` back through the output activation and the layers

use ndarray::{Array2, Zip};

/// Probabilities are floored at this value before taking a logarithm.
pub const LOG_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Supported cost functions.
pub enum Loss {
    /// `Σ (y - ŷ)² / n`, for regression and single-output classification.
    SumOfSquares,
    /// `-Σ [y·ln ŷ + (1-y)·ln(1-ŷ)] / n`, for multi-class outputs.
    CrossEntropy,
}

impl Loss {
    /// Default cost for a network with `output_width` output nodes.
    ///
    /// A single output column selects sum-of-squares regardless of the target
    /// value range; anything wider selects cross-entropy.
    pub fn for_output_width(output_width: usize) -> Self {
        if output_width > 1 {
            Loss::CrossEntropy
        } else {
            Loss::SumOfSquares
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Loss::SumOfSquares => "Sum of Squares",
            Loss::CrossEntropy => "Cross Entropy",
        }
    }

    /// Compute the cost of `pred` against `target`.
    ///
    /// Shape contract: `pred.dim() == target.dim()`.
    #[inline]
    pub fn forward(self, pred: &Array2<f64>, target: &Array2<f64>) -> f64 {
        match self {
            Loss::SumOfSquares => sum_of_squares(pred, target),
            Loss::CrossEntropy => cross_entropy(pred, target),
        }
    }

    /// Gradient of the cost with respect to every element of `pred`.
    ///
    /// Shape contract: `pred.dim() == target.dim()`.
    #[inline]
    pub fn derivative(self, pred: &Array2<f64>, target: &Array2<f64>) -> Array2<f64> {
        match self {
            Loss::SumOfSquares => sum_of_squares_derivative(pred, target),
            Loss::CrossEntropy => cross_entropy_derivative(pred, target),
        }
    }
}

fn assert_same_shape(pred: &Array2<f64>, target: &Array2<f64>) {
    assert_eq!(
        pred.dim(),
        target.dim(),
        "pred shape {:?} does not match target shape {:?}",
        pred.dim(),
        target.dim()
    );
}

/// Natural log with the argument floored at [`LOG_FLOOR`].
#[inline]
pub fn safe_ln(x: f64) -> f64 {
    x.max(LOG_FLOOR).ln()
}

/// Sum-of-squared-errors normalized by sample count.
pub fn sum_of_squares(pred: &Array2<f64>, target: &Array2<f64>) -> f64 {
    assert_same_shape(pred, target);
    if pred.is_empty() {
        return 0.0;
    }

    let n = pred.nrows() as f64;
    let sum_sq: f64 = pred
        .iter()
        .zip(target.iter())
        .map(|(&p, &t)| (t - p) * (t - p))
        .sum();
    sum_sq / n
}

/// `d/dŷ` of [`sum_of_squares`]: `-2 (y - ŷ) / n`.
pub fn sum_of_squares_derivative(pred: &Array2<f64>, target: &Array2<f64>) -> Array2<f64> {
    assert_same_shape(pred, target);
    let inv_n = 1.0 / pred.nrows().max(1) as f64;
    Zip::from(pred)
        .and(target)
        .map_collect(|&p, &t| -2.0 * (t - p) * inv_n)
}

/// Cross-entropy summed over all elements and normalized by sample count.
pub fn cross_entropy(pred: &Array2<f64>, target: &Array2<f64>) -> f64 {
    assert_same_shape(pred, target);
    if pred.is_empty() {
        return 0.0;
    }

    let n = pred.nrows() as f64;
    let sum: f64 = pred
        .iter()
        .zip(target.iter())
        .map(|(&p, &t)| t * safe_ln(p) + (1.0 - t) * safe_ln(1.0 - p))
        .sum();
    -sum / n
}

/// `d/dŷ` of [`cross_entropy`].
///
/// A log term whose argument sits at the floor is constant in `ŷ` and
/// contributes nothing.
pub fn cross_entropy_derivative(pred: &Array2<f64>, target: &Array2<f64>) -> Array2<f64> {
    assert_same_shape(pred, target);
    let inv_n = 1.0 / pred.nrows().max(1) as f64;
    Zip::from(pred).and(target).map_collect(|&p, &t| {
        let d_pos = if p > LOG_FLOOR { t / p } else { 0.0 };
        let q = 1.0 - p;
        let d_neg = if q > LOG_FLOOR { (1.0 - t) / q } else { 0.0 };
        -(d_pos - d_neg) * inv_n
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn default_loss_follows_output_width() {
        assert_eq!(Loss::for_output_width(1), Loss::SumOfSquares);
        assert_eq!(Loss::for_output_width(2), Loss::CrossEntropy);
        assert_eq!(Loss::for_output_width(10), Loss::CrossEntropy);
    }

    #[test]
    fn sum_of_squares_is_zero_when_equal() {
        let pred = array![[1.0, -2.0], [0.5, 3.0]];
        assert_eq!(sum_of_squares(&pred, &pred.clone()), 0.0);
    }

    #[test]
    fn sum_of_squares_normalizes_by_rows() {
        let pred = array![[1.0, 3.0], [0.0, 0.0]];
        let target = array![[2.0, 1.0], [0.0, 1.0]];
        // (1 + 4 + 0 + 1) / 2 rows
        assert!((sum_of_squares(&pred, &target) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn sum_of_squares_accepts_targets_outside_unit_range() {
        let pred = array![[0.5]];
        let target = array![[7.5]];
        assert!((Loss::SumOfSquares.forward(&pred, &target) - 49.0).abs() < 1e-12);
    }

    #[test]
    fn cross_entropy_is_finite_at_saturation() {
        let pred = array![[0.0, 1.0]];
        let target = array![[1.0, 0.0]];
        let c = cross_entropy(&pred, &target);
        assert!(c.is_finite());
        // Two floored logs: -2 ln(1e-10)
        assert!((c - (-2.0 * LOG_FLOOR.ln())).abs() < 1e-9);
    }

    #[test]
    fn cross_entropy_is_non_negative_for_probabilities() {
        let pred = array![[0.2, 0.7, 0.1], [0.9, 0.05, 0.5]];
        let target = array![[0.0, 1.0, 0.0], [1.0, 0.0, 0.3]];
        assert!(cross_entropy(&pred, &target) >= 0.0);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let pred = array![[0.2, 0.7], [0.6, 0.35]];
        let target = array![[0.0, 1.0], [1.0, 0.0]];
        let eps = 1e-6;

        for loss in [Loss::SumOfSquares, Loss::CrossEntropy] {
            let analytic = loss.derivative(&pred, &target);
            for idx in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let mut plus = pred.clone();
                plus[idx] += eps;
                let mut minus = pred.clone();
                minus[idx] -= eps;
                let numeric =
                    (loss.forward(&plus, &target) - loss.forward(&minus, &target)) / (2.0 * eps);
                assert!(
                    (numeric - analytic[idx]).abs() < 1e-6,
                    "{loss:?} at {idx:?}: analytic={} numeric={numeric}",
                    analytic[idx]
                );
            }
        }
    }

    #[test]
    fn cross_entropy_derivative_ignores_floored_terms() {
        let pred = array![[-0.5]];
        let target = array![[1.0]];
        let d = cross_entropy_derivative(&pred, &target);
        // ln(max(ŷ, floor)) is flat here and (1 - t) is zero.
        assert_eq!(d[[0, 0]], 0.0);
    }
}
