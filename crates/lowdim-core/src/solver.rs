//! Shared solver configuration, progress reporting and update rules.
//!
//! The dual ascent behind symmetric entropic affinities and the embedding
//! descent loops share the same small toolbox: a stopping criterion, a
//! report describing how a solve ended, and matrix-shaped Adam and
//! momentum-descent updates.

use crate::types::{DMatrix, Scalar};
use num_traits::Float;
use std::time::Duration;

/// Reason a solve loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// The convergence criterion was met.
    Converged,
    /// The iteration budget was exhausted first.
    MaxIterations,
    /// A non-finite value appeared in the iterates.
    NumericalError,
}

/// Convergence thresholds and iteration budget for iterative solvers.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoppingCriterion<T: Scalar> {
    /// Hard cap on iterations.
    pub max_iterations: usize,
    /// Stop when the gradient (or residual) norm falls below this.
    pub gradient_tolerance: Option<T>,
    /// Stop when successive objective values differ by less than this.
    pub objective_tolerance: Option<T>,
}

impl<T: Scalar> Default for StoppingCriterion<T> {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            gradient_tolerance: Some(T::DEFAULT_TOLERANCE),
            objective_tolerance: None,
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Criterion with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the gradient-norm threshold.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = Some(tol);
        self
    }

    /// Set the objective-change threshold.
    pub fn with_objective_tolerance(mut self, tol: T) -> Self {
        self.objective_tolerance = Some(tol);
        self
    }
}

/// Summary of a completed solve.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveReport<T: Scalar> {
    /// Final objective value (or residual norm for dual solves).
    pub value: T,
    /// Final gradient norm, when the solver tracks one.
    pub gradient_norm: Option<T>,
    /// Iterations performed.
    pub iterations: usize,
    /// Wall-clock time spent in the solve loop.
    pub duration: Duration,
    /// Why the loop stopped.
    pub termination: TerminationReason,
    /// Convenience flag, true iff `termination == Converged`.
    pub converged: bool,
}

impl<T: Scalar> SolveReport<T> {
    /// Build a report; `converged` is derived from `termination`.
    pub fn new(
        value: T,
        gradient_norm: Option<T>,
        iterations: usize,
        duration: Duration,
        termination: TerminationReason,
    ) -> Self {
        Self {
            value,
            gradient_norm,
            iterations,
            duration,
            termination,
            converged: termination == TerminationReason::Converged,
        }
    }
}

/// Adam moment estimates for a matrix-shaped parameter.
///
/// Both moments carry the parameter's shape; `step` applies one
/// bias-corrected update in place.
#[derive(Debug, Clone)]
pub struct AdamState<T: Scalar> {
    m: DMatrix<T>,
    v: DMatrix<T>,
    t: usize,
    beta1: T,
    beta2: T,
    epsilon: T,
}

impl<T: Scalar> AdamState<T> {
    /// Fresh state for an `nrows x ncols` parameter with the usual
    /// defaults (beta1 = 0.9, beta2 = 0.999, epsilon = 1e-8).
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            m: DMatrix::zeros(nrows, ncols),
            v: DMatrix::zeros(nrows, ncols),
            t: 0,
            beta1: <T as Scalar>::from_f64(0.9),
            beta2: <T as Scalar>::from_f64(0.999),
            epsilon: <T as Scalar>::from_f64(1e-8),
        }
    }

    /// Override the exponential decay rates.
    pub fn with_betas(mut self, beta1: T, beta2: T) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Apply one Adam update of `param` along `grad`.
    pub fn step(&mut self, param: &mut DMatrix<T>, grad: &DMatrix<T>, learning_rate: T) {
        debug_assert_eq!(param.shape(), grad.shape());
        debug_assert_eq!(param.shape(), self.m.shape());
        self.t += 1;
        let one = T::one();
        let bias1 = one - Float::powi(self.beta1, self.t as i32);
        let bias2 = one - Float::powi(self.beta2, self.t as i32);
        for j in 0..param.ncols() {
            for i in 0..param.nrows() {
                let g = grad[(i, j)];
                let m = self.beta1 * self.m[(i, j)] + (one - self.beta1) * g;
                let v = self.beta2 * self.v[(i, j)] + (one - self.beta2) * g * g;
                self.m[(i, j)] = m;
                self.v[(i, j)] = v;
                let m_hat = m / bias1;
                let v_hat = v / bias2;
                param[(i, j)] =
                    param[(i, j)] - learning_rate * m_hat / (Float::sqrt(v_hat) + self.epsilon);
            }
        }
    }

    /// Drop accumulated moments and restart the schedule.
    pub fn reset(&mut self) {
        self.m.fill(T::zero());
        self.v.fill(T::zero());
        self.t = 0;
    }
}

/// Momentum (heavy-ball) descent state for a matrix-shaped parameter.
#[derive(Debug, Clone)]
pub struct DescentState<T: Scalar> {
    velocity: DMatrix<T>,
}

impl<T: Scalar> DescentState<T> {
    /// Fresh zero-velocity state for an `nrows x ncols` parameter.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            velocity: DMatrix::zeros(nrows, ncols),
        }
    }

    /// Apply one momentum update of `param` along `grad`.
    pub fn step(
        &mut self,
        param: &mut DMatrix<T>,
        grad: &DMatrix<T>,
        learning_rate: T,
        momentum: T,
    ) {
        debug_assert_eq!(param.shape(), grad.shape());
        debug_assert_eq!(param.shape(), self.velocity.shape());
        for j in 0..param.ncols() {
            for i in 0..param.nrows() {
                let v = momentum * self.velocity[(i, j)] - learning_rate * grad[(i, j)];
                self.velocity[(i, j)] = v;
                param[(i, j)] = param[(i, j)] + v;
            }
        }
    }

    /// Zero the velocity.
    pub fn reset(&mut self) {
        self.velocity.fill(T::zero());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_stopping_criterion_builder() {
        let crit = StoppingCriterion::<f64>::new()
            .with_max_iterations(250)
            .with_gradient_tolerance(1e-7)
            .with_objective_tolerance(1e-9);
        assert_eq!(crit.max_iterations, 250);
        assert_eq!(crit.gradient_tolerance, Some(1e-7));
        assert_eq!(crit.objective_tolerance, Some(1e-9));

        let default = StoppingCriterion::<f64>::default();
        assert_eq!(default.max_iterations, 1000);
        assert!(default.gradient_tolerance.is_some());
        assert!(default.objective_tolerance.is_none());
    }

    #[test]
    fn test_solve_report_converged_flag() {
        let report = SolveReport::new(
            0.5_f64,
            Some(1e-8),
            42,
            Duration::from_millis(3),
            TerminationReason::Converged,
        );
        assert!(report.converged);

        let report = SolveReport::new(
            0.5_f64,
            None,
            1000,
            Duration::from_millis(3),
            TerminationReason::MaxIterations,
        );
        assert!(!report.converged);
    }

    #[test]
    fn test_adam_minimizes_quadratic() {
        // f(x) = x^2, gradient 2x, scalar parameter as a 1x1 matrix.
        let mut param = DMatrix::from_element(1, 1, 5.0_f64);
        let mut state = AdamState::new(1, 1);
        for _ in 0..600 {
            let grad = DMatrix::from_element(1, 1, 2.0 * param[(0, 0)]);
            state.step(&mut param, &grad, 0.1);
        }
        assert!(param[(0, 0)].abs() < 0.1);
    }

    #[test]
    fn test_adam_first_step_magnitude() {
        // With bias correction the very first Adam step has magnitude
        // close to the learning rate, independent of gradient scale.
        for &g0 in &[1e-3_f64, 1.0, 1e3] {
            let mut param = DMatrix::from_element(1, 1, 0.0_f64);
            let mut state = AdamState::new(1, 1);
            let grad = DMatrix::from_element(1, 1, g0);
            state.step(&mut param, &grad, 0.5);
            assert_relative_eq!(param[(0, 0)].abs(), 0.5, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_descent_minimizes_quadratic() {
        let mut param = DMatrix::from_element(1, 1, 5.0_f64);
        let mut state = DescentState::new(1, 1);
        for _ in 0..200 {
            let grad = DMatrix::from_element(1, 1, 2.0 * param[(0, 0)]);
            state.step(&mut param, &grad, 0.1, 0.5);
        }
        assert!(param[(0, 0)].abs() < 1e-6);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_stopping_criterion_serde_roundtrip() {
        let crit = StoppingCriterion::<f64>::new()
            .with_max_iterations(77)
            .with_gradient_tolerance(1e-9);
        let json = serde_json::to_string(&crit).unwrap();
        let back: StoppingCriterion<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_iterations, 77);
        assert_eq!(back.gradient_tolerance, Some(1e-9));
        assert_eq!(back.objective_tolerance, None);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut param = DMatrix::from_element(1, 1, 1.0_f64);
        let grad = DMatrix::from_element(1, 1, 1.0_f64);

        let mut adam = AdamState::new(1, 1);
        adam.step(&mut param, &grad, 0.1);
        adam.reset();
        assert_eq!(adam.t, 0);
        assert_eq!(adam.m[(0, 0)], 0.0);

        let mut descent = DescentState::new(1, 1);
        descent.step(&mut param, &grad, 0.1, 0.9);
        descent.reset();
        assert_eq!(descent.velocity[(0, 0)], 0.0);
    }
}
