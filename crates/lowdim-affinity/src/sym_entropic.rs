//! Symmetric entropic affinity via dual ascent.
//!
//! Averaging an entropic affinity with its transpose destroys the
//! per-row perplexity. This kernel instead solves the symmetric
//! optimal-transport-style problem directly: it searches dual variables
//! `mu` (row masses) and `eps` (bandwidths) such that
//!
//! ```text
//! log P_ij = (mu_i + mu_j - 2 C_ij) / (eps_i + eps_j)
//! ```
//!
//! has unit row sums and row entropies matching the target perplexity.
//! The matrix is symmetric by construction at every iterate.

use std::time::Instant;

use lowdim_core::affinity::{Affinity, LogAffinity};
use lowdim_core::backend::Backend;
use lowdim_core::error::{SolverError, SolverResult};
use lowdim_core::metric::Metric;
use lowdim_core::ops::{row_entropy_from_log, row_log_sum_exp};
use lowdim_core::solver::{
    AdamState, DescentState, SolveReport, StoppingCriterion, TerminationReason,
};
use lowdim_core::stability::clipped_exp;
use lowdim_core::types::Scalar;
use lowdim_core::validation::validate_affinity_input;
use nalgebra::DMatrix;
use num_traits::Float;

use crate::entropic::entropy_target;

/// First-order method used for the dual search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DualSolver {
    /// Adam with bias correction. Robust to the very different scales
    /// of the mass and entropy residuals.
    #[default]
    Adam,
    /// Plain gradient descent.
    GradientDescent,
}

/// Entropic affinity that is symmetric by construction.
#[derive(Debug, Clone)]
pub struct SymmetricEntropicAffinity<T: Scalar> {
    perplexity: T,
    learning_rate: T,
    criterion: StoppingCriterion<T>,
    solver: DualSolver,
    eps_square: bool,
    metric: Metric,
    backend: Backend,
}

impl<T: Scalar> Default for SymmetricEntropicAffinity<T> {
    fn default() -> Self {
        Self {
            perplexity: <T as Scalar>::from_f64(30.0),
            learning_rate: T::one(),
            criterion: StoppingCriterion::new()
                .with_max_iterations(2000)
                .with_gradient_tolerance(<T as Scalar>::from_f64(1e-3)),
            solver: DualSolver::default(),
            eps_square: true,
            metric: Metric::default(),
            backend: Backend::default(),
        }
    }
}

impl<T: Scalar> SymmetricEntropicAffinity<T> {
    /// Symmetric entropic affinity with perplexity 30 solved by Adam.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target perplexity.
    pub fn with_perplexity(mut self, perplexity: T) -> Self {
        self.perplexity = perplexity;
        self
    }

    /// Set the dual step size.
    pub fn with_learning_rate(mut self, learning_rate: T) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the stopping criterion of the dual search.
    pub fn with_criterion(mut self, criterion: StoppingCriterion<T>) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the first-order method.
    pub fn with_solver(mut self, solver: DualSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Optimize over square roots of the bandwidths instead of the
    /// bandwidths themselves. Keeps `eps` positive without projection.
    pub fn with_eps_square(mut self, eps_square: bool) -> Self {
        self.eps_square = eps_square;
        self
    }

    /// Set the ground metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the cost-matrix backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    fn effective_eps(&self, raw: T) -> T {
        let eps = if self.eps_square { raw * raw } else { raw };
        Float::max(eps, T::MIN_BANDWIDTH)
    }

    /// Dual iterate in log domain. Column 0 of `params` holds `mu`,
    /// column 1 the (possibly square-rooted) bandwidths.
    fn log_kernel(&self, costs: &DMatrix<T>, params: &DMatrix<T>) -> DMatrix<T> {
        let n = costs.nrows();
        let two = <T as Scalar>::from_f64(2.0);
        let eps: Vec<T> = (0..n).map(|i| self.effective_eps(params[(i, 1)])).collect();
        let mut log_p = DMatrix::zeros(n, n);
        for j in 0..n {
            for i in 0..n {
                log_p[(i, j)] = if i == j {
                    T::LOG_ZERO
                } else {
                    (params[(i, 0)] + params[(j, 0)] - two * costs[(i, j)])
                        / (eps[i] + eps[j])
                };
            }
        }
        log_p
    }

    /// Run the dual search and return the log affinity with a report on
    /// the solve.
    pub fn solve_log(&self, x: &DMatrix<T>) -> SolverResult<(DMatrix<T>, SolveReport<T>)> {
        validate_affinity_input(x)?;
        let n = x.nrows();
        crate::check_perplexity(self.perplexity, n)?;
        let costs = self.backend.pairwise(x, self.metric)?;
        let target = entropy_target(self.perplexity);
        let two = <T as Scalar>::from_f64(2.0);

        // mu starts at zero, bandwidths at one.
        let mut params = DMatrix::zeros(n, 2);
        for i in 0..n {
            params[(i, 1)] = T::one();
        }
        let mut grad = DMatrix::zeros(n, 2);
        let mut adam = AdamState::new(n, 2);
        let mut descent = DescentState::new(n, 2);

        let start = Instant::now();
        let mut iterations = 0;
        loop {
            let log_p = self.log_kernel(&costs, &params);
            let entropies = row_entropy_from_log(&log_p);
            let masses = row_log_sum_exp(&log_p);

            let mut sq_norm = T::zero();
            for i in 0..n {
                let g_mass = clipped_exp(masses[i]) - T::one();
                let g_entropy = entropies[i] - target;
                sq_norm = sq_norm + g_mass * g_mass + g_entropy * g_entropy;
                grad[(i, 0)] = g_mass;
                grad[(i, 1)] = if self.eps_square {
                    g_entropy * two * params[(i, 1)]
                } else {
                    g_entropy
                };
            }
            let residual = Float::sqrt(sq_norm);
            if !Float::is_finite(residual) {
                return Err(SolverError::non_finite_iterate(iterations));
            }

            let converged = self
                .criterion
                .gradient_tolerance
                .map_or(false, |tol| residual <= tol);
            if converged || iterations >= self.criterion.max_iterations {
                let termination = if converged {
                    TerminationReason::Converged
                } else {
                    log::warn!(
                        "symmetric entropic solve hit the iteration cap with residual {residual}"
                    );
                    TerminationReason::MaxIterations
                };
                let report = SolveReport::new(
                    residual,
                    Some(residual),
                    iterations,
                    start.elapsed(),
                    termination,
                );
                log::debug!(
                    "symmetric entropic solve finished after {} iterations (residual {})",
                    report.iterations,
                    report.value
                );
                return Ok((log_p, report));
            }

            match self.solver {
                DualSolver::Adam => adam.step(&mut params, &grad, self.learning_rate),
                DualSolver::GradientDescent => {
                    descent.step(&mut params, &grad, self.learning_rate, T::zero());
                }
            }
            if !self.eps_square {
                // Project the bandwidths back onto the feasible set.
                for i in 0..n {
                    params[(i, 1)] = Float::max(params[(i, 1)], T::MIN_BANDWIDTH);
                }
            }
            iterations += 1;
        }
    }
}

impl<T: Scalar> Affinity<T> for SymmetricEntropicAffinity<T> {
    fn name(&self) -> &'static str {
        "symmetric_entropic"
    }

    fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.solve_log(x)?.0.map(clipped_exp))
    }
}

impl<T: Scalar> LogAffinity<T> for SymmetricEntropicAffinity<T> {
    fn fit_transform_log(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.solve_log(x)?.0)
    }
}
