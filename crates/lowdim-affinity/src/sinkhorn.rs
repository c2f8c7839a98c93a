//! Doubly stochastic affinity via symmetric log-domain Sinkhorn.

use std::time::Instant;

use lowdim_core::affinity::{Affinity, LogAffinity};
use lowdim_core::backend::Backend;
use lowdim_core::error::{DataError, SolverError, SolverResult};
use lowdim_core::metric::Metric;
use lowdim_core::solver::{SolveReport, StoppingCriterion, TerminationReason};
use lowdim_core::stability::{clipped_exp, log_sum_exp};
use lowdim_core::types::Scalar;
use lowdim_core::validation::validate_affinity_input;
use nalgebra::{DMatrix, DVector};
use num_traits::Float;

/// Affinity projected onto the doubly stochastic polytope,
///
/// ```text
/// log P_ij = (f_i + f_j - C_ij) / eps
/// ```
///
/// with one shared potential `f` because the cost matrix is symmetric.
/// Each sweep evaluates the log-domain marginals and applies the damped
/// update `f <- (f - eps * t) / 2`, which converges for symmetric costs
/// where the undamped alternation can cycle. Unlike the row-normalized
/// kernels the diagonal is kept: the transport plan may couple a sample
/// with itself.
#[derive(Debug, Clone)]
pub struct SinkhornAffinity<T: Scalar> {
    epsilon: T,
    criterion: StoppingCriterion<T>,
    metric: Metric,
    backend: Backend,
}

impl<T: Scalar> Default for SinkhornAffinity<T> {
    fn default() -> Self {
        Self {
            epsilon: T::one(),
            criterion: StoppingCriterion::new()
                .with_max_iterations(200)
                .with_gradient_tolerance(T::DEFAULT_TOLERANCE),
            metric: Metric::default(),
            backend: Backend::default(),
        }
    }
}

impl<T: Scalar> SinkhornAffinity<T> {
    /// Sinkhorn affinity with unit regularization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entropic regularization strength (must be positive).
    pub fn with_epsilon(mut self, epsilon: T) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the stopping criterion of the marginal fixed point.
    pub fn with_criterion(mut self, criterion: StoppingCriterion<T>) -> Self {
        self.criterion = criterion;
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

    /// Run the Sinkhorn fixed point and return the log affinity with a
    /// report on the solve.
    pub fn solve_log(&self, x: &DMatrix<T>) -> SolverResult<(DMatrix<T>, SolveReport<T>)> {
        validate_affinity_input(x)?;
        let eps = self.epsilon;
        if !(eps > T::zero()) || !Float::is_finite(eps) {
            return Err(DataError::invalid_parameter(
                "epsilon",
                format!("regularization must be positive and finite, got {eps}"),
            )
            .into());
        }
        let costs = self.backend.pairwise(x, self.metric)?;
        let n = costs.nrows();
        let half = <T as Scalar>::from_f64(0.5);

        let mut f: DVector<T> = DVector::zeros(n);
        let mut t: DVector<T> = DVector::zeros(n);
        let mut buf = vec![T::zero(); n];

        let start = Instant::now();
        let mut iterations = 0;
        loop {
            for i in 0..n {
                for j in 0..n {
                    buf[j] = (f[j] - costs[(i, j)]) / eps;
                }
                t[i] = log_sum_exp(&buf);
            }

            // Log-domain deviation of each row sum from one.
            let mut sq_norm = T::zero();
            for i in 0..n {
                let r = f[i] / eps + t[i];
                sq_norm = sq_norm + r * r;
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
                    log::warn!("sinkhorn hit the iteration cap with residual {residual}");
                    TerminationReason::MaxIterations
                };
                let mut log_p = DMatrix::zeros(n, n);
                for j in 0..n {
                    for i in 0..n {
                        log_p[(i, j)] = (f[i] + f[j] - costs[(i, j)]) / eps;
                    }
                }
                let report = SolveReport::new(
                    residual,
                    Some(residual),
                    iterations,
                    start.elapsed(),
                    termination,
                );
                log::debug!(
                    "sinkhorn finished after {} iterations (residual {})",
                    report.iterations,
                    report.value
                );
                return Ok((log_p, report));
            }

            for i in 0..n {
                f[i] = (f[i] - eps * t[i]) * half;
            }
            iterations += 1;
        }
    }
}

impl<T: Scalar> Affinity<T> for SinkhornAffinity<T> {
    fn name(&self) -> &'static str {
        "sinkhorn"
    }

    fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.solve_log(x)?.0.map(clipped_exp))
    }
}

impl<T: Scalar> LogAffinity<T> for SinkhornAffinity<T> {
    fn fit_transform_log(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.solve_log(x)?.0)
    }
}
