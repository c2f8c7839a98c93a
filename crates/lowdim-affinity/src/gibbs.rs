//! Gibbs (heat kernel) affinity.

use lowdim_core::affinity::{Affinity, LogAffinity, Normalization};
use lowdim_core::backend::Backend;
use lowdim_core::error::{DataError, SolverResult};
use lowdim_core::metric::Metric;
use lowdim_core::ops::{log_normalize_cols, log_normalize_rows, log_normalize_total};
use lowdim_core::stability::clipped_exp;
use lowdim_core::types::Scalar;
use lowdim_core::validation::validate_affinity_input;
use nalgebra::DMatrix;
use num_traits::Float;

/// Gibbs affinity `exp(-C / sigma)` with a fixed bandwidth.
///
/// The diagonal is masked before normalization, so each sample spreads
/// its mass over the others only.
#[derive(Debug, Clone)]
pub struct GibbsAffinity<T: Scalar> {
    sigma: T,
    metric: Metric,
    normalization: Normalization,
    backend: Backend,
}

impl<T: Scalar> Default for GibbsAffinity<T> {
    fn default() -> Self {
        Self {
            sigma: T::one(),
            metric: Metric::default(),
            normalization: Normalization::default(),
            backend: Backend::default(),
        }
    }
}

impl<T: Scalar> GibbsAffinity<T> {
    /// Gibbs affinity with unit bandwidth, squared Euclidean costs and
    /// row normalization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the kernel bandwidth (must be positive and finite).
    pub fn with_sigma(mut self, sigma: T) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the ground metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the marginal normalization mode.
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the cost-matrix backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    fn log_kernel(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        validate_affinity_input(x)?;
        if !(self.sigma > T::zero()) || !Float::is_finite(self.sigma) {
            return Err(DataError::invalid_parameter(
                "sigma",
                format!("bandwidth must be positive and finite, got {}", self.sigma),
            )
            .into());
        }
        let costs = self.backend.pairwise(x, self.metric)?;
        let n = costs.nrows();
        let mut log_k = DMatrix::zeros(n, n);
        for j in 0..n {
            for i in 0..n {
                log_k[(i, j)] = if i == j {
                    T::LOG_ZERO
                } else {
                    -costs[(i, j)] / self.sigma
                };
            }
        }
        let normalized = match self.normalization {
            Normalization::Rows => log_normalize_rows(&log_k)?,
            Normalization::Cols => log_normalize_cols(&log_k)?,
            Normalization::Both => log_normalize_total(&log_k)?,
        };
        Ok(normalized)
    }
}

impl<T: Scalar> Affinity<T> for GibbsAffinity<T> {
    fn name(&self) -> &'static str {
        "gibbs"
    }

    fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.log_kernel(x)?.map(clipped_exp))
    }
}

impl<T: Scalar> LogAffinity<T> for GibbsAffinity<T> {
    fn fit_transform_log(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        self.log_kernel(x)
    }
}
