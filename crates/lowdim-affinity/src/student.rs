//! Student-t affinity with heavy tails.

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

/// Student-t affinity `(1 + C / nu)^{-(nu + 1) / 2}`.
///
/// With one degree of freedom this is the Cauchy kernel used for the
/// low-dimensional side of t-SNE. Heavier tails than [`GibbsAffinity`]
/// let moderately distant pairs keep non-negligible mass.
///
/// [`GibbsAffinity`]: crate::GibbsAffinity
#[derive(Debug, Clone)]
pub struct StudentAffinity<T: Scalar> {
    degrees_of_freedom: T,
    metric: Metric,
    normalization: Normalization,
    backend: Backend,
}

impl<T: Scalar> Default for StudentAffinity<T> {
    fn default() -> Self {
        Self {
            degrees_of_freedom: T::one(),
            metric: Metric::default(),
            normalization: Normalization::default(),
            backend: Backend::default(),
        }
    }
}

impl<T: Scalar> StudentAffinity<T> {
    /// Cauchy kernel (one degree of freedom) with row normalization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the degrees of freedom (must be positive and finite).
    pub fn with_degrees_of_freedom(mut self, nu: T) -> Self {
        self.degrees_of_freedom = nu;
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
        let nu = self.degrees_of_freedom;
        if !(nu > T::zero()) || !Float::is_finite(nu) {
            return Err(DataError::invalid_parameter(
                "degrees_of_freedom",
                format!("must be positive and finite, got {nu}"),
            )
            .into());
        }
        let costs = self.backend.pairwise(x, self.metric)?;
        let n = costs.nrows();
        let half = <T as Scalar>::from_f64(0.5);
        let exponent = -(nu + T::one()) * half;
        let mut log_k = DMatrix::zeros(n, n);
        for j in 0..n {
            for i in 0..n {
                log_k[(i, j)] = if i == j {
                    T::LOG_ZERO
                } else {
                    exponent * Float::ln(T::one() + costs[(i, j)] / nu)
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

impl<T: Scalar> Affinity<T> for StudentAffinity<T> {
    fn name(&self) -> &'static str {
        "student"
    }

    fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.log_kernel(x)?.map(clipped_exp))
    }
}

impl<T: Scalar> LogAffinity<T> for StudentAffinity<T> {
    fn fit_transform_log(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        self.log_kernel(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lowdim_core::ops::row_sums;

    fn sample() -> DMatrix<f64> {
        DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.5, 2.0, 2.0])
    }

    #[test]
    fn test_rows_sum_to_one() {
        let p = StudentAffinity::new().fit_transform(&sample()).unwrap();
        for s in row_sums(&p).iter() {
            assert_relative_eq!(*s, 1.0, epsilon = 1e-12);
        }
        for i in 0..4 {
            assert_eq!(p[(i, i)], 0.0);
        }
    }

    #[test]
    fn test_cauchy_ratio() {
        // With nu = 1 the unnormalized kernel is 1 / (1 + d^2), so the
        // ratio of two entries in a row is (1 + d_b^2) / (1 + d_a^2).
        let x = sample();
        let p = StudentAffinity::new().fit_transform(&x).unwrap();
        let d01 = 1.0; // squared distance between rows 0 and 1
        let d02 = 2.25;
        let expected = (1.0 + d02) / (1.0 + d01);
        assert_relative_eq!(p[(0, 1)] / p[(0, 2)], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_heavier_tail_than_gibbs() {
        // At large distances the Student kernel retains more relative
        // mass than the Gibbs kernel.
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 6.0]);
        let student = StudentAffinity::new().fit_transform(&x).unwrap();
        let gibbs = crate::GibbsAffinity::new().fit_transform(&x).unwrap();
        assert!(student[(0, 2)] > gibbs[(0, 2)]);
    }

    #[test]
    fn test_invalid_degrees_of_freedom() {
        let x = sample();
        assert!(StudentAffinity::new()
            .with_degrees_of_freedom(0.0)
            .fit_transform(&x)
            .is_err());
        assert!(StudentAffinity::new()
            .with_degrees_of_freedom(f64::NAN)
            .fit_transform(&x)
            .is_err());
    }
}
