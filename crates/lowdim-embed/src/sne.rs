//! Symmetric stochastic neighbor embedding.

use lowdim_core::backend::Backend;
use lowdim_core::error::{DataError, SolverResult};
use lowdim_core::metric::{pairwise_distances, Metric};
use lowdim_core::ops;
use lowdim_core::solver::SolveReport;
use lowdim_core::stability::clipped_exp;
use lowdim_core::types::Scalar;
use nalgebra::DMatrix;

use crate::matcher::{AffinityMatcher, EmbeddingObjective};

/// KL divergence between a joint input affinity and the Gaussian
/// embedding kernel `q_ij = exp(-d_ij^2) / sum exp(-d^2)`.
///
/// The gradient with respect to row `i` of the coordinates is
/// `4 sum_j (p_ij - q_ij) (z_i - z_j)`; it is only the true gradient
/// when `p` is symmetric.
#[derive(Debug, Clone, Copy, Default)]
pub struct SneObjective;

impl<T: Scalar> EmbeddingObjective<T> for SneObjective {
    fn name(&self) -> &'static str {
        "sne"
    }

    fn loss_and_grad(
        &self,
        p: &DMatrix<T>,
        z: &DMatrix<T>,
        grad: &mut DMatrix<T>,
    ) -> SolverResult<T> {
        let (q, _) = embedding_kernel(z, |d2| clipped_exp(-d2))?;
        let loss = ops::kl_divergence(p, &q)?;
        let four = <T as Scalar>::from_f64(4.0);
        grad.fill(T::zero());
        for i in 0..z.nrows() {
            for j in 0..z.nrows() {
                if i == j {
                    continue;
                }
                let coeff = four * (p[(i, j)] - q[(i, j)]);
                for c in 0..z.ncols() {
                    grad[(i, c)] = grad[(i, c)] + coeff * (z[(i, c)] - z[(j, c)]);
                }
            }
        }
        Ok(loss)
    }
}

/// Normalized embedding kernel and raw weights for a pointwise kernel
/// of the squared distance. The diagonal is excluded from both.
pub(crate) fn embedding_kernel<T, F>(
    z: &DMatrix<T>,
    kernel: F,
) -> SolverResult<(DMatrix<T>, DMatrix<T>)>
where
    T: Scalar,
    F: Fn(T) -> T,
{
    let mut w = pairwise_distances(z, Metric::SquaredEuclidean)?;
    let n = w.nrows();
    for j in 0..n {
        for i in 0..n {
            w[(i, j)] = if i == j { T::zero() } else { kernel(w[(i, j)]) };
        }
    }
    let total = ops::total_sum(&w);
    if !(total > T::zero()) {
        return Err(DataError::numerical_error("embedding kernel mass vanished").into());
    }
    let q = &w * (T::one() / total);
    Ok((q, w))
}

/// Symmetric SNE estimator.
///
/// Calibrates an entropic affinity on the input, symmetrizes it into a
/// joint distribution and matches it with [`SneObjective`] under the
/// configured [`AffinityMatcher`].
#[derive(Debug, Clone)]
pub struct Sne<T: Scalar> {
    perplexity: T,
    n_components: usize,
    matcher: AffinityMatcher<T>,
    metric: Metric,
    backend: Backend,
}

impl<T: Scalar> Default for Sne<T> {
    fn default() -> Self {
        Self {
            perplexity: <T as Scalar>::from_f64(30.0),
            n_components: 2,
            matcher: AffinityMatcher::default(),
            metric: Metric::default(),
            backend: Backend::default(),
        }
    }
}

impl<T: Scalar> Sne<T> {
    /// Estimator with perplexity 30 and two output components.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the perplexity of the input calibration.
    pub fn with_perplexity(mut self, perplexity: T) -> Self {
        self.perplexity = perplexity;
        self
    }

    /// Set the number of embedding coordinates.
    pub fn with_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    /// Replace the descent configuration.
    pub fn with_matcher(mut self, matcher: AffinityMatcher<T>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Set the ground metric of the input calibration.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the pairwise-distance backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Embed `x` and return the coordinates with the solve report.
    pub fn fit(&self, x: &DMatrix<T>) -> SolverResult<(DMatrix<T>, SolveReport<T>)> {
        let p = crate::joint_input_affinity(x, self.perplexity, self.metric, self.backend)?;
        log::debug!(
            "sne: matching {} samples into {} components",
            x.nrows(),
            self.n_components
        );
        self.matcher.fit(&SneObjective, &p, x, self.n_components)
    }

    /// Embed `x` and return the coordinates.
    pub fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.fit(x)?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lowdim_core::dataset::two_moons;

    fn symmetric_affinity(n: usize) -> DMatrix<f64> {
        let x = two_moons::<f64>(n, 0.05, 7);
        crate::joint_input_affinity(&x, 4.0, Metric::default(), Backend::default()).unwrap()
    }

    fn wiggly_coords(n: usize, k: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, k, |i, j| ((i * k + j) as f64 * 0.7).sin() * 0.5)
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let n = 12;
        let p = symmetric_affinity(n);
        let z = wiggly_coords(n, 2);
        let mut grad = DMatrix::zeros(n, 2);
        SneObjective.loss_and_grad(&p, &z, &mut grad).unwrap();

        let h = 1e-5;
        let mut scratch = DMatrix::zeros(n, 2);
        for i in 0..n {
            for c in 0..2 {
                let mut plus = z.clone();
                plus[(i, c)] += h;
                let mut minus = z.clone();
                minus[(i, c)] -= h;
                let up = SneObjective.loss_and_grad(&p, &plus, &mut scratch).unwrap();
                let down = SneObjective.loss_and_grad(&p, &minus, &mut scratch).unwrap();
                let numeric = (up - down) / (2.0 * h);
                assert_relative_eq!(grad[(i, c)], numeric, epsilon = 1e-6, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_gradient_descends() {
        let n = 10;
        let p = symmetric_affinity(n);
        let z = wiggly_coords(n, 2);
        let mut grad = DMatrix::zeros(n, 2);
        let loss = SneObjective.loss_and_grad(&p, &z, &mut grad).unwrap();
        assert!(loss >= 0.0);
        let stepped = &z - &grad * 1e-3;
        let mut scratch = DMatrix::zeros(n, 2);
        let next = SneObjective.loss_and_grad(&p, &stepped, &mut scratch).unwrap();
        assert!(next < loss);
    }

    #[test]
    fn test_embedding_kernel_normalized() {
        let z = wiggly_coords(9, 3);
        let (q, w) = embedding_kernel(&z, |d2| clipped_exp(-d2)).unwrap();
        assert_relative_eq!(ops::total_sum(&q), 1.0, epsilon = 1e-12);
        for i in 0..9 {
            assert_eq!(q[(i, i)], 0.0);
            assert_eq!(w[(i, i)], 0.0);
        }
    }

    #[test]
    fn test_fit_produces_finite_embedding() {
        let x = two_moons::<f64>(24, 0.05, 3);
        let sne = Sne::new().with_perplexity(5.0).with_matcher(
            AffinityMatcher::new()
                .with_exaggeration_iters(50)
                .with_criterion(
                    lowdim_core::solver::StoppingCriterion::new()
                        .with_max_iterations(200)
                        .with_gradient_tolerance(1e-7),
                ),
        );
        let (z, report) = sne.fit(&x).unwrap();
        assert_eq!(z.shape(), (24, 2));
        assert!(z.iter().all(|v| v.is_finite()));
        assert!(report.iterations >= 50);
        assert!(report.value.is_finite());
    }
}
