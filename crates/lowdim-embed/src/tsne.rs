//! t-distributed stochastic neighbor embedding.

use lowdim_core::backend::Backend;
use lowdim_core::error::SolverResult;
use lowdim_core::metric::Metric;
use lowdim_core::ops;
use lowdim_core::solver::SolveReport;
use lowdim_core::types::Scalar;
use nalgebra::DMatrix;

use crate::matcher::{AffinityMatcher, EmbeddingObjective};
use crate::sne::embedding_kernel;

/// KL divergence between a joint input affinity and the Cauchy
/// embedding kernel `q_ij = w_ij / sum w`, `w_ij = 1 / (1 + d_ij^2)`.
///
/// The heavy tail of the kernel is what keeps moderately distant pairs
/// from collapsing onto each other. The gradient with respect to row
/// `i` is `4 sum_j (p_ij - q_ij) w_ij (z_i - z_j)`, valid for
/// symmetric `p`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TsneObjective;

impl<T: Scalar> EmbeddingObjective<T> for TsneObjective {
    fn name(&self) -> &'static str {
        "t-sne"
    }

    fn loss_and_grad(
        &self,
        p: &DMatrix<T>,
        z: &DMatrix<T>,
        grad: &mut DMatrix<T>,
    ) -> SolverResult<T> {
        let (q, w) = embedding_kernel(z, |d2| T::one() / (T::one() + d2))?;
        let loss = ops::kl_divergence(p, &q)?;
        let four = <T as Scalar>::from_f64(4.0);
        grad.fill(T::zero());
        for i in 0..z.nrows() {
            for j in 0..z.nrows() {
                if i == j {
                    continue;
                }
                let coeff = four * (p[(i, j)] - q[(i, j)]) * w[(i, j)];
                for c in 0..z.ncols() {
                    grad[(i, c)] = grad[(i, c)] + coeff * (z[(i, c)] - z[(j, c)]);
                }
            }
        }
        Ok(loss)
    }
}

/// t-SNE estimator.
///
/// Calibrates an entropic affinity on the input, symmetrizes it into a
/// joint distribution and matches it with [`TsneObjective`] under the
/// configured [`AffinityMatcher`].
#[derive(Debug, Clone)]
pub struct Tsne<T: Scalar> {
    perplexity: T,
    n_components: usize,
    matcher: AffinityMatcher<T>,
    metric: Metric,
    backend: Backend,
}

impl<T: Scalar> Default for Tsne<T> {
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

impl<T: Scalar> Tsne<T> {
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
            "t-sne: matching {} samples into {} components",
            x.nrows(),
            self.n_components
        );
        self.matcher.fit(&TsneObjective, &p, x, self.n_components)
    }

    /// Embed `x` and return the coordinates.
    pub fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.fit(x)?.0)
    }
}
