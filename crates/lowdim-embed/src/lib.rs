//! Embedding estimators for dimensionality reduction.
//!
//! Spectral estimators project samples onto a few leading directions:
//! [`Pca`] on the covariance, [`KernelPca`] on any [`lowdim_affinity`]
//! kernel. Neighbor estimators instead calibrate an entropic affinity
//! on the input and descend a divergence between it and an embedding
//! kernel: [`Sne`] with a Gaussian kernel, [`Tsne`] with the
//! heavy-tailed Cauchy kernel. The descent schedule (early
//! exaggeration, momentum switch, learning-rate heuristic) lives in
//! [`AffinityMatcher`] and accepts any [`EmbeddingObjective`].
//!
//! # Example
//!
//! ```
//! use lowdim_core::dataset::two_moons;
//! use lowdim_embed::Tsne;
//!
//! let x = two_moons::<f64>(40, 0.05, 7);
//! let embedding = Tsne::new().with_perplexity(8.0).fit_transform(&x)?;
//! assert_eq!(embedding.shape(), (40, 2));
//! # Ok::<(), lowdim_core::error::SolverError>(())
//! ```

mod kernel_pca;
mod matcher;
mod pca;
mod sne;
mod tsne;

pub use kernel_pca::KernelPca;
pub use matcher::{AffinityMatcher, EmbeddingObjective, Initialization};
pub use pca::{FittedPca, Pca};
pub use sne::{Sne, SneObjective};
pub use tsne::{Tsne, TsneObjective};

use lowdim_affinity::{Affinity, EntropicAffinity};
use lowdim_core::backend::Backend;
use lowdim_core::error::SolverResult;
use lowdim_core::metric::Metric;
use lowdim_core::types::{DMatrix, Scalar};

/// Joint input affinity of the neighbor embeddings.
///
/// Calibrates the entropic affinity at the given perplexity, then turns
/// the row-stochastic result into a symmetric joint distribution
/// `(P + P^T) / 2n` with an exactly zero diagonal and unit total mass.
pub(crate) fn joint_input_affinity<T: Scalar>(
    x: &DMatrix<T>,
    perplexity: T,
    metric: Metric,
    backend: Backend,
) -> SolverResult<DMatrix<T>> {
    let entropic = EntropicAffinity::new()
        .with_perplexity(perplexity)
        .with_metric(metric)
        .with_backend(backend);
    let p = entropic.fit_transform(x)?;
    let n = p.nrows();
    let scale = <T as Scalar>::from_usize(2 * n);
    let mut joint = DMatrix::zeros(n, n);
    for j in 0..n {
        for i in 0..n {
            if i != j {
                joint[(i, j)] = (p[(i, j)] + p[(j, i)]) / scale;
            }
        }
    }
    Ok(joint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lowdim_core::dataset::two_moons;
    use lowdim_core::ops::total_sum;
    use lowdim_core::validation::check_symmetric;

    #[test]
    fn test_joint_affinity_is_a_symmetric_distribution() {
        let x = two_moons::<f64>(25, 0.05, 31);
        let p = joint_input_affinity(&x, 5.0, Metric::default(), Backend::default()).unwrap();
        check_symmetric(&p, 0.0).unwrap();
        assert_relative_eq!(total_sum(&p), 1.0, epsilon = 1e-10);
        for i in 0..25 {
            assert_eq!(p[(i, i)], 0.0);
        }
    }
}
