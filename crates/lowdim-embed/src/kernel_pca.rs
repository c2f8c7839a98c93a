//! Kernel PCA on top of an affinity matrix.

use std::cmp::Ordering;

use lowdim_core::affinity::Affinity;
use lowdim_core::error::{DataError, SolverResult};
use lowdim_core::types::Scalar;
use lowdim_core::validation::check_symmetric;
use nalgebra::{DMatrix, SymmetricEigen};
use num_traits::Float;

/// Spectral embedding of a symmetric affinity matrix.
///
/// The affinity is double-centered and eigendecomposed; coordinates are
/// the leading eigenvectors scaled by the square roots of their
/// eigenvalues. With a plain scalar-product affinity this reduces to
/// ordinary PCA.
#[derive(Debug, Clone)]
pub struct KernelPca<A> {
    affinity: A,
    n_components: usize,
}

impl<A> KernelPca<A> {
    /// Kernel PCA over `affinity` keeping `n_components` directions.
    pub fn new(affinity: A, n_components: usize) -> Self {
        Self {
            affinity,
            n_components,
        }
    }

    /// Embed the rows of `x`.
    pub fn fit_transform<T: Scalar>(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>>
    where
        A: Affinity<T>,
    {
        let kernel = self.affinity.fit_transform(x)?;
        let n = kernel.nrows();
        let k = self.n_components;
        if k == 0 || k > n {
            return Err(DataError::invalid_parameter(
                "n_components",
                format!("must lie in 1..={n} for {n} samples, got {k}"),
            )
            .into());
        }
        check_symmetric(&kernel, T::DEFAULT_TOLERANCE)?;

        // Double centering in feature space.
        let inv_n = T::one() / <T as Scalar>::from_usize(n);
        let mut row_mean = vec![T::zero(); n];
        let mut col_mean = vec![T::zero(); n];
        let mut total = T::zero();
        for j in 0..n {
            for i in 0..n {
                let v = kernel[(i, j)];
                row_mean[i] = row_mean[i] + v * inv_n;
                col_mean[j] = col_mean[j] + v * inv_n;
                total = total + v * inv_n * inv_n;
            }
        }
        let mut centered = kernel;
        for j in 0..n {
            for i in 0..n {
                centered[(i, j)] = centered[(i, j)] - row_mean[i] - col_mean[j] + total;
            }
        }

        let eigen = SymmetricEigen::new(centered);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            eigen.eigenvalues[b]
                .partial_cmp(&eigen.eigenvalues[a])
                .unwrap_or(Ordering::Equal)
        });

        let mut z = DMatrix::zeros(n, k);
        for (c, &idx) in order.iter().take(k).enumerate() {
            let lambda = eigen.eigenvalues[idx];
            // Tiny negative values are rounding noise; larger ones mean
            // the affinity was indefinite on this data.
            if lambda < -T::DEFAULT_TOLERANCE {
                log::warn!("kernel-pca: clipping negative eigenvalue {lambda} of component {c}");
            }
            let scale = Float::sqrt(Float::max(lambda, T::zero()));
            for i in 0..n {
                z[(i, c)] = eigen.eigenvectors[(i, idx)] * scale;
            }
        }
        Ok(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pca::Pca;
    use approx::assert_relative_eq;
    use lowdim_affinity::ScalarProductAffinity;
    use lowdim_core::dataset::two_moons;
    use lowdim_core::metric::{pairwise_distances, Metric};

    #[test]
    fn test_linear_kernel_reproduces_pca_geometry() {
        let x = two_moons::<f64>(20, 0.05, 31);
        let spectral = KernelPca::new(ScalarProductAffinity::new().with_centering(true), 2)
            .fit_transform(&x)
            .unwrap();
        let classical = Pca::new(2).fit_transform(&x).unwrap();

        // Coordinates agree up to per-axis sign, so compare pairwise
        // distances.
        let ds = pairwise_distances(&spectral, Metric::SquaredEuclidean).unwrap();
        let dc = pairwise_distances(&classical, Metric::SquaredEuclidean).unwrap();
        for (a, b) in ds.iter().zip(dc.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-7, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_output_shape_and_component_order() {
        let x = two_moons::<f64>(16, 0.05, 4);
        let z = KernelPca::new(ScalarProductAffinity::new().with_centering(true), 3)
            .fit_transform(&x)
            .unwrap();
        assert_eq!(z.shape(), (16, 3));

        // Leading columns carry at least as much energy as later ones.
        let energy = |c: usize| (0..16).map(|i| z[(i, c)] * z[(i, c)]).sum::<f64>();
        assert!(energy(0) >= energy(1));
        assert!(energy(1) >= energy(2));
    }

    #[test]
    fn test_component_count_validated() {
        let x = two_moons::<f64>(8, 0.05, 2);
        assert!(KernelPca::new(ScalarProductAffinity::new(), 0)
            .fit_transform(&x)
            .is_err());
        assert!(KernelPca::new(ScalarProductAffinity::new(), 9)
            .fit_transform(&x)
            .is_err());
    }
}
