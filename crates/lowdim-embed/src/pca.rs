//! Principal component analysis.

use lowdim_core::error::{DataError, Result};
use lowdim_core::types::Scalar;
use lowdim_core::validation::check_finite;
use nalgebra::{DMatrix, DVector, SVD};

/// Linear projection onto the directions of largest variance.
///
/// Used both as an estimator in its own right and as the default
/// initialization of the neighbor embeddings.
#[derive(Debug, Clone, Copy)]
pub struct Pca {
    n_components: usize,
}

impl Pca {
    /// PCA keeping `n_components` directions.
    pub fn new(n_components: usize) -> Self {
        Self { n_components }
    }

    /// Fit the projection on the rows of `x`.
    pub fn fit<T: Scalar>(&self, x: &DMatrix<T>) -> Result<FittedPca<T>> {
        let (n, d) = x.shape();
        if n == 0 || d == 0 {
            return Err(DataError::empty_input(format!(
                "sample matrix of shape ({n}, {d})"
            )));
        }
        let k = self.n_components;
        if k == 0 || k > d.min(n) {
            return Err(DataError::invalid_parameter(
                "n_components",
                format!("must lie in 1..={} for a {n}x{d} input, got {k}", d.min(n)),
            ));
        }
        check_finite(x, "sample matrix")?;

        let mut mean = DVector::zeros(d);
        for j in 0..d {
            let mut acc = T::zero();
            for i in 0..n {
                acc = acc + x[(i, j)];
            }
            mean[j] = acc / <T as Scalar>::from_usize(n);
        }
        let mut centered = x.clone();
        for j in 0..d {
            for i in 0..n {
                centered[(i, j)] = centered[(i, j)] - mean[j];
            }
        }

        // Singular values come out in decreasing order, so the first k
        // right singular vectors are the principal directions.
        let svd = SVD::new(centered, false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| DataError::numerical_error("SVD failed to compute V^T"))?;
        let components: DMatrix<T> = v_t.transpose().columns(0, k).into();

        let denom = <T as Scalar>::from_usize((n - 1).max(1));
        let mut explained_variance = DVector::zeros(k);
        for i in 0..k {
            let s = svd.singular_values[i];
            explained_variance[i] = s * s / denom;
        }

        Ok(FittedPca {
            components,
            mean,
            explained_variance,
        })
    }

    /// Fit on `x` and project it in one call.
    pub fn fit_transform<T: Scalar>(&self, x: &DMatrix<T>) -> Result<DMatrix<T>> {
        self.fit(x)?.transform(x)
    }
}

/// A fitted PCA projection.
#[derive(Debug, Clone)]
pub struct FittedPca<T: Scalar> {
    components: DMatrix<T>,
    mean: DVector<T>,
    explained_variance: DVector<T>,
}

impl<T: Scalar> FittedPca<T> {
    /// Principal directions as the columns of a `d x k` matrix.
    pub fn components(&self) -> &DMatrix<T> {
        &self.components
    }

    /// Per-feature mean of the training data.
    pub fn mean(&self) -> &DVector<T> {
        &self.mean
    }

    /// Variance carried by each principal direction, in decreasing
    /// order.
    pub fn explained_variance(&self) -> &DVector<T> {
        &self.explained_variance
    }

    /// Project the rows of `x` onto the principal directions.
    pub fn transform(&self, x: &DMatrix<T>) -> Result<DMatrix<T>> {
        if x.ncols() != self.mean.len() {
            return Err(DataError::dimension_mismatch(
                format!("{} features", self.mean.len()),
                format!("{} features", x.ncols()),
            ));
        }
        let mut centered = x.clone();
        for j in 0..x.ncols() {
            for i in 0..x.nrows() {
                centered[(i, j)] = centered[(i, j)] - self.mean[j];
            }
        }
        Ok(&centered * &self.components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_data() -> DMatrix<f64> {
        // Points on y = 2x with a little off-axis jitter.
        DMatrix::from_row_slice(
            5,
            2,
            &[
                -2.0, -4.01, -1.0, -1.99, 0.0, 0.02, 1.0, 2.01, 2.0, 3.98,
            ],
        )
    }

    #[test]
    fn test_first_component_follows_the_line() {
        let fitted = Pca::new(1).fit(&line_data()).unwrap();
        let c = fitted.components();
        assert_eq!(c.shape(), (2, 1));
        // Direction (1, 2)/sqrt(5), up to sign.
        let ratio = c[(1, 0)] / c[(0, 0)];
        assert_relative_eq!(ratio, 2.0, epsilon = 0.05);
    }

    #[test]
    fn test_explained_variance_is_decreasing() {
        let fitted = Pca::new(2).fit(&line_data()).unwrap();
        let ev = fitted.explained_variance();
        assert!(ev[0] > ev[1]);
        assert!(ev[1] >= 0.0);
        // Nearly all variance sits on the line.
        assert!(ev[0] / (ev[0] + ev[1]) > 0.99);
    }

    #[test]
    fn test_full_rank_reconstruction() {
        let x = line_data();
        let fitted = Pca::new(2).fit(&x).unwrap();
        let scores = fitted.transform(&x).unwrap();
        let reconstructed = &scores * fitted.components().transpose();
        for j in 0..2 {
            for i in 0..5 {
                let back = reconstructed[(i, j)] + fitted.mean()[j];
                assert_relative_eq!(back, x[(i, j)], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_low_rank_data_reconstructs_exactly() {
        // Rank-2 data in five dimensions.
        let basis = DMatrix::from_row_slice(
            2,
            5,
            &[1.0, 0.5, -0.3, 0.0, 2.0, 0.0, 1.0, 0.7, -1.0, 0.4],
        );
        let coeffs = DMatrix::from_fn(12, 2, |i, j| ((i * 2 + j) as f64 * 0.71).sin());
        let x = &coeffs * &basis;
        let fitted = Pca::new(2).fit(&x).unwrap();
        let scores = fitted.transform(&x).unwrap();
        let reconstructed = &scores * fitted.components().transpose();
        for j in 0..5 {
            for i in 0..12 {
                let back = reconstructed[(i, j)] + fitted.mean()[j];
                assert_relative_eq!(back, x[(i, j)], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_scores_are_centered() {
        let scores = Pca::new(2).fit_transform(&line_data()).unwrap();
        for j in 0..2 {
            let mut acc = 0.0;
            for i in 0..5 {
                acc += scores[(i, j)];
            }
            assert_relative_eq!(acc / 5.0, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_invalid_component_counts() {
        let x = line_data();
        assert!(Pca::new(0).fit(&x).is_err());
        assert!(Pca::new(3).fit(&x).is_err());
    }

    #[test]
    fn test_transform_shape_mismatch() {
        let fitted = Pca::new(1).fit(&line_data()).unwrap();
        let other = DMatrix::from_element(4, 3, 1.0);
        assert!(fitted.transform(&other).is_err());
    }
}
