//! Scalar-product (linear kernel) affinity.

use lowdim_core::affinity::Affinity;
use lowdim_core::error::SolverResult;
use lowdim_core::types::Scalar;
use lowdim_core::validation::validate_affinity_input;
use nalgebra::DMatrix;

/// Gram-matrix affinity `P = X X^T`, optionally on column-centered data.
///
/// Unlike the distance-based kernels this one keeps its diagonal: the
/// Gram matrix feeds spectral methods that need it positive
/// semi-definite.
#[derive(Debug, Clone, Default)]
pub struct ScalarProductAffinity {
    centered: bool,
}

impl ScalarProductAffinity {
    /// Plain Gram-matrix affinity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Center each feature column before forming the Gram matrix.
    pub fn with_centering(mut self, centered: bool) -> Self {
        self.centered = centered;
        self
    }
}

impl<T: Scalar> Affinity<T> for ScalarProductAffinity {
    fn name(&self) -> &'static str {
        "scalar product"
    }

    fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        validate_affinity_input(x)?;
        if self.centered {
            let n = x.nrows();
            let inv_n = T::one() / <T as Scalar>::from_usize(n);
            let mut centered = x.clone();
            for j in 0..x.ncols() {
                let mut mean = T::zero();
                for i in 0..n {
                    mean = mean + x[(i, j)];
                }
                mean = mean * inv_n;
                for i in 0..n {
                    centered[(i, j)] = centered[(i, j)] - mean;
                }
            }
            Ok(&centered * centered.transpose())
        } else {
            Ok(x * x.transpose())
        }
    }
}
