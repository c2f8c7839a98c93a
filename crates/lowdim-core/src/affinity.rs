//! Affinity traits and marginal normalization modes.
//!
//! An affinity kernel maps an `n x d` sample matrix to an `n x n` matrix
//! of pairwise masses. Kernels that calibrate or solve in log space also
//! expose the log-domain matrix directly, with [`Scalar::LOG_ZERO`]
//! marking structural zeros such as a masked diagonal.

use crate::error::SolverResult;
use crate::types::{DMatrix, Scalar};

/// Which marginals of the affinity matrix are normalized to unit mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Normalization {
    /// Each row sums to one.
    #[default]
    Rows,
    /// Each column sums to one.
    Cols,
    /// The whole matrix sums to one.
    Both,
}

/// A kernel turning samples into a pairwise affinity matrix.
pub trait Affinity<T: Scalar> {
    /// Short kernel name used in log messages.
    fn name(&self) -> &'static str;

    /// Compute the affinity matrix of the rows of `x`.
    fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>>;
}

/// Affinities that can hand out their matrix in log domain.
pub trait LogAffinity<T: Scalar>: Affinity<T> {
    /// Compute the log-affinity matrix of the rows of `x`.
    fn fit_transform_log(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>>;
}
