//! Ground metrics and pairwise distance matrices.
//!
//! Every affinity kernel starts from a symmetric cost matrix holding the
//! pairwise distances between samples (rows of the input). The squared
//! Euclidean distance is the default ground cost.

use crate::error::{DataError, Result};
use crate::types::{DMatrix, Scalar};
use num_traits::Float;

/// Ground metric used to build pairwise cost matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Metric {
    /// Squared Euclidean distance (the default ground cost).
    #[default]
    SquaredEuclidean,
    /// Euclidean distance.
    Euclidean,
    /// Manhattan (L1) distance.
    Manhattan,
}

impl Metric {
    /// Distance between the coordinate slices `a` and `b` under this metric.
    ///
    /// The slices must have equal length.
    pub fn slice_distance<T: Scalar>(&self, a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Self::SquaredEuclidean => sq_euclidean(a, b),
            Self::Euclidean => Float::sqrt(sq_euclidean(a, b)),
            Self::Manhattan => {
                let mut acc = T::zero();
                for (&x, &y) in a.iter().zip(b.iter()) {
                    acc = acc + Float::abs(x - y);
                }
                acc
            }
        }
    }

    /// Distance between rows `i` and `j` of `x` under this metric.
    pub fn row_distance<T: Scalar>(&self, x: &DMatrix<T>, i: usize, j: usize) -> T {
        let d = x.ncols();
        match self {
            Self::SquaredEuclidean => sq_euclidean_rows(x, i, j, d),
            Self::Euclidean => Float::sqrt(sq_euclidean_rows(x, i, j, d)),
            Self::Manhattan => {
                let mut acc = T::zero();
                for k in 0..d {
                    acc = acc + Float::abs(x[(i, k)] - x[(j, k)]);
                }
                acc
            }
        }
    }
}

fn sq_euclidean<T: Scalar>(a: &[T], b: &[T]) -> T {
    let mut acc = T::zero();
    for (&x, &y) in a.iter().zip(b.iter()) {
        let diff = x - y;
        acc = acc + diff * diff;
    }
    acc
}

fn sq_euclidean_rows<T: Scalar>(x: &DMatrix<T>, i: usize, j: usize, d: usize) -> T {
    let mut acc = T::zero();
    for k in 0..d {
        let diff = x[(i, k)] - x[(j, k)];
        acc = acc + diff * diff;
    }
    acc
}

/// Symmetric matrix of pairwise distances between the rows of `x`.
///
/// The diagonal is exactly zero. Returns an error for inputs with no rows
/// or no columns.
pub fn pairwise_distances<T: Scalar>(x: &DMatrix<T>, metric: Metric) -> Result<DMatrix<T>> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(DataError::empty_input(format!(
            "pairwise distances over a {}x{} matrix",
            x.nrows(),
            x.ncols()
        )));
    }
    let n = x.nrows();
    let mut costs = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.row_distance(x, i, j);
            costs[(i, j)] = d;
            costs[(j, i)] = d;
        }
    }
    Ok(costs)
}
