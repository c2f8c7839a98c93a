//! Cost-matrix evaluation backends.
//!
//! Affinity kernels are defined against a symmetric pairwise cost matrix;
//! this module decides how that matrix is evaluated. [`Backend::Dense`]
//! walks the rows directly. [`Backend::Tiled`] (feature `lazy`) evaluates
//! row blocks with SIMD accumulation and, under the `parallel` feature,
//! schedules the blocks across threads. The backends agree up to the
//! accumulation order of the lane sums.

mod dense;
#[cfg(feature = "lazy")]
pub mod simd;
#[cfg(feature = "lazy")]
mod tiled;

use crate::error::{DataError, Result};
use crate::metric::Metric;
use crate::types::{DMatrix, Scalar};

/// Default row-block width for the tiled backend.
#[cfg(feature = "lazy")]
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Strategy for evaluating pairwise cost matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backend {
    /// Straightforward dense evaluation.
    #[default]
    Dense,
    /// Blocked evaluation with SIMD accumulation; row blocks are
    /// distributed across threads when the `parallel` feature is on.
    #[cfg(feature = "lazy")]
    Tiled {
        /// Number of rows evaluated per block.
        block_size: usize,
    },
}

impl Backend {
    /// Tiled backend with the default block width.
    #[cfg(feature = "lazy")]
    pub fn tiled() -> Self {
        Self::Tiled {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Evaluate the symmetric pairwise cost matrix of the rows of `x`.
    ///
    /// Fails on inputs with no rows or no columns.
    pub fn pairwise<T: Scalar>(&self, x: &DMatrix<T>, metric: Metric) -> Result<DMatrix<T>> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(DataError::empty_input(format!(
                "cost matrix over a {}x{} input",
                x.nrows(),
                x.ncols()
            )));
        }
        match self {
            Self::Dense => Ok(dense::pairwise_dense(x, metric)),
            #[cfg(feature = "lazy")]
            Self::Tiled { block_size } => Ok(tiled::pairwise_tiled(x, metric, *block_size)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::pairwise_distances;
    use approx::assert_relative_eq;

    fn sample(n: usize, d: usize) -> DMatrix<f64> {
        // Deterministic but irregular entries.
        DMatrix::from_fn(n, d, |i, j| {
            let v = (i * d + j) as f64;
            (v * 0.37).sin() + 0.01 * v
        })
    }

    #[test]
    fn test_dense_matches_reference() {
        let x = sample(13, 4);
        for metric in [Metric::SquaredEuclidean, Metric::Euclidean, Metric::Manhattan] {
            let reference = pairwise_distances(&x, metric).unwrap();
            let dense = Backend::Dense.pairwise(&x, metric).unwrap();
            for (a, b) in dense.iter().zip(reference.iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        let x: DMatrix<f64> = DMatrix::zeros(0, 3);
        assert!(Backend::Dense.pairwise(&x, Metric::Euclidean).is_err());
    }

    #[cfg(feature = "lazy")]
    #[test]
    fn test_tiled_matches_dense_f64() {
        let x = sample(17, 5);
        for metric in [Metric::SquaredEuclidean, Metric::Euclidean, Metric::Manhattan] {
            let dense = Backend::Dense.pairwise(&x, metric).unwrap();
            for block_size in [1, 3, 64, 1000] {
                let tiled = Backend::Tiled { block_size }.pairwise(&x, metric).unwrap();
                for (a, b) in tiled.iter().zip(dense.iter()) {
                    assert_relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-12);
                }
            }
        }
    }

    #[cfg(feature = "lazy")]
    #[test]
    fn test_tiled_matches_dense_f32() {
        let x = sample(11, 9).map(|v| v as f32);
        for metric in [Metric::SquaredEuclidean, Metric::Euclidean, Metric::Manhattan] {
            let dense = Backend::Dense.pairwise(&x, metric).unwrap();
            let tiled = Backend::tiled().pairwise(&x, metric).unwrap();
            for (a, b) in tiled.iter().zip(dense.iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1e-5, max_relative = 1e-4);
            }
        }
    }

    #[cfg(feature = "lazy")]
    #[test]
    fn test_tiled_symmetric_zero_diagonal() {
        let x = sample(19, 3);
        let c = Backend::tiled().pairwise(&x, Metric::SquaredEuclidean).unwrap();
        for i in 0..19 {
            assert_eq!(c[(i, i)], 0.0);
            for j in 0..19 {
                assert_eq!(c[(i, j)], c[(j, i)]);
            }
        }
    }
}
