//! Blocked cost-matrix evaluation with SIMD accumulation.
//!
//! Rows are buffered contiguously once, then the output is filled one
//! row block at a time. Under the `parallel` feature the blocks are
//! scheduled across the rayon pool; each block owns a disjoint slice of
//! the row-major output buffer, so no synchronization is needed.

use super::simd::{abs_diff_sum, sq_diff_sum};
use crate::metric::Metric;
use crate::ops::row_to_vec;
use crate::types::{DMatrix, Scalar};
use num_traits::Float;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

fn slice_cost<T: Scalar>(a: &[T], b: &[T], metric: Metric) -> T {
    match metric {
        Metric::SquaredEuclidean => sq_diff_sum(a, b),
        Metric::Euclidean => Float::sqrt(sq_diff_sum(a, b)),
        Metric::Manhattan => abs_diff_sum(a, b),
    }
}

fn fill_block<T: Scalar>(
    first_row: usize,
    chunk: &mut [T],
    rows: &[Vec<T>],
    metric: Metric,
    n: usize,
) {
    for (r, row_out) in chunk.chunks_mut(n).enumerate() {
        let i = first_row + r;
        for (j, out) in row_out.iter_mut().enumerate() {
            *out = if i == j {
                T::zero()
            } else {
                slice_cost(&rows[i], &rows[j], metric)
            };
        }
    }
}

/// Evaluate the symmetric cost matrix in row blocks of `block_size`.
pub(crate) fn pairwise_tiled<T: Scalar>(
    x: &DMatrix<T>,
    metric: Metric,
    block_size: usize,
) -> DMatrix<T> {
    let n = x.nrows();
    let block = block_size.max(1);
    // Rows of a column-major matrix are strided; buffer them once so the
    // SIMD loads stay contiguous.
    let rows: Vec<Vec<T>> = (0..n).map(|i| row_to_vec(x, i)).collect();
    let mut out = vec![T::zero(); n * n];

    #[cfg(feature = "parallel")]
    out.par_chunks_mut(block * n)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            fill_block(chunk_idx * block, chunk, &rows, metric, n);
        });

    #[cfg(not(feature = "parallel"))]
    for (chunk_idx, chunk) in out.chunks_mut(block * n).enumerate() {
        fill_block(chunk_idx * block, chunk, &rows, metric, n);
    }

    DMatrix::from_row_slice(n, n, &out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_oversized_block() {
        let x = DMatrix::from_row_slice(3, 2, &[0.0_f64, 0.0, 3.0, 4.0, 1.0, 1.0]);
        let c = pairwise_tiled(&x, Metric::SquaredEuclidean, 100);
        assert_eq!(c[(0, 1)], 25.0);
        assert_eq!(c[(1, 0)], 25.0);
        assert_eq!(c[(2, 2)], 0.0);
    }

    #[test]
    fn test_block_size_zero_is_clamped() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0_f64, 2.0]);
        let c = pairwise_tiled(&x, Metric::Manhattan, 0);
        assert_eq!(c[(0, 1)], 2.0);
    }
}
