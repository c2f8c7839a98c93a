//! Dense cost-matrix evaluation.

use crate::metric::Metric;
use crate::types::{DMatrix, Scalar};

/// Evaluate the full symmetric cost matrix row by row.
///
/// The upper triangle is computed and mirrored; the diagonal stays zero.
pub(crate) fn pairwise_dense<T: Scalar>(x: &DMatrix<T>, metric: Metric) -> DMatrix<T> {
    let n = x.nrows();
    let mut costs = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.row_distance(x, i, j);
            costs[(i, j)] = d;
            costs[(j, i)] = d;
        }
    }
    costs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_points() {
        let x = DMatrix::from_row_slice(2, 2, &[0.0_f64, 0.0, 3.0, 4.0]);
        let c = pairwise_dense(&x, Metric::Euclidean);
        assert_eq!(c[(0, 1)], 5.0);
        assert_eq!(c[(1, 0)], 5.0);
        assert_eq!(c[(0, 0)], 0.0);
    }
}
