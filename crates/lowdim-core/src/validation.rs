//! Structural checks on inputs and computed affinity matrices.
//!
//! These predicates return a [`DataError`] describing the first violation
//! they find. The affinity kernels use them to validate inputs; the test
//! suites lean on them to assert marginals, symmetry and entropy targets.

use crate::error::{DataError, Result};
use crate::ops::{col_sums, row_entropy_from_log, row_sums, total_sum};
use crate::types::{DMatrix, DVector, Scalar};
use num_traits::Float;

/// Every entry of `m` must be finite.
pub fn check_finite<T: Scalar>(m: &DMatrix<T>, context: &str) -> Result<()> {
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            if !Float::is_finite(m[(i, j)]) {
                return Err(DataError::non_finite(format!("{context} at ({i}, {j})")));
            }
        }
    }
    Ok(())
}

/// `m` must be exactly `nrows x ncols`.
pub fn check_shape<T: Scalar>(m: &DMatrix<T>, nrows: usize, ncols: usize) -> Result<()> {
    if m.nrows() != nrows || m.ncols() != ncols {
        return Err(DataError::dimension_mismatch(
            format!("({nrows}, {ncols})"),
            format!("({}, {})", m.nrows(), m.ncols()),
        ));
    }
    Ok(())
}

/// `m` must be square.
pub fn check_square<T: Scalar>(m: &DMatrix<T>) -> Result<()> {
    if m.nrows() != m.ncols() {
        return Err(DataError::dimension_mismatch(
            "square matrix",
            format!("({}, {})", m.nrows(), m.ncols()),
        ));
    }
    Ok(())
}

/// Entries of `m` must be at least `-tol`.
pub fn check_nonnegative<T: Scalar>(m: &DMatrix<T>, tol: T) -> Result<()> {
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            if m[(i, j)] < -tol {
                return Err(DataError::check_failed(
                    "nonnegativity",
                    format!("entry ({i}, {j}) is {}", m[(i, j)]),
                ));
            }
        }
    }
    Ok(())
}

/// `m` must be square and equal to its transpose within `tol`.
pub fn check_symmetric<T: Scalar>(m: &DMatrix<T>, tol: T) -> Result<()> {
    check_square(m)?;
    for i in 0..m.nrows() {
        for j in (i + 1)..m.ncols() {
            let dev = Float::abs(m[(i, j)] - m[(j, i)]);
            if dev > tol {
                return Err(DataError::check_failed(
                    "symmetry",
                    format!("entries ({i}, {j}) and ({j}, {i}) differ by {dev}"),
                ));
            }
        }
    }
    Ok(())
}

/// Row sums of `m` must match `target` within `tol`.
pub fn check_row_sums<T: Scalar>(m: &DMatrix<T>, target: &DVector<T>, tol: T) -> Result<()> {
    if target.len() != m.nrows() {
        return Err(DataError::dimension_mismatch(
            format!("target of length {}", m.nrows()),
            format!("length {}", target.len()),
        ));
    }
    let sums = row_sums(m);
    for i in 0..m.nrows() {
        let dev = Float::abs(sums[i] - target[i]);
        if dev > tol {
            return Err(DataError::check_failed(
                "row sums",
                format!("row {i} sums to {} instead of {}", sums[i], target[i]),
            ));
        }
    }
    Ok(())
}

/// Column sums of `m` must match `target` within `tol`.
pub fn check_col_sums<T: Scalar>(m: &DMatrix<T>, target: &DVector<T>, tol: T) -> Result<()> {
    if target.len() != m.ncols() {
        return Err(DataError::dimension_mismatch(
            format!("target of length {}", m.ncols()),
            format!("length {}", target.len()),
        ));
    }
    let sums = col_sums(m);
    for j in 0..m.ncols() {
        let dev = Float::abs(sums[j] - target[j]);
        if dev > tol {
            return Err(DataError::check_failed(
                "column sums",
                format!("column {j} sums to {} instead of {}", sums[j], target[j]),
            ));
        }
    }
    Ok(())
}

/// The total mass of `m` must match `target` within `tol`.
pub fn check_total_sum<T: Scalar>(m: &DMatrix<T>, target: T, tol: T) -> Result<()> {
    let s = total_sum(m);
    if Float::abs(s - target) > tol {
        return Err(DataError::check_failed(
            "total sum",
            format!("total mass is {s} instead of {target}"),
        ));
    }
    Ok(())
}

/// Row entropies of the log-domain matrix `log_m` must match `target`
/// within a relative tolerance of `tol`.
pub fn check_row_entropies<T: Scalar>(
    log_m: &DMatrix<T>,
    target: &DVector<T>,
    tol: T,
) -> Result<()> {
    if target.len() != log_m.nrows() {
        return Err(DataError::dimension_mismatch(
            format!("target of length {}", log_m.nrows()),
            format!("length {}", target.len()),
        ));
    }
    let entropies = row_entropy_from_log(log_m);
    for i in 0..log_m.nrows() {
        let scale = Float::max(T::one(), Float::abs(target[i]));
        let dev = Float::abs(entropies[i] - target[i]);
        if dev > tol * scale {
            return Err(DataError::check_failed(
                "row entropies",
                format!("row {i} has entropy {} instead of {}", entropies[i], target[i]),
            ));
        }
    }
    Ok(())
}

/// Validate a sample matrix before any affinity computation.
///
/// Requires at least two samples, at least one feature, and finite
/// entries throughout.
pub fn validate_affinity_input<T: Scalar>(x: &DMatrix<T>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(DataError::empty_input(format!(
            "sample matrix of shape ({}, {})",
            x.nrows(),
            x.ncols()
        )));
    }
    if x.nrows() < 2 {
        return Err(DataError::invalid_parameter(
            "x",
            "affinity computation requires at least two samples",
        ));
    }
    check_finite(x, "sample matrix")
}
