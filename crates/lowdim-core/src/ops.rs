//! Normalization and entropy utilities for affinity matrices.
//!
//! Linear-domain helpers operate on probability masses directly; the
//! `log_*` variants operate on matrices of log masses, with
//! [`Scalar::LOG_ZERO`] marking structural zeros.
//!
//! Entropies follow the convention `H(p) = -sum_j p_j (log p_j - 1)`,
//! which for a normalized row equals the Shannon entropy plus one. The
//! bandwidth calibration target `log(perplexity) + 1` uses the same
//! convention.

use crate::error::{DataError, Result};
use crate::stability::{log_sum_exp, safe_log};
use crate::types::{DMatrix, DVector, Scalar};
use num_traits::Float;

/// Sum of each row of `m`.
pub fn row_sums<T: Scalar>(m: &DMatrix<T>) -> DVector<T> {
    let mut out = DVector::zeros(m.nrows());
    for i in 0..m.nrows() {
        let mut acc = T::zero();
        for j in 0..m.ncols() {
            acc = acc + m[(i, j)];
        }
        out[i] = acc;
    }
    out
}

/// Sum of each column of `m`.
pub fn col_sums<T: Scalar>(m: &DMatrix<T>) -> DVector<T> {
    let mut out = DVector::zeros(m.ncols());
    for j in 0..m.ncols() {
        let mut acc = T::zero();
        for i in 0..m.nrows() {
            acc = acc + m[(i, j)];
        }
        out[j] = acc;
    }
    out
}

/// Sum of all entries of `m`.
pub fn total_sum<T: Scalar>(m: &DMatrix<T>) -> T {
    let mut acc = T::zero();
    for v in m.iter() {
        acc = acc + *v;
    }
    acc
}

/// Copy row `i` of `m` into a freshly allocated `Vec`.
///
/// Matrices are column-major, so rows are not contiguous; solvers that
/// work row-by-row buffer them through this helper.
pub fn row_to_vec<T: Scalar>(m: &DMatrix<T>, i: usize) -> Vec<T> {
    (0..m.ncols()).map(|k| m[(i, k)]).collect()
}

/// `log(sum_j exp(m[i, j]))` for each row `i`.
pub fn row_log_sum_exp<T: Scalar>(m: &DMatrix<T>) -> DVector<T> {
    let (n, d) = (m.nrows(), m.ncols());
    let mut out = DVector::zeros(n);
    let mut buf = vec![T::zero(); d];
    for i in 0..n {
        for k in 0..d {
            buf[k] = m[(i, k)];
        }
        out[i] = log_sum_exp(&buf);
    }
    out
}

/// `log(sum_i exp(m[i, j]))` for each column `j`.
pub fn col_log_sum_exp<T: Scalar>(m: &DMatrix<T>) -> DVector<T> {
    let (n, d) = (m.nrows(), m.ncols());
    let mut out = DVector::zeros(d);
    let mut buf = vec![T::zero(); n];
    for j in 0..d {
        for k in 0..n {
            buf[k] = m[(k, j)];
        }
        out[j] = log_sum_exp(&buf);
    }
    out
}

/// `log(sum_ij exp(m[i, j]))` over all entries.
pub fn total_log_sum_exp<T: Scalar>(m: &DMatrix<T>) -> T {
    let rows = row_log_sum_exp(m);
    let buf: Vec<T> = rows.iter().copied().collect();
    log_sum_exp(&buf)
}

/// Divide each row of `m` by its sum so rows sum to one.
///
/// Fails when a row has non-positive or non-finite mass.
pub fn normalize_rows<T: Scalar>(m: &DMatrix<T>) -> Result<DMatrix<T>> {
    let sums = row_sums(m);
    let mut out = m.clone();
    for i in 0..m.nrows() {
        let s = sums[i];
        if !Float::is_finite(s) || s <= T::zero() {
            return Err(DataError::numerical_error(format!(
                "row {i} has mass {s}, cannot normalize"
            )));
        }
        for j in 0..m.ncols() {
            out[(i, j)] = out[(i, j)] / s;
        }
    }
    Ok(out)
}

/// Divide each column of `m` by its sum so columns sum to one.
pub fn normalize_cols<T: Scalar>(m: &DMatrix<T>) -> Result<DMatrix<T>> {
    let sums = col_sums(m);
    let mut out = m.clone();
    for j in 0..m.ncols() {
        let s = sums[j];
        if !Float::is_finite(s) || s <= T::zero() {
            return Err(DataError::numerical_error(format!(
                "column {j} has mass {s}, cannot normalize"
            )));
        }
        for i in 0..m.nrows() {
            out[(i, j)] = out[(i, j)] / s;
        }
    }
    Ok(out)
}

/// Divide `m` by its total sum so all entries sum to one.
pub fn normalize_total<T: Scalar>(m: &DMatrix<T>) -> Result<DMatrix<T>> {
    let s = total_sum(m);
    if !Float::is_finite(s) || s <= T::zero() {
        return Err(DataError::numerical_error(format!(
            "matrix has total mass {s}, cannot normalize"
        )));
    }
    let mut out = m.clone();
    for v in out.iter_mut() {
        *v = *v / s;
    }
    Ok(out)
}

/// Subtract each row's log-sum-exp so rows sum to one in linear domain.
///
/// Fails when an entire row is masked to [`Scalar::LOG_ZERO`].
pub fn log_normalize_rows<T: Scalar>(log_m: &DMatrix<T>) -> Result<DMatrix<T>> {
    let lse = row_log_sum_exp(log_m);
    let mut out = log_m.clone();
    for i in 0..log_m.nrows() {
        if lse[i].is_log_zero() {
            return Err(DataError::numerical_error(format!(
                "row {i} has zero mass in log domain"
            )));
        }
        for j in 0..log_m.ncols() {
            if !out[(i, j)].is_log_zero() {
                out[(i, j)] = out[(i, j)] - lse[i];
            }
        }
    }
    Ok(out)
}

/// Subtract each column's log-sum-exp so columns sum to one in linear domain.
pub fn log_normalize_cols<T: Scalar>(log_m: &DMatrix<T>) -> Result<DMatrix<T>> {
    let lse = col_log_sum_exp(log_m);
    let mut out = log_m.clone();
    for j in 0..log_m.ncols() {
        if lse[j].is_log_zero() {
            return Err(DataError::numerical_error(format!(
                "column {j} has zero mass in log domain"
            )));
        }
        for i in 0..log_m.nrows() {
            if !out[(i, j)].is_log_zero() {
                out[(i, j)] = out[(i, j)] - lse[j];
            }
        }
    }
    Ok(out)
}

/// Subtract the global log-sum-exp so all entries sum to one in linear domain.
pub fn log_normalize_total<T: Scalar>(log_m: &DMatrix<T>) -> Result<DMatrix<T>> {
    let lse = total_log_sum_exp(log_m);
    if lse.is_log_zero() {
        return Err(DataError::numerical_error(
            "matrix has zero mass in log domain",
        ));
    }
    let mut out = log_m.clone();
    for v in out.iter_mut() {
        if !v.is_log_zero() {
            *v = *v - lse;
        }
    }
    Ok(out)
}

/// Entropy `-sum_j p_j (log p_j - 1)` of each row of a log-domain matrix.
///
/// Masked entries contribute nothing. For a row summing to one this is
/// the Shannon entropy plus one.
pub fn row_entropy_from_log<T: Scalar>(log_m: &DMatrix<T>) -> DVector<T> {
    let mut out = DVector::zeros(log_m.nrows());
    for i in 0..log_m.nrows() {
        let mut acc = T::zero();
        for j in 0..log_m.ncols() {
            let l = log_m[(i, j)];
            if !l.is_log_zero() {
                let p = Float::exp(l);
                acc = acc + p * (T::one() - l);
            }
        }
        out[i] = acc;
    }
    out
}

/// Kullback-Leibler divergence `sum_ij p_ij (log p_ij - log q_ij)`.
///
/// Entries where `p` is zero contribute nothing; entries where `q`
/// vanishes while `p` does not produce a very large finite value through
/// the [`safe_log`] mask.
pub fn kl_divergence<T: Scalar>(p: &DMatrix<T>, q: &DMatrix<T>) -> Result<T> {
    if p.shape() != q.shape() {
        return Err(DataError::dimension_mismatch(
            format!("{:?}", p.shape()),
            format!("{:?}", q.shape()),
        ));
    }
    let mut acc = T::zero();
    for (pv, qv) in p.iter().zip(q.iter()) {
        if *pv > T::zero() {
            acc = acc + *pv * (safe_log(*pv) - safe_log(*qv));
        }
    }
    Ok(acc)
}
