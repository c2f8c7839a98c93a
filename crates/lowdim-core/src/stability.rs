//! Numerically stable primitives for log-domain kernel computation.
//!
//! Affinity matrices are assembled in log space wherever possible; the
//! helpers here keep that arithmetic free of infinities and NaNs.

use crate::types::Scalar;
use num_traits::Float;

/// Logarithm that maps non-positive inputs to the finite [`Scalar::LOG_ZERO`]
/// mask instead of `-inf` or NaN.
pub fn safe_log<T: Scalar>(x: T) -> T {
    if x > T::zero() {
        Float::ln(x)
    } else {
        T::LOG_ZERO
    }
}

/// Exponential with the argument clipped to [`Scalar::MAX_EXP_ARG`].
///
/// Large arguments saturate to a finite value instead of overflowing to
/// `inf`; arguments at or below [`Scalar::LOG_ZERO`] underflow to zero.
pub fn clipped_exp<T: Scalar>(x: T) -> T {
    Float::exp(clip_value(x, T::LOG_ZERO, T::MAX_EXP_ARG))
}

/// Stable `log(sum_i exp(values[i]))` using the max-shift trick.
///
/// Entries at [`Scalar::LOG_ZERO`] act as structural zeros. Returns
/// `LOG_ZERO` for an empty slice or when every entry is masked.
pub fn log_sum_exp<T: Scalar>(values: &[T]) -> T {
    let mut max = T::LOG_ZERO;
    for &v in values {
        if v > max {
            max = v;
        }
    }
    if values.is_empty() || max.is_log_zero() {
        return T::LOG_ZERO;
    }
    let mut sum = T::zero();
    for &v in values {
        sum = sum + Float::exp(v - max);
    }
    max + Float::ln(sum)
}

/// Division with the denominator magnitude clamped away from zero.
///
/// Denominators smaller than `eps` in absolute value are replaced by
/// `eps` with the denominator's sign (zero counts as positive).
pub fn safe_divide<T: Scalar>(num: T, den: T, eps: T) -> T {
    if Float::abs(den) >= eps {
        num / den
    } else if den < T::zero() {
        -num / eps
    } else {
        num / eps
    }
}

/// Clamp `x` into the inclusive range `[lo, hi]`.
pub fn clip_value<T: Scalar>(x: T, lo: T, hi: T) -> T {
    debug_assert!(lo <= hi);
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_safe_log_positive() {
        assert_relative_eq!(safe_log(1.0_f64), 0.0);
        assert_relative_eq!(safe_log(std::f64::consts::E), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_safe_log_non_positive() {
        assert_eq!(safe_log(0.0_f64), <f64 as Scalar>::LOG_ZERO);
        assert_eq!(safe_log(-3.0_f64), <f64 as Scalar>::LOG_ZERO);
        assert!(safe_log(0.0_f32).is_finite());
    }

    #[test]
    fn test_clipped_exp() {
        assert_relative_eq!(clipped_exp(0.0_f64), 1.0);
        assert!(clipped_exp(1e6_f64).is_finite());
        assert_eq!(clipped_exp(<f64 as Scalar>::LOG_ZERO), 0.0);
    }

    #[test]
    fn test_log_sum_exp_small_values() {
        let vals = [0.0_f64, 0.0, 0.0, 0.0];
        assert_relative_eq!(log_sum_exp(&vals), 4.0_f64.ln(), epsilon = 1e-12);

        let vals = [1.0_f64, 2.0, 3.0];
        let naive = (1.0_f64.exp() + 2.0_f64.exp() + 3.0_f64.exp()).ln();
        assert_relative_eq!(log_sum_exp(&vals), naive, epsilon = 1e-12);
    }

    #[test]
    fn test_log_sum_exp_extreme_values() {
        // Naive summation would overflow here.
        let vals = [1000.0_f64, 1000.0];
        assert_relative_eq!(log_sum_exp(&vals), 1000.0 + 2.0_f64.ln(), epsilon = 1e-9);

        let vals = [-1000.0_f64, -1000.0];
        assert_relative_eq!(log_sum_exp(&vals), -1000.0 + 2.0_f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_log_sum_exp_masked_entries() {
        let lz = <f64 as Scalar>::LOG_ZERO;
        let vals = [lz, 0.0, lz, 0.0];
        assert_relative_eq!(log_sum_exp(&vals), 2.0_f64.ln(), epsilon = 1e-12);

        let vals = [lz, lz];
        assert_eq!(log_sum_exp(&vals), lz);

        let vals: [f64; 0] = [];
        assert_eq!(log_sum_exp(&vals), lz);
    }

    #[test]
    fn test_safe_divide() {
        assert_relative_eq!(safe_divide(6.0_f64, 2.0, 1e-12), 3.0);
        assert_relative_eq!(safe_divide(1.0_f64, 0.0, 1e-6), 1e6, epsilon = 1e-3);
        assert_relative_eq!(safe_divide(1.0_f64, -1e-12, 1e-6), -1e6, epsilon = 1e-3);
    }

    #[test]
    fn test_clip_value() {
        assert_eq!(clip_value(5.0_f64, 0.0, 1.0), 1.0);
        assert_eq!(clip_value(-5.0_f64, 0.0, 1.0), 0.0);
        assert_eq!(clip_value(0.5_f64, 0.0, 1.0), 0.5);
    }

    proptest! {
        #[test]
        fn prop_log_sum_exp_dominates_max(vals in prop::collection::vec(-50.0_f64..50.0, 1..40)) {
            let lse = log_sum_exp(&vals);
            let max = vals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(lse >= max - 1e-12);
            prop_assert!(lse <= max + (vals.len() as f64).ln() + 1e-12);
        }

        #[test]
        fn prop_log_sum_exp_shift_invariant(
            vals in prop::collection::vec(-50.0_f64..50.0, 1..40),
            shift in -100.0_f64..100.0,
        ) {
            let base = log_sum_exp(&vals);
            let shifted: Vec<f64> = vals.iter().map(|v| v + shift).collect();
            prop_assert!((log_sum_exp(&shifted) - (base + shift)).abs() < 1e-9);
        }
    }
}
