//! Scalar root finding for kernel bandwidth calibration.
//!
//! Entropic calibration reduces to a one-dimensional root search on a
//! monotone residual (row entropy minus its target, as a function of the
//! bandwidth). The solvers here operate on a sign-changing bracket and
//! always report their best iterate, so callers can decide whether an
//! unconverged search is an error or merely a warning.

use crate::error::{SolverError, SolverResult};
use crate::types::Scalar;
use num_traits::Float;

/// Default cap on geometric bracket-expansion steps.
pub const MAX_BRACKET_EXPANSIONS: usize = 64;

/// Sign-changing interval `[lo, hi]` with `f(lo) < 0 < f(hi)`.
#[derive(Debug, Clone, Copy)]
pub struct Bracket<T> {
    /// Lower endpoint (negative residual).
    pub lo: T,
    /// Upper endpoint (positive residual).
    pub hi: T,
}

/// Outcome of a scalar root search.
#[derive(Debug, Clone, Copy)]
pub struct RootResult<T> {
    /// Iterate with the smallest absolute residual seen.
    pub root: T,
    /// Residual at [`RootResult::root`].
    pub residual: T,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the residual tolerance was met.
    pub converged: bool,
}

/// Root-finding strategy for monotone scalar residuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RootFinder {
    /// Interval halving. Robust, linear convergence.
    #[default]
    Bisection,
    /// Regula falsi with the Illinois modification to avoid one-sided
    /// stalling. Usually needs far fewer residual evaluations.
    FalsePosition,
}

/// Grow a geometric bracket around `seed` until `f(lo) < 0 < f(hi)`.
///
/// Assumes `f` is increasing. Endpoints move by factors of ten, at most
/// `max_expansions` times per side.
pub fn expand_bracket<T, F>(f: F, seed: T, max_expansions: usize) -> SolverResult<Bracket<T>>
where
    T: Scalar,
    F: Fn(T) -> T,
{
    if !(seed > T::zero()) || !Float::is_finite(seed) {
        return Err(SolverError::bracketing_failed(
            format!("bracket seed must be positive and finite, got {seed}"),
            0,
        ));
    }
    let ten = <T as Scalar>::from_f64(10.0);

    let mut lo = seed;
    let mut f_lo = f(lo);
    let mut steps = 0;
    while f_lo >= T::zero() {
        if steps == max_expansions {
            return Err(SolverError::bracketing_failed(
                format!("no lower endpoint with negative residual below {lo}"),
                steps,
            ));
        }
        lo = lo / ten;
        f_lo = f(lo);
        steps += 1;
    }
    if !Float::is_finite(f_lo) {
        return Err(SolverError::bracketing_failed(
            format!("non-finite residual at lower endpoint {lo}"),
            steps,
        ));
    }

    let mut hi = seed;
    let mut f_hi = f(hi);
    while f_hi <= T::zero() {
        if steps == max_expansions * 2 {
            return Err(SolverError::bracketing_failed(
                format!("no upper endpoint with positive residual above {hi}"),
                steps,
            ));
        }
        hi = hi * ten;
        f_hi = f(hi);
        steps += 1;
    }
    if !Float::is_finite(f_hi) {
        return Err(SolverError::bracketing_failed(
            format!("non-finite residual at upper endpoint {hi}"),
            steps,
        ));
    }

    Ok(Bracket { lo, hi })
}

impl RootFinder {
    /// Search `bracket` for a root of `f`, stopping when the absolute
    /// residual drops to `tol` or the interval collapses.
    ///
    /// Hitting `max_iter` is not an error: the result carries the best
    /// iterate with `converged == false` so the caller can decide how to
    /// react. A bracket whose residuals do not straddle zero is rejected.
    pub fn find_root<T, F>(
        &self,
        f: F,
        bracket: Bracket<T>,
        tol: T,
        max_iter: usize,
    ) -> SolverResult<RootResult<T>>
    where
        T: Scalar,
        F: Fn(T) -> T,
    {
        let half = <T as Scalar>::from_f64(0.5);
        let mut lo = bracket.lo;
        let mut hi = bracket.hi;
        if !(lo < hi) {
            return Err(SolverError::bracketing_failed(
                format!("bracket endpoints out of order: [{lo}, {hi}]"),
                0,
            ));
        }
        let mut f_lo = f(lo);
        let mut f_hi = f(hi);
        if !(f_lo < T::zero() && f_hi > T::zero()) {
            return Err(SolverError::bracketing_failed(
                format!("residuals do not straddle zero: f(lo)={f_lo}, f(hi)={f_hi}"),
                0,
            ));
        }

        let (mut best, mut best_res) = if Float::abs(f_lo) <= Float::abs(f_hi) {
            (lo, f_lo)
        } else {
            (hi, f_hi)
        };
        // +1 when the last replacement hit the upper endpoint, -1 for the
        // lower one; drives the Illinois residual halving.
        let mut last_side = 0_i8;
        let mut performed = 0;

        for it in 1..=max_iter {
            performed = it;
            let mut mid = match self {
                Self::Bisection => half * (lo + hi),
                Self::FalsePosition => lo - f_lo * (hi - lo) / (f_hi - f_lo),
            };
            if !(mid > lo && mid < hi) {
                mid = half * (lo + hi);
            }
            let f_mid = f(mid);
            if !Float::is_finite(f_mid) {
                return Err(SolverError::non_finite_iterate(it));
            }
            if Float::abs(f_mid) < Float::abs(best_res) {
                best = mid;
                best_res = f_mid;
            }
            if Float::abs(f_mid) <= tol {
                return Ok(RootResult {
                    root: mid,
                    residual: f_mid,
                    iterations: it,
                    converged: true,
                });
            }
            if f_mid < T::zero() {
                lo = mid;
                f_lo = f_mid;
                if matches!(self, Self::FalsePosition) && last_side == -1 {
                    f_hi = f_hi * half;
                }
                last_side = -1;
            } else {
                hi = mid;
                f_hi = f_mid;
                if matches!(self, Self::FalsePosition) && last_side == 1 {
                    f_lo = f_lo * half;
                }
                last_side = 1;
            }
            if hi - lo <= T::EPSILON * Float::max(Float::abs(lo), Float::abs(hi)) {
                break;
            }
        }

        Ok(RootResult {
            root: best,
            residual: best_res,
            iterations: performed,
            converged: Float::abs(best_res) <= tol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_bisection_quadratic() {
        let f = |x: f64| x * x - 4.0;
        let bracket = Bracket { lo: 0.5, hi: 10.0 };
        let res = RootFinder::Bisection
            .find_root(f, bracket, 1e-10, 200)
            .unwrap();
        assert!(res.converged);
        assert_relative_eq!(res.root, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_false_position_quadratic() {
        let f = |x: f64| x * x - 4.0;
        let bracket = Bracket { lo: 0.5, hi: 10.0 };
        let res = RootFinder::FalsePosition
            .find_root(f, bracket, 1e-10, 200)
            .unwrap();
        assert!(res.converged);
        assert_relative_eq!(res.root, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_false_position_cubic() {
        let f = |x: f64| x * x * x - x - 2.0;
        let bracket = Bracket { lo: 1.0, hi: 2.0 };
        let res = RootFinder::FalsePosition
            .find_root(f, bracket, 1e-12, 500)
            .unwrap();
        assert!(res.converged);
        assert_relative_eq!(res.root, 1.521_379_706_804_567_7, epsilon = 1e-8);
    }

    #[test]
    fn test_expand_bracket_log() {
        let bracket = expand_bracket(|x: f64| x.ln(), 5.0, MAX_BRACKET_EXPANSIONS).unwrap();
        assert!(bracket.lo < 1.0);
        assert!(bracket.hi >= 5.0);
        assert!(bracket.lo.ln() < 0.0);
        assert!(bracket.hi.ln() > 0.0);
    }

    #[test]
    fn test_expand_bracket_no_sign_change() {
        let err = expand_bracket(|x: f64| x.abs() + 1.0, 1.0, 8);
        assert!(matches!(err, Err(SolverError::BracketingFailed { .. })));
    }

    #[test]
    fn test_expand_bracket_invalid_seed() {
        assert!(expand_bracket(|x: f64| x, -1.0, 8).is_err());
        assert!(expand_bracket(|x: f64| x, 0.0, 8).is_err());
        assert!(expand_bracket(|x: f64| x, f64::NAN, 8).is_err());
    }

    #[test]
    fn test_invalid_bracket_rejected() {
        // Both residuals positive.
        let f = |x: f64| x + 10.0;
        let bracket = Bracket { lo: 1.0, hi: 2.0 };
        assert!(RootFinder::Bisection.find_root(f, bracket, 1e-8, 50).is_err());
    }

    #[test]
    fn test_unconverged_returns_best_iterate() {
        let f = |x: f64| x - 3.0;
        let bracket = Bracket { lo: 0.1, hi: 1000.0 };
        let res = RootFinder::Bisection.find_root(f, bracket, 1e-14, 2).unwrap();
        assert!(!res.converged);
        assert!(res.root.is_finite());
        assert!(res.residual.abs() < 1000.0);
    }

    #[test]
    fn test_f32_calibration() {
        let f = |x: f32| x * x - 2.0;
        let bracket = Bracket {
            lo: 0.5_f32,
            hi: 4.0,
        };
        let res = RootFinder::FalsePosition
            .find_root(f, bracket, 1e-5, 100)
            .unwrap();
        assert!(res.converged);
        assert_relative_eq!(res.root, std::f32::consts::SQRT_2, epsilon = 1e-3);
    }

    proptest! {
        #[test]
        fn prop_expand_then_solve_linear(c in 1e-3_f64..1e3) {
            let f = move |x: f64| x - c;
            let bracket = expand_bracket(f, 1.0, MAX_BRACKET_EXPANSIONS).unwrap();
            let res = RootFinder::FalsePosition
                .find_root(f, bracket, 1e-10, 500)
                .unwrap();
            prop_assert!(res.converged);
            prop_assert!((res.root - c).abs() <= 1e-6 * c.max(1.0));
        }

        #[test]
        fn prop_root_stays_inside_bracket(c in -5.0_f64..5.0) {
            let f = move |x: f64| (x - c).tanh();
            let bracket = Bracket { lo: c - 7.0, hi: c + 9.0 };
            let res = RootFinder::Bisection.find_root(f, bracket, 1e-9, 300).unwrap();
            prop_assert!(res.root >= bracket.lo && res.root <= bracket.hi);
            prop_assert!((res.root - c).abs() < 1e-6);
        }
    }
}
