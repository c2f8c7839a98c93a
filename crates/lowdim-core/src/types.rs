//! Type definitions and aliases for affinity computation.
//!
//! This module provides common type aliases, the scalar trait abstracting
//! over `f32`/`f64`, and numeric constants used throughout the library.

use nalgebra::{Const, Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in affinity and embedding computations
/// (f32 or f64).
///
/// This trait combines all the necessary numeric traits required for the
/// log-domain kernels and iterative solvers in this library, together with
/// the precision-dependent constants they rely on.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// SIMD lane bundle used by the tiled backend.
    #[cfg(feature = "lazy")]
    type Lanes: crate::backend::simd::SimdLanes<Scalar = Self>;

    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance for convergence checks.
    const DEFAULT_TOLERANCE: Self;

    /// Default tolerance on the entropy residual of bandwidth calibration.
    const ENTROPY_TOLERANCE: Self;

    /// Finite stand-in for `log(0)` in log-domain affinity matrices.
    ///
    /// Chosen so that `exp(LOG_ZERO)` underflows to exactly `0.0` while the
    /// value itself stays representable and propagates through arithmetic
    /// without producing infinities.
    const LOG_ZERO: Self;

    /// Smallest admissible kernel bandwidth.
    const MIN_BANDWIDTH: Self;

    /// Largest argument passed to `exp` before clipping.
    const MAX_EXP_ARG: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    ///
    /// Returns None if the conversion fails.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_to_f64` for a non-panicking version.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Try to convert to f64.
    ///
    /// Returns None if the conversion fails.
    fn try_to_f64(self) -> Option<f64> {
        num_traits::cast(self)
    }

    /// Convert from usize (for iteration counts and sample sizes).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_usize` for a non-panicking version.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }

    /// Try to convert from usize.
    ///
    /// Returns None if the conversion fails.
    fn try_from_usize(v: usize) -> Option<Self> {
        <Self as FromPrimitive>::from_usize(v)
    }

    /// Whether `self` is the `LOG_ZERO` mask (or below it).
    fn is_log_zero(self) -> bool {
        self <= Self::LOG_ZERO * <Self as Scalar>::from_f64(0.5)
    }
}

impl Scalar for f32 {
    #[cfg(feature = "lazy")]
    type Lanes = wide::f32x8;

    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-4;
    const ENTROPY_TOLERANCE: Self = 1e-3;
    const LOG_ZERO: Self = -1e30;
    const MIN_BANDWIDTH: Self = 1e-6;
    const MAX_EXP_ARG: Self = 80.0;
}

impl Scalar for f64 {
    #[cfg(feature = "lazy")]
    type Lanes = wide::f64x4;

    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-6;
    const ENTROPY_TOLERANCE: Self = 1e-5;
    const LOG_ZERO: Self = -1e300;
    const MIN_BANDWIDTH: Self = 1e-12;
    const MAX_EXP_ARG: Self = 700.0;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a statically-sized matrix.
pub type SMatrix<T, const R: usize, const C: usize> = OMatrix<T, Const<R>, Const<C>>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Type alias for a statically-sized vector.
pub type SVector<T, const N: usize> = OVector<T, Const<N>>;

/// Numerical constants for different precision levels.
pub mod constants {
    use super::Scalar;

    /// Get machine epsilon for the given scalar type.
    pub fn epsilon<T: Scalar>() -> T {
        T::EPSILON
    }

    /// Get default convergence tolerance.
    pub fn default_tolerance<T: Scalar>() -> T {
        T::DEFAULT_TOLERANCE
    }

    /// Get the default entropy-residual tolerance for bandwidth calibration.
    pub fn entropy_tolerance<T: Scalar>() -> T {
        T::ENTROPY_TOLERANCE
    }

    /// Get the finite log-domain zero mask.
    pub fn log_zero<T: Scalar>() -> T {
        T::LOG_ZERO
    }

    /// Get the smallest admissible kernel bandwidth.
    pub fn min_bandwidth<T: Scalar>() -> T {
        T::MIN_BANDWIDTH
    }

    /// Get the largest exponent passed to `exp` before clipping.
    pub fn max_exp_arg<T: Scalar>() -> T {
        T::MAX_EXP_ARG
    }
}
