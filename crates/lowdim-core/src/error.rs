//! Error types for affinity and embedding computations.
//!
//! This module defines the core error types used throughout the library
//! for input validation and iterative solvers.

use thiserror::Error;

/// Errors that can occur while validating or preparing input data.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    /// Input contains NaN or infinite entries.
    ///
    /// All affinity kernels require finite input; this error reports where
    /// the offending values were encountered.
    #[error("Non-finite values in {context}")]
    NonFinite {
        /// Description of the offending input
        context: String,
    },

    /// Dimension mismatch between matrices or vectors.
    ///
    /// This error occurs when operations involve arrays with incompatible shapes.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// A configuration parameter is outside its admissible range.
    ///
    /// This error occurs when an estimator is configured with an invalid
    /// value (e.g. a non-positive bandwidth, a perplexity larger than the
    /// sample count).
    #[error("Invalid parameter {parameter}: {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: String,
        /// Description of the constraint that was violated
        reason: String,
    },

    /// Input has no rows or no columns.
    #[error("Empty input: {context}")]
    EmptyInput {
        /// Description of the empty input
        context: String,
    },

    /// Numerical instability detected.
    ///
    /// This error occurs when numerical operations become degenerate, such
    /// as normalizing a matrix whose mass is zero.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },

    /// A structural check on a computed matrix failed.
    ///
    /// Used by the `validation` module to report violated matrix
    /// properties (symmetry, marginals, entropy targets).
    #[error("Check '{check}' failed: {reason}")]
    CheckFailed {
        /// Name of the failed check
        check: String,
        /// Description of the violation
        reason: String,
    },
}

impl DataError {
    /// Create a NonFinite error pointing at the offending input.
    pub fn non_finite<S: Into<String>>(context: S) -> Self {
        Self::NonFinite {
            context: context.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter<S1, S2>(parameter: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create an EmptyInput error.
    pub fn empty_input<S: Into<String>>(context: S) -> Self {
        Self::EmptyInput {
            context: context.into(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Create a CheckFailed error for a named check.
    pub fn check_failed<S1, S2>(check: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::CheckFailed {
            check: check.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during iterative solves.
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    /// A sign-changing bracket for a root could not be established.
    ///
    /// This error occurs during bandwidth calibration when the geometric
    /// bracket expansion exhausts its iteration budget, typically because
    /// the input distances are degenerate.
    #[error("Bracket expansion failed after {iterations} iterations: {reason}")]
    BracketingFailed {
        /// Description of why no bracket was found
        reason: String,
        /// Number of expansion steps attempted
        iterations: usize,
    },

    /// Maximum number of iterations reached without convergence.
    ///
    /// This error indicates that a solver has reached its iteration limit
    /// without driving its residual below the requested tolerance.
    #[error("Maximum iterations ({max_iterations}) reached without convergence")]
    MaxIterationsReached {
        /// Maximum number of iterations allowed
        max_iterations: usize,
        /// Final residual
        residual: f64,
        /// Convergence tolerance that was not met
        tolerance: f64,
    },

    /// An iterate became NaN or infinite.
    ///
    /// This error occurs when a dual ascent or descent step produces
    /// non-finite values, usually due to an excessive learning rate.
    #[error("Solver iterate became non-finite at iteration {iteration}")]
    NonFiniteIterate {
        /// Iteration at which the blow-up was detected
        iteration: usize,
    },

    /// Propagated data error.
    ///
    /// This error wraps validation failures that occur while a solver
    /// prepares or checks its inputs.
    #[error("Data validation failed: {0}")]
    Data(#[from] DataError),
}

impl SolverError {
    /// Create a BracketingFailed error.
    pub fn bracketing_failed<S: Into<String>>(reason: S, iterations: usize) -> Self {
        Self::BracketingFailed {
            reason: reason.into(),
            iterations,
        }
    }

    /// Create a MaxIterationsReached error with convergence information.
    pub fn max_iterations_reached(max_iterations: usize, residual: f64, tolerance: f64) -> Self {
        Self::MaxIterationsReached {
            max_iterations,
            residual,
            tolerance,
        }
    }

    /// Create a NonFiniteIterate error.
    pub fn non_finite_iterate(iteration: usize) -> Self {
        Self::NonFiniteIterate { iteration }
    }
}

/// Result type alias for operations that can produce DataError.
pub type Result<T> = std::result::Result<T, DataError>;

/// Result type alias for solver operations.
pub type SolverResult<T> = std::result::Result<T, SolverError>;
