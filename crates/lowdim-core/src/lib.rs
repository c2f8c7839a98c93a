//! Core traits and types for affinity-based dimensionality reduction.
//!
//! This crate provides the foundational pieces shared by the affinity
//! kernels and embedding estimators: ground metrics and cost-matrix
//! backends, log-domain numerics, scalar root finding for bandwidth
//! calibration, and the solver states driving dual ascents and embedding
//! descents.
//!
//! # Key Concepts
//!
//! - **Affinities**: Pairwise mass matrices derived from sample distances
//! - **Log domain**: Kernels are assembled as log masses, with a finite
//!   mask standing in for structural zeros
//! - **Calibration**: Per-row bandwidths solved so each row reaches a
//!   target entropy
//! - **Backends**: Interchangeable dense and tiled cost-matrix evaluation
//!
//! # Modules
//!
//! - [`affinity`]: Affinity traits and normalization modes
//! - [`backend`]: Dense and tiled cost-matrix evaluation
//! - [`error`]: Error types for data validation and solvers
//! - [`metric`]: Ground metrics and pairwise distances
//! - [`ops`]: Normalization and entropy utilities
//! - [`root`]: Bracketed scalar root finding
//! - [`solver`]: Stopping criteria, reports and update rules
//! - [`stability`]: Numerically stable log-domain primitives
//! - [`types`]: Scalar trait, type aliases and numerical constants
//! - [`validation`]: Structural checks on inputs and affinity matrices
//!
//! # Example
//!
//! ```rust
//! use lowdim_core::prelude::*;
//!
//! let x = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
//! let costs = Backend::Dense.pairwise(&x, Metric::SquaredEuclidean)?;
//! assert_eq!(costs[(0, 1)], 1.0);
//! assert_eq!(costs[(1, 2)], 2.0);
//! # Ok::<(), lowdim_core::DataError>(())
//! ```

pub mod affinity;
pub mod backend;
pub mod error;
pub mod metric;
pub mod ops;
pub mod root;
pub mod solver;
pub mod stability;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod dataset;

// Re-export commonly used items at the crate root
pub use error::{DataError, Result, SolverError, SolverResult};
pub use types::{DMatrix, DVector, Scalar};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use lowdim_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::affinity::{Affinity, LogAffinity, Normalization};
    pub use crate::backend::Backend;
    pub use crate::error::{DataError, Result, SolverError, SolverResult};
    pub use crate::metric::{pairwise_distances, Metric};
    pub use crate::root::{expand_bracket, Bracket, RootFinder, RootResult};
    pub use crate::solver::{
        AdamState, DescentState, SolveReport, StoppingCriterion, TerminationReason,
    };
    pub use crate::stability::{clipped_exp, log_sum_exp, safe_log};
    pub use crate::types::{DMatrix, DVector, Scalar};
}
