//! Dimensionality reduction built from affinity kernels.
//!
//! This crate bundles the workspace members behind one dependency:
//!
//! - [`affinity`]: kernels turning samples into `n x n` affinity
//!   matrices, from the plain Gram matrix to entropic, symmetric
//!   entropic and doubly stochastic constructions.
//! - [`embed`]: estimators producing low-dimensional coordinates,
//!   spectral (PCA, kernel PCA) and neighbor based (SNE, t-SNE).
//!
//! The shared scalar abstraction, metrics, solvers and error types come
//! from `lowdim-core` and are re-exported at the root.
//!
//! # Example
//!
//! ```
//! use lowdim::prelude::*;
//!
//! let x = DMatrix::from_row_slice(
//!     6,
//!     2,
//!     &[0.0, 0.0, 0.1, 0.1, 0.2, 0.0, 5.0, 5.0, 5.1, 4.9, 5.2, 5.1],
//! );
//!
//! let p = GibbsAffinity::new().with_sigma(0.5).fit_transform(&x)?;
//! assert_eq!(p.nrows(), 6);
//!
//! let z = Tsne::new().with_perplexity(2.0).fit_transform(&x)?;
//! assert_eq!(z.shape(), (6, 2));
//! # Ok::<(), lowdim::SolverError>(())
//! ```

pub use lowdim_affinity as affinity;
pub use lowdim_embed as embed;

// Re-export the linear algebra backbone so downstream crates can name
// matrix types without depending on nalgebra themselves.
pub use nalgebra;

pub use lowdim_core::backend::Backend;
pub use lowdim_core::error::{DataError, Result, SolverError, SolverResult};
pub use lowdim_core::metric::Metric;
pub use lowdim_core::solver::{SolveReport, StoppingCriterion, TerminationReason};
pub use lowdim_core::types::{DMatrix, DVector, Scalar};

/// Everything needed for a typical pipeline in one import.
pub mod prelude {
    pub use lowdim_affinity::{
        Affinity, EntropicAffinity, GibbsAffinity, L2SymmetricEntropicAffinity, LogAffinity,
        Normalization, ScalarProductAffinity, SinkhornAffinity, StudentAffinity,
        SymmetricEntropicAffinity,
    };
    pub use lowdim_core::prelude::*;
    pub use lowdim_embed::{
        AffinityMatcher, EmbeddingObjective, Initialization, KernelPca, Pca, Sne, Tsne,
    };
}
