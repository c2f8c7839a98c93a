//! Affinity kernels for dimensionality reduction.
//!
//! Every kernel turns an `n x d` sample matrix into an `n x n` affinity
//! matrix through the [`Affinity`] trait, with a log-domain variant via
//! [`LogAffinity`] for numerically delicate consumers.
//!
//! # Kernels
//!
//! - [`ScalarProductAffinity`]: Gram matrix, optionally centered.
//! - [`GibbsAffinity`]: heat kernel with one global bandwidth.
//! - [`StudentAffinity`]: heavy-tailed Student-t kernel.
//! - [`EntropicAffinity`]: per-sample bandwidths calibrated so each row
//!   reaches a target perplexity.
//! - [`L2SymmetricEntropicAffinity`]: entropic affinity averaged with
//!   its transpose.
//! - [`SymmetricEntropicAffinity`]: perplexity constraints solved
//!   directly on the symmetric polytope by dual ascent.
//! - [`SinkhornAffinity`]: doubly stochastic projection via symmetric
//!   log-domain Sinkhorn.
//!
//! # Example
//!
//! ```
//! use lowdim_affinity::{Affinity, EntropicAffinity};
//! use nalgebra::DMatrix;
//!
//! let x = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 0.1, 0.2, 2.0, 2.1, 2.2, 1.9]);
//! let p = EntropicAffinity::new().with_perplexity(2.0).fit_transform(&x)?;
//! assert_eq!(p.nrows(), 4);
//! # Ok::<(), lowdim_core::error::SolverError>(())
//! ```

mod entropic;
mod gibbs;
mod scalar_product;
mod sinkhorn;
mod student;
mod sym_entropic;

pub use entropic::{
    entropy_target, row_entropy_gap, EntropicAffinity, EntropicCalibration,
    L2SymmetricEntropicAffinity,
};
pub use gibbs::GibbsAffinity;
pub use scalar_product::ScalarProductAffinity;
pub use sinkhorn::SinkhornAffinity;
pub use student::StudentAffinity;
pub use sym_entropic::{DualSolver, SymmetricEntropicAffinity};

pub use lowdim_core::affinity::{Affinity, LogAffinity, Normalization};

use lowdim_core::error::{DataError, SolverResult};
use lowdim_core::types::Scalar;
use num_traits::Float;

/// Reject perplexities outside the open interval `(1, n - 1)`.
///
/// Those are the entropy limits an affinity row over `n - 1` neighbors
/// can approach but never reach, so values on or beyond the endpoints
/// leave the calibration without a solution.
pub(crate) fn check_perplexity<T: Scalar>(perplexity: T, n: usize) -> SolverResult<()> {
    let upper = <T as Scalar>::from_usize(n - 1);
    if !Float::is_finite(perplexity) || perplexity <= T::one() || perplexity >= upper {
        return Err(DataError::invalid_parameter(
            "perplexity",
            format!("must lie strictly between 1 and n - 1 = {upper}, got {perplexity}"),
        )
        .into());
    }
    Ok(())
}
