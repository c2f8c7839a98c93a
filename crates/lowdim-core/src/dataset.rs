//! Deterministic toy datasets for tests, examples and benches.
//!
//! Available under the `test-utils` feature (and always inside this
//! crate's own tests).

use crate::types::{DMatrix, Scalar};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Two interleaving half-circles ("moons") with Gaussian noise.
///
/// The first `n / 2` samples trace the outer moon, the rest the inner
/// one. `noise` is the standard deviation of the isotropic jitter added
/// to every coordinate; the same `seed` always produces the same data.
///
/// Returns an `n x 2` matrix.
///
/// # Panics
///
/// Panics if `n < 2` or `noise` is negative; the generator is test
/// tooling and expects sane arguments.
pub fn two_moons<T: Scalar>(n: usize, noise: f64, seed: u64) -> DMatrix<T> {
    assert!(n >= 2, "two_moons needs at least two samples");
    assert!(noise >= 0.0, "noise standard deviation must be nonnegative");

    let n_outer = n / 2;
    let n_inner = n - n_outer;
    let mut rng = SmallRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise).expect("noise validated above");

    let mut data = DMatrix::zeros(n, 2);
    for k in 0..n_outer {
        let theta = std::f64::consts::PI * k as f64 / (n_outer.max(2) - 1) as f64;
        data[(k, 0)] = <T as Scalar>::from_f64(theta.cos() + normal.sample(&mut rng));
        data[(k, 1)] = <T as Scalar>::from_f64(theta.sin() + normal.sample(&mut rng));
    }
    for k in 0..n_inner {
        let theta = std::f64::consts::PI * k as f64 / (n_inner.max(2) - 1) as f64;
        let i = n_outer + k;
        data[(i, 0)] = <T as Scalar>::from_f64(1.0 - theta.cos() + normal.sample(&mut rng));
        data[(i, 1)] = <T as Scalar>::from_f64(0.5 - theta.sin() + normal.sample(&mut rng));
    }
    data
}

/// Seeded matrix with entries uniform in `[-1, 1)`.
pub fn random_matrix<T: Scalar>(nrows: usize, ncols: usize, seed: u64) -> DMatrix<T> {
    let mut rng = SmallRng::seed_from_u64(seed);
    DMatrix::from_fn(nrows, ncols, |_, _| <T as Scalar>::from_f64(rng.gen_range(-1.0..1.0)))
}
