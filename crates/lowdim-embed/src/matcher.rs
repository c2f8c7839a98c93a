//! Gradient-based matching of an input affinity in embedding space.

use std::time::Instant;

use lowdim_core::error::{DataError, Result, SolverError, SolverResult};
use lowdim_core::solver::{DescentState, SolveReport, StoppingCriterion, TerminationReason};
use lowdim_core::stability::safe_divide;
use lowdim_core::types::Scalar;
use lowdim_core::validation::{check_finite, check_square};
use nalgebra::DMatrix;
use num_traits::Float;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::pca::Pca;

/// Loss and gradient of an embedding against a fixed input affinity.
///
/// Implementations receive the affinity `p`, the current coordinates
/// `z` (one row per sample) and a gradient buffer of the same shape as
/// `z` to fill.
pub trait EmbeddingObjective<T: Scalar> {
    /// Short objective name used in log messages.
    fn name(&self) -> &'static str;

    /// Evaluate the loss at `z` and write its gradient into `grad`.
    fn loss_and_grad(
        &self,
        p: &DMatrix<T>,
        z: &DMatrix<T>,
        grad: &mut DMatrix<T>,
    ) -> SolverResult<T>;
}

/// How the embedding coordinates are seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Initialization {
    /// Principal components of the input, rescaled to a tiny spread.
    #[default]
    Pca,
    /// Seeded Gaussian noise with a tiny spread.
    Random {
        /// Seed of the noise generator.
        seed: u64,
    },
}

impl Initialization {
    /// Build initial coordinates for `x` with the given column count.
    ///
    /// Both variants scale the result so the first coordinate has a
    /// standard deviation of `scale`; starting small lets early
    /// exaggeration arrange clusters before distances harden.
    pub fn build<T: Scalar>(
        &self,
        x: &DMatrix<T>,
        n_components: usize,
        scale: T,
    ) -> Result<DMatrix<T>> {
        let n = x.nrows();
        match self {
            Self::Pca => {
                let scores = Pca::new(n_components).fit_transform(x)?;
                let mut acc = T::zero();
                for i in 0..n {
                    acc = acc + scores[(i, 0)] * scores[(i, 0)];
                }
                let std0 = Float::sqrt(acc / <T as Scalar>::from_usize(n.max(1)));
                let factor = safe_divide(scale, std0, T::EPSILON);
                Ok(scores * factor)
            }
            Self::Random { seed } => {
                let mut rng = SmallRng::seed_from_u64(*seed);
                let normal = Normal::new(0.0, 1.0).map_err(|_| {
                    DataError::numerical_error("failed to build the standard normal sampler")
                })?;
                Ok(DMatrix::from_fn(n, n_components, |_, _| {
                    scale * <T as Scalar>::from_f64(normal.sample(&mut rng))
                }))
            }
        }
    }
}

/// Momentum descent on an [`EmbeddingObjective`], with the early
/// exaggeration phase used by neighbor embeddings.
///
/// During the first [`with_exaggeration_iters`] iterations the input
/// affinity is multiplied by the exaggeration factor and a lower
/// momentum is used; convergence checks only start once the phase ends.
///
/// [`with_exaggeration_iters`]: AffinityMatcher::with_exaggeration_iters
#[derive(Debug, Clone)]
pub struct AffinityMatcher<T: Scalar> {
    learning_rate: Option<T>,
    early_exaggeration: T,
    exaggeration_iters: usize,
    initial_momentum: T,
    final_momentum: T,
    criterion: StoppingCriterion<T>,
    init: Initialization,
    init_scale: T,
}

impl<T: Scalar> Default for AffinityMatcher<T> {
    fn default() -> Self {
        Self {
            learning_rate: None,
            early_exaggeration: <T as Scalar>::from_f64(12.0),
            exaggeration_iters: 250,
            initial_momentum: <T as Scalar>::from_f64(0.5),
            final_momentum: <T as Scalar>::from_f64(0.8),
            criterion: StoppingCriterion::new()
                .with_max_iterations(1000)
                .with_gradient_tolerance(T::DEFAULT_TOLERANCE),
            init: Initialization::default(),
            init_scale: <T as Scalar>::from_f64(1e-4),
        }
    }
}

impl<T: Scalar> AffinityMatcher<T> {
    /// Matcher with the usual neighbor-embedding schedule: 250
    /// exaggerated iterations at factor 12, then up to 750 plain ones.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the descent step size instead of deriving it from the
    /// sample count.
    pub fn with_learning_rate(mut self, learning_rate: T) -> Self {
        self.learning_rate = Some(learning_rate);
        self
    }

    /// Set the early exaggeration factor.
    pub fn with_early_exaggeration(mut self, factor: T) -> Self {
        self.early_exaggeration = factor;
        self
    }

    /// Set the length of the exaggeration phase.
    pub fn with_exaggeration_iters(mut self, iters: usize) -> Self {
        self.exaggeration_iters = iters;
        self
    }

    /// Set the momenta used during and after exaggeration.
    pub fn with_momenta(mut self, initial: T, final_: T) -> Self {
        self.initial_momentum = initial;
        self.final_momentum = final_;
        self
    }

    /// Set the stopping criterion.
    pub fn with_criterion(mut self, criterion: StoppingCriterion<T>) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the coordinate initialization.
    pub fn with_initialization(mut self, init: Initialization) -> Self {
        self.init = init;
        self
    }

    /// Coordinate initialization used by [`AffinityMatcher::fit`].
    pub fn initialization(&self) -> Initialization {
        self.init
    }

    fn effective_learning_rate(&self, n: usize) -> T {
        // The usual heuristic: n / (4 * exaggeration), floored at 50.
        self.learning_rate.unwrap_or_else(|| {
            let four = <T as Scalar>::from_f64(4.0);
            let auto = <T as Scalar>::from_usize(n) / (four * self.early_exaggeration);
            Float::max(auto, <T as Scalar>::from_f64(50.0))
        })
    }

    /// Initialize coordinates for `x` and descend the objective.
    pub fn fit<O>(
        &self,
        objective: &O,
        affinity: &DMatrix<T>,
        x: &DMatrix<T>,
        n_components: usize,
    ) -> SolverResult<(DMatrix<T>, SolveReport<T>)>
    where
        O: EmbeddingObjective<T>,
    {
        let z0 = self.init.build(x, n_components, self.init_scale)?;
        self.minimize(objective, affinity, z0)
    }

    /// Descend the objective from the given coordinates.
    pub fn minimize<O>(
        &self,
        objective: &O,
        affinity: &DMatrix<T>,
        z0: DMatrix<T>,
    ) -> SolverResult<(DMatrix<T>, SolveReport<T>)>
    where
        O: EmbeddingObjective<T>,
    {
        check_square(affinity)?;
        check_finite(affinity, "input affinity")?;
        if z0.nrows() != affinity.nrows() {
            return Err(DataError::dimension_mismatch(
                format!("{} coordinate rows", affinity.nrows()),
                format!("{} coordinate rows", z0.nrows()),
            )
            .into());
        }

        let (n, k) = z0.shape();
        let learning_rate = self.effective_learning_rate(n);
        let exaggerated = affinity * self.early_exaggeration;

        let mut z = z0;
        let mut grad = DMatrix::zeros(n, k);
        let mut state = DescentState::new(n, k);

        let start = Instant::now();
        let mut iterations = 0;
        let mut termination = TerminationReason::MaxIterations;
        let mut loss = T::zero();
        let mut gradient_norm = T::zero();
        while iterations < self.criterion.max_iterations {
            let exaggerating = iterations < self.exaggeration_iters;
            let p = if exaggerating { &exaggerated } else { affinity };

            loss = objective.loss_and_grad(p, &z, &mut grad)?;
            gradient_norm = grad.norm();
            if !Float::is_finite(loss) || !Float::is_finite(gradient_norm) {
                return Err(SolverError::non_finite_iterate(iterations));
            }
            if !exaggerating {
                if let Some(tol) = self.criterion.gradient_tolerance {
                    if gradient_norm <= tol {
                        termination = TerminationReason::Converged;
                        break;
                    }
                }
            }

            let momentum = if exaggerating {
                self.initial_momentum
            } else {
                self.final_momentum
            };
            state.step(&mut z, &grad, learning_rate, momentum);
            iterations += 1;

            if iterations % 100 == 0 {
                log::debug!(
                    "{} iteration {iterations}: loss {loss}, gradient norm {gradient_norm}",
                    objective.name()
                );
            }
        }

        let report = SolveReport::new(
            loss,
            Some(gradient_norm),
            iterations,
            start.elapsed(),
            termination,
        );
        Ok((z, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lowdim_core::dataset::two_moons;
    use pretty_assertions::{assert_eq, assert_ne};

    /// Pulls every coordinate toward the origin; handy because the
    /// minimum and gradient are known in closed form.
    struct PullToOrigin;

    impl EmbeddingObjective<f64> for PullToOrigin {
        fn name(&self) -> &'static str {
            "pull_to_origin"
        }

        fn loss_and_grad(
            &self,
            _p: &DMatrix<f64>,
            z: &DMatrix<f64>,
            grad: &mut DMatrix<f64>,
        ) -> SolverResult<f64> {
            let mut loss = 0.0;
            for j in 0..z.ncols() {
                for i in 0..z.nrows() {
                    loss += 0.5 * z[(i, j)] * z[(i, j)];
                    grad[(i, j)] = z[(i, j)];
                }
            }
            Ok(loss)
        }
    }

    #[test]
    fn test_minimize_reaches_known_optimum() {
        let n = 8;
        let affinity = DMatrix::from_element(n, n, 1.0 / (n * n) as f64);
        let z0 = DMatrix::from_fn(n, 2, |i, j| ((i + j) as f64 * 0.3).cos());
        let matcher = AffinityMatcher::new()
            .with_learning_rate(0.1)
            .with_exaggeration_iters(0)
            .with_criterion(
                StoppingCriterion::new()
                    .with_max_iterations(2000)
                    .with_gradient_tolerance(1e-9),
            );
        let (z, report) = matcher.minimize(&PullToOrigin, &affinity, z0).unwrap();
        assert!(report.converged);
        for v in z.iter() {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_no_convergence_checks_during_exaggeration() {
        let n = 6;
        let affinity = DMatrix::from_element(n, n, 1.0 / (n * n) as f64);
        let z0 = DMatrix::zeros(n, 2);
        // Gradient norm starts at zero, yet the run must not stop
        // before the exaggeration phase ends.
        let matcher = AffinityMatcher::new()
            .with_learning_rate(0.1)
            .with_exaggeration_iters(40)
            .with_criterion(
                StoppingCriterion::new()
                    .with_max_iterations(100)
                    .with_gradient_tolerance(1e-3),
            );
        let (_, report) = matcher.minimize(&PullToOrigin, &affinity, z0).unwrap();
        assert!(report.iterations >= 40);
        assert!(report.converged);
    }

    #[test]
    fn test_pca_initialization_is_tiny_and_deterministic() {
        let x = two_moons::<f64>(30, 0.05, 12);
        let a = Initialization::Pca.build(&x, 2, 1e-4).unwrap();
        let b = Initialization::Pca.build(&x, 2, 1e-4).unwrap();
        assert_eq!(a, b);
        let mut acc = 0.0;
        for i in 0..30 {
            acc += a[(i, 0)] * a[(i, 0)];
        }
        assert_relative_eq!((acc / 30.0).sqrt(), 1e-4, max_relative = 1e-6);
    }

    #[test]
    fn test_random_initialization_seeded() {
        let x = two_moons::<f64>(10, 0.05, 3);
        let a = Initialization::Random { seed: 5 }.build(&x, 2, 1e-4).unwrap();
        let b = Initialization::Random { seed: 5 }.build(&x, 2, 1e-4).unwrap();
        let c = Initialization::Random { seed: 6 }.build(&x, 2, 1e-4).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        for v in a.iter() {
            assert!(v.abs() < 1e-2);
        }
    }

    #[test]
    fn test_learning_rate_heuristic() {
        let matcher = AffinityMatcher::<f64>::new();
        // Small n floors at 50.
        assert_relative_eq!(matcher.effective_learning_rate(100), 50.0);
        // Large n scales as n / 48.
        assert_relative_eq!(matcher.effective_learning_rate(4800), 100.0);
    }

    #[test]
    fn test_affinity_shape_mismatch_rejected() {
        let affinity = DMatrix::from_element(4, 4, 0.25);
        let z0 = DMatrix::zeros(5, 2);
        let res = AffinityMatcher::new().minimize(&PullToOrigin, &affinity, z0);
        assert!(res.is_err());
    }
}
