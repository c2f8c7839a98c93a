//! Entropic affinity with per-sample calibrated bandwidths.
//!
//! Instead of one global bandwidth, each sample gets its own `eps_i`
//! chosen so that the Shannon entropy of its affinity row equals
//! `ln(perplexity) + 1`. Rows in dense regions end up with small
//! bandwidths, rows in sparse regions with large ones, which keeps the
//! effective neighborhood size uniform across the dataset.

use lowdim_core::affinity::{Affinity, LogAffinity};
use lowdim_core::backend::Backend;
use lowdim_core::error::SolverResult;
use lowdim_core::metric::Metric;
use lowdim_core::ops::{log_normalize_rows, row_to_vec};
use lowdim_core::root::{expand_bracket, MAX_BRACKET_EXPANSIONS, RootFinder, RootResult};
use lowdim_core::stability::{clipped_exp, log_sum_exp};
use lowdim_core::types::Scalar;
use lowdim_core::validation::validate_affinity_input;
use nalgebra::{DMatrix, DVector};
use num_traits::Float;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Row entropy induced by a target perplexity, `ln(xi) + 1`.
pub fn entropy_target<T: Scalar>(perplexity: T) -> T {
    Float::ln(perplexity) + T::one()
}

/// Entropy residual of a Gibbs row at bandwidth `eps`.
///
/// `costs` holds the distances from one sample to every other sample
/// (the self-distance removed). The residual is increasing in `eps`:
/// it approaches `1 - target` as `eps` shrinks toward zero and
/// `ln(costs.len()) + 1 - target` as `eps` grows, so a sign change
/// exists whenever the target lies strictly between those limits.
pub fn row_entropy_gap<T: Scalar>(eps: T, costs: &[T], target: T) -> T {
    let logits: Vec<T> = costs.iter().map(|&c| -c / eps).collect();
    let lse = log_sum_exp(&logits);
    let mut weighted = T::zero();
    for &l in &logits {
        weighted = weighted + clipped_exp(l - lse) * l;
    }
    T::one() + lse - weighted - target
}

/// Outcome of a full entropic calibration.
#[derive(Debug, Clone)]
pub struct EntropicCalibration<T: Scalar> {
    /// Row-stochastic affinity in log domain, diagonal masked.
    pub log_affinity: DMatrix<T>,
    /// Bandwidth the root search settled on for each sample.
    pub bandwidths: DVector<T>,
}

/// Affinity whose rows all have the same perplexity.
///
/// The perplexity must lie strictly between `1` and `n - 1`: those are
/// the (open) entropy limits a row of `n - 1` neighbors can reach, so
/// values outside the interval leave the root search without a
/// sign-changing bracket.
#[derive(Debug, Clone)]
pub struct EntropicAffinity<T: Scalar> {
    perplexity: T,
    tolerance: T,
    max_iterations: usize,
    root_finder: RootFinder,
    metric: Metric,
    backend: Backend,
}

impl<T: Scalar> Default for EntropicAffinity<T> {
    fn default() -> Self {
        Self {
            perplexity: <T as Scalar>::from_f64(30.0),
            tolerance: T::ENTROPY_TOLERANCE,
            max_iterations: 1000,
            root_finder: RootFinder::default(),
            metric: Metric::default(),
            backend: Backend::default(),
        }
    }
}

impl<T: Scalar> EntropicAffinity<T> {
    /// Entropic affinity with perplexity 30 and bisection calibration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target perplexity.
    pub fn with_perplexity(mut self, perplexity: T) -> Self {
        self.perplexity = perplexity;
        self
    }

    /// Set the entropy tolerance of the root search.
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the per-row iteration cap of the root search.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the root-finding strategy.
    pub fn with_root_finder(mut self, root_finder: RootFinder) -> Self {
        self.root_finder = root_finder;
        self
    }

    /// Set the ground metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the cost-matrix backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Target perplexity of each affinity row.
    pub fn perplexity(&self) -> T {
        self.perplexity
    }

    fn calibrate_row(&self, costs: &[T], target: T) -> SolverResult<RootResult<T>> {
        let mut mean = T::zero();
        for &c in costs {
            mean = mean + c;
        }
        mean = mean / <T as Scalar>::from_usize(costs.len());
        let seed = Float::max(mean, T::MIN_BANDWIDTH);
        let gap = |eps: T| row_entropy_gap(eps, costs, target);
        let bracket = expand_bracket(gap, seed, MAX_BRACKET_EXPANSIONS)?;
        self.root_finder
            .find_root(gap, bracket, self.tolerance, self.max_iterations)
    }

    /// Calibrate every row and return the log affinity together with
    /// the fitted bandwidths.
    pub fn calibrate(&self, x: &DMatrix<T>) -> SolverResult<EntropicCalibration<T>> {
        validate_affinity_input(x)?;
        let n = x.nrows();
        crate::check_perplexity(self.perplexity, n)?;
        let costs = self.backend.pairwise(x, self.metric)?;
        let target = entropy_target(self.perplexity);

        let rows: Vec<Vec<T>> = (0..n)
            .map(|i| {
                let mut r = row_to_vec(&costs, i);
                r.remove(i);
                r
            })
            .collect();

        #[cfg(feature = "parallel")]
        let searches = rows
            .par_iter()
            .map(|r| self.calibrate_row(r, target))
            .collect::<SolverResult<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let searches = rows
            .iter()
            .map(|r| self.calibrate_row(r, target))
            .collect::<SolverResult<Vec<_>>>()?;

        let stalled = searches.iter().filter(|s| !s.converged).count();
        if stalled > 0 {
            let worst = searches
                .iter()
                .map(|s| Float::abs(s.residual))
                .fold(T::zero(), Float::max);
            log::warn!(
                "entropic calibration left {stalled} of {n} rows above tolerance \
                 (worst residual {worst})"
            );
        }

        let mut log_p = DMatrix::zeros(n, n);
        let mut bandwidths = DVector::zeros(n);
        for i in 0..n {
            let eps = Float::max(searches[i].root, T::MIN_BANDWIDTH);
            bandwidths[i] = eps;
            for j in 0..n {
                log_p[(i, j)] = if i == j {
                    T::LOG_ZERO
                } else {
                    -costs[(i, j)] / eps
                };
            }
        }
        Ok(EntropicCalibration {
            log_affinity: log_normalize_rows(&log_p)?,
            bandwidths,
        })
    }
}

impl<T: Scalar> Affinity<T> for EntropicAffinity<T> {
    fn name(&self) -> &'static str {
        "entropic"
    }

    fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.calibrate(x)?.log_affinity.map(clipped_exp))
    }
}

impl<T: Scalar> LogAffinity<T> for EntropicAffinity<T> {
    fn fit_transform_log(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        Ok(self.calibrate(x)?.log_affinity)
    }
}

/// Entropic affinity symmetrized by averaging with its transpose.
///
/// The rows lose their exact perplexity but the result is symmetric,
/// which is what embedding objectives such as t-SNE expect.
#[derive(Debug, Clone, Default)]
pub struct L2SymmetricEntropicAffinity<T: Scalar> {
    inner: EntropicAffinity<T>,
}

impl<T: Scalar> L2SymmetricEntropicAffinity<T> {
    /// Symmetrized entropic affinity with the default perplexity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already configured [`EntropicAffinity`].
    pub fn from_entropic(inner: EntropicAffinity<T>) -> Self {
        Self { inner }
    }

    /// Set the target perplexity of the underlying calibration.
    pub fn with_perplexity(mut self, perplexity: T) -> Self {
        self.inner = self.inner.with_perplexity(perplexity);
        self
    }

    /// Set the ground metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.inner = self.inner.with_metric(metric);
        self
    }

    /// Set the cost-matrix backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.inner = self.inner.with_backend(backend);
        self
    }
}

impl<T: Scalar> Affinity<T> for L2SymmetricEntropicAffinity<T> {
    fn name(&self) -> &'static str {
        "l2_symmetric_entropic"
    }

    fn fit_transform(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        let p = self.inner.fit_transform(x)?;
        let pt = p.transpose();
        Ok((p + pt) * <T as Scalar>::from_f64(0.5))
    }
}

impl<T: Scalar> LogAffinity<T> for L2SymmetricEntropicAffinity<T> {
    fn fit_transform_log(&self, x: &DMatrix<T>) -> SolverResult<DMatrix<T>> {
        let lp = self.inner.fit_transform_log(x)?;
        let n = lp.nrows();
        let ln2 = Float::ln(<T as Scalar>::from_f64(2.0));
        let mut out = DMatrix::zeros(n, n);
        for j in 0..n {
            for i in 0..n {
                out[(i, j)] = log_sum_exp(&[lp[(i, j)], lp[(j, i)]]) - ln2;
            }
        }
        Ok(out)
    }
}
