/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Adaptive dimension-doubling convergence driver.
//!
//! Re-runs a caller-supplied `compute(size)` at sizes `10, 20, 40, 80, …` until
//! two successive results are closer than a tolerance, or the iteration budget
//! is spent.
//!
//! ```text
//! size:     10 ──► 20 ──► 40 ──► 80 ──► …
//! record:    –     d₁     d₂     d₃
//! stop:           d₁ < tol?  d₂ < tol?  …
//! ```
//!
//! # Invariants
//!
//! - **Doubling**: the k-th call (0-based) uses `initial_size · 2^k`.
//! - **One call per step**: `compute` is invoked exactly once per size, in order,
//!   with no memoisation across steps or runs.
//! - **Strict tolerance**: success requires `distance < tolerance`.
//! - **Best effort**: exhausting `max_iterations` is not an error. The driver
//!   emits exactly one `tracing` warning and returns the last computed value
//!   together with the next size in the doubling sequence (the size the run
//!   would have tried next), flagged `converged = false`. The size the value
//!   was actually computed at is kept in
//!   [`ConvergenceOutcome::last_computed_size`].
//! - **Append-only history**: the first call of a run has nothing to compare
//!   against and produces no record; every later call produces exactly one.
//!   Records are never removed or reordered, and each carries its run id.

use core::convert::Infallible;

use tracing::{debug, info, warn};

use crate::error::{EmergenceError, Result};
use crate::observable::{Distance, Observable};

/// Default convergence tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Default number of doubling steps.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// First problem size of every run.
pub const INITIAL_SIZE: usize = 10;

/// Identifier attached to every record produced by one run.
pub type RunId = u32;

// ─── ConvergenceConfig ───────────────────────────────────────────────────────

/// Parameters of a convergence run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvergenceConfig {
    /// Success threshold on the distance between successive results. Must be > 0.
    pub tolerance: f64,
    /// Maximum number of `compute` calls per run. Must be ≥ 1.
    pub max_iterations: usize,
    /// Size passed to the first `compute` call. Must be ≥ 1.
    pub initial_size: usize,
}

impl ConvergenceConfig {
    /// Config with the given tolerance and budget, starting at [`INITIAL_SIZE`].
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            initial_size: INITIAL_SIZE,
        }
    }

    /// Reject tolerances that are non-positive or non-finite and zero budgets/sizes.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(EmergenceError::InvalidConfig(format!(
                "tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(EmergenceError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.initial_size == 0 {
            return Err(EmergenceError::InvalidConfig(
                "initial_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Size used by the `iteration`-th call (0-based), `None` on overflow.
    pub fn size_at(&self, iteration: usize) -> Option<usize> {
        let factor = 1usize.checked_shl(u32::try_from(iteration).ok()?)?;
        self.initial_size.checked_mul(factor)
    }
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE, DEFAULT_MAX_ITERATIONS)
    }
}

// ─── Records and outcomes ────────────────────────────────────────────────────

/// One compared iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvergenceRecord {
    /// Run that produced this record.
    pub run_id: RunId,
    /// 0-based index of the `compute` call within its run (always ≥ 1).
    pub iteration: usize,
    /// Size passed to `compute`.
    pub size: usize,
    /// Distance to the previous call's result.
    pub distance: Distance,
    /// Result of this call.
    pub result: Observable,
}

/// Structured result of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvergenceOutcome {
    /// Final value: the converged result, or the last computed one.
    pub value: Observable,
    /// Converged size, or the next doubled size when the budget ran out
    /// (saturating at `usize::MAX`).
    pub size: usize,
    /// Size at which `value` was computed.
    pub last_computed_size: usize,
    /// Whether the tolerance was met.
    pub converged: bool,
    /// Number of `compute` calls made.
    pub iterations: usize,
    /// Identifier shared by this run's records.
    pub run_id: RunId,
    /// Records appended by this run, in order.
    pub records: Vec<ConvergenceRecord>,
}

impl ConvergenceOutcome {
    /// `(value, size)` pair, matching the plain call interface.
    pub fn into_pair(self) -> (Observable, usize) {
        (self.value, self.size)
    }

    /// Distance of the last compared step, if any comparison happened.
    pub fn final_distance(&self) -> Option<Distance> {
        self.records.last().map(|r| r.distance)
    }
}

// ─── AdaptiveConvergence ─────────────────────────────────────────────────────

/// Doubling-size convergence driver with an append-only history.
///
/// ```rust
/// use emergence_core::convergence::{AdaptiveConvergence, ConvergenceConfig};
///
/// let mut driver = AdaptiveConvergence::new(ConvergenceConfig::new(1e-2, 10)).unwrap();
/// let outcome = driver.run(|n| 1.0 / n as f64);
/// assert!(outcome.converged);
/// assert_eq!(outcome.size, 160);
/// ```
#[derive(Clone, Debug)]
pub struct AdaptiveConvergence {
    config: ConvergenceConfig,
    history: Vec<ConvergenceRecord>,
    next_run: RunId,
}

impl AdaptiveConvergence {
    /// Construct a driver after validating `config`.
    pub fn new(config: ConvergenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            history: Vec::new(),
            next_run: 0,
        })
    }

    /// Driver with the default tolerance (1e-12) and budget (10).
    pub fn with_defaults() -> Self {
        Self {
            config: ConvergenceConfig::default(),
            history: Vec::new(),
            next_run: 0,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ConvergenceConfig {
        &self.config
    }

    /// Every record produced by this driver, across all runs, oldest first.
    pub fn history(&self) -> &[ConvergenceRecord] {
        &self.history
    }

    /// Records of a single run.
    pub fn records_for_run(&self, run_id: RunId) -> impl Iterator<Item = &ConvergenceRecord> {
        self.history.iter().filter(move |r| r.run_id == run_id)
    }

    /// Number of runs started on this driver.
    pub fn runs(&self) -> u32 {
        self.next_run
    }

    /// Run an infallible computation to convergence (or budget exhaustion).
    pub fn run<F, T>(&mut self, mut compute: F) -> ConvergenceOutcome
    where
        F: FnMut(usize) -> T,
        T: Into<Observable>,
    {
        match self.try_run(|size| Ok::<T, Infallible>(compute(size))) {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Run a fallible computation. The first `Err` from `compute` aborts the run
    /// and is returned unchanged; records appended before it are kept.
    pub fn try_run<F, T, E>(&mut self, mut compute: F) -> core::result::Result<ConvergenceOutcome, E>
    where
        F: FnMut(usize) -> core::result::Result<T, E>,
        T: Into<Observable>,
    {
        let run_id = self.next_run;
        self.next_run = self.next_run.wrapping_add(1);
        let first_record = self.history.len();
        let tolerance = self.config.tolerance;
        let max_iterations = self.config.max_iterations;

        let mut size = self.config.initial_size;
        let mut previous: Observable = compute(size)?.into();
        let mut iterations = 1;
        let mut overflowed = false;

        while iterations < max_iterations {
            let Some(next) = size.checked_mul(2) else {
                debug!(run_id, size, "problem size overflow, stopping refinement early");
                overflowed = true;
                break;
            };
            size = next;
            let current: Observable = compute(size)?.into();
            let iteration = iterations;
            iterations += 1;

            let distance = current.distance(&previous);
            if distance.is_incomparable() {
                debug!(
                    run_id,
                    size,
                    current = current.kind(),
                    previous = previous.kind(),
                    "successive results are not comparable"
                );
            } else {
                debug!(run_id, size, distance = distance.value(), "refinement step");
            }

            self.history.push(ConvergenceRecord {
                run_id,
                iteration,
                size,
                distance,
                result: current.clone(),
            });

            if distance.is_within(tolerance) {
                info!(run_id, size, iterations, "converged");
                return Ok(ConvergenceOutcome {
                    value: current,
                    size,
                    last_computed_size: size,
                    converged: true,
                    iterations,
                    run_id,
                    records: self.history[first_record..].to_vec(),
                });
            }
            previous = current;
        }

        warn!(
            run_id,
            last_size = size,
            tolerance,
            overflowed,
            "failed to converge within {} iterations",
            max_iterations
        );
        Ok(ConvergenceOutcome {
            value: previous,
            size: size.saturating_mul(2),
            last_computed_size: size,
            converged: false,
            iterations,
            run_id,
            records: self.history[first_record..].to_vec(),
        })
    }
}

impl Default for AdaptiveConvergence {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// One-shot call interface: fresh driver, best-effort `(value, size)`.
///
/// Non-convergence still returns `Ok` (with a warning); `Err` only reports an
/// invalid `tolerance` / `max_iterations`.
pub fn adaptive_convergence<F, T>(
    compute: F,
    tolerance: f64,
    max_iterations: usize,
) -> Result<(Observable, usize)>
where
    F: FnMut(usize) -> T,
    T: Into<Observable>,
{
    let mut driver = AdaptiveConvergence::new(ConvergenceConfig::new(tolerance, max_iterations))?;
    Ok(driver.run(compute).into_pair())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn driver(tolerance: f64, max_iterations: usize) -> AdaptiveConvergence {
        AdaptiveConvergence::new(ConvergenceConfig::new(tolerance, max_iterations)).unwrap()
    }

    #[test]
    fn test_scalar_convergence_size_and_value() {
        // |1/n − 2/n| = 1/n: 0.05, 0.025, 0.0125, 0.00625 → first pass at 160.
        let mut d = driver(1e-2, 10);
        let out = d.run(|n| 1.0 / n as f64);
        assert!(out.converged);
        assert_eq!(out.size, 160);
        assert_eq!(out.value, Observable::Real(1.0 / 160.0));
        assert_eq!(out.iterations, 5);
        assert_eq!(out.records.len(), 4);
        assert_eq!(out.final_distance(), Some(Distance::Finite(1.0 / 80.0 - 1.0 / 160.0)));
    }

    #[test]
    fn test_doubling_sequence() {
        let mut sizes = Vec::new();
        let mut d = driver(1e-12, 6);
        d.run(|n| {
            sizes.push(n);
            n as f64
        });
        assert_eq!(sizes, vec![10, 20, 40, 80, 160, 320]);
    }

    #[test]
    fn test_tolerance_is_strict() {
        // Constant step of exactly 0.5 never satisfies tolerance 0.5.
        let mut d = driver(0.5, 4);
        let out = d.run(|n| ((n / 10).trailing_zeros() % 2) as f64 * 0.5);
        assert!(!out.converged);
        assert!(out.records.iter().all(|r| r.distance == Distance::Finite(0.5)));
    }

    #[test]
    fn test_non_convergence_returns_last_value_and_next_size() {
        let mut d = driver(1e-12, 3);
        let out = d.run(|n| n as f64);
        assert!(!out.converged);
        assert_eq!(out.iterations, 3);
        assert_eq!(out.value, Observable::Real(40.0));
        assert_eq!(out.size, 80);
        assert_eq!(out.last_computed_size, 40);
        assert_eq!(out.records.len(), 2);
        assert_eq!(d.history().len(), 2);
    }

    #[test]
    fn test_single_iteration_budget_has_no_records() {
        let mut d = driver(1.0, 1);
        let out = d.run(|n| n as f64);
        assert!(!out.converged);
        assert_eq!(out.size, 20);
        assert_eq!(out.last_computed_size, 10);
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_size_overflow_stops_without_panicking() {
        let cfg = ConvergenceConfig {
            initial_size: usize::MAX / 2 + 1,
            ..ConvergenceConfig::new(1e-12, 5)
        };
        let mut d = AdaptiveConvergence::new(cfg).unwrap();
        let out = d.run(|n| n as f64);
        assert!(!out.converged);
        assert_eq!(out.iterations, 1);
        assert_eq!(out.last_computed_size, usize::MAX / 2 + 1);
        assert_eq!(out.size, usize::MAX);
        assert!(d.history().is_empty());
    }

    #[test]
    fn test_immediate_convergence_on_second_call() {
        let mut d = driver(1e-12, 10);
        let out = d.run(|_| 42.0);
        assert!(out.converged);
        assert_eq!(out.size, 20);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].iteration, 1);
    }

    #[test]
    fn test_vector_convergence_uses_l2() {
        // Length-4 vector filled with 1/n: distance = √4 · (1/n_prev − 1/n) = 1/n.
        let mut d = driver(1e-2, 10);
        let out = d.run(|n| vec![1.0 / n as f64; 4]);
        assert!(out.converged);
        let r = &out.records[0];
        assert_eq!(r.size, 20);
        let expected = 2.0 * (1.0 / 10.0 - 1.0 / 20.0);
        assert!((r.distance.value() - expected).abs() < 1e-15);
        // 1/n < 1e-2 first at n = 160 (1/160 = 0.00625).
        assert_eq!(out.size, 160);
    }

    #[test]
    fn test_growing_vector_never_converges() {
        let mut d = driver(1e-2, 4);
        let out = d.run(|n| vec![0.0; n]);
        assert!(!out.converged);
        assert_eq!(out.size, 160);
        assert_eq!(out.last_computed_size, 80);
        assert!(out.records.iter().all(|r| r.distance.is_incomparable()));
    }

    #[test]
    fn test_incomparable_types_do_not_panic() {
        let mut d = driver(1e-3, 5);
        let out = d.run(|n| {
            if n % 20 == 0 {
                Observable::from("string result")
            } else {
                Observable::from(1.0)
            }
        });
        assert!(!out.converged);
        assert_eq!(out.records.len(), 4);
        assert!(out.records.iter().all(|r| r.distance.is_incomparable()));
    }

    #[test]
    fn test_complex_results_converge() {
        let mut d = driver(1e-3, 12);
        let out = d.run(|n| Complex64::new(1.0, 1.0 / n as f64));
        assert!(out.converged);
        // |i/n − i/(n/2)| = 1/n < 1e-3 first at n = 1280.
        assert_eq!(out.size, 1280);
    }

    #[test]
    fn test_history_is_append_only_across_runs() {
        let mut d = driver(1e-2, 10);
        let first = d.run(|n| 1.0 / n as f64);
        let after_first: Vec<_> = d.history().to_vec();
        let second = d.run(|n| n as f64);

        assert_eq!(first.run_id, 0);
        assert_eq!(second.run_id, 1);
        assert_eq!(d.runs(), 2);
        assert_eq!(d.history().len(), first.records.len() + second.records.len());
        assert_eq!(&d.history()[..after_first.len()], &after_first[..]);
        assert_eq!(d.records_for_run(0).count(), first.records.len());
        assert_eq!(d.records_for_run(1).count(), second.records.len());
        assert!(d.records_for_run(1).all(|r| r.run_id == 1));
    }

    #[test]
    fn test_history_length_matches_compared_iterations() {
        for max_iterations in 1..8 {
            let mut d = driver(1e-12, max_iterations);
            let out = d.run(|n| n as f64);
            assert_eq!(d.history().len(), max_iterations - 1);
            assert_eq!(out.iterations, max_iterations);
        }
    }

    #[test]
    fn test_determinism() {
        let f = |n: usize| (1..=n).map(|k| 1.0 / (k * k) as f64).sum::<f64>();
        let mut a = driver(1e-3, 10);
        let mut b = driver(1e-3, 10);
        let out_a = a.run(f);
        let out_b = b.run(f);
        assert_eq!(out_a, out_b);
        assert_eq!(a.history().len(), b.history().len());
    }

    #[test]
    fn test_try_run_propagates_compute_error() {
        let mut d = driver(1e-12, 10);
        let res: core::result::Result<ConvergenceOutcome, &str> = d.try_run(|n| {
            if n >= 40 {
                Err("eigensolver failed")
            } else {
                Ok(n as f64)
            }
        });
        assert_eq!(res, Err("eigensolver failed"));
        // 10 → 20 compared once before the failure at 40.
        assert_eq!(d.history().len(), 1);
        assert_eq!(d.runs(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(AdaptiveConvergence::new(ConvergenceConfig::new(0.0, 10)).is_err());
        assert!(AdaptiveConvergence::new(ConvergenceConfig::new(-1.0, 10)).is_err());
        assert!(AdaptiveConvergence::new(ConvergenceConfig::new(f64::NAN, 10)).is_err());
        assert!(AdaptiveConvergence::new(ConvergenceConfig::new(1e-3, 0)).is_err());
        let cfg = ConvergenceConfig {
            initial_size: 0,
            ..ConvergenceConfig::default()
        };
        assert!(AdaptiveConvergence::new(cfg).is_err());
    }

    #[test]
    fn test_default_config() {
        let d = AdaptiveConvergence::default();
        assert_eq!(d.config().tolerance, 1e-12);
        assert_eq!(d.config().max_iterations, 10);
        assert_eq!(d.config().initial_size, 10);
    }

    #[test]
    fn test_size_at() {
        let cfg = ConvergenceConfig::default();
        assert_eq!(cfg.size_at(0), Some(10));
        assert_eq!(cfg.size_at(3), Some(80));
        assert_eq!(cfg.size_at(200), None);
    }

    #[test]
    fn test_free_function_interface() {
        let (value, size) = adaptive_convergence(|n| 1.0 / n as f64, 1e-2, 10).unwrap();
        assert_eq!(size, 160);
        assert_eq!(value, Observable::Real(1.0 / 160.0));

        let (value, size) = adaptive_convergence(|n| n as f64, 1e-12, 3).unwrap();
        assert_eq!((value, size), (Observable::Real(40.0), 80));

        assert!(adaptive_convergence(|n| n as f64, 0.0, 3).is_err());
    }
}
