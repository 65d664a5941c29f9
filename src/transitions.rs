/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! 0↔N dimensional transition dynamics.
//!
//! The state is a vector of activations, one per dimension. Emanation feeds
//! activation in from the unity source (strongest in low dimensions), return
//! drains it back (fastest in high dimensions), and nearest neighbours
//! exchange activation at a fixed rate:
//!
//! ```text
//! dy_i/dt = s·e(t)·e^{-0.2 i}  -  r(t)·y_i·(i+1)/n  +  0.1·(y_{i-1} + y_{i+1} - 2 y_i)
//! ```
//!
//! The coupling term conserves `Σ y`, so with both drives off the total
//! activation is constant.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{EmergenceError, Result};
use crate::quantum::linspace;

/// Neighbour exchange rate.
const COUPLING: f64 = 0.1;

/// Dimensions simulated by [`TransitionSystem::simulate_cycle`] at most.
pub const SIMULATED_DIMENSIONS: usize = 20;

/// Recognition level used when reporting unity convergence.
pub const DEFAULT_RECOGNITION: f64 = 0.1;

// ─── System ─────────────────────────────────────────────────────────────────

/// Parameters of the transition dynamics.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionSystem {
    /// Upper bound on modelled dimensions.
    pub max_dimensions: usize,
    /// Strength `s` of the unity source.
    pub unity_field_strength: f64,
    /// Baseline emanation rate.
    pub emanation_rate: f64,
    /// Baseline return rate.
    pub return_rate: f64,
}

impl Default for TransitionSystem {
    fn default() -> Self {
        Self {
            max_dimensions: 100,
            unity_field_strength: 1.0,
            emanation_rate: 0.1,
            return_rate: 0.05,
        }
    }
}

impl TransitionSystem {
    /// `s · e^{-‖x‖/10} · (1 + 0.1 sin t)`.
    pub fn unity_field(&self, position: &[f64], time: f64) -> f64 {
        let distance = position.iter().map(|x| x * x).sum::<f64>().sqrt();
        self.unity_field_strength * (-distance / 10.0).exp() * (1.0 + 0.1 * time.sin())
    }

    /// Activation of `dims` dimensions emanated from a unity of strength `unity`.
    ///
    /// Dimension `i` receives `u e^{-0.1 i}` with 10% Gaussian jitter, floored
    /// at zero. A non-positive unity yields all zeros.
    pub fn emanation<R: Rng + ?Sized>(&self, unity: f64, dims: usize, rng: &mut R) -> Vec<f64> {
        if unity <= 0.0 {
            return vec![0.0; dims];
        }
        (0..dims)
            .map(|i| {
                let base = unity * (-0.1 * i as f64).exp();
                let z: f64 = rng.sample(StandardNormal);
                (base + 0.1 * base * z).max(0.0)
            })
            .collect()
    }

    /// One discrete return step.
    ///
    /// Returns the drained state and the unity convergence
    /// `Σ y·rate / (Σ y + 1e-10)`. An empty state is fully converged.
    pub fn return_step(&self, state: &[f64], recognition: f64) -> (Vec<f64>, f64) {
        let n = state.len();
        if n == 0 {
            return (Vec::new(), 1.0);
        }
        let rate = self.return_rate * recognition;
        let rates = (0..n).map(|i| rate * (n - i) as f64 / n as f64);

        let mut updated = Vec::with_capacity(n);
        let mut returned = 0.0;
        for (y, r) in state.iter().zip(rates) {
            updated.push(y * (1.0 - r));
            returned += y * r;
        }
        let total: f64 = state.iter().sum();
        (updated, returned / (total + 1e-10))
    }

    /// Right-hand side of the transition ODE.
    pub fn derivative(&self, state: &DVector<f64>, emanation_drive: f64, return_drive: f64) -> DVector<f64> {
        let n = state.len();
        let source = self.unity_field_strength * emanation_drive;
        let mut dydt = DVector::from_fn(n, |i, _| {
            source * (-0.2 * i as f64).exp() - return_drive * state[i] * (i + 1) as f64 / n as f64
        });
        for i in 0..n.saturating_sub(1) {
            let flow = COUPLING * (state[i + 1] - state[i]);
            dydt[i] += flow;
            dydt[i + 1] -= flow;
        }
        dydt
    }

    /// Integrate one emanation/return cycle.
    pub fn simulate_cycle(&self, config: &CycleConfig) -> Result<CycleTrajectory> {
        config.validate()?;
        let time = linspace((0.0, config.duration), config.time_steps)?;
        let n = self.max_dimensions.min(SIMULATED_DIMENSIONS);
        if n == 0 {
            return Err(EmergenceError::InvalidConfig("max_dimensions must be at least 1".into()));
        }

        let e = |t: f64| config.emanation_strength * (-t / 10.0).exp();
        let r = |t: f64| config.return_strength * (1.0 + t / 10.0);
        let f = |t: f64, y: &DVector<f64>| self.derivative(y, e(t), r(t));

        let mut y = DVector::zeros(n);
        y[0] = config.initial_unity;
        let mut states = DMatrix::zeros(n, time.len());
        states.set_column(0, &y);

        for k in 1..time.len() {
            let t0 = time[k - 1];
            let h = (time[k] - t0) / config.substeps as f64;
            for s in 0..config.substeps {
                let t = t0 + s as f64 * h;
                let k1 = f(t, &y);
                let k2 = f(t + h / 2.0, &(&y + &k1 * (h / 2.0)));
                let k3 = f(t + h / 2.0, &(&y + &k2 * (h / 2.0)));
                let k4 = f(t + h, &(&y + &k3 * h));
                y += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
            }
            if y.iter().any(|v| !v.is_finite()) {
                return Err(EmergenceError::Diverged { at: time[k] });
            }
            states.set_column(k, &y);
        }

        let mut complexity = Vec::with_capacity(time.len());
        let mut unity_convergence = Vec::with_capacity(time.len());
        let mut information_content = Vec::with_capacity(time.len());
        for column in states.column_iter() {
            let col: Vec<f64> = column.iter().copied().collect();
            complexity.push(col.iter().sum::<f64>());
            unity_convergence.push(self.return_step(&col, DEFAULT_RECOGNITION).1);
            information_content.push(-col.iter().map(|v| v * (v + 1e-10).ln()).sum::<f64>());
        }

        Ok(CycleTrajectory {
            emanation_drive: time.iter().map(|&t| e(t)).collect(),
            return_drive: time.iter().map(|&t| r(t)).collect(),
            time,
            states,
            complexity,
            unity_convergence,
            information_content,
        })
    }
}

// ─── Cycle config / trajectory ──────────────────────────────────────────────

/// Settings for [`TransitionSystem::simulate_cycle`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CycleConfig {
    /// Simulated time span.
    pub duration: f64,
    /// Output samples, including both endpoints.
    pub time_steps: usize,
    /// Activation of dimension 0 at `t = 0`.
    pub initial_unity: f64,
    /// `e₀` in `e(t) = e₀ e^{-t/10}`.
    pub emanation_strength: f64,
    /// `r₀` in `r(t) = r₀ (1 + t/10)`.
    pub return_strength: f64,
    /// RK4 steps between consecutive samples.
    pub substeps: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            duration: 50.0,
            time_steps: 1000,
            initial_unity: 1.0,
            emanation_strength: 0.5,
            return_strength: 0.3,
            substeps: 4,
        }
    }
}

impl CycleConfig {
    /// Reject settings the integrator cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.substeps == 0 {
            return Err(EmergenceError::InvalidConfig("substeps must be at least 1".into()));
        }
        if !self.initial_unity.is_finite()
            || !self.emanation_strength.is_finite()
            || !self.return_strength.is_finite()
        {
            return Err(EmergenceError::InvalidConfig("cycle strengths must be finite".into()));
        }
        Ok(())
    }
}

/// Sampled solution of a cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleTrajectory {
    /// Sample times.
    pub time: Vec<f64>,
    /// Activations, one column per sample.
    pub states: DMatrix<f64>,
    /// `Σ y` per sample.
    pub complexity: Vec<f64>,
    /// Unity convergence per sample.
    pub unity_convergence: Vec<f64>,
    /// `-Σ y ln(y + 1e-10)` per sample.
    pub information_content: Vec<f64>,
    /// `e(t)` per sample.
    pub emanation_drive: Vec<f64>,
    /// `r(t)` per sample.
    pub return_drive: Vec<f64>,
}

// ─── Tests ──────────────────────────────────────────────────────────────────
