/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Conceptual 0↔N cycle over a single scalar dimension.
//!
//! [`UnifiedFramework`] tracks one [`DimensionalState`] at a time and moves it
//! outward (emanation) or back toward unity (return). Every state it moves
//! through is appended to its history.
//!
//! # Invariants
//!
//! - `history` is append-only and its last entry is always `current`.
//! - Coherence produced by the return step never exceeds 1.

use crate::error::{EmergenceError, Result};

/// Dimension reached at the peak of [`UnifiedFramework::simulate_cycle`].
pub const PEAK_DIMENSION: f64 = 12.0;

// ─── Domains ────────────────────────────────────────────────────────────────

/// Coarse classification of a dimension value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DimensionalDomain {
    /// Exactly 0.
    Unity,
    /// Up to 3.
    Physical,
    /// Above 3, up to 6.
    Temporal,
    /// Above 6, up to 9.
    Energetic,
    /// Exactly 10.
    Conscious,
    /// Any other value below 100.
    Higher,
    /// 100 and beyond.
    Infinite,
}

impl DimensionalDomain {
    /// Domain of `dimension`.
    pub fn classify(dimension: f64) -> Self {
        if dimension == 0.0 {
            Self::Unity
        } else if dimension <= 3.0 {
            Self::Physical
        } else if dimension <= 6.0 {
            Self::Temporal
        } else if dimension <= 9.0 {
            Self::Energetic
        } else if dimension == 10.0 {
            Self::Conscious
        } else if dimension < 100.0 {
            Self::Higher
        } else {
            Self::Infinite
        }
    }

    /// Human-readable description of `dimension` in this domain.
    pub fn describe(dimension: f64) -> String {
        match Self::classify(dimension) {
            Self::Unity => "Unity: pure undifferentiated potential".into(),
            Self::Physical => format!("Physical: {dimension}D spatial reality"),
            Self::Temporal => format!("Temporal: {dimension}D including time dimensions"),
            Self::Energetic => format!("Energetic: {dimension}D energy-information space"),
            Self::Conscious => "Consciousness: aware observer dimension".into(),
            Self::Higher => format!("Higher: {dimension}D expanded reality"),
            Self::Infinite => "Infinite: approaching unity through maximum complexity".into(),
        }
    }
}

// ─── State ──────────────────────────────────────────────────────────────────

/// A point on the cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionalState {
    /// Dimension value, 0 at unity.
    pub dimension: f64,
    /// 0 for unity, 1 for maximal differentiation.
    pub complexity: f64,
    /// 0 for chaos, 1 for perfect order.
    pub coherence: f64,
    /// Free-text label.
    pub description: String,
}

impl DimensionalState {
    /// State with a description derived from its dimension.
    pub fn new(dimension: f64, complexity: f64, coherence: f64) -> Self {
        Self {
            dimension,
            complexity,
            coherence,
            description: DimensionalDomain::describe(dimension),
        }
    }

    /// `|dimension · complexity|`.
    pub fn unity_distance(&self) -> f64 {
        (self.dimension * self.complexity).abs()
    }

    /// `c (1 − c) · coherence`; peaks at intermediate complexity.
    pub fn emergence_potential(&self) -> f64 {
        self.complexity * (1.0 - self.complexity) * self.coherence
    }

    /// Domain of this state's dimension.
    pub fn domain(&self) -> DimensionalDomain {
        DimensionalDomain::classify(self.dimension)
    }
}

/// How [`UnifiedFramework::transition`] moves between dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionMode {
    /// Roughly one state per unit of dimension.
    #[default]
    Gradual,
    /// Start and end states only.
    Direct,
}

/// Per-step observables of [`UnifiedFramework::simulate_cycle`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CycleMetrics {
    /// Dimension per step.
    pub dimension: Vec<f64>,
    /// Complexity per step.
    pub complexity: Vec<f64>,
    /// Coherence per step.
    pub coherence: Vec<f64>,
    /// Unity distance per step.
    pub unity_distance: Vec<f64>,
    /// Emergence potential per step.
    pub emergence_potential: Vec<f64>,
}

impl CycleMetrics {
    fn push(&mut self, s: &DimensionalState) {
        self.dimension.push(s.dimension);
        self.complexity.push(s.complexity);
        self.coherence.push(s.coherence);
        self.unity_distance.push(s.unity_distance());
        self.emergence_potential.push(s.emergence_potential());
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.dimension.len()
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.dimension.is_empty()
    }
}

// ─── Framework ──────────────────────────────────────────────────────────────

/// Current state plus the path that led to it.
#[derive(Clone, Debug, PartialEq)]
pub struct UnifiedFramework {
    current: DimensionalState,
    history: Vec<DimensionalState>,
}

impl Default for UnifiedFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl UnifiedFramework {
    /// Framework starting in ordinary 3D reality.
    pub fn new() -> Self {
        let mut current = DimensionalState::new(3.0, 0.5, 0.7);
        current.description = "Standard physical reality".into();
        Self {
            history: vec![current.clone()],
            current,
        }
    }

    /// Current state.
    pub fn current(&self) -> &DimensionalState {
        &self.current
    }

    /// Every state visited, oldest first.
    pub fn history(&self) -> &[DimensionalState] {
        &self.history
    }

    fn advance(&mut self, state: DimensionalState) {
        self.history.push(state.clone());
        self.current = state;
    }

    /// Normalised activation of dimensions `0..=max_dims`.
    ///
    /// Exponential decay `e^{-0.3 d}` with physical (1–3, ×1.5), temporal
    /// (4–6, ×1.2) and conscious (10, ×2) enhancement, scaled so the peak is 1.
    /// A non-positive `unity` gives all zeros.
    pub fn emanation_pattern(&self, unity: f64, max_dims: usize) -> Vec<f64> {
        if unity <= 0.0 {
            return vec![0.0; max_dims + 1];
        }
        let activations: Vec<f64> = (0..=max_dims)
            .map(|d| {
                let boost = match d {
                    1..=3 => 1.5,
                    4..=6 => 1.2,
                    10 => 2.0,
                    _ => 1.0,
                };
                unity * (-0.3 * d as f64).exp() * boost
            })
            .collect();
        let peak = activations.iter().copied().fold(f64::MIN, f64::max);
        activations.into_iter().map(|a| a / peak).collect()
    }

    /// State one return step from `dimension` at the given recognition level.
    ///
    /// Complexity and coherence are taken from the current state. Does not
    /// modify the framework.
    pub fn return_step(&self, dimension: f64, recognition: f64) -> DimensionalState {
        let mut strength = recognition * 0.1;
        if dimension > 10.0 {
            strength *= 2.0;
        }
        DimensionalState {
            dimension: dimension * (1.0 - strength),
            complexity: self.current.complexity * (1.0 - strength),
            coherence: (self.current.coherence + recognition * 0.1).min(1.0),
            description: format!("Returning toward unity (recognition: {recognition:.2})"),
        }
    }

    /// Emergence between two states, clipped to `[0, 1]`.
    pub fn emergence_measure(&self, lower: &DimensionalState, higher: &DimensionalState) -> f64 {
        let differentiation = (higher.complexity - lower.complexity).abs();
        let integration = lower.coherence.min(higher.coherence);
        let novelty = higher.emergence_potential() - lower.emergence_potential();
        (differentiation * integration + novelty).clamp(0.0, 1.0)
    }

    /// Move to `target`, returning the states passed through.
    ///
    /// The path always ends at `target`. The framework's current state and
    /// history are updated.
    pub fn transition(&mut self, target: f64, mode: TransitionMode) -> Vec<DimensionalState> {
        let start = self.current.dimension;
        let dims: Vec<f64> = match mode {
            TransitionMode::Direct => vec![start, target],
            TransitionMode::Gradual => {
                let span = (target - start).abs();
                let mut n = span as usize + 1;
                if span > 0.0 {
                    n = n.max(2);
                }
                if n == 1 {
                    vec![start]
                } else {
                    let step = (target - start) / (n - 1) as f64;
                    (0..n)
                        .map(|i| if i == n - 1 { target } else { start + step * i as f64 })
                        .collect()
                }
            }
        };

        let path: Vec<DimensionalState> = dims
            .into_iter()
            .map(|d| {
                let c = complexity_at(d);
                DimensionalState::new(d, c, 1.0 - 0.5 * c)
            })
            .collect();
        for s in &path {
            self.advance(s.clone());
        }
        path
    }

    /// Run a cycle of `duration` steps: emanate from unity to
    /// [`PEAK_DIMENSION`] over the first half, then return with rising
    /// recognition over the second.
    pub fn simulate_cycle(&mut self, duration: usize) -> Result<CycleMetrics> {
        let half = duration / 2;
        if half == 0 {
            return Err(EmergenceError::InvalidConfig(format!(
                "cycle needs at least 2 steps, got {duration}"
            )));
        }

        let mut metrics = CycleMetrics::default();
        let mut unity = DimensionalState::new(0.0, 0.0, 1.0);
        unity.description = "Unity".into();
        self.advance(unity);

        for t in 0..duration {
            let next = if t < half {
                let d = t as f64 / half as f64 * PEAK_DIMENSION;
                DimensionalState::new(d, (d / PEAK_DIMENSION).min(1.0), (1.0 - d / 20.0).max(0.3))
            } else {
                let progress = (t - half) as f64 / half as f64;
                self.return_step(self.current.dimension, progress)
            };
            metrics.push(&next);
            self.advance(next);
        }
        Ok(metrics)
    }
}

/// Complexity along a transition path: linear up to 10, sigmoid beyond.
fn complexity_at(dimension: f64) -> f64 {
    if dimension == 0.0 {
        0.0
    } else if dimension < 10.0 {
        dimension / 10.0
    } else {
        1.0 / (1.0 + (-(dimension - 10.0)).exp())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_measures() {
        let s = DimensionalState::new(-4.0, 0.5, 0.8);
        assert_eq!(s.unity_distance(), 2.0);
        assert!((s.emergence_potential() - 0.2).abs() < 1e-15);
    }

    #[test]
    fn test_classify_boundaries() {
        use DimensionalDomain::*;
        let cases = [
            (0.0, Unity),
            (3.0, Physical),
            (3.5, Temporal),
            (6.0, Temporal),
            (9.0, Energetic),
            (9.5, Higher),
            (10.0, Conscious),
            (99.0, Higher),
            (100.0, Infinite),
            (f64::INFINITY, Infinite),
        ];
        for (d, expected) in cases {
            assert_eq!(DimensionalDomain::classify(d), expected, "d={}", d);
        }
    }

    #[test]
    fn test_new_framework_starts_in_3d() {
        let f = UnifiedFramework::new();
        assert_eq!(f.current().dimension, 3.0);
        assert_eq!(f.history().len(), 1);
        assert_eq!(f.current().domain(), DimensionalDomain::Physical);
    }

    #[test]
    fn test_emanation_pattern_normalised() {
        let f = UnifiedFramework::new();
        let p = f.emanation_pattern(1.0, 12);
        assert_eq!(p.len(), 13);
        // 1.5 e^{-0.3} beats the unboosted origin.
        assert_eq!(p[1], 1.0);
        assert!(p.iter().all(|&a| a > 0.0 && a <= 1.0));
        assert!(p[10] > p[9], "conscious spike");
        assert_eq!(f.emanation_pattern(0.0, 3), vec![0.0; 4]);
    }

    #[test]
    fn test_return_step_from_default_state() {
        let f = UnifiedFramework::new();
        let s = f.return_step(3.0, 0.5);
        assert!((s.dimension - 2.85).abs() < 1e-12);
        assert!((s.complexity - 0.475).abs() < 1e-12);
        assert!((s.coherence - 0.75).abs() < 1e-12);

        // Above 10 the return strength doubles.
        let s = f.return_step(12.0, 0.5);
        assert!((s.dimension - 10.8).abs() < 1e-12);
        // Pure read: nothing recorded.
        assert_eq!(f.history().len(), 1);
    }

    #[test]
    fn test_emergence_measure_clipped() {
        let f = UnifiedFramework::new();
        let lo = DimensionalState::new(1.0, 0.1, 0.9);
        let hi = DimensionalState::new(5.0, 0.5, 0.8);
        // 0.4 · 0.8 + (0.2 − 0.081)
        let m = f.emergence_measure(&lo, &hi);
        assert!((m - (0.32 + 0.2 - 0.081)).abs() < 1e-12, "m={}", m);
        assert!((f.emergence_measure(&hi, &lo) - 0.201).abs() < 1e-12);

        let ordered = DimensionalState::new(2.0, 0.5, 1.0);
        let chaotic = DimensionalState::new(4.0, 0.5, 0.0);
        assert_eq!(f.emergence_measure(&ordered, &chaotic), 0.0);
    }

    #[test]
    fn test_gradual_transition_steps_through_integers() {
        let mut f = UnifiedFramework::new();
        let path = f.transition(6.0, TransitionMode::Gradual);
        let dims: Vec<f64> = path.iter().map(|s| s.dimension).collect();
        assert_eq!(dims, vec![3.0, 4.0, 5.0, 6.0]);
        assert!((f.current().complexity - 0.6).abs() < 1e-12);
        assert!((f.current().coherence - 0.7).abs() < 1e-12);
        assert_eq!(f.history().len(), 5);
    }

    #[test]
    fn test_direct_transition_and_sigmoid_complexity() {
        let mut f = UnifiedFramework::new();
        let path = f.transition(12.0, TransitionMode::Direct);
        assert_eq!(path.len(), 2);
        let expected = 1.0 / (1.0 + (-2.0_f64).exp());
        assert!((f.current().complexity - expected).abs() < 1e-12);
    }

    #[test]
    fn test_fractional_transition_reaches_target() {
        let mut f = UnifiedFramework::new();
        let path = f.transition(3.5, TransitionMode::Gradual);
        assert_eq!(path.len(), 2);
        assert_eq!(f.current().dimension, 3.5);
        let path = f.transition(3.5, TransitionMode::Gradual);
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_simulate_cycle_emanates_then_returns() {
        let mut f = UnifiedFramework::new();
        let m = f.simulate_cycle(100).unwrap();
        assert_eq!(m.len(), 100);
        assert_eq!(m.dimension[0], 0.0);
        let peak = m.dimension[49];
        assert!((peak - 49.0 / 50.0 * 12.0).abs() < 1e-12);
        assert!(m.dimension[99] < peak);
        assert!(m.dimension[50..].windows(2).all(|w| w[1] <= w[0]));
        assert!(m.coherence.iter().all(|&c| c <= 1.0));
        // Initial state, the unity reset, then one entry per step.
        assert_eq!(f.history().len(), 1 + 1 + 100);
        assert_eq!(f.history().last(), Some(f.current()));
    }

    #[test]
    fn test_simulate_cycle_too_short() {
        let mut f = UnifiedFramework::new();
        assert!(f.simulate_cycle(1).is_err());
        assert!(f.simulate_cycle(0).is_err());
        assert_eq!(f.history().len(), 1);
    }
}
