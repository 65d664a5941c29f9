//! # emergence-core
//!
//! Toy numerical models of dimensional emergence, built around one small piece
//! of real numerics: an adaptive convergence driver that doubles the problem
//! size until successive results agree.
//!
//! ---
//!
//! ## The driver
//!
//! A caller supplies `compute(n)` for a problem truncated to `n` dimensions.
//! The driver evaluates it at `10, 20, 40, …`, measures the distance between
//! successive results and stops once that distance drops below the tolerance.
//! Every compared iteration is appended to the driver's history.
//!
//! ```rust
//! use emergence_core::adaptive_convergence;
//!
//! let (value, size) = adaptive_convergence(|n| 1.0 / n as f64, 1e-2, 10).unwrap();
//! assert_eq!(size, 160);
//! assert!((value.as_real().unwrap() - 1.0 / 160.0).abs() < 1e-12);
//! ```
//!
//! ## The toys
//!
//! ```text
//!   DimensionCutoff ──▶ QuantumSystem ──┐
//!                                      ├──▶ AdaptiveConvergence
//!   RgFlow / GaugeTheory / analysis ────┘
//!
//!   UnifiedFramework (cycle)   TransitionSystem (transitions)   mathematics
//! ```
//!
//! The physics modules are deterministic functions of their inputs plus an
//! explicit random number generator where sampling is involved. None of them
//! touch the convergence driver directly; they are what a caller plugs into it.
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`observable`] | [`Observable`], [`Distance`] | Values a computation may return and the distance between two of them |
//! | [`convergence`] | [`AdaptiveConvergence`], [`ConvergenceConfig`] | Dimension-doubling convergence driver with history |
//! | [`space`] | [`DimensionCutoff`] | Truncation of vectors and matrices to a working dimension |
//! | [`quantum`] | [`QuantumSystem`] | Finite-difference Hamiltonians, spectra, evolution, entanglement |
//! | [`gauge`] | [`GaugeTheory`], [`GaugeField`] | Matrix-valued gauge fields, Yang-Mills action, Wilson loops |
//! | [`renormalization`] | [`RgFlow`] | RK4 coupling flow, fixed points, critical exponents |
//! | [`analysis`] | [`EffectiveDimension`], [`PhaseTransition`] | Effective dimension, emergence metrics, transition detection |
//! | [`mathematics`] | [`ScalingLaw`], [`ComplexityMeasure`] | Entropy, scaling laws, SVD reduction, complexity measures |
//! | [`transitions`] | [`TransitionSystem`] | Emanation/return ODE over a simulated state vector |
//! | [`cycle`] | [`UnifiedFramework`], [`DimensionalState`] | Discrete walk through dimensional states |
//! | [`report`] | [`report::ConvergenceReport`] | Serialisable convergence history (requires `serde` feature) |
//!
//! ## Features
//!
//! - `serde`: serialisation for configs, observables and [`report`].
//! - `python-ffi`: PyO3 bindings for the convergence driver.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber. Failed
//! convergence is reported at `WARN`; per-iteration progress at `DEBUG`.
//!
//! ## License
//!
//! Business Source License 1.1. Free for evaluation and non-production use.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod observable;
pub mod convergence;
pub mod space;
pub mod quantum;
pub mod gauge;
pub mod renormalization;
pub mod analysis;
pub mod mathematics;
pub mod transitions;
pub mod cycle;
#[cfg(feature = "serde")]
pub mod report;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use analysis::{EffectiveDimension, EmergenceMetrics, PhaseTransition};
pub use convergence::{
    adaptive_convergence, AdaptiveConvergence, ConvergenceConfig, ConvergenceOutcome,
    ConvergenceRecord, RunId,
};
pub use cycle::{DimensionalState, TransitionMode, UnifiedFramework};
pub use error::{EmergenceError, Result};
pub use gauge::{GaugeField, GaugeTheory};
pub use mathematics::{ComplexityMeasure, ScalingLaw};
pub use observable::{ArrayBuilder, Distance, Observable};
pub use quantum::QuantumSystem;
pub use renormalization::{RgConfig, RgFlow};
pub use space::DimensionCutoff;
pub use transitions::{CycleConfig, TransitionSystem};
