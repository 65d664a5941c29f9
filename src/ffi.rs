/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Python bindings for the convergence driver via PyO3.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from emergence_core import AdaptiveConvergence, adaptive_convergence
//!
//! value, size = adaptive_convergence(lambda n: 1.0 / n, tolerance=1e-2)
//! assert size == 160
//!
//! driver = AdaptiveConvergence(tolerance=1e-2, max_iterations=10)
//! value, size, converged = driver.run(lambda n: [1.0 / n] * 4)
//! for run_id, iteration, size, distance, result in driver.history():
//!     ...
//! ```
//!
//! Callables may return a float or int, a complex, a rectangular nested
//! sequence of floats of any depth (lists, tuples, NumPy arrays; the shape is
//! kept and arrays of different shape never compare), or anything else.
//! Anything else is kept as its `repr` and never converges. Array results come
//! back to Python as a flat row-major list. Exceptions raised by the callable
//! abort the run and propagate unchanged.

use num_complex::Complex64;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PySequence, PyString};

use crate::convergence::{
    AdaptiveConvergence as RustAdaptiveConvergence, ConvergenceConfig, DEFAULT_MAX_ITERATIONS,
    DEFAULT_TOLERANCE,
};
use crate::error::EmergenceError;
use crate::observable::{ArrayBuilder, Observable};

impl From<EmergenceError> for PyErr {
    fn from(e: EmergenceError) -> Self {
        PyValueError::new_err(e.to_string())
    }
}

// ── Value conversion ─────────────────────────────────────────────────────────

fn to_observable(obj: &Bound<'_, PyAny>) -> Observable {
    if obj.is_instance_of::<PyString>() {
        return Observable::Opaque(repr_of(obj));
    }
    if as_sequence(obj).is_some_and(|seq| seq.len().is_ok()) {
        let mut builder = ArrayBuilder::new();
        if walk_array(obj, 0, &mut builder).is_some() {
            if let Some(array) = builder.finish() {
                return array;
            }
        }
    }
    if let Ok(v) = obj.extract::<f64>() {
        return Observable::Real(v);
    }
    if let Ok(c) = obj.extract::<Complex64>() {
        return Observable::Complex(c);
    }
    Observable::Opaque(repr_of(obj))
}

/// Sequences that may hold array data; text and bytes never do.
fn as_sequence<'a, 'py>(obj: &'a Bound<'py, PyAny>) -> Option<&'a Bound<'py, PySequence>> {
    if obj.is_instance_of::<PyString>() || obj.is_instance_of::<PyBytes>() {
        return None;
    }
    obj.downcast::<PySequence>().ok()
}

fn walk_array(obj: &Bound<'_, PyAny>, depth: usize, builder: &mut ArrayBuilder) -> Option<()> {
    // 0-d NumPy arrays pass the sequence check but have no length.
    match as_sequence(obj).and_then(|seq| seq.len().ok()) {
        Some(len) => {
            builder.sequence(depth, len)?;
            for item in obj.iter().ok()? {
                walk_array(&item.ok()?, depth + 1, builder)?;
            }
            Some(())
        }
        None => builder.scalar(depth, obj.extract::<f64>().ok()?),
    }
}

fn repr_of(obj: &Bound<'_, PyAny>) -> String {
    obj.repr()
        .map(|r| r.to_string())
        .unwrap_or_else(|_| "<unrepresentable>".to_string())
}

fn to_python(py: Python<'_>, value: &Observable) -> PyObject {
    match value {
        Observable::Real(v) => v.into_py(py),
        Observable::Complex(c) => c.into_py(py),
        Observable::Vector { data, .. } => data.clone().into_py(py),
        Observable::Opaque(s) => s.clone().into_py(py),
    }
}

fn call_compute(compute: &Bound<'_, PyAny>, size: usize) -> PyResult<Observable> {
    let out = compute.call1((size,))?;
    Ok(to_observable(&out))
}

// ── Driver ───────────────────────────────────────────────────────────────────

/// Dimension-doubling convergence driver with an append-only history.
#[pyclass(name = "AdaptiveConvergence")]
pub struct PyAdaptiveConvergence {
    inner: RustAdaptiveConvergence,
}

#[pymethods]
impl PyAdaptiveConvergence {
    /// Create a driver.
    ///
    /// Args:
    ///     tolerance:      success threshold on successive distances (default 1e-12)
    ///     max_iterations: maximum compute calls per run (default 10)
    #[new]
    #[pyo3(signature = (tolerance=DEFAULT_TOLERANCE, max_iterations=DEFAULT_MAX_ITERATIONS))]
    pub fn new(tolerance: f64, max_iterations: usize) -> PyResult<Self> {
        let inner = RustAdaptiveConvergence::new(ConvergenceConfig::new(tolerance, max_iterations))?;
        Ok(Self { inner })
    }

    /// Run `compute(size)` at doubling sizes.
    ///
    /// Returns:
    ///     (value, size, converged)
    pub fn run(&mut self, py: Python<'_>, compute: &Bound<'_, PyAny>) -> PyResult<(PyObject, usize, bool)> {
        let outcome = self.inner.try_run(|n| call_compute(compute, n))?;
        Ok((to_python(py, &outcome.value), outcome.size, outcome.converged))
    }

    /// Every record so far as `(run_id, iteration, size, distance, result)`.
    /// `distance` is `None` for incomparable results.
    pub fn history(&self, py: Python<'_>) -> Vec<(u32, usize, usize, Option<f64>, PyObject)> {
        self.inner
            .history()
            .iter()
            .map(|r| {
                (
                    r.run_id,
                    r.iteration,
                    r.size,
                    r.distance.finite(),
                    to_python(py, &r.result),
                )
            })
            .collect()
    }

    /// Number of runs started.
    #[getter]
    pub fn runs(&self) -> u32 {
        self.inner.runs()
    }

    /// Configured tolerance.
    #[getter]
    pub fn tolerance(&self) -> f64 {
        self.inner.config().tolerance
    }

    /// Configured iteration budget.
    #[getter]
    pub fn max_iterations(&self) -> usize {
        self.inner.config().max_iterations
    }

    /// Number of records in the history.
    pub fn __len__(&self) -> usize {
        self.inner.history().len()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "AdaptiveConvergence(tolerance={}, max_iterations={}, records={})",
            self.inner.config().tolerance,
            self.inner.config().max_iterations,
            self.inner.history().len()
        )
    }
}

/// One-shot convergence with a fresh driver.
///
/// Returns:
///     (value, size): the converged value, or the last computed one
#[pyfunction]
#[pyo3(signature = (compute, tolerance=DEFAULT_TOLERANCE, max_iterations=DEFAULT_MAX_ITERATIONS))]
pub fn adaptive_convergence(
    py: Python<'_>,
    compute: &Bound<'_, PyAny>,
    tolerance: f64,
    max_iterations: usize,
) -> PyResult<(PyObject, usize)> {
    let mut driver = RustAdaptiveConvergence::new(ConvergenceConfig::new(tolerance, max_iterations))?;
    let outcome = driver.try_run(|n| call_compute(compute, n))?;
    Ok((to_python(py, &outcome.value), outcome.size))
}

// ── Module entry point ────────────────────────────────────────────────────────

/// Dimensional emergence toolkit: adaptive convergence driver.
#[pymodule]
pub fn emergence_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyAdaptiveConvergence>()?;
    m.add_function(wrap_pyfunction!(adaptive_convergence, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("DEFAULT_TOLERANCE", DEFAULT_TOLERANCE)?;
    Ok(())
}
