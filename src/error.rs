/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Crate-wide error type.
//!
//! Non-convergence of the [`AdaptiveConvergence`](crate::convergence::AdaptiveConvergence)
//! driver is deliberately *not* represented here: it is reported through
//! [`ConvergenceOutcome::converged`](crate::convergence::ConvergenceOutcome::converged)
//! and a `tracing` warning, never as an `Err`.

use thiserror::Error;

/// Errors raised by the numerical models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmergenceError {
    /// A configuration value is outside its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two operands have incompatible shapes.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Human-readable description of the expected shape.
        expected: String,
        /// Human-readable description of the shape actually supplied.
        actual: String,
    },

    /// A square matrix was required.
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare {
        /// Row count of the offending matrix.
        rows: usize,
        /// Column count of the offending matrix.
        cols: usize,
    },

    /// A numeric interval is empty, inverted or non-finite.
    #[error("invalid range [{start}, {end}]")]
    InvalidRange {
        /// Lower bound supplied.
        start: f64,
        /// Upper bound supplied.
        end: f64,
    },

    /// A bipartition needs a state dimension that is a perfect square.
    #[error("state dimension {0} is not a perfect square")]
    NotPerfectSquare(usize),

    /// An integer result does not fit the return type.
    #[error("integer overflow computing {0}")]
    Overflow(&'static str),

    /// An integration produced a non-finite state.
    #[error("integration diverged at t = {at}")]
    Diverged {
        /// Integration variable at which the state stopped being finite.
        at: f64,
    },

    /// The input carries no usable information (empty, constant, all-zero).
    #[error("degenerate input: {0}")]
    Degenerate(&'static str),
}

/// Crate result alias.
pub type Result<T> = core::result::Result<T, EmergenceError>;

pub(crate) fn require_square(rows: usize, cols: usize) -> Result<()> {
    if rows != cols {
        return Err(EmergenceError::NotSquare { rows, cols });
    }
    Ok(())
}
