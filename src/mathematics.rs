/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Elementary measures used across the framework.
//!
//! Each function is self-contained. Those that accept data validate shape and
//! return [`EmergenceError`] instead of producing NaN.

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::error::{EmergenceError, Result};

/// Histogram bins used by [`ComplexityMeasure::Entropy`].
pub const ENTROPY_BINS: usize = 50;

/// Tolerance of [`multiplicity_conserved`].
pub const CONSERVATION_TOLERANCE: f64 = 1e-6;

/// `states ^ particles`, the dimension of a product Hilbert space.
pub fn hilbert_space_dimension(particles: u32, states: u128) -> Result<u128> {
    states
        .checked_pow(particles)
        .ok_or(EmergenceError::Overflow("hilbert space dimension"))
}

/// Shannon entropy in nats.
///
/// Zeros are skipped. A distribution that does not sum to one is normalised
/// first, with a warning.
pub fn information_entropy(probabilities: &[f64]) -> Result<f64> {
    let total: f64 = probabilities.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(EmergenceError::Degenerate("probabilities must have a positive finite sum"));
    }
    let scale = if (total - 1.0).abs() > 1e-8 + 1e-5 {
        warn!(total, "probabilities do not sum to 1, normalizing");
        total
    } else {
        1.0
    };
    Ok(-probabilities
        .iter()
        .map(|p| p / scale)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.ln())
        .sum::<f64>())
}

/// `1 / (1 + ε d)`, with exact unity at `d = 0` and `d = ∞`.
pub fn unity_limit(dimension: f64, epsilon: f64) -> f64 {
    if dimension == 0.0 || dimension == f64::INFINITY {
        return 1.0;
    }
    1.0 / (1.0 + epsilon * dimension)
}

/// Limit of growing complexity folding back into unity.
///
/// `1 / (1 + mean(complexity[d > 10]))` over the dimensions above ten. Empty
/// input, or no dimension above ten, gives exactly `1`.
pub fn unity_paradox_limit(dimensions: &[f64], complexity: &[f64]) -> Result<f64> {
    if dimensions.is_empty() || complexity.is_empty() {
        return Ok(1.0);
    }
    if dimensions.len() != complexity.len() {
        return Err(EmergenceError::ShapeMismatch {
            expected: format!("{} complexity values", dimensions.len()),
            actual: format!("{}", complexity.len()),
        });
    }
    let high: Vec<f64> = dimensions
        .iter()
        .zip(complexity)
        .filter(|(d, _)| **d > 10.0)
        .map(|(_, &c)| c)
        .collect();
    if high.is_empty() {
        return Ok(1.0);
    }
    let mean = high.iter().sum::<f64>() / high.len() as f64;
    Ok(1.0 / (1.0 + mean))
}

/// Information lost when coarse-graining `micro` into `macro_state`.
///
/// Both states are read as distributions `|x| / Σ|x|`; the result is
/// `1 − H(macro) / H(micro)` clipped to `[0, 1]`. A macro state longer than
/// the micro state is not a coarse-graining and scores `0` with a warning, as
/// does a micro state with zero entropy.
pub fn coarse_graining_emergence(micro: &[f64], macro_state: &[f64]) -> Result<f64> {
    if macro_state.len() > micro.len() {
        warn!(
            micro = micro.len(),
            macro_len = macro_state.len(),
            "macro state larger than micro state"
        );
        return Ok(0.0);
    }
    let micro_entropy = information_entropy(&abs_distribution(micro)?)?;
    let macro_entropy = information_entropy(&abs_distribution(macro_state)?)?;
    if micro_entropy <= 0.0 {
        return Ok(0.0);
    }
    Ok((1.0 - macro_entropy / micro_entropy).clamp(0.0, 1.0))
}

fn abs_distribution(state: &[f64]) -> Result<Vec<f64>> {
    let total: f64 = state.iter().map(|x| x.abs()).sum();
    if state.is_empty() || total <= 0.0 || !total.is_finite() {
        return Err(EmergenceError::Degenerate("state must have a positive finite magnitude"));
    }
    Ok(state.iter().map(|x| x.abs() / total).collect())
}

/// How a quantity scales with dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalingLaw {
    /// `ratio²`, like an area.
    Power,
    /// `e^(ratio − 1)`, like a state count.
    Exponential,
    /// `ln(1 + ratio)`, like an entropy.
    Logarithmic,
}

/// Rescale `value` from `source` to `target` dimensions.
///
/// `ratio = target / max(source, 1)`. Equal dimensions return `value` unchanged.
pub fn dimensional_scaling(value: f64, source: usize, target: usize, law: ScalingLaw) -> f64 {
    if source == target {
        return value;
    }
    let ratio = target as f64 / source.max(1) as f64;
    match law {
        ScalingLaw::Power => value * ratio * ratio,
        ScalingLaw::Exponential => value * (ratio - 1.0).exp(),
        ScalingLaw::Logarithmic => value * ratio.ln_1p(),
    }
}

/// Best rank-`target_rank` approximation in Frobenius norm.
///
/// Returns the reconstructed matrix and the retained singular values, largest
/// first. `target_rank` is clipped to `min(rows, cols)`.
pub fn svd_reduction(matrix: &DMatrix<f64>, target_rank: usize) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let svd = matrix.clone().svd(true, true);
    let u = svd.u.ok_or(EmergenceError::Degenerate("svd produced no left vectors"))?;
    let v_t = svd
        .v_t
        .ok_or(EmergenceError::Degenerate("svd produced no right vectors"))?;
    let k = target_rank.min(svd.singular_values.len());

    let s = svd.singular_values.rows(0, k).into_owned();
    let reduced = u.columns(0, k) * DMatrix::from_diagonal(&s) * v_t.rows(0, k);
    Ok((reduced, s))
}

/// Which complexity estimate [`complexity`] computes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComplexityMeasure {
    /// Mean absolute off-diagonal correlation between columns.
    Correlation,
    /// Normalised entropy of a 50-bin density histogram.
    Entropy,
    /// Fraction of distinct values.
    Compression,
}

/// Complexity of `data` (rows are samples, columns are variables), in `[0, 1]`.
pub fn complexity(data: &DMatrix<f64>, measure: ComplexityMeasure) -> Result<f64> {
    if data.is_empty() {
        return Err(EmergenceError::Degenerate("empty data"));
    }
    let raw = match measure {
        ComplexityMeasure::Correlation => correlation_complexity(data),
        ComplexityMeasure::Entropy => histogram_entropy(data.as_slice()),
        ComplexityMeasure::Compression => {
            let mut values = data.as_slice().to_vec();
            values.sort_by(f64::total_cmp);
            values.dedup_by(|a, b| a.total_cmp(b).is_eq());
            values.len() as f64 / data.len() as f64
        }
    };
    Ok(raw.clamp(0.0, 1.0))
}

fn correlation_complexity(data: &DMatrix<f64>) -> f64 {
    let vars = data.ncols();
    if vars < 2 {
        return 0.0;
    }
    let rows = data.nrows() as f64;
    let centered: Vec<DVector<f64>> = data
        .column_iter()
        .map(|c| {
            let mu = c.sum() / rows;
            c.map(|x| x - mu)
        })
        .collect();

    let mut total = 0.0;
    for i in 0..vars {
        for j in 0..vars {
            if i == j {
                continue;
            }
            let denom = centered[i].norm() * centered[j].norm();
            if denom > 0.0 {
                total += (centered[i].dot(&centered[j]) / denom).abs();
            }
        }
    }
    total / (vars * vars) as f64
}

fn histogram_entropy(values: &[f64]) -> f64 {
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / ENTROPY_BINS as f64;

    let mut counts = [0usize; ENTROPY_BINS];
    for &v in values {
        let bin = (((v - lo) / width) as usize).min(ENTROPY_BINS - 1);
        counts[bin] += 1;
    }
    let n = values.len() as f64;
    let density: Vec<f64> = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| c as f64 / (n * width))
        .collect();
    if density.len() < 2 {
        return 0.0;
    }
    -density.iter().map(|h| h * h.ln()).sum::<f64>() / (density.len() as f64).ln()
}

/// Map `±∞` to `±1/ε` and NaN to zero.
pub fn regularize(value: f64, epsilon: f64) -> f64 {
    if value == f64::INFINITY {
        1.0 / epsilon
    } else if value == f64::NEG_INFINITY {
        -1.0 / epsilon
    } else if value.is_nan() {
        warn!("NaN encountered, returning 0");
        0.0
    } else {
        value
    }
}

/// `unity / (1 + ln(1 + count))`; pure unity when `count == 0`.
pub fn unity_multiplicity_duality(unity: f64, count: usize) -> f64 {
    if count == 0 {
        return unity;
    }
    unity / (1.0 + (count as f64).ln_1p())
}

/// `true` when the parts sum back to `unity` within [`CONSERVATION_TOLERANCE`].
pub fn multiplicity_conserved(unity: f64, parts: &[f64]) -> bool {
    (parts.iter().sum::<f64>() - unity).abs() < CONSERVATION_TOLERANCE
}

/// Finite manifestation of a potential: `efficiency · ln(1 + potential)`,
/// or `1 / efficiency` for an infinite potential.
pub fn infinite_potential_manifestation(potential: f64, efficiency: f64) -> f64 {
    if potential == f64::INFINITY {
        return 1.0 / efficiency;
    }
    efficiency * potential.ln_1p()
}
