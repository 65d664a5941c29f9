/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Emergence diagnostics over spectra and multi-scale data.
//!
//! - [`effective_dimension`]: how many directions of a correlation matrix
//!   actually carry weight.
//! - [`emergence_strength`]: how much of a coarse description is explained
//!   by the fine one.
//! - [`dimensional_phase_transition`]: where the effective dimension of a
//!   family of configurations changes fastest.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::{require_square, EmergenceError, Result};

/// Eigenvalues at or below this are treated as numerical zeros.
pub const EIGENVALUE_FLOOR: f64 = 1e-12;

// ─── Effective dimension ────────────────────────────────────────────────────

/// Dimensionality measures of a correlation spectrum.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectiveDimension {
    /// `(Σλ)² / Σλ²`.
    pub participation_ratio: f64,
    /// Shannon entropy of the normalised spectrum, in nats.
    pub information_dimension: f64,
    /// `Σλ / max λ`.
    pub effective_rank: f64,
    /// Same quantity as `information_dimension`.
    pub spectrum_entropy: f64,
    /// Retained eigenvalues, largest first.
    pub eigenvalues: Vec<f64>,
}

/// Effective dimensionality of a (symmetrised) correlation matrix.
pub fn effective_dimension(correlation: &DMatrix<f64>) -> Result<EffectiveDimension> {
    require_square(correlation.nrows(), correlation.ncols())?;
    let symmetric = (correlation + correlation.transpose()) * 0.5;

    let mut eigenvalues: Vec<f64> = symmetric
        .symmetric_eigenvalues()
        .iter()
        .copied()
        .filter(|&l| l > EIGENVALUE_FLOOR)
        .collect();
    if eigenvalues.is_empty() {
        return Err(EmergenceError::Degenerate("no eigenvalue above the numerical floor"));
    }
    eigenvalues.sort_by(|a, b| b.total_cmp(a));

    let sum: f64 = eigenvalues.iter().sum();
    let sum_sq: f64 = eigenvalues.iter().map(|l| l * l).sum();
    let entropy: f64 = -eigenvalues
        .iter()
        .map(|l| {
            let p = l / sum;
            p * p.ln()
        })
        .sum::<f64>();

    Ok(EffectiveDimension {
        participation_ratio: sum * sum / sum_sq,
        information_dimension: entropy,
        effective_rank: sum / eigenvalues[0],
        spectrum_entropy: entropy,
        eigenvalues,
    })
}

// ─── Emergence strength ─────────────────────────────────────────────────────

/// Information-theoretic comparison of a fine and a coarse description.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmergenceMetrics {
    /// Gaussian estimate `-½ ln(1 - r²)`.
    pub mutual_information: f64,
    /// `(macro variance - mutual information) / micro variance`.
    pub emergence_index: f64,
    /// `macro length / micro length`.
    pub compression_ratio: f64,
    /// Population variance of the micro data.
    pub microscopic_complexity: f64,
    /// Population variance of the macro data.
    pub macroscopic_complexity: f64,
}

/// Emergence metrics of `macro_data` relative to `micro_data`.
///
/// The micro data are block-averaged onto the macro length before the
/// correlation is taken, so `macro_data` may not be longer than `micro_data`.
pub fn emergence_strength(micro_data: &[f64], macro_data: &[f64]) -> Result<EmergenceMetrics> {
    let (n, m) = (micro_data.len(), macro_data.len());
    if m == 0 {
        return Err(EmergenceError::Degenerate("empty macro data"));
    }
    if m > n {
        return Err(EmergenceError::ShapeMismatch {
            expected: format!("macro length <= {n}"),
            actual: format!("{m}"),
        });
    }

    let coarse = coarse_grain(micro_data, m);
    let r = correlation(&coarse, macro_data);
    // |r| = 1 would give an infinite estimate.
    let mutual_information = -0.5 * (1.0 - r * r).max(f64::EPSILON).ln();

    let micro_var = variance(micro_data);
    let macro_var = variance(macro_data);
    let emergence_index = if micro_var > 0.0 {
        (macro_var - mutual_information) / micro_var
    } else {
        0.0
    };

    Ok(EmergenceMetrics {
        mutual_information,
        emergence_index,
        compression_ratio: m as f64 / n as f64,
        microscopic_complexity: micro_var,
        macroscopic_complexity: macro_var,
    })
}

/// Block means of `data` over `blocks` contiguous, near-equal blocks.
pub fn coarse_grain(data: &[f64], blocks: usize) -> Vec<f64> {
    let n = data.len();
    (0..blocks)
        .map(|k| {
            let lo = k * n / blocks;
            let hi = ((k + 1) * n / blocks).max(lo + 1).min(n);
            let block = &data[lo..hi];
            block.iter().sum::<f64>() / block.len() as f64
        })
        .collect()
}

fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

fn variance(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let mu = mean(x);
    x.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / x.len() as f64
}

/// Pearson correlation; zero when either side is constant.
fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma) * (x - ma);
        vb += (y - mb) * (y - mb);
    }
    if va == 0.0 || vb == 0.0 {
        debug!("constant series, correlation taken as zero");
        return 0.0;
    }
    (cov / (va * vb).sqrt()).clamp(-1.0, 1.0)
}

// ─── Phase transitions ──────────────────────────────────────────────────────

/// One configuration of a system along the control parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum Configuration {
    /// State vector; analysed through its outer product.
    State(DVector<f64>),
    /// Correlation matrix, analysed directly.
    Correlation(DMatrix<f64>),
}

impl From<DVector<f64>> for Configuration {
    fn from(v: DVector<f64>) -> Self {
        Configuration::State(v)
    }
}

impl From<DMatrix<f64>> for Configuration {
    fn from(m: DMatrix<f64>) -> Self {
        Configuration::Correlation(m)
    }
}

/// Result of scanning effective dimension along a control parameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseTransition {
    /// Control value where `|dD/dp|` peaks.
    pub transition_point: f64,
    /// Index of `transition_point` in the control array.
    pub transition_index: usize,
    /// Slope of `ln D` against `ln |p - p_c|`, if the fit is determined.
    pub critical_exponent: Option<f64>,
    /// Participation ratio per configuration.
    pub effective_dimensions: Vec<f64>,
    /// `dD/dp`.
    pub derivatives: Vec<f64>,
}

/// Locate the steepest change in effective dimension across `configs`.
pub fn dimensional_phase_transition(
    configs: &[Configuration],
    control: &[f64],
) -> Result<PhaseTransition> {
    if configs.len() != control.len() {
        return Err(EmergenceError::ShapeMismatch {
            expected: format!("{} control values", configs.len()),
            actual: format!("{}", control.len()),
        });
    }

    let effective_dimensions = configs
        .iter()
        .map(|c| {
            let corr = match c {
                Configuration::State(v) => v * v.transpose(),
                Configuration::Correlation(m) => m.clone(),
            };
            effective_dimension(&corr).map(|d| d.participation_ratio)
        })
        .collect::<Result<Vec<f64>>>()?;

    let derivatives = gradient(&effective_dimensions, control)?;
    let transition_index = derivatives
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, d)| {
            if d.abs() > best.1 {
                (i, d.abs())
            } else {
                best
            }
        })
        .0;
    let transition_point = control[transition_index];
    let critical_exponent = power_law_exponent(control, &effective_dimensions, transition_point);

    Ok(PhaseTransition {
        transition_point,
        transition_index,
        critical_exponent,
        effective_dimensions,
        derivatives,
    })
}

/// Derivative of samples `f` over coordinates `x`.
///
/// Second-order central differences in the interior (valid for uneven
/// spacing), first-order one-sided differences at the ends.
pub fn gradient(f: &[f64], x: &[f64]) -> Result<Vec<f64>> {
    let n = f.len();
    if x.len() != n {
        return Err(EmergenceError::ShapeMismatch {
            expected: format!("{n} coordinates"),
            actual: format!("{}", x.len()),
        });
    }
    if n < 2 {
        return Err(EmergenceError::Degenerate("gradient needs at least two samples"));
    }
    if x.windows(2).any(|w| w[1] == w[0]) {
        return Err(EmergenceError::InvalidConfig("repeated coordinate in gradient".into()));
    }

    let mut out = Vec::with_capacity(n);
    out.push((f[1] - f[0]) / (x[1] - x[0]));
    for i in 1..n - 1 {
        let hs = x[i] - x[i - 1];
        let hd = x[i + 1] - x[i];
        let num = hs * hs * f[i + 1] + (hd * hd - hs * hs) * f[i] - hd * hd * f[i - 1];
        out.push(num / (hs * hd * (hd + hs)));
    }
    out.push((f[n - 1] - f[n - 2]) / (x[n - 1] - x[n - 2]));
    Ok(out)
}

/// Least-squares slope of `ln y` against `ln |x - center|`.
///
/// Points at the center or with `y <= 0` are skipped. `None` when fewer than
/// two points remain or all remaining `ln |x - center|` coincide.
pub fn power_law_exponent(x: &[f64], y: &[f64], center: f64) -> Option<f64> {
    let pts: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(xi, yi)| **xi != center && **yi > 0.0)
        .map(|(xi, yi)| ((xi - center).abs().ln(), yi.ln()))
        .collect();
    if pts.len() < 2 {
        return None;
    }
    let k = pts.len() as f64;
    let mx = pts.iter().map(|p| p.0).sum::<f64>() / k;
    let my = pts.iter().map(|p| p.1).sum::<f64>() / k;
    let sxx: f64 = pts.iter().map(|p| (p.0 - mx) * (p.0 - mx)).sum();
    let sxy: f64 = pts.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    if sxx <= f64::EPSILON {
        return None;
    }
    let slope = sxy / sxx;
    slope.is_finite().then_some(slope)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
