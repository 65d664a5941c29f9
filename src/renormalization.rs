/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Renormalization-group flow in a finite coupling space.
//!
//! A β-function maps a coupling vector `g` to `dg/d ln μ`. [`RgFlow`] evolves
//! couplings along the flow, locates zeros of β (fixed points) and linearises
//! β around them to obtain critical exponents.
//!
//! # Invariants
//!
//! - The β-function must return a vector of the same length as its input.
//!   Violations surface as [`EmergenceError::ShapeMismatch`].
//! - [`RgFlow::find_fixed_points`] returns each fixed point once (points
//!   within `1e-6` of an earlier one are dropped).

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::{EmergenceError, Result};

/// Fixed points closer than this are the same point.
const DEDUP_DISTANCE: f64 = 1e-6;

// ─── Config ─────────────────────────────────────────────────────────────────

/// Numerical settings for flow integration and fixed-point search.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RgConfig {
    /// RK4 steps used to integrate from `0` to `ln(scale_factor)`.
    pub steps: usize,
    /// Newton iteration stops once the step norm drops below this.
    pub newton_tolerance: f64,
    /// A candidate is accepted only if `‖β(g*)‖` is below this.
    pub residual_tolerance: f64,
    /// Newton iterations per initial guess.
    pub max_newton_iterations: usize,
    /// Half-width of the central-difference stencil.
    pub jacobian_epsilon: f64,
}

impl Default for RgConfig {
    fn default() -> Self {
        Self {
            steps: 1000,
            newton_tolerance: 1e-12,
            residual_tolerance: 1e-10,
            max_newton_iterations: 100,
            jacobian_epsilon: 1e-8,
        }
    }
}

// ─── RgFlow ─────────────────────────────────────────────────────────────────

/// Coupling constants together with their numerical settings.
#[derive(Clone, Debug, PartialEq)]
pub struct RgFlow {
    /// Current coupling vector.
    pub couplings: DVector<f64>,
    /// Numerical settings.
    pub config: RgConfig,
}

impl RgFlow {
    /// Flow with default settings.
    pub fn new(couplings: DVector<f64>) -> Self {
        Self::with_config(couplings, RgConfig::default())
    }

    /// Flow with explicit settings.
    pub fn with_config(couplings: DVector<f64>, config: RgConfig) -> Self {
        Self { couplings, config }
    }

    /// Couplings after rescaling the energy scale by `scale_factor`.
    ///
    /// Integrates `dg/dt = β(g)` for `t ∈ [0, ln scale_factor]` with classical
    /// RK4. `scale_factor < 1` flows toward the infrared.
    pub fn flow<F>(&self, scale_factor: f64, beta: F) -> Result<DVector<f64>>
    where
        F: Fn(&DVector<f64>) -> DVector<f64>,
    {
        if scale_factor <= 0.0 || !scale_factor.is_finite() {
            return Err(EmergenceError::InvalidConfig(format!(
                "scale factor must be positive and finite, got {scale_factor}"
            )));
        }
        if self.config.steps == 0 {
            return Err(EmergenceError::InvalidConfig("steps must be at least 1".into()));
        }

        let t_end = scale_factor.ln();
        let h = t_end / self.config.steps as f64;
        let mut g = self.couplings.clone();
        let eval = |x: &DVector<f64>| -> Result<DVector<f64>> {
            let out = beta(x);
            check_len(x.len(), out.len())?;
            Ok(out)
        };

        for step in 0..self.config.steps {
            let k1 = eval(&g)?;
            let k2 = eval(&(&g + &k1 * (h / 2.0)))?;
            let k3 = eval(&(&g + &k2 * (h / 2.0)))?;
            let k4 = eval(&(&g + &k3 * h))?;
            g += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);

            if g.iter().any(|x| !x.is_finite()) {
                return Err(EmergenceError::Diverged {
                    at: (step + 1) as f64 * h,
                });
            }
        }
        Ok(g)
    }

    /// Zeros of `beta` reached by Newton iteration from standard-normal guesses.
    pub fn find_fixed_points<F, R>(&self, beta: F, guesses: usize, rng: &mut R) -> Vec<DVector<f64>>
    where
        F: Fn(&DVector<f64>) -> DVector<f64>,
        R: Rng + ?Sized,
    {
        let n = self.couplings.len();
        let mut found: Vec<DVector<f64>> = Vec::new();

        for guess in 0..guesses {
            let start = DVector::from_fn(n, |_, _| rng.sample::<f64, _>(StandardNormal));
            let Some(point) = self.newton(&beta, start) else {
                debug!(guess, "fixed-point search did not settle");
                continue;
            };
            if found.iter().any(|p| (p - &point).norm() < DEDUP_DISTANCE) {
                continue;
            }
            found.push(point);
        }
        found
    }

    /// Central-difference Jacobian `∂β_i/∂g_j` at `point`.
    pub fn stability_matrix<F>(&self, point: &DVector<f64>, beta: F) -> Result<DMatrix<f64>>
    where
        F: Fn(&DVector<f64>) -> DVector<f64>,
    {
        jacobian(&beta, point, self.config.jacobian_epsilon)
    }

    /// Eigenvalues of the stability matrix at `fixed_point`.
    ///
    /// Positive real parts are relevant (IR-repulsive) directions.
    pub fn critical_exponents<F>(&self, fixed_point: &DVector<f64>, beta: F) -> Result<Vec<Complex64>>
    where
        F: Fn(&DVector<f64>) -> DVector<f64>,
    {
        let j = self.stability_matrix(fixed_point, beta)?;
        Ok(j.complex_eigenvalues().iter().copied().collect())
    }

    fn newton<F>(&self, beta: &F, mut x: DVector<f64>) -> Option<DVector<f64>>
    where
        F: Fn(&DVector<f64>) -> DVector<f64>,
    {
        for _ in 0..self.config.max_newton_iterations {
            let residual = beta(&x);
            if residual.len() != x.len() {
                return None;
            }
            // Already a zero; stepping further only degrades the Jacobian at
            // non-simple roots.
            if residual.norm() < self.config.residual_tolerance {
                return Some(x);
            }
            let j = jacobian(beta, &x, self.config.jacobian_epsilon).ok()?;
            let step = j.lu().solve(&(-residual))?;
            x += &step;
            if x.iter().any(|v| !v.is_finite()) {
                return None;
            }
            if step.norm() < self.config.newton_tolerance {
                break;
            }
        }
        (beta(&x).norm() < self.config.residual_tolerance).then_some(x)
    }
}

fn jacobian<F>(beta: &F, point: &DVector<f64>, epsilon: f64) -> Result<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let n = point.len();
    let mut j = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut plus = point.clone();
        let mut minus = point.clone();
        plus[i] += epsilon;
        minus[i] -= epsilon;
        let bp = beta(&plus);
        let bm = beta(&minus);
        check_len(n, bp.len())?;
        check_len(n, bm.len())?;
        j.set_column(i, &((bp - bm) / (2.0 * epsilon)));
    }
    Ok(j)
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(EmergenceError::ShapeMismatch {
            expected: format!("beta of length {expected}"),
            actual: format!("{actual}"),
        });
    }
    Ok(())
}

/// One-loop φ⁴ β-functions for couplings `(g, m², λ)`:
/// `(6g³, 2 g m², 12 λ²)`.
///
/// Components beyond the third are held fixed.
pub fn phi4_beta(couplings: &DVector<f64>) -> DVector<f64> {
    let at = |i: usize| couplings.get(i).copied().unwrap_or(0.0);
    let (g, m2, lambda) = (at(0), at(1), at(2));
    let mut out = DVector::zeros(couplings.len());
    let reference = [6.0 * g.powi(3), 2.0 * g * m2, 12.0 * lambda * lambda];
    for (slot, value) in out.iter_mut().zip(reference) {
        *slot = value;
    }
    out
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn logistic(g: &DVector<f64>) -> DVector<f64> {
        g.map(|x| x * (1.0 - x))
    }

    #[test]
    fn test_linear_flow_matches_exact_solution() {
        let flow = RgFlow::new(DVector::from_vec(vec![1.0, -3.0]));
        let out = flow.flow(2.0, |g| -g).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-10, "got {}", out[0]);
        assert!((out[1] + 1.5).abs() < 1e-10, "got {}", out[1]);
    }

    #[test]
    fn test_unit_scale_is_identity() {
        let flow = RgFlow::new(DVector::from_vec(vec![0.3, 0.7]));
        let out = flow.flow(1.0, logistic).unwrap();
        assert_eq!(out, flow.couplings);
    }

    #[test]
    fn test_infrared_flow_runs_backwards() {
        let flow = RgFlow::new(DVector::from_vec(vec![1.0]));
        let out = flow.flow(0.5, |g| -g).unwrap();
        assert!((out[0] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_flow_rejects_non_positive_scale() {
        let flow = RgFlow::new(DVector::from_vec(vec![1.0]));
        assert!(matches!(flow.flow(0.0, logistic), Err(EmergenceError::InvalidConfig(_))));
        assert!(matches!(flow.flow(-2.0, logistic), Err(EmergenceError::InvalidConfig(_))));
    }

    #[test]
    fn test_flow_reports_blow_up() {
        // g' = g², g(0) = 10 has a pole at t = 0.1.
        let flow = RgFlow::new(DVector::from_vec(vec![10.0]));
        let err = flow.flow(1.0_f64.exp(), |g| g.map(|x| x * x)).unwrap_err();
        assert!(matches!(err, EmergenceError::Diverged { .. }), "{:?}", err);
    }

    #[test]
    fn test_flow_rejects_wrong_beta_length() {
        let flow = RgFlow::new(DVector::from_vec(vec![1.0, 2.0]));
        let err = flow.flow(2.0, |_| DVector::zeros(3)).unwrap_err();
        assert!(matches!(err, EmergenceError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_fixed_points_of_logistic_beta() {
        let flow = RgFlow::new(DVector::from_vec(vec![0.0]));
        let mut rng = StdRng::seed_from_u64(42);
        let mut points: Vec<f64> = flow
            .find_fixed_points(logistic, 40, &mut rng)
            .iter()
            .map(|p| p[0])
            .collect();
        points.sort_by(f64::total_cmp);
        assert_eq!(points.len(), 2, "points={:?}", points);
        assert!(points[0].abs() < 1e-9);
        assert!((points[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_point_search_without_zeros_is_empty() {
        let flow = RgFlow::new(DVector::from_vec(vec![0.0]));
        let mut rng = StdRng::seed_from_u64(3);
        let points = flow.find_fixed_points(|g| g.map(|x| x * x + 1.0), 5, &mut rng);
        assert!(points.is_empty());
    }

    #[test]
    fn test_critical_exponents_of_logistic_beta() {
        let flow = RgFlow::new(DVector::from_vec(vec![0.0]));
        let at_zero = flow
            .critical_exponents(&DVector::from_vec(vec![0.0]), logistic)
            .unwrap();
        let at_one = flow
            .critical_exponents(&DVector::from_vec(vec![1.0]), logistic)
            .unwrap();
        assert!((at_zero[0].re - 1.0).abs() < 1e-6);
        assert!((at_one[0].re + 1.0).abs() < 1e-6);
        assert!(at_zero[0].im.abs() < 1e-12);
    }

    #[test]
    fn test_critical_exponents_of_rotation_are_complex() {
        // β = (−y, x) has eigenvalues ±i at the origin.
        let flow = RgFlow::new(DVector::zeros(2));
        let rot = |g: &DVector<f64>| DVector::from_vec(vec![-g[1], g[0]]);
        let mut ev = flow.critical_exponents(&DVector::zeros(2), rot).unwrap();
        ev.sort_by(|a, b| a.im.total_cmp(&b.im));
        assert!((ev[0].im + 1.0).abs() < 1e-6);
        assert!((ev[1].im - 1.0).abs() < 1e-6);
        assert!(ev.iter().all(|z| z.re.abs() < 1e-6));
    }

    #[test]
    fn test_phi4_beta_reference_values() {
        let b = phi4_beta(&DVector::from_vec(vec![0.5, 2.0, 0.1]));
        assert!((b[0] - 0.75).abs() < 1e-15);
        assert!((b[1] - 2.0).abs() < 1e-15);
        assert!((b[2] - 0.12).abs() < 1e-15);
    }

    #[test]
    fn test_phi4_gaussian_point_is_fixed() {
        let flow = RgFlow::new(DVector::zeros(3));
        let out = flow.flow(10.0, phi4_beta).unwrap();
        assert_eq!(out, DVector::zeros(3));
    }

    #[test]
    fn test_stability_matrix_of_phi4() {
        let flow = RgFlow::new(DVector::zeros(3));
        let p = DVector::from_vec(vec![1.0, 2.0, 0.5]);
        let j = flow.stability_matrix(&p, phi4_beta).unwrap();
        // ∂(6g³)/∂g = 18g², ∂(2 g m²)/∂g = 2m², ∂(2 g m²)/∂m² = 2g, ∂(12λ²)/∂λ = 24λ
        assert!((j[(0, 0)] - 18.0).abs() < 1e-5);
        assert!((j[(1, 0)] - 4.0).abs() < 1e-5);
        assert!((j[(1, 1)] - 2.0).abs() < 1e-5);
        assert!((j[(2, 2)] - 12.0).abs() < 1e-5);
        assert!(j[(0, 2)].abs() < 1e-5);
    }
}
