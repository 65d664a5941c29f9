/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Truncated one-dimensional quantum systems.
//!
//! The Hamiltonian is discretised on a uniform grid with the three-point stencil
//!
//! ```text
//! H = −½ d²/dx² + V(x)
//!   ≈ (1/dx²)·I − (1/2dx²)·(shift₊ + shift₋) + diag(V(xᵢ))
//! ```
//!
//! and truncated to the system's [`DimensionCutoff`]. Because `H` is real
//! symmetric, spectra and time evolution both go through one symmetric
//! eigendecomposition.

use core::f64::consts::PI;

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use num_complex::Complex64;

use crate::error::{require_square, EmergenceError, Result};
use crate::space::DimensionCutoff;

/// Eigenvalues below this are treated as numerical zeros in entropies.
const EIGEN_FLOOR: f64 = 1e-12;

/// Eigenvalues (ascending) and matching eigenvectors (columns).
#[derive(Clone, Debug)]
pub struct Spectrum {
    /// Energies, ascending.
    pub energies: DVector<f64>,
    /// Column `k` is the eigenstate of `energies[k]`.
    pub states: DMatrix<f64>,
}

/// A quantum system approximated in a finite basis.
#[derive(Clone, Debug, Default)]
pub struct QuantumSystem {
    /// Truncation applied to every constructed operator.
    pub cutoff: DimensionCutoff,
}

impl QuantumSystem {
    /// System with an explicit cutoff.
    pub fn new(cutoff: DimensionCutoff) -> Self {
        Self { cutoff }
    }

    /// Finite-difference Hamiltonian for `potential` on `n_points` grid points
    /// spanning `x_range` inclusive.
    pub fn hamiltonian<V>(&self, potential: V, x_range: (f64, f64), n_points: usize) -> Result<DMatrix<f64>>
    where
        V: Fn(f64) -> f64,
    {
        let x = linspace(x_range, n_points)?;
        let dx = x[1] - x[0];
        let diag = 1.0 / (dx * dx);
        let off = -0.5 / (dx * dx);

        let h = DMatrix::from_fn(n_points, n_points, |i, j| {
            if i == j {
                diag + potential(x[i])
            } else if i.abs_diff(j) == 1 {
                off
            } else {
                0.0
            }
        });
        Ok(self.cutoff.truncate_matrix(&h))
    }

    /// Full spectrum of a symmetric Hamiltonian, sorted by energy.
    pub fn spectrum(&self, hamiltonian: &DMatrix<f64>) -> Result<Spectrum> {
        require_square(hamiltonian.nrows(), hamiltonian.ncols())?;
        if hamiltonian.is_empty() {
            return Err(EmergenceError::Degenerate("empty Hamiltonian"));
        }
        let eigen = SymmetricEigen::new(hamiltonian.clone());
        let n = eigen.eigenvalues.len();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let energies = DVector::from_iterator(n, order.iter().map(|&k| eigen.eigenvalues[k]));
        let states = DMatrix::from_fn(n, n, |row, col| eigen.eigenvectors[(row, order[col])]);
        Ok(Spectrum { energies, states })
    }

    /// Lowest energy and its eigenstate.
    pub fn ground_state(&self, hamiltonian: &DMatrix<f64>) -> Result<(f64, DVector<f64>)> {
        let spectrum = self.spectrum(hamiltonian)?;
        Ok((spectrum.energies[0], spectrum.states.column(0).into_owned()))
    }

    /// Ground-state energy of `potential` on an `n_points` grid.
    ///
    /// Shaped for the convergence driver: `driver.try_run(|n| sys.ground_state_energy(&v, range, n))`.
    pub fn ground_state_energy<V>(&self, potential: V, x_range: (f64, f64), n_points: usize) -> Result<f64>
    where
        V: Fn(f64) -> f64,
    {
        let h = self.hamiltonian(potential, x_range, n_points)?;
        self.ground_state(&h).map(|(e, _)| e)
    }

    /// `size ↦ E₀` on a `size`-point grid, ready for
    /// [`AdaptiveConvergence::try_run`](crate::convergence::AdaptiveConvergence::try_run).
    pub fn ground_state_energy_by_size<'a, V>(
        &'a self,
        potential: V,
        x_range: (f64, f64),
    ) -> impl Fn(usize) -> Result<f64> + 'a
    where
        V: Fn(f64) -> f64 + 'a,
    {
        move |size| self.ground_state_energy(&potential, x_range, size)
    }

    /// Harmonic-oscillator eigenfunctions ψ₀ … ψ_{n_max} sampled at `x`.
    ///
    /// Returns a `len(x) × (n_max + 1)` matrix whose column `n` is
    /// `(2ⁿ n!)^{-½} π^{-¼} e^{-x²/2} Hₙ(x)`, with the physicists' Hermite
    /// polynomials from the three-term recurrence.
    pub fn harmonic_oscillator_basis(&self, n_max: usize, x: &[f64]) -> DMatrix<f64> {
        let mut basis = DMatrix::zeros(x.len(), n_max + 1);
        let pi_quarter = PI.powf(-0.25);

        for (row, &xi) in x.iter().enumerate() {
            let gauss = (-0.5 * xi * xi).exp();
            let mut h_prev = 1.0;
            let mut h_curr = 2.0 * xi;
            let mut norm = pi_quarter;

            basis[(row, 0)] = norm * gauss;
            for n in 1..=n_max {
                // (2ⁿ n!)^{-½} = (2^{n-1} (n-1)!)^{-½} / √(2n)
                norm /= (2.0 * n as f64).sqrt();
                basis[(row, n)] = norm * gauss * h_curr;
                let h_next = 2.0 * xi * h_curr - 2.0 * n as f64 * h_prev;
                h_prev = h_curr;
                h_curr = h_next;
            }
        }
        basis
    }

    /// `exp(−iHt) ψ`, computed in the eigenbasis of the symmetric `H`.
    pub fn evolve(
        &self,
        initial: &DVector<Complex64>,
        hamiltonian: &DMatrix<f64>,
        time: f64,
    ) -> Result<DVector<Complex64>> {
        require_square(hamiltonian.nrows(), hamiltonian.ncols())?;
        if initial.len() != hamiltonian.nrows() {
            return Err(EmergenceError::ShapeMismatch {
                expected: format!("state of length {}", hamiltonian.nrows()),
                actual: format!("length {}", initial.len()),
            });
        }
        let eigen = SymmetricEigen::new(hamiltonian.clone());
        let v = eigen.eigenvectors.map(|e| Complex64::new(e, 0.0));

        let mut coefficients = v.transpose() * initial;
        for (c, &energy) in coefficients.iter_mut().zip(eigen.eigenvalues.iter()) {
            *c *= Complex64::from_polar(1.0, -energy * time);
        }
        Ok(v * coefficients)
    }

    /// Von Neumann entropy of one half of a `√d × √d` bipartition of `state`.
    pub fn entanglement_entropy(&self, state: &DVector<Complex64>) -> Result<f64> {
        let d = state.len();
        let side = isqrt(d);
        if side * side != d || d == 0 {
            return Err(EmergenceError::NotPerfectSquare(d));
        }
        // Row-major reshape: M[i, j] = ψ[i·side + j].
        let m = DMatrix::from_fn(side, side, |i, j| state[i * side + j]);
        let rho = &m * m.adjoint();
        let eigenvalues = rho.symmetric_eigenvalues();

        Ok(eigenvalues
            .iter()
            .filter(|&&l| l > EIGEN_FLOOR)
            .map(|&l| -l * l.ln())
            .sum())
    }
}

/// `n` evenly spaced points over `[start, end]` inclusive.
pub fn linspace((start, end): (f64, f64), n: usize) -> Result<Vec<f64>> {
    if !(start.is_finite() && end.is_finite()) || end <= start {
        return Err(EmergenceError::InvalidRange { start, end });
    }
    if n < 2 {
        return Err(EmergenceError::InvalidConfig(format!(
            "grid needs at least 2 points, got {n}"
        )));
    }
    let step = (end - start) / (n - 1) as f64;
    Ok((0..n).map(|i| start + step * i as f64).collect())
}

fn isqrt(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn harmonic(x: f64) -> f64 {
        0.5 * x * x
    }

    #[test]
    fn test_hamiltonian_is_symmetric_tridiagonal() {
        let sys = QuantumSystem::default();
        let h = sys.hamiltonian(harmonic, (-1.0, 1.0), 5).unwrap();
        assert_eq!(h.shape(), (5, 5));
        assert_eq!(h, h.transpose());
        assert_eq!(h[(0, 2)], 0.0);
        // dx = 0.5 → off-diagonal = −0.5 / 0.25 = −2
        assert!((h[(0, 1)] + 2.0).abs() < 1e-12);
        // diagonal at x = 0: 1/dx² + V(0) = 4
        assert!((h[(2, 2)] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_harmonic_ground_state_energy() {
        let sys = QuantumSystem::new(DimensionCutoff(100));
        let h = sys.hamiltonian(harmonic, (-10.0, 10.0), 100).unwrap();
        let (e0, psi) = sys.ground_state(&h).unwrap();
        assert!((e0 - 0.5).abs() < 1e-2, "e0={}", e0);
        assert!((psi.norm() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_harmonic_spectrum_spacing() {
        let sys = QuantumSystem::default();
        let h = sys.hamiltonian(harmonic, (-8.0, 8.0), 300).unwrap();
        let spectrum = sys.spectrum(&h).unwrap();
        for k in 0..4 {
            let expected = k as f64 + 0.5;
            assert!(
                (spectrum.energies[k] - expected).abs() < 1e-2,
                "E{}={} expected {}",
                k,
                spectrum.energies[k],
                expected
            );
        }
    }

    #[test]
    fn test_cutoff_truncates_hamiltonian() {
        let sys = QuantumSystem::new(DimensionCutoff(16));
        let h = sys.hamiltonian(harmonic, (-5.0, 5.0), 64).unwrap();
        assert_eq!(h.shape(), (16, 16));
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let sys = QuantumSystem::default();
        assert!(matches!(
            sys.hamiltonian(harmonic, (1.0, -1.0), 10),
            Err(EmergenceError::InvalidRange { .. })
        ));
        assert!(sys.hamiltonian(harmonic, (-1.0, 1.0), 1).is_err());
    }

    #[test]
    fn test_oscillator_basis_is_orthonormal() {
        let sys = QuantumSystem::default();
        let x = linspace((-12.0, 12.0), 4001).unwrap();
        let dx = x[1] - x[0];
        let basis = sys.harmonic_oscillator_basis(4, &x);
        assert_eq!(basis.shape(), (4001, 5));

        for m in 0..5 {
            for n in 0..5 {
                let overlap = basis.column(m).dot(&basis.column(n)) * dx;
                let expected = if m == n { 1.0 } else { 0.0 };
                assert!(
                    (overlap - expected).abs() < 1e-6,
                    "<{}|{}> = {}",
                    m,
                    n,
                    overlap
                );
            }
        }
    }

    #[test]
    fn test_evolution_preserves_norm() {
        let sys = QuantumSystem::default();
        let h = sys.hamiltonian(harmonic, (-5.0, 5.0), 40).unwrap();
        let psi0 = DVector::from_fn(40, |i, _| {
            Complex64::new(if i == 20 { 1.0 } else { 0.0 }, 0.0)
        });
        let psi = sys.evolve(&psi0, &h, 0.7).unwrap();
        assert!((psi.norm() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_eigenstate_evolves_by_phase_only() {
        let sys = QuantumSystem::default();
        let h = sys.hamiltonian(harmonic, (-6.0, 6.0), 60).unwrap();
        let (e0, ground) = sys.ground_state(&h).unwrap();
        let psi0 = ground.map(|v| Complex64::new(v, 0.0));
        let t = 1.3;
        let psi = sys.evolve(&psi0, &h, t).unwrap();
        let phase = Complex64::from_polar(1.0, -e0 * t);
        let expected = psi0.map(|v| v * phase);
        assert!((psi - expected).norm() < 1e-8);
    }

    #[test]
    fn test_evolve_rejects_wrong_length() {
        let sys = QuantumSystem::default();
        let h = DMatrix::<f64>::identity(4, 4);
        let psi = DVector::from_element(3, Complex64::new(1.0, 0.0));
        assert!(matches!(
            sys.evolve(&psi, &h, 1.0),
            Err(EmergenceError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_product_state_has_zero_entropy() {
        let sys = QuantumSystem::default();
        // |0⟩ ⊗ |0⟩ in a 2×2 bipartition.
        let psi = DVector::from_vec(vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
        ]);
        assert!(sys.entanglement_entropy(&psi).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_bell_state_has_ln2_entropy() {
        let sys = QuantumSystem::default();
        let a = 1.0 / 2.0_f64.sqrt();
        let psi = DVector::from_vec(vec![
            Complex64::new(a, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(a, 0.0),
        ]);
        let s = sys.entanglement_entropy(&psi).unwrap();
        assert!((s - 2.0_f64.ln()).abs() < 1e-10, "s={}", s);
    }

    #[test]
    fn test_entropy_requires_perfect_square() {
        let sys = QuantumSystem::default();
        let psi = DVector::from_element(5, Complex64::new(1.0, 0.0));
        assert_eq!(
            sys.entanglement_entropy(&psi),
            Err(EmergenceError::NotPerfectSquare(5))
        );
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(1 << 40), 1 << 20);
    }
}
