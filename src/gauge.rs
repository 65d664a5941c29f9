/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Simplified Yang-Mills gauge theory on a single spacetime point.
//!
//! A gauge field is one `G × G` real matrix `A_μ` per spacetime direction.
//! Derivative terms are dropped, so the field strength reduces to the
//! commutator:
//!
//! ```text
//! F_μν = [A_μ, A_ν]                           (μ ≠ ν),  F_μμ = 0
//! S    = Σ_{μ,ν,α,β} tr(F_μν F_αβ) g_μα g_νβ
//! ```
//!
//! With this reduction `S` is invariant under orthogonal gauge rotations.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{EmergenceError, Result};

/// Default spacetime dimension.
pub const DEFAULT_SPACETIME_DIM: usize = 4;

/// One matrix per spacetime direction.
#[derive(Clone, Debug, PartialEq)]
pub struct GaugeField {
    /// `components[μ]` is `A_μ`.
    pub components: Vec<DMatrix<f64>>,
}

impl GaugeField {
    /// Wrap per-direction components.
    pub fn new(components: Vec<DMatrix<f64>>) -> Self {
        Self { components }
    }

    /// Number of spacetime directions carried.
    pub fn directions(&self) -> usize {
        self.components.len()
    }
}

/// Field-strength tensor, stored row-major over `(μ, ν)`.
#[derive(Clone, Debug)]
pub struct FieldStrength {
    dim: usize,
    components: Vec<DMatrix<f64>>,
}

impl FieldStrength {
    /// `F_μν`, or `None` when either index is outside the spacetime dimension.
    pub fn get(&self, mu: usize, nu: usize) -> Option<&DMatrix<f64>> {
        if mu < self.dim && nu < self.dim {
            self.components.get(mu * self.dim + nu)
        } else {
            None
        }
    }

    fn component(&self, mu: usize, nu: usize) -> &DMatrix<f64> {
        &self.components[mu * self.dim + nu]
    }

    /// Spacetime dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }
}

/// Gauge group and spacetime dimensions of a theory.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaugeTheory {
    /// Matrix dimension of the gauge group representation.
    pub group_dim: usize,
    /// Number of spacetime directions.
    pub spacetime_dim: usize,
}

impl GaugeTheory {
    /// Theory in four spacetime dimensions.
    pub fn new(group_dim: usize) -> Self {
        Self::with_spacetime(group_dim, DEFAULT_SPACETIME_DIM)
    }

    /// Theory with an explicit spacetime dimension.
    pub fn with_spacetime(group_dim: usize, spacetime_dim: usize) -> Self {
        Self {
            group_dim,
            spacetime_dim,
        }
    }

    /// Random field with i.i.d. `N(0, std_dev²)` entries.
    pub fn random_field<R: Rng + ?Sized>(&self, std_dev: f64, rng: &mut R) -> Result<GaugeField> {
        let normal = Normal::new(0.0, std_dev).map_err(|e| {
            EmergenceError::InvalidConfig(format!("std_dev {std_dev}: {e}"))
        })?;
        let g = self.group_dim;
        let components = (0..self.spacetime_dim)
            .map(|_| DMatrix::from_fn(g, g, |_, _| normal.sample(&mut *rng)))
            .collect();
        Ok(GaugeField::new(components))
    }

    /// `F_μν = [A_μ, A_ν]`.
    pub fn field_strength(&self, field: &GaugeField) -> Result<FieldStrength> {
        self.check_field(field)?;
        let d = self.spacetime_dim;
        let g = self.group_dim;
        let mut components = Vec::with_capacity(d * d);
        for mu in 0..d {
            for nu in 0..d {
                if mu == nu {
                    components.push(DMatrix::zeros(g, g));
                } else {
                    let a = &field.components[mu];
                    let b = &field.components[nu];
                    components.push(a * b - b * a);
                }
            }
        }
        Ok(FieldStrength { dim: d, components })
    }

    /// Yang-Mills action contracted with `metric`.
    pub fn yang_mills_action(&self, field: &GaugeField, metric: &DMatrix<f64>) -> Result<f64> {
        let d = self.spacetime_dim;
        if metric.shape() != (d, d) {
            return Err(EmergenceError::ShapeMismatch {
                expected: format!("{d}x{d} metric"),
                actual: format!("{}x{}", metric.nrows(), metric.ncols()),
            });
        }
        let f = self.field_strength(field)?;

        let mut action = 0.0;
        for mu in 0..d {
            for nu in 0..d {
                for alpha in 0..d {
                    let g_mu_alpha = metric[(mu, alpha)];
                    if g_mu_alpha == 0.0 {
                        continue;
                    }
                    for beta in 0..d {
                        let g_nu_beta = metric[(nu, beta)];
                        if g_nu_beta == 0.0 {
                            continue;
                        }
                        let trace = (f.component(mu, nu) * f.component(alpha, beta)).trace();
                        action += trace * g_mu_alpha * g_nu_beta;
                    }
                }
            }
        }
        Ok(action)
    }

    /// `A'_μ = g A_μ gᵀ + g gᵀ`.
    pub fn gauge_transform(&self, field: &GaugeField, element: &DMatrix<f64>) -> Result<GaugeField> {
        self.check_field(field)?;
        self.check_group_matrix(element)?;
        let conj = element.transpose();
        let shift = element * &conj;
        let components = field
            .components
            .iter()
            .map(|a| element * a * &conj + &shift)
            .collect();
        Ok(GaugeField::new(components))
    }

    /// Trace of the ordered product of `exp(A_direction)` along `path`.
    ///
    /// Each step is `(point, direction)`; the point is not used by this
    /// single-site model. Steps whose direction is out of range are skipped.
    pub fn wilson_loop(&self, field: &GaugeField, path: &[(usize, usize)]) -> Result<f64> {
        self.check_field(field)?;
        let mut holonomy = DMatrix::<f64>::identity(self.group_dim, self.group_dim);
        for &(_, direction) in path {
            if direction < self.spacetime_dim {
                holonomy *= field.components[direction].exp();
            }
        }
        Ok(holonomy.trace())
    }

    fn check_field(&self, field: &GaugeField) -> Result<()> {
        if field.directions() != self.spacetime_dim {
            return Err(EmergenceError::ShapeMismatch {
                expected: format!("{} field components", self.spacetime_dim),
                actual: format!("{}", field.directions()),
            });
        }
        for a in &field.components {
            self.check_group_matrix(a)?;
        }
        Ok(())
    }

    fn check_group_matrix(&self, m: &DMatrix<f64>) -> Result<()> {
        let g = self.group_dim;
        if m.shape() != (g, g) {
            return Err(EmergenceError::ShapeMismatch {
                expected: format!("{g}x{g} group matrix"),
                actual: format!("{}x{}", m.nrows(), m.ncols()),
            });
        }
        Ok(())
    }
}

/// `diag(1, −1, …, −1)`.
pub fn minkowski_metric(dim: usize) -> DMatrix<f64> {
    DMatrix::from_fn(dim, dim, |i, j| match (i == j, i) {
        (true, 0) => 1.0,
        (true, _) => -1.0,
        _ => 0.0,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
