/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Finite truncation of infinite-dimensional representations.

use nalgebra::{DMatrix, DVector};

/// Default truncation dimension.
pub const DEFAULT_CUTOFF: usize = 1000;

/// Keeps the leading `n` basis directions of a vector or operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionCutoff(pub usize);

impl DimensionCutoff {
    /// Cutoff dimension.
    pub fn get(&self) -> usize {
        self.0
    }

    /// First `cutoff` entries of `v` (all of `v` when it is shorter).
    pub fn truncate_vector<T: nalgebra::Scalar>(&self, v: &DVector<T>) -> DVector<T> {
        let n = v.len().min(self.0);
        v.rows(0, n).into_owned()
    }

    /// Leading `cutoff × cutoff` block of `m`, clipped to the matrix shape.
    pub fn truncate_matrix<T: nalgebra::Scalar>(&self, m: &DMatrix<T>) -> DMatrix<T> {
        let r = m.nrows().min(self.0);
        let c = m.ncols().min(self.0);
        m.view((0, 0), (r, c)).into_owned()
    }
}

impl Default for DimensionCutoff {
    fn default() -> Self {
        Self(DEFAULT_CUTOFF)
    }
}
