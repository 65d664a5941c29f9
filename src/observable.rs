/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Values produced by a refinement computation and the distance between them.
//!
//! # Distance rules
//!
//! | previous \ current | `Real` / `Complex` | `Vector` (shape s) | `Opaque` |
//! |--------------------|--------------------|--------------------|----------|
//! | `Real` / `Complex` | `|a − b|`          | incomparable       | incomparable |
//! | `Vector` (shape s) | incomparable       | `‖a − b‖₂`         | incomparable |
//! | `Opaque`           | incomparable       | incomparable       | incomparable |
//!
//! Vectors of different shape are incomparable, even when they hold the same
//! number of elements (a 2×3 array is not a 3×2 array). Incomparable pairs are
//! reported as [`Distance::Incomparable`] rather than folded into an infinite
//! sentinel, so the convergence log can tell "far apart" from "not comparable".
//!
//! # Serialisation
//!
//! With the `serde` feature every float carried by an [`Observable`] or a
//! [`Distance`] is written as a plain number when finite and as the string
//! `"NaN"`, `"inf"` or `"-inf"` otherwise. JSON has no literal for non-finite
//! numbers, and a divergent run is exactly when they show up.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

// ─── Observable ──────────────────────────────────────────────────────────────

/// Output of a single `compute(size)` call.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Observable {
    /// Real scalar. Integer results are widened into this variant.
    Real(#[cfg_attr(feature = "serde", serde(with = "float_repr"))] f64),
    /// Complex scalar.
    Complex(#[cfg_attr(feature = "serde", serde(with = "float_repr::complex"))] Complex64),
    /// Dense numeric array of any rank, stored row-major.
    ///
    /// `data.len()` equals the product of `shape`; a plain sequence has shape `[len]`.
    Vector {
        /// Extent along each axis, outermost first.
        shape: Vec<usize>,
        /// Elements in row-major order.
        #[cfg_attr(feature = "serde", serde(with = "float_repr::seq"))]
        data: Vec<f64>,
    },
    /// Any non-numeric result. Never comparable, so it can never converge.
    Opaque(String),
}

impl Observable {
    /// Distance from `previous` to `self`.
    ///
    /// See the module table for the per-variant rules.
    pub fn distance(&self, previous: &Observable) -> Distance {
        match (self, previous) {
            (Observable::Real(a), Observable::Real(b)) => Distance::Finite((a - b).abs()),
            (Observable::Complex(a), Observable::Complex(b)) => Distance::Finite((a - b).norm()),
            (Observable::Real(a), Observable::Complex(b))
            | (Observable::Complex(b), Observable::Real(a)) => {
                Distance::Finite((Complex64::new(*a, 0.0) - b).norm())
            }
            (
                Observable::Vector { shape: sa, data: a },
                Observable::Vector { shape: sb, data: b },
            ) if sa == sb && a.len() == b.len() => {
                let sum_sq: f64 = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum();
                Distance::Finite(sum_sq.sqrt())
            }
            _ => Distance::Incomparable,
        }
    }

    /// `true` for the numeric variants.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Observable::Opaque(_))
    }

    /// Real part for scalar variants, `None` otherwise.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Observable::Real(v) => Some(*v),
            Observable::Complex(c) => Some(c.re),
            _ => None,
        }
    }

    /// Row-major array for a shaped numeric result.
    ///
    /// Returns `None` when `data` does not fill `shape`.
    pub fn array(shape: Vec<usize>, data: Vec<f64>) -> Option<Self> {
        (shape.iter().product::<usize>() == data.len()).then_some(Observable::Vector { shape, data })
    }

    /// Borrow the flat row-major data for the `Vector` variant.
    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Observable::Vector { data, .. } => Some(data.as_slice()),
            _ => None,
        }
    }

    /// Array shape: empty for scalars, `None` for opaque results.
    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            Observable::Real(_) | Observable::Complex(_) => Some(&[]),
            Observable::Vector { shape, .. } => Some(shape.as_slice()),
            Observable::Opaque(_) => None,
        }
    }

    /// Short variant name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Observable::Real(_) => "real",
            Observable::Complex(_) => "complex",
            Observable::Vector { .. } => "vector",
            Observable::Opaque(_) => "opaque",
        }
    }
}

impl From<f64> for Observable {
    fn from(v: f64) -> Self {
        Observable::Real(v)
    }
}

impl From<f32> for Observable {
    fn from(v: f32) -> Self {
        Observable::Real(v as f64)
    }
}

impl From<i32> for Observable {
    fn from(v: i32) -> Self {
        Observable::Real(v as f64)
    }
}

impl From<i64> for Observable {
    fn from(v: i64) -> Self {
        Observable::Real(v as f64)
    }
}

impl From<u32> for Observable {
    fn from(v: u32) -> Self {
        Observable::Real(v as f64)
    }
}

impl From<usize> for Observable {
    fn from(v: usize) -> Self {
        Observable::Real(v as f64)
    }
}

impl From<Complex64> for Observable {
    fn from(v: Complex64) -> Self {
        Observable::Complex(v)
    }
}

impl From<Vec<f64>> for Observable {
    fn from(v: Vec<f64>) -> Self {
        Observable::Vector {
            shape: vec![v.len()],
            data: v,
        }
    }
}

impl From<&[f64]> for Observable {
    fn from(v: &[f64]) -> Self {
        Observable::from(v.to_vec())
    }
}

impl From<DVector<f64>> for Observable {
    fn from(v: DVector<f64>) -> Self {
        Observable::from(v.as_slice().to_vec())
    }
}

impl From<DMatrix<f64>> for Observable {
    fn from(m: DMatrix<f64>) -> Self {
        // nalgebra stores column-major; transpose to lay rows out contiguously.
        let (rows, cols) = m.shape();
        Observable::Vector {
            shape: vec![rows, cols],
            data: m.transpose().as_slice().to_vec(),
        }
    }
}

impl From<String> for Observable {
    fn from(v: String) -> Self {
        Observable::Opaque(v)
    }
}

impl From<&str> for Observable {
    fn from(v: &str) -> Self {
        Observable::Opaque(v.into())
    }
}

// ─── Distance ────────────────────────────────────────────────────────────────

/// Distance between two successive results.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Distance {
    /// Non-negative distance between comparable results (NaN if either input was NaN).
    Finite(#[cfg_attr(feature = "serde", serde(with = "float_repr"))] f64),
    /// The two results have different kinds or shapes.
    Incomparable,
}

impl Distance {
    /// Numeric value; `Incomparable` reads as `f64::INFINITY`.
    pub fn value(&self) -> f64 {
        match self {
            Distance::Finite(d) => *d,
            Distance::Incomparable => f64::INFINITY,
        }
    }

    /// Strict `distance < tolerance`. Never true for `Incomparable` or NaN.
    pub fn is_within(&self, tolerance: f64) -> bool {
        match self {
            Distance::Finite(d) => *d < tolerance,
            Distance::Incomparable => false,
        }
    }

    /// `true` for [`Distance::Incomparable`].
    pub fn is_incomparable(&self) -> bool {
        matches!(self, Distance::Incomparable)
    }

    /// `Some(d)` for finite distances.
    pub fn finite(&self) -> Option<f64> {
        match self {
            Distance::Finite(d) => Some(*d),
            Distance::Incomparable => None,
        }
    }
}

// ─── Nested arrays ───────────────────────────────────────────────────────────

/// Assembles a row-major [`Observable::Vector`] from a depth-first walk over
/// nested sequences of any depth.
///
/// The first path to a scalar fixes the rank; every later sequence must match
/// the length already seen at its depth. Ragged input makes a call return `None`.
#[derive(Debug, Default)]
pub struct ArrayBuilder {
    shape: Vec<usize>,
    rank: Option<usize>,
    data: Vec<f64>,
}

impl ArrayBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sequence of `len` items opens at `depth` (the outermost is depth 0).
    pub fn sequence(&mut self, depth: usize, len: usize) -> Option<()> {
        if self.rank.is_some_and(|r| r <= depth) {
            return None;
        }
        match self.shape.get(depth) {
            Some(&seen) if seen != len => return None,
            Some(_) => {}
            None if self.shape.len() == depth => self.shape.push(len),
            None => return None,
        }
        if len == 0 {
            self.fix_rank(depth + 1)?;
        }
        Some(())
    }

    /// A scalar element sits at `depth`.
    pub fn scalar(&mut self, depth: usize, value: f64) -> Option<()> {
        self.fix_rank(depth)?;
        self.data.push(value);
        Some(())
    }

    fn fix_rank(&mut self, rank: usize) -> Option<()> {
        match self.rank {
            Some(r) if r != rank => None,
            Some(_) => Some(()),
            None => {
                self.rank = Some(rank);
                Some(())
            }
        }
    }

    /// The assembled array, or `None` if nothing was visited or the walk was incomplete.
    pub fn finish(self) -> Option<Observable> {
        if self.rank != Some(self.shape.len()) {
            return None;
        }
        Observable::array(self.shape, self.data)
    }
}

// ─── Non-finite float encoding ───────────────────────────────────────────────

#[cfg(feature = "serde")]
mod float_repr {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    struct Encoded(f64);

    impl Serialize for Encoded {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            let v = self.0;
            if v.is_nan() {
                s.serialize_str("NaN")
            } else if v == f64::INFINITY {
                s.serialize_str("inf")
            } else if v == f64::NEG_INFINITY {
                s.serialize_str("-inf")
            } else {
                s.serialize_f64(v)
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Special(String),
    }

    impl Repr {
        fn decode<E: de::Error>(self) -> Result<f64, E> {
            match self {
                Repr::Number(v) => Ok(v),
                Repr::Special(s) => match s.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    other => Err(E::invalid_value(
                        de::Unexpected::Str(other),
                        &"a number, \"NaN\", \"inf\" or \"-inf\"",
                    )),
                },
            }
        }
    }

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        Encoded(*v).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Repr::deserialize(d)?.decode()
    }

    pub mod seq {
        use super::*;

        pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
            s.collect_seq(v.iter().map(|x| Encoded(*x)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
            Vec::<Repr>::deserialize(d)?
                .into_iter()
                .map(Repr::decode)
                .collect()
        }
    }

    pub mod complex {
        use super::*;
        use num_complex::Complex64;

        pub fn serialize<S: Serializer>(v: &Complex64, s: S) -> Result<S::Ok, S::Error> {
            [Encoded(v.re), Encoded(v.im)].serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Complex64, D::Error> {
            let [re, im] = <[Repr; 2]>::deserialize(d)?;
            Ok(Complex64::new(re.decode()?, im.decode()?))
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
