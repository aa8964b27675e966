use std::ops::Deref;

use thiserror::Error;

/// A flattened design point: every free variable of the host model in order.
///
/// Equality is exact and bitwise per component, so two vectors compare equal
/// only when the solver handed over the very same numbers. This makes a
/// `DesignVector` safe to use as a cache key: `0.0` and `-0.0` are distinct,
/// and a `NaN` component equals only an identical `NaN`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DesignVector(Vec<f64>);

impl DesignVector {
    /// Creates a design vector from its components.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Returns `true` if this vector holds exactly the values in `x`.
    #[must_use]
    pub fn matches(&self, x: &[f64]) -> bool {
        self.0.len() == x.len()
            && self
                .0
                .iter()
                .zip(x)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Returns the components as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Consumes the vector, returning its components.
    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl PartialEq for DesignVector {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for DesignVector {}

impl std::hash::Hash for DesignVector {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for value in &self.0 {
            value.to_bits().hash(state);
        }
    }
}

impl Deref for DesignVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<&[f64]> for DesignVector {
    fn from(values: &[f64]) -> Self {
        Self(values.to_vec())
    }
}

impl From<Vec<f64>> for DesignVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Errors that can occur when building a [`DesignSpace`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DesignSpaceError {
    #[error("bound vectors have length {lower}/{upper}, expected {expected}")]
    BoundsLength {
        expected: usize,
        lower: usize,
        upper: usize,
    },

    #[error("lower bound {lower} exceeds upper bound {upper} for variable {index}")]
    InvertedBounds { index: usize, lower: f64, upper: f64 },

    #[error("initial value {value} for variable {index} is not finite")]
    NonFiniteInitial { index: usize, value: f64 },
}

/// The free variables of a problem: where to start and where the solver may go.
///
/// Bounds may be infinite to leave a variable unbounded on that side.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawDesignSpace"))]
pub struct DesignSpace {
    initial: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawDesignSpace {
    initial: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawDesignSpace> for DesignSpace {
    type Error = DesignSpaceError;

    fn try_from(raw: RawDesignSpace) -> Result<Self, DesignSpaceError> {
        Self::new(raw.initial, raw.lower, raw.upper)
    }
}

impl DesignSpace {
    /// Creates a design space with validated bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the vectors differ in length, a lower bound exceeds
    /// its upper bound (or either is `NaN`), or the initial point is not finite.
    pub fn new(
        initial: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self, DesignSpaceError> {
        let n = initial.len();
        if lower.len() != n || upper.len() != n {
            return Err(DesignSpaceError::BoundsLength {
                expected: n,
                lower: lower.len(),
                upper: upper.len(),
            });
        }

        for (index, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            // Also rejects NaN bounds.
            if !(lo <= hi) {
                return Err(DesignSpaceError::InvertedBounds {
                    index,
                    lower: lo,
                    upper: hi,
                });
            }
        }

        if let Some((index, &value)) = initial.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DesignSpaceError::NonFiniteInitial { index, value });
        }

        Ok(Self {
            initial,
            lower,
            upper,
        })
    }

    /// Creates a design space with no bounds on any variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial point is not finite.
    pub fn unbounded(initial: Vec<f64>) -> Result<Self, DesignSpaceError> {
        let n = initial.len();
        Self::new(initial, vec![f64::NEG_INFINITY; n], vec![f64::INFINITY; n])
    }

    /// Returns the number of free variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.initial.len()
    }

    /// Returns `true` if the problem has no free variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.initial.is_empty()
    }

    #[must_use]
    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Returns `true` if any variable has a finite bound.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.lower
            .iter()
            .chain(&self.upper)
            .any(|bound| bound.is_finite())
    }
}

/// The admissible values of a single constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintBounds {
    /// The constraint must equal the value.
    Equal(f64),

    /// The constraint must lie in `[lower, upper]`; either side may be infinite.
    Range { lower: f64, upper: f64 },
}

impl ConstraintBounds {
    /// A one-sided constraint `value <= upper`.
    #[must_use]
    pub fn at_most(upper: f64) -> Self {
        Self::Range {
            lower: f64::NEG_INFINITY,
            upper,
        }
    }

    /// A one-sided constraint `value >= lower`.
    #[must_use]
    pub fn at_least(lower: f64) -> Self {
        Self::Range {
            lower,
            upper: f64::INFINITY,
        }
    }

    /// Returns the `(lower, upper)` pair as a solver sees it.
    #[must_use]
    pub fn as_pair(&self) -> (f64, f64) {
        match *self {
            Self::Equal(value) => (value, value),
            Self::Range { lower, upper } => (lower, upper),
        }
    }

    #[must_use]
    pub fn is_equality(&self) -> bool {
        matches!(self, Self::Equal(_))
    }

    /// Returns `true` if the bounds are well formed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Equal(value) => value.is_finite(),
            Self::Range { lower, upper } => lower <= upper,
        }
    }
}
