use thiserror::Error;

use ipdriver_core::{ConstraintBounds, DesignSpace, HostModel, ShapeError, SparsityPattern};

/// Errors in the problem metadata a host model declares.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("jacobian sparsity does not match the problem dimensions")]
    Sparsity(#[source] ShapeError),

    #[error("bounds of constraint {index} are invalid: {bounds:?}")]
    ConstraintBounds {
        index: usize,
        bounds: ConstraintBounds,
    },
}

/// The fixed dimensions of a run, as declared to the solver.
///
/// Captured once from the host model before the solver is constructed; every
/// callback is checked against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    design_space: DesignSpace,
    constraint_bounds: Vec<ConstraintBounds>,
    sparsity: SparsityPattern,
}

impl Layout {
    /// Reads and validates the problem metadata of a host model.
    ///
    /// # Errors
    ///
    /// Returns an error if the sparsity pattern does not have one row per
    /// constraint and one column per variable, or if constraint bounds are
    /// malformed.
    pub fn from_model<M: HostModel>(model: &M) -> Result<Self, LayoutError> {
        Self::new(
            model.design_space(),
            model.constraint_bounds(),
            model.jacobian_sparsity(),
        )
    }

    /// Creates a layout from its parts.
    ///
    /// # Errors
    ///
    /// See [`Layout::from_model`].
    pub fn new(
        design_space: DesignSpace,
        constraint_bounds: Vec<ConstraintBounds>,
        sparsity: SparsityPattern,
    ) -> Result<Self, LayoutError> {
        if sparsity.nrows() != constraint_bounds.len() || sparsity.ncols() != design_space.len() {
            return Err(LayoutError::Sparsity(ShapeError::Dimensions {
                expected_rows: constraint_bounds.len(),
                expected_cols: design_space.len(),
                nrows: sparsity.nrows(),
                ncols: sparsity.ncols(),
            }));
        }

        if let Some((index, bounds)) = constraint_bounds
            .iter()
            .enumerate()
            .find(|(_, bounds)| !bounds.is_valid())
        {
            return Err(LayoutError::ConstraintBounds {
                index,
                bounds: *bounds,
            });
        }

        Ok(Self {
            design_space,
            constraint_bounds,
            sparsity,
        })
    }

    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.design_space.len()
    }

    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.constraint_bounds.len()
    }

    #[must_use]
    pub fn design_space(&self) -> &DesignSpace {
        &self.design_space
    }

    #[must_use]
    pub fn constraint_bounds(&self) -> &[ConstraintBounds] {
        &self.constraint_bounds
    }

    #[must_use]
    pub fn sparsity(&self) -> &SparsityPattern {
        &self.sparsity
    }

    #[must_use]
    pub fn has_equality_constraints(&self) -> bool {
        self.constraint_bounds.iter().any(ConstraintBounds::is_equality)
    }

    #[must_use]
    pub fn has_inequality_constraints(&self) -> bool {
        self.constraint_bounds.iter().any(|b| !b.is_equality())
    }
}
