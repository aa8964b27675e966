use crate::{ConstraintBounds, DesignSpace, SparseMatrix, SparsityPattern};

/// Direction in which the host model propagates derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// One linear solve per design variable.
    Forward,

    /// One linear solve per response (objective and constraints).
    Reverse,
}

/// The derivatives of the objective and constraints at one design point.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    /// Gradient of the objective, one entry per design variable.
    pub objective: Vec<f64>,

    /// Constraint Jacobian: row = constraint, column = design variable.
    pub jacobian: SparseMatrix,
}

impl Gradients {
    #[must_use]
    pub fn new(objective: Vec<f64>, jacobian: SparseMatrix) -> Self {
        Self {
            objective,
            jacobian,
        }
    }
}

/// The host framework's model, seen from the driver.
///
/// A host model holds a current design point. Setting the point and evaluating
/// updates the model state; the getters then read objective, constraints and
/// derivatives at that point. Models must be deterministic: the same design
/// point always produces the same values.
///
/// The driver is the only caller that mutates a model during a run, and it
/// never issues two calls concurrently.
pub trait HostModel {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the free variables: initial point and bounds.
    fn design_space(&self) -> DesignSpace;

    /// Returns the bounds of each constraint, in constraint order.
    fn constraint_bounds(&self) -> Vec<ConstraintBounds>;

    /// Returns the coordinates of the constraint Jacobian that may be nonzero.
    ///
    /// Defaults to a dense pattern.
    fn jacobian_sparsity(&self) -> SparsityPattern {
        SparsityPattern::dense(self.constraint_bounds().len(), self.design_space().len())
    }

    /// Sets the free variables of the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model rejects the design point.
    fn set_design_point(&mut self, x: &[f64]) -> Result<(), Self::Error>;

    /// Runs the model at its current design point.
    ///
    /// # Errors
    ///
    /// Returns an error if the model evaluation fails.
    fn evaluate(&mut self) -> Result<(), Self::Error>;

    /// Returns the objective value from the last evaluation.
    ///
    /// # Errors
    ///
    /// Returns an error if the objective cannot be read.
    fn objective(&self) -> Result<f64, Self::Error>;

    /// Returns the constraint values from the last evaluation.
    ///
    /// # Errors
    ///
    /// Returns an error if the constraints cannot be read.
    fn constraints(&self) -> Result<Vec<f64>, Self::Error>;

    /// Computes derivatives at the last evaluated design point.
    ///
    /// # Errors
    ///
    /// Returns an error if the derivative computation fails.
    fn gradients(&mut self, direction: Direction) -> Result<Gradients, Self::Error>;
}
