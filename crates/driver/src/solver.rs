//! The boundary to an external optimizer library.
//!
//! The driver never performs optimization itself. A [`Backend`] constructs an
//! [`ExternalSolver`] from a [`Setup`] (options and problem dimensions), and
//! the solver then drives the run through [`Callbacks`], asking for objective,
//! constraint, and derivative values until it returns a [`StatusCode`].
//!
//! Callbacks are synchronous and issued one at a time. A solver may parallelize
//! its own linear algebra freely, but must wait for each callback to return
//! before issuing the next.

use std::fmt;

use thiserror::Error;

use ipdriver_core::{ConstraintBounds, DesignSpace, SparsityPattern};

use crate::registry::Capability;

/// The raw status code returned by an external solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// The solver met its convergence tolerance.
    pub const CONVERGED: Self = Self(0);

    /// The solver stopped at its iteration limit.
    pub const MAX_ITERATIONS: Self = Self(1);

    /// The solver stopped because a callback returned [`Aborted`].
    pub const ABORTED: Self = Self(-1);
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned by a callback to tell the solver to stop immediately.
///
/// The solver must not issue further callbacks and should return promptly,
/// conventionally with [`StatusCode::ABORTED`]. The reason for the abort is
/// recorded on the driver side.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("callback aborted the optimization")]
pub struct Aborted;

/// Everything a solver needs to know before the first callback.
#[derive(Debug, Clone, Copy)]
pub struct Setup<'a> {
    pub title: &'a str,

    /// Convergence tolerance.
    pub tolerance: f64,

    pub max_iterations: usize,

    /// Output verbosity, from 0 (silent) upward.
    pub print_level: u8,

    /// Initial point and variable bounds.
    pub design_space: &'a DesignSpace,

    /// Bounds of each constraint.
    pub constraint_bounds: &'a [ConstraintBounds],

    /// Coordinates of the constraint Jacobian; Jacobian values passed to
    /// [`Callbacks::gradients`] are packed in this order.
    pub sparsity: &'a SparsityPattern,
}

impl Setup<'_> {
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.design_space.len()
    }

    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.constraint_bounds.len()
    }
}

/// Values a solver requests while it iterates.
pub trait Callbacks {
    /// Evaluates the objective and writes the constraint values into
    /// `constraints` (one slot per constraint).
    ///
    /// # Errors
    ///
    /// Returns [`Aborted`] if the run must stop.
    fn objective_and_constraints(
        &mut self,
        x: &[f64],
        constraints: &mut [f64],
    ) -> Result<f64, Aborted>;

    /// Writes the objective gradient into `objective` (one slot per variable)
    /// and the Jacobian values into `jacobian`, packed in sparsity order.
    ///
    /// # Errors
    ///
    /// Returns [`Aborted`] if the run must stop.
    fn gradients(
        &mut self,
        x: &[f64],
        objective: &mut [f64],
        jacobian: &mut [f64],
    ) -> Result<(), Aborted>;
}

/// A configured solver instance, ready to iterate.
pub trait ExternalSolver {
    /// Runs the solver to completion, blocking until it returns a status.
    fn optimize(&mut self, callbacks: &mut dyn Callbacks) -> StatusCode;

    /// Returns the solver's final (or current) iterate.
    fn design_point(&self) -> &[f64];
}

/// A provider of external solvers.
pub trait Backend {
    type Solver: ExternalSolver;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the optimizer name this backend runs, as in the descriptor table.
    fn name(&self) -> &str;

    /// Returns the capabilities the underlying library provides.
    fn capabilities(&self) -> &[Capability];

    /// Constructs a solver for the given setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot build a solver for this setup.
    fn construct(&self, setup: &Setup<'_>) -> Result<Self::Solver, Self::Error>;
}
