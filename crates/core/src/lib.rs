//! Core traits and types for driving an external optimizer.
//!
//! This crate defines the shared abstractions the driver builds on:
//!
//! - [`HostModel`] — the host framework's model: set a design point, evaluate,
//!   read objective, constraints and derivatives
//! - [`DesignVector`] — a flattened design point compared by exact value
//! - [`DesignSpace`], [`ConstraintBounds`] — problem metadata declared to the solver
//! - [`SparseMatrix`], [`SparsityPattern`] — coordinate-form Jacobians
//! - [`Observer`] — receives driver events and optionally returns control actions

mod design;
mod model;
mod observer;
mod sparse;

pub use design::{ConstraintBounds, DesignSpace, DesignSpaceError, DesignVector};
pub use model::{Direction, Gradients, HostModel};
pub use observer::Observer;
pub use sparse::{ShapeError, SparseMatrix, SparsityPattern};
