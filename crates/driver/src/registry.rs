//! Static tables describing the optimizers a backend may provide.
//!
//! Each optimizer name the driver accepts has a [`BackendDescriptor`] declaring
//! the capabilities a backend must provide to run it. Availability is checked
//! when a run starts; a missing capability is an error, never a silent
//! fallback to another optimizer.

use Capability::{Gradients, InequalityConstraints, SparseJacobian};

/// A feature an external solver library may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Consumes objective gradients and constraint Jacobians.
    Gradients,

    /// Accepts the constraint Jacobian in coordinate form.
    SparseJacobian,

    /// Handles equality constraints.
    EqualityConstraints,

    /// Handles inequality (range) constraints.
    InequalityConstraints,

    /// Handles finite bounds on design variables.
    VariableBounds,
}

/// Describes an optimizer and what it requires from the backend library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDescriptor {
    /// Upper-case optimizer name.
    pub name: &'static str,

    /// Whether the optimizer uses gradient information.
    pub gradient_based: bool,

    /// Whether the optimizer supports multiple objectives.
    pub multi_objective: bool,

    /// Capabilities the backend must provide regardless of the problem.
    pub requires: &'static [Capability],
}

/// Every optimizer the driver knows about.
pub static BACKENDS: &[BackendDescriptor] = &[
    gradient_free("ALPSO"),
    gradient_based("CONMIN", &[Gradients]),
    gradient_based("FSQP", &[Gradients]),
    gradient_based("IPOPT", &[Gradients, SparseJacobian]),
    gradient_based("NLPQLP", &[Gradients]),
    BackendDescriptor {
        name: "NSGA2",
        gradient_based: false,
        multi_objective: true,
        requires: &[],
    },
    gradient_based("PSQP", &[Gradients]),
    gradient_based("SLSQP", &[Gradients]),
    gradient_based("SNOPT", &[Gradients, SparseJacobian]),
    gradient_based("NLPY_AUGLAG", &[Gradients]),
    gradient_free("NOMAD"),
    gradient_based(
        "PAROPT",
        &[Gradients, SparseJacobian, InequalityConstraints],
    ),
];

/// Reference to cite when publishing results obtained with ParOpt.
pub const CITATIONS: &str = r"@inproceedings{Kennedy:2015:SciTech,
title={Large-Scale Multimaterial Topology Optimization for Additive Manufacturing},
author={Graeme J. Kennedy},
year={2015},
booktitle = {56th AIAA/ASCE/AHS/ASC Structures, Structural Dynamics, and Materials Conference},
month = {January},
doi={10.2514/6.2015-1799},
address = {Kissimmee, {FL}}}
";

const fn gradient_based(name: &'static str, requires: &'static [Capability]) -> BackendDescriptor {
    BackendDescriptor {
        name,
        gradient_based: true,
        multi_objective: false,
        requires,
    }
}

const fn gradient_free(name: &'static str) -> BackendDescriptor {
    BackendDescriptor {
        name,
        gradient_based: false,
        multi_objective: false,
        requires: &[],
    }
}

/// Looks up an optimizer by name, ignoring case.
#[must_use]
pub fn descriptor(name: &str) -> Option<&'static BackendDescriptor> {
    BACKENDS
        .iter()
        .find(|descriptor| descriptor.name.eq_ignore_ascii_case(name))
}

/// Returns the names of all optimizers that use gradients.
pub fn gradient_optimizers() -> impl Iterator<Item = &'static str> {
    BACKENDS
        .iter()
        .filter(|descriptor| descriptor.gradient_based)
        .map(|descriptor| descriptor.name)
}
