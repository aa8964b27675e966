use thiserror::Error;

use ipdriver_core::DesignVector;

use crate::bridge::{Counts, GradientCheck, ModelEvaluationError};
use crate::solver::StatusCode;

use super::State;

/// Why a run failed.
#[derive(Debug, Error)]
pub enum Failure {
    /// The host model failed while serving a callback.
    #[error(transparent)]
    ModelEvaluation(#[from] ModelEvaluationError),

    /// The solver reported a failure of its own.
    #[error("solver reported internal failure (status {code})")]
    SolverInternal { code: i32 },

    /// An observer stopped the run.
    #[error("run aborted by observer at x = {x:?}", x = .design_vector.as_slice())]
    Aborted { design_vector: DesignVector },
}

/// The terminal classification of a run.
#[derive(Debug)]
pub enum RunOutcome {
    Converged,
    MaxIterationsReached,
    Failed(Failure),
}

impl RunOutcome {
    /// Classifies a solver status code, with no callback failure recorded.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::CONVERGED => Self::Converged,
            StatusCode::MAX_ITERATIONS => Self::MaxIterationsReached,
            StatusCode(code) => Self::Failed(Failure::SolverInternal { code }),
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure, if the run failed.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns the driver state this outcome leaves behind.
    #[must_use]
    pub fn state(&self) -> State {
        match self {
            Self::Converged => State::Converged,
            Self::MaxIterationsReached => State::MaxIterationsReached,
            Self::Failed(_) => State::Failed,
        }
    }
}

/// The result of a completed run.
#[derive(Debug)]
pub struct Solution {
    /// How the run ended.
    pub outcome: RunOutcome,

    /// The solver's final iterate; the initial point if the solver never ran.
    pub x: Vec<f64>,

    /// Objective at `x`, unless the run failed.
    pub objective: Option<f64>,

    /// Constraint values at `x`, empty if the run failed.
    pub constraints: Vec<f64>,

    /// Work done by the host model.
    pub counts: Counts,

    /// Number of callbacks the solver issued.
    pub callbacks: usize,

    /// Gradient check at the initial point, if requested.
    pub gradient_check: Option<GradientCheck>,
}
