use std::error::Error as StdError;

use thiserror::Error;

use crate::bridge::LayoutError;
use crate::registry::Capability;

/// The configured optimizer cannot be run with the available backend.
#[derive(Debug, Error)]
pub enum SolverUnavailableError {
    #[error("optimizer {name} is not in the descriptor table")]
    UnknownOptimizer { name: String },

    #[error("backend runs {backend}, but {requested} was configured")]
    WrongBackend { requested: String, backend: String },

    #[error("backend {backend} lacks required capability {capability:?}")]
    MissingCapability {
        backend: String,
        capability: Capability,
    },

    #[error("backend {backend} failed to construct a solver")]
    Construction {
        backend: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Errors that prevent a run from starting.
///
/// None of these change the driver state.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("driver is not configured")]
    NotConfigured,

    #[error("driver has already finished a run; reset it to run again")]
    AlreadyFinished,

    #[error("invalid problem layout")]
    InvalidProblem(#[from] LayoutError),

    #[error(transparent)]
    SolverUnavailable(#[from] SolverUnavailableError),
}
